pub mod editing;
pub mod markup;
pub mod tracking;

// Re-export key types for easier usage
pub use editing::{
    Bias, Change, ChangeAttrs, ChangeMeta, Cmd, Document, DocumentModel, EditError, Fragment,
    Mapping, Mark, MarkKind, MarkSet, MarkSpan, Patch, Step, StepMap, TrackKind, TrackedRun,
};
pub use markup::{MarkupError, parse_markup, to_markup};
pub use tracking::{
    Author, CommandError, CompositionGuard, CompositionState, EditorId, Outcome, Resolution,
    Scope, TrackInterceptor, TrackedEditor, TrackingSession, Workspace, resolve,
};
