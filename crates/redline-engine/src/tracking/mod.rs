//! Change tracking on top of the editing core.
//!
//! - **`session`**: per-editor tracking switch and author
//! - **`interceptor`**: rewrites committed changes into tracked edits
//! - **`resolve`**: accept/reject of tracked runs
//! - **`composition`**: suppresses tracking while an input method composes
//! - **`editor`**: `TrackedEditor`, which wires the above together
//! - **`workspace`**: many independent editors keyed by id

pub mod composition;
pub mod editor;
pub mod interceptor;
pub mod resolve;
pub mod session;
pub mod workspace;

pub use composition::{CompositionGuard, CompositionState};
pub use editor::{Outcome, TrackedEditor};
pub use interceptor::TrackInterceptor;
pub use resolve::{Resolution, Scope, resolve};
pub use session::{Author, TrackingSession};
pub use workspace::{CommandError, EditorId, Workspace};
