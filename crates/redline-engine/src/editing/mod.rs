/*!
 * # Editing Core
 *
 * The document model the tracking engine works against.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - Document text lives in one **`xi_rope::Rope`** buffer, addressed in byte offsets
 * - Inline marks live beside it in a normalized **`MarkSet`**
 * - A `'\n'` is a block boundary; marks never describe block structure
 *
 * ### 2. Step-Based Editing
 * - Every edit is a **`Step`** (replace, add mark, remove mark)
 * - Steps are grouped into a **`Change`** that applies atomically
 * - Each applied step yields a **`StepMap`**; the chain is a **`Mapping`**
 * - Steps invert against the document they apply to, which backs undo/redo
 *
 * ### 3. Commands
 * - User intents are **Commands** (`Cmd` enum) that compile to changes
 * - Typed text continues the marks active at the cursor
 *
 * ## Module Structure
 *
 * - **`document`**: `DocumentModel` trait and the rope-backed `Document`
 * - **`marks`**: tracked and formatting marks, `MarkSet`, `TrackedRun`
 * - **`fragment`**: marked content used as insertion payload
 * - **`step`** / **`change`**: edit operations and their grouping
 * - **`mapping`**: position mapping across steps
 * - **`commands`**: `Cmd` enum and change compilation
 * - **`patch`**: result metadata returned to the UI
 *
 * ## Usage Pattern
 *
 * ```rust
 * use redline_engine::editing::*;
 *
 * let mut doc = Document::from_bytes(b"hello world").unwrap();
 * let change = Change::new().with_step(Step::delete(5..11));
 * let applied = doc.apply_change(&change).unwrap();
 *
 * assert_eq!(doc.text(), "hello");
 * assert_eq!(applied.mapping.map(11, Bias::Left), 5);
 * ```
 */

pub mod change;
pub mod commands;
pub mod document;
pub mod error;
pub mod fragment;
pub mod mapping;
pub mod marks;
pub mod patch;
pub mod step;

pub use change::{AppliedChange, Change, ChangeMeta};
pub use commands::Cmd;
pub(crate) use commands::compile_command;
pub use document::{Document, DocumentModel};
pub use error::EditError;
pub use fragment::Fragment;
pub use mapping::{Bias, Mapping, StepMap, recover_deleted};
pub use marks::{ChangeAttrs, Mark, MarkKind, MarkSet, MarkSpan, TrackKind, TrackedRun};
pub use patch::Patch;
pub use step::Step;
