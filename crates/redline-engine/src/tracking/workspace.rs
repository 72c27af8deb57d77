use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::editing::{Cmd, Document, EditError};
use crate::tracking::{Outcome, TrackedEditor, TrackingSession};

/// Identifies an editor within a [`Workspace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditorId(pub Uuid);

impl EditorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EditorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("editor {0} is not open")]
    StaleReference(EditorId),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Independent tracked editors, keyed by id
#[derive(Debug, Default)]
pub struct Workspace {
    editors: HashMap<EditorId, TrackedEditor>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, doc: Document, session: TrackingSession) -> EditorId {
        let id = EditorId::new();
        self.editors.insert(id, TrackedEditor::new(doc, session));
        log::debug!("opened editor {id}");
        id
    }

    pub fn close(&mut self, id: EditorId) -> Option<TrackedEditor> {
        self.editors.remove(&id)
    }

    pub fn get(&self, id: EditorId) -> Option<&TrackedEditor> {
        self.editors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    pub fn execute(&mut self, id: EditorId, cmd: Cmd) -> Result<Outcome, CommandError> {
        let editor = self
            .editors
            .get_mut(&id)
            .ok_or(CommandError::StaleReference(id))?;
        Ok(editor.execute(cmd)?)
    }
}
