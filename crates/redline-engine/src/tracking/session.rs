use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::editing::ChangeAttrs;

/// Who new tracked runs are attributed to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Per-editor tracking state: whether tracking is on and who is editing
#[derive(Debug, Clone)]
pub struct TrackingSession {
    enabled: bool,
    author: Author,
    clock: fn() -> DateTime<Utc>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self {
            enabled: false,
            author: Author::default(),
            clock: Utc::now,
        }
    }
}

impl TrackingSession {
    pub fn new(author: Author, enabled: bool) -> Self {
        Self {
            enabled,
            author,
            ..Self::default()
        }
    }

    /// Replace the clock used to stamp new runs
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Flip tracking and return the new state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn set_author(&mut self, author: Author) {
        self.author = author;
    }

    /// Attributes for a run created now by the current author
    pub fn stamp(&self) -> ChangeAttrs {
        ChangeAttrs::new(&self.author.id, &self.author.name, (self.clock)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_stamp_uses_author_and_truncated_clock() {
        let session = TrackingSession::new(Author::new("u7", "Grace"), true).with_clock(fixed_clock);
        let attrs = session.stamp();

        assert_eq!(attrs.author_id, "u7");
        assert_eq!(attrs.author_name, "Grace");
        assert_eq!(
            attrs.changed_at,
            Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 0).unwrap()
        );
    }

    #[test]
    fn test_toggle_flips_state() {
        let mut session = TrackingSession::default();
        assert!(!session.is_enabled());
        assert!(session.toggle());
        assert!(!session.toggle());

        session.enable();
        assert!(session.is_enabled());
        session.disable();
        assert!(!session.is_enabled());
    }

    #[test]
    fn test_default_author_is_empty() {
        let attrs = TrackingSession::default().stamp();
        assert_eq!(attrs.author_id, "");
        assert_eq!(attrs.author_name, "");
    }
}
