use std::ops::Range;

/// Result of committing a change to an editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub changed: Vec<Range<usize>>,
    pub new_selection: Range<usize>,
    pub version: u64,
    /// A corrective tracking change was committed along with the edit
    pub tracked: bool,
}
