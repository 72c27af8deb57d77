//! Position mapping across edit steps.
//!
//! Every step produces a [`StepMap`] describing the single range it replaced.
//! A [`Mapping`] chains them so that an offset recorded against an older
//! version of the document can be carried forward to the current one.

use crate::editing::{
    DocumentModel, EditError,
    fragment::Fragment,
    step::Step,
};

/// Which side of an edit boundary a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay before content inserted at the position
    Left,
    /// Move after content inserted at the position
    Right,
}

/// Offset delta of one step: `old_len` bytes at `start` became `new_len` bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl StepMap {
    pub fn new(start: usize, old_len: usize, new_len: usize) -> Self {
        Self {
            start,
            old_len,
            new_len,
        }
    }

    /// Map for steps that do not move any text
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.old_len == 0 && self.new_len == 0
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        let end = self.start + self.old_len;
        if pos < self.start {
            return pos;
        }
        if pos > end {
            return pos - self.old_len + self.new_len;
        }

        // The start of a replaced range stays put, its end follows the new content;
        // only pure insertions and interior positions consult the bias
        let side = if self.old_len == 0 {
            bias
        } else if pos == self.start {
            Bias::Left
        } else if pos == end {
            Bias::Right
        } else {
            bias
        };

        match side {
            Bias::Left => self.start,
            Bias::Right => self.start + self.new_len,
        }
    }
}

/// An ordered chain of step maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        if !map.is_identity() {
            self.maps.push(map);
        }
    }

    pub fn extend(&mut self, other: &Mapping) {
        self.maps.extend_from_slice(&other.maps);
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Map a position through every step, in order
    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, bias))
    }

    /// Map a range so that it shrinks away from content inserted at its edges
    pub fn map_range_inward(&self, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
        let start = self.map(range.start, Bias::Right);
        let end = self.map(range.end, Bias::Left);
        start..end.max(start)
    }
}

impl FromIterator<StepMap> for Mapping {
    fn from_iter<T: IntoIterator<Item = StepMap>>(iter: T) -> Self {
        let mut mapping = Mapping::new();
        for map in iter {
            mapping.push(map);
        }
        mapping
    }
}

/// Recover the content a delete or replace step removes
///
/// `before` must be the document the step is about to be applied to. Returns
/// `None` for steps that remove nothing.
pub fn recover_deleted<D: DocumentModel + ?Sized>(
    step: &Step,
    before: &D,
) -> Result<Option<Fragment>, EditError> {
    match step {
        Step::Replace { range, .. } if !range.is_empty() => before.slice(range.clone()).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Document;
    use rstest::rstest;

    #[rstest]
    #[case(2, Bias::Left, 2)]
    #[case(5, Bias::Left, 5)]
    #[case(5, Bias::Right, 8)]
    #[case(7, Bias::Left, 10)]
    fn test_insertion_map(#[case] pos: usize, #[case] bias: Bias, #[case] expected: usize) {
        let map = StepMap::new(5, 0, 3);
        assert_eq!(map.map(pos, bias), expected);
    }

    #[rstest]
    #[case(4, Bias::Right, 4)]
    #[case(5, Bias::Right, 5)]
    #[case(6, Bias::Left, 5)]
    #[case(6, Bias::Right, 7)]
    #[case(8, Bias::Left, 7)]
    #[case(12, Bias::Left, 11)]
    fn test_replace_map(#[case] pos: usize, #[case] bias: Bias, #[case] expected: usize) {
        // "hello world": replace 5..8 with two bytes
        let map = StepMap::new(5, 3, 2);
        assert_eq!(map.map(pos, bias), expected);
    }

    #[test]
    fn test_mapping_accumulates_earlier_steps() {
        let mapping: Mapping = [StepMap::new(0, 0, 4), StepMap::new(10, 2, 0)]
            .into_iter()
            .collect();

        assert_eq!(mapping.map(3, Bias::Left), 7);
        assert_eq!(mapping.map(9, Bias::Left), 11);
        assert_eq!(mapping.map(20, Bias::Left), 22);
    }

    #[test]
    fn test_identity_maps_are_skipped() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::identity());
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_map_range_inward_excludes_adjacent_insertions() {
        let mapping: Mapping = [StepMap::new(2, 0, 3), StepMap::new(9, 0, 1)]
            .into_iter()
            .collect();

        assert_eq!(mapping.map_range_inward(2..6), 5..9);
    }

    #[test]
    fn test_recover_deleted_slices_before_document() {
        let doc = Document::from_text("hello world");

        let removed = recover_deleted(&Step::delete(6..11), &doc).unwrap();
        assert_eq!(removed.unwrap().text(), "world");

        let nothing = recover_deleted(&Step::insert(3, "x".into()), &doc).unwrap();
        assert!(nothing.is_none());
    }
}
