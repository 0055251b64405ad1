//! # Ranges
//!
//! A range is a pair of positions in one root. Operations that act on
//! consecutive siblings (attribute changes, moves) use *flat* ranges whose
//! ends share a parent; markers may span several parents.

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};
use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> ModelResult<Self> {
        if end.is_before(&start)? {
            return Err(ModelError::invalid_location(
                start.root(),
                start.path(),
                format!("range ends before it starts (end {end})"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Flat range of `how_many` offsets starting at `start`.
    pub fn flat(start: Position, how_many: usize) -> Self {
        let end = start.with_offset(start.offset() + how_many);
        Self { start, end }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            end: position.clone(),
            start: position,
        }
    }

    pub fn root(&self) -> &str {
        self.start.root()
    }

    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Width of a flat range.
    pub fn how_many(&self) -> usize {
        self.end.offset().saturating_sub(self.start.offset())
    }

    /// True when `position` lies strictly between the range's ends.
    pub fn contains_position(&self, position: &Position) -> bool {
        matches!(
            (position.is_after(&self.start), position.is_before(&self.end)),
            (Ok(true), Ok(true))
        )
    }

    /// Common part of two flat ranges sharing a parent.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.start.has_same_parent_as(&other.start) {
            return None;
        }
        let start = self.start.offset().max(other.start.offset());
        let end = self.end.offset().min(other.end.offset());
        (start < end).then(|| Range {
            start: self.start.with_offset(start),
            end: self.start.with_offset(end),
        })
    }

    /// Parts of this flat range not covered by `other`, in document order.
    pub fn difference(&self, other: &Range) -> Vec<Range> {
        if self.intersection(other).is_none() {
            return vec![self.clone()];
        }
        let mut parts = Vec::new();
        if self.start.offset() < other.start.offset() {
            parts.push(Range {
                start: self.start.clone(),
                end: other.start.clone(),
            });
        }
        if other.end.offset() < self.end.offset() {
            parts.push(Range {
                start: other.end.clone(),
                end: self.end.clone(),
            });
        }
        parts
    }

    /// This flat range after `how_many` offsets were inserted at `at`.
    ///
    /// An insertion strictly inside the range either grows it (`spread`) or
    /// splits it around the new content. A `sticky` range also treats its
    /// boundaries as inside.
    pub(crate) fn transformed_by_insertion(
        &self,
        at: &Position,
        how_many: usize,
        spread: bool,
        sticky: bool,
    ) -> Vec<Range> {
        let inside = at.has_same_parent_as(&self.start)
            && ((self.start.offset() < at.offset() && at.offset() < self.end.offset())
                || (sticky
                    && (at.offset() == self.start.offset() || at.offset() == self.end.offset())));
        if !inside {
            let end_before = self.is_collapsed();
            return vec![Range {
                start: self.start.transformed_by_insertion(at, how_many, true),
                end: self.end.transformed_by_insertion(at, how_many, end_before),
            }];
        }
        if spread {
            return vec![Range {
                start: self.start.clone(),
                end: self.end.with_offset(self.end.offset() + how_many),
            }];
        }
        vec![
            Range {
                start: self.start.clone(),
                end: at.clone(),
            },
            Range {
                start: at.with_offset(at.offset() + how_many),
                end: self.end.with_offset(self.end.offset() + how_many),
            },
        ]
    }

    /// This flat range after the move of `how_many` offsets from `source` to
    /// `target`. Parts inside the moved content follow it, the rest shifts.
    pub(crate) fn transformed_by_move(
        &self,
        source: &Position,
        target: &Position,
        how_many: usize,
        spread: bool,
        sticky: bool,
    ) -> Vec<Range> {
        let target_after = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());
        let moved = Range::flat(source.clone(), how_many);

        if self.start.has_same_parent_as(source) {
            let mut result = Vec::new();
            for part in self.difference(&moved) {
                let shifted = Range {
                    start: part
                        .start
                        .transformed_by_deletion(source, how_many)
                        .unwrap_or_else(|| source.clone()),
                    end: part
                        .end
                        .transformed_by_deletion(source, how_many)
                        .unwrap_or_else(|| source.clone()),
                };
                result.extend(shifted.transformed_by_insertion(
                    &target_after,
                    how_many,
                    spread,
                    sticky,
                ));
            }
            if let Some(common) = self.intersection(&moved) {
                result.push(Range {
                    start: common.start.combined(source, &target_after),
                    end: common.end.combined(source, &target_after),
                });
            }
            return result;
        }

        if self.start.is_inside(source, how_many) {
            // the whole range lives inside a moved node
            return vec![Range {
                start: self.start.combined(source, &target_after),
                end: self.end.combined(source, &target_after),
            }];
        }

        let shifted = Range {
            start: self
                .start
                .transformed_by_deletion(source, how_many)
                .unwrap_or_else(|| self.start.clone()),
            end: self
                .end
                .transformed_by_deletion(source, how_many)
                .unwrap_or_else(|| self.end.clone()),
        };
        shifted.transformed_by_insertion(&target_after, how_many, spread, sticky)
    }

    /// Marker ends stay put when content is inserted exactly at them.
    pub(crate) fn marker_by_insertion(&self, at: &Position, how_many: usize) -> Range {
        Range {
            start: self.start.transformed_by_insertion(at, how_many, false),
            end: self.end.transformed_by_insertion(at, how_many, false),
        }
        .normalized()
    }

    pub(crate) fn marker_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Range {
        Range {
            start: self
                .start
                .transformed_by_move(source, target, how_many, false, false),
            end: self
                .end
                .transformed_by_move(source, target, how_many, false, false),
        }
        .normalized()
    }

    /// Collapse a range whose ends drifted apart into different roots or the
    /// wrong order.
    fn normalized(self) -> Range {
        match self.end.compare(&self.start) {
            Ok(std::cmp::Ordering::Less) | Err(_) => Range::collapsed(self.start),
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec()).unwrap()
    }

    fn flat(path: &[usize], how_many: usize) -> Range {
        Range::flat(pos(path), how_many)
    }

    #[test]
    fn test_new_rejects_reversed_range() {
        assert!(Range::new(pos(&[0, 4]), pos(&[0, 2])).is_err());
        assert!(Range::new(pos(&[0, 2]), Position::in_root("other", 1)).is_err());
    }

    #[test]
    fn test_intersection_and_difference() {
        let a = flat(&[0, 1], 4);
        let b = flat(&[0, 3], 4);
        assert_eq!(a.intersection(&b), Some(flat(&[0, 3], 2)));
        assert_eq!(a.difference(&b), vec![flat(&[0, 1], 2)]);

        let inner = flat(&[0, 2], 1);
        assert_eq!(a.difference(&inner), vec![flat(&[0, 1], 1), flat(&[0, 3], 2)]);

        let elsewhere = flat(&[1, 2], 1);
        assert_eq!(a.intersection(&elsewhere), None);
    }

    #[test]
    fn test_insertion_splits_or_spreads() {
        let range = flat(&[0, 1], 4);
        let at = pos(&[0, 3]);
        assert_eq!(
            range.transformed_by_insertion(&at, 2, false, false),
            vec![flat(&[0, 1], 2), flat(&[0, 5], 2)]
        );
        assert_eq!(
            range.transformed_by_insertion(&at, 2, true, false),
            vec![flat(&[0, 1], 6)]
        );
        // insertion at the start pushes the range
        assert_eq!(
            range.transformed_by_insertion(&pos(&[0, 1]), 2, true, false),
            vec![flat(&[0, 3], 4)]
        );
        // unless the range is sticky
        assert_eq!(
            range.transformed_by_insertion(&pos(&[0, 1]), 2, true, true),
            vec![flat(&[0, 1], 6)]
        );
    }

    #[test]
    fn test_move_splits_range() {
        // range [0,0..4), move [0,1..3) to [1,0]
        let range = flat(&[0, 0], 4);
        let result = range.transformed_by_move(&pos(&[0, 1]), &pos(&[1, 0]), 2, false, false);
        assert_eq!(result, vec![flat(&[0, 0], 1), flat(&[0, 1], 1), flat(&[1, 0], 2)]);
    }

    #[test]
    fn test_move_relocates_nested_range() {
        let range = flat(&[0, 2, 1], 2);
        // the element at [0, 2] moves to the root level at offset 3
        let result = range.transformed_by_move(&pos(&[0, 2]), &pos(&[3]), 1, false, false);
        assert_eq!(result, vec![flat(&[3, 1], 2)]);
    }
}
