//! Inclusive key ranges

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// A single sample of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub x: i64,
    pub y: i64,
}

impl Sample {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Key range with inclusive bounds on both ends.
///
/// A range is empty when `start > end`. [`Range::EMPTY`] is the canonical
/// empty value returned wherever "no range" has to be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: i64,
    pub end: i64,
}

impl Range {
    /// The canonical empty range.
    pub const EMPTY: Range = Range {
        start: i64::MAX,
        end: i64::MIN,
    };

    /// Create a range. Bounds are kept as given, so `start > end` is empty.
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range covering a single key.
    pub const fn point(x: i64) -> Self {
        Self { start: x, end: x }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Distance between the bounds (`end - start`), saturating. Empty
    /// ranges have size 0, the same as a single key.
    pub fn size(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        self.end.saturating_sub(self.start)
    }

    /// Move both bounds by `delta`, saturating at the `i64` limits.
    pub fn shift(&self, delta: i64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value <= self.end
    }

    /// Whether `other` lies entirely inside this range. The empty range is
    /// contained in everything.
    pub fn contains_range(&self, other: &Range) -> bool {
        other.is_empty() || (self.start <= other.start && other.end <= self.end)
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start <= other.end
            && other.start <= self.end
    }

    /// Intersection of both ranges, [`Range::EMPTY`] when disjoint.
    pub fn intersect(&self, other: &Range) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            Self::EMPTY
        } else {
            Self { start, end }
        }
    }

    /// Smallest range covering both. Empty inputs are ignored.
    pub fn span_union(&self, other: &Range) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Self::EMPTY,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Self {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
        }
    }

    /// Grow by `pages` page widths on each side, one page being `size() + 1`.
    pub fn expand_by_pages(&self, pages: u32) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let page = self.size().saturating_add(1);
        let margin = page.saturating_mul(i64::from(pages));
        Self {
            start: self.start.saturating_sub(margin),
            end: self.end.saturating_add(margin),
        }
    }

    /// Expand outward so both bounds land on a multiple of `step`.
    ///
    /// A bound whose outward multiple does not fit in `i64` is clamped to
    /// `i64::MIN` or `i64::MAX` instead.
    pub fn pad_by(&self, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(CacheError::InvalidStep(step));
        }
        if self.is_empty() {
            return Ok(*self);
        }
        let low = self.start.rem_euclid(step);
        let start = self.start.checked_sub(low).unwrap_or(i64::MIN);
        let rem = self.end.rem_euclid(step);
        let end = if rem == 0 {
            self.end
        } else {
            self.end.checked_add(step - rem).unwrap_or(i64::MAX)
        };
        Ok(Self { start, end })
    }

    /// Smallest multiple of `step` that is `>= start` and still inside the
    /// range, or `None` if there is none.
    pub fn first_step_value(&self, step: i64) -> Result<Option<i64>> {
        if step <= 0 {
            return Err(CacheError::InvalidStep(step));
        }
        if self.is_empty() {
            return Ok(None);
        }
        let rem = self.start.rem_euclid(step);
        let first = if rem == 0 {
            Some(self.start)
        } else {
            self.start.checked_add(step - rem)
        };
        Ok(first.filter(|value| *value <= self.end))
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sentinel_is_distinct() {
        assert!(Range::EMPTY.is_empty());
        assert!(Range::new(5, 4).is_empty());
        assert_ne!(Range::new(5, 4), Range::EMPTY);
        assert!(!Range::point(0).is_empty());
        assert_eq!(Range::default(), Range::EMPTY);
    }

    #[test]
    fn size_and_shift() {
        let range = Range::new(-3, 7);
        assert_eq!(range.size(), 10);
        assert_eq!(Range::point(4).size(), 0);
        assert_eq!(Range::EMPTY.size(), 0);
        assert_eq!(Range::new(9, 2).size(), 0);
        assert_eq!(Range::new(i64::MIN, i64::MAX).size(), i64::MAX);
        assert_eq!(range.shift(5), Range::new(2, 12));
        assert_eq!(Range::new(i64::MAX - 1, i64::MAX).shift(10), Range::new(i64::MAX, i64::MAX));
        assert_eq!(Range::EMPTY.shift(3), Range::EMPTY);
    }

    #[test]
    fn intersect_and_union() {
        let a = Range::new(0, 10);
        let b = Range::new(5, 20);
        assert_eq!(a.intersect(&b), Range::new(5, 10));
        assert_eq!(a.intersect(&Range::new(11, 12)), Range::EMPTY);
        assert_eq!(a.span_union(&Range::new(20, 30)), Range::new(0, 30));
        assert_eq!(Range::EMPTY.span_union(&a), a);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&Range::EMPTY));
        assert!(a.contains_range(&Range::new(2, 3)));
        assert!(a.contains_range(&Range::EMPTY));
        assert!(!a.contains_range(&b));
    }

    #[test]
    fn expand_by_pages_uses_inclusive_width() {
        let range = Range::new(-100, 100);
        assert_eq!(range.expand_by_pages(1), Range::new(-301, 301));
        assert_eq!(range.expand_by_pages(0), range);
        assert_eq!(Range::new(0, i64::MAX).expand_by_pages(2), Range::new(-i64::MAX, i64::MAX));
    }

    #[test]
    fn pad_by_rounds_outward() {
        assert_eq!(Range::new(3, 17).pad_by(5).unwrap(), Range::new(0, 20));
        assert_eq!(Range::new(-7, -1).pad_by(5).unwrap(), Range::new(-10, 0));
        assert_eq!(Range::new(10, 20).pad_by(10).unwrap(), Range::new(10, 20));
        assert_eq!(Range::new(0, 1).pad_by(0), Err(CacheError::InvalidStep(0)));
        assert_eq!(Range::new(0, 1).pad_by(-2), Err(CacheError::InvalidStep(-2)));
    }

    #[test]
    fn pad_by_clamps_at_key_limits() {
        assert_eq!(
            Range::point(i64::MAX).pad_by(2).unwrap(),
            Range::new(i64::MAX - 1, i64::MAX)
        );
        assert_eq!(
            Range::point(i64::MIN).pad_by(3).unwrap(),
            Range::new(i64::MIN, i64::MIN + 2)
        );
        assert_eq!(
            Range::new(i64::MIN, i64::MAX).pad_by(7).unwrap(),
            Range::new(i64::MIN, i64::MAX)
        );
        let padded = Range::new(i64::MIN + 1, i64::MAX - 1).pad_by(1 << 62).unwrap();
        assert_eq!(padded, Range::new(i64::MIN, i64::MAX));
    }

    #[test]
    fn first_step_value_inside_range() {
        assert_eq!(Range::new(3, 17).first_step_value(5).unwrap(), Some(5));
        assert_eq!(Range::new(-7, 17).first_step_value(5).unwrap(), Some(-5));
        assert_eq!(Range::new(10, 20).first_step_value(10).unwrap(), Some(10));
        assert_eq!(Range::new(1, 4).first_step_value(5).unwrap(), None);
        assert_eq!(Range::new(i64::MAX - 1, i64::MAX).first_step_value(1 << 62).unwrap(), None);
        assert!(Range::new(0, 1).first_step_value(-1).is_err());
    }
}
