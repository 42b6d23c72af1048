//! Tracking which key ranges of a series are already loaded

use crate::range::Range;

/// Sorted set of disjoint, non-adjacent inclusive ranges.
///
/// Invariant: for consecutive ranges `a`, `b`: `a.end + 1 < b.start`.
/// Coverage only grows through [`add`](Self::add) and only shrinks through
/// [`keep_only`](Self::keep_only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTracker {
    ranges: Vec<Range>,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored ranges, ascending by start.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Number of keys covered, saturating.
    pub fn covered_len(&self) -> u64 {
        self.ranges.iter().fold(0u64, |total, range| {
            total.saturating_add(range.size().unsigned_abs().saturating_add(1))
        })
    }

    /// Record `range` as covered, fusing it with overlapping or adjacent ranges.
    pub fn add(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        let idx = self.ranges.partition_point(|r| r.start <= range.start);
        let pos = match idx.checked_sub(1) {
            Some(prev) if self.ranges[prev].end >= range.end => return,
            Some(prev) if self.ranges[prev].end.saturating_add(1) >= range.start => {
                self.ranges[prev].end = range.end;
                prev
            }
            _ => {
                self.ranges.insert(idx, range);
                idx
            }
        };

        let end = self.ranges[pos].end;
        let absorbed = self.ranges[pos + 1..]
            .iter()
            .take_while(|next| next.start <= end.saturating_add(1))
            .count();
        if absorbed > 0 {
            let last_end = self.ranges[pos + absorbed].end;
            self.ranges[pos].end = end.max(last_end);
            self.ranges.drain(pos + 1..=pos + absorbed);
        }
    }

    /// Whether a single stored range covers all of `target`.
    pub fn contains(&self, target: Range) -> bool {
        if target.is_empty() {
            return true;
        }
        let idx = self.ranges.partition_point(|r| r.start <= target.start);
        idx.checked_sub(1)
            .is_some_and(|prev| self.ranges[prev].end >= target.end)
    }

    /// Intersect the stored set with `range`.
    pub fn keep_only(&mut self, range: Range) {
        if range.is_empty() {
            self.ranges.clear();
            return;
        }
        let first = self.ranges.partition_point(|r| r.end < range.start);
        let last = self.ranges.partition_point(|r| r.start <= range.end);
        if first >= last {
            self.ranges.clear();
            return;
        }
        self.ranges.truncate(last);
        self.ranges.drain(..first);
        if let Some(head) = self.ranges.first_mut() {
            head.start = head.start.max(range.start);
        }
        if let Some(tail) = self.ranges.last_mut() {
            tail.end = tail.end.min(range.end);
        }
    }

    /// Sub-ranges of `target` not covered yet, sorted and disjoint.
    pub fn get_missing(&self, target: Range) -> Vec<Range> {
        let mut missing = Vec::new();
        if target.is_empty() {
            return missing;
        }
        let mut cursor = target.start;
        let first = self.ranges.partition_point(|r| r.end < target.start);
        for covered in &self.ranges[first..] {
            if covered.start > target.end {
                break;
            }
            if covered.start > cursor {
                missing.push(Range::new(cursor, covered.start - 1));
            }
            match covered.end.checked_add(1) {
                Some(next) if covered.end < target.end => cursor = next,
                _ => return missing,
            }
        }
        missing.push(Range::new(cursor, target.end));
        missing
    }
}
