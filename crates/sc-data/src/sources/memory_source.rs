//! In-memory series

use sc_core::{LoadHandle, Range, Sample, SeriesLoader};

/// Serves samples from a sorted vector and reports its key bounds.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    samples: Vec<Sample>,
}

impl MemorySource {
    /// Create a source from unordered samples. For duplicate keys the last
    /// sample wins.
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.reverse();
        samples.sort_by_key(|sample| sample.x);
        samples.dedup_by_key(|sample| sample.x);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Key range spanned by the samples
    pub fn bounds(&self) -> Range {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Range::new(first.x, last.x),
            _ => Range::EMPTY,
        }
    }

    /// Samples whose key lies in `range`
    pub fn slice(&self, range: Range) -> &[Sample] {
        if range.is_empty() {
            return &[];
        }
        let from = self.samples.partition_point(|s| s.x < range.start);
        let to = self.samples.partition_point(|s| s.x <= range.end);
        &self.samples[from..to.max(from)]
    }
}

impl SeriesLoader for MemorySource {
    fn load(&self, range: Range, mut handle: LoadHandle) {
        let bounds = self.bounds();
        if !bounds.is_empty() {
            handle.report_min_key(bounds.start);
            handle.report_max_key(bounds.end);
        }
        for sample in self.slice(range) {
            handle.point_loaded(sample.x, sample.y);
        }
        handle.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_dedups() {
        let source = MemorySource::new(vec![
            Sample::new(3, 30),
            Sample::new(1, 10),
            Sample::new(3, 31),
            Sample::new(2, 20),
        ]);
        assert_eq!(source.len(), 3);
        assert_eq!(source.bounds(), Range::new(1, 3));
        assert_eq!(source.slice(Range::new(2, 3)), &[Sample::new(2, 20), Sample::new(3, 31)]);
        assert!(source.slice(Range::new(4, 9)).is_empty());
        assert!(source.slice(Range::EMPTY).is_empty());
    }

    #[test]
    fn empty_source_has_no_bounds() {
        let source = MemorySource::default();
        assert!(source.is_empty());
        assert_eq!(source.bounds(), Range::EMPTY);
    }
}
