//! Closure-backed loader

use sc_core::{LoadHandle, Range, SeriesLoader};

/// Loader that forwards every request to a closure.
///
/// The closure owns the handle and may finish it later from another thread.
pub struct FnLoader<F> {
    load: F,
}

impl<F> FnLoader<F>
where
    F: Fn(Range, LoadHandle) + Send + Sync,
{
    pub fn new(load: F) -> Self {
        Self { load }
    }
}

impl<F> SeriesLoader for FnLoader<F>
where
    F: Fn(Range, LoadHandle) + Send + Sync,
{
    fn load(&self, range: Range, handle: LoadHandle) {
        (self.load)(range, handle);
    }
}
