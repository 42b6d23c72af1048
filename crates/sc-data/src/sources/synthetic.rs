//! Generated series, handy for demos and tests

use sc_core::{CacheError, LoadHandle, Range, SeriesLoader};

use super::CANCEL_CHECK_INTERVAL;

type Generator = Box<dyn Fn(i64) -> i64 + Send + Sync>;

/// Produces one sample at every multiple of `step`, with `y = generator(x)`.
pub struct SyntheticSource {
    step: i64,
    bounds: Option<Range>,
    generator: Generator,
}

impl SyntheticSource {
    /// Create a generated source. `step` must be positive.
    pub fn new(
        step: i64,
        generator: impl Fn(i64) -> i64 + Send + Sync + 'static,
    ) -> Result<Self, CacheError> {
        if step <= 0 {
            return Err(CacheError::InvalidStep(step));
        }
        Ok(Self {
            step,
            bounds: None,
            generator: Box::new(generator),
        })
    }

    /// Sine wave with the given amplitude and period, both in key units.
    pub fn sine(step: i64, amplitude: i64, period: i64) -> Result<Self, CacheError> {
        let period = period.max(1) as f64;
        Self::new(step, move |x| {
            let phase = (x as f64 / period) * std::f64::consts::TAU;
            (phase.sin() * amplitude as f64).round() as i64
        })
    }

    /// Restrict the series to `bounds` and report them to the coordinator.
    pub fn with_bounds(mut self, bounds: Range) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn step(&self) -> i64 {
        self.step
    }
}

impl SeriesLoader for SyntheticSource {
    fn load(&self, range: Range, mut handle: LoadHandle) {
        let range = match self.bounds {
            Some(bounds) => {
                handle.report_min_key(bounds.start);
                handle.report_max_key(bounds.end);
                range.intersect(&bounds)
            }
            None => range,
        };

        let first = match range.first_step_value(self.step) {
            Ok(first) => first,
            Err(err) => return handle.fail(err.to_string()),
        };
        let mut next = first;
        let mut emitted = 0usize;
        while let Some(x) = next {
            if x > range.end {
                break;
            }
            handle.point_loaded(x, (self.generator)(x));
            emitted += 1;
            if emitted % CANCEL_CHECK_INTERVAL == 0 && handle.is_cancelled() {
                break;
            }
            next = x.checked_add(self.step);
        }
        handle.finish();
    }
}
