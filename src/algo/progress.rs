//! Progress reporting for the layout pipeline.
//!
//! The pipeline runs in fixed stages (cross field, singularities, cut graph,
//! potentials, separatrices, assembly). Each stage reports its own sub-progress
//! inside the slice of the total that belongs to it.
//!
//! ```
//! use quadlayout::algo::progress::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("[{}/{}] {}", current, total, message);
//! });
//! progress.report_sub(5, 10, 0, 6, "relaxing cross field");
//! ```

/// A progress callback receiving `(current, total, message)` updates.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report `sub_current / sub_total` of stage `stage` out of `stages`.
    ///
    /// The stage occupies `[stage, stage + 1)` of the overall range, reported
    /// in thousandths so the callback only sees integers.
    #[inline]
    pub fn report_sub(&self, sub_current: usize, sub_total: usize, stage: usize, stages: usize, message: &str) {
        if sub_total == 0 || stages == 0 {
            return;
        }
        let fraction = (sub_current.min(sub_total) * 1000) / sub_total;
        (self.callback)(stage * 1000 + fraction, stages * 1000, message);
    }

    /// Report that stage `stage` out of `stages` has started.
    #[inline]
    pub fn begin_stage(&self, stage: usize, stages: usize, message: &str) {
        self.report_sub(0, 1, stage, stages, message);
    }

    /// A reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_report_sub_maps_into_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |c, t, _| sink.lock().unwrap().push((c, t)));

        progress.report_sub(1, 2, 2, 6, "half of stage 2");
        progress.begin_stage(3, 6, "stage 3");
        progress.report_sub(1, 0, 0, 6, "ignored");

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(2500, 6000), (3000, 6000)]);
    }
}
