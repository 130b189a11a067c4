//! Progress reporting and cooperative cancellation.
//!
//! The engine reports a single fraction in `[0, 1]` built from fixed phase
//! weights and polls for cancellation at interruption points: once per line
//! of a group file and once per output row.

use crate::domain::{GroupingError, GroupingResult};
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const PARSING_WEIGHT: f64 = 0.25;
pub const COMBINING_WEIGHT: f64 = 0.75;

pub trait ProgressReporter {
    fn report_progress(&self, fraction: f64);

    fn check_cancelled(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report_progress(&self, _fraction: f64) {}
}

#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for CancellationToken {
    fn report_progress(&self, _fraction: f64) {}

    fn check_cancelled(&self) -> bool {
        self.is_cancelled()
    }
}

/// Forwards progress to a closure and cancellation to a token.
pub struct CallbackProgress<F> {
    callback: F,
    cancel: CancellationToken,
}

impl<F> CallbackProgress<F>
where
    F: Fn(f64),
{
    pub fn new(callback: F, cancel: CancellationToken) -> Self {
        Self { callback, cancel }
    }
}

impl<F> ProgressReporter for CallbackProgress<F>
where
    F: Fn(f64),
{
    fn report_progress(&self, fraction: f64) {
        (self.callback)(fraction);
    }

    fn check_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One phase's slice of the overall progress bar.
pub struct PhaseProgress<'a> {
    reporter: &'a dyn ProgressReporter,
    phase: &'static str,
    start: f64,
    span: f64,
    last: Cell<f64>,
}

impl<'a> PhaseProgress<'a> {
    pub fn new(
        reporter: &'a dyn ProgressReporter,
        phase: &'static str,
        start: f64,
        span: f64,
    ) -> Self {
        Self {
            reporter,
            phase,
            start,
            span,
            last: Cell::new(start),
        }
    }

    /// `fraction` is relative to this phase. Reports never move backwards.
    pub fn advance(&self, fraction: f64) {
        let overall = (self.start + self.span * fraction.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        if overall > self.last.get() {
            self.last.set(overall);
            self.reporter.report_progress(overall);
        }
    }

    pub fn finish(&self) {
        self.advance(1.0);
    }

    pub fn interruption_point(&self) -> GroupingResult<()> {
        if self.reporter.check_cancelled() {
            return Err(GroupingError::cancelled(self.phase));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CallbackProgress, CancellationToken, NoProgress, PhaseProgress};
    use std::cell::RefCell;

    #[test]
    fn phase_progress_is_monotonic_and_weighted() {
        let seen = RefCell::new(Vec::new());
        let reporter = CallbackProgress::new(
            |fraction| seen.borrow_mut().push(fraction),
            CancellationToken::new(),
        );
        let phase = PhaseProgress::new(&reporter, "combining", 0.25, 0.75);

        phase.advance(0.5);
        phase.advance(0.2);
        phase.advance(2.0);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!((seen[0] - 0.625).abs() < 1.0e-12);
        assert!((seen[1] - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn interruption_point_reports_cancellation() {
        let token = CancellationToken::new();
        let phase = PhaseProgress::new(&token, "parsing", 0.0, 0.25);
        assert!(phase.interruption_point().is_ok());

        token.cancel();
        let error = phase
            .interruption_point()
            .expect_err("cancelled token should stop the phase");
        assert!(error.is_cancelled());
        assert!(error.message().contains("parsing"));
    }

    #[test]
    fn no_progress_never_cancels() {
        let phase = PhaseProgress::new(&NoProgress, "parsing", 0.0, 1.0);
        phase.finish();
        assert!(phase.interruption_point().is_ok());
    }
}
