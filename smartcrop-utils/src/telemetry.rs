//! Scoped timing logs for the crop pipeline.
//!
//! A [`TimingGuard`] measures from creation to drop and logs the elapsed time on the
//! [`TELEMETRY_TARGET`] log target. Guards only log when telemetry has been switched on
//! with [`configure`], the requested level is within the configured threshold, and the
//! logger accepts that level for the target. Inactive guards cost one `Instant::now()`.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

/// Log target used for all timing output.
pub const TELEMETRY_TARGET: &str = "smartcrop::telemetry";

static ENABLED: AtomicBool = AtomicBool::new(false);
static THRESHOLD: AtomicUsize = AtomicUsize::new(LevelFilter::Off as usize);

/// Logs how long a scope took when dropped.
#[must_use = "the guard measures until it is dropped"]
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the guard will log on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the clock without logging.
    pub fn finish(mut self) -> Duration {
        self.active = false;
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            log!(
                target: TELEMETRY_TARGET,
                self.level,
                "{} completed in {:.2?}",
                self.label,
                self.start.elapsed()
            );
        }
    }
}

/// Guard that activates whenever telemetry allows `level`.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(label, level, true)
}

/// Guard that additionally requires the caller's `enabled` flag.
pub fn timing_guard_if(
    label: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    let active =
        enabled && telemetry_allows(level) && log_enabled!(target: TELEMETRY_TARGET, level);
    TimingGuard {
        label: label.into(),
        level,
        start: Instant::now(),
        active,
    }
}

/// Switch telemetry on or off and set the most verbose level it may log at.
pub fn configure(enabled: bool, level: LevelFilter) {
    ENABLED.store(enabled, Ordering::Relaxed);
    THRESHOLD.store(level as usize, Ordering::Relaxed);
}

fn telemetry_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

fn telemetry_level() -> LevelFilter {
    LevelFilter::iter()
        .nth(THRESHOLD.load(Ordering::Relaxed))
        .unwrap_or(LevelFilter::Off)
}

/// True when telemetry is on and `level` is within the configured threshold.
pub fn telemetry_allows(level: Level) -> bool {
    telemetry_enabled() && level <= telemetry_level()
}
