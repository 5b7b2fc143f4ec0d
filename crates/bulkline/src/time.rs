use std::time::{SystemTime, UNIX_EPOCH};

/// A trait for time sources used to stamp bulks.
///
/// The unit is **seconds** since the Unix epoch. Bulks only need
/// seconds-resolution timestamps, and a plug-in source lets tests control
/// exactly when a bulk "started".
///
/// # Example
///
/// ```
/// use bulkline::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_secs(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_secs(), 1234);
/// ```
pub trait TimeSource: Send + Sync {
    /// Returns the current time in seconds since the Unix epoch.
    fn current_secs(&self) -> u64;
}

/// Wall-clock time source backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_secs(&self) -> u64 {
        // A clock set before 1970 is reported as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}
