//! Simulated time.

use std::fmt;

use serde::Deserialize;

/// An instant of simulated time, in whole seconds.
///
/// Two sentinels bracket every finite instant: [`Time::NEG_INFINITY`] is the
/// time every component sits at right after initialization, and
/// [`Time::POS_INFINITY`] means "no mandatory update in the future".
///
/// # Examples
///
/// ```
/// use sgt_sim::sim::clock::Time;
///
/// let t = Time::from_secs(3600);
/// assert_eq!(t.offset(1800), Time::from_secs(5400));
/// assert_eq!(Time::POS_INFINITY.offset(-10), Time::POS_INFINITY);
/// assert!(Time::NEG_INFINITY < t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "i64")]
pub struct Time(i64);

impl Time {
    /// Earlier than every finite instant.
    pub const NEG_INFINITY: Self = Self(i64::MIN);
    /// Later than every finite instant.
    pub const POS_INFINITY: Self = Self(i64::MAX);

    /// Largest and smallest finite second counts.
    const MAX_FINITE: i64 = i64::MAX - 1;
    const MIN_FINITE: i64 = i64::MIN + 1;

    /// Creates a finite instant. Values that collide with the sentinels are
    /// clamped to the nearest finite second.
    pub const fn from_secs(secs: i64) -> Self {
        if secs > Self::MAX_FINITE {
            Self(Self::MAX_FINITE)
        } else if secs < Self::MIN_FINITE {
            Self(Self::MIN_FINITE)
        } else {
            Self(secs)
        }
    }

    /// Seconds since the epoch, or `None` for either infinity.
    pub fn as_secs(self) -> Option<i64> {
        self.is_finite().then_some(self.0)
    }

    /// Returns `true` unless this is one of the two sentinels.
    pub fn is_finite(self) -> bool {
        self != Self::NEG_INFINITY && self != Self::POS_INFINITY
    }

    /// Shifts the instant by `secs`. Infinities absorb the offset.
    pub fn offset(self, secs: i64) -> Self {
        if !self.is_finite() {
            return self;
        }
        Self::from_secs(self.0.saturating_add(secs))
    }

    /// Elapsed hours from `earlier` to `self`; zero if either is infinite
    /// or `earlier` is not actually earlier.
    pub fn hours_since(self, earlier: Self) -> f32 {
        match (self.as_secs(), earlier.as_secs()) {
            (Some(now), Some(then)) if now > then => (now - then) as f32 / 3600.0,
            _ => 0.0,
        }
    }

    /// Hour of the (UTC) day in `[0, 24)`, or `None` for either infinity.
    pub fn hour_of_day(self) -> Option<f32> {
        self.as_secs()
            .map(|secs| secs.rem_euclid(86_400) as f32 / 3600.0)
    }
}

/// Defaults to [`Time::NEG_INFINITY`], the time of a model nobody has run.
impl Default for Time {
    fn default() -> Self {
        Self::NEG_INFINITY
    }
}

impl From<i64> for Time {
    fn from(secs: i64) -> Self {
        Self::from_secs(secs)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NEG_INFINITY => write!(f, "-inf"),
            Self::POS_INFINITY => write!(f, "+inf"),
            Self(secs) => write!(f, "{secs}s"),
        }
    }
}
