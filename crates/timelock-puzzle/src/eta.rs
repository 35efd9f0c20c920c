//! Remaining-time estimates on a human time scale.
use std::fmt;
use std::time::Duration;

pub const SECOND: f64 = 1.0;
pub const MINUTE: f64 = 60.0 * SECOND;
pub const HOUR: f64 = 60.0 * MINUTE;
pub const DAY: f64 = 24.0 * HOUR;
pub const MONTH: f64 = 31.0 * DAY;
pub const YEAR: f64 = 365.0 * DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => SECOND,
            TimeUnit::Minutes => MINUTE,
            TimeUnit::Hours => HOUR,
            TimeUnit::Days => DAY,
            TimeUnit::Months => MONTH,
            TimeUnit::Years => YEAR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Picks the unit a duration of `seconds` is reported in.
    pub fn bucket(seconds: f64) -> TimeUnit {
        if seconds < 100.0 * SECOND {
            TimeUnit::Seconds
        } else if seconds < 100.0 * MINUTE {
            TimeUnit::Minutes
        } else if seconds < 100.0 * HOUR {
            TimeUnit::Hours
        } else if seconds < 60.0 * DAY {
            TimeUnit::Days
        } else if seconds < 20.0 * MONTH {
            TimeUnit::Months
        } else {
            TimeUnit::Years
        }
    }
}

/// Estimated time left for a solve. Ordered by length; an unknown estimate
/// sorts after every known one.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Eta {
    seconds: f64,
}

impl Eta {
    pub fn unknown() -> Self {
        Eta {
            seconds: f64::INFINITY,
        }
    }

    pub fn is_known(&self) -> bool {
        self.seconds.is_finite()
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn unit(&self) -> Option<TimeUnit> {
        self.is_known().then(|| TimeUnit::bucket(self.seconds))
    }

    /// Whole number of units, truncated.
    pub fn value(&self) -> Option<u64> {
        self.unit()
            .map(|unit| (self.seconds / unit.seconds()).floor() as u64)
    }

    /// `None` when unknown or beyond what a `Duration` can hold.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.seconds).ok()
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value(), self.unit()) {
            (Some(value), Some(unit)) => write!(f, "{} {}", value, unit.name()),
            _ => f.write_str("unknown"),
        }
    }
}

/// Time to finish `remaining` squarings at `speed` squarings per second.
pub fn eta(remaining: u64, speed: f64) -> Eta {
    if speed.is_nan() || speed <= 0.0 || speed.is_infinite() {
        return Eta::unknown();
    }
    Eta {
        seconds: remaining as f64 / speed,
    }
}
