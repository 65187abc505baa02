use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// A duration deserialized from Go-style duration strings, the format
/// upstream timeout fields are written in.
/// Supports: "300ms", "1.5s", "2m", "1h30m", "24h"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(StdDuration);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid duration '{0}'")]
pub struct DurationParseError(String);

impl Duration {
    pub const ZERO: Duration = Duration(StdDuration::ZERO);

    pub fn from_millis(millis: u64) -> Self {
        Duration(StdDuration::from_millis(millis))
    }

    pub fn from_secs(secs: u64) -> Self {
        Duration(StdDuration::from_secs(secs))
    }

    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    pub fn as_std(&self) -> StdDuration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<StdDuration> for Duration {
    fn from(d: StdDuration) -> Self {
        Duration(d)
    }
}

impl From<Duration> for StdDuration {
    fn from(d: Duration) -> Self {
        d.0
    }
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(60 * 60 * 1_000_000_000),
        _ => None,
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a sequence of number+unit segments, e.g. "1h30m5s".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(DurationParseError(s.to_string()));
        }
        if trimmed == "0" {
            return Ok(Duration::ZERO);
        }

        let mut nanos = 0.0f64;
        let mut rest = trimmed;

        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.')
                .ok_or_else(|| DurationParseError(s.to_string()))?;
            if number_len == 0 {
                return Err(DurationParseError(s.to_string()));
            }

            let (number, tail) = rest.split_at(number_len);
            let unit_len = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_len);

            let value: f64 = number
                .parse()
                .map_err(|_| DurationParseError(s.to_string()))?;
            let scale = unit_nanos(unit).ok_or_else(|| DurationParseError(s.to_string()))?;

            nanos += value * scale as f64;
            rest = tail;
        }

        Ok(Duration(StdDuration::from_nanos(nanos as u64)))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let sub_nanos = self.0.subsec_nanos();

        if secs == 0 && sub_nanos == 0 {
            return write!(f, "0s");
        }

        let hours = secs / 3600;
        let minutes = secs % 3600 / 60;
        let seconds = secs % 60;

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if seconds > 0 {
            write!(f, "{}s", seconds)?;
        }

        match sub_nanos {
            0 => {}
            n if n % 1_000_000 == 0 => write!(f, "{}ms", n / 1_000_000)?,
            n if n % 1_000 == 0 => write!(f, "{}us", n / 1_000)?,
            n => write!(f, "{}ns", n)?,
        }

        Ok(())
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> de::Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration string like '10s', '1m30s', '100ms'")
            }

            fn visit_str<E>(self, value: &str) -> Result<Duration, E>
            where
                E: de::Error,
            {
                value.parse().map_err(de::Error::custom)
            }

            // Bare integers are taken as seconds.
            fn visit_u64<E>(self, value: u64) -> Result<Duration, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Duration, E>
            where
                E: de::Error,
            {
                if value < 0 {
                    return Err(de::Error::custom("duration cannot be negative"));
                }
                Ok(Duration::from_secs(value as u64))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
