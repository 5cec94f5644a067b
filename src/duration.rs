//! Duration parsing for parameter values.
//!
//! Accepts the compact unit-suffixed format used on command lines and in
//! environment variables: a sequence of decimal numbers, each followed by a
//! unit, such as `300ms`, `1.5h` or `2h45m`.
//!
//! Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.

use std::time::Duration;

use thiserror::Error;

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The input was empty.
    #[error("invalid duration: empty string")]
    Empty,

    /// A number was not followed by a unit.
    #[error("invalid duration {input:?}: missing unit")]
    MissingUnit {
        /// The full input string
        input: String,
    },

    /// A unit that is not recognized.
    #[error("invalid duration {input:?}: unknown unit {unit:?}")]
    UnknownUnit {
        /// The full input string
        input: String,
        /// The unit found
        unit: String,
    },

    /// A malformed number, or a negative duration.
    #[error("invalid duration {input:?}")]
    Invalid {
        /// The full input string
        input: String,
    },

    /// The value does not fit in a [`Duration`].
    #[error("invalid duration {input:?}: overflow")]
    Overflow {
        /// The full input string
        input: String,
    },
}

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses a duration string such as `1h30m` or `250ms`.
///
/// A bare `0` is accepted without a unit. A leading `+` is allowed;
/// negative durations are rejected.
///
/// # Errors
///
/// Returns a [`DurationError`] describing the first problem found.
///
/// # Example
///
/// ```
/// use paramtree::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid {
        input: input.to_string(),
    };

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    if rest.is_empty() {
        return Err(DurationError::Empty);
    }
    if rest.starts_with('-') {
        return Err(invalid());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let overflow = || DurationError::Overflow {
        input: input.to_string(),
    };

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit {
                input: input.to_string(),
            });
        }
        let factor = NANOS_PER_UNIT
            .iter()
            .find_map(|(name, factor)| (*name == unit).then_some(*factor))
            .ok_or_else(|| DurationError::UnknownUnit {
                input: input.to_string(),
                unit: unit.to_string(),
            })?;

        // Whole units are summed exactly; only the fraction goes through f64.
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let value: f64 = format!("0.{fraction}").parse().map_err(|_| invalid())?;
            (value * factor as f64).round() as u128
        };

        total_nanos = whole
            .checked_mul(factor)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| n.checked_add(total_nanos))
            .ok_or_else(overflow)?;
        rest = next;
    }

    let nanos = u64::try_from(total_nanos).map_err(|_| overflow())?;
    Ok(Duration::from_nanos(nanos))
}

/// Formats a duration in the same compact style accepted by [`parse_duration`].
///
/// Used in usage text, e.g. `refresh every 1m30s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration < Duration::from_secs(1) {
        let nanos = duration.subsec_nanos();
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}us", nanos / 1_000)
        } else {
            format!("{nanos}ns")
        };
    }

    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let millis = duration.subsec_millis();

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || millis > 0 {
        if millis > 0 {
            out.push_str(&format!("{seconds}.{millis:03}s"));
        } else {
            out.push_str(&format!("{seconds}s"));
        }
    }
    out
}
