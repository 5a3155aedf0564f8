//! Duration strings
//!
//! Parses timeouts such as `500`, `100ms`, `5.5s` or `1h 2m03s 100ms` into a
//! [`Duration`]. Each unit may appear once; a bare number is only accepted
//! when it is the whole input, and is read in the parser's default unit.

use crate::error::DurationError;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

/// One `<number><unit>` pair. Tokens must be covered by consecutive matches.
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<num>[-+]?[0-9.]+)(?P<unit>[A-Za-z]*)")
        .expect("PAIR_RE regex should compile")
});

/// Time units accepted in duration strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Length of one unit in milliseconds
    pub fn millis(&self) -> u64 {
        match self {
            Self::Days => 24 * 60 * 60 * 1000,
            Self::Hours => 60 * 60 * 1000,
            Self::Minutes => 60 * 1000,
            Self::Seconds => 1000,
            Self::Milliseconds => 1,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Days => "d",
            Self::Hours => "h",
            Self::Minutes => "m",
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "d" => Ok(Self::Days),
            "h" => Ok(Self::Hours),
            "m" => Ok(Self::Minutes),
            "s" => Ok(Self::Seconds),
            "ms" => Ok(Self::Milliseconds),
            other => Err(DurationError::UnknownUnit {
                unit: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Duration parser with a default unit for bare numbers
#[derive(Debug, Clone, Copy)]
pub struct DurationParser {
    default_unit: TimeUnit,
}

impl Default for DurationParser {
    fn default() -> Self {
        Self::new(TimeUnit::Milliseconds)
    }
}

impl DurationParser {
    pub fn new(default_unit: TimeUnit) -> Self {
        Self { default_unit }
    }

    pub fn default_unit(&self) -> TimeUnit {
        self.default_unit
    }

    /// Parse a whitespace-separated duration string.
    ///
    /// Blank input parses to zero; callers reject it before it gets here.
    pub fn parse(&self, input: &str) -> Result<Duration, DurationError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let mut seen: Vec<TimeUnit> = Vec::new();
        let mut total = Duration::ZERO;

        for token in &tokens {
            let mut end = 0;
            for caps in PAIR_RE.captures_iter(token) {
                let (Some(pair), Some(num), Some(unit)) =
                    (caps.get(0), caps.name("num"), caps.name("unit"))
                else {
                    continue;
                };
                if pair.start() != end {
                    return Err(unmatched(token));
                }
                end = pair.end();

                let unit = match unit.as_str() {
                    "" if tokens.len() == 1 => self.default_unit,
                    "" => {
                        return Err(DurationError::MissingUnit {
                            token: token.to_string(),
                        })
                    }
                    suffix => suffix.parse()?,
                };
                if seen.contains(&unit) {
                    return Err(DurationError::DuplicateUnit {
                        unit: unit.to_string(),
                    });
                }
                seen.push(unit);

                let part = amount(num.as_str(), token, unit)
                    .ok_or_else(|| overflow(input))??;
                total = total.checked_add(part).ok_or_else(|| overflow(input))?;
            }
            if end != token.len() {
                return Err(unmatched(token));
            }
        }

        Ok(total)
    }

    /// Interpret an already numeric value in the default unit.
    pub fn parse_number(&self, value: f64) -> Result<Duration, DurationError> {
        let text = value.to_string();
        if value < 0.0 {
            return Err(DurationError::Negative {
                number: text.clone(),
                token: text,
            });
        }
        amount(&text, &text, self.default_unit).ok_or_else(|| overflow(&text))?
    }
}

/// Convert one number to a duration in `unit`.
///
/// Returns `None` on overflow. Integral numbers are computed exactly,
/// fractional ones are rounded to the nearest nanosecond.
fn amount(number: &str, token: &str, unit: TimeUnit) -> Option<Result<Duration, DurationError>> {
    if number.starts_with('-') {
        return Some(Err(DurationError::Negative {
            number: number.to_string(),
            token: token.to_string(),
        }));
    }
    let invalid = || DurationError::InvalidNumber {
        number: number.to_string(),
        token: token.to_string(),
    };

    if number.contains('.') {
        let value: f64 = match number.parse() {
            Ok(value) => value,
            Err(_) => return Some(Err(invalid())),
        };
        let nanos = (value * unit.millis() as f64 * 1_000_000.0).round();
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return None;
        }
        Some(Ok(Duration::from_nanos(nanos as u64)))
    } else {
        let value: u64 = match number.parse() {
            Ok(value) => value,
            Err(_) => return Some(Err(invalid())),
        };
        value
            .checked_mul(unit.millis())
            .map(|ms| Ok(Duration::from_millis(ms)))
    }
}

fn unmatched(token: &str) -> DurationError {
    DurationError::Unmatched {
        token: token.to_string(),
    }
}

fn overflow(input: &str) -> DurationError {
    DurationError::Overflow {
        input: input.to_string(),
    }
}
