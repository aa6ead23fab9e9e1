//! Calendar quarter keys (`YYYYQn`).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

/// A calendar quarter. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    q: u8,
}

impl Quarter {
    pub fn new(year: i32, q: u8) -> Result<Self, EngineError> {
        if !(1..=4).contains(&q) {
            return Err(EngineError::InvalidQuarter {
                input: format!("{year}Q{q}"),
                reason: "quarter number must be 1-4".into(),
            });
        }
        Ok(Quarter { year, q })
    }

    /// Quarter containing a filing's period-of-report date.
    pub fn from_period_end(date: NaiveDate) -> Self {
        Quarter {
            year: date.year(),
            q: ((date.month0() / 3) + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u8 {
        self.q
    }

    /// Monotonic index; consecutive quarters differ by exactly one.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 4 + i64::from(self.q) - 1
    }

    pub fn next(&self) -> Self {
        if self.q == 4 {
            Quarter {
                year: self.year + 1,
                q: 1,
            }
        } else {
            Quarter {
                year: self.year,
                q: self.q + 1,
            }
        }
    }

    pub fn follows(&self, previous: &Quarter) -> bool {
        self.ordinal() == previous.ordinal() + 1
    }

    /// Number of quarters from `self` to `later`, counting both ends.
    pub fn span_to(&self, later: &Quarter) -> i64 {
        later.ordinal() - self.ordinal() + 1
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.q)
    }
}

impl FromStr for Quarter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: &str| EngineError::InvalidQuarter {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (year_part, q_part) = trimmed
            .split_once(['Q', 'q'])
            .ok_or_else(|| invalid("expected YYYYQn"))?;
        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("year must have four digits"));
        }
        if q_part.len() != 1 || !q_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("quarter must be a single digit"));
        }
        let year: i32 = year_part
            .parse()
            .map_err(|_| invalid("year is not a number"))?;
        let q: u8 = q_part
            .parse()
            .map_err(|_| invalid("quarter is not a number"))?;
        Quarter::new(year, q).map_err(|_| invalid("quarter number must be 1-4"))
    }
}

impl From<Quarter> for String {
    fn from(q: Quarter) -> Self {
        q.to_string()
    }
}

impl TryFrom<String> for Quarter {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
