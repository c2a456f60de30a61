// External imports
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Internal imports
use crate::error::ModuleError;

/// Base unit of a sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    Day,
    BusinessDay,
    Week,
    Month,
    Quarter,
    Year,
}

impl FrequencyUnit {
    /// Length of the unit in seconds, for units of fixed length.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            Self::Second => Some(1),
            Self::Minute => Some(60),
            Self::Hour => Some(3_600),
            Self::Day | Self::BusinessDay => Some(86_400),
            Self::Week => Some(7 * 86_400),
            Self::Month | Self::Quarter | Self::Year => None,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Second => "S",
            Self::Minute => "min",
            Self::Hour => "H",
            Self::Day => "D",
            Self::BusinessDay => "B",
            Self::Week => "W",
            Self::Month => "M",
            Self::Quarter => "Q",
            Self::Year => "Y",
        }
    }
}

/// A sampling frequency such as `1H`, `15min` or `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frequency {
    pub multiple: u64,
    pub unit: FrequencyUnit,
}

impl Frequency {
    pub fn new(multiple: u64, unit: FrequencyUnit) -> Self {
        Self { multiple, unit }
    }
}

impl FromStr for Frequency {
    type Err = ModuleError;

    fn from_str(freq: &str) -> Result<Self, Self::Err> {
        let trimmed = freq.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, name) = trimmed.split_at(split);

        let multiple = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u64>()
                .map_err(|_| ModuleError::UnsupportedFrequency(freq.to_string()))?
        };
        if multiple == 0 {
            return Err(ModuleError::UnsupportedFrequency(freq.to_string()));
        }

        // Anchored aliases such as "W-SUN" or "Q-DEC" keep their base unit
        let base = name.split('-').next().unwrap_or(name);
        let unit = match base {
            "S" | "s" => FrequencyUnit::Second,
            "T" | "min" => FrequencyUnit::Minute,
            "H" | "h" => FrequencyUnit::Hour,
            "D" => FrequencyUnit::Day,
            "B" => FrequencyUnit::BusinessDay,
            "W" => FrequencyUnit::Week,
            "M" | "MS" | "ME" => FrequencyUnit::Month,
            "Q" | "QS" | "QE" => FrequencyUnit::Quarter,
            "A" | "Y" | "AS" | "YS" | "YE" => FrequencyUnit::Year,
            _ => return Err(ModuleError::UnsupportedFrequency(freq.to_string())),
        };

        Ok(Self { multiple, unit })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.multiple, self.unit.suffix())
    }
}
