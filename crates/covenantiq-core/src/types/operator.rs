//! Threshold comparison operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The pass condition of a covenant: `actual <op> threshold`.
///
/// Serialized as its symbol. Parsing also accepts the word forms
/// `less_or_equal`, `less_than`, `greater_or_equal`, `greater_than`, `equal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThresholdOperator {
    /// `actual <= threshold`
    LessOrEqual,
    /// `actual < threshold`
    LessThan,
    /// `actual >= threshold`
    GreaterOrEqual,
    /// `actual > threshold`
    GreaterThan,
    /// `actual == threshold` within a tolerance
    Equal,
}

impl ThresholdOperator {
    /// Every operator.
    pub const ALL: [ThresholdOperator; 5] = [
        ThresholdOperator::LessOrEqual,
        ThresholdOperator::LessThan,
        ThresholdOperator::GreaterOrEqual,
        ThresholdOperator::GreaterThan,
        ThresholdOperator::Equal,
    ];

    /// Symbol form of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            ThresholdOperator::LessOrEqual => "<=",
            ThresholdOperator::LessThan => "<",
            ThresholdOperator::GreaterOrEqual => ">=",
            ThresholdOperator::GreaterThan => ">",
            ThresholdOperator::Equal => "=",
        }
    }

    /// Sign of the direction in which a rising value approaches breach.
    ///
    /// `+1` for upper limits (`<`, `<=`), `-1` for lower limits (`>`, `>=`),
    /// `0` for equality covenants which breach in either direction.
    #[must_use]
    pub const fn breach_direction(self) -> f64 {
        match self {
            ThresholdOperator::LessOrEqual | ThresholdOperator::LessThan => 1.0,
            ThresholdOperator::GreaterOrEqual | ThresholdOperator::GreaterThan => -1.0,
            ThresholdOperator::Equal => 0.0,
        }
    }

    /// Whether `actual` passes the covenant test.
    ///
    /// `tolerance` is an absolute band used only by `Equal`.
    #[must_use]
    pub fn is_satisfied(self, actual: f64, threshold: f64, tolerance: f64) -> bool {
        match self {
            ThresholdOperator::LessOrEqual => actual <= threshold,
            ThresholdOperator::LessThan => actual < threshold,
            ThresholdOperator::GreaterOrEqual => actual >= threshold,
            ThresholdOperator::GreaterThan => actual > threshold,
            ThresholdOperator::Equal => (actual - threshold).abs() <= tolerance,
        }
    }
}

impl fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ThresholdOperator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "<=" | "less_or_equal" => Ok(ThresholdOperator::LessOrEqual),
            "<" | "less_than" => Ok(ThresholdOperator::LessThan),
            ">=" | "greater_or_equal" => Ok(ThresholdOperator::GreaterOrEqual),
            ">" | "greater_than" => Ok(ThresholdOperator::GreaterThan),
            "=" | "==" | "equal" => Ok(ThresholdOperator::Equal),
            _ => Err(CoreError::invalid_operator(s)),
        }
    }
}

impl TryFrom<String> for ThresholdOperator {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThresholdOperator> for String {
    fn from(op: ThresholdOperator) -> Self {
        op.symbol().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols_and_words() {
        assert_eq!("<=".parse::<ThresholdOperator>().unwrap(), ThresholdOperator::LessOrEqual);
        assert_eq!(" > ".parse::<ThresholdOperator>().unwrap(), ThresholdOperator::GreaterThan);
        assert_eq!("==".parse::<ThresholdOperator>().unwrap(), ThresholdOperator::Equal);
        assert_eq!(
            "greater_or_equal".parse::<ThresholdOperator>().unwrap(),
            ThresholdOperator::GreaterOrEqual
        );
        assert_eq!("LESS_THAN".parse::<ThresholdOperator>().unwrap(), ThresholdOperator::LessThan);
    }

    #[test]
    fn test_malformed_operator() {
        let err = "=>".parse::<ThresholdOperator>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperator { .. }));
        assert!("".parse::<ThresholdOperator>().is_err());
    }

    #[test]
    fn test_symbol_round_trip() {
        for op in ThresholdOperator::ALL {
            assert_eq!(op.symbol().parse::<ThresholdOperator>().unwrap(), op);
        }
    }

    #[test]
    fn test_is_satisfied_boundaries() {
        assert!(ThresholdOperator::LessOrEqual.is_satisfied(3.0, 3.0, 0.0));
        assert!(!ThresholdOperator::LessThan.is_satisfied(3.0, 3.0, 0.0));
        assert!(ThresholdOperator::GreaterOrEqual.is_satisfied(1.25, 1.25, 0.0));
        assert!(!ThresholdOperator::GreaterThan.is_satisfied(1.25, 1.25, 0.0));
        assert!(ThresholdOperator::Equal.is_satisfied(1.04, 1.0, 0.05));
        assert!(!ThresholdOperator::Equal.is_satisfied(1.06, 1.0, 0.05));
    }

    #[test]
    fn test_serde_as_symbol() {
        let json = serde_json::to_string(&ThresholdOperator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\">=\"");
        let op: ThresholdOperator = serde_json::from_str("\"less_or_equal\"").unwrap();
        assert_eq!(op, ThresholdOperator::LessOrEqual);
        assert!(serde_json::from_str::<ThresholdOperator>("\"~\"").is_err());
    }
}
