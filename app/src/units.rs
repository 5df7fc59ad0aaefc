//! Base units and their human-scaled display.

use std::fmt;
use std::str::FromStr;

use err_derive::Error;
use serde::{Deserialize, Serialize};

/// The base unit a quantity is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "ml")]
    Millilitre,
    #[serde(rename = "piece")]
    Piece,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(display = "unknown unit {:?} (expected g, ml or piece)", _0)]
pub struct UnitParseError(pub String);

struct DisplayRule {
    threshold: f64,
    divisor: f64,
    label: &'static str,
}

const MASS_RULES: &[DisplayRule] = &[DisplayRule {
    threshold: 1000.0,
    divisor: 1000.0,
    label: "kg",
}];
const VOLUME_RULES: &[DisplayRule] = &[DisplayRule {
    threshold: 1000.0,
    divisor: 1000.0,
    label: "L",
}];

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Gram, Unit::Millilitre, Unit::Piece];

    pub fn label(self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Millilitre => "ml",
            Unit::Piece => "piece",
        }
    }

    /// Default unit for raw ingredients.
    pub fn mass() -> Self {
        Unit::Gram
    }

    /// Default unit for product yields.
    pub fn count() -> Self {
        Unit::Piece
    }

    fn display_rules(self) -> &'static [DisplayRule] {
        match self {
            Unit::Gram => MASS_RULES,
            Unit::Millilitre => VOLUME_RULES,
            Unit::Piece => &[],
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.label())
    }
}

impl FromStr for Unit {
    type Err = UnitParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .iter()
            .copied()
            .find(|u| u.label() == src)
            .ok_or_else(|| UnitParseError(src.to_string()))
    }
}

/// Renders `value` in the largest display unit whose threshold it meets,
/// e.g. `1500 g` as `1.50 kg`. Unscaled values are printed as-is.
pub fn format_display_unit(value: f64, unit: Unit) -> String {
    for rule in unit.display_rules() {
        if value.abs() >= rule.threshold {
            return format!("{:.2} {}", value / rule.divisor, rule.label);
        }
    }
    format!("{} {}", value, unit)
}

/// As [`format_display_unit`], for a label that may not name a known unit.
/// Unknown labels are passed through unchanged.
pub fn format_display_label(value: f64, label: &str) -> String {
    match label.parse::<Unit>() {
        Ok(unit) => format_display_unit(value, unit),
        Err(_) => format!("{} {}", value, label),
    }
}

/// Rounds to the cent, with halves going up toward positive infinity.
pub fn format_currency(value: f64, currency: &str) -> String {
    let rounded = (value * 100.0 + 0.5).floor() / 100.0;
    format!("{} {}", rounded, currency)
}
