//! Fixed discount code table.
//!
//! Codes are validated locally; there is no remote promotion service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A known discount code and the fraction of the subtotal it removes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Canonical (upper-case) code.
    pub code: String,
    /// Fraction of the subtotal, e.g. `0.10` for 10%.
    pub rate: Decimal,
}

/// Lookup table of accepted codes.
#[derive(Debug, Clone)]
pub struct DiscountTable {
    codes: Vec<DiscountCode>,
}

impl DiscountTable {
    /// Build a table from `(code, percent)` pairs.
    #[must_use]
    pub fn from_percentages(entries: &[(&str, u32)]) -> Self {
        let codes = entries
            .iter()
            .map(|(code, percent)| DiscountCode {
                code: code.to_ascii_uppercase(),
                rate: Decimal::from(*percent) / Decimal::ONE_HUNDRED,
            })
            .collect();
        Self { codes }
    }

    /// Find a code, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn lookup(&self, input: &str) -> Option<&DiscountCode> {
        let wanted = input.trim();
        self.codes
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(wanted))
    }
}

impl Default for DiscountTable {
    fn default() -> Self {
        Self::from_percentages(&[("SAVE10", 10), ("SAVE20", 20)])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = DiscountTable::default();
        let code = table.lookup("save10").unwrap();
        assert_eq!(code.code, "SAVE10");
        assert_eq!(code.rate, Decimal::new(10, 2));

        assert_eq!(table.lookup(" Save20 ").unwrap().rate, Decimal::new(20, 2));
    }

    #[test]
    fn test_lookup_unknown_code() {
        let table = DiscountTable::default();
        assert!(table.lookup("BOGUS").is_none());
        assert!(table.lookup("").is_none());
    }
}
