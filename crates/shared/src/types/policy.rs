//! Ledger policies shared by the core logic and the database layer.

use serde::{Deserialize, Serialize};

/// How the cost of a FIFO shortfall is estimated.
///
/// When the layers on hand cannot cover a consumption, the uncovered
/// quantity is still costed so the journal balances; the estimate is
/// flagged and the line's profit is reported as unrealized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallCostPolicy {
    /// Weighted average unit cost of the layers available to the
    /// consumption, falling back to the last known cost when there were none.
    #[default]
    AverageOfAvailable,
    /// Unit cost of the item's most recent layer, depleted or not.
    LastKnownCost,
}

impl ShortfallCostPolicy {
    /// Returns the configuration string for this policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AverageOfAvailable => "average_of_available",
            Self::LastKnownCost => "last_known_cost",
        }
    }
}

impl std::fmt::Display for ShortfallCostPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_average() {
        assert_eq!(ShortfallCostPolicy::default(), ShortfallCostPolicy::AverageOfAvailable);
    }

    #[test]
    fn test_serde_names() {
        let policy: ShortfallCostPolicy = serde_json::from_str("\"last_known_cost\"").unwrap();
        assert_eq!(policy, ShortfallCostPolicy::LastKnownCost);
        assert_eq!(
            serde_json::to_string(&ShortfallCostPolicy::AverageOfAvailable).unwrap(),
            "\"average_of_available\""
        );
        assert_eq!(ShortfallCostPolicy::LastKnownCost.to_string(), "last_known_cost");
    }
}
