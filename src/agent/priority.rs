//! Business priorities the routing decision is weighted by

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessPriority {
    MinimizeCost,
    MinimizeDeliveryTime,
    #[serde(rename = "MINIMIZE_CO2")]
    MinimizeCo2,
    BalancedCostTime,
    PrioritizeGoldTierSpeed,
}

impl BusinessPriority {
    pub const ALL: [BusinessPriority; 5] = [
        BusinessPriority::MinimizeCost,
        BusinessPriority::MinimizeDeliveryTime,
        BusinessPriority::MinimizeCo2,
        BusinessPriority::BalancedCostTime,
        BusinessPriority::PrioritizeGoldTierSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessPriority::MinimizeCost => "MINIMIZE_COST",
            BusinessPriority::MinimizeDeliveryTime => "MINIMIZE_DELIVERY_TIME",
            BusinessPriority::MinimizeCo2 => "MINIMIZE_CO2",
            BusinessPriority::BalancedCostTime => "BALANCED_COST_TIME",
            BusinessPriority::PrioritizeGoldTierSpeed => "PRIORITIZE_GOLD_TIER_SPEED",
        }
    }

    /// Weighting guidance handed to the completion service
    pub fn guidance(&self) -> &'static str {
        match self {
            BusinessPriority::MinimizeCost => "Choose the cheapest viable option.",
            BusinessPriority::MinimizeDeliveryTime => {
                "Choose the option with the fewest delivery days; break ties on cost."
            }
            BusinessPriority::MinimizeCo2 => {
                "Choose the option with the lowest CO2 emissions; break ties on cost."
            }
            BusinessPriority::BalancedCostTime => {
                "Balance cost against delivery days; avoid options that are much worse on either."
            }
            BusinessPriority::PrioritizeGoldTierSpeed => {
                "For gold tier customers choose the fastest option; otherwise balance cost and time."
            }
        }
    }
}

impl fmt::Display for BusinessPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported business priority '{0}'. Expected one of: {}", expected_priorities())]
pub struct UnsupportedPriority(pub String);

fn expected_priorities() -> String {
    BusinessPriority::ALL
        .iter()
        .map(BusinessPriority::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for BusinessPriority {
    type Err = UnsupportedPriority;

    /// Case-insensitive; surrounding whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BusinessPriority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnsupportedPriority(s.to_string()))
    }
}
