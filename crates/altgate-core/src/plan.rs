use serde::{Deserialize, Serialize};

/// A recognized license tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Parse a stored plan name. Case and surrounding whitespace are ignored.
    ///
    /// Returns `None` for anything outside the enumerated set; callers decide
    /// whether that means "keep what is stored" or "fall back to starter".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    /// Plan used when a caller omits the plan or names one we do not know.
    pub fn or_default(raw: Option<&str>) -> Self {
        raw.and_then(Plan::parse).unwrap_or(Plan::Starter)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative monthly quota per plan.
///
/// Loaded once from configuration; stored `monthly_quota` values that
/// disagree with this table are corrected on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanQuotas {
    pub starter: i64,
    pub pro: i64,
    pub enterprise: i64,
}

impl Default for PlanQuotas {
    fn default() -> Self {
        Self {
            starter: 300,
            pro: 1500,
            enterprise: 5000,
        }
    }
}

impl PlanQuotas {
    pub fn quota(&self, plan: Plan) -> i64 {
        match plan {
            Plan::Starter => self.starter,
            Plan::Pro => self.pro,
            Plan::Enterprise => self.enterprise,
        }
    }

    /// Quota for a free-text plan name, or `None` if the name is unrecognized.
    pub fn quota_for_name(&self, raw: &str) -> Option<i64> {
        Plan::parse(raw).map(|plan| self.quota(plan))
    }
}

/// Ordered substring rules for billing-provider plan titles.
///
/// First match wins, so "Enterprise Pro Bundle" is enterprise. The order is
/// part of the contract with the billing provider's naming and must not be
/// turned into a lookup table.
const CLASSIFICATION_RULES: &[(&str, Plan)] = &[
    ("enterprise", Plan::Enterprise),
    ("pro", Plan::Pro),
];

/// Classify a free-text plan name from a webhook payload.
///
/// Case-insensitive substring match against [`CLASSIFICATION_RULES`];
/// anything else (including an empty name) is [`Plan::Starter`].
pub fn classify_plan_name(name: &str) -> Plan {
    let lowered = name.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, plan)| *plan)
        .unwrap_or(Plan::Starter)
}
