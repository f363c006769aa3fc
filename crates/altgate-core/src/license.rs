use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::plan::PlanQuotas;

/// A license row as stored in (and read back from) the `licenses` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct License {
    pub license_key: String,
    pub plan: String,
    pub monthly_quota: i64,
    pub used_this_month: i64,
    pub site_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_reset_at: Option<DateTime<Utc>>,
}

impl License {
    /// Generations left this month. Never negative.
    pub fn remaining(&self) -> i64 {
        (self.monthly_quota - self.used_this_month).max(0)
    }

    pub fn quota_exhausted(&self) -> bool {
        self.used_this_month >= self.monthly_quota
    }

    /// The `{plan, monthly_quota, used_this_month}` triple the plugin displays.
    pub fn usage(&self) -> UsageSnapshot {
        UsageSnapshot {
            plan: self.plan.clone(),
            monthly_quota: self.monthly_quota,
            used_this_month: self.used_this_month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub plan: String,
    pub monthly_quota: i64,
    pub used_this_month: i64,
}

/// Result of reconciling a stored row against the plan table and the clock.
///
/// `license` is the corrected view. The two flags tell the store which
/// corrective writes to issue; each write is independent and idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub license: License,
    /// Usage must be persisted as `0` with `last_reset_at = now`.
    pub reset: bool,
    /// Stored quota disagrees with the plan table; persist this value.
    pub quota_correction: Option<i64>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        !self.reset && self.quota_correction.is_none()
    }
}

/// True when `last_reset_at` is missing or falls in a different UTC
/// calendar month than `now`.
pub fn needs_monthly_reset(last_reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_reset_at {
        Some(at) => at.year() != now.year() || at.month() != now.month(),
        None => true,
    }
}

/// Self-healing normalization applied to every license read.
///
/// - plan is lowercased;
/// - a recognized plan gets its authoritative quota (unrecognized plans keep
///   the stored quota);
/// - a row last reset in an earlier month (or never) has its usage zeroed.
pub fn reconcile(raw: License, quotas: &PlanQuotas, now: DateTime<Utc>) -> Reconciliation {
    let mut license = raw;
    license.plan = license.plan.trim().to_lowercase();

    let quota_correction = quotas
        .quota_for_name(&license.plan)
        .filter(|authoritative| *authoritative != license.monthly_quota);
    if let Some(quota) = quota_correction {
        license.monthly_quota = quota;
    }

    let reset = needs_monthly_reset(license.last_reset_at, now);
    if reset {
        license.used_this_month = 0;
        license.last_reset_at = Some(now);
    }

    Reconciliation {
        license,
        reset,
        quota_correction,
    }
}
