use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tracing::{debug, info};

use altgate_core::license::{reconcile, License};
use altgate_core::plan::{Plan, PlanQuotas};

use crate::backend::{parse_sql_timestamp, to_sql_timestamp};
use crate::DuckDbBackend;

const SELECT_LICENSE_COLUMNS: &str = "SELECT license_key, plan, monthly_quota, used_this_month, site_url, \
     CAST(created_at AS VARCHAR), CAST(last_reset_at AS VARCHAR) FROM licenses";

pub struct CreateLicenseParams {
    pub license_key: String,
    /// Free-text plan; missing or unrecognized names become `starter`.
    pub plan: Option<String>,
    pub site_url: Option<String>,
}

pub struct UpsertLicenseParams {
    pub license_key: String,
    pub plan: Plan,
    pub monthly_quota: i64,
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(License),
    /// A row with this key already exists; it was left untouched.
    Duplicate,
}

/// Columns as DuckDB hands them back, before timestamp parsing.
struct RawLicenseRow {
    license_key: String,
    plan: String,
    monthly_quota: i64,
    used_this_month: i64,
    site_url: Option<String>,
    created_at: String,
    last_reset_at: Option<String>,
}

impl RawLicenseRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            license_key: row.get(0)?,
            plan: row.get(1)?,
            monthly_quota: row.get(2)?,
            used_this_month: row.get(3)?,
            site_url: row.get(4)?,
            created_at: row.get(5)?,
            last_reset_at: row.get(6)?,
        })
    }

    fn into_license(self) -> Result<License> {
        let last_reset_at = match self.last_reset_at {
            Some(raw) => Some(parse_sql_timestamp(&raw)?),
            None => None,
        };
        Ok(License {
            created_at: parse_sql_timestamp(&self.created_at)?,
            license_key: self.license_key,
            plan: self.plan,
            monthly_quota: self.monthly_quota,
            used_this_month: self.used_this_month,
            site_url: self.site_url,
            last_reset_at,
        })
    }
}

fn select_license(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    let sql = format!("{SELECT_LICENSE_COLUMNS} WHERE license_key = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(duckdb::params![license_key], RawLicenseRow::from_row)?;
    let first = rows.next();
    match first {
        Some(raw) => Ok(Some(raw?.into_license()?)),
        None => Ok(None),
    }
}

/// Reconcile a stored row and persist whatever corrections it needs.
///
/// The reset write and the quota write are separate statements; both are
/// idempotent, so a failure between them is healed by the next read.
fn normalize(
    conn: &Connection,
    raw: License,
    quotas: &PlanQuotas,
    now: DateTime<Utc>,
) -> Result<License> {
    let outcome = reconcile(raw, quotas, now);
    if outcome.is_clean() {
        return Ok(outcome.license);
    }
    let key = outcome.license.license_key.as_str();

    if outcome.reset {
        conn.execute(
            "UPDATE licenses SET used_this_month = 0, last_reset_at = CAST(?1 AS TIMESTAMP) \
             WHERE license_key = ?2",
            duckdb::params![to_sql_timestamp(now), key],
        )
        .context("monthly usage reset failed")?;
        info!(license_key = key, "Monthly usage reset");
    }

    if let Some(quota) = outcome.quota_correction {
        conn.execute(
            "UPDATE licenses SET monthly_quota = ?1 WHERE license_key = ?2",
            duckdb::params![quota, key],
        )
        .context("quota correction failed")?;
        info!(
            license_key = key,
            plan = %outcome.license.plan,
            monthly_quota = quota,
            "Stored quota corrected to plan value"
        );
    }

    Ok(outcome.license)
}

impl DuckDbBackend {
    /// Fetch and normalize a license, or `None` if the key is unknown.
    pub async fn get_license(
        &self,
        license_key: &str,
        quotas: &PlanQuotas,
    ) -> Result<Option<License>> {
        self.get_license_at(license_key, quotas, Utc::now()).await
    }

    /// [`get_license`](Self::get_license) against an explicit clock.
    pub async fn get_license_at(
        &self,
        license_key: &str,
        quotas: &PlanQuotas,
        now: DateTime<Utc>,
    ) -> Result<Option<License>> {
        let conn = self.conn.lock().await;
        match select_license(&conn, license_key)? {
            Some(raw) => Ok(Some(normalize(&conn, raw, quotas, now)?)),
            None => Ok(None),
        }
    }

    /// Insert a new license with the plan's quota and zero usage.
    ///
    /// Never overwrites: an existing key yields [`CreateOutcome::Duplicate`].
    pub async fn create_license(
        &self,
        params: CreateLicenseParams,
        quotas: &PlanQuotas,
    ) -> Result<CreateOutcome> {
        let plan = Plan::or_default(params.plan.as_deref());
        let quota = quotas.quota(plan);
        let now = to_sql_timestamp(Utc::now());

        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT INTO licenses \
             (license_key, plan, monthly_quota, used_this_month, site_url, created_at, last_reset_at) \
             VALUES (?1, ?2, ?3, 0, ?4, CAST(?5 AS TIMESTAMP), CAST(?6 AS TIMESTAMP)) \
             ON CONFLICT (license_key) DO NOTHING",
            duckdb::params![
                params.license_key,
                plan.as_str(),
                quota,
                params.site_url,
                now,
                now
            ],
        )?;
        if inserted == 0 {
            debug!(license_key = %params.license_key, "Create skipped: key exists");
            return Ok(CreateOutcome::Duplicate);
        }

        let license = select_license(&conn, &params.license_key)?
            .context("license missing right after insert")?;
        info!(license_key = %license.license_key, plan = %license.plan, "License created");
        Ok(CreateOutcome::Created(license))
    }

    /// All licenses, each normalized, oldest first.
    pub async fn list_licenses(&self, quotas: &PlanQuotas) -> Result<Vec<License>> {
        let now = Utc::now();
        let conn = self.conn.lock().await;
        let sql = format!("{SELECT_LICENSE_COLUMNS} ORDER BY created_at, license_key");

        let mut raws = Vec::new();
        {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], RawLicenseRow::from_row)?;
            for row in rows {
                raws.push(row?.into_license()?);
            }
        }

        raws.into_iter()
            .map(|raw| normalize(&conn, raw, quotas, now))
            .collect()
    }

    /// Add one generation to the counter in a single statement.
    ///
    /// An unknown key affects zero rows and is not an error.
    pub async fn increment_usage(&self, license_key: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE licenses SET used_this_month = used_this_month + 1 WHERE license_key = ?1",
            duckdb::params![license_key],
        )?;
        if updated == 0 {
            debug!(license_key, "increment_usage matched no rows");
        }
        Ok(())
    }

    /// Zero the counter and stamp `last_reset_at`, whatever the current state.
    ///
    /// Returns the normalized row, or `None` if the key is unknown.
    pub async fn reset_usage(
        &self,
        license_key: &str,
        quotas: &PlanQuotas,
    ) -> Result<Option<License>> {
        let now = Utc::now();
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE licenses SET used_this_month = 0, last_reset_at = CAST(?1 AS TIMESTAMP) \
             WHERE license_key = ?2",
            duckdb::params![to_sql_timestamp(now), license_key],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        info!(license_key, "Usage reset by admin");
        match select_license(&conn, license_key)? {
            Some(raw) => Ok(Some(normalize(&conn, raw, quotas, now)?)),
            None => Ok(None),
        }
    }

    /// Billing-provider upsert.
    ///
    /// Inserts a fresh row when the key is new. On conflict only `plan` and
    /// `monthly_quota` change: usage and `site_url` are kept as they are.
    pub async fn upsert_license(&self, params: UpsertLicenseParams) -> Result<()> {
        let now = to_sql_timestamp(Utc::now());
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO licenses \
             (license_key, plan, monthly_quota, used_this_month, site_url, created_at, last_reset_at) \
             VALUES (?1, ?2, ?3, 0, ?4, CAST(?5 AS TIMESTAMP), CAST(?6 AS TIMESTAMP)) \
             ON CONFLICT (license_key) DO UPDATE SET \
                 plan = EXCLUDED.plan, \
                 monthly_quota = EXCLUDED.monthly_quota",
            duckdb::params![
                params.license_key,
                params.plan.as_str(),
                params.monthly_quota,
                params.site_url,
                now,
                now
            ],
        )?;
        info!(
            license_key = %params.license_key,
            plan = %params.plan,
            monthly_quota = params.monthly_quota,
            "License upserted"
        );
        Ok(())
    }
}
