use std::sync::Arc;

use chrono::{Duration, Utc};

use altgate_core::plan::{Plan, PlanQuotas};
use altgate_duckdb::duckdb::params;
use altgate_duckdb::license::{CreateLicenseParams, CreateOutcome, UpsertLicenseParams};
use altgate_duckdb::DuckDbBackend;

fn quotas() -> PlanQuotas {
    PlanQuotas::default()
}

async fn create(db: &DuckDbBackend, key: &str, plan: Option<&str>) -> CreateOutcome {
    db.create_license(
        CreateLicenseParams {
            license_key: key.to_string(),
            plan: plan.map(str::to_string),
            site_url: Some("https://example.com".to_string()),
        },
        &quotas(),
    )
    .await
    .expect("create license")
}

/// Overwrite stored columns directly, bypassing normalization.
async fn plant(
    db: &DuckDbBackend,
    key: &str,
    plan: &str,
    quota: i64,
    used: i64,
    reset: Option<&str>,
) {
    let conn = db.conn_for_test().await;
    conn.execute(
        "UPDATE licenses SET plan = ?1, monthly_quota = ?2, used_this_month = ?3, \
         last_reset_at = CAST(?4 AS TIMESTAMP) WHERE license_key = ?5",
        params![plan, quota, used, reset, key],
    )
    .expect("plant row");
}

async fn stored_columns(db: &DuckDbBackend, key: &str) -> (String, i64, i64, Option<String>) {
    let conn = db.conn_for_test().await;
    let columns = conn
        .prepare(
            "SELECT plan, monthly_quota, used_this_month, site_url \
             FROM licenses WHERE license_key = ?1",
        )
        .expect("prepare")
        .query_row(params![key], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .expect("row exists");
    columns
}

fn last_month_text() -> String {
    (Utc::now() - Duration::days(40))
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// ============================================================
// create / get
// ============================================================

#[tokio::test]
async fn test_create_assigns_plan_quota_and_zero_usage() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let CreateOutcome::Created(license) = create(&db, "ABC123", Some("pro")).await else {
        panic!("expected a new license");
    };
    assert_eq!(license.plan, "pro");
    assert_eq!(license.monthly_quota, 1500);
    assert_eq!(license.used_this_month, 0);
    assert!(license.last_reset_at.is_some());
    assert_eq!(license.site_url.as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn test_create_defaults_unknown_plan_to_starter() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let CreateOutcome::Created(omitted) = create(&db, "K1", None).await else {
        panic!("expected a new license");
    };
    let CreateOutcome::Created(unknown) = create(&db, "K2", Some("platinum")).await else {
        panic!("expected a new license");
    };
    assert_eq!((omitted.plan.as_str(), omitted.monthly_quota), ("starter", 300));
    assert_eq!((unknown.plan.as_str(), unknown.monthly_quota), ("starter", 300));
}

#[tokio::test]
async fn test_create_duplicate_leaves_existing_row_untouched() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "DUP", Some("enterprise")).await;
    db.increment_usage("DUP").await.expect("increment");

    let second = db
        .create_license(
            CreateLicenseParams {
                license_key: "DUP".to_string(),
                plan: Some("starter".to_string()),
                site_url: None,
            },
            &quotas(),
        )
        .await
        .expect("create call");
    assert_eq!(second, CreateOutcome::Duplicate);

    let (plan, quota, used, site) = stored_columns(&db, "DUP").await;
    assert_eq!(plan, "enterprise");
    assert_eq!(quota, 5000);
    assert_eq!(used, 1);
    assert_eq!(site.as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn test_get_unknown_key_is_none() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    assert!(db
        .get_license("missing", &quotas())
        .await
        .expect("query")
        .is_none());
}

// ============================================================
// normalization on read
// ============================================================

#[tokio::test]
async fn test_get_heals_stale_quota_and_persists_it() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "STALE", Some("pro")).await;
    let this_month = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    plant(&db, "STALE", "PRO", 10, 4, Some(&this_month)).await;

    let license = db
        .get_license("STALE", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.plan, "pro");
    assert_eq!(license.monthly_quota, 1500);
    assert_eq!(license.used_this_month, 4, "same month: usage untouched");

    let (_, stored_quota, stored_used, _) = stored_columns(&db, "STALE").await;
    assert_eq!(stored_quota, 1500);
    assert_eq!(stored_used, 4);
}

#[tokio::test]
async fn test_get_resets_usage_from_previous_month() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "OLD", Some("starter")).await;
    plant(&db, "OLD", "starter", 300, 250, Some(&last_month_text())).await;

    let before = Utc::now() - Duration::seconds(1);
    let license = db
        .get_license("OLD", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.used_this_month, 0);
    assert!(license.last_reset_at.expect("stamped") >= before);

    let (_, _, stored_used, _) = stored_columns(&db, "OLD").await;
    assert_eq!(stored_used, 0, "reset must be persisted");
}

#[tokio::test]
async fn test_get_resets_usage_when_never_reset() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "NULLRESET", Some("pro")).await;
    plant(&db, "NULLRESET", "pro", 1500, 12, None).await;

    let license = db
        .get_license("NULLRESET", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.used_this_month, 0);
    assert!(license.last_reset_at.is_some());
}

#[tokio::test]
async fn test_get_keeps_quota_of_unrecognized_plan() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "LEGACY", None).await;
    let this_month = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    plant(&db, "LEGACY", "Lifetime", 42, 1, Some(&this_month)).await;

    let license = db
        .get_license("LEGACY", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.plan, "lifetime");
    assert_eq!(license.monthly_quota, 42);
}

#[tokio::test]
async fn test_list_normalizes_every_row() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "A", Some("starter")).await;
    create(&db, "B", Some("enterprise")).await;
    plant(&db, "A", "starter", 1, 99, Some(&last_month_text())).await;

    let all = db.list_licenses(&quotas()).await.expect("list");
    assert_eq!(all.len(), 2);
    let a = all.iter().find(|l| l.license_key == "A").expect("A listed");
    assert_eq!(a.monthly_quota, 300);
    assert_eq!(a.used_this_month, 0);
    let b = all.iter().find(|l| l.license_key == "B").expect("B listed");
    assert_eq!(b.monthly_quota, 5000);
}

// ============================================================
// usage counter
// ============================================================

#[tokio::test]
async fn test_increment_unknown_key_is_silent_noop() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.increment_usage("ghost").await.expect("no error");
    assert!(db.list_licenses(&quotas()).await.expect("list").is_empty());
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"));
    create(&db, "HOT", Some("pro")).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            db.increment_usage("HOT").await.expect("increment");
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    let license = db
        .get_license("HOT", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.used_this_month, 50);
}

#[tokio::test]
async fn test_reset_usage_zeroes_counter() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "R", Some("pro")).await;
    for _ in 0..3 {
        db.increment_usage("R").await.expect("increment");
    }

    let license = db
        .reset_usage("R", &quotas())
        .await
        .expect("reset")
        .expect("exists");
    assert_eq!(license.used_this_month, 0);
    assert!(db
        .reset_usage("nope", &quotas())
        .await
        .expect("reset")
        .is_none());
}

// ============================================================
// webhook upsert
// ============================================================

#[tokio::test]
async fn test_upsert_inserts_new_license() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.upsert_license(UpsertLicenseParams {
        license_key: "XYZ".to_string(),
        plan: Plan::Starter,
        monthly_quota: 300,
        site_url: Some("https://shop.example".to_string()),
    })
    .await
    .expect("upsert");

    let license = db
        .get_license("XYZ", &quotas())
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(license.plan, "starter");
    assert_eq!(license.monthly_quota, 300);
    assert_eq!(license.used_this_month, 0);
    assert_eq!(license.site_url.as_deref(), Some("https://shop.example"));
}

#[tokio::test]
async fn test_upsert_updates_plan_but_keeps_usage_and_site() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    create(&db, "UP", Some("starter")).await;
    db.increment_usage("UP").await.expect("increment");
    db.increment_usage("UP").await.expect("increment");

    db.upsert_license(UpsertLicenseParams {
        license_key: "UP".to_string(),
        plan: Plan::Enterprise,
        monthly_quota: 5000,
        site_url: Some("https://other.example".to_string()),
    })
    .await
    .expect("upsert");

    let (plan, quota, used, site) = stored_columns(&db, "UP").await;
    assert_eq!(plan, "enterprise");
    assert_eq!(quota, 5000);
    assert_eq!(used, 2);
    assert_eq!(site.as_deref(), Some("https://example.com"));
}
