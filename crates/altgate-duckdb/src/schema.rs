/// DuckDB initialization SQL.
///
/// Executed once at open time via `Connection::execute_batch`. Every
/// statement uses `IF NOT EXISTS` so it is safe to re-run on each startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `ALTGATE_DUCKDB_MEMORY`). Always set an explicit limit: the DuckDB
/// default of 80% of system RAM is not acceptable for a server process.
///
/// Timestamps are written from Rust as UTC wall-clock values; never use
/// `CURRENT_TIMESTAMP` here, it follows the database's local time zone.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- LICENSES
-- ===========================================
CREATE TABLE IF NOT EXISTS licenses (
    license_key      VARCHAR PRIMARY KEY,
    plan             VARCHAR NOT NULL DEFAULT 'starter',
    monthly_quota    BIGINT NOT NULL,
    used_this_month  BIGINT NOT NULL DEFAULT 0,
    site_url         VARCHAR,
    created_at       TIMESTAMP NOT NULL,
    last_reset_at    TIMESTAMP                -- NULL means "never reset": next read resets
);
"#
    )
}

/// Migration bookkeeping table, created before [`init_sql`] runs.
pub const MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id          VARCHAR PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Identifier recorded in `_migrations` once [`init_sql`] has been applied.
pub const INITIAL_MIGRATION_ID: &str = "0001_licenses";
