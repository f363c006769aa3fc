use std::time::Duration;

use crate::plan::PlanQuotas;

pub const DEV_ADMIN_TOKEN: &str = "secret";
pub const DEV_WEBHOOK_SECRET: &str = "dev-webhook-secret";

/// Process-wide configuration, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub admin_token: String,
    pub webhook_secret: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub plan_quotas: PlanQuotas,
    pub fetch_timeout_secs: u64,
    pub ai_timeout_secs: u64,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let defaults = PlanQuotas::default();
        let plan_quotas = PlanQuotas {
            starter: parse_var(&lookup, "ALTGATE_QUOTA_STARTER", defaults.starter)?,
            pro: parse_var(&lookup, "ALTGATE_QUOTA_PRO", defaults.pro)?,
            enterprise: parse_var(&lookup, "ALTGATE_QUOTA_ENTERPRISE", defaults.enterprise)?,
        };
        for (name, quota) in [
            ("starter", plan_quotas.starter),
            ("pro", plan_quotas.pro),
            ("enterprise", plan_quotas.enterprise),
        ] {
            if quota < 0 {
                return Err(format!("quota for plan {name} must not be negative"));
            }
        }

        Ok(Self {
            port: parse_var(&lookup, "ALTGATE_PORT", 3000)?,
            data_dir: var("ALTGATE_DATA_DIR", "./data"),
            duckdb_memory_limit: var("ALTGATE_DUCKDB_MEMORY", "512MB"),
            admin_token: var("ALTGATE_ADMIN_TOKEN", DEV_ADMIN_TOKEN),
            webhook_secret: var("ALTGATE_WEBHOOK_SECRET", DEV_WEBHOOK_SECRET),
            openai_api_key: var("OPENAI_API_KEY", ""),
            openai_base_url: var("ALTGATE_OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            openai_model: var("ALTGATE_OPENAI_MODEL", "gpt-4o-mini"),
            plan_quotas,
            fetch_timeout_secs: parse_var(&lookup, "ALTGATE_FETCH_TIMEOUT_SECS", 15)?,
            ai_timeout_secs: parse_var(&lookup, "ALTGATE_AI_TIMEOUT_SECS", 30)?,
            max_image_bytes: parse_var(&lookup, "ALTGATE_MAX_IMAGE_BYTES", 10 * 1024 * 1024)?,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    /// Names of secrets still at their local-development defaults.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.admin_token == DEV_ADMIN_TOKEN {
            out.push("ALTGATE_ADMIN_TOKEN");
        }
        if self.webhook_secret == DEV_WEBHOOK_SECRET {
            out.push("ALTGATE_WEBHOOK_SECRET");
        }
        if self.openai_api_key.is_empty() {
            out.push("OPENAI_API_KEY");
        }
        out
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid {name}: {e}")),
        None => Ok(default),
    }
}
