use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use shuttle_runtime::SecretStore;

use crate::realtime::Backoff;

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 300;
const DEFAULT_REALTIME_BACKOFF_MAX_SECS: u64 = 30;

/// How strictly lead status changes follow the sales flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status to any status; off-flow moves are only logged.
    #[default]
    Open,
    /// Off-flow moves are rejected.
    Guarded,
}

impl FromStr for TransitionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TransitionPolicy::Open),
            "guarded" => Ok(TransitionPolicy::Guarded),
            other => Err(anyhow!(
                "LEAD_TRANSITIONS must be 'open' or 'guarded', got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::Open => f.write_str("open"),
            TransitionPolicy::Guarded => f.write_str("guarded"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// `postgres://…`, or `memory://` for the in-process store.
    pub database_url: String,
    pub jwt_secret: String,
    pub store_timeout: Duration,
    pub session_ttl: Duration,
    pub lead_transitions: TransitionPolicy,
    pub realtime_backoff_max: Duration,
}

impl AppConfig {
    pub fn new(secret_store: &SecretStore) -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| secret_store.get(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL not found"))?;

        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET not found"))?;

        let store_timeout = seconds(&lookup, "STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?;
        let session_ttl = seconds(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let realtime_backoff_max = seconds(
            &lookup,
            "REALTIME_BACKOFF_MAX_SECS",
            DEFAULT_REALTIME_BACKOFF_MAX_SECS,
        )?;

        let lead_transitions = match lookup("LEAD_TRANSITIONS") {
            Some(value) => value.parse()?,
            None => TransitionPolicy::default(),
        };

        Ok(AppConfig {
            database_url,
            jwt_secret,
            store_timeout,
            session_ttl,
            lead_transitions,
            realtime_backoff_max,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.realtime_backoff_max)
    }
}

fn seconds<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", key))?;
            if secs == 0 {
                return Err(anyhow!("{} must be greater than zero", key));
            }
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default)),
    }
}
