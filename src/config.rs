use crate::model::Scope;

/// Largest leaderboard page the service accepts.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub session_path: String,
    /// 0 disables the per-request timeout.
    pub request_timeout_secs: u64,
    pub default_scope: Scope,
    pub default_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/api".to_string(),
            session_path: "./runatlas.sqlite".to_string(),
            request_timeout_secs: 30,
            default_scope: Scope::Val,
            default_limit: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: std::env::var("RUNATLAS_API_URL").unwrap_or(d.api_base),
            session_path: std::env::var("RUNATLAS_SESSION_PATH").unwrap_or(d.session_path),
            request_timeout_secs: std::env::var("RUNATLAS_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.request_timeout_secs),
            default_scope: std::env::var("RUNATLAS_SCOPE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.default_scope),
            default_limit: std::env::var("RUNATLAS_LIMIT").ok().and_then(|v| v.parse().ok()).map(clamp_limit).unwrap_or(d.default_limit),
        }
    }
}

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LEADERBOARD_LIMIT)
}
