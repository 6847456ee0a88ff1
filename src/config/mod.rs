/// Application configuration module
use std::env;
use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub upstream_url: String,
    pub bind_addr: SocketAddr,
    pub http: HttpSettings,
}

#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "too-portal/0.1".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let upstream_url = env::var("UPSTREAM_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("BIND_ADDR is not a socket address: {}", e))?;

        let defaults = HttpSettings::default();
        let http = HttpSettings {
            timeout_seconds: env_u64("HTTP_TIMEOUT_SECONDS", defaults.timeout_seconds),
            user_agent: env::var("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
        };

        Ok(Self {
            upstream_url,
            bind_addr,
            http,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        env::set_var("TOO_PORTAL_TEST_GARBAGE", "thirty");
        assert_eq!(env_u64("TOO_PORTAL_TEST_GARBAGE", 30), 30);
        env::remove_var("TOO_PORTAL_TEST_GARBAGE");
    }

    #[test]
    fn test_env_u64_reads_number() {
        env::set_var("TOO_PORTAL_TEST_NUMBER", "12");
        assert_eq!(env_u64("TOO_PORTAL_TEST_NUMBER", 30), 12);
        env::remove_var("TOO_PORTAL_TEST_NUMBER");
    }
}
