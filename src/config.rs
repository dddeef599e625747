use std::env;
use std::time::Duration;

/// Browser-like identifying header sent to origins that reject bare HTTP clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Listening address, all interfaces by default
    pub host: String,
    pub port: u16,
    /// Verbose logging; never changes relay behavior
    pub debug: bool,
    /// Fixed scheme+host for rewritten URLs. When unset the base is derived
    /// from each inbound request.
    pub public_base_url: Option<String>,
    /// Upper bound on any single wait for the origin
    pub upstream_timeout_secs: u64,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            public_base_url: None,
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("PORT must be a port number, got '{raw}': {e}"))?,
            Err(_) => defaults.port,
        };

        let debug = env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false);

        // Empty means "derive from the request", same as unset
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    format!("UPSTREAM_TIMEOUT_SECS must be a whole number, got '{raw}': {e}")
                })?;
                if secs == 0 {
                    return Err("UPSTREAM_TIMEOUT_SECS must be greater than zero".into());
                }
                secs
            }
            Err(_) => defaults.upstream_timeout_secs,
        };

        let user_agent = env::var("UPSTREAM_USER_AGENT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.user_agent);

        let max_redirects = env::var("MAX_REDIRECTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_redirects);

        Ok(Config {
            host,
            port,
            debug,
            public_base_url,
            upstream_timeout_secs,
            user_agent,
            max_redirects,
        })
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "DEBUG",
        "PUBLIC_BASE_URL",
        "UPSTREAM_TIMEOUT_SECS",
        "UPSTREAM_USER_AGENT",
        "MAX_REDIRECTS",
    ];

    /// Set env vars, run `f`, then restore original state.
    ///
    /// Every variable in `ALL_VARS` not listed in `set` is removed first.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for k in ALL_VARS {
            // SAFETY: serialized by ENV_LOCK, no other thread modifies env vars concurrently.
            unsafe { env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { env::set_var(k, v) },
                None => unsafe { env::remove_var(k) },
            }
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        with_env(&[], || {
            let config = Config::from_env().expect("defaults should load");
            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 5001);
            assert!(!config.debug);
            assert!(config.public_base_url.is_none());
            assert_eq!(config.upstream_timeout_secs, 30);
            assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
            assert_eq!(config.max_redirects, 10);
            assert_eq!(config.bind_addr(), "0.0.0.0:5001");
        });
    }

    #[test]
    fn explicit_values_override_defaults() {
        with_env(
            &[
                ("HOST", "127.0.0.1"),
                ("PORT", "8080"),
                ("DEBUG", "true"),
                ("UPSTREAM_TIMEOUT_SECS", "12"),
                ("UPSTREAM_USER_AGENT", "relay-test/1.0"),
                ("MAX_REDIRECTS", "3"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.bind_addr(), "127.0.0.1:8080");
                assert!(config.debug);
                assert_eq!(config.upstream_timeout(), Duration::from_secs(12));
                assert_eq!(config.user_agent, "relay-test/1.0");
                assert_eq!(config.max_redirects, 3);
            },
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        with_env(&[("PORT", "not-a-port")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        with_env(&[("UPSTREAM_TIMEOUT_SECS", "0")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn debug_flag_variants() {
        for (raw, expected) in [("1", true), ("YES", true), ("on", true), ("0", false), ("nope", false)] {
            with_env(&[("DEBUG", raw)], || {
                assert_eq!(Config::from_env().unwrap().debug, expected, "DEBUG={raw}");
            });
        }
    }

    #[test]
    fn public_base_url_trailing_slash_trimmed() {
        with_env(&[("PUBLIC_BASE_URL", "https://relay.example.com/")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(
                config.public_base_url.as_deref(),
                Some("https://relay.example.com")
            );
        });
    }

    #[test]
    fn empty_public_base_url_means_derive() {
        with_env(&[("PUBLIC_BASE_URL", "  ")], || {
            assert!(Config::from_env().unwrap().public_base_url.is_none());
        });
    }
}
