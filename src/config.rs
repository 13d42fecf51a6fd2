// Run configuration. Read once from the environment in `main` and handed
// down by reference; nothing below this module looks at env vars.

use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_NASA_API_KEY: &str = "DEMO_KEY";
pub const DEFAULT_NASA_API_BASE: &str = "https://api.nasa.gov/mars-photos/api/v1";
pub const DEFAULT_ROVER: &str = "curiosity";
pub const DEFAULT_SAVE_DIR: &str = "./mars_photos";
pub const DEFAULT_BLUESKY_SERVICE: &str = "https://bsky.social";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Account credentials for the social service.
#[derive(Clone, Default)]
pub struct Credentials {
    pub handle: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("handle", &self.handle)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub nasa_api_key: String,
    pub nasa_api_base: String,
    pub rover: String,
    pub save_dir: PathBuf,
    pub bluesky_service: String,
    pub credentials: Credentials,
    pub log_format: LogFormat,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Config {
            nasa_api_key: or("NASA_API_KEY", DEFAULT_NASA_API_KEY),
            nasa_api_base: or("NASA_API_BASE_URL", DEFAULT_NASA_API_BASE),
            rover: or("MARS_ROVER", DEFAULT_ROVER),
            save_dir: PathBuf::from(or("MARS_PHOTOS_DIR", DEFAULT_SAVE_DIR)),
            bluesky_service: or("BLUESKY_SERVICE_URL", DEFAULT_BLUESKY_SERVICE),
            credentials: Credentials {
                handle: get("BLUESKY_HANDLE").unwrap_or_default(),
                password: get("BLUESKY_PASSWORD").unwrap_or_default(),
            },
            log_format: get("LOG_FORMAT")
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
        }
    }

    /// Endpoint listing the latest photos of the configured rover.
    pub fn latest_photos_url(&self) -> String {
        format!(
            "{}/rovers/{}/latest_photos",
            self.nasa_api_base.trim_end_matches('/'),
            self.rover
        )
    }
}
