use meditation_core::config::load_layered;
use meditation_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub identity: IdentitySettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Directory served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_static_dir() -> String {
    "meditation-frontend/static".to_string()
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL for server-to-server calls (e.g. http://backend:8000).
    pub url: String,
    /// Browser-reachable base URL, used to resolve relative audio paths.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Script generation can take a while on the backend.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl BackendSettings {
    pub fn public_url(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.url)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone)]
pub struct IdentitySettings {
    /// Password sign-in / sign-up API base.
    #[serde(default = "default_identity_url")]
    pub url: String,
    /// Refresh-token exchange API base.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    pub api_key: Secret<String>,
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_token_url() -> String {
    "https://securetoken.googleapis.com".to_string()
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; tracing export is disabled when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir()?;

    // Works from the workspace root or from inside the crate directory
    let configuration_directory = if base_path.ends_with("meditation-frontend") {
        base_path.join("config")
    } else {
        base_path.join("meditation-frontend").join("config")
    };

    load_layered(&configuration_directory)
}
