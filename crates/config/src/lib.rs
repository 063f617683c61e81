use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// Which `Store` implementation the binary runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{other}' (expected sqlite or memory)")),
        }
    }
}

/// All configuration for the SportNexus application.
///
/// Precedence (lowest to highest): defaults → config file → env var → CLI arg.
/// CLI arg merging is done by the caller after `Config::load()`.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub db_url: String,
    pub backend: Backend,
    /// Serve reads from the demo catalogue while the primary store is down.
    pub demo_fallback: bool,

    // Server
    pub port: u16,

    // Logging
    pub log_level: String,
    pub utc: bool,

    // Auth
    pub auth_secret: String,
}

/// Config file layout (~/.sportnexus/config.toml). All fields optional; they
/// layer on top of compiled-in defaults.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    db_url: Option<String>,
    backend: Option<Backend>,
    demo_fallback: Option<bool>,
    port: Option<u16>,
    log_level: Option<String>,
    utc: Option<bool>,
    auth_secret: Option<String>,
}

impl Config {
    /// Config directory: ~/.sportnexus/
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sportnexus")
    }

    /// Config file path: ~/.sportnexus/config.toml
    pub fn file_path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load config: defaults → config file → env vars.
    /// CLI args should be merged by the caller afterward.
    pub fn load() -> Self {
        let mut config = Self::defaults();

        // Layer 2: config file
        if let Ok(contents) = std::fs::read_to_string(Self::file_path()) {
            if let Ok(file) = toml::from_str::<FileConfig>(&contents) {
                config.apply_file(file);
            }
        }

        // Layer 3: environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    pub fn defaults() -> Self {
        Self {
            db_url: "sqlite:sportnexus.db".to_string(),
            backend: Backend::Sqlite,
            demo_fallback: false,
            port: 3000,
            log_level: "info".to_string(),
            utc: false,
            auth_secret: "sportnexus-dev-secret".to_string(),
        }
    }

    // --- Private helpers ---

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.db_url { self.db_url = v; }
        if let Some(v) = file.backend { self.backend = v; }
        if let Some(v) = file.demo_fallback { self.demo_fallback = v; }
        if let Some(v) = file.port { self.port = v; }
        if let Some(v) = file.log_level { self.log_level = v; }
        if let Some(v) = file.utc { self.utc = v; }
        if let Some(v) = file.auth_secret { self.auth_secret = v; }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("SPORTNEXUS_DB_URL") { self.db_url = v; }
        if let Some(v) = var("SPORTNEXUS_BACKEND") {
            if let Ok(b) = v.parse() { self.backend = b; }
        }
        if let Some(v) = var("SPORTNEXUS_DEMO_FALLBACK") { self.demo_fallback = truthy(&v); }
        if let Some(v) = var("SPORTNEXUS_PORT") {
            if let Ok(p) = v.parse() { self.port = p; }
        }
        if let Some(v) = var("SPORTNEXUS_LOG_LEVEL") { self.log_level = v; }
        if let Some(v) = var("SPORTNEXUS_UTC") { self.utc = truthy(&v); }
        if let Some(v) = var("SPORTNEXUS_AUTH_SECRET") { self.auth_secret = v; }
    }
}

fn truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file: FileConfig = toml::from_str(
            r#"
            db_url = "sqlite:/var/lib/sportnexus.db"
            backend = "memory"
            port = 8080
            demo_fallback = true
            "#,
        )
        .unwrap();

        let mut config = Config::defaults();
        config.apply_file(file);
        assert_eq!(config.db_url, "sqlite:/var/lib/sportnexus.db");
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.port, 8080);
        assert!(config.demo_fallback);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_beats_file_and_ignores_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SPORTNEXUS_PORT", "not-a-port"),
            ("SPORTNEXUS_BACKEND", "Memory"),
            ("SPORTNEXUS_UTC", "TRUE"),
            ("SPORTNEXUS_AUTH_SECRET", "s3cret"),
        ]);

        let mut config = Config::defaults();
        config.apply_file(FileConfig { port: Some(4000), ..Default::default() });
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 4000);
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.utc);
        assert_eq!(config.auth_secret, "s3cret");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!("postgres".parse::<Backend>().is_err());
        assert!(toml::from_str::<FileConfig>(r#"backend = "postgres""#).is_err());
    }
}
