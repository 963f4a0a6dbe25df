use triage_core::AppError;

/// Listener and access settings for the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `TRIAGE_HOST` (defaults to `127.0.0.1`)
    /// - `TRIAGE_PORT` (defaults to `8000`)
    /// - `TRIAGE_API_KEY` (optional; enables bearer auth on mutating routes)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("TRIAGE_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup("TRIAGE_PORT") {
            None => 8000,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid TRIAGE_PORT '{raw}': must be a port number"
                ))
            })?,
        };

        let api_key = lookup("TRIAGE_API_KEY").filter(|k| !k.is_empty());

        Ok(Self {
            host,
            port,
            api_key,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
