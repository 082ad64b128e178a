/// Config schema types (server identity, CalDAV account).
use {
    secrecy::Secret,
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NextcalConfig {
    pub server: ServerConfig,
    /// The `nextcloud` alias accepts the older `config.json` layout.
    #[serde(alias = "nextcloud")]
    pub caldav: CalDavConfig,
}

/// Identity the tool server reports during the MCP handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    /// Free-form usage hints returned to the client on `initialize`.
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "nextcal".into(),
            instructions: None,
        }
    }
}

/// CalDAV account the session connects to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CalDavConfig {
    /// Server URL. For Nextcloud this may be the bare instance URL.
    #[serde(alias = "serverUrl")]
    pub url: Option<String>,
    pub username: Option<String>,
    /// Password or app-specific password.
    pub password: Option<Secret<String>>,
    /// "nextcloud", "fastmail", "icloud", "generic" or unset.
    pub provider: Option<String>,
    /// Calendar home path; skips principal discovery when set.
    #[serde(alias = "calendarPath")]
    pub calendar_path: Option<String>,
}

impl CalDavConfig {
    /// Names of the keys a session cannot be opened without.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_none() && !matches!(self.provider.as_deref(), Some("fastmail" | "icloud")) {
            missing.push("url");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        missing
    }
}
