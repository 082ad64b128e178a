use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::NextcalConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "nextcal.toml",
    "nextcal.yaml",
    "nextcal.yml",
    "nextcal.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<NextcalConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./nextcal.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/nextcal/nextcal.{toml,yaml,yml,json}` (user-global)
///
/// Returns `NextcalConfig::default()` if no config file is found or the
/// file fails to parse.
pub fn discover_and_load() -> NextcalConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return NextcalConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        NextcalConfig::default()
    })
}

/// Overlay `NEXTCAL_CALDAV_*` environment variables onto a loaded config.
pub fn apply_env_overrides(config: &mut NextcalConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut NextcalConfig, lookup: impl Fn(&str) -> Option<String>) {
    let caldav = &mut config.caldav;
    if let Some(url) = lookup("NEXTCAL_CALDAV_URL") {
        caldav.url = Some(url);
    }
    if let Some(username) = lookup("NEXTCAL_CALDAV_USERNAME") {
        caldav.username = Some(username);
    }
    if let Some(password) = lookup("NEXTCAL_CALDAV_PASSWORD") {
        caldav.password = Some(Secret::new(password));
    }
    if let Some(provider) = lookup("NEXTCAL_CALDAV_PROVIDER") {
        caldav.provider = Some(provider);
    }
    if let Some(path) = lookup("NEXTCAL_CALDAV_CALENDAR_PATH") {
        caldav.calendar_path = Some(path);
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));

    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/nextcal/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "nextcal").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<NextcalConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
