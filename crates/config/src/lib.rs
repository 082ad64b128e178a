//! Configuration loading and env substitution.
//!
//! Config files: `nextcal.toml`, `nextcal.yaml`, or `nextcal.json`
//! Searched in `./` then `~/.config/nextcal/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, plus
//! `NEXTCAL_CALDAV_*` environment overrides applied after parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{CalDavConfig, NextcalConfig, ServerConfig},
};
