//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--show-hidden`, `--no-smart-expand`, etc.)
//! 2. `$DTREE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.dtree.toml` in the current working directory
//! 4. Global `~/.config/dtree/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tree::engine::{CollapsePolicy, EngineOptions};
use crate::tree::projection::DEFAULT_MAX_DEPTH;
use crate::tree::smart_expand::DEFAULT_MAX_CHAIN_DEPTH;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Show hidden files by default.
    pub show_hidden: Option<bool>,
    /// Confirm before delete operations.
    pub confirm_delete: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Tree engine settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Cascade through single-directory chains when opening.
    pub smart_expand: Option<bool>,
    /// Most directories a single smart expand may open.
    pub max_chain_depth: Option<usize>,
    /// Deepest level the projection descends to.
    pub max_depth: Option<usize>,
    /// "remember" or "forget" descendant expansion on collapse.
    pub collapse_policy: Option<String>,
    /// Use nerd font icons (false = ASCII fallback).
    pub use_icons: Option<bool>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: Option<bool>,
    /// Filter directive, e.g. "info" or "dirtree::tree=debug".
    pub level: Option<String>,
    /// Log file path; defaults to the platform state directory.
    pub file: Option<PathBuf>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub logging: LoggingConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; `load` handles that separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DTREE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".dtree.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("dtree").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Logging isn't initialised yet; it depends on this config.
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            tree: TreeConfig {
                smart_expand: other.tree.smart_expand.or(self.tree.smart_expand),
                max_chain_depth: other.tree.max_chain_depth.or(self.tree.max_chain_depth),
                max_depth: other.tree.max_depth.or(self.tree.max_depth),
                collapse_policy: other
                    .tree
                    .collapse_policy
                    .clone()
                    .or(self.tree.collapse_policy),
                use_icons: other.tree.use_icons.or(self.tree.use_icons),
            },
            logging: LoggingConfig {
                enabled: other.logging.enabled.or(self.logging.enabled),
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher-priority files overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn smart_expand(&self) -> bool {
        self.tree.smart_expand.unwrap_or(true)
    }

    pub fn max_chain_depth(&self) -> usize {
        self.tree.max_chain_depth.unwrap_or(DEFAULT_MAX_CHAIN_DEPTH)
    }

    pub fn max_depth(&self) -> usize {
        self.tree.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Collapse policy: "remember" or "forget".
    pub fn collapse_policy(&self) -> CollapsePolicy {
        let Some(policy) = self.tree.collapse_policy.as_deref() else {
            return CollapsePolicy::default();
        };
        policy.parse().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "falling back to the default collapse policy");
            CollapsePolicy::default()
        })
    }

    pub fn use_icons(&self) -> bool {
        self.tree.use_icons.unwrap_or(true)
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.enabled.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Engine options derived from the `[general]` and `[tree]` sections.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            smart_expand: self.smart_expand(),
            max_chain_depth: self.max_chain_depth(),
            max_depth: self.max_depth(),
            collapse_policy: self.collapse_policy(),
            show_hidden: self.show_hidden(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
