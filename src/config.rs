//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treeview/treeview.toml`
//! 3. Local config: `--config <file>` or `.treeview.toml` beside the records file
//! 4. Environment variables: `TREEVIEW_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, LiveTree};
use crate::domain::{
    filter_by_field, group_by_field, sort_by_field, ProjectionOptions, Record, Value,
};

/// File name of a local config placed next to a records file.
pub const LOCAL_CONFIG_NAME: &str = ".treeview.toml";

/// Sibling ordering by one record field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SortConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub descending: bool,
}

/// Raw sort config; `None` means "inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RawSortConfig {
    pub field: Option<String>,
    pub descending: Option<bool>,
}

impl SortConfig {
    pub fn merge(&self, overlay: &RawSortConfig) -> Self {
        Self {
            field: overlay.field.clone().or_else(|| self.field.clone()),
            descending: overlay.descending.unwrap_or(self.descending),
        }
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RawSettings {
    pub key_field: Option<String>,
    pub parent_key_field: Option<String>,
    pub children_field: Option<String>,
    pub node_field: Option<String>,
    pub root_key: Option<Value>,
    pub root_enumerable: Option<bool>,
    pub group_field: Option<String>,
    pub filter_field: Option<String>,
    pub sort: RawSortConfig,
}

/// Unified configuration for treeview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Field holding each record's key
    pub key_field: String,
    /// Field holding the parent's key (adjacency list)
    pub parent_key_field: String,
    /// Field holding nested children; switches to materialized nesting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_field: Option<String>,
    /// Explicit node/leaf flag field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_field: Option<String>,
    /// Parent key that marks top-level records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_key: Option<Value>,
    pub root_enumerable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_field: Option<String>,
    pub sort: SortConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_field: "id".into(),
            parent_key_field: "pid".into(),
            children_field: None,
            node_field: None,
            root_key: None,
            root_enumerable: false,
            group_field: None,
            filter_field: None,
            sort: SortConfig::default(),
        }
    }
}

/// Get the XDG config directory for treeview.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treeview").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treeview.toml"))
}

/// Get the path of the local config that belongs to a records file.
pub fn local_config_path(records: &Path) -> PathBuf {
    records
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(LOCAL_CONFIG_NAME)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ApplicationResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Read a scalar from its textual form: integers and booleans first.
pub fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(b) = raw.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::Str(raw.to_string())
    }
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins where it is set.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            key_field: overlay
                .key_field
                .clone()
                .unwrap_or_else(|| self.key_field.clone()),
            parent_key_field: overlay
                .parent_key_field
                .clone()
                .unwrap_or_else(|| self.parent_key_field.clone()),
            children_field: overlay
                .children_field
                .clone()
                .or_else(|| self.children_field.clone()),
            node_field: overlay.node_field.clone().or_else(|| self.node_field.clone()),
            root_key: overlay.root_key.clone().or_else(|| self.root_key.clone()),
            root_enumerable: overlay.root_enumerable.unwrap_or(self.root_enumerable),
            group_field: overlay
                .group_field
                .clone()
                .or_else(|| self.group_field.clone()),
            filter_field: overlay
                .filter_field
                .clone()
                .or_else(|| self.filter_field.clone()),
            sort: self.sort.merge(&overlay.sort),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional local config file; skipped when it does not exist
    pub fn load(local: Option<&Path>) -> ApplicationResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(local_path) = local {
            if local_path.exists() {
                debug!("load: local config {}", local_path.display());
                current = current.merge_with(&load_raw_settings(local_path)?);
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TREEVIEW_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("TREEVIEW").separator("__"))
            .build()
            .map_err(config_err)?;

        let text = |key: &str| config.get_string(key).ok();
        let overlay = RawSettings {
            key_field: text("key_field"),
            parent_key_field: text("parent_key_field"),
            children_field: text("children_field"),
            node_field: text("node_field"),
            root_key: text("root_key").map(|raw| parse_scalar(&raw)),
            root_enumerable: config.get_bool("root_enumerable").ok(),
            group_field: text("group_field"),
            filter_field: text("filter_field"),
            sort: RawSortConfig {
                field: text("sort.field"),
                descending: config.get_bool("sort.descending").ok(),
            },
        };
        Ok(settings.merge_with(&overlay))
    }

    /// Engine options described by these settings.
    pub fn to_options(&self) -> ApplicationResult<ProjectionOptions<Record>> {
        let mut options = match &self.children_field {
            Some(children) => ProjectionOptions::nested(&self.key_field, children),
            None => ProjectionOptions::adjacency(&self.key_field, &self.parent_key_field),
        };
        if let Some(key) = &self.root_key {
            options = options.with_root_key(key.clone());
        }
        if let Some(node_field) = &self.node_field {
            options = options.with_node_field(node_field);
        }
        options = options.with_root_enumerable(self.root_enumerable);
        options.validate().map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })?;
        Ok(options)
    }

    /// Install the configured sort, group and filter rules.
    pub fn apply_rules(&self, tree: &mut LiveTree<Record>) {
        if let Some(field) = &self.sort.field {
            tree.set_sort(Some(sort_by_field(field, self.sort.descending)));
        }
        if let Some(field) = &self.group_field {
            tree.set_group(Some(group_by_field(field)));
        }
        if let Some(field) = &self.filter_field {
            tree.set_filter(Some(filter_by_field(field)));
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treeview configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treeview/treeview.toml
#   Local:  --config <file>, or .treeview.toml beside the records file
#   Env:    TREEVIEW_* environment variables (TREEVIEW_SORT__FIELD for [sort])

# Field holding each record's key
# key_field = "id"

# Field holding the parent's key (adjacency list)
# parent_key_field = "pid"

# Field holding nested child records; when set, parent_key_field is ignored
# children_field = "children"

# Boolean field that forces node/leaf classification
# node_field = "node"

# Parent key of top-level records
# root_key = 0

# Show the root as the first entry
# root_enumerable = false

# Cluster siblings by this field, with a header per run
# group_field = "group"

# Hide records (and their subtrees) whose field is false, 0 or empty
# filter_field = "visible"

[sort]
# Order siblings by this field; ties keep source order
# field = "name"
# descending = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Linkage;

    #[test]
    fn given_no_overlay_when_merging_then_keeps_base() {
        let base = Settings::default();
        assert_eq!(base.merge_with(&RawSettings::default()), base);
    }

    #[test]
    fn given_overlay_when_merging_then_set_fields_win() {
        let base = Settings {
            group_field: Some("kind".into()),
            ..Settings::default()
        };
        let overlay = RawSettings {
            key_field: Some("uid".into()),
            root_key: Some(Value::Int(0)),
            sort: RawSortConfig {
                field: Some("name".into()),
                descending: None,
            },
            ..RawSettings::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.key_field, "uid");
        assert_eq!(merged.parent_key_field, "pid");
        assert_eq!(merged.root_key, Some(Value::Int(0)));
        assert_eq!(merged.group_field.as_deref(), Some("kind"));
        assert_eq!(merged.sort.field.as_deref(), Some("name"));
        assert!(!merged.sort.descending);
    }

    #[test]
    fn given_children_field_when_building_options_then_uses_nesting() {
        let settings = Settings {
            children_field: Some("items".into()),
            ..Settings::default()
        };
        let options = settings.to_options().expect("options");
        assert_eq!(options.linkage, Linkage::Children("items".into()));
    }

    #[test]
    fn given_same_key_and_parent_field_when_building_options_then_config_error() {
        let settings = Settings {
            parent_key_field: "id".into(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.to_options(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_textual_scalars_when_parsing_then_prefers_int_and_bool() {
        assert_eq!(parse_scalar("0"), Value::Int(0));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("root"), Value::from("root"));
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips_through_toml() {
        let settings = Settings {
            root_key: Some(Value::Int(0)),
            sort: SortConfig {
                field: Some("name".into()),
                descending: true,
            },
            ..Settings::default()
        };
        let text = settings.to_toml().expect("serialize");
        let parsed: Settings = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("parse template");
        assert_eq!(raw, RawSettings::default());
    }
}
