//! Plugin settings
//!
//! User-level settings of the relationship matrix, persisted as JSON, including the named
//! saved configurations that restore a complete matrix setup.

use crate::value_objects::{CategoryBooleanOperatorKind, ClassKind, DisplayKind, SortOrder, ThingId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Result type for settings persistence
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while reading or writing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file could not be accessed: {0}")]
    Io(#[from] io::Error),

    #[error("settings file is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no saved configuration named {0}")]
    UnknownConfiguration(String),
}

/// Persisted form of one axis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfigurationRecord {
    pub class_kind: Option<ClassKind>,
    #[serde(default)]
    pub categories: Vec<ThingId>,
    #[serde(default)]
    pub owners: Vec<ThingId>,
    #[serde(default)]
    pub boolean_operator: CategoryBooleanOperatorKind,
    #[serde(default = "default_true")]
    pub include_subcategories: bool,
    #[serde(default)]
    pub display_kind: DisplayKind,
    #[serde(default)]
    pub sort_kind: DisplayKind,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_true() -> bool {
    true
}

/// Identifies a relationship rule across sessions by what it governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReference {
    pub relationship_category: ThingId,
    pub kind_y: ClassKind,
    pub kind_x: ClassKind,
}

/// A named, user-persisted matrix setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_y: SourceConfigurationRecord,
    pub source_x: SourceConfigurationRecord,
    #[serde(default)]
    pub relationship_rule: Option<RuleReference>,
    #[serde(default)]
    pub show_directionality: bool,
    #[serde(default)]
    pub show_related_only: bool,
    #[serde(default)]
    pub highlight_unrelated: bool,
}

/// Settings of the relationship matrix plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Class kinds offered on each axis
    pub possible_class_kinds: Vec<ClassKind>,
    /// Display kinds offered for headers
    pub possible_display_kinds: Vec<DisplayKind>,
    /// Whether deprecated things are displayed
    #[serde(default)]
    pub show_deprecated: bool,
    #[serde(default)]
    pub saved_configurations: Vec<SavedConfiguration>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            possible_class_kinds: vec![
                ClassKind::ElementDefinition,
                ClassKind::ElementUsage,
                ClassKind::Requirement,
                ClassKind::RequirementsSpecification,
                ClassKind::RequirementsGroup,
                ClassKind::PossibleFiniteStateList,
                ClassKind::DesignOption,
            ],
            possible_display_kinds: vec![DisplayKind::Name, DisplayKind::ShortName],
            show_deprecated: false,
            saved_configurations: Vec::new(),
        }
    }
}

impl PluginSettings {
    /// Read settings from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                let settings: Self = serde_json::from_str(&content)?;
                debug!(
                    path = %path.display(),
                    configurations = settings.saved_configurations.len(),
                    "Settings loaded"
                );
                Ok(settings)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    pub fn configuration(&self, name: &str) -> SettingsResult<&SavedConfiguration> {
        self.saved_configurations
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SettingsError::UnknownConfiguration(name.to_string()))
    }

    /// Add a configuration, replacing any with the same name
    pub fn upsert_configuration(&mut self, configuration: SavedConfiguration) {
        match self.saved_configurations.iter_mut().find(|c| c.name == configuration.name) {
            Some(existing) => *existing = configuration,
            None => self.saved_configurations.push(configuration),
        }
    }

    pub fn remove_configuration(&mut self, name: &str) -> SettingsResult<SavedConfiguration> {
        let index = self
            .saved_configurations
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SettingsError::UnknownConfiguration(name.to_string()))?;
        Ok(self.saved_configurations.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ClassKind) -> SourceConfigurationRecord {
        SourceConfigurationRecord {
            class_kind: Some(kind),
            categories: vec![ThingId::new()],
            owners: Vec::new(),
            boolean_operator: CategoryBooleanOperatorKind::Or,
            include_subcategories: false,
            display_kind: DisplayKind::ShortName,
            sort_kind: DisplayKind::Name,
            sort_order: SortOrder::Descending,
        }
    }

    fn configuration(name: &str) -> SavedConfiguration {
        SavedConfiguration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "trace matrix".to_string(),
            source_y: record(ClassKind::ElementDefinition),
            source_x: record(ClassKind::Requirement),
            relationship_rule: Some(RuleReference {
                relationship_category: ThingId::new(),
                kind_y: ClassKind::ElementDefinition,
                kind_x: ClassKind::Requirement,
            }),
            show_directionality: true,
            show_related_only: false,
            highlight_unrelated: true,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin").join("settings.json");

        let mut settings = PluginSettings::default();
        settings.show_deprecated = true;
        settings.upsert_configuration(configuration("trace"));
        settings.save(&path).unwrap();

        let loaded = PluginSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(PluginSettings::load(path).unwrap(), PluginSettings::default());
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut settings = PluginSettings::default();
        settings.upsert_configuration(configuration("trace"));
        let mut replacement = configuration("trace");
        replacement.show_related_only = true;
        settings.upsert_configuration(replacement);

        assert_eq!(settings.saved_configurations.len(), 1);
        assert!(settings.configuration("trace").unwrap().show_related_only);
        assert!(matches!(
            settings.configuration("other"),
            Err(SettingsError::UnknownConfiguration(_))
        ));
        assert!(settings.remove_configuration("trace").is_ok());
    }

    #[test]
    fn test_record_defaults() {
        let json = r#"{ "class_kind": "Requirement" }"#;
        let record: SourceConfigurationRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.class_kind, Some(ClassKind::Requirement));
        assert!(record.include_subcategories);
        assert_eq!(record.boolean_operator, CategoryBooleanOperatorKind::And);
    }
}
