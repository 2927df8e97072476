//! Things of the engineering model
//!
//! A [`Thing`] is the flattened view of any categorizable, nameable entity the matrix can
//! place on an axis: element definitions, usages, requirements and so on. The class kind
//! tag decides which capabilities apply.

use crate::value_objects::{ClassKind, DisplayKind, ThingId};
use serde::{Deserialize, Serialize};

/// An entity of the engineering model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    /// Unique identifier of the thing
    pub id: ThingId,
    /// Type tag of the thing
    pub class_kind: ClassKind,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Short-name, used as the column field name in the matrix
    #[serde(default)]
    pub short_name: String,
    /// Categories the thing is a member of
    #[serde(default)]
    pub categories: Vec<ThingId>,
    /// Containing thing, if any
    #[serde(default)]
    pub container: Option<ThingId>,
    /// Owning domain of expertise
    #[serde(default)]
    pub owner: Option<ThingId>,
    /// For usages, the definition the usage refers to
    #[serde(default)]
    pub definition: Option<ThingId>,
    /// Whether the thing is flagged deprecated
    #[serde(default)]
    pub is_deprecated: bool,
    /// Revision number, bumped on every update
    #[serde(default)]
    pub revision: u32,
}

impl Thing {
    /// Create a new thing with a fresh identifier
    pub fn new(class_kind: ClassKind, name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            id: ThingId::new(),
            class_kind,
            name: name.into(),
            short_name: short_name.into(),
            categories: Vec::new(),
            container: None,
            owner: None,
            definition: None,
            is_deprecated: false,
            revision: 0,
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = ThingId>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_owner(mut self, owner: ThingId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_container(mut self, container: ThingId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_definition(mut self, definition: ThingId) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }

    /// The field displayed for the given display kind
    pub fn display(&self, kind: DisplayKind) -> &str {
        match kind {
            DisplayKind::Name => &self.name,
            DisplayKind::ShortName => &self.short_name,
        }
    }

    /// Name followed by the short-name, as shown in tooltips
    pub fn user_friendly_name(&self) -> String {
        format!("{} [{}]", self.name, self.short_name)
    }

    /// Whether the thing is a member of the given category
    pub fn is_member_of(&self, category: &ThingId) -> bool {
        self.categories.contains(category)
    }
}
