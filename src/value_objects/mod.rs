//! Matrix value objects
//!
//! Value objects are immutable types that represent concepts shared by the object graph
//! and the matrix read model. They are compared by value rather than identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of any thing in the engineering model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThingId(Uuid);

impl ThingId {
    /// Create a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ThingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ThingId> for Uuid {
    fn from(id: ThingId) -> Self {
        id.0
    }
}

/// Identity of an iteration, the versioned scope of a working data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationId(Uuid);

impl IterationId {
    /// Create a new random iteration identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IterationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IterationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The type tag distinguishing kinds of things
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassKind {
    ElementDefinition,
    ElementUsage,
    NestedElement,
    Requirement,
    RequirementsSpecification,
    RequirementsGroup,
    Parameter,
    ParameterOverride,
    PossibleFiniteStateList,
    ActualFiniteStateList,
    DesignOption,
    BinaryRelationship,
    BinaryRelationshipRule,
    Category,
    DomainOfExpertise,
}

impl ClassKind {
    /// Every class kind, in declaration order
    pub const ALL: [ClassKind; 15] = [
        ClassKind::ElementDefinition,
        ClassKind::ElementUsage,
        ClassKind::NestedElement,
        ClassKind::Requirement,
        ClassKind::RequirementsSpecification,
        ClassKind::RequirementsGroup,
        ClassKind::Parameter,
        ClassKind::ParameterOverride,
        ClassKind::PossibleFiniteStateList,
        ClassKind::ActualFiniteStateList,
        ClassKind::DesignOption,
        ClassKind::BinaryRelationship,
        ClassKind::BinaryRelationshipRule,
        ClassKind::Category,
        ClassKind::DomainOfExpertise,
    ];

    /// Whether things of this kind carry a name and a short-name
    pub fn is_defined(&self) -> bool {
        !matches!(
            self,
            ClassKind::Parameter
                | ClassKind::ParameterOverride
                | ClassKind::NestedElement
                | ClassKind::ActualFiniteStateList
                | ClassKind::BinaryRelationship
        )
    }

    /// Whether things of this kind can be member of categories
    pub fn is_categorizable(&self) -> bool {
        matches!(
            self,
            ClassKind::ElementDefinition
                | ClassKind::ElementUsage
                | ClassKind::Requirement
                | ClassKind::RequirementsSpecification
                | ClassKind::RequirementsGroup
                | ClassKind::PossibleFiniteStateList
                | ClassKind::DesignOption
                | ClassKind::BinaryRelationship
        )
    }

    /// Whether things of this kind are usages that inherit categories from a definition
    pub fn is_usage(&self) -> bool {
        matches!(self, ClassKind::ElementUsage)
    }

    /// Get the string representation of the class kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassKind::ElementDefinition => "ElementDefinition",
            ClassKind::ElementUsage => "ElementUsage",
            ClassKind::NestedElement => "NestedElement",
            ClassKind::Requirement => "Requirement",
            ClassKind::RequirementsSpecification => "RequirementsSpecification",
            ClassKind::RequirementsGroup => "RequirementsGroup",
            ClassKind::Parameter => "Parameter",
            ClassKind::ParameterOverride => "ParameterOverride",
            ClassKind::PossibleFiniteStateList => "PossibleFiniteStateList",
            ClassKind::ActualFiniteStateList => "ActualFiniteStateList",
            ClassKind::DesignOption => "Option",
            ClassKind::BinaryRelationship => "BinaryRelationship",
            ClassKind::BinaryRelationshipRule => "BinaryRelationshipRule",
            ClassKind::Category => "Category",
            ClassKind::DomainOfExpertise => "DomainOfExpertise",
        }
    }

    /// Parse a class kind from its string representation
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which field of a thing is displayed or sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayKind {
    #[default]
    Name,
    ShortName,
}

impl fmt::Display for DisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayKind::Name => f.write_str("Name"),
            DisplayKind::ShortName => f.write_str("ShortName"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// How the selected categories of an axis are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CategoryBooleanOperatorKind {
    /// A thing must match every selected category
    #[default]
    And,
    /// A thing must match at least one selected category
    Or,
}

impl fmt::Display for CategoryBooleanOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryBooleanOperatorKind::And => f.write_str("AND"),
            CategoryBooleanOperatorKind::Or => f.write_str("OR"),
        }
    }
}

/// Directionality of the relationships found in a matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RelationshipDirectionKind {
    /// No relationship between the row thing and the column thing
    #[default]
    None,
    /// Every relationship goes from the row thing to the column thing
    RowToColumn,
    /// Every relationship goes from the column thing to the row thing
    ColumnToRow,
    /// Relationships exist in both directions
    BiDirectional,
}

impl RelationshipDirectionKind {
    /// Whether at least one relationship exists
    pub fn is_related(&self) -> bool {
        !matches!(self, RelationshipDirectionKind::None)
    }
}

/// One of the two configurable dimensions of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The rows
    Y,
    /// The columns
    X,
}

impl Axis {
    /// The other axis
    pub fn other(&self) -> Self {
        match self {
            Axis::Y => Axis::X,
            Axis::X => Axis::Y,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Y => f.write_str("rows"),
            Axis::X => f.write_str("columns"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_kind_round_trips_through_str() {
        for kind in ClassKind::ALL {
            assert_eq!(ClassKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ClassKind::parse("Unknown"), None);
    }

    #[test]
    fn test_relationships_are_not_defined_things() {
        assert!(!ClassKind::BinaryRelationship.is_defined());
        assert!(ClassKind::ElementDefinition.is_defined());
        assert!(ClassKind::Requirement.is_categorizable());
        assert!(!ClassKind::Parameter.is_categorizable());
    }

    #[test]
    fn test_axis_other() {
        assert_eq!(Axis::Y.other(), Axis::X);
        assert_eq!(Axis::X.other(), Axis::Y);
    }

    #[test]
    fn test_boolean_operator_display() {
        assert_eq!(CategoryBooleanOperatorKind::And.to_string(), "AND");
        assert_eq!(CategoryBooleanOperatorKind::Or.to_string(), "OR");
    }
}
