//! Graph data model: labels, relationship descriptors and the [`Node`] capability.
//!
//! Concrete entity types live in [`aws`] and [`entra`]. Each one is decoded fresh
//! from a single input line, asked for its relationships, projected to a flat
//! property map and then dropped; the graph store is the only place a graph exists.

pub mod arn;
pub mod aws;
pub mod entra;
pub mod properties;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeriveError;

pub use properties::{flatten_map, project, Properties, EXCLUDED_PROPERTIES};

/// Name of the identity property on every node, and the default endpoint
/// property of relationships.
pub const IDENTITY_PROPERTY: &str = "id";

/// Type tag attached to a node. A node usually carries a specific label
/// (e.g. `Account`) plus a general one (e.g. `Resource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    Organization,
    Account,
    Role,
    User,
    Group,
    Application,
    Device,
    Resource,
    Principal,
}

impl Label {
    pub const ALL: [Label; 9] = [
        Label::Organization,
        Label::Account,
        Label::Role,
        Label::User,
        Label::Group,
        Label::Application,
        Label::Device,
        Label::Resource,
        Label::Principal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Organization => "Organization",
            Label::Account => "Account",
            Label::Role => "Role",
            Label::User => "User",
            Label::Group => "Group",
            Label::Application => "Application",
            Label::Device => "Device",
            Label::Resource => "Resource",
            Label::Principal => "Principal",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(name: &str) -> Option<Label> {
        Label::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    Manages,
    MemberOf,
    Trusts,
    Owns,
    RegisteredTo,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Manages => "Manages",
            RelationshipType::MemberOf => "MemberOf",
            RelationshipType::Trusts => "Trusts",
            RelationshipType::Owns => "Owns",
            RelationshipType::RegisteredTo => "RegisteredTo",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge descriptor. Endpoints are addressed by
/// (label, property, value) and may not exist yet when the edge is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub source_node_id: String,
    pub target_node_id: String,
    pub source_label: Label,
    pub target_label: Label,
    pub relationship_type: RelationshipType,
    pub properties: Properties,
    /// Identity property on the source endpoint; `id` when unset.
    pub source_property: Option<String>,
    /// Identity property on the target endpoint; `id` when unset.
    pub target_property: Option<String>,
}

impl Relationship {
    pub fn new(
        source_label: Label,
        source_node_id: impl Into<String>,
        relationship_type: RelationshipType,
        target_label: Label,
        target_node_id: impl Into<String>,
    ) -> Self {
        Self {
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            source_label,
            target_label,
            relationship_type,
            properties: Properties::new(),
            source_property: None,
            target_property: None,
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Wire form with unset endpoint properties defaulted to `id`.
    pub fn into_row(self) -> RelationshipRow {
        RelationshipRow {
            source_label: self.source_label.as_str().to_string(),
            source_property: self
                .source_property
                .unwrap_or_else(|| IDENTITY_PROPERTY.to_string()),
            source_value: self.source_node_id,
            target_label: self.target_label.as_str().to_string(),
            target_property: self
                .target_property
                .unwrap_or_else(|| IDENTITY_PROPERTY.to_string()),
            target_value: self.target_node_id,
            relationship_type: self.relationship_type.as_str().to_string(),
            properties: self.properties,
        }
    }
}

/// One entry of a relationship merge batch as sent to the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRow {
    pub source_label: String,
    pub source_property: String,
    pub source_value: String,
    pub target_label: String,
    pub target_property: String,
    pub target_value: String,
    pub relationship_type: String,
    pub properties: Properties,
}

/// Capability shared by every entity variant.
///
/// Implementations only read their own decoded fields; no lookups.
pub trait Node: Send + Sync + fmt::Debug {
    /// Stable identity value, unique within the entity's label.
    fn identity(&self) -> &str;

    /// Relationship descriptors implied by this entity's fields.
    /// Order is not significant.
    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError>;
}

/// Relationships from each id in `members` to the entity itself.
pub(crate) fn inbound_from(
    members: &[String],
    member_label: Label,
    relationship_type: RelationshipType,
    target_label: Label,
    target_id: &str,
) -> Vec<Relationship> {
    members
        .iter()
        .filter(|member| !member.trim().is_empty())
        .map(|member| {
            Relationship::new(
                member_label,
                member.trim(),
                relationship_type,
                target_label,
                target_id,
            )
        })
        .collect()
}
