//! Entra ID (Azure AD) directory objects.

use serde::{Deserialize, Serialize};

use super::{inbound_from, Label, Node, Relationship, RelationshipType};
use crate::error::DeriveError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppRole {
    pub id: String,
    pub value: String,
    pub display_name: String,
    pub allowed_member_types: Vec<String>,
    pub is_enabled: bool,
}

/// App registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub app_id: String,
    pub display_name: String,
    pub sign_in_audience: String,
    /// Object ids of owning users.
    pub owners: Vec<String>,
    pub app_roles: Vec<AppRole>,
}

impl Node for Application {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        Ok(inbound_from(
            &self.owners,
            Label::User,
            RelationshipType::Owns,
            Label::Application,
            &self.id,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub device_id: String,
    pub display_name: String,
    pub operating_system: String,
    pub account_enabled: bool,
    pub registered_users: Vec<String>,
}

impl Node for Device {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        Ok(inbound_from(
            &self.registered_users,
            Label::User,
            RelationshipType::RegisteredTo,
            Label::Device,
            &self.id,
        ))
    }
}
