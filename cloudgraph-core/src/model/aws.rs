//! AWS Organizations and IAM entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::arn::{is_account_id, owning_account, Arn};
use super::{inbound_from, Label, Node, Relationship, RelationshipType};
use crate::error::DeriveError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub arn: String,
    pub master_account_id: String,
    pub master_account_email: String,
    pub feature_set: String,
}

impl Node for Organization {
    fn identity(&self) -> &str {
        &self.id
    }

    /// Membership edges come from the account side.
    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub email: String,
    pub status: String,
    pub joined_method: String,
    pub joined_timestamp: String,
    pub organization_id: String,
    /// Account is a member of `organization_id`.
    pub child_account: bool,
}

impl Node for Account {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        if !self.child_account {
            return Ok(Vec::new());
        }
        if self.organization_id.trim().is_empty() {
            return Err(DeriveError::MissingField {
                label: Label::Account,
                identity: self.id.clone(),
                field: "organizationId",
            });
        }
        Ok(vec![
            Relationship::new(
                Label::Organization,
                &self.organization_id,
                RelationshipType::Manages,
                Label::Account,
                &self.id,
            ),
            Relationship::new(
                Label::Account,
                &self.id,
                RelationshipType::MemberOf,
                Label::Organization,
                &self.organization_id,
            ),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub arn: String,
    pub user_name: String,
    pub path: String,
    pub create_date: String,
    pub password_last_used: String,
    pub tags: BTreeMap<String, String>,
}

impl Node for User {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        let account = owning_account(&self.arn)?;
        Ok(vec![Relationship::new(
            Label::User,
            &self.id,
            RelationshipType::MemberOf,
            Label::Account,
            account,
        )])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub arn: String,
    pub role_name: String,
    pub path: String,
    pub create_date: String,
    pub description: String,
    pub max_session_duration: u32,
    /// Principals from the trust policy: account ids, IAM ARNs or service names.
    pub trusted_principals: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl Role {
    /// AWS accounts named in the trust policy. Service principals are not accounts.
    fn trusted_accounts(&self) -> Vec<&str> {
        let mut accounts: Vec<&str> = self
            .trusted_principals
            .iter()
            .filter_map(|principal| {
                let principal = principal.trim();
                if is_account_id(principal) {
                    return Some(principal);
                }
                match Arn::parse(principal).and_then(|arn| arn.require_account()) {
                    Ok(account) => Some(account),
                    Err(e) => {
                        debug!(role = %self.id, principal, error = %e, "Trusted principal is not an account");
                        None
                    }
                }
            })
            .collect();
        accounts.sort_unstable();
        accounts.dedup();
        accounts
    }
}

impl Node for Role {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        let account = owning_account(&self.arn)?;
        let mut relationships = vec![Relationship::new(
            Label::Role,
            &self.id,
            RelationshipType::MemberOf,
            Label::Account,
            account,
        )];
        relationships.extend(self.trusted_accounts().into_iter().map(|trusted| {
            Relationship::new(
                Label::Role,
                &self.id,
                RelationshipType::Trusts,
                Label::Account,
                trusted,
            )
        }));
        Ok(relationships)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub arn: String,
    pub group_name: String,
    pub path: String,
    pub create_date: String,
    /// User ids.
    pub members: Vec<String>,
}

impl Node for Group {
    fn identity(&self) -> &str {
        &self.id
    }

    fn relationships(&self) -> Result<Vec<Relationship>, DeriveError> {
        let account = owning_account(&self.arn)?;
        let mut relationships = vec![Relationship::new(
            Label::Group,
            &self.id,
            RelationshipType::MemberOf,
            Label::Account,
            account,
        )];
        relationships.extend(inbound_from(
            &self.members,
            Label::User,
            RelationshipType::MemberOf,
            Label::Group,
            &self.id,
        ));
        Ok(relationships)
    }
}
