//! Structured parsing of Amazon Resource Names.
//!
//! `arn:partition:service:region:account-id:resource`, where the resource part
//! may itself contain `:` and `/`.

use crate::error::ArnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    pub fn parse(input: &'a str) -> Result<Self, ArnError> {
        let mut parts = input.splitn(6, ':');
        if parts.next() != Some("arn") {
            return Err(ArnError::NotAnArn(input.to_string()));
        }

        let mut component = |name: &'static str, required: bool| match parts.next() {
            Some(value) if !required || !value.is_empty() => Ok(value),
            _ => Err(ArnError::MissingComponent {
                input: input.to_string(),
                component: name,
            }),
        };
        let partition = component("partition", true)?;
        let service = component("service", true)?;
        let region = component("region", false)?;
        let account_id = component("account", false)?;
        let resource = component("resource", true)?;

        if !account_id.is_empty() && !is_account_id(account_id) {
            return Err(ArnError::InvalidAccountId {
                input: input.to_string(),
                account: account_id.to_string(),
            });
        }

        Ok(Arn {
            partition,
            service,
            region,
            account_id,
            resource,
        })
    }

    /// Owning account, failing for account-less ARNs such as S3 buckets.
    pub fn require_account(&self) -> Result<&'a str, ArnError> {
        if self.account_id.is_empty() {
            return Err(ArnError::MissingComponent {
                input: self.to_string(),
                component: "account",
            });
        }
        Ok(self.account_id)
    }
}

impl std::fmt::Display for Arn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

/// Twelve ASCII digits.
pub fn is_account_id(value: &str) -> bool {
    value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Account id of the ARN's owner.
pub fn owning_account(arn: &str) -> Result<&str, ArnError> {
    Arn::parse(arn)?.require_account()
}
