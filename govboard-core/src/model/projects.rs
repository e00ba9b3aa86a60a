//! Ecosystem project listings and the roles that may edit them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

const MAX_NAME_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Bech32 reward (stake) address, mainnet or testnet.
static STAKE_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^stake(_test)?1[02-9ac-hj-np-z]{50,60}$").expect("invalid stake address regex")
});

/// Asset unit: 28-byte policy id followed by up to 32 bytes of asset name, hex.
static ASSET_UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{56}([0-9a-f]{2}){0,32}$").expect("invalid asset unit regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub category: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        for (field, value) in [("url", &self.url), ("logo_url", &self.logo_url)] {
            if let Some(value) = value {
                if !(value.starts_with("https://") || value.starts_with("http://")) {
                    return Err(ValidationError::InvalidFormat {
                        field,
                        reason: "must be an http(s) URL",
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            other => Err(ValidationError::InvalidVariant {
                field: "role",
                value: other.to_owned(),
            }),
        }
    }
}

/// What a role is bound to: a wallet's stake address or ownership of an NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Wallet,
    Nft,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Nft => "nft",
        }
    }

    /// Check that `principal` is well formed for this kind.
    pub fn validate(&self, principal: &str) -> Result<(), ValidationError> {
        if principal.is_empty() {
            return Err(ValidationError::Empty { field: "principal" });
        }
        let ok = match self {
            Self::Wallet => STAKE_ADDRESS_RE.is_match(principal),
            Self::Nft => ASSET_UNIT_RE.is_match(principal),
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidFormat {
                field: "principal",
                reason: match self {
                    Self::Wallet => "must be a bech32 stake address",
                    Self::Nft => "must be a hex asset unit (policy id + asset name)",
                },
            })
        }
    }
}

impl FromStr for PrincipalKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet" => Ok(Self::Wallet),
            "nft" => Ok(Self::Nft),
            other => Err(ValidationError::InvalidVariant {
                field: "principal_kind",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub project_id: Uuid,
    pub principal: String,
    pub principal_kind: PrincipalKind,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The caller of a request: a connected wallet and the asset units it holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    pub stake_address: Option<String>,
    pub asset_units: Vec<String>,
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        self.stake_address.is_none() && self.asset_units.is_empty()
    }

    /// Whether `role` is granted to this caller.
    pub fn holds(&self, role: &ProjectRole) -> bool {
        match role.principal_kind {
            PrincipalKind::Wallet => self.stake_address.as_deref() == Some(role.principal.as_str()),
            PrincipalKind::Nft => self.asset_units.iter().any(|unit| unit == &role.principal),
        }
    }

    /// Highest role this caller holds among `roles`.
    pub fn best_role<'a>(&self, roles: impl IntoIterator<Item = &'a ProjectRole>) -> Option<Role> {
        let mut best = None;
        for role in roles.into_iter().filter(|r| self.holds(r)) {
            match role.role {
                Role::Admin => return Some(Role::Admin),
                Role::Editor => best = Some(Role::Editor),
            }
        }
        best
    }
}
