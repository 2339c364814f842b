//! Caller identity carried in bearer tokens

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Named capabilities granted by the access-control provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Elevated librarian capability: catalogue mutations, renewals and the
    /// all-borrowed listing
    CanMarkReturned,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanMarkReturned => "can_mark_returned",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "can_mark_returned" => Ok(Capability::CanMarkReturned),
            _ => Err(format!("Unknown capability: {}", s)),
        }
    }
}

/// JWT claims for an authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username
    pub sub: String,
    /// Borrower id of the caller
    pub user_id: i32,
    /// Names this server does not know are dropped
    #[serde(default, deserialize_with = "known_capabilities")]
    pub capabilities: Vec<Capability>,
    pub exp: i64,
    pub iat: i64,
}

/// Keep the capabilities this server understands, skip the rest
fn known_capabilities<'de, D>(deserializer: D) -> Result<Vec<Capability>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names.iter().filter_map(|name| name.parse().ok()).collect())
}

impl UserClaims {
    pub fn new(
        user_id: i32,
        username: impl Into<String>,
        capabilities: Vec<Capability>,
        ttl_hours: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: username.into(),
            user_id,
            capabilities,
            iat: now.timestamp(),
            exp: (now + Duration::hours(ttl_hours as i64)).timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
