use serde::{Deserialize, Serialize};

pub const HTTP_01: &str = "http-01";
pub const DNS_01: &str = "dns-01";
pub const TLS_ALPN_01: &str = "tls-alpn-01";

/// Challenge types this crate can verify locally
pub const SUPPORTED_CHALLENGE_TYPES: &[&str] = &[HTTP_01, DNS_01];

/// ACME identifier (only the "dns" type is ordered by this crate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
}

impl Identifier {
    pub fn dns(value: impl Into<String>) -> Self {
        Self {
            id_type: "dns".to_string(),
            value: value.into(),
        }
    }
}

/// newAccount payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub terms_of_service_agreed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<String>,
}

/// Account as returned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub contact: Vec<String>,
}

/// newOrder payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub identifiers: Vec<Identifier>,
}

/// ACME order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order URL from the Location header; not part of the JSON body
    #[serde(skip)]
    pub url: String,
    pub status: String,
    #[serde(default)]
    pub expires: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub authorizations: Vec<String>,
    pub finalize: String,
    #[serde(default)]
    pub certificate: Option<String>,
}

/// ACME authorization
#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    #[serde(skip)]
    pub url: String,
    pub identifier: Identifier,
    pub status: String,
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub wildcard: bool,
}

impl Authorization {
    pub fn is_valid(&self) -> bool {
        self.status == "valid"
    }

    /// Domain this authorization proves control of
    pub fn domain(&self) -> &str {
        &self.identifier.value
    }
}

/// ACME challenge
#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    pub challenge_type: String,
    pub url: String,
    pub token: String,
    pub status: String,
}
