use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Labour-court code (`TRT1` through `TRT24`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TribunalCode(u8);

impl TribunalCode {
    pub const MAX_REGION: u8 = 24;

    pub fn new(region: u8) -> Option<Self> {
        (1..=Self::MAX_REGION).contains(&region).then_some(Self(region))
    }

    pub fn region(&self) -> u8 {
        self.0
    }
}

impl FromStr for TribunalCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("TRT")
            .ok_or_else(|| format!("invalid tribunal code: {s}"))?;
        // Reject leading zeros and signs so "TRT01" or "TRT+3" never alias a real court.
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format!("invalid tribunal code: {s}"));
        }
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("invalid tribunal code: {s}"))
    }
}

impl TryFrom<String> for TribunalCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TribunalCode> for String {
    fn from(code: TribunalCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for TribunalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRT{}", self.0)
    }
}

/// Court instance a process (and a credential) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grau {
    PrimeiroGrau,
    SegundoGrau,
    TribunalSuperior,
}

impl Grau {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grau::PrimeiroGrau => "primeiro_grau",
            Grau::SegundoGrau => "segundo_grau",
            Grau::TribunalSuperior => "tribunal_superior",
        }
    }
}

impl FromStr for Grau {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primeiro_grau" => Ok(Grau::PrimeiroGrau),
            "segundo_grau" => Ok(Grau::SegundoGrau),
            "tribunal_superior" => Ok(Grau::TribunalSuperior),
            other => Err(format!("invalid grau: {other}")),
        }
    }
}

impl fmt::Display for Grau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authentication scope shared by a group of work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub tribunal: TribunalCode,
    pub grau: Grau,
}

impl GroupKey {
    pub fn new(tribunal: TribunalCode, grau: Grau) -> Self {
        Self { tribunal, grau }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tribunal, self.grau)
    }
}

/// One process to fetch from a remote court system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    pub process_number: String,
    /// Identifier of the process on the court side.
    pub remote_id: i64,
    pub tribunal: TribunalCode,
    pub grau: Grau,
}

impl WorkItem {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.tribunal, self.grau)
    }

    /// Key under which the distributed lock for this item is taken.
    pub fn lock_key(&self) -> String {
        format!("captura:processo:{}", self.id)
    }
}

/// Login material for one court scope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub tribunal: TribunalCode,
    pub grau: Grau,
    pub login: String,
    pub password: String,
}

impl Credential {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.tribunal, self.grau)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("tribunal", &self.tribunal)
            .field("grau", &self.grau)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The lawyer on whose behalf a capture runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: i64,
    pub name: String,
    /// CPF used by the worker to recognise the requester's own clients.
    pub document: String,
}

/// Court-specific endpoints handed to the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribunalConfig {
    pub key: GroupKey,
    pub login_url: String,
    pub api_base_url: String,
    #[serde(default)]
    pub login_timeout_ms: Option<u64>,
}
