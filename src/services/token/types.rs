use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Trust tier carried by a token.
///
/// `None` exists on the wire but never authorizes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    None,
    Client,
    Session,
    Server,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Client => "CLIENT",
            Self::Session => "SESSION",
            Self::Server => "SERVER",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token type: {0:?}")]
pub struct UnknownTokenType(pub String);

impl FromStr for TokenType {
    type Err = UnknownTokenType;

    // Names are compared case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::None, Self::Client, Self::Session, Self::Server]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTokenType(s.to_string()))
    }
}

/// The token types a route accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedTokenTypes(BTreeSet<TokenType>);

impl AllowedTokenTypes {
    pub fn new(types: impl IntoIterator<Item = TokenType>) -> Self {
        Self(types.into_iter().collect())
    }

    /// `NONE` never matches, even when it was registered for the route.
    pub fn permits(&self, actual: TokenType) -> bool {
        actual != TokenType::None && self.0.contains(&actual)
    }
}

impl fmt::Display for AllowedTokenTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("]")
    }
}

impl<const N: usize> From<[TokenType; N]> for AllowedTokenTypes {
    fn from(types: [TokenType; N]) -> Self {
        Self::new(types)
    }
}

/// JSON carried in the second token segment.
///
/// Every field is optional on the wire: missing time fields read as zero and a
/// missing secret fails later, in the decryption stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub date_created: i64,
    #[serde(default, rename = "expiryInMilliSeconds")]
    pub expiry_in_milli_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Caller-supplied claims from the decrypted secret.
pub type Assertions = serde_json::Map<String, serde_json::Value>;

/// Expiry sentinel for tokens that never expire. Any negative expiry behaves the same.
pub const EXPIRY_NEVER: i64 = -1;
