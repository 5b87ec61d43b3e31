use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Identifier of one connected client, assigned once per room visit.
///
/// A participant who rejoins gets a fresh identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ParticipantId::generate(), ParticipantId::generate());
    }

    #[test]
    fn display_matches_inner() {
        let id = ParticipantId::new("peer-a");
        assert_eq!(id.to_string(), "peer-a");
        assert_eq!(id.as_str(), "peer-a");
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ParticipantId::from("alice") < ParticipantId::from("bob"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ParticipantId::from("x1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"x1\"");
        let back: ParticipantId = serde_json::from_str("\"x1\"").unwrap();
        assert_eq!(back, id);
    }
}
