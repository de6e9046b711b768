use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(pub i64);

impl StoryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildId(pub i64);

impl ChildId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Conversation session identifier, assigned by the server on intro fetch.
///
/// Opaque on the client: it is captured once and echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Server-driven dialogue sub-stage marker ("S1".."Sn").
///
/// Advanced only from server responses; the client never computes the next
/// stage itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationStage(pub String);

impl ConversationStage {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_serde() {
        let s = serde_json::to_string(&StoryId::new(7)).unwrap();
        assert_eq!(s, "7");
        let back: StoryId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, StoryId::new(7));

        let stage: ConversationStage = serde_json::from_str("\"S2\"").unwrap();
        assert_eq!(stage.as_str(), "S2");
    }
}
