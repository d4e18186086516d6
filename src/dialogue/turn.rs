//! Turns and transcripts.

use serde::{Deserialize, Serialize};

/// Which side of the negotiation spoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The seller pitching the product.
    ProductSide,
    /// The buyer speaking in character as a persona.
    PersonaSide,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::ProductSide => "seller",
            Role::PersonaSide => "buyer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![text.into()],
        }
    }

    /// All segments joined with newlines.
    pub fn text(&self) -> String {
        self.parts.join("\n")
    }
}

/// Chronologically ordered turns of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Turns are never edited or removed.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_text_joins_parts() {
        let turn = Turn {
            role: Role::ProductSide,
            parts: vec!["Hello.".into(), "Interested?".into()],
        };
        assert_eq!(turn.text(), "Hello.\nInterested?");
    }

    #[test]
    fn test_transcript_serializes_as_list() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::new(Role::ProductSide, "Hi"));
        transcript.push(Turn::new(Role::PersonaSide, "No thanks"));
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "product_side", "parts": ["Hi"]},
                {"role": "persona_side", "parts": ["No thanks"]},
            ])
        );
    }
}
