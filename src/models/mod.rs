// Result data model for the MAGI consensus engine
//
// These records cross the engine boundary read-only: the engine produces
// them once per run and this crate renders them. Persona-keyed maps arrive
// string-keyed on the wire and are re-keyed by the typed `Persona` during
// deserialization (see `normalize`).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod normalize;

pub use normalize::{normalize_persona_map, PersonaKey};

/// The three MAGI personas.
///
/// Ordering follows the canonical display order (MELCHIOR, BALTHASAR,
/// CASPER); every tabular rendering iterates `Persona::ALL` rather than map
/// insertion order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Melchior,
    Balthasar,
    Casper,
}

impl Persona {
    /// Canonical display order.
    pub const ALL: [Persona; 3] = [Persona::Melchior, Persona::Balthasar, Persona::Casper];

    /// Lowercase string form used as the wire key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Melchior => "melchior",
            Persona::Balthasar => "balthasar",
            Persona::Casper => "casper",
        }
    }

    /// Parse the lowercase string form back into a persona.
    pub fn parse(value: &str) -> Option<Persona> {
        Persona::ALL.into_iter().find(|p| p.as_str() == value)
    }

    /// Display label (upper-case name).
    pub fn label(&self) -> &'static str {
        match self {
            Persona::Melchior => "MELCHIOR",
            Persona::Balthasar => "BALTHASAR",
            Persona::Casper => "CASPER",
        }
    }

    /// CSS class for the persona card.
    pub fn css_class(&self) -> &'static str {
        match self {
            Persona::Melchior => "persona-melchior",
            Persona::Balthasar => "persona-balthasar",
            Persona::Casper => "persona-casper",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persona's vote on the proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Approve,
    Deny,
    Conditional,
}

impl Vote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vote::Approve => "approve",
            Vote::Deny => "deny",
            Vote::Conditional => "conditional",
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final consensus decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
    Conditional,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Denied => "denied",
            Decision::Conditional => "conditional",
        }
    }

    /// CSS class selecting the banner color.
    pub fn css_class(&self) -> &'static str {
        match self {
            Decision::Approved => "decision-approved",
            Decision::Denied => "decision-denied",
            Decision::Conditional => "decision-conditional",
        }
    }

    /// Report label with status icon.
    pub fn report_label(&self) -> &'static str {
        match self {
            Decision::Approved => "\u{2705} APPROVED",
            Decision::Denied => "\u{274c} DENIED",
            Decision::Conditional => "\u{26a0}\u{fe0f} CONDITIONAL",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persona's thinking-phase output. Absent entries are a normal
/// "no output" case, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingOutput {
    pub persona: Persona,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// One persona's output within a debate round: directed responses to the
/// other personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutput {
    pub persona: Persona,
    pub round_number: u32,
    #[serde(default, deserialize_with = "normalize::persona_map")]
    pub responses: BTreeMap<Persona, String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// A single debate round. Rounds are 1-based and arrive in round-number
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRound {
    pub round_number: u32,
    #[serde(default, deserialize_with = "normalize::persona_map")]
    pub outputs: BTreeMap<Persona, DebateOutput>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// One persona's voting-phase output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOutput {
    pub persona: Persona,
    pub vote: Vote,
    pub reason: String,
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
}

/// The complete result of one consensus run.
///
/// `all_conditions` is the engine's flattened concatenation of per-persona
/// conditions; it preserves order and may contain duplicates — this layer
/// never deduplicates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    #[serde(default, deserialize_with = "normalize::persona_map")]
    pub thinking_results: BTreeMap<Persona, ThinkingOutput>,
    #[serde(default)]
    pub debate_results: Vec<DebateRound>,
    #[serde(default, deserialize_with = "normalize::persona_map")]
    pub voting_results: BTreeMap<Persona, VoteOutput>,
    pub final_decision: Decision,
    #[serde(default)]
    pub all_conditions: Vec<String>,
    #[serde(default)]
    pub exit_code: i32,
}

/// An ephemeral streaming unit emitted while a run is in flight.
///
/// `persona` stays a raw engine string: chunks predate normalization and
/// are matched against `Persona::as_str()` when filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub persona: String,
    pub chunk: String,
    pub phase: String,
    #[serde(default)]
    pub round_number: Option<u32>,
}

impl StreamChunk {
    pub fn new(
        persona: impl Into<String>,
        chunk: impl Into<String>,
        phase: impl Into<String>,
        round_number: Option<u32>,
    ) -> Self {
        Self {
            persona: persona.into(),
            chunk: chunk.into(),
            phase: phase.into(),
            round_number,
        }
    }
}

/// A user-supplied file forwarded to the engine for multimodal analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub filename: String,
}

/// Raw bytes as standard base64 on the JSON wire.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
