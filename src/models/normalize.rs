// Persona-keyed map normalization
//
// Engine payloads key per-persona maps either by the typed persona identity
// or by its lowercase string form. Both denote the same entity; keys are
// parsed into `Persona` at the boundary and keys matching no known persona
// are dropped rather than surfaced as errors.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer};

use super::Persona;

/// A map key as the engine may deliver it: already typed, or raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PersonaKey {
    Persona(Persona),
    Name(String),
}

impl PersonaKey {
    /// Resolve to the typed identity, if the key names a known persona.
    pub fn resolve(&self) -> Option<Persona> {
        match self {
            PersonaKey::Persona(persona) => Some(*persona),
            PersonaKey::Name(name) => Persona::parse(name),
        }
    }
}

impl From<Persona> for PersonaKey {
    fn from(persona: Persona) -> Self {
        PersonaKey::Persona(persona)
    }
}

impl From<String> for PersonaKey {
    fn from(name: String) -> Self {
        PersonaKey::Name(name)
    }
}

impl From<&str> for PersonaKey {
    fn from(name: &str) -> Self {
        PersonaKey::Name(name.to_string())
    }
}

/// Re-key a dual-representation persona map by the typed identity.
///
/// Unknown keys are silently dropped; this is a lossy, defensive
/// normalization and never fails. Empty input yields an empty map.
pub fn normalize_persona_map<V>(
    entries: impl IntoIterator<Item = (PersonaKey, V)>,
) -> BTreeMap<Persona, V> {
    entries
        .into_iter()
        .filter_map(|(key, value)| key.resolve().map(|persona| (persona, value)))
        .collect()
}

/// serde helper applying [`normalize_persona_map`] during deserialization,
/// so downstream code only ever sees typed keys.
pub fn persona_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<Persona, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw: HashMap<String, V> = HashMap::deserialize(deserializer)?;
    Ok(normalize_persona_map(
        raw.into_iter().map(|(key, value)| (PersonaKey::from(key), value)),
    ))
}
