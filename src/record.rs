//! Instrument records and their composite keys
use super::error::LedgerError;
use super::workflow::{self, Workflow};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved separator between identity fields, never allowed inside one.
pub const KEY_DELIMITER: char = '\u{0}';

/// Lookup token derived from a record's identity tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn from_identity<S: AsRef<str>>(identity: &[S]) -> Result<Self, LedgerError> {
        if identity.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "identity must contain at least one field".into(),
            ));
        }

        let mut key = String::new();
        for (i, part) in identity.iter().enumerate() {
            let part = part.as_ref();
            if part.is_empty() {
                return Err(LedgerError::InvalidArgument(format!(
                    "identity field {i} is empty"
                )));
            }
            if part.contains(KEY_DELIMITER) {
                return Err(LedgerError::InvalidArgument(format!(
                    "identity field {i} contains the reserved key delimiter"
                )));
            }
            if i > 0 {
                key.push(KEY_DELIMITER);
            }
            key.push_str(part);
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Human readable form, e.g. `BankA:00001`
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.split(KEY_DELIMITER).enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

/// One instrument as persisted in the world state.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    #[n(0)]
    kind: String,
    #[n(1)]
    identity: Vec<String>, // issuer, paper number
    #[n(2)]
    owner: Option<String>,
    #[n(3)]
    state: String,
    #[n(4)]
    attributes: BTreeMap<String, String>,
}

impl Record {
    /// Build a record in its workflow's initial state. The owner is left unset.
    pub fn create(
        kind: &str,
        identity: Vec<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<Self, LedgerError> {
        let workflow = workflow::lookup(kind)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("unknown kind {kind}")))?;

        if identity.len() != workflow.identity_fields.len() {
            return Err(LedgerError::InvalidArgument(format!(
                "{kind} identity expects {} fields ({}), got {}",
                workflow.identity_fields.len(),
                workflow.identity_fields.join(", "),
                identity.len()
            )));
        }
        CompositeKey::from_identity(identity.as_slice())?;

        Ok(Self {
            kind: workflow.kind.to_string(),
            identity,
            owner: None,
            state: workflow.initial.to_string(),
            attributes,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, LedgerError> {
        minicbor::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn deserialize(bytes: &[u8], kind: &str) -> Result<Self, LedgerError> {
        let fail = |reason: String| LedgerError::Deserialization {
            kind: kind.to_string(),
            reason,
        };

        let record: Record = minicbor::decode(bytes).map_err(|e| fail(e.to_string()))?;

        if record.kind != kind {
            return Err(fail(format!("record belongs to {}", record.kind)));
        }
        let workflow = workflow::lookup(kind).ok_or_else(|| fail("unknown kind".into()))?;
        if record.identity.len() != workflow.identity_fields.len() {
            return Err(fail(format!(
                "identity has {} fields",
                record.identity.len()
            )));
        }
        if !workflow.has_state(&record.state) {
            return Err(fail(format!("unknown state {}", record.state)));
        }

        Ok(record)
    }

    pub fn key(&self) -> Result<CompositeKey, LedgerError> {
        CompositeKey::from_identity(self.identity.as_slice())
    }

    /// Workflow table for this record's kind.
    pub fn workflow(&self) -> Result<&'static Workflow, LedgerError> {
        workflow::lookup(&self.kind)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("unknown kind {}", self.kind)))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
    pub fn identity(&self) -> &[String] {
        &self.identity
    }
    pub fn issuer(&self) -> &str {
        &self.identity[0]
    }
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
    pub fn state(&self) -> &str {
        &self.state
    }
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    // Mutation stays crate-private so only the engine and contract can move a record.
    pub(crate) fn set_owner(&mut self, owner: String) {
        self.owner = Some(owner);
    }
    pub(crate) fn set_state(&mut self, state: &str) {
        self.state = state.to_string();
    }
    pub(crate) fn set_attribute(&mut self, name: &str, value: String) {
        self.attributes.insert(name.to_string(), value);
    }
}
