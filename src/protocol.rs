//! Protocol document loading and structural validation.
//!
//! The entry point is [`ProtocolDocument`]. Parse one with
//! [`ProtocolDocument::load`] (filesystem path or raw JSON text), inspect it
//! with [`ProtocolDocument::validate`], then hand it to
//! [`crate::ProtocolCompiler`] for execution.
//!
//! Declaration order is load-bearing everywhere in a protocol: instruction
//! blocks run in document order, command-type pairs inside a group run in
//! declared order, and tip racks are consumed in list order. Every mapping in
//! this module is therefore an [`IndexMap`], never an unordered map.

use crate::error::ProtocolError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Raw tool configuration as declared in the `head` section.
///
/// Kept as an ordered map of untyped values so the head builder can check the
/// key set against the supported-option list before any field is interpreted.
pub type ToolSpec = IndexMap<String, Value>;

/// One `deck` entry: a labware type placed at a slot.
///
/// A deck name declared twice keeps its first position but takes the last
/// declaration's labware and slot.
#[derive(Clone, Debug, Deserialize)]
pub struct DeckEntry {
    pub labware: String,
    pub slot: String,
}

/// One `instructions` entry: a tool name and its ordered command groups.
#[derive(Clone, Debug, Deserialize)]
pub struct InstructionBlock {
    pub tool: String,
    pub groups: Vec<Group>,
}

/// An ordered set of (command-type, calls) pairs sharing one tip lifecycle.
///
/// The value of each pair is either a single call object or an array of call
/// objects; both forms appear in the wild and both are dispatched in order.
#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub struct Group(pub IndexMap<String, Value>);

/// The parsed, order-preserving protocol document.
///
/// Top-level sections are optional at the type level so that a missing
/// section surfaces as a validation finding rather than a parse failure.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProtocolDocument {
    pub head: Option<IndexMap<String, ToolSpec>>,
    pub deck: Option<IndexMap<String, DeckEntry>>,
    pub instructions: Option<Vec<InstructionBlock>>,
    /// Declared by many protocols but never consumed by the compiler.
    pub ingredients: Option<Value>,
}

/// Outcome of structural validation: collected errors and warnings.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// True when no errors were collected. Warnings never block.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ProtocolDocument {
    /// Parses a protocol from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a protocol from raw JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Converts an already-parsed JSON value into a protocol document.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Loads a protocol from either a filesystem path or raw JSON text.
    ///
    /// If `input` names an existing file it is read and parsed; otherwise the
    /// string itself is parsed as JSON. Anything that is neither fails with
    /// [`ProtocolError::Format`].
    pub fn load(input: &str) -> Result<Self, ProtocolError> {
        if Path::new(input).is_file() {
            Self::from_file(input)
        } else {
            Self::from_json(input)
        }
    }

    /// Checks structural completeness without touching any hardware.
    ///
    /// Missing `head`, `deck`, or `instructions` sections each collect one
    /// error; a missing `ingredients` section collects exactly one warning.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        if self.head.is_none() {
            report
                .errors
                .push("protocol is missing the \"head\" section".into());
        }
        if self.deck.is_none() {
            report
                .errors
                .push("protocol is missing the \"deck\" section".into());
        }
        if self.instructions.is_none() {
            report
                .errors
                .push("protocol is missing the \"instructions\" section".into());
        }
        if self.ingredients.is_none() {
            report
                .warnings
                .push("protocol section \"ingredients\" will not be used".into());
        }
        report
    }
}
