//! Deck layout: wells, containers, and the labware registry boundary.

use crate::error::ProtocolError;
use crate::protocol::DeckEntry;
use glam::DVec3;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An addressable position inside a [`Container`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Well {
    /// Well id within its container (e.g. `"A1"`).
    pub id: String,
    /// World-space center of the well opening.
    pub center: DVec3,
}

impl Well {
    pub fn new(id: impl Into<String>, center: DVec3) -> Self {
        Self {
            id: id.into(),
            center,
        }
    }
}

/// A labware instance placed at a deck slot.
///
/// Identity is the deck name the protocol assigned, not the labware type.
/// Owns its wells in declared order and is immutable once the deck is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub wells: Vec<Well>,
}

impl Container {
    pub fn new(name: impl Into<String>, wells: Vec<Well>) -> Self {
        Self {
            name: name.into(),
            wells,
        }
    }

    /// Looks up a well by id.
    pub fn well(&self, id: &str) -> Option<&Well> {
        self.wells.iter().find(|w| w.id == id)
    }
}

/// External lookup from labware type and slot to well geometry.
///
/// Implemented by the embedding application; the compiler only ever resolves
/// labware through this trait and never defines geometry itself.
pub trait LabwareRegistry {
    /// Returns the container geometry for a labware type placed at a slot,
    /// or `None` when the labware type is unknown.
    fn resolve(&self, labware: &str, slot: &str) -> Option<Container>;
}

/// Resolves every deck entry to a [`Container`] through the registry.
///
/// The resolved container is renamed to its deck name. An unknown labware
/// type is a fatal reference error.
pub fn build_deck(
    deck: &IndexMap<String, DeckEntry>,
    registry: &dyn LabwareRegistry,
) -> Result<IndexMap<String, Container>, ProtocolError> {
    let mut containers = IndexMap::new();
    for (name, entry) in deck {
        let mut container = registry.resolve(&entry.labware, &entry.slot).ok_or_else(|| {
            ProtocolError::Reference(format!(
                "no labware {:?} for deck entry {name:?} at slot {:?}",
                entry.labware, entry.slot
            ))
        })?;
        container.name = name.clone();
        containers.insert(name.clone(), container);
    }
    log::debug!("deck built: {} containers", containers.len());
    Ok(containers)
}
