//! Protocol compilation: the instruction walk and the tip lifecycle.
//!
//! The entry point is [`ProtocolCompiler`]. Construct it from a
//! [`ProtocolDocument`], then call [`ProtocolCompiler::submit`] with a
//! [`LabwareRegistry`] and an [`InstrumentDriver`]: validation runs first and
//! aborts before any driver call when it finds errors; execution then walks
//! the instruction list strictly in document order.
//!
//! Compilation is single-threaded and strictly sequential: tip contents are
//! path-dependent, so reordering or parallelizing dispatch would change the
//! physical result. There is no cancellation and no mid-stream resume; a
//! compile either runs to completion or aborts at the first fatal error.

use crate::command::Command;
use crate::deck::{Container, LabwareRegistry, build_deck};
use crate::driver::{InstrumentDriver, WellAddress};
use crate::error::ProtocolError;
use crate::head::{Instrument, build_head};
use crate::protocol::{
    DeckEntry, Group, InstructionBlock, ProtocolDocument, ToolSpec, ValidationReport,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Infinite cyclic supply of fresh tips for one tool.
///
/// Flattens the tool's tip racks in declared order (rack order, then well
/// order within each rack) and advances exactly one well per command group.
/// The cycle never restarts within a compilation and is never shared between
/// tools.
#[derive(Clone, Debug)]
pub struct TipSource {
    tips: Vec<WellAddress>,
    cursor: usize,
}

impl TipSource {
    /// Builds the supply from an instrument's resolved tip racks.
    ///
    /// A tool whose racks hold no wells at all can never pick up a tip; that
    /// is a fatal configuration error rather than an endless wait.
    pub fn new(
        instrument: &Instrument,
        containers: &IndexMap<String, Container>,
    ) -> Result<Self, ProtocolError> {
        let mut tips = Vec::new();
        for rack_name in &instrument.tip_racks {
            let rack = containers.get(rack_name).ok_or_else(|| {
                ProtocolError::Reference(format!("tip rack {rack_name:?} is not on the deck"))
            })?;
            for well in &rack.wells {
                tips.push(WellAddress::new(&rack.name, &well.id));
            }
        }
        if tips.is_empty() {
            return Err(ProtocolError::Config {
                tool: instrument.name.clone(),
                message: "tip racks hold no wells to pick from".into(),
            });
        }
        Ok(Self { tips, cursor: 0 })
    }

    /// Yields the next tip, wrapping around when the racks are spent.
    pub fn next_tip(&mut self) -> WellAddress {
        let tip = self.tips[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.tips.len();
        tip
    }
}

impl Iterator for TipSource {
    type Item = WellAddress;

    fn next(&mut self) -> Option<WellAddress> {
        Some(self.next_tip())
    }
}

/// Compiles a protocol document into an ordered instrument-driver call stream.
pub struct ProtocolCompiler {
    document: ProtocolDocument,
}

impl ProtocolCompiler {
    pub fn new(document: ProtocolDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &ProtocolDocument {
        &self.document
    }

    /// Structural validation; see [`ProtocolDocument::validate`].
    pub fn validate(&self) -> ValidationReport {
        self.document.validate()
    }

    /// Validates, then executes.
    ///
    /// Errors abort with [`ProtocolError::Validation`] before any driver call
    /// is issued; warnings are logged and never block.
    pub fn submit(
        &self,
        registry: &dyn LabwareRegistry,
        driver: &mut dyn InstrumentDriver,
    ) -> Result<ValidationReport, ProtocolError> {
        let report = self.validate();
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        if !report.is_clean() {
            return Err(ProtocolError::Validation(report.errors.clone()));
        }
        self.execute(registry, driver)?;
        Ok(report)
    }

    /// Builds the deck and head, then runs every instruction block in
    /// document order.
    pub fn execute(
        &self,
        registry: &dyn LabwareRegistry,
        driver: &mut dyn InstrumentDriver,
    ) -> Result<(), ProtocolError> {
        let (head, deck, instructions) = self.sections()?;
        let containers = build_deck(deck, registry)?;
        let instruments = build_head(head, &containers)?;

        for block in instructions {
            let instrument = instruments.get(&block.tool).ok_or_else(|| {
                ProtocolError::Reference(format!(
                    "instruction block names unknown tool {:?}",
                    block.tool
                ))
            })?;
            log::debug!(
                "compiling block for tool {:?} ({} groups)",
                block.tool,
                block.groups.len()
            );
            let mut tips = TipSource::new(instrument, &containers)?;
            for group in &block.groups {
                run_group(driver, instrument, &containers, group, &mut tips)?;
            }
        }
        Ok(())
    }

    fn sections(
        &self,
    ) -> Result<
        (
            &IndexMap<String, ToolSpec>,
            &IndexMap<String, DeckEntry>,
            &[InstructionBlock],
        ),
        ProtocolError,
    > {
        match (
            &self.document.head,
            &self.document.deck,
            &self.document.instructions,
        ) {
            (Some(head), Some(deck), Some(instructions)) => {
                Ok((head, deck, instructions.as_slice()))
            }
            _ => Err(ProtocolError::Validation(self.validate().errors)),
        }
    }
}

/// One tip lifecycle: pick up, run every command pair in order, drop.
///
/// A failing command aborts the whole compile with the tip still on; the
/// trailing drop is only issued after a fully clean group, and already-issued
/// calls are never rolled back.
fn run_group(
    driver: &mut dyn InstrumentDriver,
    instrument: &Instrument,
    containers: &IndexMap<String, Container>,
    group: &Group,
    tips: &mut TipSource,
) -> Result<(), ProtocolError> {
    driver.pick_up_tip(&tips.next_tip())?;
    for (tag, calls) in &group.0 {
        match calls {
            Value::Array(entries) => {
                for entry in entries {
                    Command::parse(tag, entry)?.execute(driver, instrument, containers)?;
                }
            }
            single => {
                Command::parse(tag, single)?.execute(driver, instrument, containers)?;
            }
        }
    }
    driver.drop_tip(&instrument.trash_container)?;
    Ok(())
}
