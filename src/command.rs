//! The closed command set, tag dispatch, and the four pipetting handlers.
//!
//! Every handler bottoms out in the shared FROM/TO phases so the touch-tip,
//! tip-offset, blow-out, and delay policies behave identically no matter
//! which command drove them. Call order within a handler is part of the
//! contract: tip contents are path-dependent.

use crate::deck::Container;
use crate::driver::{InstrumentDriver, Location, WellAddress};
use crate::error::ProtocolError;
use crate::head::Instrument;
use glam::DVec3;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Fixed downward offset from a well center to its probe point.
const TIP_DESCENT: DVec3 = DVec3::new(0.0, 0.0, -1.0);

/// A source or target well with its per-call policies.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocationSpec {
    pub container: String,
    pub location: String,
    #[serde(default)]
    pub touch_tip: bool,
    /// Z-translation applied on top of the probe point.
    #[serde(default)]
    pub tip_offset: f64,
    /// Seconds to wait after the phase completes. Always issued, even at 0.
    #[serde(default)]
    pub delay: f64,
    /// Only honored on dispense targets.
    #[serde(default)]
    pub blowout: bool,
    /// Per-entry volume, required by distribute targets and consolidate sources.
    pub volume: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransferArgs {
    pub from: LocationSpec,
    pub to: LocationSpec,
    /// Defaults to the instrument's maximum volume.
    pub volume: Option<f64>,
    #[serde(default)]
    pub extra_pull: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DistributeArgs {
    pub from: LocationSpec,
    pub to: Vec<LocationSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConsolidateArgs {
    pub from: Vec<LocationSpec>,
    pub to: LocationSpec,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MixArgs {
    /// Defaults to the instrument's maximum volume.
    pub volume: Option<f64>,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub blow_out: bool,
}

/// The closed set of pipetting commands.
///
/// Execution matches exhaustively; a variant without a handler arm fails to
/// build.
#[derive(Clone, Debug)]
pub enum Command {
    Transfer(TransferArgs),
    Distribute(DistributeArgs),
    Mix(MixArgs),
    Consolidate(ConsolidateArgs),
}

impl Command {
    /// Maps a command-type tag and its raw arguments to a typed command.
    ///
    /// Unknown tags are fatal; malformed argument objects fail as
    /// [`ProtocolError::Format`].
    pub fn parse(tag: &str, args: &Value) -> Result<Self, ProtocolError> {
        match tag {
            "transfer" => Ok(Self::Transfer(serde_json::from_value(args.clone())?)),
            "distribute" => Ok(Self::Distribute(serde_json::from_value(args.clone())?)),
            "mix" => Ok(Self::Mix(serde_json::from_value(args.clone())?)),
            "consolidate" => Ok(Self::Consolidate(serde_json::from_value(args.clone())?)),
            other => Err(ProtocolError::UnsupportedCommand(other.to_string())),
        }
    }

    /// Runs the command, issuing its driver call sequence in order.
    pub fn execute(
        &self,
        driver: &mut dyn InstrumentDriver,
        instrument: &Instrument,
        containers: &IndexMap<String, Container>,
    ) -> Result<(), ProtocolError> {
        match self {
            Self::Transfer(args) => {
                let volume = args.volume.unwrap_or(instrument.max_volume);
                transfer_from(
                    driver,
                    instrument,
                    containers,
                    &args.from,
                    volume,
                    args.extra_pull,
                )?;
                transfer_to(driver, containers, &args.to, volume)
            }

            // One overdrawn aspiration covers residual loss across every
            // dispense in the list.
            Self::Distribute(args) => {
                let mut total = 0.0;
                for to in &args.to {
                    total += entry_volume(to, "distribute")?;
                }
                let percent = instrument.settings.distribute_percentage.unwrap_or(0.0);
                transfer_from(
                    driver,
                    instrument,
                    containers,
                    &args.from,
                    total * (1.0 + percent),
                    false,
                )?;
                for to in &args.to {
                    let volume = entry_volume(to, "distribute")?;
                    transfer_to(driver, containers, to, volume)?;
                }
                Ok(())
            }

            // Sources pool into one tip, then a single dispense empties it.
            Self::Consolidate(args) => {
                let mut total = 0.0;
                for from in &args.from {
                    total += entry_volume(from, "consolidate")?;
                }
                for from in &args.from {
                    let volume = entry_volume(from, "consolidate")?;
                    transfer_from(driver, instrument, containers, from, volume, false)?;
                }
                transfer_to(driver, containers, &args.to, total)
            }

            // Operates at the current position; mix carries no target well.
            Self::Mix(args) => {
                let volume = args.volume.unwrap_or(instrument.max_volume);
                driver.aspirate(volume, None)?;
                for _ in 0..args.repetitions {
                    driver.aspirate(volume, None)?;
                    driver.dispense(volume, None)?;
                }
                if args.blow_out {
                    driver.blow_out(None)?;
                }
                Ok(())
            }
        }
    }
}

/// Resolves a location spec to a well and its probe point.
fn resolve(
    containers: &IndexMap<String, Container>,
    spec: &LocationSpec,
) -> Result<Location, ProtocolError> {
    let container = containers.get(&spec.container).ok_or_else(|| {
        ProtocolError::Reference(format!("container {:?} is not on the deck", spec.container))
    })?;
    let well = container.well(&spec.location).ok_or_else(|| {
        ProtocolError::Reference(format!(
            "container {:?} has no well {:?}",
            spec.container, spec.location
        ))
    })?;
    Ok(Location {
        address: WellAddress::new(&container.name, &well.id),
        point: well.center + TIP_DESCENT + DVec3::new(0.0, 0.0, spec.tip_offset),
    })
}

fn entry_volume(spec: &LocationSpec, command: &str) -> Result<f64, ProtocolError> {
    spec.volume.ok_or_else(|| {
        ProtocolError::Format(format!(
            "{command} entry for well {:?} in {:?} is missing a volume",
            spec.location, spec.container
        ))
    })
}

/// The FROM phase shared by transfer, distribute, and consolidate.
///
/// The extra-pull overdraw is aspirated together with the payload, held for
/// the configured delay, then pushed back out at the current position.
fn transfer_from(
    driver: &mut dyn InstrumentDriver,
    instrument: &Instrument,
    containers: &IndexMap<String, Container>,
    from: &LocationSpec,
    volume: f64,
    extra_pull: bool,
) -> Result<(), ProtocolError> {
    let settings = &instrument.settings;
    let (extra_volume, extra_delay) = if extra_pull {
        (
            settings.extra_pull_volume.unwrap_or(0.0),
            settings.extra_pull_delay.unwrap_or(0.0),
        )
    } else {
        (0.0, 0.0)
    };

    let location = resolve(containers, from)?;
    driver.aspirate(volume + extra_volume, Some(&location))?;
    driver.delay(extra_delay)?;
    driver.dispense(extra_volume, None)?;
    if from.touch_tip {
        driver.touch_tip()?;
    }
    driver.delay(from.delay)?;
    Ok(())
}

/// The TO phase shared by transfer, distribute, and consolidate.
fn transfer_to(
    driver: &mut dyn InstrumentDriver,
    containers: &IndexMap<String, Container>,
    to: &LocationSpec,
    volume: f64,
) -> Result<(), ProtocolError> {
    let location = resolve(containers, to)?;
    driver.dispense(volume, Some(&location))?;
    if to.blowout {
        driver.blow_out(Some(&location))?;
    }
    if to.touch_tip {
        driver.touch_tip()?;
    }
    driver.delay(to.delay)?;
    Ok(())
}
