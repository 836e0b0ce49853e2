//! The actuator boundary: the instrument driver trait and its call-log capture.
//!
//! The compiler's externally observable output is the ordered sequence of
//! [`InstrumentDriver`] invocations. [`TraceDriver`] records that sequence as
//! [`DriverCall`] values so test harnesses and dry runs can compare it exactly.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A container name plus a well id: enough to address a physical well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellAddress {
    pub container: String,
    pub well: String,
}

impl WellAddress {
    pub fn new(container: impl Into<String>, well: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            well: well.into(),
        }
    }
}

/// A fully resolved target: a well address plus the probe point inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: WellAddress,
    pub point: DVec3,
}

/// Failure of a single actuator call.
#[derive(Clone, Debug, Error)]
#[error("driver call failed: {0}")]
pub struct DriverError(pub String);

/// The physical actuator interface.
///
/// Calls are synchronous and blocking: the compiler issues the next call only
/// after the previous one returned, so stream order is motion order. Passing
/// `None` as a location means "at the current position" and delegates any
/// actual motion to the driver.
pub trait InstrumentDriver {
    fn pick_up_tip(&mut self, tip: &WellAddress) -> Result<(), DriverError>;
    fn aspirate(&mut self, volume: f64, location: Option<&Location>) -> Result<(), DriverError>;
    fn dispense(&mut self, volume: f64, location: Option<&Location>) -> Result<(), DriverError>;
    fn touch_tip(&mut self) -> Result<(), DriverError>;
    fn blow_out(&mut self, location: Option<&Location>) -> Result<(), DriverError>;
    fn delay(&mut self, seconds: f64) -> Result<(), DriverError>;
    fn drop_tip(&mut self, trash_container: &str) -> Result<(), DriverError>;
}

/// One recorded actuator call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DriverCall {
    PickUpTip(WellAddress),
    Aspirate {
        volume: f64,
        location: Option<Location>,
    },
    Dispense {
        volume: f64,
        location: Option<Location>,
    },
    TouchTip,
    BlowOut {
        location: Option<Location>,
    },
    Delay {
        seconds: f64,
    },
    DropTip {
        trash_container: String,
    },
}

/// A driver that records every call instead of moving hardware.
#[derive(Clone, Debug, Default)]
pub struct TraceDriver {
    pub calls: Vec<DriverCall>,
}

impl TraceDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstrumentDriver for TraceDriver {
    fn pick_up_tip(&mut self, tip: &WellAddress) -> Result<(), DriverError> {
        self.calls.push(DriverCall::PickUpTip(tip.clone()));
        Ok(())
    }

    fn aspirate(&mut self, volume: f64, location: Option<&Location>) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Aspirate {
            volume,
            location: location.cloned(),
        });
        Ok(())
    }

    fn dispense(&mut self, volume: f64, location: Option<&Location>) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Dispense {
            volume,
            location: location.cloned(),
        });
        Ok(())
    }

    fn touch_tip(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::TouchTip);
        Ok(())
    }

    fn blow_out(&mut self, location: Option<&Location>) -> Result<(), DriverError> {
        self.calls.push(DriverCall::BlowOut {
            location: location.cloned(),
        });
        Ok(())
    }

    fn delay(&mut self, seconds: f64) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Delay { seconds });
        Ok(())
    }

    fn drop_tip(&mut self, trash_container: &str) -> Result<(), DriverError> {
        self.calls.push(DriverCall::DropTip {
            trash_container: trash_container.to_string(),
        });
        Ok(())
    }
}
