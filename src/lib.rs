//! # pipetteer
//!
//! A sovereign compilation crate for liquid-handling bench robots that translates
//! declarative JSON pipetting protocols into strictly ordered actuator call sequences.
//!
//! It decouples the *protocol* (which liquids go where) from the *machine* (how the
//! gantry moves), producing one total-ordered stream of [`InstrumentDriver`] calls
//! that can be ingested by motor controllers, simulators, or the bundled
//! [`TraceDriver`] capture harness.

pub mod command;
pub mod compiler;
pub mod deck;
pub mod driver;
pub mod error;
pub mod head;
pub mod protocol;

pub use command::*;
pub use compiler::*;
pub use deck::*;
pub use driver::*;
pub use error::*;
pub use head::*;
pub use protocol::*;
