//! Core types for the stickwork drum-robot pipeline
//!
//! This crate holds the records that flow between the pipeline stages, the
//! drum kit description the stages are configured with, and the shared error
//! and diagnostic types.
//!
//! # Examples
//!
//! ```
//! use stickwork_core::{DrumKit, Instrument};
//!
//! let kit = DrumKit::standard();
//! let snare = kit.voice(Instrument::SNARE).unwrap();
//! assert_eq!(snare.name, "snare");
//! ```
//!
//! # Main Components
//!
//! - **RawHit**: one decoded drum strike (absolute time, instrument, velocity)
//! - **CompoundEvent**: simultaneous strikes with hand assignments (delta time)
//! - **DrumKit**: instrument positions, sections and classes
//! - **VelocityWindow** / **MeasureRow**: the tables handed to the robot
//! - **Error** / **Diagnostic**: fatal and recoverable pipeline conditions

pub mod error;
pub mod event;
pub mod hit;
pub mod instrument;
pub mod kit;
pub mod table;
pub mod timing;

pub use error::{Diagnostic, Error, Result};
pub use event::{CompoundEvent, HihatState};
pub use hit::RawHit;
pub use instrument::{Instrument, VoiceClass};
pub use kit::{DrumKit, Placement, Position, Section, Voice, VoiceRole};
pub use table::{MeasureRow, VelocityWindow};
pub use timing::Tempo;
