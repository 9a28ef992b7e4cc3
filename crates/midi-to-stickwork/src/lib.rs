//! MIDI to drum-robot command converter library
//!
//! Decodes the drum channel of a Standard MIDI File, merges simultaneous
//! hits, assigns them to the robot's two sticks and segments the result
//! into the fixed sub-step and measure table the controller plays.

pub mod config;
pub mod decoder;
pub mod dynamics;
pub mod groove;
pub mod hands;
pub mod measure;
pub mod merge;
pub mod notes;
pub mod output;
pub mod pipeline;
pub mod smf;
pub mod velocity_log;
pub mod vlq;

// Re-export main types for convenience
pub use config::PipelineConfig;
pub use output::{OutputFormat, OutputFormatter};
pub use pipeline::{Pipeline, PipelineOutput};
pub use smf::SmfFile;
