//! Amiga Paula audio emulation for tracker playback
//!
//! Sample-for-sample reproduction of the Amiga's 4-voice DMA sound chip as
//! driven by a ProTracker-style replayer: per-sample DMA fetch cadence,
//! period latching on phase wraparound, the fixed L/R/R/L stereo wiring,
//! band-limited step (BLEP) anti-aliasing, and the analog output filters of
//! the A500 and A1200 (static RC low-pass, switchable "LED" Sallen-Key
//! low-pass and the DC-blocking high-pass).
//!
//! # Layout
//! - [`paula`] - the 4 voices, DMACON and the raw stereo mixer
//! - [`voice`] / [`blep`] - per-voice DMA model and anti-aliasing synthesizer
//! - [`filters`] / [`decimator`] - analog filter chain and 2x half-band decimation
//! - [`engine`] - owned engine tying it all together behind an audio lock
//! - [`sync`] / [`view`] - lock-free register-write mirror for the render thread
//! - [`driver`] - interleaves an external [`driver::Sequencer`] with rendering
//!
//! # Quick start
//! ```
//! use paula::{Engine, EngineConfig, SampleMemory};
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.attach_sample_memory(SampleMemory::from_vec(vec![0, 0, 127, -128]));
//!
//! engine.set_data(0, Some(2));
//! engine.set_length(0, 1);
//! engine.set_period(0, 428);
//! engine.set_volume(0, 64);
//! engine.start_dma(0b0001);
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! engine.render(&mut left, &mut right);
//! ```

#![warn(missing_docs)]

pub mod blep;
pub mod config;
pub mod constants;
pub mod decimator;
pub mod driver;
pub mod engine;
pub mod filters;
pub mod memory;
pub mod output;
pub mod paula;
pub mod sync;
mod tables;
pub mod view;
pub mod voice;

/// Error types for Paula engine setup
///
/// Only setup and reconfiguration can fail. Register writes and sample
/// generation are infallible: out-of-range register values are clamped the
/// way the hardware treats them.
#[derive(thiserror::Error, Debug)]
pub enum PaulaError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Fixed buffers could not be allocated
    #[error("Allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PaulaError {
    /// Converts a String into `PaulaError::Other`.
    ///
    /// Prefer `PaulaError::ConfigError(msg)` for configuration problems so
    /// callers can tell them apart.
    fn from(msg: String) -> Self {
        PaulaError::Other(msg)
    }
}

impl From<&str> for PaulaError {
    fn from(msg: &str) -> Self {
        PaulaError::Other(msg.to_string())
    }
}

/// Result type for engine setup operations
pub type Result<T> = std::result::Result<T, PaulaError>;

// Public API exports
pub use config::{AmigaModel, EngineConfig, Oversampling, VideoStandard};
pub use driver::{Sequencer, TickDriver};
pub use engine::{Engine, SharedEngine};
pub use memory::{DataPointer, SampleMemory};
pub use paula::Paula;
pub use sync::{SyncClock, SyncConsumer, SyncFlags, SyncRecord};
pub use view::{ChipView, VoiceView};
