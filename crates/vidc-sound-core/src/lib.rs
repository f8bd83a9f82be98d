//! VIDC/MEMC Sound Subsystem Emulator
//!
//! An emulation of the Acorn Archimedes sound path: MEMC scans a DMA buffer
//! in emulated memory for 8-bit logarithmic (chord/step companded) samples,
//! VIDC converts them to analogue levels and distributes them across up to
//! eight time-division-multiplexed channels with per-channel stereo
//! positions. This crate reproduces that pipeline in fixed point and
//! resamples the result to an arbitrary host rate:
//!
//! - log-to-linear decode table and per-channel pan matrix
//! - DMA fetch scheduling in lock-step with the emulated clock, including
//!   double-buffer swaps and the sound interrupt
//! - area-accumulation resampling of the internal stream to the host rate
//! - a feedback controller that trims the fetch cadence against host
//!   buffer occupancy
//!
//! # Crate feature flags
//! - `streaming` (optional): real-time audio output via rodio
//! - `export-wav` (optional): WAV file sink via hound
//!
//! # Host sinks
//! The pipeline is generic over a [`HostSink`], the only platform-facing
//! seam: it hands the mixer a writable buffer, accepts what was produced,
//! and (where it can measure it) reports playback-buffer occupancy so the
//! rate controller can keep the buffer in its comfort zone.
//!
//! # Quick start
//! ```no_run
//! use vidc_sound::{ActiveDevice, SoundHardware, SoundPipeline, EventQueue};
//! use vidc_sound::sink::{BoundedSink, SinkParams};
//! use vidc_sound::StereoSense;
//!
//! let mut hw = SoundHardware::new(1 << 20, 24_000_000);
//! let mut queue = EventQueue::new();
//! let params = SinkParams {
//!     host_rate: 44_100 << 10,
//!     batch_size: 256,
//!     stereo_sense: StereoSense::LeftFirst,
//! };
//! let (sink, _rx) = BoundedSink::new(params, 16_384);
//! let mut sound = ActiveDevice::new();
//! sound.set(&mut hw, &mut queue, 0, Some(Box::new(SoundPipeline::new(sink)))).unwrap();
//! ```

#![warn(missing_docs)]

pub mod device;
pub mod hw;
pub mod pan;
pub mod pipeline;
pub mod queue;
pub mod rate;
pub mod ring;
pub mod resample;
pub mod sink;
pub mod tables;

#[cfg(feature = "export-wav")]
pub mod export;

#[cfg(feature = "streaming")]
pub mod streaming;

/// Error types for sound subsystem operations.
#[derive(thiserror::Error, Debug)]
pub enum SoundError {
    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Host audio device error
    #[error("audio device error: {0}")]
    Device(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The DMA event was missing from the scheduler at shutdown. This
    /// indicates corrupted emulator state; callers are expected to treat
    /// it as fatal.
    #[error("sound DMA event missing from scheduler at shutdown")]
    SchedulerCorrupt,
}

/// Result type for sound subsystem operations.
pub type Result<T> = std::result::Result<T, SoundError>;

// Public API exports
pub use device::{ActiveDevice, NullSoundDevice, SoundDevice, SoundEvent};
pub use hw::{IrqStatus, MemcControl, SoundDma, SoundHardware, VidcSound};
pub use pan::{PanMatrix, StereoSense};
pub use pipeline::{SoundPipeline, MAX_BATCH_SIZE};
pub use queue::{Cycles, EventQueue};
pub use rate::{RateControl, SinkSpace};
pub use resample::{Resampler, TIMESHIFT};
pub use ring::SampleRing;
pub use sink::{HostSink, SinkParams};
pub use tables::{linear_to_log, log_to_linear_table};

#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, StreamConfig, StreamRing, StreamSink};

#[cfg(feature = "export-wav")]
pub use export::WavSink;
