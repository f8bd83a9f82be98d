//! Real-time audio output
//!
//! Bridges the pipeline to the host's audio device: the pipeline commits
//! resampled pairs into a shared ring buffer, and a rodio playback stream
//! drains it from the audio callback thread. The ring's fill level is the
//! occupancy feedback the rate controller steers by.

pub mod audio_device;
pub mod ring;

pub use audio_device::AudioDevice;
pub use ring::StreamRing;

use crate::pan::StereoSense;
use crate::rate::SinkSpace;
use crate::sink::{HostSink, SinkParams};
use crate::{Result, SoundError};
use std::sync::Arc;

/// Default host sample rate (44.1 kHz).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Configuration for streaming playback.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Ring buffer size in stereo pairs. Larger buffers ride out scheduling
    /// hiccups at the cost of latency.
    pub ring_pairs: usize,
    /// Host sample rate in Hz
    pub sample_rate: u32,
    /// Destination pairs the pipeline aims to deliver per cycle
    pub batch_size: i32,
}

impl StreamConfig {
    /// Roughly 93 ms of buffer at 44.1 kHz.
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_pairs: 4096,
            sample_rate,
            batch_size: 256,
        }
    }

    /// Roughly 372 ms of buffer at 44.1 kHz.
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_pairs: 16384,
            sample_rate,
            batch_size: 256,
        }
    }

    /// Buffer latency in milliseconds.
    pub fn latency_ms(&self) -> f32 {
        (self.ring_pairs as f32 / self.sample_rate as f32) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(DEFAULT_SAMPLE_RATE)
    }
}

/// Host sink playing through the system audio device.
pub struct StreamSink {
    config: StreamConfig,
    ring: Arc<StreamRing>,
    device: Option<AudioDevice>,
    scratch: Vec<i16>,
}

impl StreamSink {
    /// Create a streaming sink; the device opens on [`HostSink::init`].
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            ring: Arc::new(StreamRing::new(config.ring_pairs * 2)),
            device: None,
            scratch: vec![0i16; config.batch_size.max(1) as usize * 2],
        }
    }

    /// Ring fill fraction, 0.0 to 1.0.
    pub fn fill(&self) -> f32 {
        self.ring.fill_fraction()
    }
}

impl HostSink for StreamSink {
    fn init(&mut self) -> Result<SinkParams> {
        if self.config.sample_rate == 0 {
            return Err(SoundError::Config("zero host sample rate".into()));
        }
        if self.device.is_none() {
            self.device = Some(AudioDevice::new(
                self.config.sample_rate,
                2,
                Arc::clone(&self.ring),
            )?);
        }
        Ok(SinkParams {
            host_rate: self.config.sample_rate << 10,
            batch_size: self.config.batch_size,
            stereo_sense: StereoSense::LeftFirst,
        })
    }

    fn writable(&mut self) -> &mut [i16] {
        &mut self.scratch
    }

    fn commit(&mut self, pairs: usize) -> Option<SinkSpace> {
        let capacity = (self.ring.capacity() / 2) as i32;
        let used = (self.ring.available_read() / 2) as i32;
        let free = capacity - used;
        self.ring.write(&self.scratch[..pairs * 2]);
        Some(SinkSpace {
            used,
            free,
            capacity,
        })
    }

    fn quit(&mut self) {
        if let Some(device) = self.device.take() {
            device.finish();
        }
    }
}
