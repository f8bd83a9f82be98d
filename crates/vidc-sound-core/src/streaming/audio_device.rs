//! Audio device integration using rodio
//!
//! Plays the streaming ring through the default output device. The source
//! side runs on rodio's playback thread and substitutes silence on
//! underrun so the stream stays alive while the emulation catches up.

use super::StreamRing;
use crate::{Result, SoundError};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Audio source that reads from the stream ring.
struct RingSource {
    ring: Arc<StreamRing>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    /// Batch buffer so the ring lock is taken once per chunk, not per sample
    buffer: Vec<i16>,
    buffer_pos: usize,
}

impl RingSource {
    fn new(
        ring: Arc<StreamRing>,
        sample_rate: u32,
        channels: u16,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let chunk = 2048;
        RingSource {
            ring,
            sample_rate,
            channels,
            finished,
            buffer: vec![0i16; chunk],
            buffer_pos: chunk, // force a refill on the first sample
        }
    }
}

impl Iterator for RingSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.buffer_pos >= self.buffer.len() {
            let read = self.ring.read(&mut self.buffer);
            if read < self.buffer.len() {
                // Underrun: pad the chunk with silence to keep the stream alive.
                self.buffer[read..].fill(0);
            }
            self.buffer_pos = 0;
        }

        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

impl Source for RingSource {
    fn current_frame_len(&self) -> Option<usize> {
        let available = self.ring.available_read();
        if available > 0 {
            Some(available)
        } else {
            Some(self.buffer.len())
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Audio playback device using rodio.
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start playing from `ring`.
    ///
    /// # Arguments
    /// * `sample_rate` - Output rate in Hz
    /// * `channels` - Channel count (2 for the stereo pipeline)
    /// * `ring` - Shared ring the pipeline writes into
    pub fn new(sample_rate: u32, channels: u16, ring: Arc<StreamRing>) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| SoundError::Device(format!("failed to create audio stream: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| SoundError::Device(format!("failed to create audio sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingSource::new(
            ring,
            sample_rate,
            channels,
            Arc::clone(&finished),
        ));

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Pause playback.
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback.
    pub fn play(&self) {
        self.sink.play();
    }

    /// Signal that no more samples will be produced, letting the stream
    /// terminate instead of playing silence forever.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.pause();
        self.finished.store(true, Ordering::Relaxed);
    }
}
