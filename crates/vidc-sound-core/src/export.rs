//! WAV export sink
//!
//! A host sink that writes every delivered pair to a 16-bit stereo WAV
//! file. There is no real playback buffer to measure, so it reports no
//! occupancy and the pipeline steers by its own ring instead; for offline
//! rendering the resulting bias is irrelevant.

use crate::pan::StereoSense;
use crate::rate::SinkSpace;
use crate::sink::{HostSink, SinkParams};
use crate::{Result, SoundError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Host sink writing deliveries to a WAV file.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    scratch: Vec<i16>,
    params: SinkParams,
    pairs_written: u64,
}

impl WavSink {
    /// Create a WAV file at `path` for a stereo stream at `sample_rate` Hz.
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| SoundError::Device(format!("failed to create WAV file: {e}")))?;
        Ok(Self {
            writer: Some(writer),
            scratch: vec![0i16; 4096 * 2],
            params: SinkParams {
                host_rate: sample_rate << 10,
                batch_size: 256,
                stereo_sense: StereoSense::LeftFirst,
            },
            pairs_written: 0,
        })
    }

    /// Stereo pairs written so far.
    pub fn pairs_written(&self) -> u64 {
        self.pairs_written
    }

    /// Finish the file, flushing the header. Called by [`HostSink::quit`];
    /// exposed for callers that want the error.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| SoundError::Device(format!("failed to finalize WAV file: {e}")))?;
        }
        Ok(())
    }
}

impl HostSink for WavSink {
    fn init(&mut self) -> Result<SinkParams> {
        Ok(self.params)
    }

    fn writable(&mut self) -> &mut [i16] {
        &mut self.scratch
    }

    fn commit(&mut self, pairs: usize) -> Option<SinkSpace> {
        if let Some(writer) = &mut self.writer {
            for &sample in &self.scratch[..pairs * 2] {
                if let Err(e) = writer.write_sample(sample) {
                    eprintln!("WAV write failed: {e}");
                    self.writer = None;
                    return None;
                }
            }
            self.pairs_written += pairs as u64;
        }
        None
    }

    fn quit(&mut self) {
        if let Err(e) = self.finalize() {
            eprintln!("{e}");
        }
    }
}
