//! The sound pipeline: DMA fetch scheduling, decode and delivery
//!
//! At intervals approximating the hardware DMA cadence the pipeline pulls
//! 16-byte units from the emulated sound buffer, decodes them through the
//! log table and pan matrix into its sample ring, resamples the ring into
//! a host buffer, and reschedules itself with the rate controller's bias
//! folded in. Buffer swaps and the sound interrupt happen here too, so
//! emulated code sees the same DMA register behaviour whether or not any
//! audio reaches a host device.

use crate::device::SoundEvent;
use crate::hw::{vidc_clock_hz, IrqStatus, MemcControl, SoundHardware};
use crate::pan::{PanMatrix, StereoSense};
use crate::queue::{Cycles, EventQueue};
use crate::rate::{RateControl, SinkSpace};
use crate::resample::{Resampler, TIMESHIFT};
use crate::ring::SampleRing;
use crate::sink::HostSink;
use crate::tables::log_to_linear_table;
use crate::{Result, SoundError};

/// Largest number of 16-pair batches one DMA fetch burst may decode; the
/// sample ring holds 16 times this many pairs.
pub const MAX_BATCH_SIZE: usize = 1024;

/// Floor for the rescheduling interval, in cycles. Guarantees forward
/// progress under pathological rate-controller bias.
const MIN_INTERVAL: i64 = 100;

/// The decode/resample/deliver pipeline, generic over its host sink.
pub struct SoundPipeline<S: HostSink> {
    sink: S,
    batch_size: i32,
    stereo_sense: StereoSense,
    host_rate: u32,
    dma_rate: u32,
    rate: RateControl,
    log_table: [i16; 256],
    pan: PanMatrix,
    ring: SampleRing,
    resampler: Resampler,
    dma_memo: Option<(u8, u32, u8)>,
    coeff_memo: Option<(u8, u8, u32)>,
}

impl<S: HostSink> SoundPipeline<S> {
    /// Create a pipeline around `sink`. Nothing runs until
    /// [`init`](Self::init) opens the sink and schedules the DMA event.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            batch_size: 1,
            stereo_sense: StereoSense::LeftFirst,
            host_rate: 0,
            dma_rate: 0,
            rate: RateControl::new(),
            log_table: log_to_linear_table(),
            pan: PanMatrix::new(),
            ring: SampleRing::new(16 * MAX_BATCH_SIZE),
            resampler: Resampler::new(),
            dma_memo: None,
            coeff_memo: None,
        }
    }

    /// Open the host sink, adopt its negotiated parameters and schedule
    /// the first DMA fetch. A sink failure propagates and leaves no
    /// scheduler entry behind.
    pub fn init(
        &mut self,
        hw: &SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) -> Result<()> {
        let params = self.sink.init()?;
        self.host_rate = params.host_rate;
        self.batch_size = params.batch_size;
        self.stereo_sense = params.stereo_sense;
        self.ring.clear();
        self.rate.reset();
        self.pan.update(&hw.vidc.stereo_image, self.stereo_sense);
        self.update_dma_rate(hw);
        queue.insert(now + self.dma_rate as u64, SoundEvent::Dma);
        Ok(())
    }

    /// Remove the DMA event and close the sink.
    ///
    /// A missing scheduler entry means the emulator's state is corrupt;
    /// [`SoundError::SchedulerCorrupt`] is returned and should be treated
    /// as fatal by the caller.
    pub fn shutdown(&mut self, queue: &mut EventQueue<SoundEvent>) -> Result<()> {
        match queue.find(SoundEvent::Dma) {
            Some(idx) => {
                queue.remove(idx);
            }
            None => return Err(SoundError::SchedulerCorrupt),
        }
        self.sink.quit();
        Ok(())
    }

    /// Rebuild the pan matrix from the stereo image registers.
    pub fn stereo_updated(&mut self, hw: &SoundHardware) {
        self.pan.update(&hw.vidc.stereo_image, self.stereo_sense);
    }

    /// The frequency register changed. The new rate is picked up lazily by
    /// the memo checks on the next fetch, so there is nothing to do here.
    pub fn sound_freq_updated(&mut self, _hw: &SoundHardware) {}

    /// Cycles between DMA fetches at the current register settings.
    #[inline]
    pub fn dma_rate(&self) -> u32 {
        self.dma_rate
    }

    /// The rate controller, for occupancy statistics.
    #[inline]
    pub fn rate_control(&self) -> &RateControl {
        &self.rate
    }

    /// Resampler coefficients currently in force (step Q9, scale Q16).
    #[inline]
    pub fn coefficients(&self) -> (u32, u32) {
        (self.resampler.step(), self.resampler.scale())
    }

    /// Buffered pairs awaiting resampling.
    #[inline]
    pub fn backlog_pairs(&self) -> usize {
        self.ring.pairs()
    }

    /// Shared access to the sink.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the pipeline, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// One DMA fetch opportunity at time `now`.
    ///
    /// Determines how many 16-byte units the hardware can supply, runs the
    /// decode and delivery chain on them (zero is valid and still drains
    /// backlog), reschedules itself, and advances the DMA pointer.
    pub fn dma_event(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) {
        self.update_dma_rate(hw);

        // Source units needed to cover one batch of destination pairs.
        let step = self.resampler.step() as u64;
        let src_batch = ((self.batch_size as u64 * step + ((1 << TIMESHIFT) - 1)) >> TIMESHIFT)
            .max(1) as i32;

        let mut avail = 0i32;
        if hw.dma.control.contains(MemcControl::SOUND_DMA_ENABLE) {
            if hw.dma.step_buffer() {
                hw.irq_status |= IrqStatus::SOUND_DMA;
            }
            avail = hw
                .dma
                .units_remaining()
                .min(src_batch)
                .min((self.ring.free_pairs() >> 4) as i32);
        }

        // Process data first, so the occupancy feedback lands before the
        // interval below is computed.
        self.process(hw, avail);

        // Wait out the time covered by what was actually fetched; an idle
        // fetch waits one full batch.
        let fetched = if avail > 0 { avail } else { src_batch };
        let next = self.dma_rate as i64 * fetched as i64 + self.rate.fudge() as i64;
        let next = next.max(MIN_INTERVAL);
        queue.reschedule_head(now + next as u64, SoundEvent::Dma);
        hw.dma.sptr += (avail as u32) << 4;
    }

    /// Decode `avail` 16-byte units from the DMA pointer and deliver what
    /// the ring then holds.
    fn process(&mut self, hw: &SoundHardware, avail: i32) {
        self.refresh_coefficients(hw);
        if avail > 0 {
            let start = hw.dma.sptr as usize;
            let bytes = &hw.ram[start..start + avail as usize * 16];
            self.log2lin(bytes);
        }
        self.do_mix();
    }

    fn update_dma_rate(&mut self, hw: &SoundHardware) {
        let key = (hw.vidc.sound_freq, hw.emu_rate, hw.ioeb_control);
        if self.dma_memo == Some(key) {
            return;
        }
        self.dma_memo = Some(key);
        // One 16-byte fetch per 16*(sound_freq+2) ticks of a 1MHz byte
        // clock at 24MHz VIDC, rescaled to event-queue cycles and the
        // actual clock source.
        self.dma_rate = (hw.emu_rate as u64 * (16 * 24) * (hw.vidc.sound_freq as u64 + 2)
            / vidc_clock_hz(hw.ioeb_control) as u64) as u32;
    }

    fn refresh_coefficients(&mut self, hw: &SoundHardware) {
        let key = (hw.vidc.sound_freq, hw.ioeb_control, self.host_rate);
        if self.coeff_memo == Some(key) {
            return;
        }
        self.coeff_memo = Some(key);
        // The source rate is about to change; mix out as much of the
        // buffered data as possible at the old coefficients first.
        self.do_mix();
        self.resampler
            .set_rates(vidc_clock_hz(hw.ioeb_control), hw.vidc.sound_freq, self.host_rate);
    }

    /// Convert raw log bytes to panned linear pairs. Each 8-byte round
    /// carries channels 0-7 in ascending order; no downmixing happens
    /// here.
    fn log2lin(&mut self, bytes: &[u8]) {
        for (i, &code) in bytes.iter().enumerate() {
            let value = self.log_table[code as usize];
            let (left, right) = self.pan.apply(i & 7, value);
            self.ring.push_pair(left, right);
        }
    }

    fn do_mix(&mut self) {
        if self.ring.pairs() <= self.resampler.margin() {
            return;
        }
        let ring_used = self.ring.pairs();
        let out = self.sink.writable();
        if out.is_empty() {
            return;
        }
        let written = self.resampler.mix(&mut self.ring, out);

        let space = self.sink.commit(written).unwrap_or(SinkSpace {
            // No feedback from this sink: steer by our own buffer instead.
            used: ring_used as i32,
            free: self.ring.free_pairs() as i32,
            capacity: self.ring.capacity_pairs() as i32,
        });
        let step = (self.dma_rate >> 2) as i32;
        self.rate.adjust(step, written as i32, space);
    }
}
