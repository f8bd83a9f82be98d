//! Sound backend selection and the timing-only null backend
//!
//! A [`SoundDevice`] is one complete sound backend: the full pipeline with
//! some host sink, or the null device that keeps DMA timing and interrupt
//! behaviour exact without producing audio. [`ActiveDevice`] holds at most
//! one backend at a time and switches by shutting the old one down
//! completely before the new one is initialized.

use crate::hw::{IrqStatus, MemcControl, SoundHardware};
use crate::pipeline::SoundPipeline;
use crate::queue::{Cycles, EventQueue};
use crate::sink::HostSink;
use crate::{Result, SoundError};

/// Timed callbacks the sound subsystem schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundEvent {
    /// Sound DMA fetch opportunity
    Dma,
}

/// One sound backend: lifecycle, register-change notifications and the
/// DMA callback.
pub trait SoundDevice {
    /// Bring the backend up and schedule its DMA event. A host device
    /// that will not open propagates its error; the caller then runs
    /// without sound.
    fn init(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) -> Result<()>;

    /// Tear the backend down, removing its DMA event.
    fn shutdown(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
    ) -> Result<()>;

    /// The VIDC sound frequency register was written.
    fn sound_freq_updated(&mut self, hw: &SoundHardware);

    /// The VIDC stereo image registers were written.
    fn stereo_updated(&mut self, hw: &SoundHardware);

    /// The scheduled DMA fetch fired at `now`.
    fn dma_event(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    );
}

impl<S: HostSink> SoundDevice for SoundPipeline<S> {
    fn init(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) -> Result<()> {
        SoundPipeline::init(self, hw, queue, now)
    }

    fn shutdown(
        &mut self,
        _hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
    ) -> Result<()> {
        SoundPipeline::shutdown(self, queue)
    }

    fn sound_freq_updated(&mut self, hw: &SoundHardware) {
        SoundPipeline::sound_freq_updated(self, hw);
    }

    fn stereo_updated(&mut self, hw: &SoundHardware) {
        SoundPipeline::stereo_updated(self, hw);
    }

    fn dma_event(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) {
        SoundPipeline::dma_event(self, hw, queue, now);
    }
}

/// Fetch units the null device pretends to batch per event.
const NULL_SRC_BATCH: i32 = 4;

/// Timing-only backend.
///
/// Walks the DMA buffers, performs swaps and wraps, and raises the sound
/// interrupt on the correct schedule without decoding a single byte, so
/// emulated code that relies on sound IRQs runs correctly with no host
/// audio device at all.
#[derive(Debug, Default)]
pub struct NullSoundDevice {
    dma_rate: u32,
    memo: Option<(u8, u32, u8)>,
}

impl NullSoundDevice {
    /// Create a null backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn update_dma_rate(&mut self, hw: &SoundHardware) {
        let key = (hw.vidc.sound_freq, hw.emu_rate, hw.ioeb_control);
        if self.memo == Some(key) {
            return;
        }
        self.memo = Some(key);
        self.dma_rate = (hw.emu_rate as u64 * (16 * 24) * (hw.vidc.sound_freq as u64 + 2)
            / crate::hw::vidc_clock_hz(hw.ioeb_control) as u64) as u32;
    }
}

impl SoundDevice for NullSoundDevice {
    fn init(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) -> Result<()> {
        self.update_dma_rate(hw);
        queue.insert(now + self.dma_rate as u64, SoundEvent::Dma);
        Ok(())
    }

    fn shutdown(
        &mut self,
        _hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
    ) -> Result<()> {
        match queue.find(SoundEvent::Dma) {
            Some(idx) => {
                queue.remove(idx);
                Ok(())
            }
            None => Err(SoundError::SchedulerCorrupt),
        }
    }

    fn sound_freq_updated(&mut self, _hw: &SoundHardware) {}

    fn stereo_updated(&mut self, _hw: &SoundHardware) {}

    fn dma_event(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
    ) {
        self.update_dma_rate(hw);
        let mut avail = 0i32;
        if hw.dma.control.contains(MemcControl::SOUND_DMA_ENABLE) {
            if hw.dma.step_buffer() {
                hw.irq_status |= IrqStatus::SOUND_DMA;
            }
            avail = hw.dma.units_remaining().min(NULL_SRC_BATCH);
        }
        let fetched = if avail > 0 { avail } else { NULL_SRC_BATCH };
        let next = (self.dma_rate as i64 * fetched as i64).max(100);
        queue.reschedule_head(now + next as u64, SoundEvent::Dma);
        hw.dma.sptr += (avail as u32) << 4;
    }
}

/// Holder for the currently selected sound backend.
///
/// At most one backend is live; switching tears the old one down first.
#[derive(Default)]
pub struct ActiveDevice {
    current: Option<Box<dyn SoundDevice>>,
}

impl ActiveDevice {
    /// Create a holder with no backend (silence).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a backend is live.
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Switch to `device` (or to silence with `None`).
    ///
    /// The old backend is fully shut down before the new one is brought
    /// up. If the new backend fails to initialize, no backend is left
    /// active and the error propagates.
    pub fn set(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        now: Cycles,
        device: Option<Box<dyn SoundDevice>>,
    ) -> Result<()> {
        if let Some(mut old) = self.current.take() {
            old.shutdown(hw, queue)?;
        }
        if let Some(mut device) = device {
            device.init(hw, queue, now)?;
            self.current = Some(device);
        }
        Ok(())
    }

    /// Forward a frequency-register change to the live backend.
    pub fn sound_freq_updated(&mut self, hw: &SoundHardware) {
        if let Some(dev) = &mut self.current {
            dev.sound_freq_updated(hw);
        }
    }

    /// Forward a stereo-image-register change to the live backend.
    pub fn stereo_updated(&mut self, hw: &SoundHardware) {
        if let Some(dev) = &mut self.current {
            dev.stereo_updated(hw);
        }
    }

    /// Dispatch a fired event to the live backend.
    pub fn dispatch(
        &mut self,
        hw: &mut SoundHardware,
        queue: &mut EventQueue<SoundEvent>,
        event: SoundEvent,
        now: Cycles,
    ) {
        match event {
            SoundEvent::Dma => {
                if let Some(dev) = &mut self.current {
                    dev.dma_event(hw, queue, now);
                }
            }
        }
    }
}
