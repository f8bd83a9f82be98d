//! Minimal emulated machine around the sound pipeline
//!
//! Stands in for the emulator core and the emulated OS sound driver: owns
//! the hardware state and event queue, keeps the double-buffered DMA
//! descriptors fed from a sample source, and services the sound interrupt
//! the way RISC OS's driver would.

use vidc_sound::{
    linear_to_log, ActiveDevice, Cycles, EventQueue, IrqStatus, MemcControl, SoundEvent,
    SoundHardware,
};

const RAM_SIZE: usize = 1 << 16;
const EMU_RATE: u32 = 24_000_000;

const BUF_A: u32 = 0x1000;
const BUF_B: u32 = 0x2000;
const BUF_BYTES: u32 = 0x1000;

/// Where the DMA buffer contents come from.
pub enum Feed {
    /// Synthesised sine tone, log-encoded on the fly
    Tone {
        /// Tone frequency in Hz
        hz: f64,
        /// Source ticks per second (derived from the frequency register)
        tick_rate: f64,
        /// Running tick counter, for phase continuity across buffers
        tick: u64,
    },
    /// Raw log-encoded bytes, looped
    Raw {
        /// The sample data
        bytes: Vec<u8>,
        /// Read position
        pos: usize,
    },
}

impl Feed {
    /// A sine tone at `hz`, for a source running at `tick_rate` ticks/s.
    pub fn tone(hz: f64, tick_rate: f64) -> Self {
        Feed::Tone {
            hz,
            tick_rate,
            tick: 0,
        }
    }

    /// Raw log samples, looped for as long as playback runs.
    pub fn raw(bytes: Vec<u8>) -> Self {
        Feed::Raw { bytes, pos: 0 }
    }

    fn fill(&mut self, ram: &mut [u8], base: u32, len: u32) {
        match self {
            Feed::Tone {
                hz,
                tick_rate,
                tick,
            } => {
                for i in 0..len {
                    let t = *tick as f64 / *tick_rate;
                    let value = (12_000.0 * (std::f64::consts::TAU * *hz * t).sin()) as i16;
                    ram[(base + i) as usize] = linear_to_log(value);
                    *tick += 1;
                }
            }
            Feed::Raw { bytes, pos } => {
                if bytes.is_empty() {
                    return;
                }
                for i in 0..len {
                    ram[(base + i) as usize] = bytes[*pos];
                    *pos = (*pos + 1) % bytes.len();
                }
            }
        }
    }
}

/// The demo machine: hardware, event queue and the emulated sound driver.
pub struct DemoMachine {
    /// Emulated hardware registers and memory
    pub hw: SoundHardware,
    /// Emulated-clock event queue
    pub queue: EventQueue<SoundEvent>,
    feed: Feed,
}

impl DemoMachine {
    /// Build a machine with both DMA buffers filled and the second one
    /// latched, ready for the pipeline to start fetching.
    pub fn new(sound_freq: u8, mut feed: Feed) -> Self {
        let mut hw = SoundHardware::new(RAM_SIZE, EMU_RATE);
        hw.vidc.sound_freq = sound_freq;
        hw.vidc.stereo_image = [4; 8]; // all channels centred
        hw.dma.control = MemcControl::SOUND_DMA_ENABLE;

        feed.fill(&mut hw.ram, BUF_A, BUF_BYTES);
        feed.fill(&mut hw.ram, BUF_B, BUF_BYTES);
        hw.dma.sstart_cur = BUF_A;
        hw.dma.sptr = BUF_A;
        hw.dma.send_cur = BUF_A + BUF_BYTES - 16;
        hw.dma.sstart = BUF_B;
        hw.dma.send_next = BUF_B + BUF_BYTES - 16;
        hw.dma.next_valid = true;

        Self {
            hw,
            queue: EventQueue::new(),
            feed,
        }
    }

    /// Source ticks per second for a frequency register value.
    pub fn tick_rate(sound_freq: u8) -> f64 {
        24_000_000.0 / 24.0 / (sound_freq as f64 + 2.0)
    }

    /// Cycles of emulated time per wall-clock second.
    pub fn emu_rate(&self) -> u32 {
        self.hw.emu_rate
    }

    /// Dispatch every event due before `end`, refilling DMA buffers as
    /// the sound interrupt demands.
    pub fn run_until(&mut self, sound: &mut ActiveDevice, end: Cycles) {
        if !sound.is_active() {
            return;
        }
        while let Some((at, event)) = self.queue.head() {
            if at >= end {
                break;
            }
            sound.dispatch(&mut self.hw, &mut self.queue, event, at);
            self.service_interrupt();
        }
    }

    /// The emulated driver: refill the finished buffer and latch it.
    fn service_interrupt(&mut self) {
        if !self.hw.irq_status.contains(IrqStatus::SOUND_DMA) {
            return;
        }
        let finished = if self.hw.dma.sstart_cur == BUF_A {
            BUF_B
        } else {
            BUF_A
        };
        self.feed.fill(&mut self.hw.ram, finished, BUF_BYTES);
        self.hw.dma.sstart = finished;
        self.hw.dma.send_next = finished + BUF_BYTES - 16;
        self.hw.dma.next_valid = true;
        self.hw.irq_status -= IrqStatus::SOUND_DMA;
    }
}
