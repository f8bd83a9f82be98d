//! Ring buffer between the pipeline and the audio callback
//!
//! One producer (the pipeline, on the emulation thread) and one consumer
//! (the rodio source, on the audio thread). Mutex-protected storage with
//! atomic position tracking; a write that does not fit is truncated, never
//! blocked on, so the emulation thread cannot stall on audio.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Streaming sample ring buffer.
#[derive(Debug)]
pub struct StreamRing {
    buffer: Mutex<Vec<i16>>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    capacity: usize,
    /// Capacity mask for fast modulo: `pos & mask == pos % capacity`
    mask: usize,
}

impl StreamRing {
    /// Create a ring holding `requested` samples, rounded up to a power of
    /// two.
    pub fn new(requested: usize) -> Self {
        let capacity = requested.max(2).next_power_of_two();
        Self {
            buffer: Mutex::new(vec![0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        }
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples available to read without blocking.
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Fill fraction, 0.0 to 1.0.
    pub fn fill_fraction(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }

    /// Write samples (producer side). Returns how many were accepted;
    /// whatever does not fit is dropped.
    pub fn write(&self, samples: &[i16]) -> usize {
        let mut buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = self.capacity - write_pos.wrapping_sub(read_pos);
        let to_write = samples.len().min(available);
        if to_write == 0 {
            return 0;
        }

        let idx = write_pos & self.mask;
        if idx + to_write <= self.capacity {
            buf[idx..idx + to_write].copy_from_slice(&samples[..to_write]);
        } else {
            let first = self.capacity - idx;
            buf[idx..].copy_from_slice(&samples[..first]);
            buf[..to_write - first].copy_from_slice(&samples[first..to_write]);
        }
        drop(buf);

        self.write_pos
            .store(write_pos.wrapping_add(to_write), Ordering::Release);
        to_write
    }

    /// Read samples (consumer side). Returns how many were copied.
    pub fn read(&self, dest: &mut [i16]) -> usize {
        let buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = write_pos.wrapping_sub(read_pos);
        let to_read = dest.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let idx = read_pos & self.mask;
        if idx + to_read <= self.capacity {
            dest[..to_read].copy_from_slice(&buf[idx..idx + to_read]);
        } else {
            let first = self.capacity - idx;
            dest[..first].copy_from_slice(&buf[idx..]);
            dest[first..to_read].copy_from_slice(&buf[..to_read - first]);
        }
        drop(buf);

        self.read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);
        to_read
    }
}
