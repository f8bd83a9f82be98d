//! Host sink adapter
//!
//! The only platform-facing seam of the pipeline. A sink hands the mixer a
//! writable buffer, accepts however many pairs were produced into it, and
//! reports playback-buffer occupancy where it can measure it so the rate
//! controller has something to steer by. The core side of the contract is
//! strictly synchronous and never blocks; a sink that bridges to another
//! thread owns all synchronization on its far side.

use crate::pan::StereoSense;
use crate::rate::SinkSpace;
use crate::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Parameters a sink negotiates with its platform when opened.
#[derive(Clone, Copy, Debug)]
pub struct SinkParams {
    /// Host output rate in 1/1024 Hz units
    pub host_rate: u32,
    /// Destination pairs the pipeline should aim to deliver per cycle
    pub batch_size: i32,
    /// Channel byte order of the emulated data
    pub stereo_sense: StereoSense,
}

/// Where the resampled stereo stream goes.
pub trait HostSink {
    /// Open the host device and negotiate rate, batch size and stereo
    /// sense. A failure here aborts sound init and the subsystem falls
    /// back to silence.
    fn init(&mut self) -> Result<SinkParams>;

    /// Writable interleaved buffer for the next delivery; its length
    /// bounds how much the mixer produces.
    fn writable(&mut self) -> &mut [i16];

    /// Accept `pairs` from the front of the writable buffer, performing
    /// whatever platform I/O that implies. Returns the occupancy measured
    /// just before accepting, or `None` when the platform cannot measure
    /// it (the pipeline then falls back to its own ring occupancy).
    fn commit(&mut self, pairs: usize) -> Option<SinkSpace>;

    /// Close the host device.
    fn quit(&mut self) {}
}

struct BoundedShared {
    queue: Mutex<VecDeque<i16>>,
    ready: Condvar,
    capacity_pairs: usize,
}

/// Bounded in-process channel sink.
///
/// The producer (pipeline) side never blocks: a delivery that does not fit
/// is truncated and shows up as an overflow in the occupancy report. The
/// consumer side is a separate handle meant for the platform's playback
/// thread and may block on the condition variable.
pub struct BoundedSink {
    shared: Arc<BoundedShared>,
    scratch: Vec<i16>,
    params: SinkParams,
}

/// Consumer handle for a [`BoundedSink`].
pub struct BoundedReceiver {
    shared: Arc<BoundedShared>,
}

impl BoundedSink {
    /// Create a sink/receiver pair holding up to `capacity_pairs` stereo
    /// pairs in flight. The scratch buffer offered to the mixer is sized
    /// from the negotiated batch.
    pub fn new(params: SinkParams, capacity_pairs: usize) -> (Self, BoundedReceiver) {
        let shared = Arc::new(BoundedShared {
            queue: Mutex::new(VecDeque::with_capacity(capacity_pairs * 2)),
            ready: Condvar::new(),
            capacity_pairs,
        });
        let sink = Self {
            shared: Arc::clone(&shared),
            scratch: vec![0i16; params.batch_size.max(1) as usize * 2],
            params,
        };
        (sink, BoundedReceiver { shared })
    }
}

impl HostSink for BoundedSink {
    fn init(&mut self) -> Result<SinkParams> {
        Ok(self.params)
    }

    fn writable(&mut self) -> &mut [i16] {
        &mut self.scratch
    }

    fn commit(&mut self, pairs: usize) -> Option<SinkSpace> {
        let mut queue = self.shared.queue.lock();
        let used = queue.len() / 2;
        let free = self.shared.capacity_pairs - used;
        let accept = pairs.min(free);
        queue.extend(&self.scratch[..accept * 2]);
        drop(queue);
        if accept > 0 {
            self.shared.ready.notify_one();
        }
        Some(SinkSpace {
            used: used as i32,
            free: free as i32,
            capacity: self.shared.capacity_pairs as i32,
        })
    }
}

impl BoundedReceiver {
    /// Pairs currently queued.
    pub fn available_pairs(&self) -> usize {
        self.shared.queue.lock().len() / 2
    }

    /// Pop up to `dest.len()` samples without blocking. Returns samples
    /// copied (always a whole number of pairs when `dest` holds one).
    pub fn try_recv(&self, dest: &mut [i16]) -> usize {
        let mut queue = self.shared.queue.lock();
        let n = dest.len().min(queue.len());
        for slot in dest[..n].iter_mut() {
            *slot = queue.pop_front().unwrap_or(0);
        }
        n
    }

    /// Blocking pop for the playback thread: waits up to `timeout` for
    /// data, then behaves like [`try_recv`](Self::try_recv).
    pub fn recv_timeout(&self, dest: &mut [i16], timeout: Duration) -> usize {
        let mut queue = self.shared.queue.lock();
        if queue.is_empty() {
            let _ = self.shared.ready.wait_for(&mut queue, timeout);
        }
        let n = dest.len().min(queue.len());
        for slot in dest[..n].iter_mut() {
            *slot = queue.pop_front().unwrap_or(0);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SinkParams {
        SinkParams {
            host_rate: 44_100 << 10,
            batch_size: 4,
            stereo_sense: StereoSense::LeftFirst,
        }
    }

    #[test]
    fn test_init_reports_negotiated_params() {
        let (mut sink, _rx) = BoundedSink::new(params(), 16);
        let p = sink.init().unwrap();
        assert_eq!(p.host_rate, 44_100 << 10);
        assert_eq!(p.batch_size, 4);
    }

    #[test]
    fn test_commit_and_receive() {
        let (mut sink, rx) = BoundedSink::new(params(), 16);
        sink.writable()[..4].copy_from_slice(&[1, 2, 3, 4]);
        let space = sink.commit(2).unwrap();
        assert_eq!(space.used, 0, "occupancy measured before accepting");
        assert_eq!(rx.available_pairs(), 2);

        let mut dest = [0i16; 4];
        assert_eq!(rx.try_recv(&mut dest), 4);
        assert_eq!(dest, [1, 2, 3, 4]);
        assert_eq!(rx.available_pairs(), 0);
    }

    #[test]
    fn test_full_channel_truncates_without_blocking() {
        let (mut sink, rx) = BoundedSink::new(params(), 3);
        sink.writable().fill(7);
        let space = sink.commit(4).unwrap();
        assert_eq!(space.free, 3, "only three pairs fit");
        assert_eq!(rx.available_pairs(), 3, "delivery truncated, not blocked");

        // Next delivery sees a full buffer.
        let space = sink.commit(1).unwrap();
        assert_eq!(space.used, 3);
        assert_eq!(space.free, 0);
        assert_eq!(rx.available_pairs(), 3);
    }

    #[test]
    fn test_recv_timeout_returns_empty_on_silence() {
        let (_sink, rx) = BoundedSink::new(params(), 4);
        let mut dest = [0i16; 2];
        let got = rx.recv_timeout(&mut dest, Duration::from_millis(10));
        assert_eq!(got, 0);
    }

    #[test]
    fn test_recv_wakes_on_commit() {
        let (mut sink, rx) = BoundedSink::new(params(), 16);
        let handle = std::thread::spawn(move || {
            let mut dest = [0i16; 2];
            rx.recv_timeout(&mut dest, Duration::from_secs(5))
        });
        std::thread::sleep(Duration::from_millis(20));
        sink.writable()[..2].copy_from_slice(&[42, -42]);
        sink.commit(1);
        assert_eq!(handle.join().unwrap(), 2);
    }
}
