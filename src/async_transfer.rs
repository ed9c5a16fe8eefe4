//! Timeout-aware asynchronous reads and writes.
//!
//! The D2XX driver has no readiness notification and no cancellable blocking
//! read. [`AsyncDevice`] waits for data by polling the receive queue depth at
//! a fixed interval, suspending between polls, until either enough bytes are
//! queued or the read timeout expires. The queue is then drained with a
//! single native read.
//!
//! The poll interval trades CPU time for latency. It defaults to
//! [`DEFAULT_POLL_INTERVAL`] and can be changed per device.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use ftd2xx::{AsyncDevice, Device, TimeoutPolicy};
//!
//! # async fn demo() -> ftd2xx::Result<()> {
//! let policy = TimeoutPolicy::new().read_timeout(Some(Duration::from_millis(1000)));
//! let mut dev = AsyncDevice::with_policy(Device::open(0)?, policy)?;
//!
//! // Suspends until 4 bytes are queued or one second has passed.
//! let reply = dev.read(4).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! Dropping a pending [`read`](AsyncDevice::read) still drains what the device
//! has queued. Those bytes are kept and returned first by the next read, so
//! no received byte is lost when a read is abandoned, for example by
//! `tokio::select!`.

use std::time::Duration;

use crate::context::Device;
use crate::error::{Error, Result};

/// Default interval between receive-queue polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Read/write timeouts plus the strict-error flag.
///
/// `None` means no timeout. In non-strict mode a timed out read returns the
/// bytes that were available and a short write returns the accepted count;
/// in strict mode both fail with [`Error::ReadTimeout`] or
/// [`Error::WriteTimeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutPolicy {
    /// Read timeout enforced by the polling loop.
    pub read: Option<Duration>,
    /// Write timeout handed to the driver.
    pub write: Option<Duration>,
    /// Fail instead of returning partial results.
    pub strict: bool,
}

impl TimeoutPolicy {
    /// No timeouts, non-strict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from millisecond values. Values `<= 0` mean no timeout.
    pub fn from_millis(read_ms: i64, write_ms: i64) -> Self {
        let to_duration = |ms: i64| u64::try_from(ms).ok().filter(|&ms| ms > 0).map(Duration::from_millis);
        Self {
            read: to_duration(read_ms),
            write: to_duration(write_ms),
            strict: false,
        }
    }

    /// Set the read timeout. A zero duration means no timeout.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read = timeout.filter(|d| !d.is_zero());
        self
    }

    /// Set the write timeout. A zero duration means no timeout.
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write = timeout.filter(|d| !d.is_zero());
        self
    }

    /// Enable or disable strict timeout errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The `(read, write)` millisecond pair pushed to the driver.
    ///
    /// The read side only carries a 0/1 flag: the real read timeout is
    /// enforced by the polling loop, and the native read must return promptly
    /// once the loop hands over.
    pub fn native_timeouts(&self) -> (u32, u32) {
        let read = u32::from(self.read.is_some());
        let write = self
            .write
            .map_or(0, |d| u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
        (read, write)
    }
}

/// A [`Device`] with timeout-aware async reads.
#[derive(Debug)]
pub struct AsyncDevice {
    device: Device,
    policy: TimeoutPolicy,
    poll_interval: Duration,
    // Bytes drained by an abandoned read, served first by the next one.
    carry: Vec<u8>,
}

enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Drains the device if a pending read is dropped before completing.
struct PendingRead<'a> {
    dev: &'a mut AsyncDevice,
    needed: usize,
    armed: bool,
}

impl Drop for PendingRead<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Only take what is queued so the drop itself cannot block.
        let drained = self
            .dev
            .device
            .queue_status()
            .and_then(|queued| self.dev.device.read(queued.min(self.needed)));
        match drained {
            Ok(bytes) => {
                log::trace!("cancelled read kept {} bytes", bytes.len());
                self.dev.carry.extend_from_slice(&bytes);
            }
            Err(e) => log::warn!("drain after cancelled read failed: {e}"),
        }
    }
}

async fn wait_for_queue(device: &Device, needed: usize, interval: Duration) -> Result<()> {
    loop {
        if device.queue_status()? >= needed {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

impl AsyncDevice {
    /// Wrap `device` with no timeouts.
    pub fn new(device: Device) -> Result<Self> {
        Self::with_policy(device, TimeoutPolicy::default())
    }

    /// Wrap `device` and apply `policy` to it.
    pub fn with_policy(device: Device, policy: TimeoutPolicy) -> Result<Self> {
        let mut dev = Self {
            device,
            policy,
            poll_interval: DEFAULT_POLL_INTERVAL,
            carry: Vec::new(),
        };
        dev.set_policy(policy)?;
        Ok(dev)
    }

    /// The active timeout policy.
    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Replace the timeout policy and push the native timeouts.
    pub fn set_policy(&mut self, policy: TimeoutPolicy) -> Result<()> {
        let (read, write) = policy.native_timeouts();
        self.device.set_timeouts_ms(read, write)?;
        self.policy = policy;
        Ok(())
    }

    /// Change the read and write timeouts, keeping the strict flag.
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        let policy = self.policy.read_timeout(read).write_timeout(write);
        self.set_policy(policy)
    }

    /// The current `(read, write)` timeouts.
    pub fn timeouts(&self) -> (Option<Duration>, Option<Duration>) {
        (self.policy.read, self.policy.write)
    }

    /// Interval between receive-queue polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set the interval between receive-queue polls.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Bytes kept from abandoned reads, not yet returned.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// The wrapped device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The wrapped device, mutably.
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Unwrap the device. Kept bytes from abandoned reads are discarded.
    pub fn into_inner(self) -> Device {
        self.device
    }

    /// Read `n` bytes under the active policy.
    pub async fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let strict = self.policy.strict;
        self.read_with(n, strict).await
    }

    /// Read `n` bytes, overriding the strict flag for this call.
    ///
    /// Waits until `n` bytes are queued or the read timeout expires, then
    /// drains the device once. In strict mode a timeout fails with
    /// [`Error::ReadTimeout`], whose `data` holds the drained bytes.
    ///
    /// The drain takes at most what the receive queue holds, so a large `n`
    /// costs nothing beyond the bytes actually available.
    ///
    /// If polling the receive queue fails, that device error is returned
    /// at once and the drain is skipped. Bytes kept from earlier abandoned
    /// reads stay buffered for the next call.
    pub async fn read_with(&mut self, n: usize, strict: bool) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if self.carry.len() >= n {
            return Ok(self.carry.drain(..n).collect());
        }

        let needed = n - self.carry.len();
        let timeout = self.policy.read;
        let interval = self.poll_interval;
        let mut pending = PendingRead {
            dev: self,
            needed,
            armed: true,
        };

        let wait = wait_for_queue(&pending.dev.device, needed, interval);
        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(res) => res.map(|()| WaitOutcome::Ready),
                Err(_) => Ok(WaitOutcome::TimedOut),
            },
            None => wait.await.map(|()| WaitOutcome::Ready),
        };

        pending.armed = false;
        let outcome = waited?;
        // Never size the drain beyond what is queued, but always reach the
        // driver once.
        let queued = pending.dev.device.queue_status()?;
        let drained = pending.dev.device.read(needed.min(queued.max(1)))?;
        let mut data = std::mem::take(&mut pending.dev.carry);
        data.extend_from_slice(&drained);

        match outcome {
            WaitOutcome::TimedOut if data.len() < n => {
                log::trace!("read timed out with {} of {n} bytes", data.len());
                if strict {
                    Err(Error::ReadTimeout { requested: n, data })
                } else {
                    Ok(data)
                }
            }
            _ => Ok(data),
        }
    }

    /// Write `data` under the active policy.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let strict = self.policy.strict;
        self.write_with(data, strict)
    }

    /// Write `data`, overriding the strict flag for this call.
    ///
    /// In strict mode a partial write fails with [`Error::WriteTimeout`].
    pub fn write_with(&mut self, data: &[u8], strict: bool) -> Result<usize> {
        let written = self.device.write(data)?;
        if strict && written < data.len() {
            return Err(Error::WriteTimeout {
                requested: data.len(),
                written,
            });
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_millis_mean_no_timeout() {
        let policy = TimeoutPolicy::from_millis(0, -5);
        assert_eq!(policy.read, None);
        assert_eq!(policy.write, None);

        let policy = TimeoutPolicy::from_millis(1000, 250);
        assert_eq!(policy.read, Some(Duration::from_millis(1000)));
        assert_eq!(policy.write, Some(Duration::from_millis(250)));
    }

    #[test]
    fn native_timeouts_carry_read_flag_only() {
        assert_eq!(TimeoutPolicy::from_millis(1000, 0).native_timeouts(), (1, 0));
        assert_eq!(TimeoutPolicy::from_millis(0, 0).native_timeouts(), (0, 0));
        assert_eq!(TimeoutPolicy::from_millis(5, 300).native_timeouts(), (1, 300));
    }

    #[test]
    fn zero_durations_are_normalized() {
        let policy = TimeoutPolicy::new()
            .read_timeout(Some(Duration::ZERO))
            .write_timeout(Some(Duration::from_millis(10)))
            .strict(true);
        assert_eq!(policy.read, None);
        assert_eq!(policy.write, Some(Duration::from_millis(10)));
        assert!(policy.strict);
    }
}
