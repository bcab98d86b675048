use std::{
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    buffer::RawImageBuffer,
    error::{QuadError, QuadResult},
    scheduler::{Scheduler, TaskHandle},
};

/// A live capture device producing grayscale frames at the pipeline's input
/// dimensions. Implemented per source; the pipeline only sees this surface.
pub trait CaptureDevice {
    /// Grabs the next frame if one is ready. `Ok(None)` means "nothing yet,
    /// poll again".
    fn poll_frame(&mut self) -> QuadResult<Option<RawImageBuffer>>;

    /// Releases the underlying device. Called exactly once per session.
    fn release(&mut self);
}

/// Lifecycle wrapper around one capture device: acquire, poll on a short
/// interval, commit a single snapshot, release. The device handle is owned
/// exclusively and released exactly once, whether via an explicit `close`
/// or the automatic close after a snapshot commit.
pub struct CaptureSession {
    device: Option<Box<dyn CaptureDevice>>,
    pending_poll: Option<TaskHandle>,
    last_frame: Option<RawImageBuffer>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("is_open", &self.device.is_some())
            .field("pending_poll", &self.pending_poll)
            .field("last_frame", &self.last_frame)
            .finish()
    }
}

impl CaptureSession {
    /// Acquires the device through `factory`. Acquisition failure is
    /// reported once as `DeviceUnavailable`; there is no retry loop.
    pub fn open(
        factory: impl FnOnce() -> QuadResult<Box<dyn CaptureDevice>>,
    ) -> QuadResult<Self> {
        let device = factory().map_err(|e| match e {
            QuadError::DeviceUnavailable(_) => e,
            other => QuadError::device(other.to_string()),
        })?;
        tracing::debug!("capture device acquired");
        Ok(Self {
            device: Some(device),
            pending_poll: None,
            last_frame: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn has_pending_poll(&self) -> bool {
        self.pending_poll.is_some()
    }

    /// Schedules the next poll tick, replacing (and cancelling) any poll
    /// this session already owns. Only this session's handle is touched.
    pub fn schedule_poll<T>(
        &mut self,
        scheduler: &mut Scheduler<T>,
        now: Instant,
        interval: Duration,
        token: T,
    ) {
        if let Some(handle) = self.pending_poll.take() {
            scheduler.cancel(handle);
        }
        self.pending_poll = Some(scheduler.schedule_after(now, interval, token));
    }

    /// One poll tick: asks the device for a frame and keeps the latest one
    /// for the eventual snapshot. Returns the frame polled this tick.
    pub fn poll(&mut self) -> QuadResult<Option<&RawImageBuffer>> {
        self.pending_poll = None;
        let Some(device) = self.device.as_mut() else {
            return Ok(None);
        };
        if let Some(frame) = device.poll_frame()? {
            self.last_frame = Some(frame);
        }
        Ok(self.last_frame.as_ref())
    }

    /// Cancels the pending poll, captures exactly one frame, persists it as
    /// a reusable static raw image, and closes the session.
    pub fn commit_snapshot<T>(
        &mut self,
        scheduler: &mut Scheduler<T>,
        path: &Path,
    ) -> QuadResult<RawImageBuffer> {
        if let Some(handle) = self.pending_poll.take() {
            scheduler.cancel(handle);
        }

        let device = self
            .device
            .as_mut()
            .ok_or_else(|| QuadError::device("session is closed"))?;

        let frame = match device.poll_frame()? {
            Some(frame) => frame,
            None => self
                .last_frame
                .take()
                .ok_or_else(|| QuadError::device("no frame available to snapshot"))?,
        };

        frame.save(path)?;
        tracing::info!(path = %path.display(), "snapshot committed");
        self.close(scheduler);
        Ok(frame)
    }

    /// Releases the device and cancels this session's pending poll. Safe to
    /// call any number of times: an explicit user close and the automatic
    /// post-snapshot close can race to it.
    pub fn close<T>(&mut self, scheduler: &mut Scheduler<T>) {
        if let Some(handle) = self.pending_poll.take() {
            scheduler.cancel(handle);
        }
        if let Some(mut device) = self.device.take() {
            device.release();
            tracing::debug!("capture device released");
        }
    }
}

/// Synthetic device producing a moving diagonal gradient. Stands in for
/// real hardware in tests and in the CLI's snapshot command.
pub struct TestPatternDevice {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl TestPatternDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }
}

impl CaptureDevice for TestPatternDevice {
    fn poll_frame(&mut self) -> QuadResult<Option<RawImageBuffer>> {
        let shift = self.frame_count;
        self.frame_count += 1;
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..u64::from(self.height) {
            for x in 0..u64::from(self.width) {
                pixels.push(((x + y + shift) % 256) as u8);
            }
        }
        Ok(Some(RawImageBuffer::new(self.width, self.height, pixels)?))
    }

    fn release(&mut self) {}
}
