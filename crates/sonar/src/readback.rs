//! Host readback of display and raw output images.
//!
//! A copy requested while drawing tick `T` is mapped at the transform commit
//! of tick `T + 1` and posted to the sonar's [`SonarMailbox`].

use std::borrow::Cow;
use std::sync::Arc;

use compute::texel::cast_texels;
use compute::{BufferView, ComputeBackend, ComputeError, SampleFormat, Texel};
use parking_lot::Mutex;

/// Channel index of delivered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataChannel {
    /// RGB8 display image, 3 bytes per pixel.
    Display = 0,
    /// Output image in the sonar's sample format.
    Raw = 1,
}

/// One delivered sonar image pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SonarFrame {
    /// Index of the compute pass that produced the images, counting from 0.
    pub tick: u64,
    pub display: Vec<u8>,
    pub display_size: (u32, u32),
    pub output: Vec<u8>,
    pub output_size: (u32, u32),
    pub format: SampleFormat,
}

impl SonarFrame {
    #[must_use]
    pub fn channel(&self, channel: DataChannel) -> &[u8] {
        match channel {
            DataChannel::Display => &self.display,
            DataChannel::Raw => &self.output,
        }
    }

    /// Raw output as texels, or `None` when `T` is not the frame's format.
    #[must_use]
    pub fn output_texels<T: Texel>(&self) -> Option<Cow<'_, [T]>> {
        (T::FORMAT == self.format).then(|| cast_texels(&self.output))
    }

    /// Raw output converted to floats, whatever the format.
    #[must_use]
    pub fn output_strengths(&self) -> Vec<f32> {
        fn collect<T: Texel>(bytes: &[u8]) -> Vec<f32> {
            cast_texels::<T>(bytes).iter().map(|t| t.strength()).collect()
        }
        match self.format {
            SampleFormat::U8 => collect::<u8>(&self.output),
            SampleFormat::U16 => collect::<u16>(&self.output),
            SampleFormat::U32 => collect::<u32>(&self.output),
            SampleFormat::F32 => cast_texels::<f32>(&self.output).into_owned(),
        }
    }
}

/// Single-slot delivery box shared between a sonar and its owning sensor.
///
/// A newer frame replaces one that was never taken.
#[derive(Debug, Clone, Default)]
pub struct SonarMailbox {
    slot: Arc<Mutex<Option<SonarFrame>>>,
}

impl SonarMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `frame`, returning the undelivered frame it replaced.
    pub fn post(&self, frame: SonarFrame) -> Option<SonarFrame> {
        self.slot.lock().replace(frame)
    }

    pub fn take(&self) -> Option<SonarFrame> {
        self.slot.lock().take()
    }

    #[must_use]
    pub fn has_frame(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[derive(Debug, Clone)]
struct PendingCopy {
    tick: u64,
    display: BufferView,
    output: BufferView,
}

/// Staging buffers for the display and raw images.
#[derive(Debug, Clone)]
pub(crate) struct ReadbackStage {
    pending: Option<PendingCopy>,
    display_size: (u32, u32),
    output_size: (u32, u32),
    format: SampleFormat,
}

impl ReadbackStage {
    pub(crate) fn new(display_size: (u32, u32), output_size: (u32, u32), format: SampleFormat) -> Self {
        Self {
            pending: None,
            display_size,
            output_size,
            format,
        }
    }

    /// Queues copies of both images. A copy that was never mapped is replaced.
    pub(crate) fn request(
        &mut self,
        backend: &dyn ComputeBackend,
        tick: u64,
        display: BufferView,
        output: BufferView,
    ) -> Result<(), ComputeError> {
        backend.begin_copy(&display)?;
        backend.begin_copy(&output)?;
        if let Some(stale) = self.pending.replace(PendingCopy { tick, display, output }) {
            tracing::debug!(tick = stale.tick, "dropping unmapped readback");
        }
        Ok(())
    }

    #[must_use]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Maps pending copies and posts them. On a map failure the copy stays
    /// queued for the next commit.
    pub(crate) fn deliver(&mut self, backend: &dyn ComputeBackend, mailbox: &SonarMailbox) -> bool {
        let Some(copy) = self.pending.as_ref() else {
            return false;
        };
        let mapped = backend
            .map_read(&copy.display)
            .and_then(|display| backend.map_read(&copy.output).map(|output| (display, output)));
        match mapped {
            Ok((display, output)) => {
                let frame = SonarFrame {
                    tick: copy.tick,
                    display,
                    display_size: self.display_size,
                    output,
                    output_size: self.output_size,
                    format: self.format,
                };
                self.pending = None;
                if mailbox.post(frame).is_some() {
                    tracing::debug!("previous sonar frame was never taken");
                }
                true
            }
            Err(err) => {
                tracing::debug!(tick = copy.tick, %err, "readback not mapped, retrying next commit");
                false
            }
        }
    }
}
