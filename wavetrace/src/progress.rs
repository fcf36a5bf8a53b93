use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Rendering,
    Done,
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStatus::Rendering => write!(f, "rendering"),
            RenderStatus::Done => write!(f, "done"),
        }
    }
}

/// Samples accumulated by the current render and the time they took.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    samples: u32,
    elapsed: Duration,
}

impl Progress {
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Time since the render started issuing work, as of the last completed
    /// sample.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn average_sample_time(&self) -> Option<Duration> {
        if self.samples == 0 {
            None
        } else {
            Some(self.elapsed / self.samples)
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Default::default();
    }

    pub(crate) fn record(&mut self, samples: u32, elapsed: Duration) {
        self.samples += samples;
        self.elapsed = elapsed;
    }
}
