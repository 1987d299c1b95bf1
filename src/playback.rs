//! Solo listening: one voice, one sample at a time.
//!
//! Buffers are loaded lazily the first time a sample is picked and stay cached
//! (in the engine) for the rest of the session; the controller only keeps
//! their durations. Times are seconds on the main loop's clock.

use log::{debug, warn};

use crate::shared::SoloStatus;

/// What the main loop has to do after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum SoloAction {
    Start { index: usize, offset_secs: f64 },
    Stop,
    Load(usize),
}

/// The single playback slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackSlot {
    pub active: Option<usize>,
    pub paused_offset_secs: f64,
    pub started_at_secs: f64,
    pub playing: bool,
}

pub struct PlaybackController {
    slot: PlaybackSlot,
    durations: Vec<Option<f64>>, // Some once the buffer is cached
    loading: Vec<bool>,
    failed: Vec<bool>,
}

impl PlaybackController {
    pub fn new(num_samples: usize) -> Self {
        Self {
            slot: PlaybackSlot::default(),
            durations: vec![None; num_samples],
            loading: vec![false; num_samples],
            failed: vec![false; num_samples],
        }
    }

    #[cfg(test)]
    pub fn slot(&self) -> &PlaybackSlot {
        &self.slot
    }

    /// Play, pause, or resume `index` depending on where the slot is.
    pub fn select(&mut self, index: usize, now: f64) -> Vec<SoloAction> {
        if index >= self.durations.len() {
            return vec![];
        }
        if self.slot.active == Some(index) {
            if self.slot.playing {
                return self.pause(now);
            }
            if self.loading[index] {
                return vec![]; // still buffering, let it land
            }
        }

        let mut actions = Vec::new();
        if self.slot.playing {
            actions.push(SoloAction::Stop);
            self.slot.playing = false;
        }
        if self.slot.active != Some(index) {
            // switching drops whatever position the old sample had
            self.slot.paused_offset_secs = 0.0;
        }
        self.slot.active = Some(index);
        self.failed[index] = false;

        match self.durations[index] {
            Some(duration) => actions.push(self.start(index, duration, now)),
            None => {
                if !self.loading[index] {
                    self.loading[index] = true;
                    actions.push(SoloAction::Load(index));
                }
            }
        }
        actions
    }

    fn pause(&mut self, now: f64) -> Vec<SoloAction> {
        let elapsed = (now - self.slot.started_at_secs).max(0.0);
        self.slot.paused_offset_secs += elapsed;
        self.slot.playing = false;
        debug!("solo paused at {:.3}s", self.slot.paused_offset_secs);
        vec![SoloAction::Stop]
    }

    fn start(&mut self, index: usize, duration: f64, now: f64) -> SoloAction {
        // resuming at or past the end would just play silence
        if self.slot.paused_offset_secs >= duration || self.slot.paused_offset_secs < 0.0 {
            self.slot.paused_offset_secs = 0.0;
        }
        self.slot.playing = true;
        self.slot.started_at_secs = now;
        SoloAction::Start {
            index,
            offset_secs: self.slot.paused_offset_secs,
        }
    }

    /// Stops `index` if it's the active one and forgets its position.
    pub fn reset(&mut self, index: usize) -> Vec<SoloAction> {
        if index >= self.durations.len() {
            return vec![];
        }
        self.failed[index] = false;
        if self.slot.active != Some(index) {
            return vec![];
        }
        let was_playing = self.slot.playing;
        self.slot = PlaybackSlot::default();
        if was_playing { vec![SoloAction::Stop] } else { vec![] }
    }

    /// A load finished. The duration is cached either way; playback only
    /// starts if the user is still waiting on this very sample.
    pub fn on_loaded(&mut self, index: usize, duration_secs: f64, now: f64) -> Vec<SoloAction> {
        if index >= self.durations.len() {
            return vec![];
        }
        self.durations[index] = Some(duration_secs);
        self.loading[index] = false;
        self.failed[index] = false;
        if self.slot.active == Some(index) && !self.slot.playing {
            return vec![self.start(index, duration_secs, now)];
        }
        debug!("sample {index} cached, no longer selected");
        vec![]
    }

    pub fn on_load_failed(&mut self, index: usize) {
        if index >= self.durations.len() {
            return;
        }
        warn!("sample {index} failed to load, waiting for a retry");
        self.loading[index] = false;
        self.failed[index] = true;
        if self.slot.active == Some(index) {
            self.slot = PlaybackSlot::default();
        }
    }

    /// The solo voice doesn't loop: once it has played to the end the slot
    /// goes back to idle.
    pub fn poll_finished(&mut self, now: f64) -> bool {
        let Some(index) = self.slot.active else { return false };
        let Some(duration) = self.durations[index] else { return false };
        if !self.slot.playing {
            return false;
        }
        let position = self.slot.paused_offset_secs + (now - self.slot.started_at_secs);
        if position < duration {
            return false;
        }
        self.slot = PlaybackSlot::default();
        true
    }

    pub fn status(&self, index: usize) -> SoloStatus {
        if self.failed.get(index).copied().unwrap_or(false) {
            return SoloStatus::Retry;
        }
        if self.slot.active != Some(index) {
            return SoloStatus::Play;
        }
        if self.loading[index] {
            SoloStatus::Buffering
        } else if self.slot.playing {
            SoloStatus::Pause
        } else if self.slot.paused_offset_secs > 0.0 {
            SoloStatus::Resume
        } else {
            SoloStatus::Play
        }
    }
}
