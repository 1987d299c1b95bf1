use std::sync::Arc;

use crate::audio_api::{AudioCommand, VoiceGroup};

use super::effect::{Compressor, Effect, Limiter, LowPass, Ramp, db_to_gain};
use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

const MAX_BLOCK: usize = 8192; // scratch is sized once so the callback doesn't allocate
const COMP_THRESHOLD_DB: f32 = -20.0;
const COMP_RATIO: f32 = 4.0;
const LIMIT_CEILING_DB: f32 = -2.0;
const OPEN_CUTOFF_HZ: f32 = 20_000.0;
const DEFAULT_BUS_DB: f32 = -12.0;

struct ChannelGroup {
    id: VoiceGroup,
    voices: Vec<Voice>,
}

impl ChannelGroup {
    fn voice_mut(&mut self, index: usize) -> &mut Voice {
        while self.voices.len() <= index {
            let next = self.voices.len();
            self.voices.push(Voice::looping(next));
        }
        &mut self.voices[index]
    }
}

pub struct Engine {
    sample_rate: u32,
    samples: Vec<Option<Arc<SampleBuffer>>>, // by sample index
    solo: Option<Voice>,
    groups: Vec<ChannelGroup>,
    bus_db: Ramp,
    filter: LowPass,
    compressor: Compressor,
    limiter: Limiter,
    scratch: Vec<StereoFrame>,
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
            solo: None,
            groups: Vec::new(),
            bus_db: Ramp::new(DEFAULT_BUS_DB),
            filter: LowPass::new(sample_rate, OPEN_CUTOFF_HZ),
            compressor: Compressor::new(sample_rate, COMP_THRESHOLD_DB, COMP_RATIO),
            limiter: Limiter::new(sample_rate, LIMIT_CEILING_DB),
            scratch: Vec::with_capacity(MAX_BLOCK),
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { index, buffer } => {
                if self.samples.len() <= index {
                    self.samples.resize(index + 1, None);
                }
                self.samples[index] = Some(buffer);
            }
            AudioCommand::PlaySolo { index, offset_frames } => {
                self.solo = Some(Voice::one_shot(index, offset_frames));
            }
            AudioCommand::StopSolo => self.solo = None,
            AudioCommand::CreateGroup { group } => {
                if !self.groups.iter().any(|g| g.id == group) {
                    self.groups.push(ChannelGroup { id: group, voices: Vec::new() });
                }
            }
            AudioCommand::ReleaseGroup { group } => self.groups.retain(|g| g.id != group),
            AudioCommand::SetChannel { group, index, muted, start } => {
                if let Some(g) = self.groups.iter_mut().find(|g| g.id == group) {
                    let voice = g.voice_mut(index);
                    voice.muted = muted;
                    if start {
                        voice.start();
                    }
                }
            }
            AudioCommand::RampCutoff { hz, secs } => self.filter.ramp_cutoff(hz, secs),
            AudioCommand::RampVolume { db, secs } => {
                let frames = (secs.max(0.0) * self.sample_rate as f32) as u32;
                self.bus_db.ramp_to(db, frames);
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());

        // solo goes straight to the output, no master chain
        if let Some(voice) = self.solo.as_mut() {
            if let Some(Some(buf)) = self.samples.get(voice.sample_index) {
                voice.render_into(buf, out, 1.0);
            }
            if !voice.active {
                self.solo = None;
            }
        }

        if self.groups.is_empty() {
            return;
        }

        for chunk in out.chunks_mut(MAX_BLOCK) {
            self.scratch.clear();
            self.scratch.resize(chunk.len(), StereoFrame::zero());
            let gain = db_to_gain(self.bus_db.advance(chunk.len() as u32));

            for group in self.groups.iter_mut() {
                for voice in group.voices.iter_mut() {
                    if let Some(Some(buf)) = self.samples.get(voice.sample_index) {
                        voice.render_into(buf, &mut self.scratch, gain);
                    }
                }
            }

            self.filter.process(&mut self.scratch);
            self.compressor.process(&mut self.scratch);
            self.limiter.process(&mut self.scratch);

            for (o, s) in chunk.iter_mut().zip(self.scratch.iter()) {
                *o += *s;
            }
        }
    }
}
