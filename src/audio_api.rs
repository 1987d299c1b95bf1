use std::sync::Arc;

pub use crate::audio::SampleBuffer;

/// Names one set of looping channels inside the engine: ours, or one remote user's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceGroup(pub u32);

impl VoiceGroup {
    pub const LOCAL: VoiceGroup = VoiceGroup(0);
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't decode files (would stall the callback), so the loader
    // thread decodes and the main loop registers the finished buffer here.
    // Buffers are keyed by sample index and stay cached for the whole session.
    RegisterSample { index: usize, buffer: Arc<SampleBuffer> },

    // Solo mode: the single one-shot voice, straight to the output.
    PlaySolo { index: usize, offset_frames: usize },
    StopSolo,

    // Mixer mode: a group owns one looping channel per sample, all of them
    // feeding the shared filter -> compressor -> limiter chain.
    CreateGroup { group: VoiceGroup },
    ReleaseGroup { group: VoiceGroup },
    // `start` kicks off a channel that isn't running yet; muted channels keep looping.
    SetChannel { group: VoiceGroup, index: usize, muted: bool, start: bool },

    RampCutoff { hz: f32, secs: f32 },
    RampVolume { db: f32, secs: f32 },
}
