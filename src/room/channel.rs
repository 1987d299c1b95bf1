use crate::audio_api::{AudioCommand, VoiceGroup};

/// Main-loop mirror of one looping engine channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub sample_index: usize,
    pub muted: bool,
    pub running: bool,
}

impl Channel {
    pub fn new(sample_index: usize) -> Self {
        Self {
            sample_index,
            muted: true,
            running: false,
        }
    }

    /// Un-mutes (and starts, if it never ran) or mutes the channel.
    /// Returns the engine command, or None when nothing changed.
    pub fn set_audible(&mut self, group: VoiceGroup, audible: bool) -> Option<AudioCommand> {
        let start = audible && !self.running;
        let muted = !audible;
        if !start && muted == self.muted {
            return None;
        }
        self.muted = muted;
        if start {
            self.running = true;
        }
        Some(AudioCommand::SetChannel {
            group,
            index: self.sample_index,
            muted,
            start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_once_then_only_toggles_mute() {
        let mut ch = Channel::new(3);
        assert!(ch.set_audible(VoiceGroup::LOCAL, false).is_none()); // already muted, never ran

        match ch.set_audible(VoiceGroup::LOCAL, true) {
            Some(AudioCommand::SetChannel { index, muted, start, .. }) => {
                assert_eq!(index, 3);
                assert!(!muted);
                assert!(start);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ch.running);
        assert!(ch.set_audible(VoiceGroup::LOCAL, true).is_none());

        // muting keeps it running so it can come back without a restart
        match ch.set_audible(VoiceGroup::LOCAL, false) {
            Some(AudioCommand::SetChannel { muted, start, .. }) => {
                assert!(muted);
                assert!(!start);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ch.running);

        match ch.set_audible(VoiceGroup::LOCAL, true) {
            Some(AudioCommand::SetChannel { muted, start, .. }) => {
                assert!(!muted);
                assert!(!start);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
