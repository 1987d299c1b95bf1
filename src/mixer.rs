// Networked mode: our own looping channels, the shared filter sweep, and the
// crowd-size gain.

use log::debug;

use crate::audio_api::{AudioCommand, VoiceGroup};
use crate::room::{Channel, Page, RoomState, local_audible};

pub const HUB_CUTOFF_HZ: f32 = 20_000.0;
pub const NODE_CUTOFF_HZ: f32 = 800.0;
pub const RAMP_SECS: f32 = 0.5;

pub struct Mixer {
    channels: Vec<Channel>,
    failed: Vec<bool>, // no buffer in the engine; kept muted whatever the page
    base_volume_db: f32,
}

impl Mixer {
    pub fn new(num_samples: usize, base_volume_db: f32) -> Self {
        Self {
            channels: (0..num_samples).map(Channel::new).collect(),
            failed: vec![false; num_samples],
            base_volume_db,
        }
    }

    pub fn mark_failed(&mut self, index: usize) {
        if let Some(f) = self.failed.get_mut(index) {
            *f = true;
        }
    }

    /// Clears a failure. True if `index` had failed before, meaning its
    /// channel may need un-muting now.
    pub fn mark_loaded(&mut self, index: usize) -> bool {
        self.failed
            .get_mut(index)
            .is_some_and(|f| std::mem::replace(f, false))
    }

    pub fn failed(&self) -> &[bool] {
        &self.failed
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect()
    }

    /// All samples are in: set up our group and apply the page we're on.
    pub fn go_live(&mut self, room: &mut RoomState) -> Vec<AudioCommand> {
        let mut cmds = vec![
            AudioCommand::CreateGroup { group: VoiceGroup::LOCAL },
            // land on the right level straight away, no fade in from the engine default
            AudioCommand::RampVolume {
                db: self.occupancy_volume_db(room.total_occupants()),
                secs: 0.0,
            },
        ];
        let page = room.current_page;
        cmds.extend(self.set_local_page(room, page));
        cmds
    }

    pub fn move_page(&mut self, room: &mut RoomState, dir: i64) -> Vec<AudioCommand> {
        let page = room.current_page.step(dir);
        self.set_local_page(room, page)
    }

    /// Moves us to `page` and re-mixes everything we hear from there.
    pub fn set_local_page(&mut self, room: &mut RoomState, page: Page) -> Vec<AudioCommand> {
        room.current_page = page;
        debug!("local page -> {page}");

        let failed = &self.failed;
        let mut cmds: Vec<AudioCommand> = self
            .channels
            .iter_mut()
            .filter_map(|ch| {
                let audible = local_audible(page, ch.sample_index) && !failed[ch.sample_index];
                ch.set_audible(VoiceGroup::LOCAL, audible)
            })
            .collect();

        let hz = if page.is_hub() { HUB_CUTOFF_HZ } else { NODE_CUTOFF_HZ };
        cmds.push(AudioCommand::RampCutoff { hz, secs: RAMP_SECS });

        cmds.extend(room.remix_remote());
        cmds
    }

    /// Per-voice volume shrinks with log2 of the head count so a crowded room
    /// doesn't clip.
    pub fn occupancy_volume_db(&self, total_occupants: usize) -> f32 {
        let total = total_occupants.max(1) as f32;
        self.base_volume_db - 4.0 * total.log2()
    }

    pub fn occupancy_ramp(&self, total_occupants: usize) -> AudioCommand {
        AudioCommand::RampVolume {
            db: self.occupancy_volume_db(total_occupants),
            secs: RAMP_SECS,
        }
    }

    pub fn audible(&self) -> Vec<bool> {
        self.channels.iter().map(|c| !c.muted).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unmuted_local(cmds: &[AudioCommand]) -> Vec<usize> {
        cmds.iter()
            .filter_map(|c| match c {
                AudioCommand::SetChannel { group, index, muted: false, .. }
                    if *group == VoiceGroup::LOCAL =>
                {
                    Some(*index)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn going_live_at_the_hub_starts_everything() {
        let mut room = RoomState::new(8);
        let mut mixer = Mixer::new(8, -12.0);
        let cmds = mixer.go_live(&mut room);
        assert!(matches!(cmds[0], AudioCommand::CreateGroup { group: VoiceGroup::LOCAL }));
        assert_eq!(unmuted_local(&cmds), (0..8).collect::<Vec<_>>());
        assert!(cmds.iter().any(|c| matches!(
            c,
            AudioCommand::RampCutoff { hz, .. } if *hz == HUB_CUTOFF_HZ
        )));
        assert!(mixer.audible().iter().all(|&a| a));
    }

    #[test]
    fn moving_into_a_node_keeps_one_channel_and_muffles() {
        let mut room = RoomState::new(8);
        let mut mixer = Mixer::new(8, -12.0);
        mixer.go_live(&mut room);

        let cmds = mixer.move_page(&mut room, 3); // page 4 = node 3 = channel 2
        assert_eq!(room.current_page, Page::wrap(4));
        assert_eq!(
            mixer.audible(),
            vec![false, false, true, false, false, false, false, false]
        );
        // the seven others get muted, never stopped
        let muted = cmds
            .iter()
            .filter(|c| matches!(c, AudioCommand::SetChannel { muted: true, start: false, .. }))
            .count();
        assert_eq!(muted, 7);
        assert!(cmds.iter().any(|c| matches!(
            c,
            AudioCommand::RampCutoff { hz, secs } if *hz == NODE_CUTOFF_HZ && *secs == RAMP_SECS
        )));
    }

    #[test]
    fn every_page_matches_the_local_rule() {
        let mut room = RoomState::new(8);
        let mut mixer = Mixer::new(8, -12.0);
        mixer.go_live(&mut room);
        for step in 0..20 {
            mixer.move_page(&mut room, if step % 3 == 0 { -1 } else { 1 });
            let page = room.current_page;
            let expected: Vec<bool> = (0..8).map(|i| local_audible(page, i)).collect();
            assert_eq!(mixer.audible(), expected, "page {page}");
        }
    }

    #[test]
    fn moving_remixes_remote_users() {
        let mut room = RoomState::new(8);
        let mut mixer = Mixer::new(8, -12.0);
        mixer.go_live(&mut room);
        room.apply_update("9", Page::HUB);
        assert!(room.participants["9"].channels.iter().all(|c| !c.muted));

        mixer.set_local_page(&mut room, Page::wrap(6));
        assert!(room.participants["9"].channels.iter().all(|c| c.muted));
    }

    #[test]
    fn failed_samples_stay_muted_until_they_load() {
        let mut room = RoomState::new(3);
        let mut mixer = Mixer::new(3, -12.0);
        mixer.mark_failed(1);
        let cmds = mixer.go_live(&mut room);
        assert_eq!(unmuted_local(&cmds), vec![0, 2]);
        assert_eq!(mixer.audible(), vec![true, false, true]);
        assert_eq!(mixer.failed_indices(), vec![1]);

        // standing in its node doesn't bring it back either
        mixer.set_local_page(&mut room, Page::wrap(3));
        assert_eq!(mixer.audible(), vec![false, false, false]);

        assert!(mixer.mark_loaded(1));
        assert!(!mixer.mark_loaded(1));
        let cmds = mixer.set_local_page(&mut room, Page::wrap(3));
        assert_eq!(unmuted_local(&cmds), vec![1]);
        assert_eq!(mixer.failed(), &[false, false, false]);
    }

    #[test]
    fn occupancy_gain_is_logarithmic() {
        let mixer = Mixer::new(8, -12.0);
        assert_eq!(mixer.occupancy_volume_db(1), -12.0);
        assert_eq!(mixer.occupancy_volume_db(2), -16.0);
        assert_eq!(mixer.occupancy_volume_db(4), -20.0);
        assert!((mixer.occupancy_volume_db(3) - (-12.0 - 4.0 * 3f32.log2())).abs() < 1e-5);
        assert!(matches!(
            mixer.occupancy_ramp(8),
            AudioCommand::RampVolume { db, secs } if db == -24.0 && secs == RAMP_SECS
        ));
    }
}
