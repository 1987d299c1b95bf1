// The middle layer: owns every piece of room and playback state and turns
// input, loader results and relay traffic into outputs for main to carry out.
// Nothing in here touches a thread, socket or device, so the whole flow can be
// driven from tests.

use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use crate::audio_api::AudioCommand;
use crate::config::{RoomConfig, Sample};
use crate::loader::LoadResult;
use crate::mixer::Mixer;
use crate::playback::{PlaybackController, SoloAction};
use crate::relay::{Inbound, Outbound, RelayLink, TransportEvent};
use crate::room::{Page, RoomState};
use crate::shared::{DisplayState, InputEvent, Screen, SoloRow};

#[derive(Debug)]
pub enum Output {
    Audio(AudioCommand),
    Load { index: usize, path: PathBuf },
    /// Open a fresh relay connection, replacing any old one.
    Connect,
    Relay(Outbound),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MixerPhase {
    Loading { settled: usize },
    Live,
}

pub struct Middle {
    screen: Screen,
    samples: Vec<Sample>,
    sample_rate: u32,
    origin: Instant, // solo timestamps are seconds since this
    playback: PlaybackController,
    room: RoomState,
    mixer: Mixer,
    phase: MixerPhase,
    link: RelayLink,
}

impl Middle {
    pub fn new(config: &RoomConfig, samples: Vec<Sample>, sample_rate: u32, now: Instant) -> Self {
        let n = samples.len();
        Self {
            screen: Screen::Landing,
            samples,
            sample_rate,
            origin: now,
            playback: PlaybackController::new(n),
            room: RoomState::new(n),
            mixer: Mixer::new(n, config.base_volume_db),
            phase: MixerPhase::Loading { settled: 0 },
            // the transport gives up on its own after connect_timeout; this catches
            // an attempt stuck before the socket exists (name resolution)
            link: RelayLink::new(config.reconnect_delay(), config.connect_timeout() * 2),
        }
    }

    fn secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.origin).as_secs_f64()
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> Vec<Output> {
        match (self.screen, event) {
            (Screen::Landing, InputEvent::ChooseMixer) => self.enter_mixer(now),
            (Screen::Landing, InputEvent::ChooseSolo) => {
                info!("solo listening");
                self.screen = Screen::Solo;
                vec![]
            }
            (Screen::Mixer, InputEvent::MovePage(dir)) if self.phase == MixerPhase::Live => {
                let mut out = audio(self.mixer.move_page(&mut self.room, dir));
                // local audio first, then tell the room
                if self.link.is_connected() {
                    out.push(Output::Relay(Outbound::PageMove { page: self.room.current_page.get() }));
                }
                out
            }
            (Screen::Mixer, InputEvent::RetryFailed) if self.phase == MixerPhase::Live => {
                let failed = self.mixer.failed_indices();
                if !failed.is_empty() {
                    info!("retrying {} failed samples", failed.len());
                }
                failed
                    .into_iter()
                    .filter_map(|index| self.samples.get(index))
                    .map(|s| Output::Load { index: s.index, path: s.path.clone() })
                    .collect()
            }
            (Screen::Solo, InputEvent::SoloSelect(i)) => {
                let actions = self.playback.select(i as usize, self.secs(now));
                self.solo_outputs(actions)
            }
            (Screen::Solo, InputEvent::SoloReset(i)) => {
                let actions = self.playback.reset(i as usize);
                self.solo_outputs(actions)
            }
            _ => vec![],
        }
    }

    fn enter_mixer(&mut self, now: Instant) -> Vec<Output> {
        info!("network mixer, loading {} samples", self.samples.len());
        self.screen = Screen::Mixer;
        self.phase = MixerPhase::Loading { settled: 0 };
        if self.samples.is_empty() {
            return self.go_live(now);
        }
        self.samples
            .iter()
            .map(|s| Output::Load { index: s.index, path: s.path.clone() })
            .collect()
    }

    fn go_live(&mut self, now: Instant) -> Vec<Output> {
        self.phase = MixerPhase::Live;
        let out = audio(self.mixer.go_live(&mut self.room));
        self.link.start(now);
        out
    }

    fn solo_outputs(&self, actions: Vec<SoloAction>) -> Vec<Output> {
        actions
            .into_iter()
            .filter_map(|a| match a {
                SoloAction::Start { index, offset_secs } => Some(Output::Audio(AudioCommand::PlaySolo {
                    index,
                    offset_frames: (offset_secs * self.sample_rate as f64) as usize,
                })),
                SoloAction::Stop => Some(Output::Audio(AudioCommand::StopSolo)),
                SoloAction::Load(index) => self
                    .samples
                    .get(index)
                    .map(|s| Output::Load { index, path: s.path.clone() }),
            })
            .collect()
    }

    pub fn on_loaded(&mut self, result: LoadResult, now: Instant) -> Vec<Output> {
        let index = result.index;
        if index >= self.samples.len() {
            return vec![];
        }
        let mut out = Vec::new();
        match result.outcome {
            Ok(buffer) => {
                let duration = buffer.duration_secs();
                out.push(Output::Audio(AudioCommand::RegisterSample { index, buffer }));
                let recovered = self.mixer.mark_loaded(index);
                if recovered && self.screen == Screen::Mixer && self.phase == MixerPhase::Live {
                    let page = self.room.current_page;
                    out.extend(audio(self.mixer.set_local_page(&mut self.room, page)));
                }
                if self.screen == Screen::Solo {
                    let actions = self.playback.on_loaded(index, duration, self.secs(now));
                    out.extend(self.solo_outputs(actions));
                }
            }
            Err(e) => {
                warn!("{}: {e}", self.samples[index].display_name);
                match self.screen {
                    Screen::Solo => self.playback.on_load_failed(index),
                    Screen::Mixer => self.mixer.mark_failed(index),
                    Screen::Landing => {}
                }
            }
        }

        if self.screen == Screen::Mixer {
            if let MixerPhase::Loading { settled } = self.phase {
                let settled = settled + 1;
                self.phase = MixerPhase::Loading { settled };
                if settled >= self.samples.len() {
                    out.extend(self.go_live(now));
                }
            }
        }
        out
    }

    pub fn on_relay_event(&mut self, event: TransportEvent, now: Instant) -> Vec<Output> {
        let before = self.room.total_occupants();
        let mut out = match event {
            TransportEvent::Opened => {
                self.link.on_open();
                vec![]
            }
            TransportEvent::Message(Inbound::Init { user_id }) => {
                info!("relay assigned us id {user_id}");
                self.room.my_id = Some(user_id);
                vec![Output::Relay(Outbound::PageMove { page: self.room.current_page.get() })]
            }
            TransportEvent::Message(Inbound::UserUpdate { user_id, page }) => {
                audio(self.room.apply_update(&user_id, Page::wrap(page)))
            }
            TransportEvent::Message(Inbound::UserLeave { user_id }) => {
                audio(self.room.remove(&user_id))
            }
            TransportEvent::Message(Inbound::Unknown) => vec![],
            TransportEvent::Closed(reason) => {
                warn!("relay: {reason}");
                self.link.on_closed(now);
                audio(self.room.purge())
            }
        };
        let after = self.room.total_occupants();
        if after != before {
            out.push(Output::Audio(self.mixer.occupancy_ramp(after)));
        }
        out
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Output> {
        let mut out = Vec::new();
        if self.link.poll(now) {
            out.push(Output::Connect);
        }
        if self.screen == Screen::Solo {
            self.playback.poll_finished(self.secs(now));
        }
        out
    }

    pub fn display_state(&self) -> DisplayState {
        let page = self.room.current_page;
        let status = match (self.screen, self.phase) {
            (Screen::Mixer, MixerPhase::Loading { settled }) => {
                format!("LOADING SAMPLES {settled}/{}", self.samples.len())
            }
            (Screen::Mixer, MixerPhase::Live) => self.link.status_text().to_string(),
            (Screen::Solo, _) => "SOLO LISTENING".to_string(),
            (Screen::Landing, _) => "CHOOSE A PATH".to_string(),
        };
        DisplayState {
            screen: self.screen,
            status,
            page_title: page.title(),
            room_label: page.room_label(),
            current_node: page.node_channel(),
            occupants_here: self.room.occupants_here(),
            occupants: self.room.occupants(),
            audible: self.mixer.audible(),
            failed: self.mixer.failed().to_vec(),
            solo: self
                .samples
                .iter()
                .map(|s| SoloRow {
                    name: s.display_name.clone(),
                    status: self.playback.status(s.index),
                })
                .collect(),
        }
    }
}

fn audio(cmds: Vec<AudioCommand>) -> Vec<Output> {
    cmds.into_iter().map(Output::Audio).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::audio::{SampleBuffer, StereoFrame};
    use crate::relay::RelayError;
    use crate::shared::SoloStatus;

    const SR: u32 = 1000;

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|index| Sample {
                index,
                path: PathBuf::from(format!("s{index}.wav")),
                display_name: format!("S{index}"),
            })
            .collect()
    }

    fn ok(index: usize, secs: usize) -> LoadResult {
        LoadResult {
            index,
            outcome: Ok(Arc::new(SampleBuffer {
                data: vec![StereoFrame::zero(); secs * SR as usize],
                sample_rate: SR,
            })),
        }
    }

    fn live_mixer(t0: Instant) -> Middle {
        let mut m = Middle::new(&RoomConfig::default(), samples(8), SR, t0);
        let loads = m.handle_input(InputEvent::ChooseMixer, t0);
        assert_eq!(loads.len(), 8);
        for i in 0..8 {
            m.on_loaded(ok(i, 2), t0);
        }
        assert_eq!(m.display_state().status, "CONNECTING TO ROOM...");
        assert!(matches!(m.tick(t0).as_slice(), [Output::Connect]));
        m.on_relay_event(TransportEvent::Opened, t0);
        m.on_relay_event(
            TransportEvent::Message(Inbound::Init { user_id: "1".into() }),
            t0,
        );
        m
    }

    #[test]
    fn mixer_goes_live_once_every_load_settles() {
        let t0 = Instant::now();
        let mut m = Middle::new(&RoomConfig::default(), samples(3), SR, t0);
        m.handle_input(InputEvent::ChooseMixer, t0);
        m.on_loaded(ok(0, 1), t0);
        assert_eq!(m.display_state().status, "LOADING SAMPLES 1/3");
        m.on_loaded(
            LoadResult {
                index: 1,
                outcome: Err(crate::audio::LoadError::Unsupported("x".into())),
            },
            t0,
        );
        assert!(m.tick(t0).is_empty()); // not live yet, so no connection
        let out = m.on_loaded(ok(2, 1), t0);
        assert!(out.iter().any(|o| matches!(o, Output::Audio(AudioCommand::CreateGroup { .. }))));
        assert!(matches!(m.tick(t0).as_slice(), [Output::Connect]));
    }

    #[test]
    fn page_move_updates_audio_before_telling_the_room() {
        let t0 = Instant::now();
        let mut m = live_mixer(t0);
        let out = m.handle_input(InputEvent::MovePage(1), t0);
        let relay_at = out
            .iter()
            .position(|o| matches!(o, Output::Relay(Outbound::PageMove { page: 2 })))
            .expect("page move sent");
        assert_eq!(relay_at, out.len() - 1);
        assert!(out[..relay_at].iter().all(|o| matches!(o, Output::Audio(_))));
        assert_eq!(m.display_state().page_title, "NODE 1");
    }

    #[test]
    fn page_moves_stay_local_while_offline() {
        let t0 = Instant::now();
        let mut m = live_mixer(t0);
        m.on_relay_event(TransportEvent::Closed(RelayError::ClosedByPeer), t0);
        let out = m.handle_input(InputEvent::MovePage(-1), t0);
        assert!(!out.iter().any(|o| matches!(o, Output::Relay(_))));
        assert_eq!(m.display_state().page_title, "NODE 8");
    }

    #[test]
    fn join_and_leave_round_trip() {
        let t0 = Instant::now();
        let mut m = live_mixer(t0);
        m.on_relay_event(
            TransportEvent::Message(Inbound::UserUpdate { user_id: "5".into(), page: 3 }),
            t0,
        );
        let labels: Vec<String> = m.display_state().occupants.into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["YOU", "User 5"]);

        let out = m.on_relay_event(
            TransportEvent::Message(Inbound::UserLeave { user_id: "5".into() }),
            t0,
        );
        assert!(out.iter().any(|o| matches!(o, Output::Audio(AudioCommand::ReleaseGroup { .. }))));
        assert!(out.iter().any(|o| matches!(
            o,
            Output::Audio(AudioCommand::RampVolume { db, .. }) if *db == -12.0
        )));
        let ds = m.display_state();
        assert_eq!(ds.occupants.len(), 1);
        assert_eq!(ds.occupants[0].label, "YOU");
    }

    #[test]
    fn init_announces_our_page_and_filters_our_echo() {
        let t0 = Instant::now();
        let mut m = live_mixer(t0);
        let out = m.on_relay_event(
            TransportEvent::Message(Inbound::Init { user_id: "abc".into() }),
            t0,
        );
        assert!(matches!(out.as_slice(), [Output::Relay(Outbound::PageMove { page: 1 })]));
        m.on_relay_event(
            TransportEvent::Message(Inbound::UserUpdate { user_id: "abc".into(), page: 4 }),
            t0,
        );
        assert_eq!(m.display_state().occupants.len(), 1);
    }

    #[test]
    fn dropped_link_goes_offline_and_retries_on_schedule() {
        let t0 = Instant::now();
        let mut m = live_mixer(t0);
        m.on_relay_event(
            TransportEvent::Message(Inbound::UserUpdate { user_id: "2".into(), page: 1 }),
            t0,
        );

        let out = m.on_relay_event(TransportEvent::Closed(RelayError::ClosedByPeer), t0);
        assert!(out.iter().any(|o| matches!(o, Output::Audio(AudioCommand::ReleaseGroup { .. }))));
        assert_eq!(m.display_state().status, "OFFLINE - RECONNECTING...");
        assert_eq!(m.display_state().occupants.len(), 1);

        let mut now = t0;
        for _ in 0..3 {
            assert!(m.tick(now + Duration::from_millis(2999)).is_empty());
            now += Duration::from_millis(3000);
            assert!(matches!(m.tick(now).as_slice(), [Output::Connect]));
            assert_eq!(m.display_state().status, "OFFLINE - RECONNECTING...");
            m.on_relay_event(TransportEvent::Closed(RelayError::ClosedByPeer), now);
        }
        m.tick(now + Duration::from_millis(3000));
        m.on_relay_event(TransportEvent::Opened, now);
        assert_eq!(m.display_state().status, "NETWORK AUDIO LIVE");
    }

    #[test]
    fn solo_flow_loads_lazily_and_ignores_stale_results() {
        let t0 = Instant::now();
        let mut m = Middle::new(&RoomConfig::default(), samples(2), SR, t0);
        m.handle_input(InputEvent::ChooseSolo, t0);

        let out = m.handle_input(InputEvent::SoloSelect(0), t0);
        assert!(matches!(out.as_slice(), [Output::Load { index: 0, .. }]));
        m.handle_input(InputEvent::SoloSelect(1), t0);

        // 0 lands after we moved on: registered, not played
        let out = m.on_loaded(ok(0, 5), t0);
        assert!(matches!(out.as_slice(), [Output::Audio(AudioCommand::RegisterSample { index: 0, .. })]));

        let out = m.on_loaded(ok(1, 5), t0 + Duration::from_secs(1));
        assert!(matches!(
            out.as_slice(),
            [
                Output::Audio(AudioCommand::RegisterSample { index: 1, .. }),
                Output::Audio(AudioCommand::PlaySolo { index: 1, offset_frames: 0 })
            ]
        ));

        // pause 2s in, resume at 2000 frames
        m.handle_input(InputEvent::SoloSelect(1), t0 + Duration::from_secs(3));
        assert_eq!(m.display_state().solo[1].status, SoloStatus::Resume);
        let out = m.handle_input(InputEvent::SoloSelect(1), t0 + Duration::from_secs(4));
        assert!(matches!(
            out.as_slice(),
            [Output::Audio(AudioCommand::PlaySolo { index: 1, offset_frames: 2000 })]
        ));

        let out = m.handle_input(InputEvent::SoloReset(1), t0 + Duration::from_secs(5));
        assert!(matches!(out.as_slice(), [Output::Audio(AudioCommand::StopSolo)]));
        assert_eq!(m.display_state().solo[1].status, SoloStatus::Play);
    }

    #[test]
    fn failed_mixer_load_stays_dark_until_a_retry_lands() {
        let t0 = Instant::now();
        let mut m = Middle::new(&RoomConfig::default(), samples(2), SR, t0);
        m.handle_input(InputEvent::ChooseMixer, t0);
        m.on_loaded(
            LoadResult {
                index: 0,
                outcome: Err(crate::audio::LoadError::Unsupported("x".into())),
            },
            t0,
        );
        m.on_loaded(ok(1, 1), t0);

        let ds = m.display_state();
        assert_eq!(ds.audible, vec![false, true]);
        assert_eq!(ds.failed, vec![true, false]);

        let out = m.handle_input(InputEvent::RetryFailed, t0);
        assert!(matches!(out.as_slice(), [Output::Load { index: 0, .. }]));

        let out = m.on_loaded(ok(0, 1), t0);
        assert!(matches!(out[0], Output::Audio(AudioCommand::RegisterSample { index: 0, .. })));
        assert!(out.iter().any(|o| matches!(
            o,
            Output::Audio(AudioCommand::SetChannel { index: 0, muted: false, start: true, .. })
        )));
        let ds = m.display_state();
        assert_eq!(ds.audible, vec![true, true]);
        assert_eq!(ds.failed, vec![false, false]);
        assert!(m.handle_input(InputEvent::RetryFailed, t0).is_empty());
    }

    #[test]
    fn stuck_connection_attempt_is_abandoned_and_retried() {
        let t0 = Instant::now();
        let config = RoomConfig::default();
        let mut m = Middle::new(&config, samples(0), SR, t0);
        m.handle_input(InputEvent::ChooseMixer, t0);
        assert!(matches!(m.tick(t0).as_slice(), [Output::Connect]));

        // the transport never reports back
        let gave_up = t0 + config.connect_timeout() * 2;
        assert!(m.tick(gave_up - Duration::from_millis(1)).is_empty());
        assert!(m.tick(gave_up).is_empty());
        assert_eq!(m.display_state().status, "OFFLINE - RECONNECTING...");
        assert!(matches!(
            m.tick(gave_up + config.reconnect_delay()).as_slice(),
            [Output::Connect]
        ));
    }

    #[test]
    fn mixer_keys_do_nothing_on_the_landing_screen() {
        let t0 = Instant::now();
        let mut m = Middle::new(&RoomConfig::default(), samples(2), SR, t0);
        assert!(m.handle_input(InputEvent::MovePage(1), t0).is_empty());
        assert!(m.handle_input(InputEvent::SoloSelect(0), t0).is_empty());
        assert_eq!(m.display_state().screen, Screen::Landing);
    }
}
