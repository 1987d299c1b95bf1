use std::cmp::Ordering;

use log::{debug, info};

use super::{Channel, Page, RoomState, remote_audible};
use crate::audio_api::{AudioCommand, VoiceGroup};
use crate::shared::Occupant;

/// Someone else in the room, with their own muted-by-default channel set.
#[derive(Clone, Debug)]
pub struct RemoteParticipant {
    pub id: String,
    pub page: Page,
    pub group: VoiceGroup,
    pub channels: Vec<Channel>,
}

impl RemoteParticipant {
    fn remix(&mut self, local: Page) -> Vec<AudioCommand> {
        let (group, page) = (self.group, self.page);
        self.channels
            .iter_mut()
            .filter_map(|ch| {
                let audible = remote_audible(local, page, ch.sample_index);
                ch.set_audible(group, audible)
            })
            .collect()
    }
}

impl RoomState {
    /// A user announced their page (first sighting or a move).
    /// Our own echo is ignored.
    pub fn apply_update(&mut self, id: &str, page: Page) -> Vec<AudioCommand> {
        if self.my_id.as_deref() == Some(id) {
            return vec![];
        }
        let mut cmds = Vec::new();
        if !self.participants.contains_key(id) {
            let group = self.alloc_group();
            info!("user {id} joined on page {page}");
            cmds.push(AudioCommand::CreateGroup { group });
            let channels = (0..self.num_samples).map(Channel::new).collect();
            self.participants.insert(
                id.to_string(),
                RemoteParticipant { id: id.to_string(), page, group, channels },
            );
        }
        let local = self.current_page;
        if let Some(user) = self.participants.get_mut(id) {
            debug!("user {id} -> page {page}");
            user.page = page;
            cmds.extend(user.remix(local));
        }
        cmds
    }

    /// Drops the user and frees their channels in the engine.
    pub fn remove(&mut self, id: &str) -> Vec<AudioCommand> {
        match self.participants.remove(id) {
            Some(user) => {
                info!("user {id} left");
                vec![AudioCommand::ReleaseGroup { group: user.group }]
            }
            None => vec![],
        }
    }

    /// Session ended: everyone remote is gone until the server re-announces them.
    pub fn purge(&mut self) -> Vec<AudioCommand> {
        let cmds = self
            .participants
            .values()
            .map(|u| AudioCommand::ReleaseGroup { group: u.group })
            .collect();
        self.participants.clear();
        cmds
    }

    /// Re-applies the audibility rule to every remote channel, after we moved.
    pub fn remix_remote(&mut self) -> Vec<AudioCommand> {
        let local = self.current_page;
        self.participants
            .values_mut()
            .flat_map(|u| u.remix(local))
            .collect()
    }

    /// Occupants in our current room, us included.
    pub fn occupants_here(&self) -> usize {
        1 + self
            .participants
            .values()
            .filter(|u| u.page == self.current_page)
            .count()
    }

    /// "YOU" first, then every remote user, lit when they share our page.
    pub fn occupants(&self) -> Vec<Occupant> {
        let mut remote: Vec<&RemoteParticipant> = self.participants.values().collect();
        remote.sort_by(|a, b| id_order(&a.id, &b.id));

        let mut out = vec![Occupant { label: "YOU".to_string(), here: true }];
        out.extend(remote.into_iter().map(|u| Occupant {
            label: format!("User {}", u.id),
            here: u.page == self.current_page,
        }));
        out
    }
}

// numeric ids in numeric order, anything else after them by text
fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(room: &RoomState) -> Vec<String> {
        room.occupants().into_iter().map(|o| o.label).collect()
    }

    #[test]
    fn join_then_leave_leaves_only_us() {
        let mut room = RoomState::new(8);
        room.apply_update("5", Page::wrap(3));
        assert_eq!(labels(&room), vec!["YOU", "User 5"]);

        let cmds = room.remove("5");
        assert!(matches!(cmds.as_slice(), [AudioCommand::ReleaseGroup { .. }]));
        assert_eq!(labels(&room), vec!["YOU"]);
        assert_eq!(room.total_occupants(), 1);
    }

    #[test]
    fn new_user_gets_a_group_and_audible_channels() {
        let mut room = RoomState::new(8);
        // we're at the hub, they're in node 1 (page 2) -> only channel 0 plays
        let cmds = room.apply_update("7", Page::wrap(2));
        let group = match cmds.first() {
            Some(AudioCommand::CreateGroup { group }) => *group,
            other => panic!("expected CreateGroup first, got {other:?}"),
        };
        assert_ne!(group, VoiceGroup::LOCAL);
        let started: Vec<usize> = cmds
            .iter()
            .filter_map(|c| match c {
                AudioCommand::SetChannel { index, muted: false, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![0]);

        // moving them to the hub opens up their whole blend, no second group
        let cmds = room.apply_update("7", Page::HUB);
        assert!(!cmds.iter().any(|c| matches!(c, AudioCommand::CreateGroup { .. })));
        let user = &room.participants["7"];
        assert!(user.channels.iter().all(|c| !c.muted));
    }

    #[test]
    fn own_echo_is_ignored() {
        let mut room = RoomState::new(8);
        room.my_id = Some("1".to_string());
        assert!(room.apply_update("1", Page::wrap(4)).is_empty());
        assert!(room.participants.is_empty());
    }

    #[test]
    fn occupant_list_marks_roommates() {
        let mut room = RoomState::new(8);
        room.current_page = Page::wrap(3);
        room.apply_update("12", Page::wrap(3));
        room.apply_update("2", Page::HUB);
        room.apply_update("guest", Page::wrap(3));

        let occ = room.occupants();
        let view: Vec<(&str, bool)> = occ.iter().map(|o| (o.label.as_str(), o.here)).collect();
        assert_eq!(
            view,
            vec![("YOU", true), ("User 2", false), ("User 12", true), ("User guest", true)]
        );
        assert_eq!(room.occupants_here(), 3);
    }

    #[test]
    fn remix_follows_our_moves() {
        let mut room = RoomState::new(8);
        room.apply_update("4", Page::wrap(5)); // node 4, channel 3
        assert!(!room.participants["4"].channels[3].muted);

        room.current_page = Page::wrap(2); // we step into node 1
        room.remix_remote();
        assert!(room.participants["4"].channels.iter().all(|c| c.muted));

        room.current_page = Page::wrap(5); // same node as them
        room.remix_remote();
        let unmuted: Vec<usize> = room.participants["4"]
            .channels
            .iter()
            .filter(|c| !c.muted)
            .map(|c| c.sample_index)
            .collect();
        assert_eq!(unmuted, vec![3]);
    }

    #[test]
    fn purge_releases_every_group() {
        let mut room = RoomState::new(2);
        room.apply_update("a", Page::HUB);
        room.apply_update("b", Page::HUB);
        let cmds = room.purge();
        assert_eq!(cmds.len(), 2);
        assert!(room.participants.is_empty());
        assert_eq!(labels(&room), vec!["YOU"]);
    }
}
