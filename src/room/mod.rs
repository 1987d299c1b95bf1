//! The room model: where we are, where everyone else is, and who should be
//! heard from where.

mod channel;
mod page;
mod presence;

pub use channel::Channel;
pub use page::Page;
pub use presence::RemoteParticipant;

use std::collections::BTreeMap;

use crate::audio_api::VoiceGroup;

/// Our own channel `channel` plays on `page` iff we're at the hub (everything
/// plays) or it's this node's channel.
pub fn local_audible(page: Page, channel: usize) -> bool {
    page.is_hub() || page.node_channel() == Some(channel)
}

/// Whether a remote user's channel `channel` reaches us.
///
/// At the hub we hear everyone: hub users' full blend and node users' own
/// node. Inside a node we only hear users in that same node, and only that
/// node's channel.
pub fn remote_audible(local: Page, remote: Page, channel: usize) -> bool {
    let channel_page = Page::for_channel(channel);
    if local.is_hub() {
        remote.is_hub() || remote == channel_page
    } else {
        remote == local && channel_page == local
    }
}

#[derive(Debug)]
pub struct RoomState {
    pub my_id: Option<String>,
    pub current_page: Page,
    pub participants: BTreeMap<String, RemoteParticipant>,
    num_samples: usize,
    next_group: u32,
}

impl RoomState {
    pub fn new(num_samples: usize) -> Self {
        Self {
            my_id: None,
            current_page: Page::HUB,
            participants: BTreeMap::new(),
            num_samples,
            next_group: VoiceGroup::LOCAL.0 + 1,
        }
    }

    /// Everyone in the session, us included.
    pub fn total_occupants(&self) -> usize {
        self.participants.len() + 1
    }

    fn alloc_group(&mut self) -> VoiceGroup {
        let group = VoiceGroup(self.next_group);
        self.next_group += 1;
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_audibility_table() {
        for p in 1..=9 {
            let page = Page::wrap(p);
            for i in 0..8usize {
                let expected = p == 1 || p - 2 == i as i64;
                assert_eq!(local_audible(page, i), expected, "page {p} channel {i}");
            }
        }
    }

    #[test]
    fn remote_audibility_table() {
        for l in 1..=9i64 {
            for r in 1..=9i64 {
                for i in 0..8i64 {
                    let expected = (l == 1 && (r == 1 || r == i + 2))
                        || (l != 1 && r == l && i + 2 == l);
                    assert_eq!(
                        remote_audible(Page::wrap(l), Page::wrap(r), i as usize),
                        expected,
                        "L={l} R={r} i={i}"
                    );
                }
            }
        }
    }

    #[test]
    fn node_hears_only_its_own_channel_from_roommates() {
        let node3 = Page::wrap(4);
        let heard: Vec<usize> = (0..8).filter(|&i| remote_audible(node3, node3, i)).collect();
        assert_eq!(heard, vec![2]);
        assert!((0..8).all(|i| !remote_audible(node3, Page::HUB, i)));
    }
}
