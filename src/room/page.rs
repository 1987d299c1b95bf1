use std::fmt;

const NUM_PAGES: i64 = 9;

/// A page in the room: 1 is the hub, 2..=9 are nodes 1..=8.
///
/// Always in `[1, 9]`; anything outside wraps around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Page(u8);

impl Page {
    pub const HUB: Page = Page(1);

    /// `((p - 1) mod 9) + 1`, so 0 wraps to 9 and 10 wraps to 1.
    pub fn wrap(p: i64) -> Self {
        Page(((p - 1).rem_euclid(NUM_PAGES) + 1) as u8)
    }

    pub fn step(self, dir: i64) -> Self {
        Page::wrap(self.0 as i64 + dir)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_hub(self) -> bool {
        self == Page::HUB
    }

    /// The sample index a node maps to (page - 2); the hub has none.
    pub fn node_channel(self) -> Option<usize> {
        if self.is_hub() {
            None
        } else {
            Some(self.0 as usize - 2)
        }
    }

    /// Page whose node plays `channel`.
    pub fn for_channel(channel: usize) -> Self {
        Page::wrap(channel as i64 + 2)
    }

    pub fn title(self) -> String {
        match self.node_channel() {
            None => "THE HUB".to_string(),
            Some(i) => format!("NODE {}", i + 1),
        }
    }

    pub fn room_label(self) -> String {
        match self.node_channel() {
            None => "NETWORK HUB".to_string(),
            Some(i) => format!("NODE {}", i + 1),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::HUB
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
