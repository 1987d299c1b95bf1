// Types shared between the middle layer and the TUI.
//
// Keys, resolved into InputEvents by tui::input:
//
// Landing:
//   1 / m         //  ChooseMixer (networked room)
//   2 / s         //  ChooseSolo  (solo listening)
//
// Mixer:
//   Left / h      //  MovePage(-1)
//   Right / l     //  MovePage(1)
//   r             //  RetryFailed, reload samples that didn't decode
//
// Solo:
//   1..8          //  SoloSelect(n-1), play / pause / resume that sample
//   Up / Down     //  move the cursor
//   Enter / Space //  SoloSelect(cursor)
//   x             //  SoloReset(cursor)
//
// Quit:
//   Esc / Ctrl-C  //  Quit
//
// Same split as always: the middle layer owns every bit of room and playback
// state, and the TUI just draws the DisplayState it's handed each frame.

/// Nodes are pages 2..=9, one per sample, so the registry never holds more than this.
pub const NUM_NODES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Landing,
    Mixer,
    Solo,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // landing
    ChooseMixer,
    ChooseSolo,

    // mixer
    MovePage(i64),
    RetryFailed,

    // solo, resolved against the tui cursor
    SoloSelect(u8),
    SoloReset(u8),

    Quit,
}

/// Label on a solo sample's button; it names what a press will do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoloStatus {
    Play,
    Pause,
    Resume,
    Buffering,
    Retry,
}

impl SoloStatus {
    pub fn label(self) -> &'static str {
        match self {
            SoloStatus::Play => "PLAY",
            SoloStatus::Pause => "PAUSE",
            SoloStatus::Resume => "RESUME",
            SoloStatus::Buffering => "BUFFERING",
            SoloStatus::Retry => "TAP TO RETRY",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoloRow {
    pub name: String,
    pub status: SoloStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    pub label: String,
    pub here: bool, // same page as us; "YOU" is always here
}

#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    pub screen: Screen,
    pub status: String,
    pub page_title: String, // "THE HUB" / "NODE n"
    pub room_label: String, // "NETWORK HUB" / "NODE n"
    pub occupants_here: usize,
    pub occupants: Vec<Occupant>,
    pub current_node: Option<usize>, // None at the hub
    pub audible: Vec<bool>, // local channels, for the node strip
    pub failed: Vec<bool>,  // mixer samples that didn't load
    pub solo: Vec<SoloRow>,
}
