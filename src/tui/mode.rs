use crate::shared::Screen;

// state local to the tui: which screen we're drawing and where the solo
// cursor sits. screen and sample count are synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub screen: Screen,
    pub num_samples: usize,
    pub cursor: usize,
}

impl TuiState {
    pub fn move_cursor(&mut self, delta: i64) {
        if self.num_samples == 0 {
            self.cursor = 0;
            return;
        }
        let n = self.num_samples as i64;
        self.cursor = (self.cursor as i64 + delta).rem_euclid(n) as usize;
    }
}
