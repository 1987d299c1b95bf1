use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use super::mode::TuiState;
use crate::shared::{InputEvent, Screen};

// poll for input from the terminal and resolve keys into semantic
// InputEvents for the current screen
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(vec![InputEvent::Quit]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    if code == KeyCode::Esc {
        return vec![InputEvent::Quit];
    }
    match ts.screen {
        Screen::Landing => match code {
            KeyCode::Char('1' | 'm') => vec![InputEvent::ChooseMixer],
            KeyCode::Char('2' | 's') => vec![InputEvent::ChooseSolo],
            _ => vec![],
        },
        Screen::Mixer => match code {
            KeyCode::Left | KeyCode::Char('h') => vec![InputEvent::MovePage(-1)],
            KeyCode::Right | KeyCode::Char('l') => vec![InputEvent::MovePage(1)],
            KeyCode::Char('r') => vec![InputEvent::RetryFailed],
            _ => vec![],
        },
        Screen::Solo => resolve_solo(code, ts),
    }
}

fn resolve_solo(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            ts.move_cursor(-1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ts.move_cursor(1);
            vec![]
        }
        KeyCode::Enter | KeyCode::Char(' ') if ts.num_samples > 0 => {
            vec![InputEvent::SoloSelect(ts.cursor as u8)]
        }
        KeyCode::Char('x') | KeyCode::Backspace if ts.num_samples > 0 => {
            vec![InputEvent::SoloReset(ts.cursor as u8)]
        }
        // number keys jump straight to a sample
        KeyCode::Char(c @ '1'..='8') => {
            let idx = c as usize - '1' as usize;
            if idx < ts.num_samples {
                ts.cursor = idx;
                vec![InputEvent::SoloSelect(idx as u8)]
            } else {
                vec![]
            }
        }
        _ => vec![],
    }
}
