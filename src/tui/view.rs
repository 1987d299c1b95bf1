use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::grid::draw_node_strip;
use crate::shared::{DisplayState, Screen, SoloStatus};

const ACCENT: Color = Color::Magenta;

/// Draws one frame. Returns the names of any targets that didn't fit and
/// were skipped; the caller decides what to log.
pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, cursor: usize) -> Vec<&'static str> {
    let mut skipped = Vec::new();
    match state.screen {
        Screen::Landing => draw_landing(frame, area, &mut skipped),
        Screen::Mixer => draw_mixer(frame, area, state, &mut skipped),
        Screen::Solo => draw_solo(frame, area, state, cursor, &mut skipped),
    }
    skipped
}

// a target with no room to draw is skipped, not squeezed
fn fits(area: Rect, min_w: u16, min_h: u16, name: &'static str, skipped: &mut Vec<&'static str>) -> bool {
    if area.width < min_w || area.height < min_h {
        skipped.push(name);
        return false;
    }
    true
}

fn draw_landing(frame: &mut Frame, area: Rect, skipped: &mut Vec<&'static str>) {
    if !fits(area, 30, 8, "landing", skipped) {
        return;
    }
    let text = vec![
        Line::from(Span::styled("LOOPROOM", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("[1] NETWORK MIXER   listen together"),
        Line::from("[2] SOLO LISTENING  one sample at a time"),
        Line::from(""),
        Line::from(Span::styled("esc to quit", Style::default().fg(Color::DarkGray))),
    ];
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(ACCENT)));
    frame.render_widget(p, area);
}

fn draw_mixer(frame: &mut Frame, area: Rect, state: &DisplayState, skipped: &mut Vec<&'static str>) {
    if !fits(area, 24, 12, "mixer-page", skipped) {
        return;
    }
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // page title
            Constraint::Length(1), // status
            Constraint::Length(3), // node strip
            Constraint::Min(5),    // user info
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        state.page_title.clone(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, sections[0]);

    let mut status_line = vec![Span::styled(
        format!("{}   <- / -> to move", state.status),
        Style::default().fg(Color::Gray),
    )];
    let failed = state.failed.iter().filter(|&&f| f).count();
    if failed > 0 {
        status_line.push(Span::styled(
            format!("   {failed} FAILED, r TO RETRY"),
            Style::default().fg(Color::Red),
        ));
    }
    let status = Paragraph::new(Line::from(status_line)).alignment(Alignment::Center);
    frame.render_widget(status, sections[1]);

    draw_node_strip(frame, sections[2], &state.audible, &state.failed, state.current_node);

    draw_user_info(frame, sections[3], state, skipped);
}

fn draw_user_info(frame: &mut Frame, area: Rect, state: &DisplayState, skipped: &mut Vec<&'static str>) {
    if !fits(area, 16, 4, "user-info", skipped) {
        return;
    }
    let mut pills: Vec<Span> = Vec::new();
    for occ in &state.occupants {
        let style = if occ.here {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        pills.push(Span::styled(format!("[{}]", occ.label), style));
        pills.push(Span::raw(" "));
    }
    let text = vec![
        Line::from(Span::styled(
            state.room_label.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Occupants: {}", state.occupants_here)),
        Line::from(pills),
    ];
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(ACCENT)));
    frame.render_widget(p, area);
}

fn draw_solo(
    frame: &mut Frame,
    area: Rect,
    state: &DisplayState,
    cursor: usize,
    skipped: &mut Vec<&'static str>,
) {
    if !fits(area, 30, 5, "solo-page", skipped) {
        return;
    }
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let header = Paragraph::new(format!("{}   enter play/pause, x reset", state.status))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(header, sections[0]);

    if state.solo.is_empty() {
        let p = Paragraph::new("no samples found; drop some .wav/.mp3 files in the project dir")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, sections[1]);
        return;
    }

    let lines: Vec<Line> = state
        .solo
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let marker = if i == cursor { ">" } else { " " };
            let status_style = match row.status {
                SoloStatus::Pause => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                SoloStatus::Buffering => Style::default().fg(Color::Yellow),
                SoloStatus::Retry => Style::default().fg(Color::Red),
                SoloStatus::Play | SoloStatus::Resume => Style::default().fg(Color::Gray),
            };
            Line::from(vec![
                Span::raw(format!("{marker} {}. {:<24} ", i + 1, row.name)),
                Span::styled(row.status.label(), status_style),
            ])
        })
        .collect();
    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("SOLO")
            .border_style(Style::default().fg(ACCENT)),
    );
    frame.render_widget(list, sections[1]);
}
