use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

// one cell per node; lit when that node's channel is audible for us,
// outlined bold for the node we're standing in, crossed out if its sample failed
pub fn draw_node_strip(
    frame: &mut Frame,
    area: Rect,
    audible: &[bool],
    failed: &[bool],
    current: Option<usize>,
) {
    if audible.is_empty() {
        return;
    }
    let constraints = vec![Constraint::Ratio(1, audible.len() as u32); audible.len()];
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (idx, (cell, lit)) in cells.iter().zip(audible.iter()).enumerate() {
        let broken = failed.get(idx).copied().unwrap_or(false);
        let mut style = if broken {
            Style::default().fg(Color::Red)
        } else if *lit {
            Style::default().fg(Color::Black).bg(Color::Magenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if current == Some(idx) {
            style = style.add_modifier(Modifier::BOLD);
        }
        let block = Block::default().borders(Borders::ALL).border_style(style);
        let text = if broken { "x".to_string() } else { format!("{}", idx + 1) };
        let label = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(style)
            .block(block);
        frame.render_widget(label, *cell);
    }
}
