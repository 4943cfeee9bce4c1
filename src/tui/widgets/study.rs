use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(session) = &app.session else {
        let block = Block::default().borders(Borders::ALL).title(" Study ");
        f.render_widget(Paragraph::new("No study session").block(block), area);
        return;
    };
    let Some(card) = session.current() else {
        let block = Block::default().borders(Borders::ALL).title(" Study ");
        f.render_widget(Paragraph::new("Session finished").block(block), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Card
        ])
        .split(area);

    let (answered, total) = session.progress();
    let ratio = if total == 0 {
        0.0
    } else {
        answered as f64 / total as f64
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", session.deck_name())),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{}/{}", answered + 1, total));
    f.render_widget(gauge, chunks[0]);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            card.front.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if app.show_back {
        lines.push(Line::from(Span::styled(
            "─".repeat(20),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            card.back.as_str(),
            Style::default().fg(Color::Yellow),
        )));
        if !card.tags.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                card.tags.join(", "),
                Style::default().fg(Color::Cyan),
            )));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "press space to flip",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(if app.show_back { " Back " } else { " Front " })
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, chunks[1]);
}
