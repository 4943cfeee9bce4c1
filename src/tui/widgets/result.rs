use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::decks::accuracy_color;
use super::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(result) = &app.result else {
        let block = Block::default().borders(Borders::ALL).title(" Result ");
        f.render_widget(Paragraph::new("No finished session").block(block), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Score
            Constraint::Min(0),    // Missed cards
        ])
        .split(area);

    let score = vec![
        Line::from(vec![
            Span::styled("Score: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}%", result.percentage),
                Style::default()
                    .fg(accuracy_color(result.percentage as f64))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Correct: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", result.correct),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  "),
            Span::styled("Incorrect: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", result.incorrect()),
                Style::default().fg(Color::Red),
            ),
            Span::raw("  "),
            Span::styled("Total: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", result.total),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let title = app
        .session
        .as_ref()
        .map(|s| format!(" {} ", s.deck_name()))
        .unwrap_or_else(|| " Result ".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(Paragraph::new(score).block(block), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Missed ({}) ", result.missed.len()))
        .title_style(Style::default().fg(Color::Red));

    if result.missed.is_empty() {
        let paragraph = Paragraph::new("Every card answered correctly!")
            .style(Style::default().fg(Color::Green))
            .block(block);
        f.render_widget(paragraph, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = result
        .missed
        .iter()
        .map(|card| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<30}", truncate(&card.front, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(truncate(&card.back, 40), Style::default().fg(Color::Yellow)),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(block), chunks[1]);
}
