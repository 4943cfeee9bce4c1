use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::truncate;
use crate::tui::App;

// days of history shown next to the deck list
const RECENT_DAYS: usize = 7;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_list(f, app, chunks[0]);
    draw_stats(f, app, chunks[1]);
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Decks ({}) ", app.decks.items.len()))
        .title_style(Style::default().fg(Color::Cyan));

    if app.decks.items.is_empty() {
        let paragraph = Paragraph::new("No decks yet. Create one with `flipnote deck create`.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .decks
        .items
        .iter()
        .map(|deck| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<28}", truncate(&deck.name, 26)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>5} cards  ", deck.card_count),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format_last_studied(deck.last_studied_at.as_ref()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.decks.selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let Some(deck) = app.decks.selected_item() else {
        let block = Block::default().borders(Borders::ALL).title(" Activity ");
        f.render_widget(Paragraph::new("No deck selected").block(block), area);
        return;
    };

    let mut lines = Vec::new();
    if !deck.description.is_empty() {
        lines.push(Line::from(Span::styled(
            deck.description.as_str(),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(""));
    }

    if app.daily_stats.is_empty() {
        lines.push(Line::from(Span::styled(
            "Not studied yet",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for day in app.daily_stats.iter().rev().take(RECENT_DAYS) {
            let accuracy = if day.studied_count == 0 {
                0.0
            } else {
                day.correct_count as f64 / day.studied_count as f64 * 100.0
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{}  ", day.date), Style::default().fg(Color::White)),
                Span::styled(
                    format!("{:>3} studied  ", day.studied_count),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:.0}%", accuracy),
                    Style::default().fg(accuracy_color(accuracy)),
                ),
            ]));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", deck.name))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

pub fn accuracy_color(accuracy: f64) -> Color {
    if accuracy >= 70.0 {
        Color::Green
    } else if accuracy >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn format_last_studied(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&Local).format("%b %d").to_string(),
        None => "never".to_string(),
    }
}
