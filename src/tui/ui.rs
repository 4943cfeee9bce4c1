use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{decks, result, study};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let selected = match app.view {
        View::Decks => 0,
        View::Study => 1,
        View::Result => 2,
    };

    let tabs = Tabs::new(vec!["Decks", "Study", "Result"])
        .block(Block::default().borders(Borders::ALL).title(" Flipnote "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Decks => decks::draw(f, app, area),
        View::Study => study::draw(f, app, area),
        View::Result => result::draw(f, app, area),
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("{}  ", status),
            Style::default().fg(Color::Yellow),
        ));
    }

    match app.view {
        View::Decks => spans.extend(vec![
            key("j/k"),
            Span::raw(" Nav  "),
            key("g/G"),
            Span::raw(" Top/Bot  "),
            key("l/<CR>"),
            Span::raw(" Study  "),
            key("^r"),
            Span::raw(" Refresh  "),
        ]),
        View::Study if app.show_back => spans.extend(vec![
            key("y"),
            Span::raw(" Correct  "),
            key("n"),
            Span::raw(" Incorrect  "),
            key("<Space>"),
            Span::raw(" Hide  "),
            key("h/<Esc>"),
            Span::raw(" Stop  "),
        ]),
        View::Study => spans.extend(vec![
            key("<Space>"),
            Span::raw(" Flip  "),
            key("h/<Esc>"),
            Span::raw(" Stop  "),
        ]),
        View::Result => spans.extend(vec![
            key("r/<CR>"),
            Span::raw(" Again  "),
            key("h/<Esc>"),
            Span::raw(" Decks  "),
        ]),
    }

    spans.extend(vec![key("q"), Span::raw(" Quit")]);

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(help, area);
}
