mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::db::Database;
use crate::models::{AnswerOutcome, DailyStats, DeckSummary};
use crate::study::{SessionResult, StudySession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Decks,
    Study,
    Result,
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    db: Database,
    pub view: View,
    pub decks: StatefulList<DeckSummary>,
    // daily stats of the highlighted deck
    pub daily_stats: Vec<DailyStats>,
    pub session: Option<StudySession>,
    pub show_back: bool,
    pub result: Option<SessionResult>,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self, Box<dyn std::error::Error>> {
        let decks = db.get_deck_summaries()?;
        let mut app = Self {
            db,
            view: View::Decks,
            decks: StatefulList::with_items(decks),
            daily_stats: Vec::new(),
            session: None,
            show_back: false,
            result: None,
            status: None,
            should_quit: false,
        };
        app.load_daily_stats()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let selected = self.decks.selected_item().map(|d| d.name.clone());
        self.decks = StatefulList::with_items(self.db.get_deck_summaries()?);
        if let Some(name) = selected {
            if let Some(i) = self.decks.items.iter().position(|d| d.name == name) {
                self.decks.selected = Some(i);
            }
        }
        self.load_daily_stats()
    }

    fn load_daily_stats(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.daily_stats = match self.decks.selected_item() {
            Some(deck) => self.db.get_daily_stats(&deck.name)?,
            None => Vec::new(),
        };
        Ok(())
    }

    /// Starts a shuffled pass over `deck_name`. An empty deck leaves the view unchanged.
    pub fn start_session(&mut self, deck_name: &str) -> Result<(), Box<dyn std::error::Error>> {
        let session = StudySession::start(&self.db, deck_name)?;
        if session.is_finished() {
            self.status = Some(format!("Deck '{}' has no cards", deck_name));
            return Ok(());
        }
        debug!(deck = deck_name, cards = session.progress().1, "study session started");
        self.session = Some(session);
        self.show_back = false;
        self.result = None;
        self.status = None;
        self.view = View::Study;
        Ok(())
    }

    fn start_selected(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(name) = self.decks.selected_item().map(|d| d.name.clone()) {
            self.start_session(&name)?;
        }
        Ok(())
    }

    fn answer(&mut self, outcome: AnswerOutcome) -> Result<(), Box<dyn std::error::Error>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.answer(&mut self.db, outcome)?;
        self.show_back = false;
        if session.is_finished() {
            self.finish_session();
        }
        Ok(())
    }

    fn finish_session(&mut self) {
        if let Some(session) = &self.session {
            let result = session.result();
            debug!(
                deck = session.deck_name(),
                total = result.total,
                correct = result.correct,
                "study session finished"
            );
            self.result = Some(result);
        }
        self.view = View::Result;
    }

    fn back_to_decks(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.session = None;
        self.result = None;
        self.show_back = false;
        self.view = View::Decks;
        self.refresh_data()
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if key == KeyCode::Char('q') {
            self.should_quit = true;
            return Ok(());
        }

        match self.view {
            View::Decks => match key {
                KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.refresh_data()?;
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    self.decks.next();
                    self.load_daily_stats()?;
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.decks.previous();
                    self.load_daily_stats()?;
                }
                KeyCode::Char('g') => {
                    self.decks.first();
                    self.load_daily_stats()?;
                }
                KeyCode::Char('G') => {
                    self.decks.last();
                    self.load_daily_stats()?;
                }
                KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => self.start_selected()?,
                _ => {}
            },

            View::Study => match key {
                KeyCode::Char(' ') | KeyCode::Enter => self.show_back = !self.show_back,
                KeyCode::Char('y') if self.show_back => self.answer(AnswerOutcome::Correct)?,
                KeyCode::Char('n') if self.show_back => self.answer(AnswerOutcome::Incorrect)?,
                // stop early; show what was answered so far
                KeyCode::Esc | KeyCode::Char('h') => {
                    let answered = self.session.as_ref().map_or(0, |s| s.progress().0);
                    if answered > 0 {
                        self.finish_session();
                    } else {
                        self.back_to_decks()?;
                    }
                }
                _ => {}
            },

            View::Result => match key {
                KeyCode::Char('r') | KeyCode::Enter => {
                    if let Some(name) = self.session.as_ref().map(|s| s.deck_name().to_string()) {
                        self.start_session(&name)?;
                    }
                }
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => self.back_to_decks()?,
                _ => {}
            },
        }
        Ok(())
    }
}

/// Opens the terminal UI; with `deck` set, a session on that deck starts immediately.
pub fn run(db: Database, deck: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(db)?;
    if let Some(name) = deck {
        if app.db.get_deck(name)?.is_none() {
            return Err(crate::error::Error::DeckNotFound(name.to_string()).into());
        }
        app.start_session(name)?;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers)?;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
