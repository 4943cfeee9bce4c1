use chrono::{DateTime, Local, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub deck_name: String,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
    pub difficulty: u8,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub last_studied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(deck_name: &str, front: &str, back: &str, now: DateTime<Utc>) -> Self {
        Self {
            deck_name: deck_name.to_string(),
            front: front.to_string(),
            back: back.to_string(),
            tags: Vec::new(),
            difficulty: MIN_DIFFICULTY,
            correct_count: 0,
            incorrect_count: 0,
            last_studied_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn times_studied(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.times_studied();
        if total == 0 {
            0.0
        } else {
            (self.correct_count as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub deck_name: String,
    // YYYY-MM-DD in the local timezone
    pub date: String,
    pub studied_count: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
}

impl DailyStats {
    pub fn first_answer(deck_name: &str, date: &str, outcome: AnswerOutcome) -> Self {
        let mut stats = Self {
            deck_name: deck_name.to_string(),
            date: date.to_string(),
            studied_count: 0,
            correct_count: 0,
            incorrect_count: 0,
        };
        stats.apply(outcome);
        stats
    }

    pub fn apply(&mut self, outcome: AnswerOutcome) {
        self.studied_count += 1;
        match outcome {
            AnswerOutcome::Correct => self.correct_count += 1,
            AnswerOutcome::Incorrect => self.incorrect_count += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub name: String,
    pub description: String,
    pub card_count: u32,
    pub last_studied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// One row of tabular input, before it is bound to a deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCard {
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
    pub difficulty: u8,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub last_studied_at: Option<DateTime<Utc>>,
}

impl ParsedCard {
    pub fn new(front: &str, back: &str) -> Self {
        Self {
            front: front.to_string(),
            back: back.to_string(),
            tags: Vec::new(),
            difficulty: MIN_DIFFICULTY,
            correct_count: 0,
            incorrect_count: 0,
            last_studied_at: None,
        }
    }

    pub fn has_study_data(&self) -> bool {
        self.correct_count != 0 || self.incorrect_count != 0 || self.last_studied_at.is_some()
    }
}

impl From<&Card> for ParsedCard {
    fn from(card: &Card) -> Self {
        Self {
            front: card.front.clone(),
            back: card.back.clone(),
            tags: card.tags.clone(),
            difficulty: card.difficulty,
            correct_count: card.correct_count,
            incorrect_count: card.incorrect_count,
            last_studied_at: card.last_studied_at,
        }
    }
}

// User-editable card fields; None leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardEdit {
    pub back: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<u8>,
}

impl CardEdit {
    pub fn is_empty(&self) -> bool {
        self.back.is_none() && self.tags.is_none() && self.difficulty.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
}

impl AnswerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOutcome::Correct => "correct",
            AnswerOutcome::Incorrect => "incorrect",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "correct" | "c" | "yes" | "y" | "right" | "1" => Some(AnswerOutcome::Correct),
            "incorrect" | "i" | "no" | "n" | "wrong" | "0" => Some(AnswerOutcome::Incorrect),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub added: u32,
    pub updated: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub cards: u32,
    pub daily_stats: u32,
}

/// Map any integer onto the 1-5 difficulty scale; out of range becomes 1.
pub fn normalize_difficulty(value: i64) -> u8 {
    if (MIN_DIFFICULTY as i64..=MAX_DIFFICULTY as i64).contains(&value) {
        value as u8
    } else {
        MIN_DIFFICULTY
    }
}

// Timestamps are kept at millisecond precision so they survive the TSV format
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn local_date_key(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
