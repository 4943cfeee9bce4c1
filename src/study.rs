//! Answer recording, daily statistics and study sessions.

use chrono::{DateTime, SubsecRound, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::db::{CardPatch, Database};
use crate::error::{Error, Result};
use crate::models::{local_date_key, now, AnswerOutcome, Card, DailyStats};

impl Database {
    pub fn record_answer(&mut self, deck_name: &str, front: &str, outcome: AnswerOutcome) -> Result<Card> {
        self.record_answer_at(deck_name, front, outcome, now())
    }

    /// Bumps the card's counter and the deck's stats row for the local day of
    /// `at`. Both writes commit together.
    pub fn record_answer_at(
        &mut self,
        deck_name: &str,
        front: &str,
        outcome: AnswerOutcome,
        at: DateTime<Utc>,
    ) -> Result<Card> {
        let at = at.trunc_subsecs(3);
        let date = local_date_key(&at);

        let card = self.transaction(|t| {
            let mut card = t.get_card(deck_name, front)?.ok_or_else(|| Error::CardNotFound {
                deck: deck_name.to_string(),
                front: front.to_string(),
            })?;

            match outcome {
                AnswerOutcome::Correct => card.correct_count += 1,
                AnswerOutcome::Incorrect => card.incorrect_count += 1,
            }
            card.last_studied_at = Some(at);
            card.updated_at = at;

            t.update_card(
                deck_name,
                front,
                &CardPatch {
                    correct_count: Some(card.correct_count),
                    incorrect_count: Some(card.incorrect_count),
                    last_studied_at: Some(card.last_studied_at),
                    updated_at: Some(at),
                    ..Default::default()
                },
            )?;

            match t.get_daily_stats(deck_name, &date)? {
                Some(mut stats) => {
                    stats.apply(outcome);
                    t.put_daily_stats(&stats)?;
                }
                None => t.add_daily_stats(&DailyStats::first_answer(deck_name, &date, outcome))?,
            }
            Ok(card)
        })?;

        debug!(deck = deck_name, front, outcome = outcome.as_str(), date = %date, "answer recorded");
        Ok(card)
    }

    pub fn get_daily_stats(&self, deck_name: &str) -> Result<Vec<DailyStats>> {
        self.read(|t| t.daily_stats_for_deck(deck_name))
    }

    /// The deck's cards in random order.
    pub fn study_queue(&self, deck_name: &str) -> Result<Vec<Card>> {
        let mut cards = self.get_cards_for_deck(deck_name)?;
        shuffle_cards(&mut cards, &mut rand::thread_rng());
        Ok(cards)
    }
}

pub fn shuffle_cards<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub total: u32,
    pub correct: u32,
    pub percentage: u32,
    pub missed: Vec<Card>,
}

impl SessionResult {
    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }
}

/// One pass over a queue of cards, recording every answer as it is given.
#[derive(Debug, Clone)]
pub struct StudySession {
    deck_name: String,
    queue: Vec<Card>,
    position: usize,
    correct: u32,
    missed: Vec<Card>,
}

impl StudySession {
    pub fn start(db: &Database, deck_name: &str) -> Result<Self> {
        Ok(Self::with_queue(deck_name, db.study_queue(deck_name)?))
    }

    pub fn with_queue(deck_name: &str, queue: Vec<Card>) -> Self {
        Self {
            deck_name: deck_name.to_string(),
            queue,
            position: 0,
            correct: 0,
            missed: Vec::new(),
        }
    }

    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    pub fn current(&self) -> Option<&Card> {
        self.queue.get(self.position)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.queue.len()
    }

    /// (answered, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.position, self.queue.len())
    }

    pub fn answer(&mut self, db: &mut Database, outcome: AnswerOutcome) -> Result<()> {
        let Some(card) = self.queue.get(self.position) else {
            return Err(Error::InvalidInput("study session is already finished".to_string()));
        };

        let updated = db.record_answer(&self.deck_name, &card.front, outcome)?;
        match outcome {
            AnswerOutcome::Correct => self.correct += 1,
            AnswerOutcome::Incorrect => self.missed.push(updated.clone()),
        }
        self.queue[self.position] = updated;
        self.position += 1;
        Ok(())
    }

    pub fn result(&self) -> SessionResult {
        let total = self.position as u32;
        let percentage = if total == 0 {
            0
        } else {
            (self.correct as f64 / total as f64 * 100.0).round() as u32
        };
        SessionResult {
            total,
            correct: self.correct,
            percentage,
            missed: self.missed.clone(),
        }
    }
}
