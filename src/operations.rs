use tracing::{info, warn};

use crate::db::{CardPatch, Database};
use crate::error::{Error, Result};
use crate::models::{
    normalize_difficulty, now, Card, CardEdit, DailyStats, Deck, DeckSummary, DeleteSummary,
    MIN_DIFFICULTY,
};
use crate::tsv;

impl Database {
    // Deck operations
    pub fn create_deck(&mut self, name: &str, description: Option<&str>) -> Result<Deck> {
        if name.is_empty() {
            return Err(Error::InvalidInput("deck name must not be empty".to_string()));
        }
        let ts = now();
        let deck = Deck {
            name: name.to_string(),
            description: description.unwrap_or_default().to_string(),
            created_at: ts,
            updated_at: ts,
        };
        self.transaction(|t| t.add_deck(&deck))?;
        info!(deck = %deck.name, "deck created");
        Ok(deck)
    }

    pub fn get_deck(&self, name: &str) -> Result<Option<Deck>> {
        self.read(|t| t.get_deck(name))
    }

    pub fn get_all_decks(&self) -> Result<Vec<Deck>> {
        self.read(|t| t.all_decks())
    }

    pub fn get_deck_summaries(&self) -> Result<Vec<DeckSummary>> {
        self.read(|t| t.deck_summaries())
    }

    pub fn update_deck_description(&mut self, name: &str, description: &str) -> Result<()> {
        let rows = self.transaction(|t| t.update_deck_description(name, description, &now()))?;
        if rows == 0 {
            return Err(Error::DeckNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Re-keys a deck and everything it owns in one transaction.
    pub fn rename_deck(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(Error::InvalidInput("deck name must not be empty".to_string()));
        }

        let (cards, stats) = self.transaction(|t| {
            let deck = t
                .get_deck(old_name)?
                .ok_or_else(|| Error::DeckNotFound(old_name.to_string()))?;
            if old_name == new_name {
                return Ok((0, 0));
            }

            t.add_deck(&Deck {
                name: new_name.to_string(),
                updated_at: now(),
                ..deck
            })?;
            t.delete_deck(old_name)?;

            let cards = t.cards_for_deck(old_name)?;
            for card in &cards {
                t.add_card(&Card {
                    deck_name: new_name.to_string(),
                    ..card.clone()
                })?;
            }
            t.delete_cards_for_deck(old_name)?;

            let stats = t.daily_stats_for_deck(old_name)?;
            for day in &stats {
                t.add_daily_stats(&DailyStats {
                    deck_name: new_name.to_string(),
                    ..day.clone()
                })?;
            }
            t.delete_daily_stats_for_deck(old_name)?;

            Ok((cards.len(), stats.len()))
        })?;

        info!(from = old_name, to = new_name, cards, stats, "deck renamed");
        Ok(())
    }

    /// Deletes a deck with its cards and daily stats. A missing deck is not an error.
    pub fn delete_deck(&mut self, name: &str) -> Result<DeleteSummary> {
        let (deck_rows, summary) = self.transaction(|t| {
            let deck_rows = t.delete_deck(name)?;
            let cards = t.delete_cards_for_deck(name)?;
            let daily_stats = t.delete_daily_stats_for_deck(name)?;
            Ok((
                deck_rows,
                DeleteSummary {
                    cards: cards as u32,
                    daily_stats: daily_stats as u32,
                },
            ))
        })?;

        if deck_rows == 0 {
            warn!(deck = name, "delete requested for missing deck");
        }
        info!(
            deck = name,
            cards = summary.cards,
            daily_stats = summary.daily_stats,
            "deck deleted"
        );
        Ok(summary)
    }

    pub fn export_deck(&self, name: &str) -> Result<String> {
        let cards = self.get_cards_for_deck(name)?;
        tsv::generate(&cards)
    }

    // Card operations
    pub fn add_card(
        &mut self,
        deck_name: &str,
        front: &str,
        back: &str,
        tags: &[String],
        difficulty: Option<u8>,
    ) -> Result<Card> {
        let card = Card {
            tags: tags.to_vec(),
            difficulty: difficulty
                .map(|d| normalize_difficulty(d as i64))
                .unwrap_or(MIN_DIFFICULTY),
            ..Card::new(deck_name, front, back, now())
        };
        self.transaction(|t| t.add_card(&card))?;
        Ok(card)
    }

    pub fn get_card(&self, deck_name: &str, front: &str) -> Result<Option<Card>> {
        self.read(|t| t.get_card(deck_name, front))
    }

    pub fn get_cards_for_deck(&self, deck_name: &str) -> Result<Vec<Card>> {
        self.read(|t| t.cards_for_deck(deck_name))
    }

    /// Updates the named fields and refreshes `updated_at`.
    pub fn update_card(&mut self, deck_name: &str, front: &str, edit: &CardEdit) -> Result<()> {
        let patch = CardPatch {
            back: edit.back.clone(),
            tags: edit.tags.clone(),
            difficulty: edit.difficulty.map(|d| normalize_difficulty(d as i64)),
            updated_at: Some(now()),
            ..Default::default()
        };
        let rows = self.transaction(|t| t.update_card(deck_name, front, &patch))?;
        if rows == 0 {
            return Err(Error::CardNotFound {
                deck: deck_name.to_string(),
                front: front.to_string(),
            });
        }
        Ok(())
    }

    /// Moves a card to a new front. Overwrites any card already at `new_front`;
    /// callers check for collisions first.
    pub fn update_card_front(&mut self, deck_name: &str, old_front: &str, new_front: &str) -> Result<()> {
        self.transaction(|t| {
            let card = t.get_card(deck_name, old_front)?.ok_or_else(|| Error::CardNotFound {
                deck: deck_name.to_string(),
                front: old_front.to_string(),
            })?;
            if old_front == new_front {
                return Ok(());
            }
            t.put_card(&Card {
                front: new_front.to_string(),
                updated_at: now(),
                ..card
            })?;
            t.delete_card(deck_name, old_front)?;
            Ok(())
        })
    }

    pub fn delete_card(&mut self, deck_name: &str, front: &str) -> Result<bool> {
        let rows = self.transaction(|t| t.delete_card(deck_name, front))?;
        Ok(rows > 0)
    }
}
