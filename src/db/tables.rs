use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::error::{is_unique_violation, Error, Result};
use crate::models::{format_timestamp, parse_timestamp, Card, DailyStats, Deck, DeckSummary};

const CARD_COLUMNS: &str = "deck_name, front, back, tags, difficulty, correct_count, \
                            incorrect_count, last_studied_at, created_at, updated_at";

/// Store-level partial card update. Unlike `CardEdit` this can touch the
/// study counters; only the recorder and the import engine build one.
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub back: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<u8>,
    pub correct_count: Option<u32>,
    pub incorrect_count: Option<u32>,
    pub last_studied_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Table primitives bound to one connection or open transaction.
pub struct Tables<'a> {
    conn: &'a Connection,
}

impl<'a> Tables<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // Deck rows
    pub fn get_deck(&self, name: &str) -> Result<Option<Deck>> {
        let deck = self
            .conn
            .query_row(
                "SELECT name, description, created_at, updated_at FROM decks WHERE name = ?1",
                params![name],
                deck_from_row,
            )
            .optional()?;
        Ok(deck)
    }

    pub fn all_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, description, created_at, updated_at FROM decks ORDER BY name",
        )?;
        let rows = stmt.query_map([], deck_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_deck(&self, deck: &Deck) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO decks (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    deck.name,
                    deck.description,
                    format_timestamp(&deck.created_at),
                    format_timestamp(&deck.updated_at)
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DeckExists(deck.name.clone())
                } else {
                    e.into()
                }
            })?;
        debug!(deck = %deck.name, "deck added");
        Ok(())
    }

    pub fn put_deck(&self, deck: &Deck) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO decks (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                deck.name,
                deck.description,
                format_timestamp(&deck.created_at),
                format_timestamp(&deck.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn update_deck_description(
        &self,
        name: &str,
        description: &str,
        updated_at: &DateTime<Utc>,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE decks SET description = ?1, updated_at = ?2 WHERE name = ?3",
            params![description, format_timestamp(updated_at), name],
        )?;
        Ok(rows)
    }

    pub fn delete_deck(&self, name: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM decks WHERE name = ?1", params![name])?;
        Ok(rows)
    }

    pub fn deck_summaries(&self) -> Result<Vec<DeckSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.name, d.description, d.created_at, d.updated_at,
                   COUNT(c.front), MAX(c.last_studied_at)
            FROM decks d
            LEFT JOIN cards c ON c.deck_name = d.name
            GROUP BY d.name
            ORDER BY d.name
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DeckSummary {
                name: row.get(0)?,
                description: row.get(1)?,
                created_at: timestamp_column(row, 2)?,
                updated_at: timestamp_column(row, 3)?,
                card_count: row.get(4)?,
                last_studied_at: optional_timestamp_column(row, 5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Card rows
    pub fn get_card(&self, deck_name: &str, front: &str) -> Result<Option<Card>> {
        let card = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM cards WHERE deck_name = ?1 AND front = ?2",
                    CARD_COLUMNS
                ),
                params![deck_name, front],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    pub fn cards_for_deck(&self, deck_name: &str) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cards WHERE deck_name = ?1 ORDER BY front",
            CARD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![deck_name], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_card(&self, card: &Card) -> Result<()> {
        self.write_card("INSERT", card).map_err(|e| match e {
            Error::Database(ref inner) if is_unique_violation(inner) => Error::CardExists {
                deck: card.deck_name.clone(),
                front: card.front.clone(),
            },
            other => other,
        })
    }

    pub fn put_card(&self, card: &Card) -> Result<()> {
        self.write_card("INSERT OR REPLACE", card)
    }

    fn write_card(&self, verb: &str, card: &Card) -> Result<()> {
        self.conn.execute(
            &format!(
                "{} INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                verb, CARD_COLUMNS
            ),
            params![
                card.deck_name,
                card.front,
                card.back,
                serde_json::to_string(&card.tags)?,
                card.difficulty,
                card.correct_count,
                card.incorrect_count,
                card.last_studied_at.as_ref().map(format_timestamp),
                format_timestamp(&card.created_at),
                format_timestamp(&card.updated_at)
            ],
        )?;
        Ok(())
    }

    /// Applies the set fields of `patch`; returns the number of rows matched.
    pub fn update_card(&self, deck_name: &str, front: &str, patch: &CardPatch) -> Result<usize> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(back) = &patch.back {
            sets.push("back");
            values.push(Box::new(back.clone()));
        }
        if let Some(tags) = &patch.tags {
            sets.push("tags");
            values.push(Box::new(serde_json::to_string(tags)?));
        }
        if let Some(difficulty) = patch.difficulty {
            sets.push("difficulty");
            values.push(Box::new(difficulty));
        }
        if let Some(correct) = patch.correct_count {
            sets.push("correct_count");
            values.push(Box::new(correct));
        }
        if let Some(incorrect) = patch.incorrect_count {
            sets.push("incorrect_count");
            values.push(Box::new(incorrect));
        }
        if let Some(last) = &patch.last_studied_at {
            sets.push("last_studied_at");
            values.push(Box::new(last.as_ref().map(format_timestamp)));
        }
        if let Some(updated) = &patch.updated_at {
            sets.push("updated_at");
            values.push(Box::new(format_timestamp(updated)));
        }

        if sets.is_empty() {
            return Ok(self.get_card(deck_name, front)?.map_or(0, |_| 1));
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        let query = format!(
            "UPDATE cards SET {} WHERE deck_name = ?{} AND front = ?{}",
            assignments.join(", "),
            sets.len() + 1,
            sets.len() + 2
        );
        values.push(Box::new(deck_name.to_string()));
        values.push(Box::new(front.to_string()));

        let params_refs: Vec<&dyn ToSql> = values.iter().map(|b| b.as_ref()).collect();
        let rows = self.conn.execute(&query, params_refs.as_slice())?;
        Ok(rows)
    }

    pub fn delete_card(&self, deck_name: &str, front: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM cards WHERE deck_name = ?1 AND front = ?2",
            params![deck_name, front],
        )?;
        Ok(rows)
    }

    pub fn delete_cards_for_deck(&self, deck_name: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM cards WHERE deck_name = ?1", params![deck_name])?;
        Ok(rows)
    }

    // Daily stats rows
    pub fn get_daily_stats(&self, deck_name: &str, date: &str) -> Result<Option<DailyStats>> {
        let stats = self
            .conn
            .query_row(
                r#"
                SELECT deck_name, date, studied_count, correct_count, incorrect_count
                FROM daily_stats
                WHERE deck_name = ?1 AND date = ?2
                "#,
                params![deck_name, date],
                daily_stats_from_row,
            )
            .optional()?;
        Ok(stats)
    }

    pub fn daily_stats_for_deck(&self, deck_name: &str) -> Result<Vec<DailyStats>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT deck_name, date, studied_count, correct_count, incorrect_count
            FROM daily_stats
            WHERE deck_name = ?1
            ORDER BY date
            "#,
        )?;
        let rows = stmt.query_map(params![deck_name], daily_stats_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_daily_stats(&self, stats: &DailyStats) -> Result<()> {
        self.write_daily_stats("INSERT", stats).map_err(|e| match e {
            Error::Database(ref inner) if is_unique_violation(inner) => Error::DailyStatsExists {
                deck: stats.deck_name.clone(),
                date: stats.date.clone(),
            },
            other => other,
        })
    }

    pub fn put_daily_stats(&self, stats: &DailyStats) -> Result<()> {
        self.write_daily_stats("INSERT OR REPLACE", stats)
    }

    fn write_daily_stats(&self, verb: &str, stats: &DailyStats) -> Result<()> {
        self.conn.execute(
            &format!(
                "{} INTO daily_stats (deck_name, date, studied_count, correct_count, incorrect_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                verb
            ),
            params![
                stats.deck_name,
                stats.date,
                stats.studied_count,
                stats.correct_count,
                stats.incorrect_count
            ],
        )?;
        Ok(())
    }

    pub fn delete_daily_stats_for_deck(&self, deck_name: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM daily_stats WHERE deck_name = ?1",
            params![deck_name],
        )?;
        Ok(rows)
    }
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        name: row.get(0)?,
        description: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
        updated_at: timestamp_column(row, 3)?,
    })
}

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    let tags_json: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Card {
        deck_name: row.get(0)?,
        front: row.get(1)?,
        back: row.get(2)?,
        tags,
        difficulty: row.get(4)?,
        correct_count: row.get(5)?,
        incorrect_count: row.get(6)?,
        last_studied_at: optional_timestamp_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn daily_stats_from_row(row: &Row) -> rusqlite::Result<DailyStats> {
    Ok(DailyStats {
        deck_name: row.get(0)?,
        date: row.get(1)?,
        studied_count: row.get(2)?,
        correct_count: row.get(3)?,
        incorrect_count: row.get(4)?,
    })
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn optional_timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(_) => timestamp_column(row, idx).map(Some),
        None => Ok(None),
    }
}
