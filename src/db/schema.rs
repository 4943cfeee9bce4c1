use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tsv::split_tags;

/// Latest schema version this build knows how to read and write.
pub const SCHEMA_VERSION: u32 = 3;

type Migration = fn(&Transaction) -> Result<()>;

// Ordered; each step runs once, in its own transaction, gated by user_version
const MIGRATIONS: &[(u32, Migration)] = &[
    (1, create_base_tables),
    (2, add_tag_and_difficulty),
    (3, convert_tag_to_tags),
];

pub fn user_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn migrate(conn: &mut Connection) -> Result<u32> {
    migrate_to(conn, SCHEMA_VERSION)
}

pub(crate) fn migrate_to(conn: &mut Connection, target: u32) -> Result<u32> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(Error::IncompatibleSchema {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    for (version, step) in MIGRATIONS
        .iter()
        .filter(|(v, _)| *v > current && *v <= target)
    {
        let tx = conn.transaction()?;
        step(&tx)?;
        tx.pragma_update(None, "user_version", *version)?;
        tx.commit()?;
        info!(version = *version, "applied schema migration");
    }

    let version = user_version(conn)?;
    debug!(version, "schema up to date");
    Ok(version)
}

fn create_base_tables(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS decks (
            name TEXT NOT NULL PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            deck_name TEXT NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL DEFAULT '',
            correct_count INTEGER NOT NULL DEFAULT 0,
            incorrect_count INTEGER NOT NULL DEFAULT 0,
            last_studied_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (deck_name, front)
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            deck_name TEXT NOT NULL,
            date TEXT NOT NULL,
            studied_count INTEGER NOT NULL DEFAULT 0,
            correct_count INTEGER NOT NULL DEFAULT 0,
            incorrect_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (deck_name, date)
        );

        CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_name);
        CREATE INDEX IF NOT EXISTS idx_daily_stats_deck ON daily_stats(deck_name);
        "#,
    )?;
    Ok(())
}

// Column defaults backfill every existing row
fn add_tag_and_difficulty(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        r#"
        ALTER TABLE cards ADD COLUMN tag TEXT NOT NULL DEFAULT '';
        ALTER TABLE cards ADD COLUMN difficulty INTEGER NOT NULL DEFAULT 1;
        "#,
    )?;
    Ok(())
}

fn convert_tag_to_tags(tx: &Transaction) -> Result<()> {
    tx.execute_batch("ALTER TABLE cards ADD COLUMN tags TEXT NOT NULL DEFAULT '[]';")?;

    let legacy: Vec<(String, String, String)> = {
        let mut stmt = tx.prepare("SELECT deck_name, front, tag FROM cards WHERE tag <> ''")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (deck_name, front, tag) in &legacy {
        let tags = serde_json::to_string(&split_tags(tag))?;
        tx.execute(
            "UPDATE cards SET tags = ?1 WHERE deck_name = ?2 AND front = ?3",
            params![tags, deck_name, front],
        )?;
    }
    debug!(cards = legacy.len(), "converted legacy tag column");

    tx.execute_batch("ALTER TABLE cards DROP COLUMN tag;")?;
    Ok(())
}
