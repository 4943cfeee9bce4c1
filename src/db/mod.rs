//! Local SQLite store for decks, cards and daily statistics.
//!
//! The `Database` handle owns the connection. Every multi-step mutation goes
//! through [`Database::transaction`], which hands the closure a [`Tables`]
//! view over an open transaction and commits only when the closure returns
//! `Ok`. Dropping the transaction on any other path rolls it back.
//! [`Database::read`] runs lookups with the connection set to `query_only`.

mod schema;
mod tables;

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;

pub use schema::SCHEMA_VERSION;
pub use tables::{CardPatch, Tables};

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file and brings its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        let version = schema::migrate(&mut conn)?;
        debug!(path = %path.as_ref().display(), version, "database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| {
            warn!(error = %e, "failed to close database");
            e.into()
        })
    }

    pub fn schema_version(&self) -> Result<u32> {
        schema::user_version(&self.conn)
    }

    /// Runs `f` inside one transaction; all of its writes land or none do.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Tables<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let out = f(&Tables::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }

    /// Runs `f` with the connection switched to `query_only`; any write
    /// attempted inside fails with a database error.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tables<'_>) -> Result<T>,
    {
        self.conn.pragma_update(None, "query_only", true)?;
        let out = f(&Tables::new(&self.conn));
        self.conn.pragma_update(None, "query_only", false)?;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{now, Card, Deck};

    fn setup_db() -> Database {
        Database::open_in_memory().expect("Failed to create in-memory database")
    }

    mod open_tests {
        use super::*;

        #[test]
        fn open_in_memory_is_current() {
            let db = setup_db();
            assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        }

        #[test]
        fn reopen_keeps_data() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("flipnote.db");

            let mut db = Database::open(&path).unwrap();
            db.transaction(|t| t.add_card(&Card::new("d", "apple", "りんご", now())))
                .unwrap();
            db.close().unwrap();

            let db = Database::open(&path).unwrap();
            assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
            assert!(db.read(|t| t.get_card("d", "apple")).unwrap().is_some());
        }

        #[test]
        fn open_refuses_newer_schema() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("future.db");
            {
                let conn = Connection::open(&path).unwrap();
                conn.pragma_update(None, "user_version", SCHEMA_VERSION + 5)
                    .unwrap();
            }
            let err = Database::open(&path).err().unwrap();
            assert!(matches!(err, Error::IncompatibleSchema { .. }));
        }
    }

    mod transaction_tests {
        use super::*;

        #[test]
        fn transaction_commits_on_ok() {
            let mut db = setup_db();
            let ts = now();
            db.transaction(|t| {
                t.add_deck(&Deck {
                    name: "a".to_string(),
                    description: String::new(),
                    created_at: ts,
                    updated_at: ts,
                })?;
                t.add_card(&Card::new("a", "x", "y", ts))
            })
            .unwrap();
            assert!(db.read(|t| t.get_deck("a")).unwrap().is_some());
            assert!(db.read(|t| t.get_card("a", "x")).unwrap().is_some());
        }

        #[test]
        fn transaction_rolls_back_on_err() {
            let mut db = setup_db();
            let ts = now();
            let result: Result<()> = db.transaction(|t| {
                t.add_card(&Card::new("a", "x", "y", ts))?;
                t.add_card(&Card::new("a", "x", "dup", ts))
            });
            assert!(matches!(result, Err(Error::CardExists { .. })));
            assert!(db.read(|t| t.get_card("a", "x")).unwrap().is_none());
        }

        #[test]
        fn read_rejects_writes() {
            let mut db = setup_db();
            let ts = now();
            let result = db.read(|t| t.add_card(&Card::new("a", "x", "y", ts)));
            assert!(matches!(result, Err(Error::Database(_))));
            assert!(db.read(|t| t.get_card("a", "x")).unwrap().is_none());

            // the connection is writable again afterwards
            db.transaction(|t| t.add_card(&Card::new("a", "x", "y", ts)))
                .unwrap();
            assert!(db.read(|t| t.get_card("a", "x")).unwrap().is_some());
        }

        #[test]
        fn transaction_sees_its_own_writes() {
            let mut db = setup_db();
            let found = db
                .transaction(|t| {
                    t.add_card(&Card::new("a", "x", "y", now()))?;
                    Ok(t.get_card("a", "x")?.is_some())
                })
                .unwrap();
            assert!(found);
        }
    }
}
