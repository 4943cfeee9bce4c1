use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Deck already exists: {0}")]
    DeckExists(String),

    #[error("Deck not found: {0}")]
    DeckNotFound(String),

    #[error("Card \"{front}\" already exists in deck \"{deck}\"")]
    CardExists { deck: String, front: String },

    #[error("Card \"{front}\" not found in deck \"{deck}\"")]
    CardNotFound { deck: String, front: String },

    #[error("Daily stats for deck \"{deck}\" on {date} already exist")]
    DailyStatsExists { deck: String, date: String },

    #[error("Database schema version {found} is newer than supported version {supported}")]
    IncompatibleSchema { found: u32, supported: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid outcome '{0}'. Use: correct or incorrect")]
    InvalidOutcome(String),

    #[error("Not a Google Sheets URL: {0}")]
    InvalidSheetsUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::DeckExists(_) | Error::CardExists { .. } | Error::DailyStatsExists { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DeckNotFound(_) | Error::CardNotFound { .. })
    }
}

/// True when a rusqlite error is a primary-key/unique violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        ),
        _ => false,
    }
}
