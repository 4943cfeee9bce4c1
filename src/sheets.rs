//! Google Sheets share links.
//!
//! A sheet shared as "anyone with the link" can be downloaded as TSV from its
//! export endpoint. These helpers only rewrite the URL; fetching it is left to
//! the caller.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    static ref SHEET_ID: Regex =
        Regex::new(r"docs\.google\.com/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap();
    static ref FRAGMENT_GID: Regex = Regex::new(r"#gid=(\d+)").unwrap();
    static ref QUERY_GID: Regex = Regex::new(r"[?&]gid=(\d+)").unwrap();
}

pub fn is_google_sheets_url(url: &str) -> bool {
    SHEET_ID.is_match(url)
}

/// Rewrites a sheet link to its TSV export URL, keeping the tab (`gid`) when
/// the link names one. The fragment form `#gid=` wins over the query form.
pub fn convert_google_sheets_url(url: &str) -> Result<String> {
    let sheet_id = SHEET_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::InvalidSheetsUrl(url.to_string()))?;

    let gid = FRAGMENT_GID
        .captures(url)
        .or_else(|| QUERY_GID.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    let mut export = format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=tsv",
        sheet_id
    );
    if let Some(gid) = gid {
        export.push_str("&gid=");
        export.push_str(gid);
    }
    Ok(export)
}
