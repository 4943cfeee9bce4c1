//! Tab-separated card exchange format.
//!
//! Writes the current seven-column layout and reads every layout the app
//! has ever produced: headerless two-column files, the singular `tag`
//! column, files without `tags`/`difficulty`, and the oldest files with a
//! `pronunciation` column (ignored). Columns are located by header name.

use std::io;

use crate::error::{Error, Result};
use crate::models::{
    format_timestamp, normalize_difficulty, parse_timestamp, Card, ParsedCard, MIN_DIFFICULTY,
};

pub const COLUMNS: [&str; 7] = [
    "front",
    "back",
    "tags",
    "difficulty",
    "correctCount",
    "incorrectCount",
    "lastStudiedAt",
];

const LEGACY_TAG_COLUMN: &str = "tag";

pub fn generate(cards: &[Card]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for card in cards {
        let tags = card.tags.join(",");
        let difficulty = card.difficulty.to_string();
        let correct = card.correct_count.to_string();
        let incorrect = card.incorrect_count.to_string();
        let last_studied = card
            .last_studied_at
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_default();
        writer.write_record([
            card.front.as_str(),
            card.back.as_str(),
            tags.as_str(),
            difficulty.as_str(),
            correct.as_str(),
            incorrect.as_str(),
            last_studied.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    let mut text =
        String::from_utf8(bytes).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

pub fn parse(text: &str) -> Vec<ParsedCard> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());

    // Rows end at `\n` only; a bare `\r` inside a field is content.
    let rows: Vec<Vec<String>> = reader
        .records()
        .filter_map(|record| record.ok())
        .map(|record| {
            let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
            if let Some(last) = fields.last_mut() {
                if last.ends_with('\r') {
                    last.pop();
                }
            }
            fields
        })
        .filter(|fields| fields.iter().any(|f| !f.trim().is_empty()))
        .collect();

    let Some(first) = rows.first() else {
        return Vec::new();
    };

    match Columns::from_header(first) {
        Some(columns) => rows[1..].iter().map(|row| columns.read(row)).collect(),
        None => rows
            .iter()
            .map(|row| ParsedCard::new(field(row, Some(0)), field(row, Some(1))))
            .collect(),
    }
}

/// Splits a comma-separated tag field; trims, drops empties, keeps order.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// Header positions; optional columns fall back to defaults when absent
struct Columns {
    front: usize,
    back: usize,
    tags: Option<usize>,
    difficulty: Option<usize>,
    correct_count: Option<usize>,
    incorrect_count: Option<usize>,
    last_studied_at: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Option<Self> {
        let position = |name: &str| header.iter().position(|h| h.trim() == name);
        let front = position("front")?;
        let back = position("back")?;
        Some(Self {
            front,
            back,
            tags: position("tags").or_else(|| position(LEGACY_TAG_COLUMN)),
            difficulty: position("difficulty"),
            correct_count: position("correctCount"),
            incorrect_count: position("incorrectCount"),
            last_studied_at: position("lastStudiedAt"),
        })
    }

    fn read(&self, row: &[String]) -> ParsedCard {
        ParsedCard {
            front: field(row, Some(self.front)).to_string(),
            back: field(row, Some(self.back)).to_string(),
            tags: split_tags(field(row, self.tags)),
            difficulty: field(row, self.difficulty)
                .trim()
                .parse::<i64>()
                .map(normalize_difficulty)
                .unwrap_or(MIN_DIFFICULTY),
            correct_count: parse_count(field(row, self.correct_count)),
            incorrect_count: parse_count(field(row, self.incorrect_count)),
            last_studied_at: parse_timestamp(field(row, self.last_studied_at)),
        }
    }
}

fn field(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn parse_count(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;
    use chrono::{TimeZone, Utc};

    fn card(front: &str, back: &str) -> Card {
        Card::new("英単語", front, back, now())
    }

    mod generate_tests {
        use super::*;

        #[test]
        fn empty_input_is_header_only() {
            assert_eq!(
                generate(&[]).unwrap(),
                "front\tback\ttags\tdifficulty\tcorrectCount\tincorrectCount\tlastStudiedAt"
            );
        }

        #[test]
        fn writes_one_line_per_card_in_order() {
            let mut apple = card("apple", "りんご");
            apple.tags = vec!["fruit".to_string(), "noun".to_string()];
            apple.difficulty = 2;
            apple.correct_count = 5;
            apple.incorrect_count = 2;
            apple.last_studied_at = Some(Utc.with_ymd_and_hms(2026, 2, 4, 10, 30, 0).unwrap());
            let book = card("book", "本");

            let text = generate(&[apple, book]).unwrap();
            let lines: Vec<&str> = text.split('\n').collect();
            assert_eq!(lines.len(), 3);
            assert_eq!(
                lines[1],
                "apple\tりんご\tfruit,noun\t2\t5\t2\t2026-02-04T10:30:00.000Z"
            );
            assert_eq!(lines[2], "book\t本\t\t1\t0\t0\t");
        }

        #[test]
        fn quotes_are_written_verbatim() {
            let text = generate(&[card("say \"hi\"", "挨拶")]).unwrap();
            assert!(text.ends_with("say \"hi\"\t挨拶\t\t1\t0\t0\t"));
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn empty_text_yields_nothing() {
            assert!(parse("").is_empty());
            assert!(parse("\n\n  \n").is_empty());
        }

        #[test]
        fn headerless_two_columns() {
            let parsed = parse("apple\tりんご");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].front, "apple");
            assert_eq!(parsed[0].back, "りんご");
            assert!(parsed[0].tags.is_empty());
            assert_eq!(parsed[0].difficulty, 1);
        }

        #[test]
        fn headerless_treats_every_line_as_data() {
            let parsed = parse("apple\tりんご\nbook\t本\textra\t5");
            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed[1].front, "book");
            assert_eq!(parsed[1].difficulty, 1);
        }

        #[test]
        fn header_with_front_back_only() {
            let parsed = parse("front\tback\napple\tりんご\nbook\t本");
            assert_eq!(
                parsed,
                vec![ParsedCard::new("apple", "りんご"), ParsedCard::new("book", "本")]
            );
        }

        #[test]
        fn header_columns_in_any_order() {
            let parsed = parse("back\tdifficulty\tfront\nりんご\t3\tapple");
            assert_eq!(parsed[0].front, "apple");
            assert_eq!(parsed[0].back, "りんご");
            assert_eq!(parsed[0].difficulty, 3);
        }

        #[test]
        fn blank_lines_are_skipped() {
            let parsed = parse("front\tback\napple\tりんご\n\n\t\nbook\t本\n");
            assert_eq!(parsed.len(), 2);
        }

        #[test]
        fn crlf_line_endings() {
            let parsed = parse("front\tback\r\napple\tりんご\r\n");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].back, "りんご");
        }

        #[test]
        fn bare_carriage_return_stays_in_field() {
            let parsed = parse("x\ry\tb");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].front, "x\ry");
            assert_eq!(parsed[0].back, "b");

            let parsed = parse("front\tback\r\nx\ry\tb\r\n");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].front, "x\ry");
            assert_eq!(parsed[0].back, "b");
        }

        #[test]
        fn byte_order_mark_is_ignored() {
            let parsed = parse("\u{feff}front\tback\napple\tりんご");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].front, "apple");
        }

        #[test]
        fn study_columns_are_read() {
            let parsed = parse(
                "front\tback\tcorrectCount\tincorrectCount\tlastStudiedAt\napple\tりんご\t5\t2\t2026-02-04T10:30:00.000Z",
            );
            assert_eq!(parsed[0].correct_count, 5);
            assert_eq!(parsed[0].incorrect_count, 2);
            assert_eq!(
                parsed[0].last_studied_at,
                Some(Utc.with_ymd_and_hms(2026, 2, 4, 10, 30, 0).unwrap())
            );
        }

        #[test]
        fn empty_last_studied_is_none() {
            let parsed =
                parse("front\tback\tcorrectCount\tincorrectCount\tlastStudiedAt\ndog\t犬\t0\t0\t");
            assert!(parsed[0].last_studied_at.is_none());
        }

        #[test]
        fn difficulty_out_of_range_is_one() {
            let parsed = parse("front\tback\tdifficulty\na\t1\t0\nb\t2\t6\nc\t3\thard\nd\t4\t5");
            let levels: Vec<u8> = parsed.iter().map(|p| p.difficulty).collect();
            assert_eq!(levels, vec![1, 1, 1, 5]);
        }

        #[test]
        fn bad_counts_default_to_zero() {
            let parsed = parse("front\tback\tcorrectCount\tincorrectCount\na\tb\t-3\tmany");
            assert_eq!(parsed[0].correct_count, 0);
            assert_eq!(parsed[0].incorrect_count, 0);
        }

        #[test]
        fn tags_are_trimmed_and_empties_dropped() {
            let parsed = parse("front\tback\ttags\na\tb\t verb, ,noun,verb ,");
            assert_eq!(parsed[0].tags, vec!["verb", "noun", "verb"]);
        }

        #[test]
        fn legacy_singular_tag_column() {
            let parsed = parse("front\tback\ttag\tdifficulty\na\tb\tanimal\t2");
            assert_eq!(parsed[0].tags, vec!["animal"]);
            assert_eq!(parsed[0].difficulty, 2);
        }

        #[test]
        fn plural_tags_wins_over_singular() {
            let parsed = parse("front\tback\ttag\ttags\na\tb\told\tnew");
            assert_eq!(parsed[0].tags, vec!["new"]);
        }

        #[test]
        fn pronunciation_schema_is_accepted() {
            let parsed = parse(
                "front\tback\tpronunciation\tcorrectCount\tincorrectCount\tlastStudiedAt\nこんにちは\thello\tkonnichiwa\t1\t0\t",
            );
            assert_eq!(parsed[0].front, "こんにちは");
            assert_eq!(parsed[0].back, "hello");
            assert_eq!(parsed[0].correct_count, 1);
            assert!(parsed[0].tags.is_empty());
        }

        #[test]
        fn short_rows_get_defaults() {
            let parsed = parse("front\tback\ttags\tdifficulty\napple");
            assert_eq!(parsed[0].front, "apple");
            assert_eq!(parsed[0].back, "");
            assert_eq!(parsed[0].difficulty, 1);
        }

        #[test]
        fn header_words_inside_data_do_not_trigger_header_mode() {
            let parsed = parse("frontier\tbackpack");
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].front, "frontier");
        }
    }

    mod round_trip_tests {
        use super::*;

        #[test]
        fn parse_of_generate_reproduces_cards() {
            let mut a = card("apple", "りんご");
            a.tags = vec!["fruit".to_string(), "noun".to_string(), "fruit".to_string()];
            a.difficulty = 5;
            a.correct_count = 12;
            a.incorrect_count = 3;
            a.last_studied_at = Some(Utc.with_ymd_and_hms(2026, 2, 4, 10, 30, 0).unwrap());
            let b = card("こんにちは", "hello");
            let mut c = card("book", "本");
            c.last_studied_at = Some(now());

            let cards = vec![a, b, c];
            let parsed = parse(&generate(&cards).unwrap());
            let expected: Vec<ParsedCard> = cards.iter().map(ParsedCard::from).collect();
            assert_eq!(parsed, expected);
        }
    }
}
