//! Bulk loading of parsed card records into a deck.
//!
//! Two policies share the transaction machinery but reconcile differently:
//!
//! - [`Database::import_cards_to_new_deck`] suppresses duplicate fronts within
//!   the batch (first occurrence wins) and overwrites whatever the store holds.
//! - [`Database::merge_import_cards`] checks the live store for every record,
//!   updating cards that exist and adding the rest. Duplicates within the
//!   batch are not suppressed; the later record overwrites the earlier one.

use std::collections::HashSet;

use tracing::info;

use crate::db::{CardPatch, Database, Tables};
use crate::error::{Error, Result};
use crate::models::{
    normalize_difficulty, now, Card, Deck, ImportSummary, MergeSummary, ParsedCard,
};

impl Database {
    /// Loads `records` into `deck_name`, creating the deck when missing.
    pub fn import_cards_to_new_deck(
        &mut self,
        deck_name: &str,
        records: &[ParsedCard],
    ) -> Result<ImportSummary> {
        if deck_name.is_empty() {
            return Err(Error::InvalidInput("deck name must not be empty".to_string()));
        }

        let summary = self.transaction(|t| {
            let ts = now();
            ensure_deck(t, deck_name)?;

            let mut seen: HashSet<&str> = HashSet::new();
            let mut summary = ImportSummary::default();
            for record in records {
                if !seen.insert(record.front.as_str()) {
                    summary.skipped += 1;
                    continue;
                }
                t.put_card(&Card {
                    deck_name: deck_name.to_string(),
                    front: record.front.clone(),
                    back: record.back.clone(),
                    tags: record.tags.clone(),
                    difficulty: normalize_difficulty(i64::from(record.difficulty)),
                    correct_count: record.correct_count,
                    incorrect_count: record.incorrect_count,
                    last_studied_at: record.last_studied_at,
                    created_at: ts,
                    updated_at: ts,
                })?;
                summary.imported += 1;
            }
            Ok(summary)
        })?;

        info!(
            deck = deck_name,
            imported = summary.imported,
            skipped = summary.skipped,
            "import finished"
        );
        Ok(summary)
    }

    /// Reconciles `records` against an existing deck. Study counters in the
    /// records replace the stored ones.
    pub fn merge_import_cards(
        &mut self,
        deck_name: &str,
        records: &[ParsedCard],
    ) -> Result<MergeSummary> {
        let summary = self.transaction(|t| {
            if t.get_deck(deck_name)?.is_none() {
                return Err(Error::DeckNotFound(deck_name.to_string()));
            }

            let mut summary = MergeSummary::default();
            for record in records {
                let ts = now();
                if t.get_card(deck_name, &record.front)?.is_some() {
                    t.update_card(
                        deck_name,
                        &record.front,
                        &CardPatch {
                            back: Some(record.back.clone()),
                            tags: Some(record.tags.clone()),
                            difficulty: Some(normalize_difficulty(i64::from(record.difficulty))),
                            correct_count: Some(record.correct_count),
                            incorrect_count: Some(record.incorrect_count),
                            last_studied_at: Some(record.last_studied_at),
                            updated_at: Some(ts),
                        },
                    )?;
                    summary.updated += 1;
                    continue;
                }

                let card = Card {
                    tags: record.tags.clone(),
                    difficulty: normalize_difficulty(i64::from(record.difficulty)),
                    ..Card::new(deck_name, &record.front, &record.back, ts)
                };
                t.add_card(&card)?;
                if record.has_study_data() {
                    t.update_card(
                        deck_name,
                        &record.front,
                        &CardPatch {
                            correct_count: Some(record.correct_count),
                            incorrect_count: Some(record.incorrect_count),
                            last_studied_at: Some(record.last_studied_at),
                            ..Default::default()
                        },
                    )?;
                }
                summary.added += 1;
            }
            Ok(summary)
        })?;

        info!(
            deck = deck_name,
            added = summary.added,
            updated = summary.updated,
            "merge finished"
        );
        Ok(summary)
    }
}

fn ensure_deck(t: &Tables<'_>, name: &str) -> Result<()> {
    if t.get_deck(name)?.is_some() {
        return Ok(());
    }
    let ts = now();
    t.add_deck(&Deck {
        name: name.to_string(),
        description: String::new(),
        created_at: ts,
        updated_at: ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOutcome, CardEdit};
    use crate::tsv;
    use chrono::{TimeZone, Utc};

    fn setup_db() -> Database {
        Database::open_in_memory().expect("Failed to create in-memory database")
    }

    fn record(front: &str, back: &str) -> ParsedCard {
        ParsedCard::new(front, back)
    }

    mod new_deck_tests {
        use super::*;

        #[test]
        fn first_occurrence_wins() {
            let mut db = setup_db();
            let records = vec![record("a", "1"), record("a", "2"), record("a", "3")];

            let summary = db.import_cards_to_new_deck("d", &records).unwrap();

            assert_eq!(summary, ImportSummary { imported: 1, skipped: 2 });
            let cards = db.get_cards_for_deck("d").unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].back, "1");
        }

        #[test]
        fn counts_add_up_to_input_length() {
            let mut db = setup_db();
            let records: Vec<ParsedCard> = ["x", "y", "x", "z", "y", "w"]
                .iter()
                .map(|f| record(f, "b"))
                .collect();

            let summary = db.import_cards_to_new_deck("d", &records).unwrap();

            assert_eq!(
                (summary.imported + summary.skipped) as usize,
                records.len()
            );
            assert_eq!(summary.imported, 4);
            assert_eq!(db.get_cards_for_deck("d").unwrap().len(), 4);
        }

        #[test]
        fn empty_input_creates_empty_deck() {
            let mut db = setup_db();
            let summary = db.import_cards_to_new_deck("d", &[]).unwrap();
            assert_eq!(summary, ImportSummary::default());
            assert!(db.get_deck("d").unwrap().is_some());
            assert!(db.get_cards_for_deck("d").unwrap().is_empty());
        }

        #[test]
        fn study_fields_are_carried_over() {
            let mut db = setup_db();
            let studied = Utc.with_ymd_and_hms(2026, 2, 4, 10, 30, 0).unwrap();
            let mut rec = record("apple", "りんご");
            rec.tags = vec!["fruit".to_string()];
            rec.difficulty = 4;
            rec.correct_count = 3;
            rec.incorrect_count = 1;
            rec.last_studied_at = Some(studied);

            db.import_cards_to_new_deck("d", &[rec]).unwrap();

            let card = db.get_card("d", "apple").unwrap().unwrap();
            assert_eq!(card.tags, vec!["fruit"]);
            assert_eq!(card.difficulty, 4);
            assert_eq!(card.correct_count, 3);
            assert_eq!(card.incorrect_count, 1);
            assert_eq!(card.last_studied_at, Some(studied));
        }

        #[test]
        fn existing_deck_is_kept_and_cards_overwritten() {
            let mut db = setup_db();
            db.create_deck("d", Some("keep me")).unwrap();
            db.add_card("d", "a", "old", &[], None).unwrap();

            db.import_cards_to_new_deck("d", &[record("a", "new")])
                .unwrap();

            assert_eq!(db.get_deck("d").unwrap().unwrap().description, "keep me");
            assert_eq!(db.get_card("d", "a").unwrap().unwrap().back, "new");
        }

        #[test]
        fn empty_deck_name_is_rejected() {
            let mut db = setup_db();
            assert!(matches!(
                db.import_cards_to_new_deck("", &[record("a", "b")]),
                Err(Error::InvalidInput(_))
            ));
        }

        #[test]
        fn out_of_range_difficulty_is_stored_as_one() {
            let mut db = setup_db();
            let mut rec = record("a", "b");
            rec.difficulty = 9;

            db.import_cards_to_new_deck("d", &[rec]).unwrap();

            assert_eq!(db.get_card("d", "a").unwrap().unwrap().difficulty, 1);
        }

        #[test]
        fn whitespace_deck_name_is_accepted() {
            let mut db = setup_db();
            db.import_cards_to_new_deck(" ", &[record("a", "b")]).unwrap();
            assert!(db.get_card(" ", "a").unwrap().is_some());
        }

        #[test]
        fn codec_output_imports_cleanly() {
            let mut db = setup_db();
            let records = tsv::parse("front\tback\ttag\napple\tりんご\tfruit\nbook\t本\t\n");
            let summary = db.import_cards_to_new_deck("英単語", &records).unwrap();
            assert_eq!(summary.imported, 2);
            let apple = db.get_card("英単語", "apple").unwrap().unwrap();
            assert_eq!(apple.tags, vec!["fruit"]);
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn merge_into_empty_deck_adds_everything() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            let records = vec![record("a", "1"), record("b", "2")];

            let summary = db.merge_import_cards("d", &records).unwrap();

            assert_eq!(summary, MergeSummary { added: 2, updated: 0 });
            assert_eq!(db.get_cards_for_deck("d").unwrap().len(), 2);
        }

        #[test]
        fn existing_card_is_updated_in_place() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            db.add_card("d", "こんにちは", "hello", &[], None).unwrap();
            let before = db.get_card("d", "こんにちは").unwrap().unwrap();

            let mut rec = record("こんにちは", "Hello");
            rec.correct_count = 5;
            let summary = db.merge_import_cards("d", &[rec]).unwrap();

            assert_eq!(summary, MergeSummary { added: 0, updated: 1 });
            let after = db.get_card("d", "こんにちは").unwrap().unwrap();
            assert_eq!(after.back, "Hello");
            assert_eq!(after.correct_count, 5);
            assert_eq!(after.created_at, before.created_at);
            assert!(after.updated_at >= before.updated_at);
        }

        #[test]
        fn counters_are_replaced_not_added() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            db.add_card("d", "a", "x", &[], None).unwrap();
            for _ in 0..4 {
                db.record_answer("d", "a", AnswerOutcome::Correct).unwrap();
            }

            let mut rec = record("a", "x");
            rec.correct_count = 1;
            db.merge_import_cards("d", &[rec]).unwrap();

            let card = db.get_card("d", "a").unwrap().unwrap();
            assert_eq!(card.correct_count, 1);
            assert_eq!(card.incorrect_count, 0);
            assert!(card.last_studied_at.is_none());
        }

        #[test]
        fn new_card_with_study_data_keeps_it() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            let studied = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
            let mut rec = record("a", "x");
            rec.incorrect_count = 2;
            rec.last_studied_at = Some(studied);
            rec.difficulty = 5;

            db.merge_import_cards("d", &[rec]).unwrap();

            let card = db.get_card("d", "a").unwrap().unwrap();
            assert_eq!(card.incorrect_count, 2);
            assert_eq!(card.last_studied_at, Some(studied));
            assert_eq!(card.difficulty, 5);
        }

        #[test]
        fn out_of_range_difficulty_is_stored_as_one() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            db.add_card("d", "old", "x", &[], None).unwrap();
            db.update_card(
                "d",
                "old",
                &CardEdit {
                    difficulty: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();

            let mut existing = record("old", "x");
            existing.difficulty = 9;
            let mut fresh = record("new", "y");
            fresh.difficulty = 9;
            db.merge_import_cards("d", &[existing, fresh]).unwrap();

            assert_eq!(db.get_card("d", "old").unwrap().unwrap().difficulty, 1);
            assert_eq!(db.get_card("d", "new").unwrap().unwrap().difficulty, 1);
        }

        #[test]
        fn in_batch_duplicate_counts_as_update() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            let records = vec![record("a", "1"), record("a", "2")];

            let summary = db.merge_import_cards("d", &records).unwrap();

            assert_eq!(summary, MergeSummary { added: 1, updated: 1 });
            assert_eq!(db.get_card("d", "a").unwrap().unwrap().back, "2");
        }

        #[test]
        fn empty_input_is_a_no_op() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            assert_eq!(
                db.merge_import_cards("d", &[]).unwrap(),
                MergeSummary::default()
            );
        }

        #[test]
        fn missing_deck_is_rejected() {
            let mut db = setup_db();
            let err = db
                .merge_import_cards("ghost", &[record("a", "b")])
                .unwrap_err();
            assert!(matches!(err, Error::DeckNotFound(_)));
            assert!(db.get_cards_for_deck("ghost").unwrap().is_empty());
        }

        #[test]
        fn other_decks_are_untouched() {
            let mut db = setup_db();
            db.create_deck("d", None).unwrap();
            db.create_deck("e", None).unwrap();
            db.add_card("e", "a", "keep", &[], None).unwrap();

            db.merge_import_cards("d", &[record("a", "new")]).unwrap();

            assert_eq!(db.get_card("e", "a").unwrap().unwrap().back, "keep");
            assert_eq!(db.get_card("d", "a").unwrap().unwrap().back, "new");
        }
    }
}
