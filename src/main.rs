use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use flipnote::config::Config;
use flipnote::models::{local_date_key, now, AnswerOutcome, CardEdit, JsonOutput};
use flipnote::{logging, sheets, tsv, tui, Database, Error};

#[derive(Parser)]
#[command(name = "flipnote")]
#[command(about = "Local-first flashcards with decks, study sessions and TSV import/export")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommands),

    /// Manage cards in a deck
    #[command(subcommand)]
    Card(CardCommands),

    /// Record a study answer for a card
    Answer {
        /// Deck name
        deck: String,

        /// Card front
        front: String,

        /// Answer outcome: correct/incorrect
        #[arg(long, short)]
        outcome: String,
    },

    /// Show daily study statistics for a deck
    Stats {
        /// Deck name
        deck: String,
    },

    /// Import cards from a TSV file ("-" reads stdin)
    Import {
        /// Deck name
        deck: String,

        /// TSV file path
        file: String,

        /// Merge into an existing deck instead of loading a new one
        #[arg(long, short)]
        merge: bool,
    },

    /// Export a deck as TSV
    Export {
        /// Deck name
        deck: String,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Convert a Google Sheets link to its TSV export URL
    SheetUrl {
        /// Spreadsheet URL
        url: String,
    },

    /// Study a deck in the terminal UI
    Study {
        /// Deck to start with (opens the deck list when omitted)
        deck: Option<String>,
    },
}

#[derive(Subcommand)]
enum DeckCommands {
    /// List all decks
    List,

    /// Create a new deck
    Create {
        /// Deck name
        name: String,

        /// Deck description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Rename a deck, moving its cards and statistics
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,
    },

    /// Set a deck's description
    Describe {
        /// Deck name
        name: String,

        /// New description
        description: String,
    },

    /// Delete a deck with its cards and statistics
    Delete {
        /// Deck name
        name: String,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// List the cards in a deck
    List {
        /// Deck name
        deck: String,

        /// Filter by tag
        #[arg(long, short)]
        tag: Option<String>,
    },

    /// Add a card
    Add {
        /// Deck name
        deck: String,

        /// Card front
        front: String,

        /// Card back
        back: String,

        /// Comma-separated tags
        #[arg(long, short)]
        tags: Option<String>,

        /// Difficulty from 1 to 5
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Edit a card's back, tags or difficulty
    Edit {
        /// Deck name
        deck: String,

        /// Card front
        front: String,

        /// New back
        #[arg(long, short)]
        back: Option<String>,

        /// Comma-separated tags (replaces existing)
        #[arg(long, short)]
        tags: Option<String>,

        /// Difficulty from 1 to 5
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Change a card's front
    Rename {
        /// Deck name
        deck: String,

        /// Current front
        old: String,

        /// New front
        new: String,

        /// Overwrite a card that already has the new front
        #[arg(long)]
        force: bool,
    },

    /// Delete a card
    Delete {
        /// Deck name
        deck: String,

        /// Card front
        front: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();
    logging::init(&config, cli.verbose);

    let json = cli.json;
    if let Err(e) = run(cli, &config) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_ok(json: bool, message: impl FnOnce() -> String) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
    } else {
        println!("{}", message());
    }
    Ok(())
}

fn run(cli: Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.ensure_db_dir()?;
    let mut db = Database::open(&config.db_path)?;
    debug!(path = %config.db_path.display(), "using database");

    match cli.command {
        Commands::Init => {
            let version = db.schema_version()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "path": config.db_path,
                        "schema_version": version
                    })))?
                );
            } else {
                println!(
                    "Database initialized at: {} (schema v{})",
                    config.db_path.display(),
                    version
                );
            }
        }

        Commands::Deck(deck_cmd) => match deck_cmd {
            DeckCommands::List => {
                let decks = db.get_deck_summaries()?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&decks))?);
                } else if decks.is_empty() {
                    println!("No decks found.");
                } else {
                    println!("{:<32} {:>6}  LAST STUDIED", "NAME", "CARDS");
                    println!("{}", "-".repeat(60));
                    for deck in decks {
                        let last = deck
                            .last_studied_at
                            .as_ref()
                            .map(local_date_key)
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<32} {:>6}  {}",
                            truncate(&deck.name, 30),
                            deck.card_count,
                            last
                        );
                    }
                }
            }

            DeckCommands::Create { name, description } => {
                let deck = db.create_deck(&name, description.as_deref())?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&deck))?);
                } else {
                    println!("Created deck '{}'.", deck.name);
                }
            }

            DeckCommands::Rename { old, new } => {
                db.rename_deck(&old, &new)?;
                print_ok(cli.json, || format!("Renamed deck '{}' to '{}'.", old, new))?;
            }

            DeckCommands::Describe { name, description } => {
                db.update_deck_description(&name, &description)?;
                print_ok(cli.json, || format!("Updated description for deck '{}'.", name))?;
            }

            DeckCommands::Delete { name } => {
                let summary = db.delete_deck(&name)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(summary))?);
                } else {
                    println!(
                        "Deck '{}' deleted ({} cards, {} days of stats).",
                        name, summary.cards, summary.daily_stats
                    );
                }
            }
        },

        Commands::Card(card_cmd) => match card_cmd {
            CardCommands::List { deck, tag } => {
                require_deck(&db, &deck)?;
                let cards: Vec<_> = db
                    .get_cards_for_deck(&deck)?
                    .into_iter()
                    .filter(|c| tag.as_ref().map_or(true, |t| c.tags.contains(t)))
                    .collect();
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
                } else if cards.is_empty() {
                    println!("No cards found.");
                } else {
                    println!(
                        "{:<24} {:<24} {:>4} {:>9} {:>5}  TAGS",
                        "FRONT", "BACK", "DIFF", "SCORE", "ACC"
                    );
                    println!("{}", "-".repeat(86));
                    for card in cards {
                        let tags = if card.tags.is_empty() {
                            String::from("-")
                        } else {
                            card.tags.join(", ")
                        };
                        println!(
                            "{:<24} {:<24} {:>4} {:>4}/{:<4} {:>4.0}%  {}",
                            truncate(&card.front, 22),
                            truncate(&card.back, 22),
                            card.difficulty,
                            card.correct_count,
                            card.times_studied(),
                            card.accuracy(),
                            tags
                        );
                    }
                }
            }

            CardCommands::Add {
                deck,
                front,
                back,
                tags,
                difficulty,
            } => {
                require_deck(&db, &deck)?;
                let tag_list = tags.as_deref().map(tsv::split_tags).unwrap_or_default();
                let card = db.add_card(&deck, &front, &back, &tag_list, difficulty)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&card))?);
                } else {
                    println!("Added card '{}' to deck '{}'.", card.front, deck);
                }
            }

            CardCommands::Edit {
                deck,
                front,
                back,
                tags,
                difficulty,
            } => {
                let edit = CardEdit {
                    back,
                    tags: tags.as_deref().map(tsv::split_tags),
                    difficulty,
                };
                if edit.is_empty() {
                    return Err("Nothing to change. Use --back, --tags or --difficulty".into());
                }
                db.update_card(&deck, &front, &edit)?;
                print_ok(cli.json, || format!("Updated card '{}'.", front))?;
            }

            CardCommands::Rename {
                deck,
                old,
                new,
                force,
            } => {
                if !force && old != new && db.get_card(&deck, &new)?.is_some() {
                    return Err(Error::CardExists { deck, front: new }.into());
                }
                db.update_card_front(&deck, &old, &new)?;
                print_ok(cli.json, || format!("Renamed card '{}' to '{}'.", old, new))?;
            }

            CardCommands::Delete { deck, front } => {
                if !db.delete_card(&deck, &front)? {
                    return Err(Error::CardNotFound { deck, front }.into());
                }
                print_ok(cli.json, || format!("Card '{}' deleted.", front))?;
            }
        },

        Commands::Answer {
            deck,
            front,
            outcome,
        } => {
            let outcome =
                AnswerOutcome::from_str(&outcome).ok_or_else(|| Error::InvalidOutcome(outcome))?;
            let card = db.record_answer(&deck, &front, outcome)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&card))?);
            } else {
                println!(
                    "Recorded {} answer for '{}' ({}/{} correct).",
                    outcome.as_str(),
                    card.front,
                    card.correct_count,
                    card.times_studied()
                );
            }
        }

        Commands::Stats { deck } => {
            require_deck(&db, &deck)?;
            let stats = db.get_daily_stats(&deck)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&stats))?);
            } else if stats.is_empty() {
                println!("No study history for '{}'.", deck);
            } else {
                let today = local_date_key(&now());
                println!("=== Study Statistics: {} ===", deck);
                println!("{:<12} {:>8} {:>8} {:>10}", "DATE", "STUDIED", "CORRECT", "INCORRECT");
                println!("{}", "-".repeat(41));
                for day in &stats {
                    let marker = if day.date == today { " (today)" } else { "" };
                    println!(
                        "{:<12} {:>8} {:>8} {:>10}{}",
                        day.date, day.studied_count, day.correct_count, day.incorrect_count, marker
                    );
                }
                let studied: u32 = stats.iter().map(|d| d.studied_count).sum();
                let correct: u32 = stats.iter().map(|d| d.correct_count).sum();
                println!();
                println!(
                    "Total: {} answers, {:.0}% correct",
                    studied,
                    if studied == 0 {
                        0.0
                    } else {
                        correct as f64 / studied as f64 * 100.0
                    }
                );
            }
        }

        Commands::Import { deck, file, merge } => {
            let text = read_input(&file)?;
            let records = tsv::parse(&text);
            debug!(file = %file, records = records.len(), merge, "parsed import file");

            if merge {
                let summary = db.merge_import_cards(&deck, &records)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(summary))?);
                } else {
                    println!(
                        "Merged into '{}': {} added, {} updated.",
                        deck, summary.added, summary.updated
                    );
                }
            } else {
                let summary = db.import_cards_to_new_deck(&deck, &records)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(summary))?);
                } else {
                    println!(
                        "Imported {} cards into '{}' ({} duplicates skipped).",
                        summary.imported, deck, summary.skipped
                    );
                }
            }
        }

        Commands::Export { deck, output } => {
            require_deck(&db, &deck)?;
            let text = db.export_deck(&deck)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &text)?;
                    print_ok(cli.json, || {
                        format!("Exported '{}' to {}.", deck, path.display())
                    })?;
                }
                None if cli.json => {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&text))?);
                }
                None => println!("{}", text),
            }
        }

        Commands::SheetUrl { url } => {
            let export = sheets::convert_google_sheets_url(&url)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&export))?);
            } else {
                println!("{}", export);
            }
        }

        Commands::Study { deck } => {
            tui::run(db, deck.as_deref())?;
        }
    }

    Ok(())
}

fn require_deck(db: &Database, name: &str) -> Result<(), Error> {
    match db.get_deck(name)? {
        Some(_) => Ok(()),
        None => Err(Error::DeckNotFound(name.to_string())),
    }
}

fn read_input(file: &str) -> Result<String, Box<dyn std::error::Error>> {
    if sheets::is_google_sheets_url(file) {
        return Err(format!(
            "Download the sheet first: {}",
            sheets::convert_google_sheets_url(file)?
        )
        .into());
    }
    let mut text = String::new();
    if file == "-" {
        std::io::stdin().read_to_string(&mut text)?;
    } else {
        text = std::fs::read_to_string(file)?;
    }
    Ok(text)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
