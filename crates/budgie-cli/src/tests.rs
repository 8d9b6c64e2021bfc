//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::Path;

use budgie_core::db::Database;
use budgie_core::pipeline::CancellationToken;
use budgie_core::{CandidateTransaction, ExtractionError, TransactionKind};
use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{CategoriesAction, Cli, Commands};
use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories(1).unwrap();
    db
}

// ========== Categories Command Tests ==========

#[test]
fn test_cmd_categories_list() {
    let db = setup_test_db();
    assert!(commands::cmd_categories_list(&db, 1).is_ok());
    // Empty user is not an error
    assert!(commands::cmd_categories_list(&db, 42).is_ok());
}

#[test]
fn test_cmd_categories_add_with_keywords() {
    let db = setup_test_db();
    let result = commands::cmd_categories_add(
        &db,
        1,
        "Animaux",
        "🐾",
        "#a855f7",
        Some("croquettes, vétérinaire,, "),
    );
    assert!(result.is_ok());

    let added = db
        .list_categories(1)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Animaux")
        .unwrap();
    assert_eq!(added.keyword_hints, vec!["croquettes", "vétérinaire"]);
    assert_eq!(added.icon, "🐾");
}

#[test]
fn test_cmd_categories_add_duplicate() {
    let db = setup_test_db();
    let result = commands::cmd_categories_add(&db, 1, "Transport", "🚗", "#000000", None);
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("already exists"));
}

#[test]
fn test_cmd_categories_remove() {
    let db = setup_test_db();
    let id = db.list_categories(1).unwrap()[0].id;

    assert!(commands::cmd_categories_remove(&db, 1, id).is_ok());
    assert_eq!(db.list_categories(1).unwrap().len(), 7);

    // Unknown id is reported, not an error
    assert!(commands::cmd_categories_remove(&db, 1, 9999).is_ok());
}

#[test]
fn test_cmd_categories_remove_other_user() {
    let db = setup_test_db();
    let id = db.list_categories(1).unwrap()[0].id;

    commands::cmd_categories_remove(&db, 2, id).unwrap();
    assert_eq!(db.list_categories(1).unwrap().len(), 8);
}

#[test]
fn test_cmd_categories_seed_idempotent() {
    let db = Database::in_memory().unwrap();
    commands::cmd_categories_seed(&db, 3).unwrap();
    commands::cmd_categories_seed(&db, 3).unwrap();
    assert_eq!(db.list_categories(3).unwrap().len(), 8);
}

// ========== Init Command Tests ==========

#[test]
fn test_cmd_init_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("budgie.db");

    commands::cmd_init(&path, 5, true).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path, true).unwrap();
    assert_eq!(db.list_categories(5).unwrap().len(), 8);
}

// ========== Analyze Helper Tests ==========

#[test]
fn test_parse_reference_date() {
    assert_eq!(commands::parse_reference_date(None).unwrap(), None);
    assert_eq!(
        commands::parse_reference_date(Some("2024-05-20")).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 20)
    );
    assert!(commands::parse_reference_date(Some("20/05/2024")).is_err());
}

#[test]
fn test_mime_hint() {
    assert_eq!(commands::mime_hint(Path::new("a/receipt.JPG")), Some("image/jpeg"));
    assert_eq!(commands::mime_hint(Path::new("scan.png")), Some("image/png"));
    assert_eq!(commands::mime_hint(Path::new("scan.heic")), None);
    assert_eq!(commands::mime_hint(Path::new("noext")), None);
}

#[test]
fn test_totals_split_by_kind() {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let tx = |amount: f64, kind: TransactionKind| CandidateTransaction {
        merchant: "X".into(),
        date,
        amount,
        kind,
        category: "Other".into(),
    };
    let candidates = vec![
        tx(10.5, TransactionKind::Expense),
        tx(1800.0, TransactionKind::Income),
        tx(4.5, TransactionKind::Expense),
    ];
    assert_eq!(commands::totals(&candidates), (15.0, 1800.0));
    assert_eq!(commands::totals(&[]), (0.0, 0.0));
}

#[tokio::test]
async fn test_interrupt_stops_pending_analysis() {
    let cancel = CancellationToken::new();
    let work = std::future::pending::<Result<Vec<CandidateTransaction>, ExtractionError>>();

    let result = commands::run_until_interrupted(work, async {}, &cancel).await;
    assert_eq!(result, Err(ExtractionError::Cancelled));
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn test_finished_analysis_is_returned_without_interrupt() {
    let cancel = CancellationToken::new();
    let work = async { Ok::<_, ExtractionError>(vec![1, 2]) };

    let result = commands::run_until_interrupted(work, std::future::pending(), &cancel).await;
    assert_eq!(result, Ok(vec![1, 2]));
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_result_discarded_once_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let work = async { Ok::<_, ExtractionError>("late") };

    let result = commands::run_until_interrupted(work, std::future::pending(), &cancel).await;
    assert_eq!(result, Err(ExtractionError::Cancelled));
}

// ========== Prompts Command Tests ==========

#[test]
fn test_cmd_prompts_show_unknown_is_ok() {
    assert!(commands::cmd_prompts_show("does_not_exist").is_ok());
}

#[test]
fn test_cmd_prompts_show_known() {
    assert!(commands::cmd_prompts_show("analyze_receipts").is_ok());
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_analyze_args() {
    let cli = Cli::try_parse_from([
        "budgie", "--user", "7", "analyze", "a.jpg", "b.png", "--date", "2024-05-20", "--json",
    ])
    .unwrap();

    assert_eq!(cli.user, 7);
    match cli.command {
        Commands::Analyze {
            images, date, json, ..
        } => {
            assert_eq!(images.len(), 2);
            assert_eq!(date.as_deref(), Some("2024-05-20"));
            assert!(json);
        }
        _ => panic!("expected analyze"),
    }
}

#[test]
fn test_parse_analyze_requires_images() {
    assert!(Cli::try_parse_from(["budgie", "analyze"]).is_err());
}

#[test]
fn test_parse_categories_add() {
    let cli = Cli::try_parse_from([
        "budgie",
        "categories",
        "add",
        "Animaux",
        "--keywords",
        "croquettes,véto",
    ])
    .unwrap();

    assert_eq!(cli.user, 1);
    match cli.command {
        Commands::Categories {
            action: Some(CategoriesAction::Add { name, keywords, .. }),
        } => {
            assert_eq!(name, "Animaux");
            assert_eq!(keywords.as_deref(), Some("croquettes,véto"));
        }
        _ => panic!("expected categories add"),
    }
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long merchant name", 10), "a long ...");
    assert_eq!(truncate("Crêperie Ménilmontant", 10), "Crêperi...");
}
