//! Database tests

use super::*;
use crate::models::NewCategory;

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_categories(1).unwrap().is_empty());
}

#[test]
fn test_categories_schema_exists() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let result: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('categories') WHERE name IN ('id', 'user_id', 'name', 'icon', 'color', 'keywords', 'created_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(result, 7, "categories table should have 7 expected columns");
}

#[test]
fn test_category_crud() {
    let db = Database::in_memory().unwrap();

    let id = db
        .insert_category(
            1,
            &NewCategory::new("Transport", "🚗", "#ef4444", &["sncf", " ratp ", ""]),
        )
        .unwrap();
    assert!(id > 0);

    let categories = db.list_categories(1).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Transport");
    assert_eq!(categories[0].keyword_hints, vec!["sncf", "ratp"]);

    assert!(db.delete_category(1, id).unwrap());
    assert!(!db.delete_category(1, id).unwrap());
    assert!(db.list_categories(1).unwrap().is_empty());
}

#[test]
fn test_duplicate_category_rejected() {
    let db = Database::in_memory().unwrap();
    let cat = NewCategory::new("Shopping", "", "", &[]);
    db.insert_category(1, &cat).unwrap();

    let err = db.insert_category(1, &cat).unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));

    // Same name is fine for a different user
    db.insert_category(2, &cat).unwrap();
}

#[test]
fn test_empty_name_rejected() {
    let db = Database::in_memory().unwrap();
    let err = db
        .insert_category(1, &NewCategory::new("   ", "", "", &[]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}

#[test]
fn test_categories_are_per_user_and_ordered() {
    let db = Database::in_memory().unwrap();
    for name in ["Transport", "Alimentaire", "Santé"] {
        db.insert_category(1, &NewCategory::new(name, "", "", &[]))
            .unwrap();
    }
    db.insert_category(2, &NewCategory::new("Autre", "", "", &[]))
        .unwrap();

    assert_eq!(
        db.category_names(1).unwrap(),
        vec!["Alimentaire", "Santé", "Transport"]
    );
    assert_eq!(db.category_names(2).unwrap(), vec!["Autre"]);
}

#[test]
fn test_delete_is_scoped_to_user() {
    let db = Database::in_memory().unwrap();
    let id = db
        .insert_category(1, &NewCategory::new("Shopping", "", "", &[]))
        .unwrap();
    assert!(!db.delete_category(2, id).unwrap());
    assert_eq!(db.category_names(1).unwrap(), vec!["Shopping"]);
}

#[test]
fn test_seed_default_categories_idempotent() {
    let db = Database::in_memory().unwrap();

    assert_eq!(db.seed_default_categories(7).unwrap(), 8);
    assert_eq!(db.seed_default_categories(7).unwrap(), 0);

    let categories = db.list_categories(7).unwrap();
    assert_eq!(categories.len(), 8);

    let food = categories
        .iter()
        .find(|c| c.name == "Alimentaire")
        .unwrap();
    assert_eq!(food.icon, "🛒");
    assert_eq!(food.keyword_hints.first().map(String::as_str), Some("supermarché"));
    assert!(food.keyword_hints.contains(&"carrefour".to_string()));
}

#[test]
fn test_ensure_user_has_categories() {
    let db = Database::in_memory().unwrap();

    db.insert_category(3, &NewCategory::new("Custom", "", "", &[]))
        .unwrap();
    assert!(!db.ensure_user_has_categories(3).unwrap());
    assert_eq!(db.category_names(3).unwrap(), vec!["Custom"]);

    assert!(db.ensure_user_has_categories(4).unwrap());
    assert_eq!(db.list_categories(4).unwrap().len(), 8);
}

#[test]
fn test_database_as_category_store() {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories(1).unwrap();

    let store: &dyn CategoryStore = &db;
    let names: Vec<String> = store
        .list_categories(1)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, db.category_names(1).unwrap());
}

#[test]
fn test_static_categories_keep_order() {
    let store = StaticCategories::from_names(&["Transport", "Alimentaire"]);
    let categories = store.list_categories(42).unwrap();
    assert_eq!(categories[0].name, "Transport");
    assert_eq!(categories[1].name, "Alimentaire");
    assert!(categories.iter().all(|c| c.user_id == 42));
}

#[test]
fn test_encrypted_database_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enc.db");
    let path = path.to_string_lossy();

    let db = Database::new_with_key(&path, Some("correct horse")).unwrap();
    db.seed_default_categories(1).unwrap();
    drop(db);

    let reopened = Database::new_with_key(&path, Some("correct horse")).unwrap();
    assert_eq!(reopened.list_categories(1).unwrap().len(), 8);
}

#[test]
fn test_key_pragma_is_stable_per_passphrase() {
    let a = key_pragma("correct horse").unwrap();
    assert_eq!(a, key_pragma("correct horse").unwrap());
    assert_ne!(a, key_pragma("battery staple").unwrap());
    assert!(a.starts_with("PRAGMA key = 'x\""));
}
