//! Category operations and the read-only store seam used by the pipeline

use rusqlite::{params, ErrorCode};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory};

/// Source of a user's ordered category set
///
/// Order is significant: it drives the prompt's category list and the
/// first-match rules of category resolution.
pub trait CategoryStore: Send + Sync {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>>;
}

/// The categories every new user starts with
pub fn default_categories() -> Vec<NewCategory> {
    vec![
        NewCategory::new(
            "Alimentaire",
            "🛒",
            "#22c55e",
            &[
                "supermarché",
                "carrefour",
                "leclerc",
                "auchan",
                "lidl",
                "monoprix",
                "boulangerie",
                "briocherie",
                "boucherie",
                "sodexo",
                "café",
            ],
        ),
        NewCategory::new(
            "Hygiène & Soins",
            "🧴",
            "#3b82f6",
            &["shampoing", "savon", "dentifrice", "coiffeur", "beauté"],
        ),
        NewCategory::new(
            "Loisirs & Sorties",
            "🎉",
            "#f59e0b",
            &[
                "restaurant",
                "bar",
                "pub",
                "club",
                "boîte de nuit",
                "cinéma",
                "bowling",
                "concert",
                "burger",
                "kebab",
                "pizza",
            ],
        ),
        NewCategory::new(
            "Transport",
            "🚗",
            "#ef4444",
            &[
                "sncf", "ratp", "essence", "parking", "uber", "taxi", "péage", "train", "bus",
                "métro",
            ],
        ),
        NewCategory::new(
            "Logement & Factures",
            "🏠",
            "#8b5cf6",
            &[
                "loyer",
                "edf",
                "free",
                "orange",
                "assurance",
                "électricité",
                "gaz",
                "internet",
                "téléphone",
            ],
        ),
        NewCategory::new(
            "Shopping",
            "🛍️",
            "#ec4899",
            &["zara", "h&m", "amazon", "fnac", "vêtements", "chaussures"],
        ),
        NewCategory::new(
            "Santé",
            "💊",
            "#06b6d4",
            &["pharmacie", "médecin", "docteur", "hôpital", "mutuelle"],
        ),
        NewCategory::new(
            "Revenu",
            "💰",
            "#10b981",
            &["salaire", "freelance", "virement", "remboursement"],
        ),
    ]
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Database {
    /// List a user's categories ordered by name, then id
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, name, icon, color, keywords, created_at
            FROM categories WHERE user_id = ? ORDER BY name, id
            "#,
        )?;

        let categories = stmt
            .query_map(params![user_id], |row| {
                let keywords: String = row.get(5)?;
                let created_at_str: String = row.get(6)?;
                Ok(Category {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    icon: row.get(3)?,
                    color: row.get(4)?,
                    keyword_hints: split_keywords(&keywords),
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Just the names, in store order
    pub fn category_names(&self, user_id: i64) -> Result<Vec<String>> {
        Ok(self
            .list_categories(user_id)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Create a category, rejecting duplicate names for the same user
    pub fn insert_category(&self, user_id: i64, category: &NewCategory) -> Result<i64> {
        let name = category.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Category name cannot be empty".into()));
        }

        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO categories (user_id, name, icon, color, keywords)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                name,
                category.icon,
                category.color,
                join_keywords(&category.keyword_hints)
            ],
        );

        match inserted {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::InvalidData(format!(
                    "Category '{}' already exists",
                    name
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one of a user's categories; returns whether a row was removed
    pub fn delete_category(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM categories WHERE id = ? AND user_id = ?",
            params![category_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    /// Add any missing default categories for a user (idempotent)
    ///
    /// Returns the number of categories created.
    pub fn seed_default_categories(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let mut created = 0;

        for category in default_categories() {
            created += conn.execute(
                r#"
                INSERT OR IGNORE INTO categories (user_id, name, icon, color, keywords)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    user_id,
                    category.name,
                    category.icon,
                    category.color,
                    join_keywords(&category.keyword_hints)
                ],
            )?;
        }

        if created > 0 {
            info!(user_id, created, "Seeded default categories");
        }
        Ok(created)
    }

    /// Seed the defaults only when the user has no categories at all
    ///
    /// Returns true if seeding happened.
    pub fn ensure_user_has_categories(&self, user_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        drop(conn);

        if count == 0 {
            self.seed_default_categories(user_id)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl CategoryStore for Database {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        Database::list_categories(self, user_id)
    }
}

/// Fixed in-memory category set, the same for every user
#[derive(Debug, Clone, Default)]
pub struct StaticCategories {
    categories: Vec<Category>,
}

impl StaticCategories {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Build from names only, keeping the given order
    pub fn from_names(names: &[&str]) -> Self {
        let now = chrono::Utc::now();
        let categories = names
            .iter()
            .enumerate()
            .map(|(i, name)| Category {
                id: i as i64 + 1,
                user_id: 0,
                name: name.to_string(),
                icon: String::new(),
                color: String::new(),
                keyword_hints: Vec::new(),
                created_at: now,
            })
            .collect();
        Self { categories }
    }
}

impl CategoryStore for StaticCategories {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        Ok(self
            .categories
            .iter()
            .cloned()
            .map(|mut c| {
                c.user_id = user_id;
                c
            })
            .collect())
    }
}
