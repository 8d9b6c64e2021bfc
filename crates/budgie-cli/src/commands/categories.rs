//! Category command implementations

use anyhow::{Context, Result};
use budgie_core::db::Database;
use budgie_core::models::NewCategory;

use super::truncate;

pub fn cmd_categories_list(db: &Database, user_id: i64) -> Result<()> {
    let categories = db.list_categories(user_id)?;

    if categories.is_empty() {
        println!("No categories for user {}.", user_id);
        println!("Run 'budgie categories seed' to add the defaults.");
        return Ok(());
    }

    println!("📂 Categories (user {})", user_id);
    println!();
    println!("{:>4}  {:<2} {:<22} {:<8}  KEYWORDS", "ID", "", "NAME", "COLOR");
    println!("{}", "-".repeat(80));

    for category in &categories {
        println!(
            "{:>4}  {:<2} {:<22} {:<8}  {}",
            category.id,
            category.icon,
            truncate(&category.name, 22),
            category.color,
            truncate(&category.keyword_hints.join(", "), 40)
        );
    }

    println!();
    println!("{} categories", categories.len());

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user_id: i64,
    name: &str,
    icon: &str,
    color: &str,
    keywords: Option<&str>,
) -> Result<()> {
    let keywords: Vec<&str> = keywords
        .map(|k| {
            k.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let id = db
        .insert_category(user_id, &NewCategory::new(name, icon, color, &keywords))
        .with_context(|| format!("Failed to add category '{}'", name))?;

    println!("✅ Added category {} {} (id {})", icon, name.trim(), id);
    if !keywords.is_empty() {
        println!("   Keywords: {}", keywords.join(", "));
    }

    Ok(())
}

pub fn cmd_categories_remove(db: &Database, user_id: i64, id: i64) -> Result<()> {
    if db.delete_category(user_id, id)? {
        println!("🗑️  Removed category {}", id);
    } else {
        println!("Category {} not found for user {}", id, user_id);
    }
    Ok(())
}

pub fn cmd_categories_seed(db: &Database, user_id: i64) -> Result<()> {
    let created = db
        .seed_default_categories(user_id)
        .context("Failed to seed default categories")?;

    if created == 0 {
        println!("All default categories already exist for user {}", user_id);
    } else {
        println!("✅ Added {} default categories for user {}", created, user_id);
    }
    Ok(())
}
