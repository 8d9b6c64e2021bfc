//! Prompt library commands

use anyhow::{anyhow, Result};
use budgie_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// Every prompt with its version and whether an override is active
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("📝 Prompts");
    println!();
    println!("{:<20} {:>3}  {:<24} SOURCE", "ID", "V", "TASK");
    println!("{}", "-".repeat(60));

    for &id in PromptId::all() {
        let prompt = library.get(id)?;
        let source = match &prompt.override_path {
            Some(path) if prompt.is_override => format!("override ({})", path.display()),
            _ => "embedded".to_string(),
        };
        println!(
            "{:<20} {:>3}  {:<24} {}",
            id.as_str(),
            prompt.metadata.version,
            prompt.metadata.task_type,
            source
        );
    }

    println!();
    match default_prompts_dir() {
        Some(dir) => println!("Overrides are read from {}/<id>.md", dir.display()),
        None => println!("No data directory on this system: overrides are disabled."),
    }
    println!("Overrides must keep the frontmatter and the {{{{placeholders}}}}.");

    Ok(())
}

/// Print one prompt as the pipeline will load it
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let Ok(id) = prompt_id.parse::<PromptId>() else {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        eprintln!("Unknown prompt '{}'. Known prompts: {}", prompt_id, known.join(", "));
        return Ok(());
    };

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!(
        "# {} v{} ({})",
        prompt.metadata.id, prompt.metadata.version, prompt.metadata.task_type
    );
    match (&prompt.override_path, prompt.is_override) {
        (Some(path), true) => println!("# from {}", path.display()),
        _ => println!("# embedded default"),
    }
    println!();
    println!("{}", prompt.content);

    Ok(())
}

/// Print the override directory
pub fn cmd_prompts_path() -> Result<()> {
    let dir = default_prompts_dir()
        .ok_or_else(|| anyhow!("No data directory available on this system"))?;

    println!("{}", dir.display());
    if !dir.exists() {
        eprintln!("(does not exist yet; create it and copy a prompt there to override it)");
    }

    Ok(())
}
