//! Prompt library and the receipt prompt builder
//!
//! A prompt file named `<id>.md` in the override directory
//! (`~/.local/share/budgie/prompts/overrides/` on Linux) replaces the
//! embedded template of the same id. Without one, the template compiled
//! into the binary is used.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::Category;

mod defaults {
    pub const ANALYZE_RECEIPTS: &str = include_str!("../../../prompts/analyze_receipts.md");
    pub const PROBE_MODEL: &str = include_str!("../../../prompts/probe_model.md");
}

/// Rendered in place of the hint lines when no category has keywords
pub const NO_HINTS_PLACEHOLDER: &str = "  (no hints available)";

/// Rendered in place of the category list when the user has none
pub const NO_CATEGORIES_PLACEHOLDER: &str = "(no categories)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// OCR text + categories -> JSON transactions
    AnalyzeReceipts,
    /// Trivial prompt used to check a model is reachable
    ProbeModel,
}

impl PromptId {
    /// File stem and CLI name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeReceipts => "analyze_receipts",
            Self::ProbeModel => "probe_model",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::AnalyzeReceipts, Self::ProbeModel]
    }

    fn embedded_source(&self) -> &'static str {
        match self {
            Self::AnalyzeReceipts => defaults::ANALYZE_RECEIPTS,
            Self::ProbeModel => defaults::PROBE_MODEL,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PromptId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown prompt: {}", s))
    }
}

/// YAML header of a prompt file
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Bumped whenever the wording changes
    pub version: u32,
    /// Kind of work the prompt asks for (structured_extraction, ...)
    pub task_type: String,
}

/// Parsed prompt template
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Markdown after the header, `# System` and `# User` sections included
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Embedded default for `id`, ignoring overrides
    pub fn embedded(id: PromptId) -> Result<Self> {
        let (metadata, content) = split_frontmatter(id.embedded_source())?;
        Ok(Self {
            metadata,
            content,
            is_override: false,
            override_path: None,
        })
    }

    pub fn system_section(&self) -> Option<&str> {
        section(&self.content, "System")
    }

    pub fn user_section(&self) -> Option<&str> {
        section(&self.content, "User")
    }

    /// Render just the user section (or the whole body) with variables
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let template = self.user_section().unwrap_or(&self.content);
        render_template(template, vars)
    }
}

/// Resolves prompt ids to templates, memoizing each one after first use
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    loaded: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Overrides from the platform data directory
    pub fn new() -> Self {
        Self::from_dir(default_prompts_dir())
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self::from_dir(Some(path))
    }

    /// Never looks at the filesystem
    pub fn embedded_only() -> Self {
        Self::from_dir(None)
    }

    fn from_dir(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            loaded: HashMap::new(),
        }
    }

    /// Template for `id`; an override file is read once and then reused
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if let std::collections::hash_map::Entry::Vacant(slot) = self.loaded.entry(id) {
            let prompt = match self.override_dir.as_ref().map(|d| override_file(d, id)) {
                Some(path) if path.exists() => read_override(path)?,
                _ => Prompt::embedded(id)?,
            };
            slot.insert(prompt);
        }
        self.loaded
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("prompt {}", id.as_str())))
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some_and(|p| p.exists())
    }

    /// Where an override for `id` would live
    pub fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir.as_deref().map(|d| override_file(d, id))
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

fn override_file(dir: &Path, id: PromptId) -> PathBuf {
    dir.join(id.as_str()).with_extension("md")
}

fn read_override(path: PathBuf) -> Result<Prompt> {
    let raw = fs::read_to_string(&path).map_err(|e| {
        Error::InvalidData(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let (metadata, content) = split_frontmatter(&raw)?;
    tracing::debug!(path = %path.display(), id = %metadata.id, "Using prompt override");
    Ok(Prompt {
        metadata,
        content,
        is_override: true,
        override_path: Some(path),
    })
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// `<data dir>/budgie/prompts/overrides`, when the platform has a data dir
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgie").join("prompts").join("overrides"))
}

/// Build the structured-extraction instruction for one batch
///
/// Pure: the same inputs always give the same string. Category names are
/// embedded verbatim and in store order.
pub fn build_receipt_prompt(
    template: &Prompt,
    ocr_text: &str,
    today: NaiveDate,
    categories: &[Category],
) -> String {
    let today = today.format("%Y-%m-%d").to_string();
    let category_list = render_category_list(categories);
    let hints = render_keyword_hints(categories);

    let mut vars = HashMap::new();
    vars.insert("today", today.as_str());
    vars.insert("ocr_text", ocr_text);
    vars.insert("categories", category_list.as_str());
    vars.insert("hints", hints.as_str());
    template.render_user(&vars)
}

/// Text of the model reachability probe
pub fn probe_prompt() -> String {
    Prompt::embedded(PromptId::ProbeModel)
        .map(|p| p.render_user(&HashMap::new()))
        .unwrap_or_else(|_| "Reply with just OK.".to_string())
}

/// Comma-separated category names in store order
pub fn render_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return NO_CATEGORIES_PLACEHOLDER.to_string();
    }
    categories
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One "keywords → category" line per category that has hints
pub fn render_keyword_hints(categories: &[Category]) -> String {
    let lines: Vec<String> = categories
        .iter()
        .filter_map(|c| {
            let keywords: Vec<&str> = c
                .keyword_hints
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                None
            } else {
                Some(format!("  * {} → {}", keywords.join(", "), c.name))
            }
        })
        .collect();

    if lines.is_empty() {
        NO_HINTS_PLACEHOLDER.to_string()
    } else {
        lines.join("\n")
    }
}

/// `---`-delimited YAML header, then the markdown body
fn split_frontmatter(raw: &str) -> Result<(PromptMetadata, String)> {
    let Some(after_open) = raw.trim_start().strip_prefix("---") else {
        return Err(Error::InvalidData(
            "prompt file has no YAML header; it must begin with a '---' line".into(),
        ));
    };
    let Some((header, body)) = after_open.split_once("\n---") else {
        return Err(Error::InvalidData(
            "prompt YAML header is never closed by a '---' line".into(),
        ));
    };

    let metadata = serde_yaml::from_str::<PromptMetadata>(header)
        .map_err(|e| Error::InvalidData(format!("bad prompt header: {}", e)))?;
    let body = body.trim_start_matches('-').trim();

    Ok((metadata, body.to_string()))
}

/// Body of the level-one `# <title>` section, up to the next level-one heading
fn section<'a>(content: &'a str, title: &str) -> Option<&'a str> {
    let heading = format!("# {}", title);
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == heading {
            let rest = &content[offset..];
            let end = rest
                .match_indices("# ")
                .map(|(i, _)| i)
                .find(|&i| i == 0 || rest.as_bytes()[i - 1] == b'\n')
                .unwrap_or(rest.len());
            return Some(rest[..end].trim());
        }
    }
    None
}

/// Single-pass `{{var}}` substitution
///
/// Substituted values are never rescanned, so OCR text containing braces
/// cannot pull in other variables. Unknown placeholders are left as-is.
fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(&after[..end]);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(name: &str, keywords: &[&str]) -> Category {
        Category {
            id: 0,
            user_id: 1,
            name: name.to_string(),
            icon: String::new(),
            color: String::new(),
            keyword_hints: keywords.iter().map(|k| k.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()
    }

    #[test]
    fn test_split_frontmatter_and_sections() {
        let raw = "---\nid: receipt_fr\nversion: 3\ntask_type: structured_extraction\n---\n\n\
                   # System\nTu es un assistant comptable.\n\n\
                   # User\nTicket:\n## Lignes\n{{ocr_text}}\n";

        let (metadata, body) = split_frontmatter(raw).unwrap();
        assert_eq!(metadata.id, "receipt_fr");
        assert_eq!(metadata.version, 3);

        let prompt = Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        };
        assert_eq!(prompt.system_section(), Some("Tu es un assistant comptable."));
        assert_eq!(prompt.user_section(), Some("Ticket:\n## Lignes\n{{ocr_text}}"));
    }

    #[test]
    fn test_split_frontmatter_rejects_bad_headers() {
        assert!(split_frontmatter("# User\nhello").is_err());
        assert!(split_frontmatter("---\nid: x\n# User\nhello").is_err());
        assert!(split_frontmatter("---\nversion: not-a-number\n---\n# User\n").is_err());
    }

    #[test]
    fn test_missing_section_is_none() {
        let prompt = Prompt::embedded(PromptId::ProbeModel).unwrap();
        assert!(prompt.system_section().is_none());
        assert_eq!(prompt.render_user(&HashMap::new()), "Reply with just OK.");
    }

    #[test]
    fn test_render_is_single_pass() {
        let mut vars = HashMap::new();
        vars.insert("ocr_text", "TOTAL {{today}}");
        vars.insert("today", "2024-05-12");
        let out = render_template("[{{ocr_text}}] {{today}} {{unknown}}", &vars);
        assert_eq!(out, "[TOTAL {{today}}] 2024-05-12 {{unknown}}");
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let prompt = Prompt::embedded(*id).unwrap();
            assert_eq!(prompt.metadata.id, id.as_str());
            assert!(prompt.user_section().is_some());
        }
    }

    #[test]
    fn test_prompt_library_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("analyze_receipts.md"),
            "---\nid: analyze_receipts\nversion: 9\ntask_type: structured_extraction\n---\n# User\nCustom {{today}}",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::AnalyzeReceipts));
        assert!(!lib.has_override(PromptId::ProbeModel));

        let prompt = lib.get(PromptId::AnalyzeReceipts).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 9);
    }

    #[test]
    fn test_receipt_prompt_embeds_everything() {
        let template = Prompt::embedded(PromptId::AnalyzeReceipts).unwrap();
        let categories = vec![
            category("Alimentaire", &["carrefour", "lidl"]),
            category("Transport", &[]),
            category("Santé", &["pharmacie"]),
        ];
        let prompt = build_receipt_prompt(
            &template,
            "--- Receipt 1 ---\nCarrefour 12/05 23.40",
            today(),
            &categories,
        );

        assert!(prompt.contains("Carrefour 12/05 23.40"));
        assert!(prompt.contains("Categories: Alimentaire, Transport, Santé"));
        assert!(prompt.contains("  * carrefour, lidl → Alimentaire"));
        assert!(prompt.contains("  * pharmacie → Santé"));
        assert!(!prompt.contains("→ Transport"));
        assert!(prompt.contains("Today's date: 2024-05-12"));
        assert!(prompt.contains("cannot be determined → 2024-05-12"));
        assert!(prompt.contains("\"transactions\""));
        for field in ["merchant", "date", "amount", "kind", "category"] {
            assert!(prompt.contains(&format!("\"{}\":", field)), "missing {}", field);
        }
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_receipt_prompt_without_categories_is_well_formed() {
        let template = Prompt::embedded(PromptId::AnalyzeReceipts).unwrap();
        let prompt = build_receipt_prompt(&template, "TOTAL 12.00", today(), &[]);
        assert!(prompt.contains(NO_HINTS_PLACEHOLDER));
        assert!(prompt.contains(NO_CATEGORIES_PLACEHOLDER));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_prompt_builder_is_deterministic() {
        let template = Prompt::embedded(PromptId::AnalyzeReceipts).unwrap();
        let categories = vec![category("Shopping", &["zara"])];
        let a = build_receipt_prompt(&template, "ZARA 39.95", today(), &categories);
        let b = build_receipt_prompt(&template, "ZARA 39.95", today(), &categories);
        assert_eq!(a, b);
    }
}
