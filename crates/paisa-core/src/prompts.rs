//! Prompt library for the AI classifier
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/paisa/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const CLASSIFY_EXPENSE: &str = include_str!("../../../prompts/classify_expense.md");
    pub const SPENDING_INSIGHT: &str = include_str!("../../../prompts/spending_insight.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Closed-set category (and amount) for free text
    ClassifyExpense,
    /// Short advice from monthly category totals
    SpendingInsight,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyExpense => "classify_expense",
            Self::SpendingInsight => "spending_insight",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::ClassifyExpense, Self::SpendingInsight]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ClassifyExpense => defaults::CLASSIFY_EXPENSE,
            Self::SpendingInsight => defaults::SPENDING_INSIGHT,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown prompt ID: {}", s))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
    /// classification or narrative
    pub purpose: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt body (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole prompt, replacing `{{var}}` placeholders
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the user section (falls back to the whole prompt)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }
}

fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    remove_unmatched_conditionals(&result, vars)
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// No override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        let prompt = match self.cache.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let loaded = load_prompt(self.override_dir.as_ref(), id)?;
                entry.insert(loaded)
            }
        };
        Ok(prompt)
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let override_path = self.override_path(id).filter(|p| p.exists());
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    purpose: prompt.map(|p| p.metadata.purpose.clone()).unwrap_or_default(),
                    has_override: override_path.is_some(),
                    override_path,
                }
            })
            .collect()
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", id.as_str())))
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub purpose: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("paisa").join("prompts").join("overrides"))
}

fn load_prompt(override_dir: Option<&PathBuf>, id: PromptId) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let path = dir.join(format!("{}.md", id.as_str()));
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::InvalidData(format!("Failed to read prompt override: {}", e))
            })?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(path),
            });
        }
    }

    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

/// Split a prompt file into frontmatter metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();
    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let metadata: PromptMetadata = serde_yaml::from_str(rest[..end].trim())
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, rest[end + 3..].trim().to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

/// Keep `{{#if var}}...{{/if}}` blocks whose variable is non-empty, drop the rest
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_len) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_len].trim().to_string();
        let block_start = var_start + var_len + 2;
        let Some(block_len) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_end = block_start + block_len;
        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());

        result = if keep {
            format!(
                "{}{}{}",
                &result[..if_start],
                &result[block_start..block_end],
                &result[block_end + 7..]
            )
        } else {
            format!("{}{}", &result[..if_start], &result[block_end + 7..])
        };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 2
purpose: classification
---

# System
Sys.

# User
Classify {{text}}.
"#;
        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 2);
        assert!(body.starts_with("# System"));
        assert_eq!(extract_section(&body, "# User"), Some("Classify {{text}}."));
    }

    #[test]
    fn test_missing_frontmatter() {
        assert!(parse_prompt("# User\nhello").is_err());
        assert!(parse_prompt("---\nid: x\n").is_err());
    }

    #[test]
    fn test_classify_prompt_renders_text_and_categories() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt = lib.get(PromptId::ClassifyExpense).unwrap();
        let mut vars = HashMap::new();
        vars.insert("text", "paid rs 300 to pvr");
        let rendered = prompt.render_user(&vars);

        assert!(rendered.contains("Expense: \"paid rs 300 to pvr\""));
        for category in crate::models::Category::ALL {
            assert!(rendered.contains(&format!("- {}", category.as_str())));
        }
        assert!(!rendered.contains("{{text}}"));
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if budget}}\nBudget: {{budget}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("budget", "5000");
        assert_eq!(render_template(content, &vars), "Start\nBudget: 5000\nEnd");

        vars.insert("budget", "");
        assert_eq!(render_template(content, &vars), "Start\nEnd");
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let (metadata, _) = parse_prompt(id.default_content()).unwrap();
            assert_eq!(metadata.id, id.as_str());
        }
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("spending_insight.md"),
            "---\nid: spending_insight\nversion: 9\npurpose: narrative\n---\n# User\nCustom {{lines}}",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let prompt = lib.get(PromptId::SpendingInsight).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 9);

        let listed = lib.list();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|p| p.id == "spending_insight" && p.has_override));
        assert!(listed.iter().any(|p| p.id == "classify_expense" && !p.has_override));
    }
}
