use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// A catalog entry that can be dragged onto (or picked into) the prompt box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Prompt {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tags: Vec::new(),
        }
    }

    /// Attach a tag (builder pattern).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Ordered, immutable list of prompts supplied by the prompt library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCatalog {
    prompts: Vec<Prompt>,
}

impl PromptCatalog {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    /// Build a catalog from bare texts, with ids `prompt-0`, `prompt-1`, ...
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prompts = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Prompt::new(format!("prompt-{}", i), text))
            .collect();
        Self { prompts }
    }

    /// Look up a prompt by id.
    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prompt> {
        self.prompts.iter()
    }

    /// Prompts carrying `tag`, in catalog order.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Prompt> + 'a {
        self.prompts
            .iter()
            .filter(move |p| p.tags.iter().any(|t| t == tag))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// The user's working copy of a catalog prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundPrompt {
    /// Where the text came from. Kept for traceability only.
    pub source_prompt_id: Option<String>,
    pub text: String,
}

/// Binds catalog prompts into an editable text box.
///
/// Works the same whether `bind` comes from a drop event or a list click.
#[derive(Debug, Clone, Default)]
pub struct PromptBinder {
    catalog: PromptCatalog,
    bound: Option<BoundPrompt>,
}

impl PromptBinder {
    pub fn new(catalog: PromptCatalog) -> Self {
        Self {
            catalog,
            bound: None,
        }
    }

    /// Get the catalog prompts are bound from.
    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    /// Copy the prompt's text into the bound prompt.
    ///
    /// Re-binding always re-seeds the text from the catalog, discarding edits.
    pub fn bind(&mut self, prompt_id: &str) -> Result<&BoundPrompt> {
        let prompt = self
            .catalog
            .get(prompt_id)
            .ok_or_else(|| SessionError::NotFound(format!("prompt '{}'", prompt_id)))?;

        let bound = self.bound.insert(BoundPrompt {
            source_prompt_id: Some(prompt.id.clone()),
            text: prompt.text.clone(),
        });
        Ok(&*bound)
    }

    /// Overwrite the bound text. Ignored with [`SessionError::Unbound`] before any bind.
    pub fn edit(&mut self, text: impl Into<String>) -> Result<()> {
        match self.bound.as_mut() {
            Some(bound) => {
                bound.text = text.into();
                Ok(())
            }
            None => Err(SessionError::Unbound),
        }
    }

    /// The bound text, or `""` when nothing is bound.
    pub fn current_text(&self) -> &str {
        self.bound.as_ref().map(|b| b.text.as_str()).unwrap_or("")
    }

    /// Get the bound prompt, if any.
    pub fn bound(&self) -> Option<&BoundPrompt> {
        self.bound.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> PromptBinder {
        PromptBinder::new(PromptCatalog::from_texts([
            "Create a domain name for a tech startup focusing on AI",
            "Generate a catchy domain for a fitness app",
        ]))
    }

    #[test]
    fn test_from_texts_assigns_drag_ids() {
        let catalog = binder().catalog().clone();
        let ids: Vec<_> = catalog.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["prompt-0", "prompt-1"]);
    }

    #[test]
    fn test_bind_copies_text() {
        let mut binder = binder();
        let bound = binder.bind("prompt-1").unwrap();
        assert_eq!(bound.text, "Generate a catchy domain for a fitness app");
        assert_eq!(bound.source_prompt_id.as_deref(), Some("prompt-1"));
        assert_eq!(
            binder.current_text(),
            "Generate a catchy domain for a fitness app"
        );
    }

    #[test]
    fn test_bind_unknown_is_not_found() {
        let mut binder = binder();
        assert!(matches!(
            binder.bind("prompt-9"),
            Err(SessionError::NotFound(_))
        ));
        assert_eq!(binder.current_text(), "");
    }

    #[test]
    fn test_rebind_discards_edits() {
        let mut binder = binder();
        binder.bind("prompt-0").unwrap();
        binder.edit("my own words").unwrap();
        assert_eq!(binder.current_text(), "my own words");

        binder.bind("prompt-0").unwrap();
        assert_eq!(
            binder.current_text(),
            "Create a domain name for a tech startup focusing on AI"
        );
    }

    #[test]
    fn test_edit_before_bind_is_ignored() {
        let mut binder = binder();
        assert_eq!(binder.edit("too early"), Err(SessionError::Unbound));
        assert_eq!(binder.current_text(), "");
        assert!(binder.bound().is_none());
    }

    #[test]
    fn test_catalog_tag_filter() {
        let catalog = PromptCatalog::new(vec![
            Prompt::new("1", "Create a logo for a tech startup")
                .with_tag("logo")
                .with_tag("tech"),
            Prompt::new("2", "Design a landing page for a fitness app").with_tag("fitness"),
        ]);
        let tech: Vec<_> = catalog.with_tag("tech").map(|p| p.id.as_str()).collect();
        assert_eq!(tech, vec!["1"]);
        assert_eq!(catalog.with_tag("missing").count(), 0);
    }
}
