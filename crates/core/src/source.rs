//! The content-source seam.
//!
//! The platform owns persistence of prompt presets; the compiler sees plain
//! data. `PromptLibrary` is the narrow lookup trait the orchestrator resolves
//! sources through — a missing source is `NotFound`, a banned one
//! `Forbidden`, both surfaced to the caller with no retry and no partial
//! result.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::worldbook::WorldBookEntry;

/// One enabled-or-not piece of fixed prompt content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub content: String,

    /// Free-form role string; parsed leniently downstream
    #[serde(default)]
    pub role: String,

    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    #[serde(default = "default_item_order")]
    pub order: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_item_order() -> i32 {
    crate::component::DEFAULT_ORDER
}

impl ContentItem {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role: String::new(),
            is_enabled: true,
            order: default_item_order(),
        }
    }
}

/// A resolved content source: fixed items plus its world book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub id: String,

    #[serde(default)]
    pub items: Vec<ContentItem>,

    #[serde(default)]
    pub world_book: Vec<WorldBookEntry>,
}

/// Lookup seam for content sources.
pub trait PromptLibrary: Send + Sync {
    /// Resolve a source by id. `Err(NotFound)` when absent, `Err(Forbidden)`
    /// when the caller may not use it.
    fn fetch(&self, source_id: &str) -> Result<PromptDefinition>;
}
