//! Atomic (Zettelkasten-style) notes stored in the vault.

use serde::{Deserialize, Serialize};

/// One atomic note. Identity is `id`: writing a note whose id already exists
/// in the vault replaces the earlier file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicNote {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of other notes this one links to.
    #[serde(default)]
    pub links: Vec<String>,
}

impl AtomicNote {
    /// File name of this note inside the vault.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.id)
    }
}
