use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content entity as supplied by the catalog.
///
/// Entities are read-only snapshots as far as resolution is concerned. The
/// `slug` is the stable lookup key; `features` keep the order the author gave
/// them, and that order is the tie-break when two sub-items normalize to the
/// same slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentEntity {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub features: Vec<SubItem>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentEntity {
    /// Find a sub-item by its exact display title.
    pub fn feature_titled(&self, title: &str) -> Option<&SubItem> {
        self.features.iter().find(|f| f.title() == title)
    }
}

/// A named unit inside a content entity.
///
/// Catalog sources are inconsistent about shape, so both a bare string and a
/// `{title, content}` record are accepted. `body` is accepted as an alias for
/// `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubItem {
    Titled(String),
    Detailed {
        title: String,
        #[serde(default, alias = "body")]
        content: String,
    },
}

impl SubItem {
    pub fn title(&self) -> &str {
        match self {
            Self::Titled(title) => title,
            Self::Detailed { title, .. } => title,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Titled(_) => None,
            Self::Detailed { content, .. } => Some(content),
        }
    }
}

/// Input for creating or replacing an entity from the dashboard.
///
/// The slug comes from the request path and is normalized before storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertEntityInput {
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub features: Vec<SubItem>,
}
