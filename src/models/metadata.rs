use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One precedence tier of SEO-facing metadata.
///
/// Every field is optional. A missing or blank field means "do not override
/// the tier below".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataLayer {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

/// Site-wide defaults: the base metadata layer plus pass-through fields.
///
/// `site_name`, `icon` and `canonical_base_url` are never overridden by page
/// or path layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteDefaults {
    #[serde(flatten)]
    pub layer: MetadataLayer,
    pub site_name: String,
    pub icon: Option<String>,
    pub canonical_base_url: Option<String>,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            layer: MetadataLayer {
                title: Some("Slugline".to_string()),
                description: None,
                keywords: None,
            },
            site_name: "Slugline".to_string(),
            icon: Some("/favicon.ico".to_string()),
            canonical_base_url: None,
        }
    }
}

/// A stored per-path metadata override.
///
/// `path` is kept in normalized form (see [`crate::metadata::normalize_path`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathMetadata {
    pub path: String,
    #[serde(flatten)]
    pub layer: MetadataLayer,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The merged metadata for one page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub site_name: String,
    pub icon: Option<String>,
    pub canonical_base_url: Option<String>,
    /// `canonical_base_url` joined with the normalized path, when a base URL is configured.
    pub canonical_url: Option<String>,
}
