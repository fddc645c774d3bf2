//! SEO metadata merge engine.
//!
//! Three layers feed every page: the site-wide [`SiteDefaults`], the defaults
//! the calling page supplies, and an override looked up by path from a
//! [`MetadataStore`]. Per field the highest non-blank layer wins, in order
//! override > page default > base.

use async_trait::async_trait;

use crate::models::{MetadataLayer, PageMetadata, PathMetadata, SiteDefaults};

/// Path-keyed override storage.
///
/// The store is read and written as a whole collection; there is no partial
/// update.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load_overrides(&self) -> anyhow::Result<Vec<PathMetadata>>;
    async fn save_overrides(&self, overrides: Vec<PathMetadata>) -> anyhow::Result<Vec<PathMetadata>>;
}

/// Normalize a request path for override lookup.
///
/// Trims surrounding whitespace and one trailing slash. The root path (and an
/// empty path) becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Find the override layer for `path`. Exact match only; no prefix matching.
pub fn override_for_path(overrides: &[PathMetadata], path: &str) -> MetadataLayer {
    let wanted = normalize_path(path);
    overrides
        .iter()
        .find(|o| normalize_path(&o.path) == wanted)
        .map(|o| o.layer.clone())
        .unwrap_or_default()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn pick(base: &Option<String>, page: &Option<String>, path: &Option<String>) -> String {
    non_blank(path)
        .or_else(|| non_blank(page))
        .or_else(|| non_blank(base))
        .unwrap_or_default()
        .to_string()
}

/// Merge the three layers into one record.
///
/// A blank string in a higher layer never clobbers a lower one, so a store
/// that persists `""` for "unset" behaves like one that omits the field.
pub fn merge(
    base: &SiteDefaults,
    page_default: &MetadataLayer,
    path_override: &MetadataLayer,
) -> PageMetadata {
    PageMetadata {
        title: pick(&base.layer.title, &page_default.title, &path_override.title),
        description: pick(
            &base.layer.description,
            &page_default.description,
            &path_override.description,
        ),
        keywords: pick(
            &base.layer.keywords,
            &page_default.keywords,
            &path_override.keywords,
        ),
        site_name: base.site_name.clone(),
        icon: base.icon.clone(),
        canonical_base_url: base.canonical_base_url.clone(),
        canonical_url: None,
    }
}

/// Merge for a concrete path, filling in the canonical URL.
pub fn merge_for_path(
    base: &SiteDefaults,
    page_default: &MetadataLayer,
    overrides: &[PathMetadata],
    path: &str,
) -> PageMetadata {
    let path_override = override_for_path(overrides, path);
    let mut merged = merge(base, page_default, &path_override);
    merged.canonical_url = base
        .canonical_base_url
        .as_deref()
        .map(|url| canonical_url(url, &normalize_path(path)));
    merged
}

fn canonical_url(base_url: &str, path: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if path == "/" {
        format!("{}/", base_url)
    } else {
        format!("{}{}", base_url, path)
    }
}

/// Build page metadata from a store, degrading to page and site defaults when
/// the store is unavailable.
pub async fn page_metadata(
    store: &dyn MetadataStore,
    base: &SiteDefaults,
    page_default: &MetadataLayer,
    path: &str,
) -> PageMetadata {
    let overrides = match store.load_overrides().await {
        Ok(overrides) => overrides,
        Err(e) => {
            tracing::warn!("Metadata store unavailable, using defaults: {:#}", e);
            Vec::new()
        }
    };
    merge_for_path(base, page_default, &overrides, path)
}
