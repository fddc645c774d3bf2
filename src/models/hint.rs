use serde::{Deserialize, Serialize};

/// Identity remembered from a previous navigation step.
///
/// A hint lets the resolver skip the catalog scan. It is input-only: the
/// resolver reads it but never clears it. The caller clears it (all keys at
/// once) after a resolution that used it has rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionHint {
    /// Slug of the entity the previous step navigated into.
    pub entity_slug: Option<String>,
    /// Entity title captured alongside the slug, for display while loading.
    pub entity_title: Option<String>,
    /// Exact sub-item title; used as-is without matching.
    pub sub_item_title: Option<String>,
    /// The requested slug the hint was written for.
    pub slug_echo: Option<String>,
}

impl ResolutionHint {
    pub fn is_empty(&self) -> bool {
        self.entity_slug.is_none()
            && self.entity_title.is_none()
            && self.sub_item_title.is_none()
            && self.slug_echo.is_none()
    }

    /// Split the hint into its stored key/value pairs, skipping absent keys.
    pub fn entries(&self) -> Vec<(HintKey, &str)> {
        HintKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|value| (*key, value)))
            .collect()
    }

    pub fn get(&self, key: HintKey) -> Option<&str> {
        match key {
            HintKey::EntitySlug => self.entity_slug.as_deref(),
            HintKey::EntityTitle => self.entity_title.as_deref(),
            HintKey::SubItemTitle => self.sub_item_title.as_deref(),
            HintKey::SlugEcho => self.slug_echo.as_deref(),
        }
    }

    pub fn set(&mut self, key: HintKey, value: String) {
        match key {
            HintKey::EntitySlug => self.entity_slug = Some(value),
            HintKey::EntityTitle => self.entity_title = Some(value),
            HintKey::SubItemTitle => self.sub_item_title = Some(value),
            HintKey::SlugEcho => self.slug_echo = Some(value),
        }
    }
}

/// The keys a hint occupies in the hint channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintKey {
    EntitySlug,
    EntityTitle,
    SubItemTitle,
    SlugEcho,
}

impl HintKey {
    pub const ALL: [HintKey; 4] = [
        Self::EntitySlug,
        Self::EntityTitle,
        Self::SubItemTitle,
        Self::SlugEcho,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntitySlug => "entity_slug",
            Self::EntityTitle => "entity_title",
            Self::SubItemTitle => "sub_item_title",
            Self::SlugEcho => "slug_echo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entity_slug" => Some(Self::EntitySlug),
            "entity_title" => Some(Self::EntityTitle),
            "sub_item_title" => Some(Self::SubItemTitle),
            "slug_echo" => Some(Self::SlugEcho),
            _ => None,
        }
    }
}
