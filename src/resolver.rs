//! Slug → content entity resolution.
//!
//! A requested slug names a sub-item (e.g. a feature of a service), but the
//! catalog is keyed by entity, so the lookup is ambiguous. Resolution runs as
//! a short state machine and stops at the first branch that binds an entity:
//!
//! 1. [`ResolutionStep::HintedEntity`]: a hint from the previous navigation
//!    names the entity; fetch it directly and trust the hinted sub-item title.
//! 2. Derived title: without a hinted sub-item title, a display title is
//!    derived from the slug. Display only; it never takes part in matching.
//! 3. [`ResolutionStep::CatalogScan`]: load the whole catalog once and take the
//!    first sub-item, in catalog order, whose normalized title equals the
//!    normalized slug.
//! 4. Otherwise [`ResolveError::NotFound`].
//!
//! The resolver never clears hints while resolving. Callers invoke
//! [`Resolver::commit`] once a result that used the hint has rendered; a
//! failed attempt leaves the hint in place for the next try.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::models::{ContentEntity, ResolutionHint, SubItem};
use crate::slug::{humanize, normalize};

/// Read-only source of content entities.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Every entity, in catalog order.
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<ContentEntity>>;

    /// One entity by its slug.
    async fn fetch_entity(&self, slug: &str) -> anyhow::Result<Option<ContentEntity>>;
}

/// Ephemeral per-session store for resolution hints.
#[async_trait]
pub trait HintChannel: Send + Sync {
    async fn read_hint(&self, session: Uuid) -> anyhow::Result<Option<ResolutionHint>>;

    /// Replace every key of the session's hint.
    async fn write_hint(&self, session: Uuid, hint: &ResolutionHint) -> anyhow::Result<()>;

    /// Remove every key of the session's hint. Returns whether anything was removed.
    async fn clear_hint(&self, session: Uuid) -> anyhow::Result<bool>;
}

/// A hint channel that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

#[async_trait]
impl HintChannel for NoHints {
    async fn read_hint(&self, _session: Uuid) -> anyhow::Result<Option<ResolutionHint>> {
        Ok(None)
    }

    async fn write_hint(&self, _session: Uuid, _hint: &ResolutionHint) -> anyhow::Result<()> {
        Ok(())
    }

    async fn clear_hint(&self, _session: Uuid) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Why a resolution attempt did not produce a result.
///
/// Every kind is scoped to one attempt and none is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing in the catalog matches. Not retried.
    #[error("no content matches slug '{0}'")]
    NotFound(String),

    /// The catalog or another store could not be read.
    #[error("content source unavailable: {0}")]
    SourceUnavailable(String),

    /// The hint was written for a different slug and was discarded.
    #[error("hint written for '{echo}' does not match requested slug '{requested}'")]
    StaleHint { echo: String, requested: String },
}

/// The branch that bound the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStep {
    HintedEntity,
    CatalogScan,
}

/// A successful resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub entity: ContentEntity,
    pub sub_item: Option<SubItem>,
    pub display_title: String,
    pub step: ResolutionStep,
}

impl Resolution {
    /// Entity and display title are both established.
    pub fn is_complete(&self) -> bool {
        !self.entity.slug.is_empty() && !self.display_title.trim().is_empty()
    }
}

/// What the view layer renders for one resolution attempt.
///
/// Errors never escape as failures; each one becomes a fallback state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolveView {
    Resolved {
        resolution: Resolution,
    },
    NotFound {
        requested_slug: String,
        display_title: String,
    },
    Unavailable {
        requested_slug: String,
        display_title: String,
        /// Parent entity named by a matching hint, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity_title: Option<String>,
        reason: String,
    },
}

impl ResolveView {
    pub fn from_outcome(nav: &Navigation, outcome: Result<Resolution, ResolveError>) -> Self {
        match outcome {
            Ok(resolution) => Self::Resolved { resolution },
            Err(ResolveError::NotFound(_)) | Err(ResolveError::StaleHint { .. }) => {
                Self::NotFound {
                    requested_slug: nav.requested_slug().to_string(),
                    display_title: nav.fallback_title(),
                }
            }
            Err(ResolveError::SourceUnavailable(reason)) => Self::Unavailable {
                requested_slug: nav.requested_slug().to_string(),
                display_title: nav.fallback_title(),
                entity_title: nav.hinted_entity_title().map(String::from),
                reason,
            },
        }
    }
}

/// State for resolving one requested slug.
///
/// The catalog is fetched lazily and at most once per navigation. A caller
/// that already has the catalog (or fetched it concurrently with the hint
/// lookup) can hand it over with [`Navigation::with_catalog`].
pub struct Navigation {
    requested_slug: String,
    hint: Option<ResolutionHint>,
    catalog: OnceCell<Arc<Vec<ContentEntity>>>,
}

impl Navigation {
    pub fn new(requested_slug: impl Into<String>) -> Self {
        Self {
            requested_slug: requested_slug.into(),
            hint: None,
            catalog: OnceCell::new(),
        }
    }

    pub fn with_hint(mut self, hint: Option<ResolutionHint>) -> Self {
        self.hint = hint.filter(|h| !h.is_empty());
        self
    }

    pub fn with_catalog(self, catalog: Vec<ContentEntity>) -> Self {
        // A fresh cell cannot already be set.
        let _ = self.catalog.set(Arc::new(catalog));
        self
    }

    /// Supply a catalog that arrived after the navigation started.
    /// Ignored when one was already loaded.
    pub fn offer_catalog(&self, catalog: Vec<ContentEntity>) -> bool {
        self.catalog.set(Arc::new(catalog)).is_ok()
    }

    pub fn requested_slug(&self) -> &str {
        &self.requested_slug
    }

    pub fn hint(&self) -> Option<&ResolutionHint> {
        self.hint.as_ref()
    }

    /// The hinted entity title, when the hint was written for this slug.
    ///
    /// Lets a fallback view name the parent entity while the catalog is down.
    pub fn hinted_entity_title(&self) -> Option<&str> {
        let hint = self.hint.as_ref()?;
        let written_for_this_slug = hint
            .slug_echo
            .as_deref()
            .map_or(true, |echo| normalize(echo) == normalize(&self.requested_slug));
        hint.entity_title
            .as_deref()
            .filter(|title| written_for_this_slug && !title.trim().is_empty())
    }

    /// Display label derived from the slug, for views that have nothing better.
    pub fn fallback_title(&self) -> String {
        humanize(&normalize(&self.requested_slug))
    }

    async fn catalog(
        &self,
        source: &dyn CatalogSource,
    ) -> Result<Arc<Vec<ContentEntity>>, ResolveError> {
        self.catalog
            .get_or_try_init(|| async {
                source
                    .fetch_catalog()
                    .await
                    .map(Arc::new)
                    .map_err(|e| ResolveError::SourceUnavailable(format!("{:#}", e)))
            })
            .await
            .cloned()
    }
}

/// Resolves requested slugs against a catalog, using hints when they are valid.
#[derive(Clone)]
pub struct Resolver {
    catalog: Arc<dyn CatalogSource>,
    hints: Arc<dyn HintChannel>,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn CatalogSource>, hints: Arc<dyn HintChannel>) -> Self {
        Self { catalog, hints }
    }

    /// A resolver that only ever scans the catalog.
    pub fn without_hints(catalog: Arc<dyn CatalogSource>) -> Self {
        Self::new(catalog, Arc::new(NoHints))
    }

    /// Read the session's hint. An unreadable channel counts as no hint.
    pub async fn load_hint(&self, session: Uuid) -> Option<ResolutionHint> {
        match self.hints.read_hint(session).await {
            Ok(hint) => hint,
            Err(e) => {
                tracing::warn!("Hint channel unavailable for session {}: {:#}", session, e);
                None
            }
        }
    }

    /// Load the session's hint and resolve `requested_slug` with it.
    pub async fn resolve_session(
        &self,
        session: Uuid,
        requested_slug: &str,
    ) -> Result<Resolution, ResolveError> {
        let hint = self.load_hint(session).await;
        self.resolve(&Navigation::new(requested_slug).with_hint(hint))
            .await
    }

    /// Run the resolution state machine for one navigation.
    pub async fn resolve(&self, nav: &Navigation) -> Result<Resolution, ResolveError> {
        let requested = normalize(nav.requested_slug());

        if let Some(hint) = nav.hint() {
            match self.hinted_entity(nav, hint, &requested).await {
                Ok(Some(entity)) => {
                    tracing::debug!("Resolved '{}' from hint to '{}'", requested, entity.slug);
                    return Ok(bind_hinted(entity, hint, &requested));
                }
                Ok(None) => {}
                Err(stale @ ResolveError::StaleHint { .. }) => {
                    tracing::warn!("Discarding hint: {}", stale);
                }
                Err(e) => return Err(e),
            }
        }

        self.scan(nav, &requested).await
    }

    /// Clear the session's hint after a resolution that used it has rendered.
    ///
    /// The hint counts as used when its slug echo matches `requested_slug`,
    /// or when the resolution bound the hinted entity. Incomplete resolutions
    /// and resolutions of unrelated slugs leave the hint in place, so a
    /// half-finished attempt can retry from it. Returns whether it was cleared.
    pub async fn commit(
        &self,
        session: Uuid,
        requested_slug: &str,
        resolution: &Resolution,
    ) -> Result<bool, ResolveError> {
        if !resolution.is_complete() {
            return Ok(false);
        }

        let hint = self
            .hints
            .read_hint(session)
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("{:#}", e)))?;
        let Some(hint) = hint else {
            return Ok(false);
        };

        let requested = normalize(requested_slug);
        let echo_matches = hint
            .slug_echo
            .as_deref()
            .is_some_and(|echo| normalize(echo) == requested);
        let bound_hinted_entity = resolution.step == ResolutionStep::HintedEntity
            && hint.entity_slug.as_deref() == Some(resolution.entity.slug.as_str());
        if !echo_matches && !bound_hinted_entity {
            tracing::debug!(
                "Keeping hint for session {}: resolution of '{}' did not use it",
                session,
                requested_slug
            );
            return Ok(false);
        }

        self.hints
            .clear_hint(session)
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("{:#}", e)))
    }

    async fn hinted_entity(
        &self,
        nav: &Navigation,
        hint: &ResolutionHint,
        requested: &str,
    ) -> Result<Option<ContentEntity>, ResolveError> {
        let Some(entity_slug) = hint.entity_slug.as_deref().filter(|s| !s.trim().is_empty())
        else {
            return Ok(None);
        };

        if let Some(echo) = hint.slug_echo.as_deref() {
            if normalize(echo) != requested {
                return Err(ResolveError::StaleHint {
                    echo: echo.to_string(),
                    requested: nav.requested_slug().to_string(),
                });
            }
        }

        // Prefer an already loaded catalog over another round trip.
        let entity = match nav.catalog.get() {
            Some(catalog) => catalog.iter().find(|e| e.slug == entity_slug).cloned(),
            None => self
                .catalog
                .fetch_entity(entity_slug)
                .await
                .map_err(|e| ResolveError::SourceUnavailable(format!("{:#}", e)))?,
        };

        if entity.is_none() {
            tracing::warn!(
                "Hinted entity '{}' is not in the catalog, falling back to scan",
                entity_slug
            );
        }
        Ok(entity)
    }

    async fn scan(&self, nav: &Navigation, requested: &str) -> Result<Resolution, ResolveError> {
        if requested.is_empty() {
            return Err(ResolveError::NotFound(nav.requested_slug().to_string()));
        }

        let catalog = nav.catalog(self.catalog.as_ref()).await?;
        tracing::debug!("Scanning {} entities for '{}'", catalog.len(), requested);

        for entity in catalog.iter() {
            if let Some(sub_item) = entity
                .features
                .iter()
                .find(|f| normalize(f.title()) == requested)
            {
                return Ok(Resolution {
                    display_title: sub_item.title().to_string(),
                    sub_item: Some(sub_item.clone()),
                    entity: entity.clone(),
                    step: ResolutionStep::CatalogScan,
                });
            }
        }

        Err(ResolveError::NotFound(nav.requested_slug().to_string()))
    }
}

fn bind_hinted(entity: ContentEntity, hint: &ResolutionHint, requested: &str) -> Resolution {
    let hinted_title = hint
        .sub_item_title
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    let (display_title, sub_item) = match hinted_title {
        Some(title) => (title.to_string(), entity.feature_titled(title).cloned()),
        None => (
            humanize(requested),
            entity
                .features
                .iter()
                .find(|f| normalize(f.title()) == requested)
                .cloned(),
        ),
    };

    Resolution {
        entity,
        sub_item,
        display_title,
        step: ResolutionStep::HintedEntity,
    }
}
