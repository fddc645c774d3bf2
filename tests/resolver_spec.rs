//! Resolver integration tests.
//!
//! Tests are organized by branch of the resolution state machine:
//! - Hinted entity: a valid hint binds the entity without a catalog scan
//! - Stale hints: a hint written for another slug falls through to the scan
//! - Catalog scan: normalized sub-item titles are matched in catalog order
//! - Commit: hints are cleared only after a complete resolution

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slugline::db::Database;
use slugline::models::*;
use slugline::resolver::*;
use uuid::Uuid;

/// Catalog double that counts fetches.
#[derive(Default)]
struct CountingCatalog {
    entities: Vec<ContentEntity>,
    catalog_fetches: AtomicUsize,
    entity_fetches: AtomicUsize,
    fail: bool,
}

impl CountingCatalog {
    fn with(entities: Vec<ContentEntity>) -> Arc<Self> {
        Arc::new(Self {
            entities,
            ..Default::default()
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    fn catalog_fetches(&self) -> usize {
        self.catalog_fetches.load(Ordering::SeqCst)
    }

    fn entity_fetches(&self) -> usize {
        self.entity_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for CountingCatalog {
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<ContentEntity>> {
        self.catalog_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("catalog offline");
        }
        Ok(self.entities.clone())
    }

    async fn fetch_entity(&self, slug: &str) -> anyhow::Result<Option<ContentEntity>> {
        self.entity_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("catalog offline");
        }
        Ok(self.entities.iter().find(|e| e.slug == slug).cloned())
    }
}

/// In-memory hint channel.
#[derive(Default)]
struct MemoryHints {
    hints: Mutex<HashMap<Uuid, ResolutionHint>>,
}

#[async_trait]
impl HintChannel for MemoryHints {
    async fn read_hint(&self, session: Uuid) -> anyhow::Result<Option<ResolutionHint>> {
        Ok(self.hints.lock().unwrap().get(&session).cloned())
    }

    async fn write_hint(&self, session: Uuid, hint: &ResolutionHint) -> anyhow::Result<()> {
        self.hints.lock().unwrap().insert(session, hint.clone());
        Ok(())
    }

    async fn clear_hint(&self, session: Uuid) -> anyhow::Result<bool> {
        Ok(self.hints.lock().unwrap().remove(&session).is_some())
    }
}

fn entity(slug: &str, title: &str, features: &[&str]) -> ContentEntity {
    ContentEntity {
        slug: slug.to_string(),
        title: title.to_string(),
        summary: None,
        features: features
            .iter()
            .map(|f| SubItem::Titled(f.to_string()))
            .collect(),
        updated_at: None,
    }
}

fn catalog() -> Vec<ContentEntity> {
    vec![
        entity("onboarding", "Onboarding", &["Fast Onboarding", "Data Import"]),
        entity("support", "Support", &["Live Chat", "Fast Onboarding"]),
        entity("pricing", "Pricing", &["Free Tier"]),
    ]
}

fn hint(entity_slug: &str, sub_item_title: Option<&str>, echo: &str) -> ResolutionHint {
    ResolutionHint {
        entity_slug: Some(entity_slug.to_string()),
        entity_title: None,
        sub_item_title: sub_item_title.map(String::from),
        slug_echo: Some(echo.to_string()),
    }
}

mod hinted_entity {
    use super::*;

    #[tokio::test]
    async fn valid_hint_never_scans_the_catalog() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("live-chat")
            .with_hint(Some(hint("support", Some("Live Chat"), "live-chat")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.step, ResolutionStep::HintedEntity);
        assert_eq!(resolution.entity.slug, "support");
        assert_eq!(resolution.display_title, "Live Chat");
        assert_eq!(source.catalog_fetches(), 0);
        assert_eq!(source.entity_fetches(), 1);
    }

    #[tokio::test]
    async fn hinted_sub_item_title_is_trusted_as_is() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("live-chat")
            .with_hint(Some(hint("support", Some("Chat (beta)"), "live-chat")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.display_title, "Chat (beta)");
        assert!(resolution.sub_item.is_none());
    }

    #[tokio::test]
    async fn missing_sub_item_title_derives_display_title() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("live-chat").with_hint(Some(hint("support", None, "live-chat")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.display_title, "Live Chat");
        assert_eq!(resolution.step, ResolutionStep::HintedEntity);
        assert_eq!(source.catalog_fetches(), 0);
    }

    #[tokio::test]
    async fn hint_without_echo_is_trusted() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("free-tier").with_hint(Some(ResolutionHint {
            entity_slug: Some("pricing".to_string()),
            ..Default::default()
        }));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.entity.slug, "pricing");
        assert_eq!(source.catalog_fetches(), 0);
    }

    #[tokio::test]
    async fn prefetched_catalog_serves_the_hinted_entity() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("live-chat")
            .with_hint(Some(hint("support", Some("Live Chat"), "live-chat")))
            .with_catalog(catalog());
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.entity.slug, "support");
        assert_eq!(source.catalog_fetches(), 0);
        assert_eq!(source.entity_fetches(), 0);
    }

    #[tokio::test]
    async fn unknown_hinted_entity_falls_back_to_scan() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("free-tier").with_hint(Some(hint("retired", None, "free-tier")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.step, ResolutionStep::CatalogScan);
        assert_eq!(resolution.entity.slug, "pricing");
        assert_eq!(source.catalog_fetches(), 1);
    }
}

mod stale_hint {
    use super::*;

    #[tokio::test]
    async fn mismatched_echo_is_discarded_and_catalog_is_scanned() {
        let source = CountingCatalog::with(vec![entity("support", "Support", &["Support"])]);
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("support").with_hint(Some(hint("pricing", None, "pricing")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.step, ResolutionStep::CatalogScan);
        assert_eq!(resolution.entity.slug, "support");
        assert_eq!(source.catalog_fetches(), 1);
        assert_eq!(source.entity_fetches(), 0);
    }

    #[tokio::test]
    async fn echo_is_compared_after_normalization() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let nav = Navigation::new("live-chat").with_hint(Some(hint("support", None, "Live Chat")));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.step, ResolutionStep::HintedEntity);
    }
}

mod catalog_scan {
    use super::*;

    #[tokio::test]
    async fn matches_sub_item_by_normalized_title() {
        let source = CountingCatalog::with(vec![entity("support", "Support", &["Fast Onboarding"])]);
        let resolver = Resolver::without_hints(source.clone());

        let resolution = resolver.resolve(&Navigation::new("fast-onboarding")).await.unwrap();

        assert_eq!(resolution.entity.slug, "support");
        assert_eq!(
            resolution.sub_item,
            Some(SubItem::Titled("Fast Onboarding".to_string()))
        );
        assert_eq!(resolution.display_title, "Fast Onboarding");
    }

    #[tokio::test]
    async fn first_entity_in_catalog_order_wins() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let resolution = resolver.resolve(&Navigation::new("fast-onboarding")).await.unwrap();

        assert_eq!(resolution.entity.slug, "onboarding");
    }

    #[tokio::test]
    async fn diacritics_in_titles_still_match() {
        let source = CountingCatalog::with(vec![entity("urunler", "Ürünler", &["Özel Ürün"])]);
        let resolver = Resolver::without_hints(source.clone());

        let resolution = resolver.resolve(&Navigation::new("ozel-urun")).await.unwrap();

        assert_eq!(resolution.display_title, "Özel Ürün");
    }

    #[tokio::test]
    async fn unmatched_slug_in_empty_catalog_is_not_found() {
        let source = CountingCatalog::with(vec![]);
        let resolver = Resolver::without_hints(source.clone());

        let err = resolver.resolve(&Navigation::new("nothing-here")).await.unwrap_err();

        assert_eq!(err, ResolveError::NotFound("nothing-here".to_string()));
    }

    #[tokio::test]
    async fn entity_titles_are_not_matched() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let err = resolver.resolve(&Navigation::new("pricing")).await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_slug_is_not_found_without_fetching() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());

        let err = resolver.resolve(&Navigation::new("?")).await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound(_)));
        assert_eq!(source.catalog_fetches(), 0);
    }

    #[tokio::test]
    async fn catalog_is_fetched_once_per_navigation() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::without_hints(source.clone());
        let nav = Navigation::new("missing");

        assert!(resolver.resolve(&nav).await.is_err());
        assert!(resolver.resolve(&nav).await.is_err());

        assert_eq!(source.catalog_fetches(), 1);
    }

    #[tokio::test]
    async fn catalog_offered_late_is_used_when_nothing_was_loaded() {
        let source = CountingCatalog::with(vec![]);
        let resolver = Resolver::without_hints(source.clone());
        let nav = Navigation::new("free-tier");

        assert!(nav.offer_catalog(catalog()));
        assert!(!nav.offer_catalog(vec![]));
        let resolution = resolver.resolve(&nav).await.unwrap();

        assert_eq!(resolution.entity.slug, "pricing");
        assert_eq!(source.catalog_fetches(), 0);
    }

    #[tokio::test]
    async fn unavailable_catalog_is_reported_and_retried() {
        let source = CountingCatalog::failing();
        let resolver = Resolver::without_hints(source.clone());
        let nav = Navigation::new("free-tier");

        let err = resolver.resolve(&nav).await.unwrap_err();
        assert!(matches!(err, ResolveError::SourceUnavailable(_)));

        let view = ResolveView::from_outcome(&nav, Err(err));
        assert_eq!(
            view,
            ResolveView::Unavailable {
                requested_slug: "free-tier".to_string(),
                display_title: "Free Tier".to_string(),
                entity_title: None,
                reason: "catalog offline".to_string(),
            }
        );

        assert!(resolver.resolve(&nav).await.is_err());
        assert_eq!(source.catalog_fetches(), 2);
    }

    #[tokio::test]
    async fn unavailable_view_names_the_hinted_entity() {
        let source = CountingCatalog::failing();
        let resolver = Resolver::without_hints(source.clone());
        let nav = Navigation::new("live-chat").with_hint(Some(ResolutionHint {
            entity_slug: Some("support".to_string()),
            entity_title: Some("Support".to_string()),
            sub_item_title: None,
            slug_echo: Some("live-chat".to_string()),
        }));

        let outcome = resolver.resolve(&nav).await;

        match ResolveView::from_outcome(&nav, outcome) {
            ResolveView::Unavailable { entity_title, display_title, .. } => {
                assert_eq!(entity_title.as_deref(), Some("Support"));
                assert_eq!(display_title, "Live Chat");
            }
            other => panic!("expected an unavailable view, got {:?}", other),
        }
    }
}

mod commit {
    use super::*;

    #[tokio::test]
    async fn hint_survives_until_commit() {
        let source = CountingCatalog::with(catalog());
        let hints = Arc::new(MemoryHints::default());
        let resolver = Resolver::new(source.clone(), hints.clone());
        let session = Uuid::new_v4();
        hints
            .write_hint(session, &hint("support", Some("Live Chat"), "live-chat"))
            .await
            .unwrap();

        let resolution = resolver.resolve_session(session, "live-chat").await.unwrap();
        assert!(hints.read_hint(session).await.unwrap().is_some());

        assert!(resolver.commit(session, "live-chat", &resolution).await.unwrap());
        assert!(hints.read_hint(session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unrelated_resolution_keeps_hint() {
        let source = CountingCatalog::with(catalog());
        let hints = Arc::new(MemoryHints::default());
        let resolver = Resolver::new(source.clone(), hints.clone());
        let session = Uuid::new_v4();
        hints
            .write_hint(session, &hint("support", Some("Live Chat"), "live-chat"))
            .await
            .unwrap();

        let resolution = resolver
            .resolve(&Navigation::new("free-tier"))
            .await
            .unwrap();

        assert!(!resolver.commit(session, "free-tier", &resolution).await.unwrap());
        assert!(hints.read_hint(session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn hinted_entity_binding_clears_hint_without_echo() {
        let source = CountingCatalog::with(catalog());
        let hints = Arc::new(MemoryHints::default());
        let resolver = Resolver::new(source.clone(), hints.clone());
        let session = Uuid::new_v4();
        hints
            .write_hint(
                session,
                &ResolutionHint {
                    entity_slug: Some("pricing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let resolution = resolver.resolve_session(session, "free-tier").await.unwrap();
        assert_eq!(resolution.step, ResolutionStep::HintedEntity);

        assert!(resolver.commit(session, "free-tier", &resolution).await.unwrap());
        assert!(hints.read_hint(session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_without_a_hint_clears_nothing() {
        let source = CountingCatalog::with(catalog());
        let resolver = Resolver::new(source.clone(), Arc::new(MemoryHints::default()));

        let resolution = resolver
            .resolve(&Navigation::new("free-tier"))
            .await
            .unwrap();

        assert!(!resolver
            .commit(Uuid::new_v4(), "free-tier", &resolution)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_attempt_keeps_hint_for_retry() {
        let source = CountingCatalog::failing();
        let hints = Arc::new(MemoryHints::default());
        let resolver = Resolver::new(source.clone(), hints.clone());
        let session = Uuid::new_v4();
        hints
            .write_hint(session, &hint("support", None, "live-chat"))
            .await
            .unwrap();

        assert!(resolver.resolve_session(session, "live-chat").await.is_err());

        assert!(hints.read_hint(session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn incomplete_resolution_does_not_clear() {
        let source = CountingCatalog::with(catalog());
        let hints = Arc::new(MemoryHints::default());
        let resolver = Resolver::new(source.clone(), hints.clone());
        let session = Uuid::new_v4();
        hints
            .write_hint(session, &hint("support", None, "live-chat"))
            .await
            .unwrap();

        let mut resolution = resolver.resolve_session(session, "live-chat").await.unwrap();
        resolution.display_title = String::new();

        assert!(!resolver.commit(session, "live-chat", &resolution).await.unwrap());
        assert!(hints.read_hint(session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn database_backed_resolution_clears_all_keys() {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        db.replace_catalog(catalog()).expect("Failed to import");
        let resolver = Resolver::new(Arc::new(db.clone()), Arc::new(db.clone()));
        let session = Uuid::new_v4();
        db.set_hint(
            session,
            &ResolutionHint {
                entity_slug: Some("support".to_string()),
                entity_title: Some("Support".to_string()),
                sub_item_title: Some("Live Chat".to_string()),
                slug_echo: Some("live-chat".to_string()),
            },
        )
        .expect("Failed to write hint");

        let resolution = resolver.resolve_session(session, "live-chat").await.unwrap();
        assert_eq!(resolution.step, ResolutionStep::HintedEntity);
        assert!(resolver.commit(session, "live-chat", &resolution).await.unwrap());

        assert!(db.get_hint(session).expect("Query failed").is_none());
    }
}
