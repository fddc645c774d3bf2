mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::metadata::{normalize_path, MetadataStore};
use crate::models::*;
use crate::resolver::{CatalogSource, HintChannel};
use crate::slug::normalize;

/// How long a resolution hint stays readable when none is configured.
pub const DEFAULT_HINT_TTL_SECS: i64 = 30 * 60;

/// SQLite-backed catalog, metadata-override store and hint channel.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    hint_ttl: Duration,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "slugline")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("slugline.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            hint_ttl: Duration::seconds(DEFAULT_HINT_TTL_SECS),
        }
    }

    /// Change how long written hints stay readable.
    pub fn with_hint_ttl(mut self, ttl: Duration) -> Self {
        self.hint_ttl = ttl;
        self
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database lock poisoned"))
    }

    // ============================================================
    // Catalog operations
    // ============================================================

    /// All entities in catalog order.
    pub fn get_all_entities(&self) -> Result<Vec<ContentEntity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT slug, title, summary, updated_at FROM entities ORDER BY position, slug",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(slug, title, summary, updated_at)| {
                let features = query_features(&conn, &slug)?;
                Ok(ContentEntity {
                    slug,
                    title,
                    summary,
                    features,
                    updated_at: Some(parse_datetime(updated_at)),
                })
            })
            .collect()
    }

    pub fn get_entity(&self, slug: &str) -> Result<Option<ContentEntity>> {
        let conn = self.lock()?;
        query_entity(&conn, slug)
    }

    /// Create or replace an entity. The slug is normalized before storage;
    /// a new entity goes to the end of the catalog, an existing one keeps its
    /// position.
    pub fn upsert_entity(&self, slug: &str, input: UpsertEntityInput) -> Result<ContentEntity> {
        let slug = normalize(slug);
        if slug.is_empty() {
            anyhow::bail!("Invalid entity slug: must contain at least one letter or digit");
        }
        if input.title.trim().is_empty() {
            anyhow::bail!("Invalid entity title: must not be empty");
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        write_entity(&tx, &slug, &input)?;
        tx.commit()?;

        query_entity(&conn, &slug)?
            .ok_or_else(|| anyhow::anyhow!("Entity '{}' vanished after write", slug))
    }

    pub fn delete_entity(&self, slug: &str) -> Result<bool> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entity_features WHERE entity_slug = ?", [slug])?;
        let rows = tx.execute("DELETE FROM entities WHERE slug = ?", [slug])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Replace the whole catalog, keeping the given order.
    ///
    /// Entities whose slug normalizes to nothing, or to a slug already
    /// written, are skipped. Returns how many entities were stored.
    pub fn replace_catalog(&self, entities: Vec<ContentEntity>) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entity_features", [])?;
        tx.execute("DELETE FROM entities", [])?;

        let mut seen = HashSet::new();
        for entity in entities {
            let slug = normalize(&entity.slug);
            if slug.is_empty() {
                tracing::warn!("Skipping entity '{}' with an empty slug", entity.title);
                continue;
            }
            if !seen.insert(slug.clone()) {
                tracing::warn!(
                    "Skipping entity '{}': slug '{}' is already in the catalog",
                    entity.title,
                    slug
                );
                continue;
            }
            write_entity(
                &tx,
                &slug,
                &UpsertEntityInput {
                    title: entity.title,
                    summary: entity.summary,
                    features: entity.features,
                },
            )?;
        }

        tx.commit()?;
        tracing::info!("Replaced catalog with {} entities", seen.len());
        Ok(seen.len())
    }

    // ============================================================
    // Path metadata operations
    // ============================================================

    pub fn get_path_metadata(&self) -> Result<Vec<PathMetadata>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT path, title, description, keywords, updated_at FROM path_metadata ORDER BY path",
        )?;

        let overrides = stmt
            .query_map([], |row| {
                Ok(PathMetadata {
                    path: row.get(0)?,
                    layer: MetadataLayer {
                        title: row.get(1)?,
                        description: row.get(2)?,
                        keywords: row.get(3)?,
                    },
                    updated_at: Some(parse_datetime(row.get::<_, String>(4)?)),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(overrides)
    }

    /// Replace the whole override collection.
    ///
    /// Paths are normalized on the way in; when two entries normalize to the
    /// same path the later one wins.
    pub fn replace_path_metadata(&self, overrides: Vec<PathMetadata>) -> Result<Vec<PathMetadata>> {
        {
            let conn = self.lock()?;
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();

            tx.execute("DELETE FROM path_metadata", [])?;
            for entry in &overrides {
                tx.execute(
                    "INSERT OR REPLACE INTO path_metadata (path, title, description, keywords, updated_at)
                     VALUES (?, ?, ?, ?, ?)",
                    (
                        normalize_path(&entry.path),
                        &entry.layer.title,
                        &entry.layer.description,
                        &entry.layer.keywords,
                        &now,
                    ),
                )?;
            }
            tx.commit()?;
        }

        self.get_path_metadata()
    }

    // ============================================================
    // Hint operations
    // ============================================================

    /// The session's unexpired hint, if any key is set.
    pub fn get_hint(&self, session: Uuid) -> Result<Option<ResolutionHint>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM hints WHERE session_id = ? AND expires_at > ?")?;

        let rows = stmt
            .query_map(
                (session.to_string(), Utc::now().timestamp_millis()),
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut hint = ResolutionHint::default();
        for (key, value) in rows {
            match HintKey::from_str(&key) {
                Some(key) => hint.set(key, value),
                None => tracing::warn!("Ignoring unknown hint key '{}'", key),
            }
        }

        Ok((!hint.is_empty()).then_some(hint))
    }

    /// Replace every key of the session's hint and restart its expiry.
    pub fn set_hint(&self, session: Uuid, hint: &ResolutionHint) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let expires_at = (Utc::now() + self.hint_ttl).timestamp_millis();

        tx.execute(
            "DELETE FROM hints WHERE session_id = ? OR expires_at <= ?",
            (session.to_string(), Utc::now().timestamp_millis()),
        )?;
        for (key, value) in hint.entries() {
            tx.execute(
                "INSERT INTO hints (session_id, key, value, expires_at) VALUES (?, ?, ?, ?)",
                (session.to_string(), key.as_str(), value, expires_at),
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove all hint keys of the session together.
    pub fn delete_hint(&self, session: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM hints WHERE session_id = ?",
            [session.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn purge_expired_hints(&self) -> Result<usize> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM hints WHERE expires_at <= ?",
            [Utc::now().timestamp_millis()],
        )?;
        Ok(rows)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            hint_ttl: self.hint_ttl,
        }
    }
}

#[async_trait]
impl CatalogSource for Database {
    async fn fetch_catalog(&self) -> Result<Vec<ContentEntity>> {
        self.get_all_entities()
    }

    async fn fetch_entity(&self, slug: &str) -> Result<Option<ContentEntity>> {
        self.get_entity(slug)
    }
}

#[async_trait]
impl HintChannel for Database {
    async fn read_hint(&self, session: Uuid) -> Result<Option<ResolutionHint>> {
        self.get_hint(session)
    }

    async fn write_hint(&self, session: Uuid, hint: &ResolutionHint) -> Result<()> {
        self.set_hint(session, hint)
    }

    async fn clear_hint(&self, session: Uuid) -> Result<bool> {
        self.delete_hint(session)
    }
}

#[async_trait]
impl MetadataStore for Database {
    async fn load_overrides(&self) -> Result<Vec<PathMetadata>> {
        self.get_path_metadata()
    }

    async fn save_overrides(&self, overrides: Vec<PathMetadata>) -> Result<Vec<PathMetadata>> {
        self.replace_path_metadata(overrides)
    }
}

fn query_entity(conn: &Connection, slug: &str) -> Result<Option<ContentEntity>> {
    let row = conn
        .query_row(
            "SELECT slug, title, summary, updated_at FROM entities WHERE slug = ?",
            [slug],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((slug, title, summary, updated_at)) = row else {
        return Ok(None);
    };

    let features = query_features(conn, &slug)?;
    Ok(Some(ContentEntity {
        slug,
        title,
        summary,
        features,
        updated_at: Some(parse_datetime(updated_at)),
    }))
}

fn query_features(conn: &Connection, slug: &str) -> Result<Vec<SubItem>> {
    let mut stmt = conn.prepare(
        "SELECT title, content FROM entity_features WHERE entity_slug = ? ORDER BY position",
    )?;

    let features = stmt
        .query_map([slug], |row| {
            let title: String = row.get(0)?;
            let content: Option<String> = row.get(1)?;
            Ok(match content {
                Some(content) => SubItem::Detailed { title, content },
                None => SubItem::Titled(title),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(features)
}

fn write_entity(conn: &Connection, slug: &str, input: &UpsertEntityInput) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    let updated = conn.execute(
        "UPDATE entities SET title = ?, summary = ?, updated_at = ? WHERE slug = ?",
        (&input.title, &input.summary, &now, slug),
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT INTO entities (slug, title, summary, position, created_at, updated_at)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(position) + 1, 0) FROM entities), ?, ?)",
            (slug, &input.title, &input.summary, &now, &now),
        )?;
    }

    conn.execute("DELETE FROM entity_features WHERE entity_slug = ?", [slug])?;
    for (position, feature) in input.features.iter().enumerate() {
        conn.execute(
            "INSERT INTO entity_features (entity_slug, position, title, content) VALUES (?, ?, ?, ?)",
            (slug, position as i64, feature.title(), feature.content()),
        )?;
    }

    Ok(())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
