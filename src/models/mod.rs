//! Domain models for slugline.
//!
//! # Core Concepts
//!
//! ## Catalog
//!
//! - [`ContentEntity`]: A piece of site content (e.g. a service) addressed by a stable slug,
//!   carrying an ordered list of [`SubItem`]s (e.g. the service's features).
//! - [`SubItem`]: Either a bare title or a titled block of markdown content.
//!
//! ## Metadata
//!
//! - [`MetadataLayer`]: One precedence tier of SEO title/description/keywords.
//! - [`SiteDefaults`]: The process-wide base layer plus fields no page can override.
//! - [`PathMetadata`]: A stored per-path override, edited from the dashboard.
//! - [`PageMetadata`]: The merged record handed to the view layer.
//!
//! ## Ephemeral
//!
//! - [`ResolutionHint`]: Identity remembered from a previous navigation step. Lives in the
//!   hint channel until a resolution that used it has rendered.

mod entity;
mod hint;
mod metadata;

pub use entity::*;
pub use hint::*;
pub use metadata::*;
