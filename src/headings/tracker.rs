use std::collections::HashSet;

use futures::stream::{BoxStream, SelectAll};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::HeadingRecord;

/// Pixels left between the viewport top and a heading scrolled into view.
pub const DEFAULT_SCROLL_OFFSET_PX: i32 = 80;

/// Capability to watch whether an element intersects the viewport.
///
/// The rendering surface implements this; tests implement it with channels.
pub trait VisibilityObserver: Send + Sync {
    /// Stream of intersection changes for the element with `element_id`.
    /// Dropping the stream ends the observation.
    fn observe_visibility(&self, element_id: &str) -> BoxStream<'static, bool>;
}

/// Where the view should scroll after a table-of-contents click.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrollTarget {
    pub element_id: String,
    pub offset_px: i32,
}

/// Tracks which heading is active while a document is on screen.
///
/// The active heading is the one that most recently started intersecting the
/// viewport. When it leaves, the first still-visible heading in document
/// order takes over; when nothing is visible the last active heading stays.
pub struct ActiveHeadingTracker {
    headings: Vec<HeadingRecord>,
    visible: HashSet<String>,
    active: Option<String>,
    updates: SelectAll<BoxStream<'static, (String, bool)>>,
    offset_px: i32,
}

impl ActiveHeadingTracker {
    pub fn new(offset_px: i32) -> Self {
        Self {
            headings: Vec::new(),
            visible: HashSet::new(),
            active: None,
            updates: SelectAll::new(),
            offset_px,
        }
    }

    /// Observe a new set of headings.
    ///
    /// Subscriptions for the previous content are dropped first, so callbacks
    /// for removed elements never reach the tracker.
    pub fn attach(&mut self, observer: &dyn VisibilityObserver, headings: Vec<HeadingRecord>) {
        self.updates = SelectAll::new();
        self.visible.clear();
        self.active = None;

        let mut subscribed = HashSet::new();
        for heading in &headings {
            if heading.id.is_empty() || !subscribed.insert(heading.id.clone()) {
                continue;
            }
            let id = heading.id.clone();
            let stream = observer
                .observe_visibility(&id)
                .map(move |visible| (id.clone(), visible))
                .boxed();
            self.updates.push(stream);
        }

        tracing::debug!(
            "Observing {} headings ({} unique ids)",
            headings.len(),
            subscribed.len()
        );
        self.headings = headings;
    }

    /// Drop every subscription without attaching new content.
    pub fn detach(&mut self) {
        self.updates = SelectAll::new();
        self.visible.clear();
        self.headings.clear();
        self.active = None;
    }

    pub fn headings(&self) -> &[HeadingRecord] {
        &self.headings
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Handle a table-of-contents click.
    ///
    /// The heading becomes active immediately instead of waiting for the
    /// visibility stream to report the scroll. Returns `None` for ids that
    /// are not part of the current content.
    pub fn select(&mut self, id: &str) -> Option<ScrollTarget> {
        if !self.headings.iter().any(|h| h.id == id) {
            return None;
        }
        self.active = Some(id.to_string());
        Some(ScrollTarget {
            element_id: id.to_string(),
            offset_px: self.offset_px,
        })
    }

    /// Apply one visibility change. Returns true when the active heading changed.
    pub fn apply(&mut self, id: &str, visible: bool) -> bool {
        let before = self.active.clone();

        if visible {
            self.visible.insert(id.to_string());
            self.active = Some(id.to_string());
        } else {
            self.visible.remove(id);
            if self.active.as_deref() == Some(id) {
                if let Some(next) = self.headings.iter().find(|h| self.visible.contains(&h.id)) {
                    self.active = Some(next.id.clone());
                }
            }
        }

        self.active != before
    }

    /// Wait for the next change of the active heading.
    ///
    /// Returns `None` once every subscription has ended.
    pub async fn next_change(&mut self) -> Option<String> {
        while let Some((id, visible)) = self.updates.next().await {
            if self.apply(&id, visible) {
                return self.active.clone();
            }
        }
        None
    }
}

impl Default for ActiveHeadingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_OFFSET_PX)
    }
}
