//! Heading extraction, anchored rendering and active-heading tracking.
//!
//! The table of contents and the rendered page must agree on every heading
//! id, so both are built from the same full-document pulldown-cmark event
//! stream by [`locate_headings`]. A heading's id is its plain text passed
//! through [`crate::slug::normalize`]. Reference links, setext headings and
//! fenced code therefore get exactly the treatment the renderer gives them.
//!
//! Two headings that normalize to the same text share an id. They are not
//! deduplicated; a DOM lookup by id lands on whichever element the browser
//! resolves, which in practice is the last one rendered.

mod render;
mod tracker;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::slug::normalize;

pub use render::{render_markdown, RenderedDocument};
pub use tracker::{
    ActiveHeadingTracker, ScrollTarget, VisibilityObserver, DEFAULT_SCROLL_OFFSET_PX,
};

/// Major section level.
pub const MAJOR_LEVEL: u8 = 2;
/// Minor section level.
pub const MINOR_LEVEL: u8 = 3;

/// One entry of a table of contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadingRecord {
    /// Anchor id; equal to the id the renderer puts on the heading element.
    pub id: String,
    /// Plain display text of the heading.
    pub text: String,
    pub level: u8,
}

/// A heading found in an event stream.
pub(crate) struct HeadingSpan {
    /// Index of the heading's `Start` event.
    pub start: usize,
    pub record: HeadingRecord,
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
}

/// Parse a whole document with the options shared by extraction and rendering.
pub(crate) fn parse_events(markdown: &str) -> Vec<Event<'_>> {
    Parser::new_ext(markdown, markdown_options()).collect()
}

/// Append the plain-text contribution of one inline event.
fn push_plain_text(buf: &mut String, event: &Event<'_>) {
    match event {
        Event::Text(text) | Event::Code(text) => buf.push_str(text),
        Event::SoftBreak | Event::HardBreak => buf.push(' '),
        _ => {}
    }
}

/// Every heading of the stream, all levels, in document order.
///
/// Inline markup is reduced to the text a reader sees: `[Docs][d]` becomes
/// `Docs`, `` `cargo` `` becomes `cargo`.
pub(crate) fn locate_headings(events: &[Event<'_>]) -> Vec<HeadingSpan> {
    let mut spans = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { level, .. }) = &events[i] else {
            i += 1;
            continue;
        };

        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() && !matches!(events[end], Event::End(TagEnd::Heading(_))) {
            push_plain_text(&mut text, &events[end]);
            end += 1;
        }
        let text = text.trim().to_string();

        spans.push(HeadingSpan {
            start: i,
            record: HeadingRecord {
                id: normalize(&text),
                text,
                level: *level as u8,
            },
        });
        i = end + 1;
    }

    spans
}

/// Extract the major and minor headings of a markdown document in order.
///
/// ATX and setext headings both count; anything inside code blocks does not.
/// Headings whose text normalizes to nothing are skipped, since the renderer
/// gives them no anchor. The result is recomputed from scratch on every call.
pub fn extract_headings(markdown: &str) -> Vec<HeadingRecord> {
    locate_headings(&parse_events(markdown))
        .into_iter()
        .map(|span| span.record)
        .filter(|h| (h.level == MAJOR_LEVEL || h.level == MINOR_LEVEL) && !h.id.is_empty())
        .collect()
}
