use pulldown_cmark::{html, CowStr, Event, Tag};
use serde::{Deserialize, Serialize};

use super::{locate_headings, parse_events, HeadingRecord};

/// Markdown rendered to HTML, with the headings the renderer anchored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html: String,
    /// Every rendered heading, all levels, in document order.
    pub headings: Vec<HeadingRecord>,
}

/// Render markdown to HTML, giving every heading element the normalized id
/// of its plain text.
pub fn render_markdown(markdown: &str) -> RenderedDocument {
    let mut events = parse_events(markdown);
    let spans = locate_headings(&events);

    for span in &spans {
        if span.record.id.is_empty() {
            continue;
        }
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[span.start] {
            *id = Some(CowStr::from(span.record.id.clone()));
        }
    }

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());

    RenderedDocument {
        html: output,
        headings: spans.into_iter().map(|span| span.record).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headings::extract_headings;

    #[test]
    fn heading_elements_carry_normalized_ids() {
        let rendered = render_markdown("## Fast Onboarding\n\nBody.\n\n### Step *One*\n");
        assert!(rendered.html.contains(r#"<h2 id="fast-onboarding">"#));
        assert!(rendered.html.contains(r#"<h3 id="step-one">"#));
    }

    #[test]
    fn renderer_and_extractor_agree_on_ids() {
        let doc = "# Overview\n\n## [Docs](https://example.com/docs)\n\n### Run `cargo test` ###\n\n## Crème Brûlée\n";
        let rendered = render_markdown(doc);
        let extracted = extract_headings(doc);

        let rendered_toc: Vec<_> = rendered
            .headings
            .into_iter()
            .filter(|h| h.level == 2 || h.level == 3)
            .collect();
        assert_eq!(rendered_toc, extracted);
        for heading in &extracted {
            assert!(rendered.html.contains(&format!(r#"id="{}""#, heading.id)));
        }
    }

    #[test]
    fn reference_link_and_setext_headings_match_the_toc() {
        let doc = "Overview\n--------\n\n## See [Docs][d]\n\n### Shortcut [Guide]\n\n[d]: https://example.com\n[Guide]: /guide\n";
        let rendered = render_markdown(doc);
        let extracted = extract_headings(doc);

        let ids: Vec<_> = extracted.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["overview", "see-docs", "shortcut-guide"]);
        for id in ids {
            assert!(rendered.html.contains(&format!(r#"id="{}""#, id)));
        }
    }

    #[test]
    fn empty_heading_gets_no_id() {
        let rendered = render_markdown("## ?\n");
        assert!(rendered.html.contains("<h2>"));
        assert_eq!(rendered.headings[0].id, "");
    }
}
