//! Topic isolation.
//!
//! A section that strings together clearly separate subjects, each introduced
//! by its own anchor line (`**Billing**`, `Search:`), is split into sibling
//! sub-sections before any candidate exists. Each sub-section is then
//! classified and synthesized on its own; the parent never emits.

use plansift_model::markers::bullet_prefix_len;
use plansift_model::static_regex;
use plansift_model::text::has_concrete_content;
use plansift_model::{IdGenerator, Section};
use std::collections::BTreeSet;

static_regex!(fn bold_anchor = r"^\s*(?:\*\*|__)(?P<label>[^*_]{2,60}?)\s*:?\s*(?:\*\*|__)\s*:?\s*$");

static_regex!(fn colon_anchor = r"^\s*(?P<label>[A-Z][\w&/'() -]{1,50}?)\s*:\s*$");

const MAX_ANCHOR_WORDS: usize = 6;

/// Lines of non-anchor text allowed before the first anchor. They belong to no
/// sub-section.
const MAX_LEAD_LINES: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAnchor {
    pub line: usize,
    pub label: String,
    pub raw: String,
}

fn parse_anchor(line: &str) -> Option<String> {
    if bullet_prefix_len(line).is_some() {
        return None;
    }
    let caps = bold_anchor()
        .captures(line)
        .or_else(|| colon_anchor().captures(line))?;
    let label = caps.name("label")?.as_str().trim();
    if label.is_empty() || label.split_whitespace().count() > MAX_ANCHOR_WORDS {
        return None;
    }
    Some(label.to_string())
}

/// Anchor lines in a section body, in order.
pub fn topic_anchors(section: &Section) -> Vec<TopicAnchor> {
    section
        .body_lines()
        .filter_map(|(line, text)| {
            parse_anchor(text).map(|label| TopicAnchor {
                line,
                label,
                raw: text.to_string(),
            })
        })
        .collect()
}

/// Anchors whose label names something concrete.
pub fn usable_anchor_count(section: &Section) -> usize {
    topic_anchors(section)
        .iter()
        .filter(|a| has_concrete_content(&a.label))
        .count()
}

/// Split `section` on its topic anchors, or `None` when it is a single topic.
///
/// Splitting needs at least two distinct anchor labels, every anchor followed by
/// some content, and at most one line of lead-in text.
pub fn isolate_topics(section: &Section, ids: &mut IdGenerator) -> Option<Vec<Section>> {
    if section.is_subsection() {
        return None;
    }
    let anchors = topic_anchors(section);
    let distinct: BTreeSet<String> = anchors.iter().map(|a| a.label.to_lowercase()).collect();
    if distinct.len() < 2 {
        return None;
    }

    let lines: Vec<(usize, &str)> = section.body_lines().collect();
    let lead = lines
        .iter()
        .take_while(|(n, _)| *n < anchors[0].line)
        .filter(|(_, l)| !l.trim().is_empty())
        .count();
    if lead > MAX_LEAD_LINES {
        return None;
    }

    let mut spans = Vec::with_capacity(anchors.len());
    for (i, anchor) in anchors.iter().enumerate() {
        let next = anchors.get(i + 1).map(|a| a.line).unwrap_or(usize::MAX);
        let mut body: Vec<&str> = lines
            .iter()
            .filter(|(n, _)| *n > anchor.line && *n < next)
            .map(|(_, l)| *l)
            .collect();
        while body.last().is_some_and(|l| l.trim().is_empty()) {
            body.pop();
        }
        if body.iter().all(|l| l.trim().is_empty()) {
            return None;
        }
        spans.push((anchor, body));
    }

    let children = spans
        .into_iter()
        .map(|(anchor, body)| {
            Section::child_of(
                section,
                ids.next_section_id(),
                anchor.label.clone(),
                Some(&anchor.raw),
                anchor.line + 1,
                &body,
            )
        })
        .collect();
    Some(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansift_model::{MarkdownSectionProvider, NoteInput, SectionProvider};

    fn section(text: &str, ids: &mut IdGenerator) -> Section {
        MarkdownSectionProvider
            .sections(&NoteInput::new("n1", text), ids)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn parses_anchor_forms() {
        assert_eq!(parse_anchor("**Billing**"), Some("Billing".into()));
        assert_eq!(parse_anchor("**Billing:**"), Some("Billing".into()));
        assert_eq!(parse_anchor("Search:"), Some("Search".into()));
        assert_eq!(parse_anchor("- Search:"), None);
        assert_eq!(parse_anchor("We talked about this:"), Some("We talked about this".into()));
        assert_eq!(parse_anchor("this is a plain sentence."), None);
    }

    #[test]
    fn splits_mixed_topics() {
        let mut ids = IdGenerator::new();
        let parent = section(
            "## Weekly sync\n**Billing**\nCustomers want invoice export.\n\n\
             **Search**\nSearch latency regressed after the deploy.\n",
            &mut ids,
        );
        let children = isolate_topics(&parent, &mut ids).unwrap();
        assert_eq!(children.len(), 2);

        assert_eq!(children[0].heading, "Billing");
        assert_eq!(children[0].parent_id.as_ref(), Some(&parent.id));
        assert_eq!(children[0].context_heading.as_deref(), Some("Weekly sync"));
        assert_eq!(children[0].start_line, 2);
        assert_eq!(children[0].body, "Customers want invoice export.");
        assert_eq!(children[0].heading_level, 3);

        assert_eq!(children[1].start_line, 5);
        assert_eq!(children[1].body_start_line, 6);
        assert_ne!(children[0].id, children[1].id);
    }

    #[test]
    fn single_topic_or_empty_anchor_is_not_split() {
        let mut ids = IdGenerator::new();
        let one = section("# A\n**Billing**\ntext\n", &mut ids);
        assert!(isolate_topics(&one, &mut ids).is_none());

        let hollow = section("# A\n**Billing**\n**Search**\ntext\n", &mut ids);
        assert!(isolate_topics(&hollow, &mut ids).is_none());
    }

    #[test]
    fn long_lead_in_blocks_split() {
        let mut ids = IdGenerator::new();
        let s = section(
            "# A\nFirst lead line.\nSecond lead line.\n**Billing**\nx y\n**Search**\nz w\n",
            &mut ids,
        );
        assert!(isolate_topics(&s, &mut ids).is_none());
    }
}
