//! Heading-delimited sections and the markdown section provider.

use serde::{Deserialize, Serialize};

use crate::markers::{bullet_prefix_len, count_markers, numbered_marker};
use crate::{IdGenerator, NoteInput, PipelineError, SectionId};

/// Structural feature summary of a section body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFeatures {
    pub line_count: usize,
    pub char_count: usize,
    pub bullet_count: usize,
    pub numbered_count: usize,
    pub paragraph_count: usize,
    pub date_markers: usize,
    pub metric_markers: usize,
    pub quarter_markers: usize,
    /// Deepest bullet indentation, in indent levels (two spaces or one tab each).
    pub max_indent: usize,
}

impl SectionFeatures {
    pub fn compute<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut features = SectionFeatures::default();
        let mut in_paragraph = false;

        for line in lines {
            features.line_count += 1;
            features.char_count += line.trim().chars().count();

            if line.trim().is_empty() {
                in_paragraph = false;
                continue;
            }

            if bullet_prefix_len(line).is_some() {
                features.bullet_count += 1;
                if numbered_marker().is_match(line) {
                    features.numbered_count += 1;
                }
                features.max_indent = features.max_indent.max(indent_level(line));
                in_paragraph = false;
            } else if !in_paragraph {
                features.paragraph_count += 1;
                in_paragraph = true;
            }

            let (dates, metrics, quarters) = count_markers(line);
            features.date_markers += dates;
            features.metric_markers += metrics;
            features.quarter_markers += quarters;
        }

        features
    }

    pub fn has_time_markers(&self) -> bool {
        self.date_markers > 0 || self.quarter_markers > 0
    }
}

fn indent_level(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 2,
            _ => break,
        }
    }
    width / 2
}

/// A contiguous, heading-delimited unit of note text. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Set on topic-isolated sub-sections: the section that spawned them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SectionId>,
    pub heading: String,
    /// `#` count of the heading; 0 for the heading-less preamble. Sub-sections
    /// sit one level below their parent.
    pub heading_level: u8,
    /// Heading of the parent section, carried by sub-sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_heading: Option<String>,
    /// First line of the section (the heading line when there is one), 1-based.
    pub start_line: usize,
    /// Last line of the section, inclusive.
    pub end_line: usize,
    /// First body line (the line after the heading).
    pub body_start_line: usize,
    /// Full section text, heading line included.
    pub raw_text: String,
    /// Body lines joined with `\n`.
    pub body: String,
    pub features: SectionFeatures,
}

impl Section {
    pub fn new(
        id: SectionId,
        heading: impl Into<String>,
        heading_level: u8,
        heading_line: Option<&str>,
        body_start_line: usize,
        body_lines: &[&str],
    ) -> Self {
        let heading = heading.into();
        let features = SectionFeatures::compute(body_lines.iter().copied());
        let body = body_lines.join("\n");
        let raw_text = match heading_line {
            Some(line) if body.is_empty() => line.to_string(),
            Some(line) => format!("{line}\n{body}"),
            None => body.clone(),
        };
        let start_line = if heading_line.is_some() {
            body_start_line.saturating_sub(1).max(1)
        } else {
            body_start_line
        };
        let end_line = if body_lines.is_empty() {
            start_line
        } else {
            body_start_line + body_lines.len() - 1
        };

        Section {
            id,
            parent_id: None,
            heading,
            heading_level,
            context_heading: None,
            start_line,
            end_line,
            body_start_line,
            raw_text,
            body,
            features,
        }
    }

    /// A sub-section carved out of `parent` by topic isolation.
    pub fn child_of(
        parent: &Section,
        id: SectionId,
        heading: impl Into<String>,
        anchor_line: Option<&str>,
        body_start_line: usize,
        body_lines: &[&str],
    ) -> Self {
        let mut child = Section::new(
            id,
            heading,
            parent.heading_level.saturating_add(1),
            anchor_line,
            body_start_line,
            body_lines,
        );
        child.parent_id = Some(parent.id.clone());
        child.context_heading = if parent.heading.is_empty() {
            parent.context_heading.clone()
        } else {
            Some(parent.heading.clone())
        };
        child
    }

    /// Body lines paired with their 1-based line numbers.
    pub fn body_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        let start = self.body_start_line;
        let lines: Vec<&str> = if self.body.is_empty() {
            Vec::new()
        } else {
            self.body.split('\n').collect()
        };
        lines
            .into_iter()
            .enumerate()
            .map(move |(i, line)| (start + i, line))
    }

    pub fn is_subsection(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Heading plus the parent heading, for cue matching.
    pub fn heading_context(&self) -> String {
        match &self.context_heading {
            Some(parent) => format!("{parent} / {}", self.heading),
            None => self.heading.clone(),
        }
    }
}

/// Produces ordered sections from a note.
pub trait SectionProvider {
    fn sections(
        &self,
        note: &NoteInput,
        ids: &mut IdGenerator,
    ) -> Result<Vec<Section>, PipelineError>;
}

/// Splits markdown on ATX headings (`#` .. `######`).
///
/// Lines before the first heading form a level-0 preamble section when they
/// contain any text. Headings inside fenced code blocks are ignored.
#[derive(Debug, Clone, Default)]
pub struct MarkdownSectionProvider;

crate::static_regex!(fn atx_heading = r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$");

struct PendingSection<'a> {
    heading: String,
    level: u8,
    heading_line: Option<&'a str>,
    body_start: usize,
    body: Vec<&'a str>,
}

impl<'a> PendingSection<'a> {
    fn finish(mut self, ids: &mut IdGenerator) -> Option<Section> {
        while self.body.last().is_some_and(|l| l.trim().is_empty()) {
            self.body.pop();
        }
        if self.heading_line.is_none() && self.body.iter().all(|l| l.trim().is_empty()) {
            return None;
        }
        Some(Section::new(
            ids.next_section_id(),
            self.heading,
            self.level,
            self.heading_line,
            self.body_start,
            &self.body,
        ))
    }
}

impl SectionProvider for MarkdownSectionProvider {
    fn sections(
        &self,
        note: &NoteInput,
        ids: &mut IdGenerator,
    ) -> Result<Vec<Section>, PipelineError> {
        let mut out = Vec::new();
        let mut in_fence = false;
        let mut current = PendingSection {
            heading: String::new(),
            level: 0,
            heading_line: None,
            body_start: 1,
            body: Vec::new(),
        };

        for (idx, line) in note.raw_text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }

            let heading = if in_fence {
                None
            } else {
                atx_heading().captures(line)
            };

            match heading {
                Some(caps) => {
                    let level = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1);
                    let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                    let next = PendingSection {
                        heading: text.trim().to_string(),
                        level: u8::try_from(level).map_err(|_| PipelineError::Section {
                            message: format!("heading level {level} on line {line_no}"),
                        })?,
                        heading_line: Some(line),
                        body_start: line_no + 1,
                        body: Vec::new(),
                    };
                    let done = std::mem::replace(&mut current, next);
                    out.extend(done.finish(ids));
                }
                None => {
                    if current.heading_line.is_none()
                        && current.body.is_empty()
                        && line.trim().is_empty()
                    {
                        // Leading blank lines are not part of the preamble.
                        current.body_start = line_no + 1;
                        continue;
                    }
                    current.body.push(line);
                }
            }
        }
        out.extend(current.finish(ids));

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<Section> {
        let note = NoteInput::new("n1", text);
        MarkdownSectionProvider
            .sections(&note, &mut IdGenerator::new())
            .unwrap()
    }

    #[test]
    fn splits_on_headings_with_preamble() {
        let sections = split("intro line\n\n# Roadmap\n- ship Q3\n\n## Risks\nnone\n");
        assert_eq!(sections.len(), 3);

        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[0].heading_level, 0);
        assert_eq!(sections[0].start_line, 1);
        assert_eq!(sections[0].end_line, 1);

        assert_eq!(sections[1].heading, "Roadmap");
        assert_eq!(sections[1].heading_level, 1);
        assert_eq!(sections[1].start_line, 3);
        assert_eq!(sections[1].body_start_line, 4);
        assert_eq!(sections[1].end_line, 4);
        assert_eq!(sections[1].features.bullet_count, 1);
        assert_eq!(sections[1].features.quarter_markers, 1);

        assert_eq!(sections[2].heading, "Risks");
        assert_eq!(sections[2].heading_level, 2);
        assert_eq!(sections[2].raw_text, "## Risks\nnone");
    }

    #[test]
    fn no_headings_yields_single_preamble() {
        let sections = split("\n\nWe are looking at a 4-week delay.\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start_line, 3);
        assert_eq!(sections[0].body, "We are looking at a 4-week delay.");
    }

    #[test]
    fn headings_in_code_fences_are_ignored() {
        let sections = split("# Real\n```\n# not a heading\n```\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].features.line_count, 3);
    }

    #[test]
    fn body_lines_carry_line_numbers() {
        let sections = split("# A\none\ntwo\n");
        let lines: Vec<(usize, &str)> = sections[0].body_lines().collect();
        assert_eq!(lines, vec![(2, "one"), (3, "two")]);
    }

    #[test]
    fn heading_only_section_is_kept() {
        let sections = split("# Empty\n# Next\ntext\n");
        assert_eq!(sections.len(), 2);
        assert!(!sections[0].has_body());
        assert_eq!(sections[0].start_line, 1);
        assert_eq!(sections[0].end_line, 1);
    }

    #[test]
    fn features_count_structure() {
        let f = SectionFeatures::compute(
            ["para one", "continues", "", "- a", "  - nested", "1. first", "", "para two"]
                .into_iter(),
        );
        assert_eq!(f.bullet_count, 3);
        assert_eq!(f.numbered_count, 1);
        assert_eq!(f.paragraph_count, 2);
        assert_eq!(f.max_indent, 1);
    }
}
