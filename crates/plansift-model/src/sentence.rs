//! Sentence segmentation with line provenance.
//!
//! A section body is first grouped into units: a paragraph (consecutive
//! non-blank, non-bullet lines) or a bullet item (the bullet line plus its
//! indented continuation lines, marker and checkbox stripped). A line wrapped in
//! emphasis stands alone, and a short label line (`**Billing**`, `Search:`) is
//! dropped. Each unit is then split on sentence-final punctuation.
//!
//! Sentence text is whitespace-normalized and only ever built from verbatim line
//! content joined by single spaces, so every sentence is grounded in the note by
//! construction.

use serde::{Deserialize, Serialize};

use crate::markers::{bullet_prefix_len, is_emphasis_line, is_label_line};
use crate::text::normalize_whitespace;
use crate::Section;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Position within the section, from 0.
    pub index: usize,
    /// Whitespace-normalized text.
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    /// The sentence comes from a bullet item.
    pub is_bullet: bool,
}

const ABBREVIATIONS: &[&str] = &[
    "e.g.", "i.e.", "vs.", "etc.", "mr.", "mrs.", "ms.", "dr.", "approx.", "inc.", "no.", "fig.",
    "cf.", "jr.", "sr.",
];

struct Unit {
    is_bullet: bool,
    /// (line number, trimmed text)
    segments: Vec<(usize, String)>,
}

fn group_units<'a>(lines: impl IntoIterator<Item = (usize, &'a str)>) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();
    let mut current: Option<Unit> = None;
    let mut in_fence = false;

    for (line_no, line) in lines {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            units.extend(current.take());
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() || is_label_line(line) {
            units.extend(current.take());
            continue;
        }
        if is_emphasis_line(line) {
            units.extend(current.take());
            units.push(Unit {
                is_bullet: false,
                segments: vec![(line_no, trimmed.to_string())],
            });
            continue;
        }

        if let Some(prefix) = bullet_prefix_len(line) {
            units.extend(current.take());
            let item = line[prefix..].trim();
            current = Some(Unit {
                is_bullet: true,
                segments: if item.is_empty() {
                    Vec::new()
                } else {
                    vec![(line_no, item.to_string())]
                },
            });
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        match current.as_mut() {
            Some(unit) if !unit.is_bullet || indented => {
                unit.segments.push((line_no, trimmed.to_string()));
            }
            _ => {
                units.extend(current.take());
                current = Some(Unit {
                    is_bullet: false,
                    segments: vec![(line_no, trimmed.to_string())],
                });
            }
        }
    }
    units.extend(current);
    units
}

fn ends_with_abbreviation(head: &str) -> bool {
    let word = head
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| c == '(' || c == '"')
        .to_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}

/// Byte ranges of sentences inside `text`.
fn sentence_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(_, next)) = chars.get(i + 1) else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        let Some(&(_, after)) = chars[i + 1..].iter().find(|(_, ch)| !ch.is_whitespace()) else {
            continue;
        };
        if !(after.is_uppercase() || after.is_ascii_digit() || matches!(after, '"' | '\'' | '(')) {
            continue;
        }
        let end = pos + c.len_utf8();
        if c == '.' && ends_with_abbreviation(&text[start..end]) {
            continue;
        }
        ranges.push((start, end));
        start = end;
    }
    if start < text.len() {
        ranges.push((start, text.len()));
    }
    ranges
}

/// Segment numbered lines into sentences. Indices start at `first_index`.
pub fn segment_lines<'a>(
    lines: impl IntoIterator<Item = (usize, &'a str)>,
    first_index: usize,
) -> Vec<Sentence> {
    let mut out = Vec::new();
    let mut index = first_index;

    for unit in group_units(lines) {
        if unit.segments.is_empty() {
            continue;
        }
        let mut joined = String::new();
        let mut offsets: Vec<(usize, usize)> = Vec::with_capacity(unit.segments.len());
        for (line_no, seg) in &unit.segments {
            if !joined.is_empty() {
                joined.push(' ');
            }
            offsets.push((joined.len(), *line_no));
            joined.push_str(seg);
        }
        let line_at = |off: usize| {
            offsets
                .iter()
                .rev()
                .find(|(start, _)| *start <= off)
                .map(|(_, line)| *line)
                .unwrap_or(offsets[0].1)
        };

        for (start, end) in sentence_ranges(&joined) {
            let raw = &joined[start..end];
            let text = normalize_whitespace(raw);
            if !text.chars().any(char::is_alphanumeric) {
                continue;
            }
            let lead = raw.len() - raw.trim_start().len();
            let trail = raw.len() - raw.trim_end().len();
            out.push(Sentence {
                index,
                text,
                start_line: line_at(start + lead),
                end_line: line_at(end.saturating_sub(trail + 1).max(start + lead)),
                is_bullet: unit.is_bullet,
            });
            index += 1;
        }
    }
    out
}

/// Sentences of a section body.
pub fn split_sentences(section: &Section) -> Vec<Sentence> {
    segment_lines(section.body_lines(), 0)
}
