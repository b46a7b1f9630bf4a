//! Lexical markers shared by the section provider and the pipeline.

use regex::Regex;

/// Declare a function returning a lazily compiled, process-wide `Regex`.
///
/// Patterns passed here are string literals; a pattern that fails to compile is a
/// programming error caught by the `lexicon_compiles` tests.
#[macro_export]
macro_rules! static_regex {
    ($vis:vis fn $name:ident = $pattern:expr) => {
        $vis fn $name() -> &'static ::regex::Regex {
            static CELL: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            CELL.get_or_init(|| {
                ::regex::Regex::new($pattern).expect("static_regex pattern must compile")
            })
        }
    };
}

static_regex!(pub fn date_marker = r"(?i)\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b|\b\d{4}-\d{2}-\d{2}\b|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?\b");

static_regex!(pub fn metric_marker = r"(?i)\$\d[\d,]*(?:\.\d+)?[kmb]?\b|\b\d+(?:\.\d+)?\s?%|\b\d+(?:\.\d+)?\s?(?:ms|sec|seconds|x|k|rps|qps|users|customers|accounts|tickets|errors)\b|\bp(?:50|90|95|99)\b");

static_regex!(pub fn quarter_marker = r"(?i)\b(?:q[1-4]|h[12])\b|\bquarter\b|\bfy\d{2,4}\b");

static_regex!(pub fn bullet_marker = r"^\s*(?:[-*+•]|\d{1,3}[.)])\s+(?:\[[ xX]\]\s+)?");

static_regex!(pub fn numbered_marker = r"^\s*\d{1,3}[.)]\s+");

static_regex!(pub fn emphasis_line = r"^\s*(?:\*\*|__|\*|_)(?P<inner>[^*_].*?)(?:\*\*|__|\*|_)\s*:?\s*$");

static_regex!(fn colon_label = r"^\s*(?P<inner>[A-Z][\w&/'() -]{1,50}?)\s*:\s*$");

/// Words a label line may have before it reads as prose.
pub const MAX_LABEL_WORDS: usize = 6;

/// Counts of date, metric and quarter markers in `text`.
pub fn count_markers(text: &str) -> (usize, usize, usize) {
    (
        date_marker().find_iter(text).count(),
        metric_marker().find_iter(text).count(),
        quarter_marker().find_iter(text).count(),
    )
}

/// Length of the bullet marker (including checkbox) at the start of `line`, if any.
pub fn bullet_prefix_len(line: &str) -> Option<usize> {
    bullet_marker().find(line).map(|m| m.end())
}

/// The line is wrapped in emphasis markers as a whole (`**Billing**`, `_Note_`).
pub fn is_emphasis_line(line: &str) -> bool {
    bullet_prefix_len(line).is_none() && emphasis_line().is_match(line)
}

/// A short standalone label such as `**Billing**` or `Search:`. Labels introduce
/// the lines below them and carry no content of their own.
pub fn is_label_line(line: &str) -> bool {
    if bullet_prefix_len(line).is_some() {
        return false;
    }
    let Some(caps) = emphasis_line()
        .captures(line)
        .or_else(|| colon_label().captures(line))
    else {
        return false;
    };
    let inner = caps.name("inner").map_or("", |m| m.as_str()).trim();
    !inner.is_empty()
        && inner.split_whitespace().count() <= MAX_LABEL_WORDS
        && !inner.ends_with(|c: char| matches!(c, '.' | '!' | '?'))
}

pub fn all_patterns() -> Vec<&'static Regex> {
    vec![
        date_marker(),
        metric_marker(),
        quarter_marker(),
        bullet_marker(),
        numbered_marker(),
        emphasis_line(),
        colon_label(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicon_compiles() {
        assert_eq!(all_patterns().len(), 7);
    }

    #[test]
    fn counts_markers() {
        let (dates, metrics, quarters) =
            count_markers("Ship by 3/15 or Mar 20; p95 latency is 450ms; Q3 target 20% growth");
        assert_eq!(dates, 2);
        assert!(metrics >= 3);
        assert_eq!(quarters, 1);
    }

    #[test]
    fn bullet_prefix_strips_checkbox() {
        let line = "  - [ ] Build the export API";
        let n = bullet_prefix_len(line).unwrap();
        assert_eq!(&line[n..], "Build the export API");
        assert_eq!(bullet_prefix_len("plain text"), None);
        assert_eq!(bullet_prefix_len("12. numbered"), Some(4));
    }

    #[test]
    fn label_lines() {
        assert!(is_label_line("**Billing**"));
        assert!(is_label_line("__Search rollout:__"));
        assert!(is_label_line("**Billing:**"));
        assert!(is_label_line("Search:"));
        assert!(!is_label_line("- **Billing**"));
        assert!(!is_label_line("**Launch slipped two weeks to Q4.**"));
        assert!(!is_label_line("Owner: Dana"));
        assert!(!is_label_line("The invoice launch slipped two weeks to Q4."));

        assert!(is_emphasis_line("**Launch slipped two weeks to Q4.**"));
        assert!(!is_emphasis_line("Launch **slipped** two weeks."));
    }
}
