//! Cue tables for intent scoring.
//!
//! A cue is a named lexical test with a weight in (0, 1). A sentence contributes
//! the weight of its strongest matching cue for a label; a heading contributes
//! its heading cue. Weights are combined with noisy-or in `classifier`.

use plansift_model::markers::metric_marker;
use plansift_model::static_regex;
use regex::Regex;

use super::IntentLabel;
use crate::lexicon::{
    delivery_assignment, descope, desire, execution_verb, external_actor, failure,
    has_conditional, is_schedule_slip, next_steps_heading, obligation, risk_vocab, shift_verb,
    status_cue, timeline_word,
};

type Pattern = fn() -> &'static Regex;

pub(crate) enum Matcher {
    Any(&'static [Pattern]),
    Pred(fn(&str) -> bool),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Any(patterns) => patterns.iter().any(|p| p().is_match(text)),
            Matcher::Pred(pred) => pred(text),
        }
    }
}

pub(crate) struct Cue {
    pub name: &'static str,
    pub weight: f64,
    pub matcher: Matcher,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CueHit {
    pub name: &'static str,
    pub weight: f64,
}

static_regex!(fn communication = r"(?i)\b(?:e-?mails?|slack|announce(?:ment)?s?|newsletter|post\s+in|share\s+with|send\s+(?:a|an|the)?\s*(?:note|update|recap|summary)|let\s+\w+\s+know|notify|communicat\w*|memo|blog\s+post|press\s+release|talking\s+points)\b");

static_regex!(fn research = r"(?i)\b(?:research|investigate|explore|spike|evaluate|benchmark|interview(?:s|ed)?|survey|look\s+into|analy[sz]e|analysis|study|poc|proof\s+of\s+concept|feasibility|hypothes[ie]s)\b");

static_regex!(fn calendar = r"(?i)\b(?:meetings?|standup|stand-up|1:1|one-on-one|calendar|invites?|schedule\s+(?:a|the)\s+(?:call|meeting|sync|review)|book(?:ed)?\s+(?:a|the)\s+(?:room|call|slot)|ooo|out\s+of\s+office|pto|vacation|holiday|offsite|all-hands)\b");

static_regex!(fn micro_task = r"(?i)\b(?:follow\s+up\s+with|ping|update\s+the\s+(?:doc|ticket|jira|wiki|deck)|file\s+a\s+ticket|review\s+the\s+(?:pr|doc|deck)|check\s+(?:in\s+)?with|send\s+(?:over|out)|circle\s+back|set\s+up\s+a\s+call)\b");

static_regex!(fn plan_heading = r"(?i)\b(?:timelines?|roadmap|schedule|plan\s+changes?|milestones?|launch\s+plan|release\s+plan|dates?|delivery\s+plan)\b");

static_regex!(fn workstream_heading = r"(?i)\b(?:ideas?|proposals?|features?|requests?|feedback|initiatives?|opportunit(?:y|ies)|risks?|issues?|bugs?|incidents?|problems?|asks?|customers?|escalations?)\b");

static_regex!(fn status_heading = r"(?i)\b(?:status|updates?|progress|highlights|wins|metrics|kpis?|recap|fyi)\b");

static_regex!(fn communication_heading = r"(?i)\b(?:announcements?|comms|communications?|messaging|pr|press|newsletter)\b");

static_regex!(fn research_heading = r"(?i)\b(?:research|discovery|investigations?|spikes?|findings|learnings|interviews?|experiments?)\b");

static_regex!(fn calendar_heading = r"(?i)\b(?:calendar|agenda|logistics|meetings?|ooo|pto|events?|offsite|attendees)\b");

static_regex!(fn checkbox_line = r"^\s*(?:[-*+]\s+)?\[[ xX]\]\s+");

fn committed_slip(text: &str) -> bool {
    is_schedule_slip(text) && !has_conditional(text)
}

fn hedged_slip(text: &str) -> bool {
    is_schedule_slip(text) && has_conditional(text)
}

fn feature_demand(text: &str) -> bool {
    external_actor().is_match(text) && desire().is_match(text)
}

fn owned_delivery(text: &str) -> bool {
    delivery_assignment().is_match(text)
}

static PLAN_CHANGE_CUES: &[Cue] = &[
    Cue { name: "committed_slip", weight: 0.60, matcher: Matcher::Pred(committed_slip) },
    Cue { name: "descope", weight: 0.50, matcher: Matcher::Any(&[descope]) },
    Cue { name: "hedged_slip", weight: 0.30, matcher: Matcher::Pred(hedged_slip) },
    Cue { name: "shift_verb", weight: 0.30, matcher: Matcher::Any(&[shift_verb]) },
    Cue { name: "timeline", weight: 0.20, matcher: Matcher::Any(&[timeline_word]) },
];

static NEW_WORKSTREAM_CUES: &[Cue] = &[
    Cue { name: "feature_demand", weight: 0.55, matcher: Matcher::Pred(feature_demand) },
    Cue { name: "owned_delivery", weight: 0.55, matcher: Matcher::Pred(owned_delivery) },
    Cue { name: "execution", weight: 0.50, matcher: Matcher::Any(&[execution_verb]) },
    Cue { name: "failure_or_risk", weight: 0.45, matcher: Matcher::Any(&[failure, risk_vocab]) },
    Cue { name: "obligation", weight: 0.30, matcher: Matcher::Any(&[obligation]) },
];

static STATUS_CUES: &[Cue] = &[
    Cue { name: "status", weight: 0.40, matcher: Matcher::Any(&[status_cue]) },
    Cue { name: "metric", weight: 0.20, matcher: Matcher::Any(&[metric_marker]) },
];

static COMMUNICATION_CUES: &[Cue] = &[
    Cue { name: "communication", weight: 0.50, matcher: Matcher::Any(&[communication]) },
];

static RESEARCH_CUES: &[Cue] = &[
    Cue { name: "research", weight: 0.45, matcher: Matcher::Any(&[research]) },
];

static CALENDAR_CUES: &[Cue] = &[
    Cue { name: "calendar", weight: 0.50, matcher: Matcher::Any(&[calendar]) },
];

static MICRO_TASK_CUES: &[Cue] = &[
    Cue { name: "micro_task", weight: 0.40, matcher: Matcher::Any(&[micro_task]) },
];

fn body_cues(label: IntentLabel) -> &'static [Cue] {
    match label {
        IntentLabel::PlanChange => PLAN_CHANGE_CUES,
        IntentLabel::NewWorkstream => NEW_WORKSTREAM_CUES,
        IntentLabel::StatusInformational => STATUS_CUES,
        IntentLabel::Communication => COMMUNICATION_CUES,
        IntentLabel::Research => RESEARCH_CUES,
        IntentLabel::Calendar => CALENDAR_CUES,
        IntentLabel::MicroTasks => MICRO_TASK_CUES,
    }
}

fn heading_cue(label: IntentLabel) -> (&'static str, f64, Pattern) {
    match label {
        IntentLabel::PlanChange => ("plan_heading", 0.45, plan_heading),
        IntentLabel::NewWorkstream => ("workstream_heading", 0.40, workstream_heading),
        IntentLabel::StatusInformational => ("status_heading", 0.50, status_heading),
        IntentLabel::Communication => ("communication_heading", 0.60, communication_heading),
        IntentLabel::Research => ("research_heading", 0.55, research_heading),
        IntentLabel::Calendar => ("calendar_heading", 0.60, calendar_heading),
        IntentLabel::MicroTasks => ("next_steps_heading", 0.70, next_steps_heading),
    }
}

/// Strongest body cue for `label` in one sentence.
pub(crate) fn sentence_hit(label: IntentLabel, text: &str) -> Option<CueHit> {
    body_cues(label)
        .iter()
        .filter(|cue| cue.matcher.matches(text))
        .map(|cue| CueHit { name: cue.name, weight: cue.weight })
        .reduce(|best, next| if next.weight > best.weight { next } else { best })
}

/// Heading cue for `label`. A parent (context) heading counts at a discount.
pub(crate) fn heading_hit(
    label: IntentLabel,
    heading: &str,
    context: Option<&str>,
) -> Option<CueHit> {
    let (name, weight, pattern) = heading_cue(label);
    if pattern().is_match(heading) {
        return Some(CueHit { name, weight });
    }
    match context {
        Some(parent) if pattern().is_match(parent) => Some(CueHit { name, weight: weight * 0.8 }),
        _ => None,
    }
}

/// Checkbox lines in a section body, a structural micro-task cue.
pub(crate) fn checkbox_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> usize {
    lines.into_iter().filter(|l| checkbox_line().is_match(l)).count()
}

#[cfg(test)]
fn all_patterns() -> Vec<&'static Regex> {
    vec![
        communication(),
        research(),
        calendar(),
        micro_task(),
        plan_heading(),
        workstream_heading(),
        status_heading(),
        communication_heading(),
        research_heading(),
        calendar_heading(),
        checkbox_line(),
    ]
}
