//! Section classifier.
//!
//! Scores each section over seven intent labels from lexical and structural
//! cues, then derives actionability:
//!
//! ```text
//! actionable_signal   = max(plan_change, new_workstream)
//! out_of_scope_signal = max(calendar, communication, micro_tasks)
//! actionable          = actionable_signal >= t_action && out_of_scope_signal < t_out_of_scope
//! ```
//!
//! Research is left out of the out-of-scope signal so research sections with
//! concrete execution language still qualify. A section whose top label is
//! `plan_change` is always actionable; when the raw computation disagrees the
//! override is recorded in `Actionability::reason`.

mod cues;

use plansift_model::{PipelineConfig, Section, Sentence, SuggestionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::lexicon::{
    consequence, desire, execution_verb, external_actor, failure, has_conditional,
    has_speculation, obligation, risk_vocab, strong_conditional,
};

use cues::CueHit;

/// Intent labels, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    PlanChange,
    NewWorkstream,
    StatusInformational,
    Communication,
    Research,
    Calendar,
    MicroTasks,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 7] = [
        IntentLabel::PlanChange,
        IntentLabel::NewWorkstream,
        IntentLabel::StatusInformational,
        IntentLabel::Communication,
        IntentLabel::Research,
        IntentLabel::Calendar,
        IntentLabel::MicroTasks,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            IntentLabel::PlanChange => "plan_change",
            IntentLabel::NewWorkstream => "new_workstream",
            IntentLabel::StatusInformational => "status_informational",
            IntentLabel::Communication => "communication",
            IntentLabel::Research => "research",
            IntentLabel::Calendar => "calendar",
            IntentLabel::MicroTasks => "micro_tasks",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Noisy-or: `1 - prod(1 - w)`. Monotonic in every weight.
pub fn noisy_or(weights: impl IntoIterator<Item = f64>) -> f64 {
    1.0 - weights
        .into_iter()
        .fold(1.0, |acc, w| acc * (1.0 - w.clamp(0.0, 1.0)))
}

/// Number of strongest sentence hits that count toward a label score.
const SENTENCE_HITS_PER_LABEL: usize = 2;

fn top_weights(mut weights: Vec<f64>, n: usize) -> Vec<f64> {
    weights.sort_by(|a, b| b.total_cmp(a));
    weights.truncate(n);
    weights
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScores(BTreeMap<IntentLabel, f64>);

impl IntentScores {
    pub fn get(&self, label: IntentLabel) -> f64 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    /// Highest-scoring label; ties go to the earlier label. `None` when every
    /// score is zero.
    pub fn top(&self) -> Option<(IntentLabel, f64)> {
        let mut best: Option<(IntentLabel, f64)> = None;
        for label in IntentLabel::ALL {
            let score = self.get(label);
            if score <= 0.0 {
                continue;
            }
            match best {
                Some((_, s)) if s >= score => {}
                _ => best = Some((label, score)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (IntentLabel, f64)> + '_ {
        self.0.iter().map(|(l, s)| (*l, *s))
    }
}

impl FromIterator<(IntentLabel, f64)> for IntentScores {
    fn from_iter<T: IntoIterator<Item = (IntentLabel, f64)>>(iter: T) -> Self {
        IntentScores(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actionability {
    pub actionable: bool,
    pub actionable_signal: f64,
    pub out_of_scope_signal: f64,
    /// Raw gate decision before any override.
    pub raw_actionable: bool,
    /// Set when the plan-change override flipped the raw decision.
    pub overridden: bool,
    pub reason: String,
}

/// A section with its intent and type distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSection {
    pub section: Section,
    pub intent: IntentScores,
    pub top_label: Option<IntentLabel>,
    pub top_score: f64,
    pub type_scores: BTreeMap<SuggestionType, f64>,
    pub suggested_type: Option<SuggestionType>,
    pub type_confidence: f64,
    pub actionability: Actionability,
    /// `false` when the top score is under `t_section_min` (plan-change exempt).
    pub relevant: bool,
    /// Strongest cue per label, for the ledger.
    pub cues: BTreeMap<IntentLabel, String>,
}

impl ClassifiedSection {
    pub fn is_plan_change(&self) -> bool {
        self.top_label == Some(IntentLabel::PlanChange)
    }

    pub fn type_score(&self, kind: SuggestionType) -> f64 {
        self.type_scores.get(&kind).copied().unwrap_or(0.0)
    }
}

/// Rule-based classifier over precomputed cue weights.
#[derive(Debug, Clone)]
pub struct SectionClassifier {
    t_action: f64,
    t_out_of_scope: f64,
    t_section_min: f64,
}

impl SectionClassifier {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            t_action: config.t_action,
            t_out_of_scope: config.t_out_of_scope,
            t_section_min: config.t_section_min,
        }
    }

    pub fn classify(&self, section: Section, sentences: &[Sentence]) -> ClassifiedSection {
        let (intent, cues) = self.intent_scores(&section, sentences);
        let top = intent.top();
        let type_scores = type_scores(&intent, sentences);
        let (suggested_type, type_confidence) = suggested_type(&type_scores);

        let top_label = top.map(|(label, _)| label);
        let top_score = top.map(|(_, score)| score).unwrap_or(0.0);
        let actionability = self.actionability(&intent, top_label);
        let relevant = match top_label {
            Some(IntentLabel::PlanChange) => true,
            Some(_) => top_score >= self.t_section_min,
            None => false,
        };

        tracing::debug!(
            section_id = %section.id,
            top_label = top_label.map(IntentLabel::as_str).unwrap_or("none"),
            top_score,
            actionable = actionability.actionable,
            overridden = actionability.overridden,
            "section classified"
        );

        ClassifiedSection {
            section,
            intent,
            top_label,
            top_score,
            type_scores,
            suggested_type,
            type_confidence,
            actionability,
            relevant,
            cues,
        }
    }

    fn intent_scores(
        &self,
        section: &Section,
        sentences: &[Sentence],
    ) -> (IntentScores, BTreeMap<IntentLabel, String>) {
        let checkboxes = cues::checkbox_lines(section.body_lines().map(|(_, l)| l));
        let mut cue_names = BTreeMap::new();

        let scores = IntentLabel::ALL
            .into_iter()
            .map(|label| {
                let mut hits: Vec<CueHit> = sentences
                    .iter()
                    .filter_map(|s| cues::sentence_hit(label, &s.text))
                    .collect();
                hits.sort_by(|a, b| b.weight.total_cmp(&a.weight));

                let mut weights: Vec<f64> = hits
                    .iter()
                    .take(SENTENCE_HITS_PER_LABEL)
                    .map(|h| h.weight)
                    .collect();
                let heading = cues::heading_hit(
                    label,
                    &section.heading,
                    section.context_heading.as_deref(),
                );
                if let Some(h) = heading {
                    weights.push(h.weight);
                }
                if label == IntentLabel::MicroTasks {
                    weights.extend(std::iter::repeat(0.35).take(checkboxes.min(2)));
                }

                let strongest = match (heading, hits.first()) {
                    (Some(h), Some(b)) if h.weight >= b.weight => Some(h.name),
                    (_, Some(b)) => Some(b.name),
                    (Some(h), None) => Some(h.name),
                    (None, None) => None,
                };
                if let Some(name) = strongest {
                    cue_names.insert(label, name.to_string());
                }
                (label, noisy_or(weights))
            })
            .collect();

        (scores, cue_names)
    }

    fn actionability(&self, intent: &IntentScores, top: Option<IntentLabel>) -> Actionability {
        let actionable_signal = intent
            .get(IntentLabel::PlanChange)
            .max(intent.get(IntentLabel::NewWorkstream));
        let out_of_scope_signal = intent
            .get(IntentLabel::Calendar)
            .max(intent.get(IntentLabel::Communication))
            .max(intent.get(IntentLabel::MicroTasks));

        let raw_actionable =
            actionable_signal >= self.t_action && out_of_scope_signal < self.t_out_of_scope;
        let raw_reason = if raw_actionable {
            format!(
                "actionable_signal {actionable_signal:.2} >= t_action {:.2} and \
                 out_of_scope_signal {out_of_scope_signal:.2} < t_out_of_scope {:.2}",
                self.t_action, self.t_out_of_scope
            )
        } else if actionable_signal < self.t_action {
            format!(
                "actionable_signal {actionable_signal:.2} < t_action {:.2}",
                self.t_action
            )
        } else {
            format!(
                "out_of_scope_signal {out_of_scope_signal:.2} >= t_out_of_scope {:.2}",
                self.t_out_of_scope
            )
        };

        if !raw_actionable && top == Some(IntentLabel::PlanChange) {
            return Actionability {
                actionable: true,
                actionable_signal,
                out_of_scope_signal,
                raw_actionable,
                overridden: true,
                reason: format!("plan_change_override: {raw_reason}"),
            };
        }

        Actionability {
            actionable: raw_actionable,
            actionable_signal,
            out_of_scope_signal,
            raw_actionable,
            overridden: false,
            reason: raw_reason,
        }
    }
}

const TYPE_SENTENCE_WEIGHT: f64 = 0.55;

fn is_idea_sentence(text: &str) -> bool {
    (external_actor().is_match(text) && desire().is_match(text))
        || execution_verb().is_match(text)
        || obligation().is_match(text)
}

fn is_risk_sentence(text: &str) -> bool {
    risk_vocab().is_match(text)
        || strong_conditional().is_match(text)
        || (has_conditional(text) && consequence().is_match(text))
}

fn is_bug_sentence(text: &str) -> bool {
    failure().is_match(text) && !has_speculation(text)
}

fn sentence_type_score(sentences: &[Sentence], pred: fn(&str) -> bool) -> f64 {
    let weights = sentences
        .iter()
        .filter(|s| pred(&s.text))
        .map(|_| TYPE_SENTENCE_WEIGHT)
        .collect();
    noisy_or(top_weights(weights, SENTENCE_HITS_PER_LABEL))
}

fn type_scores(intent: &IntentScores, sentences: &[Sentence]) -> BTreeMap<SuggestionType, f64> {
    let idea = sentence_type_score(sentences, is_idea_sentence)
        .max(intent.get(IntentLabel::NewWorkstream) * 0.5);
    BTreeMap::from([
        (SuggestionType::Idea, idea),
        (SuggestionType::ProjectUpdate, intent.get(IntentLabel::PlanChange)),
        (SuggestionType::Risk, sentence_type_score(sentences, is_risk_sentence)),
        (SuggestionType::Bug, sentence_type_score(sentences, is_bug_sentence)),
    ])
}

fn suggested_type(scores: &BTreeMap<SuggestionType, f64>) -> (Option<SuggestionType>, f64) {
    let mut best: Option<(SuggestionType, f64)> = None;
    for kind in SuggestionType::ALL {
        let score = scores.get(&kind).copied().unwrap_or(0.0);
        if score <= 0.0 {
            continue;
        }
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((kind, score)),
        }
    }
    match best {
        Some((kind, score)) => (Some(kind), score),
        None => (None, 0.0),
    }
}
