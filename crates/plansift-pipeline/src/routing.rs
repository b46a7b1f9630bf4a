//! Routing, fingerprint dedup and the suggestion cap.

use plansift_model::text::token_jaccard;
use plansift_model::{ExistingPlanItem, RoutingIntent, Suggestion};
use std::collections::BTreeSet;

/// Attach to the existing plan item whose title overlaps most with the
/// candidate title, when the overlap reaches `threshold`. Ties keep the first
/// item in caller order.
pub fn route(
    candidate: &Suggestion,
    existing: &[ExistingPlanItem],
    threshold: f64,
) -> RoutingIntent {
    let mut best: Option<(&ExistingPlanItem, f64)> = None;
    for item in existing {
        let similarity = token_jaccard(&candidate.title, &item.title);
        match best {
            Some((_, s)) if s >= similarity => {}
            _ => best = Some((item, similarity)),
        }
    }
    match best {
        Some((item, similarity)) if similarity > 0.0 && similarity >= threshold => {
            RoutingIntent::AttachToExisting {
                plan_item_id: item.id.clone(),
                similarity,
            }
        }
        _ => RoutingIntent::CreateNew,
    }
}

/// Keeps the first candidate per fingerprint.
#[derive(Debug, Default)]
pub struct Deduper {
    seen: BTreeSet<String>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when `candidate` is the first with its fingerprint.
    pub fn admit(&mut self, candidate: &Suggestion) -> bool {
        self.seen.insert(candidate.fingerprint.clone())
    }
}

/// Apply the suggestion cap.
///
/// Protected candidates are always kept. The others are ranked by overall score
/// (stable, so ties keep pipeline order) and fill the remaining slots. Kept
/// candidates come back in their original order; the second vector holds the
/// excess.
pub fn apply_cap(
    candidates: Vec<(Suggestion, bool)>,
    max: usize,
) -> (Vec<Suggestion>, Vec<Suggestion>) {
    let protected = candidates.iter().filter(|(_, p)| *p).count();
    let mut slots = max.saturating_sub(protected);

    let mut ranked: Vec<usize> = (0..candidates.len())
        .filter(|&i| !candidates[i].1)
        .collect();
    ranked.sort_by(|&a, &b| {
        candidates[b]
            .0
            .scores
            .overall()
            .total_cmp(&candidates[a].0.scores.overall())
    });

    let mut keep = vec![false; candidates.len()];
    for (i, (_, p)) in candidates.iter().enumerate() {
        keep[i] = *p;
    }
    for i in ranked {
        if slots == 0 {
            break;
        }
        keep[i] = true;
        slots -= 1;
    }

    let mut kept = Vec::new();
    let mut excess = Vec::new();
    for ((candidate, _), keep) in candidates.into_iter().zip(keep) {
        if keep {
            kept.push(candidate);
        } else {
            excess.push(candidate);
        }
    }
    (kept, excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansift_model::{
        EvidenceSpan, Provenance, ScoreBreakdown, SectionId, SuggestionId, SuggestionPayload,
    };

    fn suggestion(id: &str, title: &str, overall: f64) -> Suggestion {
        let mut s = Suggestion::candidate(
            SuggestionId::new(id),
            "n1",
            SectionId::new("sec-1"),
            title,
            SuggestionPayload::Idea {
                description: title.to_string(),
            },
            vec![EvidenceSpan::new(1, 1, title)],
            Provenance::Signal,
        );
        s.scores = ScoreBreakdown::new(overall, overall, overall);
        s
    }

    #[test]
    fn routes_to_best_overlap() {
        let items = vec![
            ExistingPlanItem::new("p1", "Search relevance tuning"),
            ExistingPlanItem::new("p2", "Invoice export for finance"),
        ];
        let s = suggestion("sug-1", "Monthly invoice export", 0.8);
        match route(&s, &items, 0.3) {
            RoutingIntent::AttachToExisting { plan_item_id, similarity } => {
                assert_eq!(plan_item_id, "p2");
                assert!(similarity >= 0.3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(route(&s, &items, 0.9), RoutingIntent::CreateNew);
        assert_eq!(route(&s, &[], 0.0), RoutingIntent::CreateNew);
    }

    #[test]
    fn dedup_keeps_first() {
        let mut dedup = Deduper::new();
        assert!(dedup.admit(&suggestion("sug-1", "Invoice export", 0.8)));
        assert!(!dedup.admit(&suggestion("sug-2", "Invoice export", 0.9)));
        assert!(dedup.admit(&suggestion("sug-3", "Search latency", 0.9)));
    }

    #[test]
    fn cap_protects_and_preserves_order() {
        let input = vec![
            (suggestion("a", "Alpha launch", 0.6), false),
            (suggestion("b", "Beta launch", 0.9), false),
            (suggestion("c", "Gamma timeline", 0.1), true),
            (suggestion("d", "Delta launch", 0.7), false),
        ];
        let (kept, excess) = apply_cap(input, 2);
        let kept: Vec<&str> = kept.iter().map(|s| s.id.as_str()).collect();
        let excess: Vec<&str> = excess.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(kept, vec!["b", "c"]);
        assert_eq!(excess, vec!["a", "d"]);
    }
}
