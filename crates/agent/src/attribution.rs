//! Source Attribution Reporter.
//!
//! Derives the provenance block from what retrieval found and what the
//! assembler actually put in the prompt. Counts describe selected chunks
//! only; when nothing was selected every count is zero.

use std::collections::BTreeSet;

use warren_core::generation::SourceAttribution;
use warren_core::knowledge::{ChunkCategory, RetrievalResult, count_by_category};

use crate::context::AssembledContext;

/// Bonus for a result that did not need the lexical fallback.
const NON_FALLBACK_BONUS: f64 = 0.1;
const COUNT_WEIGHT: f64 = 0.5;
/// Selected chunks beyond this add nothing to the score.
const COUNT_SATURATION: usize = 5;
const DIVERSITY_WEIGHT: f64 = 0.4;
/// Distinct categories beyond this add nothing to the score.
const DIVERSITY_SATURATION: usize = 3;

pub fn report(retrieval: &RetrievalResult, context: &AssembledContext) -> SourceAttribution {
    let selected = context.chunks.iter().map(|h| h.chunk.as_ref());
    let by_category = count_by_category(selected);
    let total_sources = context.chunks.len();
    let fallback_used = retrieval.fallback_used();

    let count_of = |c: ChunkCategory| by_category.get(&c).copied().unwrap_or(0);
    let compliance_rules_count = count_of(ChunkCategory::Regulation)
        + count_of(ChunkCategory::Disclaimer)
        + count_of(ChunkCategory::Violation);
    let marketing_examples_count = count_of(ChunkCategory::Example);

    let distinct: BTreeSet<ChunkCategory> = by_category.keys().copied().collect();

    SourceAttribution {
        total_sources,
        quality_score: quality_score(total_sources, distinct.len(), fallback_used),
        by_category,
        strategy: retrieval.strategy(),
        fallback_used,
        vector_results_found: retrieval.vector_found,
        text_results_found: retrieval.lexical_found,
        marketing_examples_count,
        compliance_rules_count,
        low_grounding: context.low_grounding(),
    }
}

/// Score in [0, 1], monotonic in chunk count and category diversity.
///
/// Zero sources score zero regardless of strategy. Otherwise a fallback
/// result scores exactly [`NON_FALLBACK_BONUS`] below the same selection
/// from the vector or hybrid path.
pub fn quality_score(selected: usize, distinct_categories: usize, fallback_used: bool) -> f64 {
    if selected == 0 {
        return 0.0;
    }
    let count = selected.min(COUNT_SATURATION) as f64 / COUNT_SATURATION as f64;
    let diversity =
        distinct_categories.min(DIVERSITY_SATURATION) as f64 / DIVERSITY_SATURATION as f64;
    let bonus = if fallback_used { 0.0 } else { NON_FALLBACK_BONUS };
    (bonus + COUNT_WEIGHT * count + DIVERSITY_WEIGHT * diversity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextAssembler;
    use crate::test_helpers::{chunk, sample_chunks};
    use proptest::prelude::*;
    use std::sync::Arc;
    use warren_core::knowledge::{FallbackReason, MatchedBy, RetrievalPath, ScoredChunk};
    use warren_core::message::ConversationContext;

    fn result(path: RetrievalPath, n: usize) -> RetrievalResult {
        let hits = sample_chunks()
            .into_iter()
            .take(n)
            .map(|c| ScoredChunk {
                chunk: Arc::new(c),
                score: 0.9,
                matched_by: MatchedBy::Vector,
            })
            .collect();
        RetrievalResult::ranked(hits, path, n, 1, 10)
    }

    fn assembled(r: &RetrievalResult, budget: usize) -> AssembledContext {
        ContextAssembler::new(budget, 0).assemble(r, &ConversationContext::new())
    }

    #[test]
    fn counts_come_from_selected_chunks() {
        let r = result(RetrievalPath::Vector, 5);
        let attribution = report(&r, &assembled(&r, 3000));
        assert_eq!(attribution.total_sources, 5);
        assert_eq!(attribution.marketing_examples_count, 1);
        assert_eq!(attribution.compliance_rules_count, 3);
        assert_eq!(attribution.by_category[&ChunkCategory::PlatformGuide], 1);
        assert_eq!(attribution.vector_results_found, 5);
        assert_eq!(attribution.text_results_found, 1);
        assert!(!attribution.fallback_used);
        assert!(!attribution.low_grounding);
        assert!((attribution.quality_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_result_reports_zeroes() {
        let r = RetrievalResult::empty(FallbackReason::VectorEmpty);
        let attribution = report(&r, &assembled(&r, 3000));
        assert_eq!(attribution.total_sources, 0);
        assert!(attribution.by_category.is_empty());
        assert!(attribution.fallback_used);
        assert!(attribution.low_grounding);
        assert_eq!(attribution.quality_score, 0.0);
    }

    #[test]
    fn budget_starved_selection_is_low_grounding() {
        let r = result(RetrievalPath::Vector, 3);
        let context = ContextAssembler::new(10, 50).assemble(&r, &ConversationContext::new());
        let attribution = report(&r, &context);
        assert_eq!(attribution.total_sources, 0);
        assert!(attribution.low_grounding);
        assert_eq!(attribution.vector_results_found, 3);
    }

    #[test]
    fn fallback_scores_strictly_lower() {
        let vector = result(RetrievalPath::Vector, 2);
        let fallback = result(
            RetrievalPath::LexicalFallback {
                reason: FallbackReason::VectorUnavailable,
            },
            2,
        );
        let a = report(&vector, &assembled(&vector, 3000));
        let b = report(&fallback, &assembled(&fallback, 3000));
        assert!(b.quality_score < a.quality_score);
    }

    #[test]
    fn diversity_raises_the_score() {
        let same = vec![
            chunk("a", ChunkCategory::Disclaimer, "one"),
            chunk("b", ChunkCategory::Disclaimer, "two"),
        ];
        let mixed = vec![
            chunk("a", ChunkCategory::Disclaimer, "one"),
            chunk("b", ChunkCategory::Example, "two"),
        ];
        let score = |chunks: Vec<_>| {
            let hits = chunks
                .into_iter()
                .map(|c| ScoredChunk {
                    chunk: Arc::new(c),
                    score: 0.5,
                    matched_by: MatchedBy::Vector,
                })
                .collect();
            let r = RetrievalResult::ranked(hits, RetrievalPath::Hybrid, 2, 2, 10);
            report(&r, &assembled(&r, 3000)).quality_score
        };
        assert!(score(mixed) > score(same));
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_monotonic(n in 0usize..20, d in 0usize..6) {
            let d = d.min(n);
            let s = quality_score(n, d, false);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!(quality_score(n + 1, d, false) >= s);
            prop_assert!(quality_score(n, d, true) <= s);
            if n > 0 {
                prop_assert!(quality_score(n, d, true) < s);
                prop_assert!(quality_score(n + 1, (d + 1).min(n + 1), false) >= s);
            }
        }
    }
}
