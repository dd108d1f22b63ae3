//! Context assembly under a token budget.
//!
//! Fills the prompt context greedily, highest priority first:
//!
//! 1. **Draft + recent turns**: the current draft and the newest turns, up
//!    to the reserved conversation minimum
//! 2. **Knowledge**: retrieved chunks in rank order; a chunk that does not
//!    fit is skipped and the next (smaller) one is tried
//! 3. **Documents**: processed session document summaries, upload order
//! 4. **Older turns**: whatever budget is left extends the conversation
//!    window further back
//!
//! When the budget is below the conversation reservation, knowledge and
//! documents are left empty and generation proceeds with reduced grounding.
//!
//! # Determinism
//!
//! Identical inputs and budget always produce an identical selection. No
//! random or time-dependent logic is used during assembly.

use serde::Serialize;
use tracing::debug;
use warren_config::ContextConfig;
use warren_core::knowledge::{RetrievalResult, ScoredChunk};
use warren_core::message::{ConversationContext, Message, SessionDocumentSummary};

use crate::context::token;

// ── Section headers ───────────────────────────────────────────────────────

const DRAFT_HEADER: &str = "[Current Draft]\n";
const CONVERSATION_HEADER: &str = "[Recent Conversation]\n";
const KNOWLEDGE_HEADER: &str = "[Compliance Knowledge]\n";
const DOCUMENTS_HEADER: &str = "[Session Documents]\n";

// ── Types ─────────────────────────────────────────────────────────────────

/// The bounded context for one generation.
///
/// Invariant: `estimated_tokens <= metadata.budget`, and the token
/// estimate of [`render`](Self::render) never exceeds `estimated_tokens`.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// The draft being refined or reviewed, possibly truncated
    pub draft: Option<String>,
    /// Selected conversation turns, oldest first
    pub messages: Vec<Message>,
    /// Selected knowledge chunks, in rank order
    pub chunks: Vec<ScoredChunk>,
    /// Selected session documents, in upload order
    pub documents: Vec<SessionDocumentSummary>,
    /// Total estimated tokens of everything selected
    pub estimated_tokens: usize,
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyMetadata {
    /// Configured token budget.
    pub budget: usize,
    /// Budget utilization percentage (0.0–100.0).
    pub utilization_pct: f32,
    /// The budget could not cover the conversation reservation, so
    /// knowledge and documents were skipped.
    pub starved: bool,
    pub per_layer: Vec<LayerStats>,
    pub drops: Vec<DropInfo>,
}

/// Statistics for a single context layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    pub name: String,
    /// Tokens consumed by this layer, header included.
    pub tokens: usize,
    pub items_included: usize,
    /// Items available before trimming.
    pub items_total: usize,
}

/// Items a layer had to leave out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropInfo {
    pub layer: String,
    pub items_dropped: usize,
    pub tokens_dropped: usize,
    pub reason: String,
}

impl AssembledContext {
    /// No knowledge chunk made it into the context.
    pub fn low_grounding(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn draft_section(&self) -> Option<String> {
        self.draft
            .as_ref()
            .map(|d| format!("{DRAFT_HEADER}{}", render_draft(d)))
    }

    pub fn conversation_section(&self) -> Option<String> {
        section(CONVERSATION_HEADER, self.messages.iter().map(render_message))
    }

    pub fn knowledge_section(&self) -> Option<String> {
        section(KNOWLEDGE_HEADER, self.chunks.iter().map(render_chunk))
    }

    pub fn documents_section(&self) -> Option<String> {
        section(DOCUMENTS_HEADER, self.documents.iter().map(render_document))
    }

    /// Every non-empty section, blank-line separated.
    pub fn render(&self) -> String {
        [
            self.draft_section(),
            self.conversation_section(),
            self.knowledge_section(),
            self.documents_section(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

fn section(header: &str, items: impl Iterator<Item = String>) -> Option<String> {
    let body: String = items.collect();
    (!body.is_empty()).then(|| format!("{header}{body}"))
}

// ── Item rendering and cost ───────────────────────────────────────────────

fn render_draft(draft: &str) -> String {
    format!("{draft}\n")
}

fn render_message(msg: &Message) -> String {
    format!("{}: {}\n", msg.role.label(), msg.content)
}

fn render_chunk(hit: &ScoredChunk) -> String {
    format!("[{} | {}] {}\n", hit.chunk.category, hit.chunk.id, hit.chunk.text)
}

fn render_document(doc: &SessionDocumentSummary) -> String {
    format!("- {}: {}\n", doc.title, doc.summary)
}

/// Header plus one separator between sections.
fn section_overhead(header: &str) -> usize {
    token::estimate_tokens(header) + 1
}

/// A role label is at most seven characters, so the rendered line never
/// costs more than the message estimate.
fn message_cost(msg: &Message) -> usize {
    token::estimate_message_tokens(msg)
}

/// Longest prefix of `text` whose rendered draft fits in `max_tokens`.
fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_bytes = (max_tokens * 4).saturating_sub(1);
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Stateless; safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    budget_tokens: usize,
    reserved_conversation_tokens: usize,
    max_history_messages: usize,
}

impl ContextAssembler {
    pub fn new(budget_tokens: usize, reserved_conversation_tokens: usize) -> Self {
        Self {
            budget_tokens,
            reserved_conversation_tokens,
            max_history_messages: 20,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.budget_tokens, config.reserved_conversation_tokens)
            .with_max_history(config.max_history_messages)
    }

    pub fn with_max_history(mut self, max_history_messages: usize) -> Self {
        self.max_history_messages = max_history_messages;
        self
    }

    pub fn budget_tokens(&self) -> usize {
        self.budget_tokens
    }

    /// Assemble against the configured budget.
    pub fn assemble(
        &self,
        retrieval: &RetrievalResult,
        conversation: &ConversationContext,
    ) -> AssembledContext {
        self.assemble_within(retrieval, conversation, self.budget_tokens)
    }

    /// Assemble against an explicit budget. Never fails.
    pub fn assemble_within(
        &self,
        retrieval: &RetrievalResult,
        conversation: &ConversationContext,
        budget: usize,
    ) -> AssembledContext {
        let mut used = 0;
        let mut per_layer = Vec::with_capacity(4);
        let mut drops = Vec::new();

        // Phase 1: draft, then newest turns inside the reservation
        let (draft, draft_stats, draft_drop) = Self::select_draft(conversation.draft(), budget);
        used += draft_stats.tokens;
        per_layer.push(draft_stats);
        drops.extend(draft_drop);

        let history = self.history_window(&conversation.messages);
        let mut turns = TurnWindow::default();
        let reserve_limit = self.reserved_conversation_tokens.min(budget);
        turns.extend(history, &mut used, reserve_limit);

        let starved = budget < self.reserved_conversation_tokens;
        let hits = retrieval.hits();
        let usable_docs: Vec<&SessionDocumentSummary> = conversation.usable_documents().collect();

        let (chunks, documents) = if starved {
            per_layer.push(Self::empty_stats("knowledge", hits.len()));
            per_layer.push(Self::empty_stats("documents", usable_docs.len()));
            let reason = "Budget below conversation reservation";
            drops.extend(Self::maybe_drop(
                "knowledge",
                hits.len(),
                hits.iter().map(|h| token::estimate_tokens(&render_chunk(h))).sum(),
                reason,
            ));
            drops.extend(Self::maybe_drop(
                "documents",
                usable_docs.len(),
                usable_docs
                    .iter()
                    .map(|d| token::estimate_tokens(&render_document(d)))
                    .sum(),
                reason,
            ));
            (Vec::new(), Vec::new())
        } else {
            // Phase 2: knowledge chunks
            let (chunks, stats, drop) = Self::select_greedy(
                "knowledge",
                KNOWLEDGE_HEADER,
                hits,
                render_chunk,
                &mut used,
                budget,
                "Lower-ranked chunks dropped",
            );
            per_layer.push(stats);
            drops.extend(drop);

            // Phase 3: document summaries
            let (documents, stats, drop) = Self::select_greedy(
                "documents",
                DOCUMENTS_HEADER,
                &usable_docs,
                |d| render_document(d),
                &mut used,
                budget,
                "Later documents dropped",
            );
            per_layer.push(stats);
            drops.extend(drop);

            (chunks, documents.into_iter().cloned().collect())
        };

        // Phase 4: leftover budget reaches further back in the conversation
        turns.extend(history, &mut used, budget);

        let dropped_turns = history.len() - turns.selected.len();
        let skipped_by_cap = conversation.messages.len() - history.len();
        per_layer.push(LayerStats {
            name: "conversation".into(),
            tokens: turns.tokens,
            items_included: turns.selected.len(),
            items_total: conversation.messages.len(),
        });
        drops.extend(Self::maybe_drop(
            "conversation",
            dropped_turns + skipped_by_cap,
            history[..dropped_turns].iter().map(message_cost).sum(),
            "Oldest turns dropped (sliding window)",
        ));

        for drop in &drops {
            debug!(
                layer = %drop.layer,
                items = drop.items_dropped,
                tokens = drop.tokens_dropped,
                reason = %drop.reason,
                "Context assembly dropped items"
            );
        }

        let messages = turns.into_chronological();
        AssembledContext {
            draft,
            messages,
            chunks,
            documents,
            estimated_tokens: used,
            metadata: AssemblyMetadata {
                budget,
                utilization_pct: if budget > 0 {
                    (used as f32 / budget as f32) * 100.0
                } else {
                    0.0
                },
                starved,
                per_layer,
                drops,
            },
        }
    }

    // ── Private layer selectors ───────────────────────────────────────────

    fn history_window<'m>(&self, messages: &'m [Message]) -> &'m [Message] {
        let start = messages.len().saturating_sub(self.max_history_messages);
        &messages[start..]
    }

    fn select_draft(
        draft: Option<&str>,
        budget: usize,
    ) -> (Option<String>, LayerStats, Option<DropInfo>) {
        let layer = "draft";
        let Some(draft) = draft else {
            return (None, Self::empty_stats(layer, 0), None);
        };

        let overhead = section_overhead(DRAFT_HEADER);
        let full_cost = token::estimate_tokens(&render_draft(draft));
        if overhead + full_cost <= budget {
            let stats = LayerStats {
                name: layer.into(),
                tokens: overhead + full_cost,
                items_included: 1,
                items_total: 1,
            };
            return (Some(draft.to_string()), stats, None);
        }

        let kept = truncate_to_tokens(draft, budget.saturating_sub(overhead));
        if kept.trim().is_empty() {
            return (
                None,
                Self::empty_stats(layer, 1),
                Self::maybe_drop(layer, 1, full_cost, "No budget available for draft"),
            );
        }

        let cost = overhead + token::estimate_tokens(&render_draft(kept));
        (
            Some(kept.to_string()),
            LayerStats {
                name: layer.into(),
                tokens: cost,
                items_included: 1,
                items_total: 1,
            },
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: 0,
                tokens_dropped: (overhead + full_cost).saturating_sub(cost),
                reason: "Draft truncated to fit budget".into(),
            }),
        )
    }

    /// Take items in order while they fit; skip the ones that don't.
    fn select_greedy<'a, T: Clone>(
        layer: &str,
        header: &str,
        items: &'a [T],
        render: impl Fn(&T) -> String,
        used: &mut usize,
        budget: usize,
        reason: &str,
    ) -> (Vec<T>, LayerStats, Option<DropInfo>) {
        if items.is_empty() {
            return (Vec::new(), Self::empty_stats(layer, 0), None);
        }

        let overhead = section_overhead(header);
        let mut tokens = 0;
        let mut included = Vec::new();
        let mut dropped = 0;
        let mut dropped_tokens = 0;

        for item in items {
            let cost = token::estimate_tokens(&render(item));
            let header_cost = if included.is_empty() { overhead } else { 0 };
            if *used + header_cost + cost <= budget {
                *used += header_cost + cost;
                tokens += header_cost + cost;
                included.push(item.clone());
            } else {
                dropped += 1;
                dropped_tokens += cost;
            }
        }

        let stats = LayerStats {
            name: layer.into(),
            tokens,
            items_included: included.len(),
            items_total: items.len(),
        };
        (
            included,
            stats,
            Self::maybe_drop(layer, dropped, dropped_tokens, reason),
        )
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    fn empty_stats(layer: &str, total: usize) -> LayerStats {
        LayerStats {
            name: layer.into(),
            tokens: 0,
            items_included: 0,
            items_total: total,
        }
    }

    fn maybe_drop(layer: &str, count: usize, tokens: usize, reason: &str) -> Option<DropInfo> {
        if count > 0 {
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: count,
                tokens_dropped: tokens,
                reason: reason.into(),
            })
        } else {
            None
        }
    }
}

/// Contiguous window of the newest turns, grown from the end backwards.
#[derive(Default)]
struct TurnWindow {
    /// Newest first
    selected: Vec<Message>,
    tokens: usize,
}

impl TurnWindow {
    /// Stops at the first turn that does not fit, so the window never
    /// has gaps.
    fn extend(&mut self, history: &[Message], used: &mut usize, limit: usize) {
        let overhead = section_overhead(CONVERSATION_HEADER);
        let start = self.selected.len();

        for msg in history.iter().rev().skip(start) {
            let header_cost = if self.selected.is_empty() { overhead } else { 0 };
            let cost = header_cost + message_cost(msg);
            if *used + cost > limit {
                return;
            }
            *used += cost;
            self.tokens += cost;
            self.selected.push(msg.clone());
        }
    }

    fn into_chronological(mut self) -> Vec<Message> {
        self.selected.reverse();
        self.selected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
