//! Prompt Composer.
//!
//! Pure string assembly: the caller picks the [`GenerationMode`] and the
//! composer maps it to a template, adds platform and audience guidance,
//! the assembled context, and the delimiter contract. No I/O.

pub mod templates;

use warren_core::generation::{AudienceType, ContentType, GenerationMode};
use warren_core::provider::ChatMessage;

use crate::context::AssembledContext;
use templates::PlatformHint;

/// A composed prompt, ready for the Generation Client.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub mode: GenerationMode,
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(&self.system), ChatMessage::user(&self.user)]
    }
}

/// Per-call inputs besides the assembled context.
#[derive(Debug, Clone, Copy)]
pub struct ComposeRequest<'a> {
    pub mode: GenerationMode,
    pub content_type: ContentType,
    pub audience: AudienceType,
    /// The advisor's message for this turn
    pub request: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, input: ComposeRequest<'_>, context: &AssembledContext) -> Prompt {
        let task = match input.mode {
            GenerationMode::Create => templates::CREATE_INSTRUCTIONS,
            GenerationMode::Refine => templates::REFINE_INSTRUCTIONS,
            GenerationMode::Review => templates::REVIEW_INSTRUCTIONS,
        };

        let mut system = vec![
            templates::SYSTEM_BASE.to_string(),
            task.to_string(),
            PlatformHint::for_content_type(input.content_type).render(),
            format!(
                "Audience: {}\n{}",
                input.audience.label(),
                templates::audience_guidance(input.audience)
            ),
        ];
        if context.chunks.is_empty() {
            system.push(templates::no_sources_instructions());
        }
        system.push(templates::DELIMITER_INSTRUCTIONS.to_string());

        let rendered = context.render();
        let mut user = String::new();
        if !rendered.is_empty() {
            user.push_str(&rendered);
            user.push('\n');
        }
        user.push_str("[Advisor Request]\n");
        user.push_str(input.request.trim());

        Prompt {
            mode: input.mode,
            system: system.join("\n\n"),
            user,
        }
    }
}
