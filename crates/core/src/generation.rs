//! Generation-side domain types: platform and audience hints, prompt
//! mode, the extracted outcome of one model call, and source provenance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::knowledge::{ChunkCategory, SearchStrategy};

/// Target platform for generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[serde(alias = "LinkedIn")]
    Linkedin,
    #[serde(alias = "x")]
    Twitter,
    Facebook,
    Instagram,
    Email,
    Newsletter,
    Blog,
    Website,
    #[default]
    General,
}

impl ContentType {
    /// Single search keyword used to bias retrieval toward this platform.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Email => "email",
            Self::Newsletter => "newsletter",
            Self::Blog => "blog",
            Self::Website => "website",
            Self::General => "",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Linkedin => "LinkedIn post",
            Self::Twitter => "X (Twitter) post",
            Self::Facebook => "Facebook post",
            Self::Instagram => "Instagram caption",
            Self::Email => "email",
            Self::Newsletter => "newsletter",
            Self::Blog => "blog article",
            Self::Website => "website copy",
            Self::General => "marketing content",
        }
    }

    /// Hard character limit of the platform, if it has one.
    pub fn char_limit(&self) -> Option<usize> {
        match self {
            Self::Linkedin => Some(3000),
            Self::Twitter => Some(280),
            Self::Facebook => Some(2000),
            Self::Instagram => Some(2200),
            _ => None,
        }
    }

    pub fn is_long_form(&self) -> bool {
        matches!(self, Self::Newsletter | Self::Blog | Self::Website | Self::Email)
    }
}

/// Intended audience for generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceType {
    #[default]
    General,
    Prospects,
    Clients,
    Retirees,
    HighNetWorth,
    BusinessOwners,
    YoungProfessionals,
}

impl AudienceType {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::General => "",
            Self::Prospects => "prospects",
            Self::Clients => "clients",
            Self::Retirees => "retirees",
            Self::HighNetWorth => "high net worth",
            Self::BusinessOwners => "business owners",
            Self::YoungProfessionals => "young professionals",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "a general audience",
            Self::Prospects => "prospective clients",
            Self::Clients => "existing clients",
            Self::Retirees => "retirees and pre-retirees",
            Self::HighNetWorth => "high-net-worth individuals",
            Self::BusinessOwners => "business owners",
            Self::YoungProfessionals => "young professionals",
        }
    }
}

/// Which prompt template drives a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Create,
    Refine,
    Review,
}

impl GenerationMode {
    /// Pick the mode from explicit caller signals.
    ///
    /// Called by the session-owning collaborator. The prompt composer takes
    /// the mode as input and never infers it.
    pub fn select(
        is_refinement: bool,
        current_content: Option<&str>,
        review_requested: bool,
    ) -> Self {
        let has_content = current_content.is_some_and(|c| !c.trim().is_empty());
        if review_requested && has_content {
            Self::Review
        } else if is_refinement && has_content {
            Self::Refine
        } else {
            Self::Create
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Refine => "refine",
            Self::Review => "review",
        }
    }
}

/// Structural problems found while splitting model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionDiagnostic {
    /// No delimiter at all; the model is still gathering requirements
    NoDelimiters,
    /// A single opening delimiter with no closing partner
    UnclosedDelimiter,
    /// More than one complete pair; only the first was extracted
    MultiplePairs { count: usize },
    /// A leftover delimiter after the last complete pair
    DanglingDelimiter,
}

/// The split result of one model call. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// Model output exactly as received
    pub raw_text: String,

    /// Text between the first delimiter pair
    pub marketing_content: Option<String>,

    /// Everything outside the extracted pair
    pub conversational_text: String,

    /// Exactly one matched delimiter pair was found
    pub well_formed: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ExtractionDiagnostic>,
}

/// Provenance metrics that accompany every outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    /// Chunks that actually made it into the prompt
    pub total_sources: usize,
    pub by_category: BTreeMap<ChunkCategory, usize>,
    pub strategy: SearchStrategy,
    pub fallback_used: bool,
    /// In [0, 1]; higher means better grounded
    pub quality_score: f64,
    pub vector_results_found: usize,
    pub text_results_found: usize,
    pub marketing_examples_count: usize,
    pub compliance_rules_count: usize,
    /// Set when the budget forced every source out, or none were found
    pub low_grounding: bool,
}
