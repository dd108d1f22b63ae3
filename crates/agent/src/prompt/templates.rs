//! Prompt wording used by the composer.

use warren_core::generation::{AudienceType, ContentType};

pub const SYSTEM_BASE: &str = "\
You are Warren, a marketing compliance assistant for registered investment \
advisers and broker-dealer representatives. You write marketing content that \
complies with the SEC Marketing Rule (206(4)-1) and FINRA Rule 2210.

Always:
- Keep claims fair, balanced, and not misleading; pair any benefit with its material risks.
- Never promise or guarantee returns, performance, or outcomes.
- Never use testimonials or endorsements without the required disclosures.
- Include the disclosures and disclaimers the content needs.
- Ground compliance statements in the knowledge provided; do not invent rules or citations.";

/// The delimiter contract. The marker must appear here verbatim.
pub const DELIMITER_INSTRUCTIONS: &str = "\
Output format:
- Put the complete marketing content, and nothing else, between two lines that \
each contain exactly ##MARKETINGCONTENT## and nothing more.
- Emit exactly one such block. Any explanation, questions, or notes go outside it.
- If you need more information before writing, ask your questions and do not \
emit the marker at all.";

pub const CREATE_INSTRUCTIONS: &str = "\
Task: create new marketing content for the advisor's request below. If the \
request is too vague to write compliant content, ask clarifying questions instead.";

pub const REFINE_INSTRUCTIONS: &str = "\
Task: revise the current draft according to the advisor's request below. Apply \
the requested changes, keep everything else that is already compliant, and \
briefly explain what you changed outside the content block.";

pub const REVIEW_INSTRUCTIONS: &str = "\
Task: audit the current draft for compliance. List each issue with the rule it \
touches and why, outside the content block. Then provide a corrected version of \
the full content inside the content block.";

/// Used when the knowledge base returned nothing usable.
pub const GENERIC_DISCLAIMER: &str = "This content is for general educational purposes only \
and is not investment advice. Investing involves risk, including possible loss of principal.";

pub fn no_sources_instructions() -> String {
    format!(
        "No supporting sources were found in the compliance knowledge base for this request. \
Do not cite specific rules, statistics, or performance figures. Keep the content general \
and educational, and include this disclaimer in the content verbatim:\n\"{GENERIC_DISCLAIMER}\""
    )
}

/// Platform constraints for one content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformHint {
    pub content_type: ContentType,
    pub char_limit: Option<usize>,
    pub guidance: &'static str,
}

impl PlatformHint {
    pub fn for_content_type(content_type: ContentType) -> Self {
        let guidance = match content_type {
            ContentType::Linkedin => {
                "Professional tone. Open with a strong first line, use short paragraphs, \
and end with a soft call to action. At most three hashtags."
            }
            ContentType::Twitter => {
                "One focused idea. Disclosures count toward the limit; link to fuller \
disclosures when they do not fit."
            }
            ContentType::Facebook => {
                "Conversational and approachable. Avoid urgency or fear-based language."
            }
            ContentType::Instagram => {
                "Caption for a visual post. Lead with the key message; keep disclosures \
in the caption itself, not only in the image."
            }
            ContentType::Email => {
                "Include a subject line and preview text, a clear body, and the \
disclosures in the footer."
            }
            ContentType::Newsletter => {
                "Use headed sections. Date any market commentary and keep opinions \
labelled as opinions."
            }
            ContentType::Blog => {
                "Long form with a headline and subheadings. Educational framing; \
sources for any data you cite."
            }
            ContentType::Website => {
                "Evergreen copy. Avoid time-sensitive claims and performance figures."
            }
            ContentType::General => "Match the format to the advisor's request.",
        };
        Self {
            content_type,
            char_limit: content_type.char_limit(),
            guidance,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("Platform: {}\n{}", self.content_type.label(), self.guidance);
        match self.char_limit {
            Some(limit) => out.push_str(&format!(
                "\nHard limit: {limit} characters for the content block, disclosures included."
            )),
            None if self.content_type.is_long_form() => {
                out.push_str("\nLong-form: depth is welcome, but stay on one topic.")
            }
            None => {}
        }
        out
    }
}

pub fn audience_guidance(audience: AudienceType) -> &'static str {
    match audience {
        AudienceType::General => "Write for a general audience; avoid jargon.",
        AudienceType::Prospects => {
            "Readers are not yet clients: educate, do not solicit specific products."
        }
        AudienceType::Clients => {
            "Readers are existing clients: reinforce the relationship without implying guarantees."
        }
        AudienceType::Retirees => {
            "Readers are in or near retirement: focus on income, longevity, and risk, in plain language."
        }
        AudienceType::HighNetWorth => {
            "Readers have significant assets: sophistication is fine, but disclose risks fully."
        }
        AudienceType::BusinessOwners => {
            "Readers own businesses: connect to succession, cash flow, and benefit planning."
        }
        AudienceType::YoungProfessionals => {
            "Readers are early in their careers: focus on habits, saving, and time horizon."
        }
    }
}
