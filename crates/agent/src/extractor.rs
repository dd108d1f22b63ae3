//! Content Extractor for the `##MARKETINGCONTENT##` delimiter protocol.
//!
//! The same marker opens and closes a block. Marker occurrences are
//! paired left to right; the first pair's interior is the marketing
//! content and everything outside that pair is conversational text.
//! Malformed output is never an error: it yields `well_formed = false`
//! plus [`ExtractionDiagnostic`]s, which are also logged.

use tracing::warn;
use warren_core::generation::{ExtractionDiagnostic, GenerationOutcome};

/// The literal delimiter. Downstream UIs match it byte for byte.
pub const MARKER: &str = "##MARKETINGCONTENT##";

/// Wrap content the way the model is instructed to.
pub fn wrap(content: &str) -> String {
    format!("{MARKER}\n{content}\n{MARKER}")
}

/// Split raw model text into marketing content and conversational remainder.
pub fn extract(raw: &str) -> GenerationOutcome {
    let positions: Vec<usize> = raw.match_indices(MARKER).map(|(i, _)| i).collect();
    let pairs = positions.len() / 2;
    let dangling = positions.len() % 2 == 1;

    let mut diagnostics = Vec::new();
    match (pairs, dangling) {
        (0, false) => diagnostics.push(ExtractionDiagnostic::NoDelimiters),
        (0, true) => diagnostics.push(ExtractionDiagnostic::UnclosedDelimiter),
        (_, true) => diagnostics.push(ExtractionDiagnostic::DanglingDelimiter),
        _ => {}
    }
    if pairs > 1 {
        diagnostics.push(ExtractionDiagnostic::MultiplePairs { count: pairs });
    }

    let well_formed = pairs == 1 && !dangling;
    if !diagnostics.is_empty() && diagnostics != [ExtractionDiagnostic::NoDelimiters] {
        warn!(?diagnostics, markers = positions.len(), "Malformed model output");
    }

    if pairs == 0 {
        return GenerationOutcome {
            raw_text: raw.to_string(),
            marketing_content: None,
            conversational_text: raw.trim().to_string(),
            well_formed: false,
            diagnostics,
        };
    }

    let open_end = positions[0] + MARKER.len();
    let close_start = positions[1];
    let content = strip_one_newline(&raw[open_end..close_start]);

    let before = raw[..positions[0]].trim_end();
    let after = raw[close_start + MARKER.len()..].trim_start();
    let conversational_text = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.trim_end().to_string(),
        (false, true) => before.trim_start().to_string(),
        (false, false) => format!("{before}\n\n{after}").trim().to_string(),
    };

    GenerationOutcome {
        raw_text: raw.to_string(),
        marketing_content: Some(content.to_string()),
        conversational_text,
        well_formed,
        diagnostics,
    }
}

/// Drop exactly one line break right after the opening marker and one
/// right before the closing marker, so `extract(wrap(s)) == s`.
///
/// A bare `\n` after the opening marker means the closing side is a bare
/// `\n` too; a `\r` ending the content itself must survive.
fn strip_one_newline(inner: &str) -> &str {
    if let Some(rest) = inner.strip_prefix("\r\n") {
        return strip_trailing_newline(rest);
    }
    if let Some(rest) = inner.strip_prefix('\n') {
        return rest.strip_suffix('\n').unwrap_or(rest);
    }
    strip_trailing_newline(inner)
}

fn strip_trailing_newline(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn well_formed_block_is_split() {
        let raw = format!(
            "Here is your post.\n\n{}\n\nLet me know if you want changes.",
            wrap("Retirement is a journey.\n\nInvesting involves risk.")
        );
        let out = extract(&raw);
        assert!(out.well_formed);
        assert!(out.diagnostics.is_empty());
        assert_eq!(
            out.marketing_content.as_deref(),
            Some("Retirement is a journey.\n\nInvesting involves risk.")
        );
        assert_eq!(
            out.conversational_text,
            "Here is your post.\n\nLet me know if you want changes."
        );
        assert_eq!(out.raw_text, raw);
    }

    #[test]
    fn no_delimiters_is_conversation_only() {
        let out = extract("  What audience is this for?  ");
        assert!(!out.well_formed);
        assert!(out.marketing_content.is_none());
        assert_eq!(out.conversational_text, "What audience is this for?");
        assert_eq!(out.diagnostics, vec![ExtractionDiagnostic::NoDelimiters]);
    }

    #[test]
    fn unclosed_delimiter_extracts_nothing() {
        let raw = format!("Draft below\n{MARKER}\nRetirement tips");
        let out = extract(&raw);
        assert!(!out.well_formed);
        assert!(out.marketing_content.is_none());
        assert_eq!(out.conversational_text, raw.trim());
        assert_eq!(out.diagnostics, vec![ExtractionDiagnostic::UnclosedDelimiter]);
    }

    #[test]
    fn multiple_pairs_extract_first() {
        let raw = format!("{}\nand another\n{}", wrap("first"), wrap("second"));
        let out = extract(&raw);
        assert!(!out.well_formed);
        assert_eq!(out.marketing_content.as_deref(), Some("first"));
        assert!(out.conversational_text.contains("second"));
        assert_eq!(
            out.diagnostics,
            vec![ExtractionDiagnostic::MultiplePairs { count: 2 }]
        );
    }

    #[test]
    fn trailing_dangling_marker_is_flagged() {
        let raw = format!("{}\n{MARKER} oops", wrap("content"));
        let out = extract(&raw);
        assert!(!out.well_formed);
        assert_eq!(out.marketing_content.as_deref(), Some("content"));
        assert_eq!(out.diagnostics, vec![ExtractionDiagnostic::DanglingDelimiter]);
    }

    #[test]
    fn mid_sentence_markers_pair_left_to_right() {
        let raw = format!("Sure {MARKER}Save early{MARKER} done");
        let out = extract(&raw);
        assert!(out.well_formed);
        assert_eq!(out.marketing_content.as_deref(), Some("Save early"));
        assert_eq!(out.conversational_text, "Sure\n\ndone");
    }

    #[test]
    fn crlf_line_endings_are_stripped_once() {
        let raw = format!("{MARKER}\r\nLine one\r\n{MARKER}");
        assert_eq!(extract(&raw).marketing_content.as_deref(), Some("Line one"));
    }

    #[test]
    fn carriage_return_inside_content_survives() {
        assert_eq!(extract(&wrap("ends with cr\r")).marketing_content.as_deref(), Some("ends with cr\r"));
    }

    #[test]
    fn empty_block_is_some_empty() {
        let out = extract(&wrap(""));
        assert!(out.well_formed);
        assert_eq!(out.marketing_content.as_deref(), Some(""));
        assert_eq!(out.conversational_text, "");
    }

    #[test]
    fn re_extracting_rewrapped_content_is_idempotent() {
        let first = extract(&format!("Intro\n{}\nOutro", wrap("  Padded content  \n")));
        let content = first.marketing_content.unwrap();
        let second = extract(&wrap(&content));
        assert_eq!(second.marketing_content.unwrap(), content);
    }

    proptest! {
        #[test]
        fn wrap_then_extract_is_identity(s in any::<String>().prop_filter("no marker", |s| !s.contains(MARKER))) {
            let out = extract(&wrap(&s));
            prop_assert!(out.well_formed);
            prop_assert_eq!(out.marketing_content, Some(s));
        }

        #[test]
        fn text_without_markers_never_has_content(s in "[^#]*") {
            let out = extract(&s);
            prop_assert!(!out.well_formed);
            prop_assert!(out.marketing_content.is_none());
        }
    }
}
