//! Heuristic split of one generated text block into answer, citation and
//! analysis sections.
//!
//! The provider returns free-form natural language with no enforced schema,
//! so this is a best-effort line scanner: marker phrases switch the active
//! section, marker lines themselves are consumed, and missing sections get
//! fixed fallback text. It must never fail a request, whatever the input.

use crate::domain::StructuredAnswer;

/// Phrases that switch the scanner into citation mode.
const CITATION_MARKERS: &[&str] =
    &["relevant statute", "legal basis", "statutes cited", "citations", "references"];

/// Phrases that switch the scanner into analysis mode.
const ANALYSIS_MARKERS: &[&str] = &["legal analysis", "detailed analysis", "analysis", "explanation"];

const CITATION_FALLBACK: &str =
    "Consult a qualified lawyer for the exact statutory citations.";
const ANALYSIS_FALLBACK: &str =
    "For a detailed analysis of your specific situation, consult a legal professional.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Primary,
    Citation,
    Analysis,
}

/// Segment `text` into `{primary, citation, analysis}`.
///
/// Lines before the first marker accumulate into the primary section. If no
/// line was ever classified as primary, the entire original text stands in
/// for it; empty citation/analysis sections get their fallback sentences.
pub fn parse_structured_answer(text: &str) -> StructuredAnswer {
    let mut section = Section::Primary;
    let mut primary: Vec<&str> = Vec::new();
    let mut citation: Vec<&str> = Vec::new();
    let mut analysis: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lowered = line.to_lowercase();
        if CITATION_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            section = Section::Citation;
            continue;
        }
        if ANALYSIS_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            section = Section::Analysis;
            continue;
        }

        match section {
            Section::Primary => primary.push(line),
            Section::Citation => citation.push(line),
            Section::Analysis => analysis.push(line),
        }
    }

    StructuredAnswer {
        primary: if primary.is_empty() { text.to_string() } else { primary.join("\n") },
        citation: if citation.is_empty() {
            CITATION_FALLBACK.to_string()
        } else {
            citation.join("\n")
        },
        analysis: if analysis.is_empty() {
            ANALYSIS_FALLBACK.to_string()
        } else {
            analysis.join("\n")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_structured_answer, ANALYSIS_FALLBACK, CITATION_FALLBACK};

    #[test]
    fn well_formed_response_fills_all_three_sections() {
        let text = "You cannot marry your first cousin.\n\
                    \n\
                    Relevant statutes:\n\
                    Civil Code, Article 1048.\n\
                    \n\
                    Legal analysis:\n\
                    Marriage between close relatives is void from the outset.";

        let answer = parse_structured_answer(text);
        assert_eq!(answer.primary, "You cannot marry your first cousin.");
        assert_eq!(answer.citation, "Civil Code, Article 1048.");
        assert_eq!(answer.analysis, "Marriage between close relatives is void from the outset.");
    }

    #[test]
    fn markerless_response_becomes_primary_with_fallbacks() {
        let text = "Short answer with no structure at all.";
        let answer = parse_structured_answer(text);

        assert_eq!(answer.primary, text);
        assert_eq!(answer.citation, CITATION_FALLBACK);
        assert_eq!(answer.analysis, ANALYSIS_FALLBACK);
    }

    #[test]
    fn marker_only_response_falls_back_to_whole_text_as_primary() {
        let text = "References:\nAnalysis:";
        let answer = parse_structured_answer(text);

        // No line was ever classified, so the raw text survives as primary.
        assert_eq!(answer.primary, text);
        assert_eq!(answer.citation, CITATION_FALLBACK);
        assert_eq!(answer.analysis, ANALYSIS_FALLBACK);
    }

    #[test]
    fn reordered_sections_still_land_in_the_right_buckets() {
        let text = "Here is the direct answer.\n\
                    Detailed analysis:\n\
                    The landlord bears the burden of proof.\n\
                    Citations:\n\
                    Contract Law, Article 107.";

        let answer = parse_structured_answer(text);
        assert_eq!(answer.primary, "Here is the direct answer.");
        assert_eq!(answer.analysis, "The landlord bears the burden of proof.");
        assert_eq!(answer.citation, "Contract Law, Article 107.");
    }

    #[test]
    fn blank_lines_are_dropped_and_multi_line_sections_join() {
        let text = "First answer line.\n\
                    \n\
                    Second answer line.\n\
                    Legal basis:\n\
                    Article 3.\n\
                    \n\
                    Article 9.";

        let answer = parse_structured_answer(text);
        assert_eq!(answer.primary, "First answer line.\nSecond answer line.");
        assert_eq!(answer.citation, "Article 3.\nArticle 9.");
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        let text = "Answer.\nRELEVANT STATUTE:\nArticle 12.";
        let answer = parse_structured_answer(text);
        assert_eq!(answer.citation, "Article 12.");
    }
}
