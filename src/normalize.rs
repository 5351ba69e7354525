//! # Text Normalization Module
//!
//! Cleans raw OCR output before segmentation: whitespace collapsing, a
//! fixed table of character-level corrections for common optical confusions,
//! social-media artifact stripping, and unit pluralization.
//!
//! ## Known limitation
//!
//! The character substitutions are best-effort and lossy. In particular the
//! digit-zero to letter-O rule repairs misread ingredient names ("0nion")
//! but corrupts legitimate zeros in quantities ("10 cups" becomes
//! "1O cups"). The rule set is fixed; it is deliberately not extended with
//! context-sensitive exceptions.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Runs of horizontal whitespace (everything but newlines)
    static ref HORIZONTAL_WS: Regex =
        Regex::new(r"[^\S\n]+").expect("horizontal whitespace pattern should be valid");
    /// Runs of newlines, possibly separated by blank space
    static ref BLANK_LINES: Regex =
        Regex::new(r"\n(?:\s*\n)+").expect("blank line pattern should be valid");
    /// Pipe and backslash are the most frequent misreads of capital I
    static ref PIPE_BACKSLASH: Regex =
        Regex::new(r"[|\\]").expect("pipe pattern should be valid");
    /// Isolated punctuation-only tokens left by list bullets and social tags
    static ref ARTIFACT_TOKEN: Regex =
        Regex::new(r"^[@#&%$*]+$").expect("artifact pattern should be valid");
}

/// Plural and long-form unit words normalized to their singular canonical
/// form, matched as whole words, case-insensitively. One rule per entry,
/// applied in order.
const UNIT_CORRECTIONS: [(&str, &str); 7] = [
    (r"(?i)\btsps?\b", "tsp"),
    (r"(?i)\btbsps?\b", "tbsp"),
    (r"(?i)\bcups?\b", "cup"),
    (r"(?i)\bozs?\b", "oz"),
    (r"(?i)\blbs?\b", "lb"),
    (r"(?i)\bcloves?\b", "clove"),
    (r"(?i)\bspoons?\b", "spoon"),
];

lazy_static! {
    static ref UNIT_RULES: Vec<(Regex, &'static str)> = UNIT_CORRECTIONS
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("unit correction pattern should be valid"),
                *replacement,
            )
        })
        .collect();
}

/// Collapse whitespace runs to single spaces, blank-line runs to single
/// newlines, and trim every line as well as the whole text.
fn collapse_whitespace(text: &str) -> String {
    let spaced = HORIZONTAL_WS.replace_all(text, " ");
    let folded = BLANK_LINES.replace_all(&spaced, "\n");
    folded
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Clean raw extracted text of OCR artifacts.
///
/// Pure function: no I/O, no shared state, and idempotent — running the
/// output through again yields the same string.
pub fn normalize(raw_text: &str) -> String {
    if raw_text.trim().is_empty() {
        return String::new();
    }

    let mut cleaned = collapse_whitespace(raw_text);

    // Fixed character-level corrections; see module docs for the zero->O
    // false-positive caveat.
    cleaned = PIPE_BACKSLASH.replace_all(&cleaned, "I").into_owned();
    cleaned = cleaned.replace('0', "O");

    // Drop whitespace-delimited tokens made entirely of bullet/social
    // punctuation; anything mixed with letters or digits is left alone.
    cleaned = cleaned
        .lines()
        .map(|line| {
            line.split(' ')
                .filter(|token| !ARTIFACT_TOKEN.is_match(token))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    for (pattern, replacement) in UNIT_RULES.iter() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }

    collapse_whitespace(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(normalize("2   cup    flour"), "2 cup flour");
        assert_eq!(normalize("  salt \t and  pepper  "), "salt and pepper");
    }

    #[test]
    fn test_collapses_blank_line_runs() {
        assert_eq!(normalize("line one\n\n\nline two"), "line one\nline two");
        assert_eq!(normalize("a\n \n\t\nb"), "a\nb");
    }

    #[test]
    fn test_pipe_and_backslash_become_i() {
        assert_eq!(normalize("|ngredients"), "Ingredients");
        assert_eq!(normalize(r"M\x"), "MIx");
    }

    #[test]
    fn test_zero_becomes_letter_o() {
        assert_eq!(normalize("0nion soup"), "Onion soup");
        // Known false positive on legitimate zeros
        assert_eq!(normalize("10 cups milk"), "1O cup milk");
    }

    #[test]
    fn test_strips_artifact_tokens() {
        assert_eq!(normalize("flour * sugar"), "flour sugar");
        assert_eq!(normalize("# shopping list"), "shopping list");
        assert_eq!(normalize("eggs @#$ milk"), "eggs milk");
    }

    #[test]
    fn test_unit_pluralization() {
        assert_eq!(normalize("2 cups flour"), "2 cup flour");
        assert_eq!(normalize("3 TSPS salt"), "3 tsp salt");
        assert_eq!(normalize("4 tbsps butter"), "4 tbsp butter");
        assert_eq!(normalize("2 cloves garlic"), "2 clove garlic");
        assert_eq!(normalize("8 ozs cheese"), "8 oz cheese");
    }

    #[test]
    fn test_whole_word_matching_only() {
        // "cupboard" must not be rewritten to "cupboard" minus its suffix
        assert_eq!(normalize("check the cupboard"), "check the cupboard");
        assert_eq!(normalize("teaspoonful"), "teaspoonful");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t  "), "");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "2 cups   flour\n\n1 tsps salt",
            "|ngredients: 0at milk * honey",
            "  # Pancakes \n Serves 4 \n\n 2 tbsps butter ",
            "plain text with no artifacts",
            "* * flour * * sugar",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
