//! # Recipe Segmentation Module
//!
//! Classifies cleaned recipe text line-by-line into title, servings, cook
//! time, ingredient lines, and instruction lines. The heuristics are an
//! explicit, ordered rule list of compiled regex patterns so each rule can
//! be unit-tested independently.
//!
//! Rule precedence per line:
//! 1. Section headers switch the tracked section and are skipped as content.
//! 2. Metadata extraction (servings, cook time, title) always runs; it is
//!    independent of content classification, so one line may contribute both.
//! 3. Ingredient classification is attempted before instruction
//!    classification; a line is never both.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Structured recipe produced per analysis request and discarded after the
/// response is returned; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStructure {
    /// Best-guess single line: the first line of 11..=99 characters
    pub title: Option<String>,
    /// Parsed from a "serves/makes N" pattern; last sighting wins
    pub servings: Option<u32>,
    /// Like "30 min"; last sighting wins
    pub cook_time: Option<String>,
    /// Raw matched ingredient-like lines, in input order. Parsing into
    /// records is delegated to the external scorer with this as a hint.
    pub ingredients: Vec<String>,
    /// Matched instruction-like lines, in input order
    pub instructions: Vec<String>,
}

/// Section the line cursor is currently inside. Classification is
/// per-line and does not consult this, but the cursor is tracked for
/// section-aware heuristics later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Ingredients,
    Instructions,
}

lazy_static! {
    static ref HEADER_INGREDIENTS: Regex = Regex::new(r"(?i)^(ingredients?|what you.?ll need)")
        .expect("ingredients header pattern should be valid");
    static ref HEADER_INSTRUCTIONS: Regex =
        Regex::new(r"(?i)^(instructions?|directions?|method|steps?)")
            .expect("instructions header pattern should be valid");
    static ref SERVINGS: Regex = Regex::new(r"(?i)(?:serves?|servings?|makes?)[:\s]*(\d+)")
        .expect("servings pattern should be valid");
    static ref COOK_TIME: Regex =
        Regex::new(r"(?i)(\d+)\s*(min|minute|hour|hr)").expect("cook time pattern should be valid");

    /// Ordered ingredient rules: leading quantity then unit word; quantity
    /// with a fraction then unit; unit word then "of"-optional noun phrase.
    static ref INGREDIENT_RULES: Vec<Regex> = vec![
        Regex::new(r"(?i)^\d+[\s\w]*(?:cup|tsp|tbsp|lb|oz|g|kg|ml|l|piece|clove)")
            .expect("quantity-unit pattern should be valid"),
        Regex::new(r"(?i)^\d+\s*[/\d]*\s*(?:cup|tsp|tbsp|lb|oz|g|kg|ml|l)")
            .expect("fraction-unit pattern should be valid"),
        Regex::new(r"(?i)\b(?:cup|tsp|tbsp|lb|oz|g|kg|ml|l)\s+(?:of\s+)?[\w\s]+")
            .expect("unit-noun pattern should be valid"),
    ];

    /// A numbered/ordinal step marker; such lines are instructions
    /// regardless of length.
    static ref STEP_MARKER: Regex =
        Regex::new(r"^\d+[.)]\s").expect("step marker pattern should be valid");
    /// Sequencing adverbs and cooking verbs; these need the length floor to
    /// reject short noise.
    static ref INSTRUCTION_PROSE_RULES: Vec<Regex> = vec![
        Regex::new(r"(?i)^(?:first|next|then|finally|meanwhile|after)")
            .expect("sequencing adverb pattern should be valid"),
        Regex::new(r"(?i)(?:heat|cook|bake|mix|stir|add|combine|place|put)")
            .expect("cooking verb pattern should be valid"),
    ];
}

/// Minimum length (exclusive) for prose-rule instruction lines
const INSTRUCTION_MIN_LEN: usize = 20;
/// Exclusive title length bounds
const TITLE_MIN_LEN: usize = 10;
const TITLE_MAX_LEN: usize = 100;

/// True if the line matches any ingredient rule
pub fn looks_like_ingredient(line: &str) -> bool {
    let line = line.trim();
    INGREDIENT_RULES.iter().any(|rule| rule.is_match(line))
}

/// True if the line matches an instruction rule. Numbered step markers
/// qualify at any length; adverb/verb matches only past the length floor.
pub fn looks_like_instruction(line: &str) -> bool {
    let trimmed = line.trim();
    if STEP_MARKER.is_match(trimmed) {
        return true;
    }
    trimmed.len() > INSTRUCTION_MIN_LEN
        && INSTRUCTION_PROSE_RULES.iter().any(|rule| rule.is_match(trimmed))
}

/// Segment cleaned text into a [`RecipeStructure`].
///
/// Single pass over non-empty trimmed lines; empty input yields a structure
/// with all fields empty, never an error. Deterministic: the same text
/// always produces a structurally identical result.
pub fn segment(text: &str) -> RecipeStructure {
    let mut structure = RecipeStructure::default();
    let mut current_section = Section::Unknown;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if HEADER_INGREDIENTS.is_match(line) {
            current_section = Section::Ingredients;
            debug!(section = ?current_section, "Section header detected");
            continue;
        }
        if HEADER_INSTRUCTIONS.is_match(line) {
            current_section = Section::Instructions;
            debug!(section = ?current_section, "Section header detected");
            continue;
        }

        if let Some(capture) = SERVINGS.captures(line) {
            if let Ok(servings) = capture[1].parse::<u32>() {
                structure.servings = Some(servings);
            }
        }

        if let Some(capture) = COOK_TIME.captures(line) {
            structure.cook_time = Some(format!("{} {}", &capture[1], &capture[2]));
        }

        if structure.title.is_none() {
            // Bounds are in characters; byte length over-counts
            // non-ASCII headings
            let chars = line.chars().count();
            if chars > TITLE_MIN_LEN && chars < TITLE_MAX_LEN {
                structure.title = Some(line.to_string());
            }
        }

        if looks_like_ingredient(line) {
            trace!(line = %line, "Classified as ingredient");
            structure.ingredients.push(line.to_string());
        } else if looks_like_instruction(line) {
            trace!(line = %line, "Classified as instruction");
            structure.instructions.push(line.to_string());
        }
    }

    debug!(
        ingredients = structure.ingredients.len(),
        instructions = structure.instructions.len(),
        servings = ?structure.servings,
        cook_time = ?structure.cook_time,
        final_section = ?current_section,
        "Recipe text segmented"
    );
    structure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_structure() {
        let structure = segment("");
        assert_eq!(structure, RecipeStructure::default());

        let blank = segment("   \n\n  ");
        assert_eq!(blank, RecipeStructure::default());
    }

    #[test]
    fn test_section_headers_are_skipped_as_content() {
        let structure = segment("Ingredients:\nInstructions:");
        assert!(structure.ingredients.is_empty());
        assert!(structure.instructions.is_empty());
        assert!(structure.title.is_none());
    }

    #[test]
    fn test_servings_extraction() {
        assert_eq!(segment("Serves 4").servings, Some(4));
        assert_eq!(segment("servings: 12").servings, Some(12));
        assert_eq!(segment("Makes 24 cookies for the crowd").servings, Some(24));
        assert_eq!(segment("A plain line").servings, None);
    }

    #[test]
    fn test_servings_last_sighting_wins() {
        let structure = segment("Serves 4\nActually serves 6");
        assert_eq!(structure.servings, Some(6));
    }

    #[test]
    fn test_cook_time_extraction() {
        assert_eq!(segment("Bake for 30 min").cook_time, Some("30 min".to_string()));
        assert_eq!(segment("about 2 hours total").cook_time, Some("2 hour".to_string()));
        assert_eq!(
            segment("ready in 45 minutes").cook_time,
            Some("45 min".to_string())
        );
    }

    #[test]
    fn test_title_is_first_qualifying_line() {
        let structure = segment("Pancakes\nGrandma's Apple Pie Recipe\nanother long line here");
        // "Pancakes" is below the 10-char floor, so the next line qualifies
        assert_eq!(structure.title, Some("Grandma's Apple Pie Recipe".to_string()));
    }

    #[test]
    fn test_title_bounds_count_characters_not_bytes() {
        // 12 characters but 15 bytes; qualifies on the character count
        assert_eq!(
            segment("Crème brûlée").title,
            Some("Crème brûlée".to_string())
        );
        // 10 characters (20 bytes) stays below the floor
        let ten_chars = "あ".repeat(10);
        assert_eq!(segment(&ten_chars).title, None);
    }

    #[test]
    fn test_title_rejects_over_long_lines() {
        let long_line = "x".repeat(150);
        let text = format!("{}\nShort Title Line", long_line);
        assert_eq!(segment(&text).title, Some("Short Title Line".to_string()));
    }

    #[test]
    fn test_ingredient_rules() {
        assert!(looks_like_ingredient("2 cup flour"));
        assert!(looks_like_ingredient("1/2 cup sugar"));
        assert!(looks_like_ingredient("500 g butter"));
        assert!(looks_like_ingredient("cup of chopped onions"));
        assert!(looks_like_ingredient("3 clove garlic"));
        assert!(!looks_like_ingredient("Preheat the oven."));
        assert!(!looks_like_ingredient("Serves 4"));
        // A word-final g or l must not read as a unit
        assert!(!looks_like_ingredient("Then simmer everything for a while"));
        assert!(!looks_like_ingredient("Season the oil for flavor"));
    }

    #[test]
    fn test_instruction_rules() {
        // Numbered markers qualify at any length
        assert!(looks_like_instruction("1. Mix ingredients."));
        assert!(looks_like_instruction("2) Whisk."));
        // Prose rules need the length floor
        assert!(looks_like_instruction("First, whisk the eggs until foamy"));
        assert!(looks_like_instruction("Heat the oil in a heavy skillet"));
        assert!(!looks_like_instruction("Stir well"));
        assert!(!looks_like_instruction("A note about storage jars"));
    }

    #[test]
    fn test_ingredient_wins_over_instruction() {
        // Matches both a quantity-unit rule and a cooking verb ("add")
        let line = "2 cup flour to add to the wet mixture";
        assert!(looks_like_ingredient(line));
        let structure = segment(line);
        assert_eq!(structure.ingredients, vec![line.to_string()]);
        assert!(structure.instructions.is_empty());
    }

    #[test]
    fn test_metadata_and_content_are_independent() {
        // One line can contribute servings metadata and still be classified
        let structure = segment("Makes 12 muffins and place them on a wire rack");
        assert_eq!(structure.servings, Some(12));
        assert_eq!(structure.instructions.len(), 1);
    }

    #[test]
    fn test_clean_recipe_scenario() {
        let text = "Pancakes\nServes 4\nIngredients:\n2 cups flour\n1 tsp salt\nInstructions:\n1. Mix ingredients.\n2. Heat pan and cook.";
        let structure = segment(text);

        // "Pancakes" and "Serves 4" are below the title floor; the first
        // qualifying line is the first ingredient line
        assert_eq!(structure.title, Some("2 cups flour".to_string()));
        assert_eq!(structure.servings, Some(4));
        assert_eq!(
            structure.ingredients,
            vec!["2 cups flour".to_string(), "1 tsp salt".to_string()]
        );
        assert_eq!(
            structure.instructions,
            vec![
                "1. Mix ingredients.".to_string(),
                "2. Heat pan and cook.".to_string()
            ]
        );
    }

    #[test]
    fn test_determinism() {
        let text = "Classic French Toast\nServes 2\nIngredients\n2 cups milk\n4 eggs with 1 tsp cinnamon\nDirections\n1. Whisk everything.\nThen soak the bread slices well";
        let first = segment(text);
        for _ in 0..5 {
            assert_eq!(segment(text), first);
        }
    }
}
