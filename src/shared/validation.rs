use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for slug fields (topic slugs, metadata keys)
    /// Must be lowercase alphanumeric with single hyphens
    /// - Valid: "organic-chemistry", "calc2", "world-history"
    /// - Invalid: "-math", "math-", "math--101", "Math", "math_101"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Regex for metadata keys: lowercase words joined by underscores or dots
    /// - Valid: "quizzes_generated", "landing.hero_title"
    /// - Invalid: "Quizzes", "_key", "key.", "key with space"
    pub static ref METADATA_KEY_REGEX: Regex =
        Regex::new(r"^[a-z0-9]+(?:[._][a-z0-9]+)*$").unwrap();
}
