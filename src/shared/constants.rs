/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// QUIZ CONSTANTS
// =============================================================================

/// Questions per quiz when the request does not say
pub const DEFAULT_QUESTION_COUNT: i32 = 10;

/// Upper bound on questions per quiz
pub const MAX_QUESTION_COUNT: i32 = 20;

/// Credits spent per generated quiz (admins are exempt)
pub const QUIZ_GENERATION_COST: i32 = 1;

/// Ranked document chunks included in the generation prompt
pub const MAX_CONTEXT_CHUNKS: i64 = 6;

// =============================================================================
// METADATA KEYS
// =============================================================================

/// Public counter bumped on every generated quiz
pub const METADATA_QUIZZES_GENERATED: &str = "quizzes_generated";

/// Keys whose value must stay a non-negative integer
pub const METADATA_COUNTER_KEYS: &[&str] = &[METADATA_QUIZZES_GENERATED];
