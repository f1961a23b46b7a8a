//! Deterministic answer checking and score arithmetic.

use rust_decimal::Decimal;

use crate::features::quizzes::models::QuestionKind;

/// Lowercase, collapse inner whitespace and drop trailing sentence punctuation
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_lowercase()
}

/// Accepts `true/false/t/f/yes/no` in any case
pub fn parse_bool_answer(answer: &str) -> Option<bool> {
    match normalize_answer(answer).as_str() {
        "true" | "t" | "yes" => Some(true),
        "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

/// Option text, or its letter (`a`, `B`, ...) by position
fn grade_multiple_choice(options: &[String], correct: &str, answer: &str) -> bool {
    let correct = normalize_answer(correct);
    let answer = normalize_answer(answer);

    if answer == correct {
        return true;
    }

    let mut chars = answer.chars();
    match (chars.next(), chars.next()) {
        (Some(letter @ 'a'..='z'), None) => {
            let index = (letter as u8 - b'a') as usize;
            options
                .get(index)
                .is_some_and(|option| normalize_answer(option) == correct)
        }
        _ => false,
    }
}

fn grade_true_false(correct: &str, answer: &str) -> bool {
    match (parse_bool_answer(correct), parse_bool_answer(answer)) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    }
}

/// Grade one answer without the model.
///
/// Returns `None` only for a short answer that is not an exact normalized
/// match; those go to AI grading. Missing or blank answers are wrong.
pub fn grade_locally(
    kind: QuestionKind,
    options: &[String],
    correct: &str,
    answer: Option<&str>,
) -> Option<bool> {
    let answer = match answer {
        Some(a) if !a.trim().is_empty() => a,
        _ => return Some(false),
    };

    match kind {
        QuestionKind::MultipleChoice => Some(grade_multiple_choice(options, correct, answer)),
        QuestionKind::TrueFalse => Some(grade_true_false(correct, answer)),
        QuestionKind::ShortAnswer => {
            if normalize_answer(answer) == normalize_answer(correct) {
                Some(true)
            } else {
                None
            }
        }
    }
}

/// `correct / total × 100`, rounded to 2 decimal places
pub fn compute_score(correct: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(correct as u64) * Decimal::ONE_HUNDRED / Decimal::from(total as u64)).round_dp(2)
}
