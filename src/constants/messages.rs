// User-facing strings produced by the validator and fallbacks.

pub const DEFAULT_GRADING_FEEDBACK: &str = "Grading complete";
pub const DEFAULT_GRADING_EXPLANATION: &str =
    "The answer was compared against the reference answer.";

pub const FALLBACK_GRADING_FEEDBACK: &str =
    "Automatic grading was unavailable, so a keyword-based estimate was used.";
pub const EXACT_MATCH_CORRECT_FEEDBACK: &str = "Correct!";
pub const EXACT_MATCH_WRONG_FEEDBACK: &str = "Incorrect.";

pub const EVIDENCE_TOO_SHORT: &str = "Evidence is too short";
pub const EVIDENCE_TOO_GENERIC: &str = "Evidence is too generic";
pub const EVIDENCE_NOT_FOUND: &str = "No supporting evidence was found in the source";
pub const EVIDENCE_UNAVAILABLE: &str = "Evidence could not be generated";
pub const CONTENT_UNIT_MISSING: &str = "The referenced content unit does not exist";

pub const DEFAULT_QUIZ_EXPLANATION: &str = "Refer to the source paragraph for details.";
