pub mod content_unit;
pub mod evidence;
pub mod generation;
pub mod grading;
pub mod quiz_item;
pub mod summary_note;
pub mod wrong_answer;
pub use content_unit::{ContentUnit, OrderRange};
pub use evidence::{EvidenceRecord, EvidenceSpan};
pub use generation::{GenerationOutcome, TaskKind};
pub use grading::{GradingRecord, GradingResult};
pub use quiz_item::{QuizItem, QuizType};
pub use summary_note::SummaryNote;
pub use wrong_answer::WrongAnswerRecord;
