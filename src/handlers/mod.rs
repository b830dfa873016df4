pub mod health_handler;
pub mod pipeline_handler;

pub use health_handler::{health_check, health_check_ready};
pub use pipeline_handler::{
    extract_evidence, generate_quiz, grade_answer, summarize_document, translate_document,
};
