//! Renders the fixed system instruction plus the request's variable data for
//! each task. Rendering is a pure function of its inputs.

use sha2::{Digest, Sha256};

use crate::{
    constants::{categories, prompts},
    models::domain::{generation::LearningPurpose, ContentUnit, QuizType},
    services::{chunker::Chunk, generation_client::ChatMessage},
};

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn summarize(chunk: &Chunk) -> Vec<ChatMessage> {
        let mut user = format!(
            "Summarize the following paragraphs (range {}).\n\n",
            chunk.range.label()
        );
        for unit in &chunk.units {
            user.push_str(&format!("[{}] {}\n\n", unit.order_index, unit.text.trim()));
        }

        vec![
            ChatMessage::system(prompts::SUMMARIZE_SYSTEM_PROMPT),
            ChatMessage::user(user.trim_end()),
        ]
    }

    /// Paragraphs are numbered by their position in `units`; that position is
    /// what the model returns as `content_index`.
    pub fn generate_quiz(
        units: &[ContentUnit],
        question_count: usize,
        question_types: &[QuizType],
        purpose: LearningPurpose,
    ) -> Vec<ChatMessage> {
        let types = question_types
            .iter()
            .map(QuizType::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        let taxonomy = categories::taxonomy(purpose)
            .iter()
            .map(|c| format!("- {}: {}", c.id, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        let purpose_line = match purpose {
            LearningPurpose::General => "general study of the material",
            LearningPurpose::Research => "critical reading of a research paper",
        };

        let mut user = format!(
            "Learning purpose: {}\nNumber of questions: {}\nQuestion types: {}\n\nCategory taxonomy (tag every question with one id):\n{}\n\nParagraphs:\n",
            purpose_line, question_count, types, taxonomy
        );
        for (position, unit) in units.iter().enumerate() {
            user.push_str(&format!("[{}] {}\n\n", position, unit.text.trim()));
        }

        vec![
            ChatMessage::system(prompts::QUIZ_SYSTEM_PROMPT),
            ChatMessage::user(user.trim_end()),
        ]
    }

    pub fn grade_answer(
        quiz_type: QuizType,
        question: &str,
        reference_answer: &str,
        candidate_answer: &str,
        explanation: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut user = format!(
            "Question type: {}\nQuestion: {}\nReference answer: {}\n",
            quiz_type,
            question.trim(),
            reference_answer.trim()
        );
        if let Some(explanation) = explanation.filter(|e| !e.trim().is_empty()) {
            user.push_str(&format!("Reference explanation: {}\n", explanation.trim()));
        }
        user.push_str(&format!("Student answer: {}", candidate_answer.trim()));

        vec![
            ChatMessage::system(prompts::GRADE_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ]
    }

    pub fn find_evidence(
        paragraph: &str,
        question: &str,
        correct_answer: &str,
        user_answer: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut user = format!(
            "Question: {}\nCorrect answer: {}\n",
            question.trim(),
            correct_answer.trim()
        );
        if let Some(answer) = user_answer.filter(|a| !a.trim().is_empty()) {
            user.push_str(&format!("Student's wrong answer: {}\n", answer.trim()));
        }
        user.push_str(&format!("\nParagraph:\n{}", paragraph));

        vec![
            ChatMessage::system(prompts::EVIDENCE_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ]
    }

    pub fn translate(paragraph: &str, target_language: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(prompts::TRANSLATE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Target language: {}\n\nParagraph:\n{}",
                target_language.trim(),
                paragraph.trim()
            )),
        ]
    }

    /// SHA-256 over roles and contents, used to correlate runs in logs.
    pub fn fingerprint(messages: &[ChatMessage]) -> String {
        let mut hasher = Sha256::new();
        for message in messages {
            hasher.update(message.role.as_bytes());
            hasher.update([0u8]);
            hasher.update(message.content.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}
