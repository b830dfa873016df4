use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        ContentUnit, EvidenceRecord, GradingRecord, QuizItem, SummaryNote, WrongAnswerRecord,
    },
    repositories::{ContentUnitRepository, PersistenceGateway},
};

/// Process-local storage for `STORAGE_BACKEND=memory` and for tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    units: Arc<RwLock<HashMap<String, Vec<ContentUnit>>>>,
    summaries: Arc<RwLock<HashMap<String, Vec<SummaryNote>>>>,
    quiz_items: Arc<RwLock<HashMap<String, Vec<QuizItem>>>>,
    gradings: Arc<RwLock<HashMap<String, GradingRecord>>>,
    wrong_answers: Arc<RwLock<HashMap<(String, String), WrongAnswerRecord>>>,
    evidence: Arc<RwLock<HashMap<String, EvidenceRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_units(&self, units: Vec<ContentUnit>) {
        let mut stored = self.units.write().await;
        for unit in units {
            stored.entry(unit.document_id.clone()).or_default().push(unit);
        }
    }

    /// Makes every subsequent write fail with `PersistenceFailure`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn summaries(&self, document_id: &str) -> Vec<SummaryNote> {
        self.summaries
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn quiz_items(&self, document_id: &str) -> Vec<QuizItem> {
        self.quiz_items
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn grading(&self, attempt_item_id: &str) -> Option<GradingRecord> {
        self.gradings.read().await.get(attempt_item_id).cloned()
    }

    pub async fn wrong_answer(
        &self,
        user_id: &str,
        attempt_item_id: &str,
    ) -> Option<WrongAnswerRecord> {
        self.wrong_answers
            .read()
            .await
            .get(&(user_id.to_string(), attempt_item_id.to_string()))
            .cloned()
    }

    pub async fn evidence(&self, attempt_item_id: &str) -> Option<EvidenceRecord> {
        self.evidence.read().await.get(attempt_item_id).cloned()
    }

    pub async fn unit(&self, content_id: &str) -> Option<ContentUnit> {
        self.units
            .read()
            .await
            .values()
            .flatten()
            .find(|u| u.id == content_id)
            .cloned()
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailure(
                "in-memory store is rejecting writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentUnitRepository for InMemoryStore {
    async fn find_by_document(&self, document_id: &str) -> AppResult<Vec<ContentUnit>> {
        let mut units = self
            .units
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default();
        units.sort_by_key(|u| u.order_index);
        Ok(units)
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryStore {
    async fn save_summaries(&self, document_id: &str, notes: Vec<SummaryNote>) -> AppResult<()> {
        self.check_writable()?;
        self.summaries
            .write()
            .await
            .insert(document_id.to_string(), notes);
        Ok(())
    }

    async fn save_quiz_items(&self, document_id: &str, items: Vec<QuizItem>) -> AppResult<()> {
        self.check_writable()?;
        self.quiz_items
            .write()
            .await
            .entry(document_id.to_string())
            .or_default()
            .extend(items);
        Ok(())
    }

    async fn save_grading(&self, record: GradingRecord) -> AppResult<()> {
        self.check_writable()?;
        let mut gradings = self.gradings.write().await;
        if gradings.contains_key(&record.attempt_item_id) {
            return Err(AppError::AlreadyExists(format!(
                "Attempt item '{}' is already graded",
                record.attempt_item_id
            )));
        }
        gradings.insert(record.attempt_item_id.clone(), record);
        Ok(())
    }

    async fn upsert_wrong_answer(
        &self,
        user_id: &str,
        attempt_item_id: &str,
    ) -> AppResult<WrongAnswerRecord> {
        self.check_writable()?;
        let mut wrong_answers = self.wrong_answers.write().await;
        let record = wrong_answers
            .entry((user_id.to_string(), attempt_item_id.to_string()))
            .and_modify(WrongAnswerRecord::record_repeat)
            .or_insert_with(|| WrongAnswerRecord::first_mistake(user_id, attempt_item_id));
        Ok(record.clone())
    }

    async fn save_evidence(&self, record: EvidenceRecord) -> AppResult<()> {
        self.check_writable()?;
        self.evidence
            .write()
            .await
            .insert(record.attempt_item_id.clone(), record);
        Ok(())
    }

    async fn save_translation(
        &self,
        content_id: &str,
        translated_text: &str,
        fallback: bool,
    ) -> AppResult<()> {
        self.check_writable()?;
        let mut units = self.units.write().await;
        let unit = units
            .values_mut()
            .flatten()
            .find(|u| u.id == content_id)
            .ok_or_else(|| AppError::NotFound(format!("Content unit '{}' not found", content_id)))?;
        unit.translated_text = Some(translated_text.to_string());
        unit.translation_fallback = fallback;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{
            grading::{GradedBy, GradingResult},
            OrderRange,
        },
        test_utils::fixtures,
    };
    use chrono::Utc;

    fn grading_record(attempt_item_id: &str) -> GradingRecord {
        GradingRecord {
            attempt_item_id: attempt_item_id.to_string(),
            user_id: "user-1".to_string(),
            result: GradingResult {
                is_correct: true,
                score: 100,
                feedback: "ok".to_string(),
                explanation: "ok".to_string(),
            },
            graded_by: GradedBy::ExactMatch,
            graded_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn find_by_document_returns_units_in_order() {
        let store = InMemoryStore::new();
        let mut units = fixtures::content_units("doc-1", 3);
        units.reverse();
        store.seed_units(units).await;

        let found = store.find_by_document("doc-1").await.expect("find should succeed");
        let order: Vec<i64> = found.iter().map(|u| u.order_index).collect();

        assert_eq!(order, vec![0, 1, 2]);
        assert!(store.find_by_document("missing").await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn save_summaries_replaces_previous_set() {
        let store = InMemoryStore::new();
        let note = |text: &str| {
            SummaryNote::new_summary_note("doc-1", "u-0", OrderRange { first: 0, last: 9 }, text)
        };

        store
            .save_summaries("doc-1", vec![note("old a"), note("old b")])
            .await
            .unwrap();
        store.save_summaries("doc-1", vec![note("new")]).await.unwrap();

        let stored = store.summaries("doc-1").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "new");
    }

    #[actix_web::test]
    async fn save_grading_rejects_second_grade_for_item() {
        let store = InMemoryStore::new();

        store.save_grading(grading_record("item-1")).await.unwrap();
        let second = store.save_grading(grading_record("item-1")).await;

        assert!(matches!(second, Err(AppError::AlreadyExists(_))));
    }

    #[actix_web::test]
    async fn upsert_wrong_answer_counts_mistakes() {
        let store = InMemoryStore::new();

        let first = store.upsert_wrong_answer("user-1", "item-1").await.unwrap();
        let second = store.upsert_wrong_answer("user-1", "item-1").await.unwrap();
        let other_user = store.upsert_wrong_answer("user-2", "item-1").await.unwrap();

        assert_eq!(first.mistake_count, 1);
        assert_eq!(second.mistake_count, 2);
        assert_eq!(other_user.mistake_count, 1);
    }

    #[actix_web::test]
    async fn save_translation_updates_unit_or_reports_missing() {
        let store = InMemoryStore::new();
        let units = fixtures::content_units("doc-1", 1);
        let id = units[0].id.clone();
        store.seed_units(units).await;

        store.save_translation(&id, "번역", false).await.unwrap();
        let missing = store.save_translation("nope", "x", false).await;

        assert_eq!(
            store.unit(&id).await.and_then(|u| u.translated_text).as_deref(),
            Some("번역")
        );
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn failing_writes_surface_persistence_failure() {
        let store = InMemoryStore::new();
        store.set_fail_writes(true);

        let result = store.save_quiz_items("doc-1", vec![]).await;
        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
    }
}
