use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{
        ContentUnit, EvidenceRecord, GradingRecord, QuizItem, SummaryNote, WrongAnswerRecord,
    },
};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Every write the pipelines make. Each call persists complete records only.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Replaces the document's live summary set with `notes`.
    async fn save_summaries(&self, document_id: &str, notes: Vec<SummaryNote>) -> AppResult<()>;

    /// Appends quiz items; earlier sets for the document are kept.
    async fn save_quiz_items(&self, document_id: &str, items: Vec<QuizItem>) -> AppResult<()>;

    /// Stores the single grading result of an attempt item.
    async fn save_grading(&self, record: GradingRecord) -> AppResult<()>;

    /// Creates the record with `mistake_count = 1` or increments an existing one.
    async fn upsert_wrong_answer(
        &self,
        user_id: &str,
        attempt_item_id: &str,
    ) -> AppResult<WrongAnswerRecord>;

    async fn save_evidence(&self, record: EvidenceRecord) -> AppResult<()>;

    /// `fallback` marks text that is the untranslated original, to be retried.
    async fn save_translation(
        &self,
        content_id: &str,
        translated_text: &str,
        fallback: bool,
    ) -> AppResult<()>;
}

/// The writes a summary-set replacement is made of.
#[async_trait]
pub(crate) trait SummaryNoteStore: Send + Sync {
    async fn insert_notes(&self, notes: &[SummaryNote]) -> AppResult<()>;

    /// Deletes the document's notes whose id is in `ids`.
    async fn delete_notes(&self, document_id: &str, ids: &[String]) -> AppResult<u64>;

    /// Deletes the document's notes whose id is not in `ids`.
    async fn delete_notes_except(&self, document_id: &str, ids: &[String]) -> AppResult<u64>;
}

/// Swaps the document's summary set for `notes`.
///
/// The new set is written first and the old one removed after it. If either
/// step fails, every note of the new set is deleted again so the document
/// keeps its previous set and no partial one. Returns the superseded count.
pub(crate) async fn replace_summary_set<S>(
    store: &S,
    document_id: &str,
    notes: &[SummaryNote],
) -> AppResult<u64>
where
    S: SummaryNoteStore + ?Sized,
{
    let ids: Vec<String> = notes.iter().map(|n| n.id.clone()).collect();

    let committed = match store.insert_notes(notes).await {
        Ok(()) => store.delete_notes_except(document_id, &ids).await,
        Err(e) => Err(e),
    };

    match committed {
        Ok(removed) => Ok(removed),
        Err(e) => {
            match store.delete_notes(document_id, &ids).await {
                Ok(rolled_back) => log::warn!(
                    "Summary replacement for document {} failed, rolled back {} new notes: {}",
                    document_id,
                    rolled_back,
                    e
                ),
                Err(cleanup) => log::error!(
                    "Summary replacement for document {} failed and rollback failed: {} / {}",
                    document_id,
                    e,
                    cleanup
                ),
            }
            Err(e)
        }
    }
}

#[async_trait]
impl SummaryNoteStore for Collection<SummaryNote> {
    async fn insert_notes(&self, notes: &[SummaryNote]) -> AppResult<()> {
        if notes.is_empty() {
            return Ok(());
        }
        self.insert_many(notes).await?;
        Ok(())
    }

    async fn delete_notes(&self, document_id: &str, ids: &[String]) -> AppResult<u64> {
        let result = self
            .delete_many(doc! { "document_id": document_id, "id": { "$in": ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_notes_except(&self, document_id: &str, ids: &[String]) -> AppResult<u64> {
        let result = self
            .delete_many(doc! { "document_id": document_id, "id": { "$nin": ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

pub struct MongoPersistenceGateway {
    summaries: Collection<SummaryNote>,
    quiz_items: Collection<QuizItem>,
    gradings: Collection<GradingRecord>,
    wrong_answers: Collection<WrongAnswerRecord>,
    evidence: Collection<EvidenceRecord>,
    content_units: Collection<ContentUnit>,
}

impl MongoPersistenceGateway {
    pub fn new(db: &Database) -> Self {
        Self {
            summaries: db.get_collection("summary_notes"),
            quiz_items: db.get_collection("quiz_items"),
            gradings: db.get_collection("grading_records"),
            wrong_answers: db.get_collection("wrong_answers"),
            evidence: db.get_collection("evidence_records"),
            content_units: db.get_collection("content_units"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for pipeline output collections");

        let by_document = |name: &str| {
            IndexModel::builder()
                .keys(doc! { "document_id": 1 })
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };
        let unique = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(name.to_string())
                        .build(),
                )
                .build()
        };

        self.summaries
            .create_index(by_document("summary_document"))
            .await?;
        self.quiz_items
            .create_index(by_document("quiz_item_document"))
            .await?;
        self.gradings
            .create_index(unique(doc! { "attempt_item_id": 1 }, "attempt_item_unique"))
            .await?;
        self.wrong_answers
            .create_index(unique(
                doc! { "user_id": 1, "attempt_item_id": 1 },
                "user_attempt_item_unique",
            ))
            .await?;
        self.evidence
            .create_index(unique(doc! { "attempt_item_id": 1 }, "attempt_item_unique"))
            .await?;

        log::info!("Successfully created indexes for pipeline output collections");
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for MongoPersistenceGateway {
    async fn save_summaries(&self, document_id: &str, notes: Vec<SummaryNote>) -> AppResult<()> {
        let removed = replace_summary_set(&self.summaries, document_id, &notes).await?;
        log::debug!(
            "Replaced summaries for document {}: {} new, {} superseded",
            document_id,
            notes.len(),
            removed
        );
        Ok(())
    }

    async fn save_quiz_items(&self, document_id: &str, items: Vec<QuizItem>) -> AppResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.quiz_items.insert_many(&items).await?;
        log::debug!("Saved {} quiz items for document {}", items.len(), document_id);
        Ok(())
    }

    async fn save_grading(&self, record: GradingRecord) -> AppResult<()> {
        match self.gradings.insert_one(&record).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Attempt item '{}' is already graded",
                record.attempt_item_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_wrong_answer(
        &self,
        user_id: &str,
        attempt_item_id: &str,
    ) -> AppResult<WrongAnswerRecord> {
        let record = self
            .wrong_answers
            .find_one_and_update(
                doc! { "user_id": user_id, "attempt_item_id": attempt_item_id },
                doc! {
                    "$inc": { "mistake_count": 1_i64 },
                    "$set": { "last_wrong_at": Utc::now().to_rfc3339() },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        record.ok_or_else(|| {
            AppError::PersistenceFailure(format!(
                "Wrong-answer upsert returned nothing for attempt item '{}'",
                attempt_item_id
            ))
        })
    }

    async fn save_evidence(&self, record: EvidenceRecord) -> AppResult<()> {
        self.evidence
            .replace_one(doc! { "attempt_item_id": &record.attempt_item_id }, &record)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn save_translation(
        &self,
        content_id: &str,
        translated_text: &str,
        fallback: bool,
    ) -> AppResult<()> {
        let result = self
            .content_units
            .update_one(
                doc! { "id": content_id },
                doc! { "$set": {
                    "translated_text": translated_text,
                    "translation_fallback": fallback,
                } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Content unit '{}' not found",
                content_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::OrderRange;
    use std::sync::Mutex;

    /// Summary storage that can fail after a number of inserted notes, or on
    /// the superseded-notes delete.
    #[derive(Default)]
    struct FlakyNoteStore {
        notes: Mutex<Vec<SummaryNote>>,
        fail_after_inserts: Option<usize>,
        fail_superseded_delete: bool,
    }

    impl FlakyNoteStore {
        fn holding(notes: Vec<SummaryNote>) -> Self {
            Self {
                notes: Mutex::new(notes),
                ..Self::default()
            }
        }

        fn texts(&self) -> Vec<String> {
            let mut texts: Vec<String> = self
                .notes
                .lock()
                .expect("lock")
                .iter()
                .map(|n| n.text.clone())
                .collect();
            texts.sort();
            texts
        }
    }

    #[async_trait]
    impl SummaryNoteStore for FlakyNoteStore {
        async fn insert_notes(&self, notes: &[SummaryNote]) -> AppResult<()> {
            let mut stored = self.notes.lock().expect("lock");
            for (i, note) in notes.iter().enumerate() {
                if self.fail_after_inserts == Some(i) {
                    return Err(AppError::PersistenceFailure("write error".to_string()));
                }
                stored.push(note.clone());
            }
            Ok(())
        }

        async fn delete_notes(&self, document_id: &str, ids: &[String]) -> AppResult<u64> {
            let mut stored = self.notes.lock().expect("lock");
            let before = stored.len();
            stored.retain(|n| n.document_id != document_id || !ids.contains(&n.id));
            Ok((before - stored.len()) as u64)
        }

        async fn delete_notes_except(&self, document_id: &str, ids: &[String]) -> AppResult<u64> {
            if self.fail_superseded_delete {
                return Err(AppError::PersistenceFailure("delete failed".to_string()));
            }
            let mut stored = self.notes.lock().expect("lock");
            let before = stored.len();
            stored.retain(|n| n.document_id != document_id || ids.contains(&n.id));
            Ok((before - stored.len()) as u64)
        }
    }

    fn note(document_id: &str, text: &str) -> SummaryNote {
        SummaryNote::new_summary_note(document_id, "u-0", OrderRange { first: 0, last: 9 }, text)
    }

    fn old_set() -> Vec<SummaryNote> {
        vec![note("doc-1", "old a"), note("doc-1", "old b"), note("doc-2", "other")]
    }

    fn new_set() -> Vec<SummaryNote> {
        vec![note("doc-1", "new a"), note("doc-1", "new b"), note("doc-1", "new c")]
    }

    #[actix_web::test]
    async fn replace_summary_set_swaps_only_the_document() {
        let store = FlakyNoteStore::holding(old_set());

        let removed = replace_summary_set(&store, "doc-1", &new_set())
            .await
            .expect("replace should succeed");

        assert_eq!(removed, 2);
        assert_eq!(store.texts(), vec!["new a", "new b", "new c", "other"]);
    }

    #[actix_web::test]
    async fn partial_insert_is_rolled_back() {
        let store = FlakyNoteStore {
            fail_after_inserts: Some(1),
            ..FlakyNoteStore::holding(old_set())
        };

        let result = replace_summary_set(&store, "doc-1", &new_set()).await;

        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
        assert_eq!(store.texts(), vec!["old a", "old b", "other"]);
    }

    #[actix_web::test]
    async fn failed_superseded_delete_keeps_previous_set() {
        let store = FlakyNoteStore {
            fail_superseded_delete: true,
            ..FlakyNoteStore::holding(old_set())
        };

        let result = replace_summary_set(&store, "doc-1", &new_set()).await;

        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
        assert_eq!(store.texts(), vec!["old a", "old b", "other"]);
    }

    #[test]
    fn gateway_trait_objects_are_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn PersistenceGateway>();
        assert_send_sync::<MongoPersistenceGateway>();
    }
}
