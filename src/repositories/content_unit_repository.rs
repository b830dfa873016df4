use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::ContentUnit};

/// Read access to the segmented source documents.
#[async_trait]
pub trait ContentUnitRepository: Send + Sync {
    /// All units of a document in ascending `order_index`.
    async fn find_by_document(&self, document_id: &str) -> AppResult<Vec<ContentUnit>>;
}

pub struct MongoContentUnitRepository {
    collection: Collection<ContentUnit>,
}

impl MongoContentUnitRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("content_units");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for content_units collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let document_order_index = IndexModel::builder()
            .keys(doc! { "document_id": 1, "order_index": 1 })
            .options(
                IndexOptions::builder()
                    .name("document_order".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(document_order_index).await?;

        log::info!("Successfully created indexes for content_units collection");
        Ok(())
    }
}

#[async_trait]
impl ContentUnitRepository for MongoContentUnitRepository {
    async fn find_by_document(&self, document_id: &str) -> AppResult<Vec<ContentUnit>> {
        let cursor = self
            .collection
            .find(doc! { "document_id": document_id })
            .sort(doc! { "order_index": 1 })
            .await?;
        let units: Vec<ContentUnit> = cursor.try_collect().await?;
        Ok(units)
    }
}
