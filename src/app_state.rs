use std::sync::Arc;

use crate::{
    config::{Config, StorageBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        ContentUnitRepository, InMemoryStore, MongoContentUnitRepository, MongoPersistenceGateway,
        PersistenceGateway,
    },
    services::{
        generation_client::{GenerationClient, OpenAiGenerationClient},
        pipeline_orchestrator::PipelineOrchestrator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// `None` when running on the in-memory backend.
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let client: Arc<dyn GenerationClient> = Arc::new(OpenAiGenerationClient::new(&config)?);

        let (db, gateway, content_units): (
            Option<Database>,
            Arc<dyn PersistenceGateway>,
            Arc<dyn ContentUnitRepository>,
        ) = match config.storage_backend {
            StorageBackend::Mongo => {
                let db = Database::connect(&config).await?;

                let content_units = Arc::new(MongoContentUnitRepository::new(&db));
                content_units.ensure_indexes().await?;

                let gateway = Arc::new(MongoPersistenceGateway::new(&db));
                gateway.ensure_indexes().await?;

                (Some(db), gateway, content_units)
            }
            StorageBackend::Memory => {
                log::info!("Using in-memory storage backend");
                let store = InMemoryStore::new();
                (None, Arc::new(store.clone()), Arc::new(store))
            }
        };

        let config = Arc::new(config);
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            client,
            gateway,
            content_units,
            Arc::clone(&config),
        ));

        Ok(Self {
            orchestrator,
            db,
            config,
        })
    }

    /// Assembles state around an existing orchestrator, without a database.
    pub fn from_orchestrator(orchestrator: PipelineOrchestrator, config: Config) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            db: None,
            config: Arc::new(config),
        }
    }
}
