pub mod content_unit_repository;
pub mod in_memory;
pub mod persistence_gateway;

pub use content_unit_repository::{ContentUnitRepository, MongoContentUnitRepository};
pub use in_memory::InMemoryStore;
pub use persistence_gateway::{MongoPersistenceGateway, PersistenceGateway};
