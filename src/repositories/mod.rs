// Persistence layer, one module per aggregate. Functions take a
// `&mut SqliteConnection` so callers can compose them inside a single
// transaction.

pub mod collaborator_repository;
pub mod connection_repository;
pub mod mindmap_repository;
pub mod node_repository;
pub mod tag_repository;
pub mod user_repository;
