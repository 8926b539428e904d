//! SemUN graph database access

pub mod neo4j;
pub mod service;

use crate::domain::{QueryResult, Statement};
use crate::error::Result;
use async_trait::async_trait;

pub use neo4j::Neo4jHttpStore;
pub use service::GraphDb;

/// Backend able to run Cypher statements
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;

    /// Fails with `ApiError::GraphUnavailable` when the database cannot be reached
    async fn verify_connectivity(&self) -> Result<()>;
}
