use crate::config::Config;
use crate::error::Result;
use crate::graphdb::{GraphDb, Neo4jHttpStore};
use crate::undl::UndlClient;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub undl: Arc<UndlClient>,
    pub graph: GraphDb,
}

impl AppState {
    pub fn new(undl: UndlClient, graph: GraphDb) -> Self {
        Self {
            undl: Arc::new(undl),
            graph,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let undl = UndlClient::new(&config.undl)?;
        let store = Neo4jHttpStore::new(&config.graph)?;
        Ok(Self::new(undl, GraphDb::new(Arc::new(store))))
    }
}
