use super::GraphStore;
use crate::constants::DOCUMENT_LABEL;
use crate::domain::{DocumentGraph, QueryResult, QuerySummary, Row, Statement};
use crate::error::Result;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Documents matching `$ids` with their direct neighbours
const DOCUMENTS_BY_IDS: &str = "MATCH (d:Document)
WHERE d.id IN $ids
OPTIONAL MATCH (d)-[r]-(n)
RETURN d, r, n";

/// Graph database handle shared by every request
#[derive(Clone)]
pub struct GraphDb {
    store: Arc<dyn GraphStore>,
}

impl GraphDb {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Run `query` and return its rows keyed by column
    pub async fn query(
        &self,
        query: &str,
        params: Option<Map<String, Value>>,
        verbose: bool,
    ) -> Result<Vec<Row>> {
        let result = self.run(statement(query, params), verbose).await?;
        Ok(result.keyed_rows())
    }

    /// Run `query` and return only its summary
    pub async fn query_summary(
        &self,
        query: &str,
        params: Option<Map<String, Value>>,
        verbose: bool,
    ) -> Result<QuerySummary> {
        let result = self.run(statement(query, params), verbose).await?;
        Ok(result.summary)
    }

    /// Documents with the given Digital Library ids and their relations.
    ///
    /// Duplicate and blank ids are dropped; numeric ids are matched as integers.
    #[instrument(skip(self))]
    pub async fn documents_by_ids(&self, ids: &[String], verbose: bool) -> Result<DocumentGraph> {
        let requested = distinct_ids(ids);
        if requested.is_empty() {
            return Ok(DocumentGraph::default());
        }

        let params: Vec<Value> = requested.iter().map(|id| id_param(id)).collect();
        let statement = Statement::new(DOCUMENTS_BY_IDS).param("ids", params);
        let result = self.run(statement, verbose).await?;

        let found: HashSet<String> = result
            .nodes
            .iter()
            .filter(|node| node.has_label(DOCUMENT_LABEL))
            .filter_map(|node| node.properties.get("id").and_then(id_string))
            .collect();
        let missing: Vec<String> = requested
            .into_iter()
            .filter(|id| !found.contains(&canonical_id(id)))
            .collect();

        if verbose {
            info!(
                "Retrieved {} document(s) and {} related node(s); {} id(s) not found",
                found.len(),
                result.nodes.len().saturating_sub(found.len()),
                missing.len()
            );
        }

        Ok(DocumentGraph {
            nodes: result.nodes,
            relationships: result.relationships,
            missing,
        })
    }

    pub async fn check_connection(&self) -> Result<()> {
        self.store.verify_connectivity().await
    }

    async fn run(&self, statement: Statement, verbose: bool) -> Result<QueryResult> {
        let result = self.store.execute(&statement).await?;
        if verbose {
            debug!(
                "The query `{}` returned {} records in {} ms.",
                result.summary.query,
                result.summary.records_count,
                result.summary.result_available_after_ms
            );
        }
        Ok(result)
    }
}

fn statement(query: &str, params: Option<Map<String, Value>>) -> Statement {
    Statement {
        query: query.to_string(),
        params: params.unwrap_or_default(),
    }
}

/// First spelling of each id, compared on its canonical form
fn distinct_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(canonical_id(id)))
        .map(str::to_string)
        .collect()
}

/// The id as the store will report it back, e.g. "04013073" -> "4013073"
fn canonical_id(id: &str) -> String {
    id_string(&id_param(id)).unwrap_or_else(|| id.to_string())
}

fn id_param(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(id),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GraphNode, GraphRelationship};
    use crate::error::ApiError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned result and remembers every statement
    struct RecordingStore {
        result: QueryResult,
        statements: Mutex<Vec<Statement>>,
    }

    impl RecordingStore {
        fn new(result: QueryResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                statements: Mutex::new(Vec::new()),
            })
        }

        fn statements(&self) -> Vec<Statement> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
            self.statements.lock().unwrap().push(statement.clone());
            Ok(self.result.clone())
        }

        async fn verify_connectivity(&self) -> Result<()> {
            Err(ApiError::GraphUnavailable {
                uri: "bolt://test:7687".to_string(),
                user: "anonymous".to_string(),
                message: "down".to_string(),
            })
        }
    }

    fn node(id: &str, label: &str, properties: Value) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            labels: vec![label.to_string()],
            properties: properties.as_object().cloned().unwrap_or_default(),
        }
    }

    fn document_result() -> QueryResult {
        QueryResult {
            columns: vec!["d".to_string(), "r".to_string(), "n".to_string()],
            rows: vec![vec![json!({"id": 4013073}), json!({}), json!({"name": "CLIMATE CHANGE"})]],
            nodes: vec![
                node("1", "Document", json!({"id": 4013073})),
                node("2", "Subject", json!({"name": "CLIMATE CHANGE"})),
            ],
            relationships: vec![GraphRelationship {
                id: "10".to_string(),
                kind: "HAS_SUBJECT".to_string(),
                start: "1".to_string(),
                end: "2".to_string(),
                properties: Map::new(),
            }],
            summary: QuerySummary {
                query: DOCUMENTS_BY_IDS.to_string(),
                records_count: 1,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_documents_by_ids_builds_parameterised_statement() {
        let store = RecordingStore::new(document_result());
        let graph = GraphDb::new(store.clone());

        let ids = vec![
            "4013073".to_string(),
            " 4013073 ".to_string(),
            "".to_string(),
            "A/RES/1".to_string(),
        ];
        let result = graph.documents_by_ids(&ids, true).await.unwrap();

        let statements = store.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].query.contains("WHERE d.id IN $ids"));
        assert_eq!(statements[0].params["ids"], json!([4013073, "A/RES/1"]));

        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.missing, vec!["A/RES/1"]);
    }

    #[tokio::test]
    async fn test_documents_by_ids_matches_non_canonical_numeric_ids() {
        let store = RecordingStore::new(document_result());
        let graph = GraphDb::new(store.clone());

        let ids = vec!["04013073".to_string(), "4013073".to_string()];
        let result = graph.documents_by_ids(&ids, false).await.unwrap();

        assert_eq!(store.statements()[0].params["ids"], json!([4013073]));
        assert!(result.missing.is_empty());
    }

    #[tokio::test]
    async fn test_verbose_does_not_change_result() {
        let ids = vec!["4013073".to_string(), "A/RES/1".to_string()];
        let quiet = GraphDb::new(RecordingStore::new(document_result()))
            .documents_by_ids(&ids, false)
            .await
            .unwrap();
        let verbose = GraphDb::new(RecordingStore::new(document_result()))
            .documents_by_ids(&ids, true)
            .await
            .unwrap();
        assert_eq!(quiet, verbose);
    }

    #[test]
    fn test_canonical_id() {
        assert_eq!(canonical_id("04013073"), "4013073");
        assert_eq!(canonical_id("A/RES/1"), "A/RES/1");
    }

    #[tokio::test]
    async fn test_documents_by_ids_skips_store_for_empty_input() {
        let store = RecordingStore::new(document_result());
        let graph = GraphDb::new(store.clone());

        let result = graph.documents_by_ids(&[" ".to_string()], false).await.unwrap();

        assert!(store.statements().is_empty());
        assert_eq!(result, DocumentGraph::default());
    }

    #[tokio::test]
    async fn test_query_returns_keyed_rows() {
        let store = RecordingStore::new(document_result());
        let graph = GraphDb::new(store.clone());

        let mut params = Map::new();
        params.insert("limit".to_string(), json!(5));
        let rows = graph
            .query("MATCH (d:Document) RETURN d LIMIT $limit", Some(params), false)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["d"], json!({"id": 4013073}));
        assert_eq!(store.statements()[0].params["limit"], json!(5));
    }

    #[tokio::test]
    async fn test_query_summary() {
        let store = RecordingStore::new(document_result());
        let graph = GraphDb::new(store);

        let summary = graph.query_summary("MATCH (n) RETURN n", None, true).await.unwrap();
        assert_eq!(summary.records_count, 1);
        assert!(!summary.counters.contains_updates);
    }

    #[tokio::test]
    async fn test_check_connection_propagates_unavailable() {
        let graph = GraphDb::new(RecordingStore::new(QueryResult::default()));
        let err = graph.check_connection().await.unwrap_err();
        assert!(matches!(err, ApiError::GraphUnavailable { .. }));
    }

    #[test]
    fn test_id_string_accepts_numbers_and_strings() {
        assert_eq!(id_string(&json!(12)).as_deref(), Some("12"));
        assert_eq!(id_string(&json!("A/RES/1")).as_deref(), Some("A/RES/1"));
        assert!(id_string(&json!(null)).is_none());
    }
}
