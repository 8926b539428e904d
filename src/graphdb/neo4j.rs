use super::GraphStore;
use crate::config::GraphConfig;
use crate::constants::NEO4J_HTTP_PORT;
use crate::domain::{
    GraphNode, GraphRelationship, QueryCounters, QueryResult, QuerySummary, Statement,
};
use crate::error::{truncate_body, ApiError, Result, MAX_ERROR_BODY};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Neo4j over its HTTP transactional endpoint
pub struct Neo4jHttpStore {
    client: reqwest::Client,
    uri: String,
    commit_url: String,
    user: Option<String>,
    password: Option<String>,
}

impl Neo4jHttpStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let base = http_endpoint(&config.uri)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            uri: config.uri.clone(),
            commit_url: format!("{}/db/{}/tx/commit", base, config.database),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }

    fn unavailable(&self, cause: impl Display) -> ApiError {
        ApiError::GraphUnavailable {
            uri: self.uri.clone(),
            user: self.user.clone().unwrap_or_else(|| "anonymous".to_string()),
            message: cause.to_string(),
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    #[instrument(skip(self, statement), fields(query = %statement.query))]
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let body = json!({
            "statements": [{
                "statement": statement.query,
                "parameters": statement.params,
                "resultDataContents": ["row", "graph"],
                "includeStats": true,
            }]
        });

        let started = Instant::now();
        let mut request = self
            .client
            .post(&self.commit_url)
            .header(ACCEPT, "application/json")
            .json(&body);
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_ref());
        }

        let response = request.send().await.map_err(|e| self.unavailable(e))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(self.unavailable(format!("authentication rejected ({status})")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Graph {
                message: format!("HTTP {status}: {}", truncate_body(&text, MAX_ERROR_BODY)),
            });
        }

        let tx: TxResponse = response.json().await?;
        if let Some(error) = tx.errors.first() {
            return Err(ApiError::Graph {
                message: format!("{}: {}", error.code, error.message),
            });
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let result = tx.results.into_iter().next().unwrap_or_default();
        let result = result.into_query_result(&statement.query, elapsed_ms);
        debug!(
            "Graph returned {} rows, {} nodes, {} relationships",
            result.rows.len(),
            result.nodes.len(),
            result.relationships.len()
        );
        Ok(result)
    }

    async fn verify_connectivity(&self) -> Result<()> {
        match self.execute(&Statement::new("RETURN 1")).await {
            Ok(_) => Ok(()),
            Err(e @ ApiError::GraphUnavailable { .. }) => Err(e),
            Err(other) => Err(self.unavailable(other)),
        }
    }
}

/// Map a configured database URI onto the HTTP endpoint base.
///
/// Bolt and neo4j schemes point at the driver port, so they are redirected to
/// the HTTP connector on the same host.
pub fn http_endpoint(uri: &str) -> Result<String> {
    let (scheme, rest) = uri
        .trim()
        .split_once("://")
        .ok_or_else(|| ApiError::Config(format!("graph URI '{uri}' has no scheme")))?;
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ApiError::Config(format!("graph URI '{uri}' has no host")));
    }

    match scheme.to_lowercase().as_str() {
        "http" | "https" => Ok(format!("{}://{}", scheme.to_lowercase(), authority)),
        "bolt" | "neo4j" => Ok(format!("http://{}:{}", host_of(authority), NEO4J_HTTP_PORT)),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => {
            Ok(format!("https://{}", host_of(authority)))
        }
        other => Err(ApiError::Config(format!(
            "unsupported graph URI scheme '{other}'"
        ))),
    }
}

fn host_of(authority: &str) -> &str {
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxData>,
    #[serde(default)]
    stats: TxStats,
}

#[derive(Debug, Deserialize)]
struct TxData {
    #[serde(default)]
    row: Vec<Value>,
    #[serde(default)]
    graph: TxGraph,
}

#[derive(Debug, Default, Deserialize)]
struct TxGraph {
    #[serde(default)]
    nodes: Vec<TxNode>,
    #[serde(default)]
    relationships: Vec<TxRelationship>,
}

#[derive(Debug, Deserialize)]
struct TxNode {
    id: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TxRelationship {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "startNode")]
    start: String,
    #[serde(rename = "endNode")]
    end: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TxStats {
    contains_updates: bool,
    nodes_created: u64,
    nodes_deleted: u64,
    relationships_created: u64,
    relationship_deleted: u64,
    properties_set: u64,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl TxResult {
    /// Rows keep their order; nodes and relationships are distinct by id.
    fn into_query_result(self, query: &str, elapsed_ms: u64) -> QueryResult {
        let mut rows = Vec::with_capacity(self.data.len());
        let mut nodes = Vec::new();
        let mut relationships = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut seen_relationships = HashSet::new();

        for data in self.data {
            rows.push(data.row);
            for node in data.graph.nodes {
                if seen_nodes.insert(node.id.clone()) {
                    nodes.push(GraphNode {
                        id: node.id,
                        labels: node.labels,
                        properties: node.properties,
                    });
                }
            }
            for rel in data.graph.relationships {
                if seen_relationships.insert(rel.id.clone()) {
                    relationships.push(GraphRelationship {
                        id: rel.id,
                        kind: rel.kind,
                        start: rel.start,
                        end: rel.end,
                        properties: rel.properties,
                    });
                }
            }
        }

        let summary = QuerySummary {
            query: query.to_string(),
            records_count: rows.len(),
            result_available_after_ms: elapsed_ms,
            counters: QueryCounters {
                contains_updates: self.stats.contains_updates,
                nodes_created: self.stats.nodes_created,
                nodes_deleted: self.stats.nodes_deleted,
                relationships_created: self.stats.relationships_created,
                relationships_deleted: self.stats.relationship_deleted,
                properties_set: self.stats.properties_set,
            },
        };

        QueryResult {
            columns: self.columns,
            rows,
            nodes,
            relationships,
            summary,
        }
    }
}
