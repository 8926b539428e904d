/// Metadata published by the API itself
pub const API_TITLE: &str = "United Nations SemUN's API";
pub const API_DESCRIPTION: &str = "This is the API for the United Nations SemUN's project. \
It is queried by the frontend to get the data from the backend. \
It consists of two parts: proxying calls to the United Nations Digital Library API, \
and querying the SemUN graph database to get the results.";
pub const SERVICE_NAME: &str = "semun-api";

// Server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_DIR: &str = "logs";

// Digital Library defaults
pub const DEFAULT_UNDL_BASE_URL: &str = "https://digitallibrary.un.org/api/v1";
pub const DEFAULT_UNDL_PAGE_SIZE: u32 = 10;
pub const DEFAULT_UNDL_TIMEOUT_SECONDS: u64 = 30;

// Graph database defaults (Docker compose service name)
pub const DEFAULT_GRAPH_URI: &str = "bolt://neo4j.un-semun.orb.local:7687";
pub const DEFAULT_GRAPH_DATABASE: &str = "neo4j";
pub const DEFAULT_GRAPH_TIMEOUT_SECONDS: u64 = 30;
pub const NEO4J_HTTP_PORT: u16 = 7474;

/// Label of the nodes holding Digital Library documents
pub const DOCUMENT_LABEL: &str = "Document";

/// Upper bound on ids accepted by a single graph request
pub const MAX_GRAPH_IDS: usize = 500;
