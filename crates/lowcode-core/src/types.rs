use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Kind of action. Everything except `Transformer` runs on the backend.
///
/// Unknown kinds round-trip unchanged through `Other` so descriptors written
/// by newer builders are still runnable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    RestApi,
    GraphQl,
    MySql,
    MariaDb,
    TiDb,
    Postgresql,
    Redis,
    MongoDb,
    ElasticSearch,
    S3,
    Smtp,
    Transformer,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::RestApi => "restapi",
            ActionType::GraphQl => "graphql",
            ActionType::MySql => "mysql",
            ActionType::MariaDb => "mariadb",
            ActionType::TiDb => "tidb",
            ActionType::Postgresql => "postgresql",
            ActionType::Redis => "redis",
            ActionType::MongoDb => "mongodb",
            ActionType::ElasticSearch => "elasticsearch",
            ActionType::S3 => "s3",
            ActionType::Smtp => "smtp",
            ActionType::Transformer => "transformer",
            ActionType::Other(s) => s,
        }
    }

    pub fn is_transformer(&self) -> bool {
        matches!(self, ActionType::Transformer)
    }

    pub fn is_rest_api(&self) -> bool {
        matches!(self, ActionType::RestApi)
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "restapi" => ActionType::RestApi,
            "graphql" => ActionType::GraphQl,
            "mysql" => ActionType::MySql,
            "mariadb" => ActionType::MariaDb,
            "tidb" => ActionType::TiDb,
            "postgresql" => ActionType::Postgresql,
            "redis" => ActionType::Redis,
            "mongodb" => ActionType::MongoDb,
            "elasticsearch" => ActionType::ElasticSearch,
            "s3" => ActionType::S3,
            "smtp" => ActionType::Smtp,
            "transformer" => ActionType::Transformer,
            _ => ActionType::Other(s),
        }
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        match t {
            ActionType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ActionType::from(s.to_string()))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RuntimeMetrics
// ---------------------------------------------------------------------------

/// Timing data attached to a result. Durations are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare_query: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_size: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RuntimeMetrics {
    /// Shallow override: every field present in `newer` wins.
    pub fn merge(mut self, newer: &RuntimeMetrics) -> RuntimeMetrics {
        if newer.prepare_query.is_some() {
            self.prepare_query = newer.prepare_query;
        }
        if newer.network.is_some() {
            self.network = newer.network;
        }
        if newer.transfer_size.is_some() {
            self.transfer_size = newer.transfer_size;
        }
        self.extra
            .extend(newer.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prepare_query.is_none()
            && self.network.is_none()
            && self.transfer_size.is_none()
            && self.extra.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ActionDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    /// Empty until the registry assigns one.
    #[serde(default)]
    pub action_id: String,
    /// Transformers have no backing resource.
    #[serde(default)]
    pub resource_id: String,
    pub action_type: ActionType,
    /// Type-specific configuration (method, url, headers, body, query, ...).
    #[serde(default = "empty_object")]
    pub action_template: Value,
    pub display_name: String,
    /// Metrics from the previous run, carried into the next result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeMetrics>,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ActionDescriptor {
    pub fn new(
        action_id: impl Into<String>,
        action_type: ActionType,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            resource_id: String::new(),
            action_type,
            action_template: empty_object(),
            display_name: display_name.into(),
            runtime: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_id: String,
    /// Transformed payload. Transformers are not applied yet, so this
    /// mirrors `raw_data`.
    pub data: Value,
    /// Response body exactly as the server returned it.
    pub raw_data: Value,
    pub error: bool,
    #[serde(default)]
    pub runtime: RuntimeMetrics,
    pub updated_at: DateTime<Utc>,
}

impl ActionResult {
    /// Result stored for transformer actions until they are evaluated.
    pub fn transformer_placeholder(action_id: &str) -> Self {
        Self {
            action_id: action_id.to_string(),
            data: empty_object(),
            raw_data: empty_object(),
            error: false,
            runtime: RuntimeMetrics::default(),
            updated_at: Utc::now(),
        }
    }
}
