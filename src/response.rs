use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Request body for `POST /query`.
#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

/// Body returned by the analysis backend, for both success and failure statuses.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub query_details: Option<QueryDetails>,
    #[serde(default)]
    pub raw_data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Query analysis echoed by the backend. Its fields come from model output the
/// backend does not validate, so each one accepts a string, list, object or null.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct QueryDetails {
    #[serde(default, deserialize_with = "lenient_text")]
    pub query_focus: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub specific_data_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub relevant_columns: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time_frame: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub filter_criteria: Vec<String>,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn flatten(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_text)
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect(),
        other => vec![value_text(&other)],
    }
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(flatten(Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(flatten(Value::deserialize(deserializer)?).join(", "))
}

impl AnalysisResponse {
    pub fn with_analysis(text: impl Into<String>) -> Self {
        Self {
            analysis: Some(text.into()),
            ..Default::default()
        }
    }

    /// The server-provided error message, ignoring blank strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
    }
}

impl QueryDetails {
    pub fn data_points_joined(&self) -> String {
        self.specific_data_points.join(", ")
    }
}
