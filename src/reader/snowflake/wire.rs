//! Request and response bodies of the Snowflake session/query endpoints

use crate::reader::ParamValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Server codes meaning "the query is still running, poll the result URL"
pub const QUERY_IN_PROGRESS_CODES: &[&str] = &["333333", "333334"];

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: bool,
}

impl Envelope {
    pub fn is_in_progress(&self) -> bool {
        self.code
            .as_deref()
            .map(|code| QUERY_IN_PROGRESS_CODES.contains(&code))
            .unwrap_or(false)
    }

    /// `message (code)` for error reporting
    pub fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("no message");
        match &self.code {
            Some(code) => format!("{} (code {})", message, code),
            None => message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub data: LoginData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoginData {
    pub client_app_id: String,
    pub client_app_version: String,
    pub account_name: String,
    pub login_name: String,
    pub password: String,
    pub session_parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub token: String,
    #[serde(default)]
    pub master_token: Option<String>,
    #[serde(default)]
    pub session_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sql_text: String,
    pub async_exec: bool,
    pub sequence_id: u64,
    pub query_submission_time: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Binding>,
}

/// A positional bind value, keyed by its 1-based position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
}

impl From<&ParamValue> for Binding {
    fn from(value: &ParamValue) -> Self {
        let kind = match value {
            ParamValue::Text(_) | ParamValue::Date(_) => "TEXT",
            ParamValue::Integer(_) => "FIXED",
            ParamValue::Real(_) => "REAL",
            ParamValue::Boolean(_) => "BOOLEAN",
        };
        Binding {
            kind,
            value: value.to_string(),
        }
    }
}

/// Positional bindings in the shape the query endpoint expects
pub fn positional_bindings(values: &[ParamValue]) -> BTreeMap<String, Binding> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| ((idx + 1).to_string(), Binding::from(value)))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponseData {
    #[serde(default)]
    pub rowtype: Vec<RowType>,
    #[serde(default)]
    pub rowset: Vec<Vec<Value>>,
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub query_result_format: Option<String>,
    #[serde(default)]
    pub chunks: Vec<ChunkInfo>,
    #[serde(default)]
    pub chunk_headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub qrmk: Option<String>,
    #[serde(default)]
    pub get_result_url: Option<String>,
}

/// Column description of a result set
#[derive(Debug, Clone, Deserialize)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub scale: Option<i64>,
    #[serde(default)]
    pub precision: Option<i64>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

/// A result chunk stored outside the response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub url: String,
    #[serde(default)]
    pub row_count: Option<usize>,
}
