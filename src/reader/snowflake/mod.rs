//! Snowflake reader over the session/query REST endpoints
//!
//! One `SnowflakeReader` owns one authenticated session. Statements run
//! synchronously, one at a time; results are requested in JSON form and
//! decoded into typed DataFrames (see [`decode`]).

pub mod decode;
pub mod wire;

use crate::config::Settings;
use crate::reader::{bind_named, Params, Reader};
use crate::{DataFrame, Result, SalesvizError};
use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::Duration;
use wire::{Envelope, LoginData, LoginRequest, LoginResponseData, QueryRequest, QueryResponseData};

const CLIENT_APP_ID: &str = "salesviz";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const SNOWFLAKE_ACCEPT: &str = "application/snowflake";

/// A live warehouse session
pub struct SnowflakeReader {
    client: Client,
    base_url: String,
    token: Option<String>,
    sequence: Cell<u64>,
}

impl std::fmt::Debug for SnowflakeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeReader")
            .field("base_url", &self.base_url)
            .field("open", &self.is_open())
            .finish()
    }
}

fn connection_error(context: &str, e: impl std::fmt::Display) -> SalesvizError {
    SalesvizError::ConnectionError(format!("{}: {}", context, e))
}

fn read_envelope(response: Response, context: &str) -> Result<Envelope> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| connection_error(context, e))?;
    if !status.is_success() {
        return Err(connection_error(
            context,
            format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
        ));
    }
    serde_json::from_str(&body).map_err(|e| connection_error(context, format!("invalid response: {}", e)))
}

impl SnowflakeReader {
    /// Open a session with the given settings.
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::ConnectionError` when the account is not
    /// configured, the host is unreachable, or the login is rejected.
    pub fn connect(settings: &Settings) -> Result<Self> {
        let base_url = settings.base_url().ok_or_else(|| {
            SalesvizError::ConnectionError(
                "No account configured (set SF_ACCOUNT or SF_HOST)".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("{}/{}", CLIENT_APP_ID, crate::VERSION))
            .build()
            .map_err(|e| connection_error("Failed to build HTTP client", e))?;

        let mut session_parameters = BTreeMap::new();
        session_parameters.insert("JDBC_QUERY_RESULT_FORMAT".to_string(), json!("JSON"));
        session_parameters.insert("PYTHON_CONNECTOR_QUERY_RESULT_FORMAT".to_string(), json!("JSON"));
        if let Some(tag) = &settings.query_tag {
            session_parameters.insert("QUERY_TAG".to_string(), json!(tag));
        }

        let body = LoginRequest {
            data: LoginData {
                client_app_id: CLIENT_APP_ID.to_string(),
                client_app_version: crate::VERSION.to_string(),
                account_name: settings.account_name().unwrap_or_default().to_string(),
                login_name: settings.user.clone().unwrap_or_default(),
                password: settings.password.clone().unwrap_or_default(),
                session_parameters,
            },
        };

        let request_id = uuid::Uuid::new_v4().to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("requestId", request_id.as_str()),
            ("databaseName", settings.database.as_str()),
            ("schemaName", settings.schema.as_str()),
        ];
        if let Some(warehouse) = &settings.warehouse {
            query.push(("warehouse", warehouse.as_str()));
        }
        if let Some(role) = &settings.role {
            query.push(("roleName", role.as_str()));
        }

        tracing::info!(
            "Connecting to {} as {}",
            base_url,
            settings.user.as_deref().unwrap_or("<unset>")
        );
        let response = client
            .post(format!("{}/session/v1/login-request", base_url))
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .map_err(|e| connection_error("Login request failed", e))?;

        let envelope = read_envelope(response, "Login failed")?;
        if !envelope.success {
            return Err(SalesvizError::ConnectionError(format!(
                "Login failed: {}",
                envelope.describe()
            )));
        }
        let data: LoginResponseData = envelope
            .data
            .ok_or_else(|| connection_error("Login failed", "response has no session data"))
            .and_then(|data| {
                serde_json::from_value(data).map_err(|e| connection_error("Login failed", e))
            })?;

        tracing::info!("Connected (database {}, schema {})", settings.database, settings.schema);
        Ok(Self {
            client,
            base_url,
            token: Some(data.token),
            sequence: Cell::new(0),
        })
    }

    /// Whether the session is still open
    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    fn authorization(&self) -> Result<String> {
        self.token
            .as_ref()
            .map(|token| format!("Snowflake Token=\"{}\"", token))
            .ok_or_else(|| SalesvizError::ConnectionError("Connection is closed".to_string()))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Turn a query envelope into its data, failing on server-side errors.
    fn query_data(envelope: Envelope) -> Result<QueryResponseData> {
        if !envelope.success && !envelope.is_in_progress() {
            return Err(SalesvizError::QueryError(envelope.describe()));
        }
        match envelope.data {
            Some(Value::Null) | None => Ok(QueryResponseData::default()),
            Some(data) => serde_json::from_value(data)
                .map_err(|e| SalesvizError::QueryError(format!("Malformed query response: {}", e))),
        }
    }

    fn submit(&self, sql: &str, params: &Params) -> Result<QueryResponseData> {
        let authorization = self.authorization()?;
        let bound = bind_named(sql, params)?;
        let sequence_id = self.sequence.get() + 1;
        self.sequence.set(sequence_id);

        tracing::debug!("Executing SQL ({} bindings): {}", bound.bindings.len(), bound.sql);

        let body = QueryRequest {
            sql_text: bound.sql,
            async_exec: false,
            sequence_id,
            query_submission_time: chrono::Utc::now().timestamp_millis(),
            bindings: wire::positional_bindings(&bound.bindings),
        };
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .client
            .post(self.url("/queries/v1/query-request"))
            .query(&[("requestId", request_id.as_str())])
            .header(reqwest::header::AUTHORIZATION, authorization.as_str())
            .header(reqwest::header::ACCEPT, SNOWFLAKE_ACCEPT)
            .json(&body)
            .send()
            .map_err(|e| connection_error("Query request failed", e))?;

        let mut envelope = read_envelope(response, "Query request failed")?;
        while envelope.is_in_progress() {
            let data = Self::query_data(envelope)?;
            let result_url = data.get_result_url.ok_or_else(|| {
                SalesvizError::QueryError("Query in progress but no result URL given".to_string())
            })?;
            tracing::debug!("Query still running, polling {}", result_url);
            std::thread::sleep(POLL_INTERVAL);

            let response = self
                .client
                .get(self.url(&result_url))
                .header(reqwest::header::AUTHORIZATION, authorization.as_str())
                .header(reqwest::header::ACCEPT, SNOWFLAKE_ACCEPT)
                .send()
                .map_err(|e| connection_error("Polling query result failed", e))?;
            envelope = read_envelope(response, "Polling query result failed")?;
        }

        Self::query_data(envelope)
    }

    fn fetch_chunk(&self, data: &QueryResponseData, url: &str) -> Result<Vec<Vec<Value>>> {
        let mut request = self.client.get(url);
        match &data.chunk_headers {
            Some(headers) => {
                for (name, value) in headers {
                    request = request.header(name.as_str(), value.as_str());
                }
            }
            None => {
                if let Some(key) = &data.qrmk {
                    request = request
                        .header("x-amz-server-side-encryption-customer-algorithm", "AES256")
                        .header("x-amz-server-side-encryption-customer-key", key.as_str());
                }
            }
        }

        let response = request
            .send()
            .map_err(|e| connection_error("Result chunk download failed", e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| connection_error("Result chunk download failed", e))?;
        if !status.is_success() {
            return Err(connection_error(
                "Result chunk download failed",
                format!("HTTP {}", status),
            ));
        }
        decode::parse_chunk(&body)
    }
}

impl Reader for SnowflakeReader {
    fn read_table(&self, sql: &str, params: &Params) -> Result<DataFrame> {
        let mut data = self.submit(sql, params)?;

        if let Some(format) = &data.query_result_format {
            if !format.eq_ignore_ascii_case("json") {
                return Err(SalesvizError::QueryError(format!(
                    "Unsupported result format '{}'",
                    format
                )));
            }
        }

        let mut rows = std::mem::take(&mut data.rowset);
        for (idx, chunk) in data.chunks.iter().enumerate() {
            let chunk_rows = self.fetch_chunk(&data, &chunk.url)?;
            if let Some(expected) = chunk.row_count {
                if expected != chunk_rows.len() {
                    tracing::warn!(
                        "Result chunk {} has {} rows, expected {}",
                        idx,
                        chunk_rows.len(),
                        expected
                    );
                }
            }
            rows.extend(chunk_rows);
        }

        let df = decode::decode_rowset(&data.rowtype, &rows)?;
        tracing::debug!(
            "Query {} returned {} rows x {} columns",
            data.query_id.as_deref().unwrap_or("?"),
            df.height(),
            df.width()
        );
        Ok(df)
    }

    fn close(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.url("/session"))
            .query(&[("delete", "true")])
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", token),
            )
            .header(reqwest::header::ACCEPT, SNOWFLAKE_ACCEPT)
            .send()
            .map_err(|e| connection_error("Logout failed", e))?;
        let envelope = read_envelope(response, "Logout failed")?;
        if !envelope.success {
            return Err(SalesvizError::ConnectionError(format!(
                "Logout failed: {}",
                envelope.describe()
            )));
        }

        tracing::info!("Disconnected");
        Ok(())
    }
}

impl Drop for SnowflakeReader {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                tracing::warn!("Failed to close session: {}", e);
            }
        }
    }
}
