use crate::config::Config;
use crate::errors::AppError;
use crate::models::{decode_records, PropertyDetails, PropertyRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Request body of `POST /buscar`. Blank criteria are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeQuery {
    #[serde(rename = "direccion", skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(rename = "numero", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(rename = "coords", skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
}

/// Request body of `POST /buscar_cercanas`.
///
/// `numero` is resolved by the remote store against the record id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyQuery {
    #[serde(rename = "numero")]
    pub reference: String,
    #[serde(rename = "radio")]
    pub radius: f64,
}

/// Search responses come either wrapped in `resultados` or as a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        resultados: Vec<Value>,
    },
}

impl SearchPayload {
    fn into_values(self) -> Vec<Value> {
        match self {
            SearchPayload::Bare(values) => values,
            SearchPayload::Wrapped { resultados } => resultados,
        }
    }
}

/// Client for the remote property registry.
///
/// Every method performs exactly one HTTP request and never retries.
#[derive(Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RegistryClient {
    /// Creates a new `RegistryClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the remote store; endpoints are resolved relative to it.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("Invalid registry base URL: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create registry client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.registry_base_url,
            Duration::from_secs(config.registry_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Failed to build URL for {}: {}", path, e)))
    }

    /// Fetches every record (`GET /casas`).
    ///
    /// # Returns
    ///
    /// * `Result<Vec<PropertyRecord>, AppError>` - The records that passed schema validation.
    pub async fn list_records(&self) -> Result<Vec<PropertyRecord>, AppError> {
        let url = self.endpoint("casas")?;
        tracing::debug!("Fetching records from registry: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Registry request failed: {}", e)))?;

        let body = read_body(response, "GET /casas").await?;
        let values: Vec<Value> = serde_json::from_value(body).map_err(|e| {
            AppError::Transport(format!("Registry record list is not an array: {}", e))
        })?;

        let records = decode_records(values);
        tracing::info!("Fetched {} records from registry", records.len());
        Ok(records)
    }

    /// Creates a record from a draft (`POST /agregar_casa`).
    ///
    /// # Returns
    ///
    /// * `Result<i64, AppError>` - The id assigned by the remote store.
    pub async fn create_record(&self, draft: &PropertyDetails) -> Result<i64, AppError> {
        tracing::info!("Creating record in registry for owner '{}'", draft.owner);

        let body = self.post_json("agregar_casa", draft).await?;

        let id = match body.get("id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        match id {
            Some(id) => {
                tracing::info!("✓ Record created successfully: {}", id);
                Ok(id)
            }
            None => {
                tracing::warn!("Unexpected create response format: {:?}", body);
                Err(AppError::Transport(
                    "Record creation response missing 'id' field".to_string(),
                ))
            }
        }
    }

    /// Replaces a record server-side (`POST /editar_casa`).
    pub async fn update_record(&self, record: &PropertyRecord) -> Result<(), AppError> {
        tracing::info!("Updating record {} in registry", record.id);
        self.post_json("editar_casa", record).await?;
        tracing::info!("✓ Record {} updated", record.id);
        Ok(())
    }

    /// Deletes a record (`POST /eliminar_casa`).
    pub async fn delete_record(&self, id: i64) -> Result<(), AppError> {
        tracing::info!("Deleting record {} from registry", id);
        self.post_json("eliminar_casa", &json!({ "id": id })).await?;
        tracing::info!("✓ Record {} deleted", id);
        Ok(())
    }

    /// Attribute search (`POST /buscar`); results keep the server's order.
    pub async fn search(&self, query: &AttributeQuery) -> Result<Vec<PropertyRecord>, AppError> {
        tracing::info!("Attribute search: {:?}", query);
        let body = self.post_json("buscar", query).await?;
        decode_search(body)
    }

    /// Proximity search (`POST /buscar_cercanas`).
    pub async fn search_nearby(&self, query: &NearbyQuery) -> Result<Vec<PropertyRecord>, AppError> {
        tracing::info!(
            "Proximity search around record {} within {}",
            query.reference,
            query.radius
        );
        let body = self.post_json("buscar_cercanas", query).await?;
        decode_search(body)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, AppError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Registry request to {} failed: {}", path, e)))?;

        read_body(response, path).await
    }
}

/// Reads a response body, turning any failure into an `AppError`.
///
/// An `error` field in the body always wins, even on a 2xx status; otherwise a
/// non-success status becomes a generic transport failure. An empty body is
/// treated as `{}`.
async fn read_body(response: reqwest::Response, what: &str) -> Result<Value, AppError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to read {} response: {}", what, e)))?;

    let body: Option<Value> = if text.trim().is_empty() {
        Some(json!({}))
    } else {
        serde_json::from_str(&text).ok()
    };

    if let Some(message) = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(|e| e.as_str())
    {
        return Err(AppError::RemoteRejected {
            status: status.as_u16(),
            message: message.to_string(),
        });
    }

    if !status.is_success() {
        tracing::error!("Registry returned {} for {}", status, what);
        return Err(AppError::Transport(format!("{} returned HTTP {}", what, status)));
    }

    body.ok_or_else(|| AppError::Transport(format!("Failed to parse {} response", what)))
}

fn decode_search(body: Value) -> Result<Vec<PropertyRecord>, AppError> {
    let payload: SearchPayload = serde_json::from_value(body)
        .map_err(|e| AppError::Transport(format!("Unexpected search response: {}", e)))?;
    Ok(decode_records(payload.into_values()))
}
