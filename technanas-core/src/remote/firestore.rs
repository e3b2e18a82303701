//! Firestore REST v1 adapter.
//!
//! Maps the [`RemoteStore`] contract onto the documents API:
//!
//! | operation        | request                                              |
//! |------------------|------------------------------------------------------|
//! | `get_document`   | `GET    {docs}/{collection}/{id}`                    |
//! | `query`          | `POST   {docs}:runQuery` with a `structuredQuery`    |
//! | `add_document`   | `POST   {docs}/{collection}`                         |
//! | `set_document`   | `PATCH  {docs}/{collection}/{id}` (no update mask)   |
//! | `update_fields`  | `PATCH` with `updateMask.fieldPaths`, must exist     |
//! | `delete_document`| `DELETE {docs}/{collection}/{id}`                    |
//!
//! Values travel in Firestore's typed encoding (`{"stringValue": ..}`,
//! `{"integerValue": "42"}`, ...). Field types the sync layer never writes
//! (maps, arrays, references) are skipped when decoding, which leaves the
//! field absent for the caller.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{Direction, Document, FieldValue, Fields, Query, RemoteError, RemoteStore};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for [`FirestoreClient`].
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Web API key, sent as `?key=`.
    pub api_key: Option<String>,
    /// ID token, sent as a bearer token when present.
    pub auth_token: Option<String>,
    /// Override for the emulator, e.g. `http://localhost:8080/v1`.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: None,
            auth_token: None,
            base_url: None,
            timeout: Duration::from_secs(15),
        }
    }
}

pub struct FirestoreClient {
    http: reqwest::Client,
    documents_url: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(config: FirestoreConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');

        Ok(Self {
            http,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base, config.project_id
            ),
            api_key: config.api_key,
            auth_token: config.auth_token,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, urlencoding::encode(collection))
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, "Firestore request failed: {}", body);
        Err(status_error(status, body))
    }

    async fn json(&self, builder: RequestBuilder) -> Result<Value, RemoteError> {
        self.send(builder)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, RemoteError> {
        let url = self.document_url(collection, id);
        match self.json(self.request(Method::GET, &url)).await {
            Ok(body) => Ok(decode_document(&body)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, RemoteError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({ "structuredQuery": structured_query(query) });
        let response = self
            .json(self.request(Method::POST, &url).json(&body))
            .await?;

        // runQuery streams one entry per result; entries without a
        // `document` only carry read metadata.
        let entries = response.as_array().cloned().unwrap_or_default();
        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("document"))
            .filter_map(decode_document)
            .collect())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError> {
        let url = self.collection_url(collection);
        let body = json!({ "fields": encode_fields(&fields) });
        let created = self
            .json(self.request(Method::POST, &url).json(&body))
            .await?;

        decode_document(&created)
            .map(|doc| doc.id)
            .ok_or_else(|| RemoteError::Unavailable("created document has no name".to_string()))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id);
        let body = json!({ "fields": encode_fields(&fields) });
        self.send(self.request(Method::PATCH, &url).json(&body))
            .await?;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id);
        let mut builder = self
            .request(Method::PATCH, &url)
            .query(&[("currentDocument.exists", "true")]);
        for field in fields.keys() {
            builder = builder.query(&[("updateMask.fieldPaths", field)]);
        }
        let body = json!({ "fields": encode_fields(&fields) });
        self.send(builder.json(&body)).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

/// Maps a non-success HTTP status to the remote error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: String) -> RemoteError {
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            RemoteError::Unavailable(message)
        }
        s if s.is_server_error() => RemoteError::Unavailable(message),
        _ => RemoteError::PermissionDenied(message),
    }
}

pub(crate) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        // 64-bit integers are transported as strings.
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
    }
}

pub(crate) fn decode_value(value: &Value) -> Option<FieldValue> {
    let object = value.as_object()?;
    let (kind, inner) = object.iter().next()?;
    match kind.as_str() {
        "nullValue" => Some(FieldValue::Null),
        "booleanValue" => inner.as_bool().map(FieldValue::Bool),
        "integerValue" => match inner {
            Value::String(s) => s.parse().ok().map(FieldValue::Integer),
            other => other.as_i64().map(FieldValue::Integer),
        },
        "doubleValue" => inner.as_f64().map(FieldValue::Double),
        "stringValue" | "timestampValue" => inner.as_str().map(FieldValue::from),
        _ => None,
    }
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    Value::Object(map)
}

/// Decodes a Firestore document resource. The id is the last segment of
/// its `name`.
pub(crate) fn decode_document(value: &Value) -> Option<Document> {
    let name = value.get("name")?.as_str()?;
    let id = name.rsplit('/').next()?;
    let id = urlencoding::decode(id)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| id.to_string());

    let fields = value
        .get("fields")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(name, raw)| decode_value(raw).map(|v| (name.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    Some(Document::new(id, fields))
}

pub(crate) fn structured_query(query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": query.collection }]),
    );

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|(field, value)| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode_value(value),
                }
            })
        })
        .collect();

    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".to_string(), filters[0].clone());
        }
        _ => {
            structured.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".to_string(),
            json!([{ "field": { "fieldPath": field }, "direction": direction }]),
        );
    }

    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }

    Value::Object(structured)
}
