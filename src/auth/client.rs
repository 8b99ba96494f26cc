//! Authenticated HTTP client for the Tarken Hub API.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// Timeout applied to every Hub API request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Serialize query parameters in first-seen key order, skipping `null` values.
///
/// A repeated key keeps one entry holding the last value. Arrays are joined with
/// `,`, integral numbers drop their fraction and objects are sent as JSON.
pub fn serialize_query(params: &[(&str, Value)]) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(params.len());
    for (key, value) in params {
        if value.is_null() {
            continue;
        }
        let value = query_value(value);
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => pairs.push((*key, value)),
        }
    }

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    serializer.finish()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(query_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// HTTP capability bound to one Hub API base URL and bearer token.
///
/// Only `get`, `post` and `put` are exposed.
#[derive(Clone, Debug)]
pub struct HubHttpClient {
    client: Client,
    base_url: String,
}

impl HubHttpClient {
    pub fn new(base_url: impl Into<String>, authorization: &str) -> BridgeResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(authorization)
            .map_err(|e| BridgeError::Internal(anyhow::anyhow!("authorization header: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` (with an optional serialized query).
    pub fn url(&self, path: &str, params: &[(&str, Value)]) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let query = serialize_query(params);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Value)],
    ) -> BridgeResult<T> {
        let url = self.url(path, params);
        debug!(%url, "GET");
        send(self.client.get(url)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> BridgeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[]);
        debug!(%url, "POST");
        send(self.client.post(url).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> BridgeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[]);
        debug!(%url, "PUT");
        send(self.client.put(url).json(body)).await
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> BridgeResult<T> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BridgeError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_skips_nulls_and_keeps_order() {
        let q = serialize_query(&[
            ("ticketId", json!("t-1")),
            ("skip", Value::Null),
            ("limit", json!(1)),
            ("page", json!(1)),
            ("status", json!("SUCCEEDED")),
        ]);
        assert_eq!(q, "ticketId=t-1&limit=1&page=1&status=SUCCEEDED");
    }

    #[test]
    fn query_encodes_values() {
        let q = serialize_query(&[("q", json!("a b&c")), ("flag", json!(true))]);
        assert_eq!(q, "q=a+b%26c&flag=true");
    }

    #[test]
    fn query_flattens_arrays_and_integral_floats() {
        let q = serialize_query(&[
            ("ids", json!(["a", "b", null, 3])),
            ("n", json!(2.0)),
            ("ratio", json!(0.5)),
        ]);
        assert_eq!(q, "ids=a%2Cb%2C%2C3&n=2&ratio=0.5");
    }

    #[test]
    fn query_repeated_key_keeps_last_value_in_first_position() {
        let q = serialize_query(&[
            ("k", json!("x")),
            ("page", json!(1)),
            ("k", json!("y")),
            ("k", Value::Null),
        ]);
        assert_eq!(q, "k=y&page=1");
    }

    #[test]
    fn url_joins_base_and_path() {
        let client =
            HubHttpClient::new("https://prod.api.hub.tarken.ag/api/v1", "Bearer t").unwrap();
        assert_eq!(
            client.url("/crm/tickets/1", &[]),
            "https://prod.api.hub.tarken.ag/api/v1/crm/tickets/1"
        );
        assert_eq!(
            client.url("crm/transitions", &[("workflowId", json!("w"))]),
            "https://prod.api.hub.tarken.ag/api/v1/crm/transitions?workflowId=w"
        );
    }
}
