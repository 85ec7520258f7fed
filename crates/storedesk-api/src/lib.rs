// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use storedesk_app::{ListItem, LookupSource, PurchaseInvoicePayload};
use tracing::{debug, info};
use url::Url;

pub const PURCHASE_INVOICES_ENDPOINT: &str = "purchase-invoices";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url scheme {:?} is unsupported -- use http or https",
                parsed.scheme()
            );
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        self.send(request, path)
    }

    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request, path)
    }

    pub fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.http.put(self.url(path)).json(body);
        self.send(request, path)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response
            .json()
            .with_context(|| format!("decode response from /{}", path.trim_start_matches('/')))
    }

    /// Fetches one page of a collection. `page` is 1-based.
    pub fn fetch_page(&self, endpoint: &str, page: u32, search: &str) -> Result<Vec<ListItem>> {
        debug!(endpoint, page, search, "fetching list page");
        let body: Value = self.get_json(
            endpoint,
            &[("page", page.to_string()), ("search", search.to_owned())],
        )?;
        list_items_from_json(body).with_context(|| format!("decode /{endpoint} page {page}"))
    }

    pub fn fetch_lookup(&self, source: LookupSource, page: u32, search: &str) -> Result<Vec<ListItem>> {
        self.fetch_page(source.endpoint(), page, search)
    }

    pub fn save_purchase_invoice(&self, payload: &PurchaseInvoicePayload) -> Result<SaveReceipt> {
        let body: Value = self.post_json(PURCHASE_INVOICES_ENDPOINT, payload)?;
        let receipt = SaveReceipt::from_json(&body);
        info!(
            invoice_no = payload.invoice_no.as_str(),
            rows = payload.rows.len(),
            "purchase invoice saved"
        );
        Ok(receipt)
    }
}

/// What the server said about a saved document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReceipt {
    pub id: Option<String>,
    pub invoice_no: Option<String>,
    pub message: Option<String>,
}

impl SaveReceipt {
    pub fn from_json(body: &Value) -> Self {
        let object = match body {
            Value::Object(map) => match map.get("data") {
                Some(Value::Object(inner)) => inner,
                _ => map,
            },
            _ => return Self::default(),
        };
        let top = body.as_object();
        let pick = |key: &str| {
            object
                .get(key)
                .or_else(|| top.and_then(|map| map.get(key)))
                .and_then(scalar_text)
                .filter(|text| !text.is_empty())
        };
        Self {
            id: pick("id"),
            invoice_no: pick("invoice_no"),
            message: pick("message"),
        }
    }

    pub fn summary(&self) -> String {
        match (&self.invoice_no, &self.id, &self.message) {
            (_, _, Some(message)) => message.clone(),
            (Some(invoice_no), _, None) => format!("saved invoice {invoice_no}"),
            (None, Some(id), None) => format!("saved invoice #{id}"),
            (None, None, None) => "invoice saved".to_owned(),
        }
    }
}

/// Accepts either a bare JSON array or an object wrapping the array in
/// `data`. Non-object entries are skipped.
pub fn list_items_from_json(body: Value) -> Result<Vec<ListItem>> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            Some(other) => bail!("expected `data` to be an array, got {}", kind_name(&other)),
            None => bail!("expected a JSON array or an object with a `data` array"),
        },
        other => bail!("expected a JSON array, got {}", kind_name(&other)),
    };

    Ok(rows
        .iter()
        .filter_map(Value::as_object)
        .map(list_item_from_object)
        .collect())
}

pub fn list_item_from_object(object: &Map<String, Value>) -> ListItem {
    object
        .iter()
        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- raise [api].timeout or check the server");
    }
    anyhow!("cannot reach {base_url} -- check [api].base_url and that the server is running ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            let text = match map.get(key) {
                Some(Value::String(text)) => Some(text.clone()),
                Some(Value::Object(inner)) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            };
            if let Some(text) = text.filter(|text| !text.is_empty()) {
                return anyhow!("server error ({}): {}", status.as_u16(), text);
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}
