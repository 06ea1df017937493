//! HTTP request helper for the database REST endpoints

use crate::error::{RealtimeError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Helper for building and executing HTTP requests
pub(crate) struct FetchBuilder<'a> {
    client: &'a Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl<'a> FetchBuilder<'a> {
    pub(crate) fn new(client: &'a Client, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client,
            url,
            method,
            headers,
            query_params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Ask for a server-sent event stream instead of a JSON document
    pub(crate) fn event_stream(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        self
    }

    pub(crate) fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    fn build(&self) -> RequestBuilder {
        let mut url = self.url.clone();
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }

        let mut req = self
            .client
            .request(self.method.clone(), url)
            .headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }
        req
    }

    /// Execute the request and parse the response as JSON
    pub(crate) async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.execute_raw().await?;
        Ok(response.json::<T>().await?)
    }

    /// Execute the request, discarding any body
    pub(crate) async fn execute_empty(&self) -> Result<()> {
        self.execute_raw().await.map(|_| ())
    }

    /// Execute the request and return the response once its status is a success
    pub(crate) async fn execute_raw(&self) -> Result<reqwest::Response> {
        let response = self.build().send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RealtimeError::RequestFailed { status, message });
        }
        Ok(response)
    }
}
