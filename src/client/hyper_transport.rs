// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use log::trace;

use crate::error::{Error, Result};

use super::transport::{replace_header, HttpReply, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Plain HTTP transport on `hyper`; each post runs to completion on a
/// private current-thread runtime.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    uri: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl Default for HyperTransport {
    fn default() -> HyperTransport {
        HyperTransport::new()
    }
}

impl HyperTransport {
    pub fn new() -> HyperTransport {
        HyperTransport { uri: None, headers: Vec::new(), timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> HyperTransport {
        self.timeout = timeout;
        self
    }

    async fn send(&self, uri: &str, body: String) -> Result<HttpReply> {
        let mut builder = hyper::Request::builder().method("POST").uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| Error::Transport(format!("Failed to build request: {}", e)))?;

        let client = HttpClient::builder(TokioExecutor::new()).build_http();
        let response = tokio::time::timeout(self.timeout, client.request(request))
            .await
            .map_err(|_| Error::Transport(format!("No response after {:?}", self.timeout)))?
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        trace!("HTTP status: {}", status);
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body: body.to_vec(),
        })
    }
}

impl Transport for HyperTransport {
    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn set_uri(&mut self, uri: &str) {
        self.uri = Some(uri.to_string());
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn set_header(&mut self, name: &str, value: &str) {
        replace_header(&mut self.headers, name, value);
    }

    fn post(&mut self, body: &str) -> Result<HttpReply> {
        let uri = self
            .uri
            .clone()
            .ok_or_else(|| Error::Transport("No URI to post to".to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.send(&uri, body.to_string()))
    }
}
