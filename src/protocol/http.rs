// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Requests and responses exchanged with a CGI-style web server: the
//! request body arrives on a reader (standard input by default) and the
//! headers in `HTTP_*` environment variables.

use std::io::{self, Read, Write};

use log::debug;

use crate::config::Config;

use super::{Request, Response};

/// Turns an `HTTP_ACCEPT_ENCODING` style key into `Accept-Encoding`.
///
/// Returns `None` for keys without the `HTTP_` prefix.
pub fn normalize_header(key: &str) -> Option<String> {
    let name = key.strip_prefix("HTTP_")?;
    let words: Vec<String> = name
        .split('_')
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    Some(words.join("-"))
}

/// A request read from the body of an HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    request: Request,
    raw: Option<String>,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Reads and loads the request body from `reader`.
    ///
    /// A failed read or an empty body leaves fault 630 on the request.
    pub fn from_reader<R: Read>(mut reader: R, config: &Config) -> HttpRequest {
        let mut request = Request::with_config(config.clone());
        let mut body = Vec::new();
        let raw = match reader.read_to_end(&mut body) {
            Ok(_) if !body.is_empty() => {
                request.load_bytes(&body);
                Some(String::from_utf8_lossy(&body).into_owned())
            }
            Ok(_) => {
                request.set_fault(630, "");
                None
            }
            Err(e) => {
                debug!("unable to read request body: {}", e);
                request.set_fault(630, "");
                None
            }
        };
        HttpRequest { request, raw, headers: Vec::new() }
    }

    /// Reads the request body from standard input, with headers taken from
    /// the process environment.
    pub fn from_stdin(config: &Config) -> HttpRequest {
        HttpRequest::from_reader(io::stdin().lock(), config).with_environment(std::env::vars())
    }

    /// Takes the headers from `HTTP_*` entries of `vars`.
    pub fn with_environment<I: IntoIterator<Item = (String, String)>>(mut self, vars: I) -> HttpRequest {
        let mut headers: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| normalize_header(&key).map(|name| (name, value)))
            .collect();
        headers.sort();
        self.headers = headers;
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// The request body as received.
    pub fn raw_request(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.0.eq_ignore_ascii_case(name))
            .map(|h| h.1.as_str())
    }

    /// Headers, one `Name: value` per line, followed by the body.
    pub fn full_request(&self) -> String {
        let mut out = String::new();
        for &(ref name, ref value) in &self.headers {
            out.push_str(&format!("{}: {}\n", name, value));
        }
        if let Some(ref raw) = self.raw {
            out.push_str(raw);
        }
        out
    }
}

/// A response written back through a CGI-style web server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    response: Response,
    headers_sent: bool,
}

impl HttpResponse {
    pub fn new(response: Response) -> HttpResponse {
        HttpResponse { response, headers_sent: false }
    }

    /// Marks the headers as already written, so only the body follows.
    pub fn headers_sent(mut self, sent: bool) -> HttpResponse {
        self.headers_sent = sent;
        self
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn content_type(&self) -> String {
        format!("text/xml; charset={}", self.response.encoding().to_ascii_lowercase())
    }

    /// Writes the `Content-Type` header (unless already sent), a blank
    /// line and the document.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        if !self.headers_sent {
            write!(writer, "Content-Type: {}\r\n\r\n", self.content_type())?;
        }
        writer.write_all(self.response.save_xml().as_bytes())?;
        writer.flush()
    }
}
