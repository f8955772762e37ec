// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use crate::error::Result;

/// What came back from one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn ok(body: &str) -> HttpReply {
        HttpReply { status: 200, reason: "OK".to_string(), body: body.as_bytes().to_vec() }
    }

    /// 2xx and 3xx statuses count as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// The HTTP client a [`Client`](super::Client) posts its requests through.
pub trait Transport {
    fn uri(&self) -> Option<&str>;

    fn set_uri(&mut self, uri: &str);

    fn headers(&self) -> &[(String, String)];

    /// Sets `name`, replacing any value it already has.
    fn set_header(&mut self, name: &str, value: &str);

    fn has_header(&self, name: &str) -> bool {
        self.headers().iter().any(|h| h.0.eq_ignore_ascii_case(name))
    }

    /// POSTs `body` to the current URI.
    fn post(&mut self, body: &str) -> Result<HttpReply>;
}

/// Header storage shared by the transports.
pub(crate) fn replace_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|h| !h.0.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}
