// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::sync::Arc;

use log::trace;

use crate::client::{replace_header, HttpReply, Transport};
use crate::error::Result;

use super::Server;

/// Hands posted requests straight to an in-process [`Server`].
pub struct LocalTransport {
    server: Arc<Server>,
    uri: Option<String>,
    headers: Vec<(String, String)>,
}

impl LocalTransport {
    pub fn new(server: Arc<Server>) -> LocalTransport {
        LocalTransport { server, uri: None, headers: Vec::new() }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }
}

impl Transport for LocalTransport {
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
        let response = self.server.handle_xml(body).save_xml();
        trace!("local reply: {}", response);
        Ok(HttpReply::ok(&response))
    }
}
