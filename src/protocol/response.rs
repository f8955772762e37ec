// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;

use log::debug;

use crate::config::Config;
use crate::dom;
use crate::fault::Fault;
use crate::value::Value;

/// A `<methodResponse>`: one return value, or a fault.
#[derive(Debug, Clone, Default)]
pub struct Response {
    config: Config,
    value: Option<Value>,
    fault: Option<Fault>,
}

impl Response {
    pub fn new<V: Into<Value>>(value: V) -> Response {
        Response { value: Some(value.into()), ..Response::default() }
    }

    pub fn with_config(config: Config) -> Response {
        Response { config, ..Response::default() }
    }

    pub fn from_fault(fault: Fault) -> Response {
        Response { fault: Some(fault), ..Response::default() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn encoding(&self) -> &str {
        &self.config.encoding
    }

    pub fn set_encoding(&mut self, encoding: &str) -> &mut Response {
        self.config.encoding = encoding.to_string();
        if let Some(ref mut fault) = self.fault {
            fault.set_encoding(encoding);
        }
        self
    }

    pub(crate) fn set_config(&mut self, config: &Config) {
        self.config = config.clone();
        if let Some(ref mut fault) = self.fault {
            fault.set_encoding(&config.encoding);
        }
    }

    pub fn set_return_value<V: Into<Value>>(&mut self, value: V) {
        self.value = Some(value.into());
    }

    /// The return value; `None` for a faulted response.
    pub fn return_value(&self) -> Option<&Value> {
        match self.fault {
            Some(_) => None,
            None => self.value.as_ref(),
        }
    }

    pub fn into_return_value(self) -> Option<Value> {
        match self.fault {
            Some(_) => None,
            None => self.value,
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    fn set_fault(&mut self, code: i32) {
        debug!("response fault {}", code);
        let mut fault = Fault::from_code(code);
        fault.set_encoding(&self.config.encoding);
        self.fault = Some(fault);
    }

    /// Loads a response from raw bytes, which must be UTF-8.
    pub fn load_bytes(&mut self, xml: &[u8]) -> bool {
        match std::str::from_utf8(xml) {
            Ok(xml) => self.load_xml(xml),
            Err(_) => {
                self.set_fault(650);
                false
            }
        }
    }

    /// Loads a `<methodResponse>` document.
    ///
    /// Returns `false` when the document is a fault or cannot be used; in
    /// both cases [`fault`](Response::fault) describes why.
    pub fn load_xml(&mut self, xml: &str) -> bool {
        let root = match dom::parse(xml) {
            Ok(root) => root,
            Err(e) => {
                debug!("unable to parse response: {}", e);
                self.set_fault(651);
                return false;
            }
        };

        if root.child("fault").is_some() {
            let mut fault = Fault::default();
            fault.set_encoding(&self.config.encoding);
            match fault.load_xml(xml) {
                Ok(true) => self.fault = Some(fault),
                Ok(false) => self.set_fault(652),
                Err(e) => {
                    debug!("unusable fault in response: {}", e);
                    self.set_fault(652);
                }
            }
            return false;
        }

        let params = match root.child("params") {
            Some(params) if params.plain_elements().next().is_some() => params,
            _ => {
                self.set_fault(652);
                return false;
            }
        };

        let value = match params.child("param").and_then(|p| p.child("value")) {
            Some(value) => value,
            None => {
                self.set_fault(653);
                return false;
            }
        };
        match Value::from_element(value, &self.config) {
            Ok(value) => {
                self.value = Some(value);
                true
            }
            Err(e) => {
                debug!("invalid value in response: {}", e);
                self.set_fault(653);
                false
            }
        }
    }

    /// The complete `<methodResponse>` document; a faulted response writes
    /// its fault.
    pub fn save_xml(&self) -> String {
        if let Some(ref fault) = self.fault {
            return fault.save_xml_with(&self.config);
        }
        let nil = Value::nil();
        let value = self.value.as_ref().unwrap_or(&nil);
        let mut generator = self.config.generator();
        generator.open_element("methodResponse", None);
        generator.open_element("params", None);
        generator.open_element("param", None);
        value.generate(&mut *generator);
        generator.close_element("param");
        generator.close_element("params");
        generator.close_element("methodResponse");
        generator.flush()
    }
}

impl From<Fault> for Response {
    fn from(fault: Fault) -> Response {
        Response::from_fault(fault)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.save_xml())
    }
}
