// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::dom;
use crate::error::Result;
use crate::fault::Fault;
use crate::value::{to_value_with, Type, Value};

fn method_name() -> &'static Regex {
    static METHOD: OnceLock<Regex> = OnceLock::new();
    METHOD.get_or_init(|| Regex::new(r"(?i)^[a-z0-9_.:\\/]+$").unwrap())
}

/// True for names made of letters, digits and `_.:\/`.
pub(crate) fn is_valid_method_name(name: &str) -> bool {
    method_name().is_match(name)
}

/// A `<methodCall>`: a method name and its typed parameters.
#[derive(Debug, Clone, Default)]
pub struct Request {
    config: Config,
    method: Option<String>,
    params: Vec<Value>,
    types: Vec<Type>,
    fault: Option<Fault>,
    xml: Option<String>,
}

impl Request {
    pub fn new(method: &str) -> Request {
        let mut request = Request::default();
        request.set_method(method);
        request
    }

    pub fn with_config(config: Config) -> Request {
        Request { config, ..Request::default() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn encoding(&self) -> &str {
        &self.config.encoding
    }

    pub fn set_encoding(&mut self, encoding: &str) -> &mut Request {
        self.config.encoding = encoding.to_string();
        if let Some(ref mut fault) = self.fault {
            fault.set_encoding(encoding);
        }
        self
    }

    /// Sets the method name.
    ///
    /// A name outside letters, digits and `_.:\/` is refused: the request
    /// keeps its previous name and records fault 634.
    pub fn set_method(&mut self, method: &str) -> bool {
        if !is_valid_method_name(method) {
            self.set_fault(634, &format!("Invalid method name (\"{}\")", method));
            return false;
        }
        self.method = Some(method.to_string());
        true
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Appends a parameter typed by its own wire type.
    pub fn add_param<V: Into<Value>>(&mut self, value: V) {
        let value = value.into();
        self.types.push(value.get_type());
        self.params.push(value);
    }

    /// Appends `value` converted to `ty`.
    pub fn add_typed(&mut self, value: Value, ty: Type) -> Result<()> {
        let value = value.coerce(ty, &self.config)?;
        self.types.push(ty);
        self.params.push(value);
        Ok(())
    }

    /// Appends any serializable value, with an explicit type or detected
    /// from its shape.
    pub fn add_native<T: Serialize + ?Sized>(&mut self, native: &T, ty: Option<Type>) -> Result<()> {
        let value = to_value_with(native, &self.config)?;
        match ty {
            Some(ty) => self.add_typed(value, ty),
            None => {
                self.add_param(value);
                Ok(())
            }
        }
    }

    /// Replaces all parameters.
    pub fn set_params(&mut self, params: Vec<Value>) {
        self.types = params.iter().map(Value::get_type).collect();
        self.params = params;
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// Wire types of the parameters, as declared when they were added.
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub(crate) fn set_fault(&mut self, code: i32, message: &str) {
        debug!("request fault {}", code);
        let mut fault = Fault::new(code, message);
        fault.set_encoding(&self.config.encoding);
        self.fault = Some(fault);
    }

    /// The document this request was loaded from.
    pub fn raw(&self) -> Option<&str> {
        self.xml.as_deref()
    }

    /// Loads a request from raw bytes, which must be UTF-8.
    pub fn load_bytes(&mut self, xml: &[u8]) -> bool {
        match std::str::from_utf8(xml) {
            Ok(xml) => self.load_xml(xml),
            Err(_) => {
                self.set_fault(635, "");
                false
            }
        }
    }

    /// Loads a `<methodCall>` document; on failure the request carries
    /// the matching fault and `false` is returned.
    pub fn load_xml(&mut self, xml: &str) -> bool {
        let root = match dom::parse(xml) {
            Ok(root) => root,
            Err(e) => {
                debug!("unable to parse request: {}", e);
                self.set_fault(631, "");
                return false;
            }
        };

        let method = match root.child("methodName").map(|m| m.text()) {
            Some(ref name) if !name.is_empty() => name.clone(),
            _ => {
                self.set_fault(632, "");
                return false;
            }
        };
        self.method = Some(method);

        if let Some(params) = root.child("params") {
            let mut values = Vec::new();
            for param in params.plain_elements() {
                let value = match param.child("value") {
                    Some(value) => value,
                    None => {
                        self.set_fault(633, "");
                        return false;
                    }
                };
                match Value::from_element(value, &self.config) {
                    Ok(value) => values.push(value),
                    Err(e) => {
                        debug!("invalid request parameter: {}", e);
                        self.set_fault(636, "");
                        return false;
                    }
                }
            }
            if !values.is_empty() {
                self.set_params(values);
            }
        }

        self.xml = Some(xml.to_string());
        true
    }

    /// The complete `<methodCall>` document.
    pub fn save_xml(&self) -> String {
        let mut generator = self.config.generator();
        generator.open_element("methodCall", None);
        generator.open_element("methodName", Some(self.method.as_deref().unwrap_or("")));
        generator.close_element("methodName");
        if !self.params.is_empty() {
            generator.open_element("params", None);
            for param in &self.params {
                generator.open_element("param", None);
                param.generate(&mut *generator);
                generator.close_element("param");
            }
            generator.close_element("params");
        }
        generator.close_element("methodCall");
        generator.flush()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.save_xml())
    }
}
