// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::value::{Data, Value};

use super::{Client, Param};

/// One call shape reported by a remote `system.methodSignature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub return_type: String,
    pub parameters: Vec<String>,
}

impl Signature {
    /// Reads either a `{returnType, parameters}` struct or the classic
    /// `[returnType, param…]` array of type names.
    fn from_value(value: &Value) -> Option<Signature> {
        let names = |items: &[Value]| -> Vec<String> {
            items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        };
        match *value.data() {
            Data::Struct(_) => {
                let parameters = value.get("parameters").and_then(Value::as_array).map(names)?;
                let return_type = value
                    .get("returnType")
                    .and_then(Value::as_str)
                    .unwrap_or("void")
                    .to_string();
                Some(Signature { return_type, parameters })
            }
            Data::Array(ref items) => {
                let mut all = names(items);
                if all.is_empty() {
                    return None;
                }
                let return_type = all.remove(0);
                Some(Signature { return_type, parameters: all })
            }
            _ => None,
        }
    }
}

fn signatures_of(method: &str, value: &Value) -> Result<Vec<Signature>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::Introspect(format!("Invalid signature for method \"{}\"", method)))?;
    let mut signatures = Vec::with_capacity(items.len());
    for item in items {
        match Signature::from_value(item) {
            Some(signature) => signatures.push(signature),
            None => trace!("ignoring unusable signature for {}: {:?}", method, item),
        }
    }
    Ok(signatures)
}

/// The `system.*` introspection methods of a remote server.
pub struct Introspector<'a> {
    client: &'a mut Client,
}

impl<'a> Introspector<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Introspector<'a> {
        Introspector { client }
    }

    pub fn list_methods(&mut self) -> Result<Vec<String>> {
        let value = self.client.call("system.listMethods", Vec::new())?;
        let names = value
            .as_array()
            .ok_or_else(|| Error::Introspect("system.listMethods did not return an array".to_string()))?;
        Ok(names.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    }

    pub fn get_method_signature(&mut self, method: &str) -> Result<Vec<Signature>> {
        let value = self
            .client
            .call("system.methodSignature", vec![Param::from(Value::text(method))])?;
        signatures_of(method, &value)
    }

    /// Signatures of every method, one `system.methodSignature` call each.
    pub fn signatures_by_loop(&mut self, methods: &[String]) -> Result<BTreeMap<String, Vec<Signature>>> {
        let mut signatures = BTreeMap::new();
        for method in methods {
            let signature = self.get_method_signature(method)?;
            signatures.insert(method.clone(), signature);
        }
        Ok(signatures)
    }

    /// Signatures of every method in a single `system.multicall`.
    pub fn signatures_by_multicall(&mut self, methods: &[String]) -> Result<BTreeMap<String, Vec<Signature>>> {
        let calls: Vec<Value> = methods
            .iter()
            .map(|method| {
                Value::structure(vec![
                    ("methodName", Value::text("system.methodSignature")),
                    ("params", Value::array(vec![Value::text(method.as_str())])),
                ])
            })
            .collect();
        let returned = self
            .client
            .call("system.multicall", vec![Param::from(Value::array(calls))])?;

        let results = returned.as_array().ok_or_else(|| {
            Error::Introspect(format!(
                "Multicall return is malformed.  Expected array, got {}",
                returned.get_type()
            ))
        })?;
        if results.len() != methods.len() {
            return Err(Error::Introspect("Bad number of signatures received from multicall".to_string()));
        }

        let mut signatures = BTreeMap::new();
        for (method, result) in methods.iter().zip(results) {
            signatures.insert(method.clone(), signatures_of(method, result)?);
        }
        Ok(signatures)
    }

    /// Signatures of every listed method, by multicall when the server
    /// supports it and one call per method otherwise.
    pub fn signatures_for_each_method(&mut self) -> Result<BTreeMap<String, Vec<Signature>>> {
        let methods = self.list_methods()?;
        let signatures = match self.signatures_by_multicall(&methods) {
            Ok(signatures) => signatures,
            Err(Error::Fault { code, message }) => {
                debug!("multicall unavailable ({}: {}), looping instead", code, message);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        if signatures.is_empty() {
            return self.signatures_by_loop(&methods);
        }
        Ok(signatures)
    }
}
