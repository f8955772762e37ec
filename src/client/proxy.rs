// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use serde::Serialize;

use crate::error::Result;
use crate::value::Value;

use super::{Client, Param};

fn join(namespace: &str, name: &str) -> String {
    format!("{}.{}", namespace, name).trim_start_matches('.').to_string()
}

/// Calls methods under a dotted namespace, as in
/// `client.proxy("math").namespace("int").call("add", …)` for
/// `math.int.add`.
pub struct ServerProxy<'a> {
    client: &'a mut Client,
    namespace: String,
}

impl<'a> ServerProxy<'a> {
    pub(crate) fn new(client: &'a mut Client, namespace: &str) -> ServerProxy<'a> {
        ServerProxy { client, namespace: namespace.trim_start_matches('.').to_string() }
    }

    /// Descends into the child namespace `name`.
    pub fn namespace(self, name: &str) -> ServerProxy<'a> {
        let namespace = join(&self.namespace, name);
        ServerProxy { client: self.client, namespace }
    }

    pub fn path(&self) -> &str {
        &self.namespace
    }

    /// Full name of `method` under this namespace.
    pub fn method_name(&self, method: &str) -> String {
        join(&self.namespace, method)
    }

    pub fn call(&mut self, method: &str, params: Vec<Param>) -> Result<Value> {
        let name = self.method_name(method);
        self.client.call(&name, params)
    }

    pub fn call_native<T: Serialize + ?Sized>(&mut self, method: &str, args: &T) -> Result<Value> {
        let name = self.method_name(method);
        self.client.call_native(&name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let mut client = Client::new("http://localhost/");
        let proxy = client.proxy("");
        assert_eq!("", proxy.path());
        assert_eq!("add", proxy.method_name("add"));
        let proxy = proxy.namespace("math").namespace("int");
        assert_eq!("math.int", proxy.path());
        assert_eq!("math.int.add", proxy.method_name("add"));
    }
}
