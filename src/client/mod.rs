// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Calling remote methods.

use log::{debug, trace};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fault::Fault;
use crate::protocol::{Request, Response};
use crate::value::{to_value, to_value_with, Data, Type, Value};

mod hyper_transport;
mod introspect;
mod proxy;
mod transport;

pub use self::hyper_transport::HyperTransport;
pub use self::introspect::{Introspector, Signature};
pub use self::proxy::ServerProxy;
pub use self::transport::{HttpReply, Transport};
pub(crate) use self::transport::replace_header;

const USER_AGENT: &str = "rust-xmlrpc";

/// Types a remote signature may impose on a native parameter.
const SIGNATURE_TYPES: [Type; 10] = [
    Type::Array,
    Type::Base64,
    Type::Boolean,
    Type::DateTime,
    Type::Double,
    Type::I4,
    Type::Int,
    Type::Nil,
    Type::String,
    Type::Struct,
];

/// A call parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A plain value whose wire type may be taken from the remote
    /// signature, so an empty list can still go out as a struct.
    Native(Value),
    /// A value sent exactly as given.
    Typed(Value),
}

impl Param {
    pub fn native<T: Serialize + ?Sized>(value: &T) -> Result<Param> {
        to_value(value).map(Param::Native)
    }

    pub fn value(&self) -> &Value {
        match *self {
            Param::Native(ref v) | Param::Typed(ref v) => v,
        }
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Param {
        Param::Typed(value)
    }
}

/// The type a native parameter at `index` is sent as, given the remote
/// signatures of the method.
///
/// With a single signature its declared type is used. With overloads the
/// detected type is kept: the lookup only notes which signature agrees.
fn signature_type(signatures: &[Signature], index: usize, value: &Value) -> Option<Type> {
    let name = if signatures.len() > 1 {
        let detected = value.get_type();
        if let Some(n) = signatures
            .iter()
            .position(|s| s.parameters.get(index).map(String::as_str) == Some(detected.as_str()))
        {
            trace!("parameter {} agrees with signature {}", index, n);
        }
        detected.as_str().to_string()
    } else {
        signatures.first()?.parameters.get(index)?.clone()
    };
    Type::from_name(&name).filter(|ty| SIGNATURE_TYPES.contains(ty))
}

pub struct Client {
    server: String,
    transport: Box<dyn Transport>,
    config: Config,
    skip_system_lookup: bool,
    last_request: Option<Request>,
    last_response: Option<Response>,
}

impl Client {
    /// A client for `server` over the default HTTP transport.
    pub fn new(server: &str) -> Client {
        Client::with_transport(server, Box::new(HyperTransport::new()))
    }

    pub fn with_transport(server: &str, transport: Box<dyn Transport>) -> Client {
        Client {
            server: server.to_string(),
            transport,
            config: Config::default(),
            skip_system_lookup: false,
            last_request: None,
            last_response: None,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    pub fn transport(&self) -> &dyn Transport {
        &*self.transport
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        &mut *self.transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Sends parameters without asking the server for method signatures.
    pub fn set_skip_system_lookup(&mut self, skip: bool) -> &mut Client {
        self.skip_system_lookup = skip;
        self
    }

    pub fn skip_system_lookup(&self) -> bool {
        self.skip_system_lookup
    }

    pub fn last_request(&self) -> Option<&Request> {
        self.last_request.as_ref()
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    pub fn introspector(&mut self) -> Introspector<'_> {
        Introspector::new(self)
    }

    pub fn proxy(&mut self, namespace: &str) -> ServerProxy<'_> {
        ServerProxy::new(self, namespace)
    }

    /// Posts `request` and loads the reply into [`last_response`](Client::last_response).
    ///
    /// Fails on transport errors and non-success HTTP statuses only; a
    /// fault in the reply is left on the response.
    pub fn do_request(&mut self, request: Request) -> Result<&Response> {
        if self.transport.uri().is_none() {
            self.transport.set_uri(&self.server);
        }
        if !self.transport.has_header("Content-Type") {
            self.transport.set_header("Content-Type", "text/xml; charset=utf-8");
        }
        if !self.transport.has_header("Accept") {
            self.transport.set_header("Accept", "text/xml");
        }
        if !self.transport.has_header("User-Agent") {
            self.transport.set_header("User-Agent", USER_AGENT);
        }

        let body = request.save_xml();
        debug!("Send XMLRPC request to: {}", self.transport.uri().unwrap_or(&self.server));
        trace!("XMLRPC body: {}", body);
        self.last_request = Some(request);

        let reply = self.transport.post(&body)?;
        trace!("Response body: {}", String::from_utf8_lossy(&reply.body));
        if !reply.is_success() {
            return Err(Error::Http { status: reply.status, reason: reply.reason });
        }

        let mut response = Response::with_config(self.config.clone());
        response.load_bytes(reply.body.trim_ascii());
        Ok(&*self.last_response.insert(response))
    }

    /// Calls `method` and returns its result.
    ///
    /// Unless the lookup is skipped or the method is itself a `system.*`
    /// method, the remote signature decides the wire type of each
    /// [`Param::Native`]; when the server cannot describe the method the
    /// detected types are used.
    pub fn call(&mut self, method: &str, params: Vec<Param>) -> Result<Value> {
        let signatures = if !self.skip_system_lookup && !method.starts_with("system.") {
            match self.introspector().get_method_signature(method) {
                Ok(signatures) => signatures,
                Err(e) => {
                    debug!("no signature for {}: {}", method, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut request = Request::with_config(self.config.clone());
        if !request.set_method(method) {
            let fault = request.fault().cloned().unwrap_or_else(|| Fault::from_code(634));
            return Err(fault.into());
        }
        for (index, param) in params.into_iter().enumerate() {
            match param {
                Param::Typed(value) => request.add_param(value),
                Param::Native(value) => match signature_type(&signatures, index, &value) {
                    Some(ty) => request.add_typed(value, ty)?,
                    None => request.add_param(value),
                },
            }
        }

        let response = self.do_request(request)?;
        if let Some(fault) = response.fault() {
            return Err(Error::Fault { code: fault.code(), message: fault.message().to_string() });
        }
        Ok(response.return_value().cloned().unwrap_or_else(Value::nil))
    }

    /// Calls `method` with the elements of `args` as native parameters.
    ///
    /// `args` is usually a tuple; `()` sends no parameters and any other
    /// non-sequence value is sent as the only parameter.
    pub fn call_native<T: Serialize + ?Sized>(&mut self, method: &str, args: &T) -> Result<Value> {
        let args = to_value_with(args, &self.config)?;
        let params = match *args.data() {
            Data::Array(ref items) => items.iter().cloned().map(Param::Native).collect(),
            Data::Nil => Vec::new(),
            _ => vec![Param::Native(args)],
        };
        self.call(method, params)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Answers posts from a script and records what was sent.
    struct Scripted {
        uri: Option<String>,
        headers: Vec<(String, String)>,
        replies: Rc<RefCell<Vec<HttpReply>>>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl Transport for Scripted {
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
            self.sent.borrow_mut().push(body.to_string());
            let mut replies = self.replies.borrow_mut();
            if replies.is_empty() {
                return Err(Error::Transport("script exhausted".to_string()));
            }
            Ok(replies.remove(0))
        }
    }

    fn scripted(replies: Vec<HttpReply>) -> (Client, Rc<RefCell<Vec<String>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let transport = Scripted {
            uri: None,
            headers: Vec::new(),
            replies: Rc::new(RefCell::new(replies)),
            sent: sent.clone(),
        };
        (Client::with_transport("http://example.com/RPC2", Box::new(transport)), sent)
    }

    fn reply_with(value: Value) -> HttpReply {
        HttpReply::ok(&Response::new(value).save_xml())
    }

    fn fault_reply(code: i32, message: &str) -> HttpReply {
        HttpReply::ok(&Fault::new(code, message).save_xml())
    }

    #[test]
    fn test_call_sets_defaults() {
        let (mut client, sent) = scripted(vec![reply_with(Value::integer(7))]);
        client.set_skip_system_lookup(true);
        let result = client.call_native("foo.bar", &(1, "x")).unwrap();
        assert_eq!(Value::integer(7), result);
        assert_eq!(Some("http://example.com/RPC2"), client.transport().uri());
        assert!(client.transport().has_header("user-agent"));
        assert!(client.transport().has_header("Content-Type"));
        assert_eq!(1, sent.borrow().len());
        assert_eq!(&[Type::Int, Type::String], client.last_request().unwrap().types());
    }

    #[test]
    fn test_signature_types_native_params() {
        let signature = Value::array(vec![Value::structure(vec![
            ("returnType", Value::text("int")),
            ("parameters", Value::from(vec!["struct", "string"])),
        ])]);
        let (mut client, _) = scripted(vec![reply_with(signature), reply_with(Value::integer(1))]);
        client
            .call(
                "foo.bar",
                vec![Param::native(&Vec::<i32>::new()).unwrap(), Param::native("x").unwrap()],
            )
            .unwrap();
        assert_eq!(&[Type::Struct, Type::String], client.last_request().unwrap().types());
    }

    #[test]
    fn test_overloads_keep_detected_types() {
        let signature = Value::array(vec![
            Value::from(vec!["int", "struct"]),
            Value::from(vec!["int", "array"]),
        ]);
        let (mut client, _) = scripted(vec![reply_with(signature), reply_with(Value::integer(1))]);
        client
            .call("foo.bar", vec![Param::native(&Vec::<i32>::new()).unwrap()])
            .unwrap();
        assert_eq!(&[Type::Array], client.last_request().unwrap().types());
    }

    #[test]
    fn test_failed_lookup_is_ignored() {
        let (mut client, sent) = scripted(vec![
            fault_reply(620, "Method \"system.methodSignature\" does not exist"),
            reply_with(Value::boolean(true)),
        ]);
        let result = client.call("foo.bar", vec![Param::native(&5).unwrap()]).unwrap();
        assert_eq!(Some(true), result.as_bool());
        assert_eq!(2, sent.borrow().len());
        assert!(sent.borrow()[0].contains("system.methodSignature"));
    }

    #[test]
    fn test_typed_params_pass_through() {
        let signature = Value::array(vec![Value::from(vec!["int", "string"])]);
        let (mut client, _) = scripted(vec![reply_with(signature), reply_with(Value::nil())]);
        client.call("foo.bar", vec![Param::from(Value::integer(3))]).unwrap();
        assert_eq!(&[Type::Int], client.last_request().unwrap().types());
    }

    #[test]
    fn test_http_error() {
        let reply = HttpReply { status: 404, reason: "Not Found".to_string(), body: Vec::new() };
        let (mut client, _) = scripted(vec![reply]);
        client.set_skip_system_lookup(true);
        match client.call("foo.bar", Vec::new()) {
            Err(Error::Http { status, reason }) => {
                assert_eq!(404, status);
                assert_eq!("Not Found", reason);
            }
            other => panic!("expected an HTTP error, got {:?}", other),
        }
    }

    #[test]
    fn test_fault_error() {
        let (mut client, _) = scripted(vec![fault_reply(1000, "Error string")]);
        client.set_skip_system_lookup(true);
        match client.call("foo.bar", Vec::new()) {
            Err(Error::Fault { code, message }) => {
                assert_eq!(1000, code);
                assert_eq!("Error string", message);
            }
            other => panic!("expected a fault, got {:?}", other),
        }
        assert!(client.last_response().unwrap().is_fault());
    }

    #[test]
    fn test_reply_body_is_trimmed() {
        let body = format!("\n\n  {}  \n", Response::new(Value::text("ok")).save_xml());
        let (mut client, _) = scripted(vec![HttpReply::ok(&body)]);
        client.set_skip_system_lookup(true);
        assert_eq!(Value::text("ok"), client.call("foo.bar", Vec::new()).unwrap());
    }

    #[test]
    fn test_multicall_introspection() {
        let methods = Value::from(vec!["a", "b"]);
        let signatures = Value::array(vec![
            Value::array(vec![Value::from(vec!["int", "int"])]),
            Value::array(vec![Value::from(vec!["string"])]),
        ]);
        let (mut client, sent) = scripted(vec![reply_with(methods), reply_with(signatures)]);
        let all = client.introspector().signatures_for_each_method().unwrap();
        assert_eq!(vec!["int".to_string()], all["a"][0].parameters);
        assert!(all["b"][0].parameters.is_empty());
        assert_eq!(2, sent.borrow().len());
    }

    #[test]
    fn test_multicall_falls_back_to_loop() {
        let (mut client, sent) = scripted(vec![
            reply_with(Value::from(vec!["a"])),
            fault_reply(620, "Method \"system.multicall\" does not exist"),
            reply_with(Value::array(vec![Value::from(vec!["nil"])])),
        ]);
        let all = client.introspector().signatures_for_each_method().unwrap();
        assert_eq!("nil", all["a"][0].return_type);
        assert_eq!(3, sent.borrow().len());
    }

    #[test]
    fn test_malformed_multicall() {
        let (mut client, _) = scripted(vec![reply_with(Value::text("oops"))]);
        let err = client
            .introspector()
            .signatures_by_multicall(&["a".to_string()])
            .unwrap_err();
        assert_eq!("Multicall return is malformed.  Expected array, got string", err.to_string());

        let (mut client, _) = scripted(vec![reply_with(Value::array(vec![]))]);
        let err = client
            .introspector()
            .signatures_by_multicall(&["a".to_string()])
            .unwrap_err();
        assert_eq!("Bad number of signatures received from multicall", err.to_string());
    }
}
