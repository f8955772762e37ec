// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Answering XML-RPC requests.
//!
//! A [`Server`] holds a dispatch table of [`Method`]s. Each incoming
//! request is matched by name, then by the wire types of its parameters
//! against the method's prototypes, before its handler runs. Handler
//! errors come back to the caller as faults, filtered through the
//! server's [`FaultRegistry`].

use std::io::{Read, Write};
use std::sync::Arc;

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fault::Fault;
use crate::protocol::{is_valid_method_name, HttpRequest, HttpResponse, Request, Response};
use crate::value::{Type, Value};

mod definition;
mod fault;
mod local;
mod system;

pub use self::definition::{fix_type, Definition, Handler, Method, Prototype, Service};
pub use self::fault::{FaultObserver, FaultRegistry, MethodError, LIBRARY_KIND, SERVER_KIND};
pub use self::local::LocalTransport;

use self::definition::Callback;

fn join(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

pub struct Server {
    table: Definition,
    config: Config,
    send_arguments_to_all_methods: bool,
    faults: Arc<FaultRegistry>,
}

impl Default for Server {
    fn default() -> Server {
        Server::new()
    }
}

impl Server {
    /// A server knowing only the `system.*` methods.
    pub fn new() -> Server {
        let mut server = Server {
            table: Definition::new(),
            config: Config::default(),
            send_arguments_to_all_methods: true,
            faults: Arc::new(FaultRegistry::new()),
        };
        server.register_system_methods();
        server
    }

    pub fn with_config(config: Config) -> Server {
        let mut server = Server::new();
        server.config = config;
        server
    }

    fn register_system_methods(&mut self) {
        for method in system::methods() {
            self.table.add_method(method);
        }
    }

    /// Registers a function under `namespace`.
    ///
    /// The method must carry a handler and a valid name. Without any
    /// prototype it is callable with no parameters only.
    pub fn add_function(&mut self, method: Method, namespace: &str) -> Result<()> {
        let name = join(namespace, method.name());
        let callable = matches!(method.callback, Some(Callback::Function(_)));
        if !callable || !is_valid_method_name(&name) {
            return Err(Error::Server { code: 611, message: "Unable to attach function; invalid".to_string() });
        }
        let method = if method.prototypes().is_empty() {
            method.prototype("void", &[])
        } else {
            method
        };
        debug!("registering function {}", name);
        self.table.add_method(method.renamed(name));
        Ok(())
    }

    /// Registers every method of `service` under `namespace`, with `args`
    /// bound to each of them.
    pub fn set_class(&mut self, service: Arc<dyn Service>, namespace: &str, args: Vec<Value>) -> Result<()> {
        let methods = service.methods();
        if methods.is_empty() {
            return Err(Error::Server { code: 610, message: "Invalid method class".to_string() });
        }
        for method in methods {
            let name = join(namespace, method.name());
            let mut method = method.invoke_args(args.clone());
            method.callback = Some(Callback::Service {
                service: service.clone(),
                method: method.name().to_string(),
            });
            debug!("registering service method {}", name);
            self.table.add_method(method.renamed(name));
        }
        Ok(())
    }

    /// Adds `method` to the table as it is, with or without a handler.
    pub fn add_method(&mut self, method: Method) {
        self.table.add_method(method);
    }

    /// The fault for `message` and `code`, as the registry translates it.
    pub fn fault(&self, message: &str, code: i32) -> Fault {
        let message = if message.is_empty() { "Unknown Error" } else { message };
        self.faults.translate(&MethodError::server(code, message))
    }

    /// Answers `request`, with a fault when it cannot be served.
    pub fn handle(&self, request: &Request) -> Response {
        let mut response = match request.fault() {
            Some(fault) => Response::from_fault(fault.clone()),
            None => match self.handle_request(request) {
                Ok(response) => response,
                Err(e) => Response::from_fault(self.faults.translate(&e)),
            },
        };
        response.set_config(&self.config);
        response
    }

    /// Parses and answers a `<methodCall>` document.
    pub fn handle_xml(&self, xml: &str) -> Response {
        let mut request = Request::with_config(self.config.clone());
        request.load_xml(xml);
        self.handle(&request)
    }

    /// Answers one CGI-style exchange: the request body is read from
    /// `reader`, the headers and response body are written to `writer`.
    pub fn handle_http<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<Response> {
        let request = HttpRequest::from_reader(reader, &self.config);
        let response = self.handle(request.request());
        let http = HttpResponse::new(response);
        http.write_to(writer)?;
        Ok(http.response().clone())
    }

    fn handle_request(&self, request: &Request) -> std::result::Result<Response, MethodError> {
        let name = request.method().unwrap_or("");
        let method = self
            .table
            .get(name)
            .ok_or_else(|| MethodError::server(620, &format!("Method \"{}\" does not exist", name)))?;

        let mut params = request.params().to_vec();
        if self.send_arguments_to_all_methods {
            params.extend_from_slice(method.get_invoke_args());
        }

        let mut called: Vec<Type> = request.types().to_vec();
        for param in params.iter().skip(called.len()) {
            called.push(param.get_type());
        }
        if !method.prototypes().iter().any(|p| p.matches(&called)) {
            return Err(MethodError::server(623, "Calling parameters do not match signature"));
        }

        debug!("dispatching {} with {} parameter(s)", name, params.len());
        let value = self.dispatch(method, &params)?;
        let mut response = Response::with_config(self.config.clone());
        response.set_return_value(value);
        Ok(response)
    }

    fn dispatch(&self, method: &Method, params: &[Value]) -> std::result::Result<Value, MethodError> {
        match method.callback {
            None => Err(MethodError::server(
                622,
                &format!("Method missing implementation {}", method.name()),
            )),
            Some(Callback::Function(ref handler)) => handler(params),
            Some(Callback::Service { ref service, method: ref local }) => {
                service.prepare(method.get_invoke_args()).map_err(|e| {
                    MethodError::server(
                        621,
                        &format!("Error instantiating class to invoke method {} ({})", method.name(), e.message()),
                    )
                })?;
                service.call(local, params)
            }
            Some(Callback::System(ref system)) => system::call(self, system, params),
        }
    }

    pub fn list_methods(&self) -> Vec<String> {
        self.table.names()
    }

    pub fn dispatch_table(&self) -> &Definition {
        &self.table
    }

    /// A copy of the dispatch table, for [`load_functions`](Server::load_functions).
    pub fn get_functions(&self) -> Definition {
        self.table.clone()
    }

    /// Replaces the table with `definition`. The `system.*` methods are
    /// registered afresh rather than taken from it.
    pub fn load_functions(&mut self, definition: Definition) {
        self.table.clear();
        self.register_system_methods();
        for method in definition {
            if method.name().starts_with("system.") {
                continue;
            }
            self.table.add_method(method);
        }
    }

    /// Whether bound arguments are appended to the call parameters (the
    /// default) or only handed to [`Service::prepare`].
    pub fn send_arguments_to_all_methods(&self) -> bool {
        self.send_arguments_to_all_methods
    }

    pub fn set_send_arguments_to_all_methods(&mut self, flag: bool) -> &mut Server {
        self.send_arguments_to_all_methods = flag;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn encoding(&self) -> &str {
        &self.config.encoding
    }

    pub fn set_encoding(&mut self, encoding: &str) -> &mut Server {
        self.config.encoding = encoding.to_string();
        self
    }

    pub fn fault_registry(&self) -> &Arc<FaultRegistry> {
        &self.faults
    }

    pub fn set_fault_registry(&mut self, registry: Arc<FaultRegistry>) {
        self.faults = registry;
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    fn add() -> Method {
        Method::new("add")
            .help("Adds two integers")
            .prototype("int", &["int", "int"])
            .handler(|params| {
                let sum: i64 = params.iter().filter_map(Value::as_i64).sum();
                Ok(Value::integer(sum))
            })
    }

    fn request(method: &str, params: Vec<Value>) -> Request {
        let mut request = Request::new(method);
        for param in params {
            request.add_param(param);
        }
        request
    }

    struct Counter {
        prepared: Mutex<Vec<Vec<Value>>>,
        fail: bool,
    }

    impl Service for Counter {
        fn methods(&self) -> Vec<Method> {
            vec![
                Method::new("next").prototype("int", &[]),
                Method::new("reset").prototype("void", &["int"]),
            ]
        }

        fn prepare(&self, args: &[Value]) -> std::result::Result<(), MethodError> {
            if self.fail {
                return Err(MethodError::server(1, "no store"));
            }
            self.prepared.lock().push(args.to_vec());
            Ok(())
        }

        fn call(&self, method: &str, params: &[Value]) -> std::result::Result<Value, MethodError> {
            Ok(Value::from(vec![Value::text(method), Value::integer(params.len() as i64)]))
        }
    }

    #[test]
    fn test_system_methods_registered() {
        let server = Server::new();
        assert_eq!(
            vec!["system.listMethods", "system.methodHelp", "system.methodSignature", "system.multicall"],
            server.list_methods()
        );
    }

    #[test]
    fn test_add_function() {
        let mut server = Server::new();
        server.add_function(add(), "math").unwrap();
        assert!(server.dispatch_table().has("math.add"));

        let response = server.handle(&request("math.add", vec![Value::integer(2), Value::integer(3)]));
        assert_eq!(Some(&Value::integer(5)), response.return_value());
    }

    #[test]
    fn test_add_function_invalid() {
        let mut server = Server::new();
        let err = server.add_function(Method::new("add"), "").unwrap_err();
        assert_eq!(Some(611), err.code());
        let err = server.add_function(add(), "bad ns").unwrap_err();
        assert_eq!(Some(611), err.code());
    }

    #[test]
    fn test_unknown_method() {
        let response = Server::new().handle(&request("foo.bar", vec![]));
        let fault = response.fault().unwrap();
        assert_eq!(620, fault.code());
        assert_eq!("Method \"foo.bar\" does not exist", fault.message());
    }

    #[test]
    fn test_faulted_request_short_circuits() {
        let mut request = Request::default();
        request.load_xml("<methodCall><params/></methodCall>");
        let response = Server::new().handle(&request);
        assert_eq!(632, response.fault().unwrap().code());
    }

    #[test]
    fn test_signature_mismatch() {
        let mut server = Server::new();
        server.add_function(add(), "").unwrap();
        let response = server.handle(&request("add", vec![Value::integer(2), Value::text("3")]));
        assert_eq!(623, response.fault().unwrap().code());
    }

    #[test]
    fn test_missing_implementation() {
        let mut server = Server::new();
        server.add_method(Method::new("ghost").prototype("void", &[]));
        let response = server.handle(&request("ghost", vec![]));
        assert_eq!(622, response.fault().unwrap().code());
    }

    #[test]
    fn test_handler_error_uses_registry() {
        let mut server = Server::new();
        server
            .add_function(
                Method::new("leak").handler(|_| Err(MethodError::new("app.db", 77, "connection string"))),
                "",
            )
            .unwrap();
        let fault = server.handle(&request("leak", vec![])).fault().cloned().unwrap();
        assert_eq!(404, fault.code());

        server.fault_registry().attach_fault_kind("app");
        let fault = server.handle(&request("leak", vec![])).fault().cloned().unwrap();
        assert_eq!(77, fault.code());
        assert_eq!("connection string", fault.message());
    }

    #[test]
    fn test_service_bound_arguments() {
        let counter = Arc::new(Counter { prepared: Mutex::new(Vec::new()), fail: false });
        let mut server = Server::new();
        server.set_class(counter.clone(), "counter", vec![Value::integer(9)]).unwrap();

        // bound argument appended: next() is called as next(int)
        let response = server.handle(&request("counter.next", vec![]));
        assert_eq!(623, response.fault().unwrap().code());
        let response = server.handle(&request("counter.reset", vec![]));
        assert_eq!(
            Some(&Value::from(vec![Value::text("reset"), Value::integer(1)])),
            response.return_value()
        );

        server.set_send_arguments_to_all_methods(false);
        let response = server.handle(&request("counter.next", vec![]));
        assert_eq!(
            Some(&Value::from(vec![Value::text("next"), Value::integer(0)])),
            response.return_value()
        );
        assert_eq!(vec![Value::integer(9)], counter.prepared.lock()[0]);
    }

    #[test]
    fn test_service_prepare_failure() {
        let mut server = Server::new();
        let counter = Arc::new(Counter { prepared: Mutex::new(Vec::new()), fail: true });
        server.set_class(counter, "", Vec::new()).unwrap();
        let response = server.handle(&request("next", vec![]));
        let fault = response.fault().unwrap();
        assert_eq!(621, fault.code());
        assert_eq!("Error instantiating class to invoke method next (no store)", fault.message());
    }

    #[test]
    fn test_set_class_without_methods() {
        struct Empty;
        impl Service for Empty {
            fn methods(&self) -> Vec<Method> {
                Vec::new()
            }
            fn call(&self, _: &str, _: &[Value]) -> std::result::Result<Value, MethodError> {
                Ok(Value::nil())
            }
        }
        let err = Server::new().set_class(Arc::new(Empty), "", Vec::new()).unwrap_err();
        assert_eq!(Some(610), err.code());
    }

    #[test]
    fn test_fault_helper() {
        let server = Server::new();
        let fault = server.fault("", 404);
        assert_eq!("Unknown Error", fault.message());
        assert_eq!(611, server.fault("nope", 611).code());
    }

    #[test]
    fn test_load_functions() {
        let mut source = Server::new();
        source.add_function(add(), "").unwrap();
        let mut target = Server::new();
        target.load_functions(source.get_functions());
        assert_eq!(5, target.list_methods().len());
        assert!(target.dispatch_table().has("add"));
    }

    #[test]
    fn test_method_help_and_signature() {
        let mut server = Server::new();
        server.add_function(add(), "").unwrap();

        let response = server.handle(&request("system.methodHelp", vec![Value::text("add")]));
        assert_eq!(Some("Adds two integers"), response.return_value().and_then(Value::as_str));

        let response = server.handle(&request("system.methodSignature", vec![Value::text("add")]));
        let signatures = response.return_value().and_then(Value::as_array).unwrap();
        assert_eq!(Some(&Value::from(vec!["int", "int"])), signatures[0].get("parameters"));

        let response = server.handle(&request("system.methodHelp", vec![Value::text("nope")]));
        assert_eq!(640, response.fault().unwrap().code());
    }

    #[test]
    fn test_multicall_entry_faults() {
        let server = Server::new();
        let batch = Value::array(vec![
            Value::integer(1),
            Value::structure(vec![("params", Value::array(vec![]))]),
            Value::structure(vec![("methodName", Value::text("system.listMethods"))]),
            Value::structure(vec![
                ("methodName", Value::text("system.listMethods")),
                ("params", Value::text("x")),
            ]),
            Value::structure(vec![
                ("methodName", Value::text("system.multicall")),
                ("params", Value::array(vec![])),
            ]),
            Value::structure(vec![
                ("methodName", Value::text("system.listMethods")),
                ("params", Value::array(vec![])),
            ]),
        ]);
        let response = server.handle(&request("system.multicall", vec![batch]));
        let results = response.return_value().and_then(Value::as_array).unwrap();
        let codes: Vec<Option<i64>> = results
            .iter()
            .map(|r| r.get("faultCode").and_then(Value::as_i64))
            .collect();
        assert_eq!(vec![Some(601), Some(602), Some(603), Some(604), Some(605), None], codes);
        assert_eq!(Some(4), results[5].as_array().map(|names| names.len()));
    }
}
