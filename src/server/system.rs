// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! The `system.*` introspection and batching methods.

use log::debug;

use crate::fault::Fault;
use crate::protocol::Request;
use crate::value::{Data, Value};

use super::definition::{Method, SystemMethod};
use super::fault::MethodError;
use super::Server;

const MULTICALL: &str = "system.multicall";

pub(crate) fn methods() -> Vec<Method> {
    vec![
        Method::system("system.listMethods", SystemMethod::ListMethods)
            .help("List all available XMLRPC methods")
            .prototype("array", &[]),
        Method::system("system.methodHelp", SystemMethod::MethodHelp)
            .help("Display help message for an XMLRPC method")
            .prototype("string", &["string"]),
        Method::system("system.methodSignature", SystemMethod::MethodSignature)
            .help("Return a method signature")
            .prototype("array", &["string"]),
        Method::system(MULTICALL, SystemMethod::Multicall)
            .help("Multicall - boxcar feature of XML-RPC for calling multiple methods in a single request")
            .prototype("array", &["array"]),
    ]
}

pub(crate) fn call(server: &Server, method: &SystemMethod, params: &[Value]) -> Result<Value, MethodError> {
    match *method {
        SystemMethod::ListMethods => Ok(Value::from(server.list_methods())),
        SystemMethod::MethodHelp => {
            let method = lookup(server, params)?;
            Ok(Value::text(method.method_help()))
        }
        SystemMethod::MethodSignature => {
            let method = lookup(server, params)?;
            Ok(Value::array(method.prototypes().iter().map(|p| p.to_value()).collect()))
        }
        SystemMethod::Multicall => {
            let calls = params.first().and_then(Value::as_array).unwrap_or(&[]);
            Ok(Value::array(calls.iter().map(|c| multicall_one(server, calls, c)).collect()))
        }
    }
}

fn lookup<'a>(server: &'a Server, params: &[Value]) -> Result<&'a Method, MethodError> {
    let name = params.first().and_then(Value::as_str).unwrap_or("");
    server
        .dispatch_table()
        .get(name)
        .ok_or_else(|| MethodError::server(640, &format!("Method \"{}\" does not exist", name)))
}

fn fault_value(fault: &Fault) -> Value {
    Value::structure(vec![
        ("faultCode", Value::integer(i64::from(fault.code()))),
        ("faultString", Value::text(fault.message())),
    ])
}

fn multicall_one(server: &Server, batch: &[Value], call: &Value) -> Value {
    let checked = match *call.data() {
        Data::Struct(_) => match (call.get("methodName"), call.get("params")) {
            (None, _) => Err(server.fault(&format!("Missing methodName: {:?}", batch), 602)),
            (Some(_), None) => Err(server.fault("Missing params", 603)),
            (Some(name), Some(params)) => match (name.as_str(), params.as_array()) {
                (_, None) => Err(server.fault("Params must be an array", 604)),
                (Some(MULTICALL), Some(_)) => Err(server.fault("Recursive system.multicall forbidden", 605)),
                (name, Some(params)) => Ok((name.unwrap_or(""), params)),
            },
        },
        Data::Array(_) => Err(server.fault(&format!("Missing methodName: {:?}", batch), 602)),
        _ => Err(server.fault("system.multicall expects each method to be a struct", 601)),
    };

    let (name, params) = match checked {
        Ok(call) => call,
        Err(fault) => return fault_value(&fault),
    };

    let mut request = Request::with_config(server.config().clone());
    request.set_method(name);
    request.set_params(params.to_vec());
    let response = server.handle(&request);
    match response.fault() {
        Some(fault) => {
            debug!("multicall entry {} faulted: {}", name, fault);
            fault_value(fault)
        }
        None => response.return_value().cloned().unwrap_or_else(Value::nil),
    }
}
