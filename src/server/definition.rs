// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! The dispatch table: methods, their prototypes and their handlers.

use std::fmt;
use std::sync::Arc;

use crate::value::{Type, Value};

use super::fault::MethodError;

/// Signature of a plain function handler.
pub type Handler = Arc<dyn Fn(&[Value]) -> Result<Value, MethodError> + Send + Sync>;

/// Maps a declared type name onto a wire type. `None` stands for `void`,
/// which is also what unknown names become.
pub fn fix_type(name: &str) -> Option<Type> {
    let ty = match name {
        "i4" => Type::I4,
        "int" | "integer" => Type::Int,
        "i8" | "ex:i8" => Type::I8,
        "double" | "float" | "real" => Type::Double,
        "boolean" | "bool" | "true" | "false" => Type::Boolean,
        "string" | "str" => Type::String,
        "base64" => Type::Base64,
        "dateTime.iso8601" | "date" | "time" | "DateTime" => Type::DateTime,
        "array" => Type::Array,
        "struct" | "mixed" => Type::Struct,
        "nil" | "null" | "ex:nil" => Type::Nil,
        _ => return None,
    };
    Some(ty)
}

fn type_name(ty: Option<Type>) -> &'static str {
    ty.map_or("void", |ty| ty.as_str())
}

/// One accepted call shape of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    return_type: Option<Type>,
    parameters: Vec<Option<Type>>,
}

impl Prototype {
    pub fn new(return_type: Option<Type>, parameters: Vec<Option<Type>>) -> Prototype {
        Prototype { return_type, parameters }
    }

    /// Builds a prototype from declared type names such as `"integer"`
    /// or `"mixed"`.
    pub fn from_names(return_type: &str, parameters: &[&str]) -> Prototype {
        Prototype {
            return_type: fix_type(return_type),
            parameters: parameters.iter().map(|name| fix_type(name)).collect(),
        }
    }

    pub fn return_type(&self) -> &'static str {
        type_name(self.return_type)
    }

    pub fn parameters(&self) -> Vec<&'static str> {
        self.parameters.iter().map(|ty| type_name(*ty)).collect()
    }

    /// True when `called` has exactly the parameter types of this prototype.
    pub fn matches(&self, called: &[Type]) -> bool {
        self.parameters.len() == called.len()
            && self
                .parameters
                .iter()
                .zip(called)
                .all(|(declared, called)| declared.map(Type::canonical) == Some(called.canonical()))
    }

    /// `{returnType, parameters}` as reported by `system.methodSignature`.
    pub fn to_value(&self) -> Value {
        Value::structure(vec![
            ("returnType", Value::text(self.return_type())),
            ("parameters", Value::from(self.parameters())),
        ])
    }
}

/// An object exposing several methods, registered with
/// [`Server::set_class`](super::Server::set_class).
pub trait Service: Send + Sync {
    /// The methods offered, named relative to the registration namespace.
    /// Handlers set here are ignored: calls go through [`Service::call`].
    fn methods(&self) -> Vec<Method>;

    /// Runs before every call with the arguments bound at registration.
    fn prepare(&self, _args: &[Value]) -> Result<(), MethodError> {
        Ok(())
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, MethodError>;
}

#[derive(Clone)]
pub(crate) enum SystemMethod {
    ListMethods,
    MethodHelp,
    MethodSignature,
    Multicall,
}

#[derive(Clone)]
pub(crate) enum Callback {
    Function(Handler),
    Service { service: Arc<dyn Service>, method: String },
    System(SystemMethod),
}

/// A named method with its help text, prototypes and implementation.
#[derive(Clone)]
pub struct Method {
    name: String,
    help: String,
    prototypes: Vec<Prototype>,
    pub(crate) callback: Option<Callback>,
    invoke_args: Vec<Value>,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("prototypes", &self.prototypes)
            .field("implemented", &self.callback.is_some())
            .finish()
    }
}

impl Method {
    pub fn new(name: &str) -> Method {
        Method {
            name: name.to_string(),
            help: String::new(),
            prototypes: Vec::new(),
            callback: None,
            invoke_args: Vec::new(),
        }
    }

    pub fn help(mut self, help: &str) -> Method {
        self.help = help.to_string();
        self
    }

    /// Adds a call shape from declared type names.
    pub fn prototype(mut self, return_type: &str, parameters: &[&str]) -> Method {
        self.prototypes.push(Prototype::from_names(return_type, parameters));
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Method
    where
        F: Fn(&[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.callback = Some(Callback::Function(Arc::new(handler)));
        self
    }

    /// Arguments bound at registration time.
    pub fn invoke_args(mut self, args: Vec<Value>) -> Method {
        self.invoke_args = args;
        self
    }

    pub(crate) fn system(name: &str, method: SystemMethod) -> Method {
        let mut m = Method::new(name);
        m.callback = Some(Callback::System(method));
        m
    }

    pub(crate) fn renamed(mut self, name: String) -> Method {
        self.name = name;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_help(&self) -> &str {
        &self.help
    }

    pub fn prototypes(&self) -> &[Prototype] {
        &self.prototypes
    }

    pub fn get_invoke_args(&self) -> &[Value] {
        &self.invoke_args
    }

    pub fn has_implementation(&self) -> bool {
        self.callback.is_some()
    }
}

/// Methods in registration order, unique by name.
#[derive(Debug, Clone, Default)]
pub struct Definition {
    methods: Vec<Method>,
}

impl Definition {
    pub fn new() -> Definition {
        Definition::default()
    }

    /// Adds `method`, replacing any method of the same name.
    pub fn add_method(&mut self, method: Method) {
        match self.methods.iter_mut().find(|m| m.name == method.name) {
            Some(slot) => *slot = method,
            None => self.methods.push(method),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.methods.clear();
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl IntoIterator for Definition {
    type Item = Method;
    type IntoIter = std::vec::IntoIter<Method>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.into_iter()
    }
}
