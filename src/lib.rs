// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![deny(non_camel_case_types)]
#![allow(missing_docs)]

//! XML-RPC library, including both serialization and remote procedure calling
//!
//! # What is XML-RPC?
//!
//! A remote procedure call protocol sending a method name and typed
//! parameters as an XML document over HTTP POST, and receiving either one
//! typed return value or a fault (a code and a message).
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! # Layout
//!
//! * [`Value`] is the typed value model, convertible to and from Rust
//!   types through `serde` ([`to_value`], [`from_value`]).
//! * [`Request`] and [`Response`] are the envelopes.
//! * [`Client`] calls remote methods over a [`Transport`].
//! * [`Server`] dispatches requests to registered [`Method`]s.

pub mod client;
pub mod config;
pub mod dom;
pub mod error;
pub mod fault;
pub mod generator;
pub mod protocol;
pub mod server;
pub mod value;

pub use crate::client::{Client, HttpReply, HyperTransport, Introspector, Param, ServerProxy, Signature, Transport};
pub use crate::config::{Config, GeneratorKind};
pub use crate::error::{Error, Result};
pub use crate::fault::Fault;
pub use crate::protocol::{HttpRequest, HttpResponse, Request, Response};
pub use crate::server::{FaultRegistry, LocalTransport, Method, MethodError, Server, Service};
pub use crate::value::{from_value, to_value, Data, DateTime, Type, Value};
