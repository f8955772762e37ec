// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! `<methodCall>` and `<methodResponse>` envelopes.
//!
//! Loading an envelope never fails with an error: a document that cannot
//! be used leaves a [`Fault`](crate::Fault) on the request or response
//! instead, ready to be sent back to the peer.

mod http;
mod request;
mod response;

pub use self::http::{normalize_header, HttpRequest, HttpResponse};
pub use self::request::Request;
pub(crate) use self::request::is_valid_method_name;
pub use self::response::Response;
