// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Incremental XML emission.
//!
//! Values and envelopes describe themselves as a sequence of
//! `open_element` / `close_element` calls. Two backends turn that sequence
//! into text: [`WriterGenerator`] streams straight into a buffer and
//! [`DomGenerator`] builds an element tree first.

use std::sync::OnceLock;

use regex::Regex;
use xml::escape::{escape_str_attribute, escape_str_pcdata};

mod tree;
mod writer;

pub use self::tree::DomGenerator;
pub use self::writer::WriterGenerator;

pub trait Generator {
    fn encoding(&self) -> &str;

    /// Opens `name`, writing `text` as its content when given.
    fn open_element(&mut self, name: &str, text: Option<&str>);

    /// Closes the innermost open element, which must be `name`.
    fn close_element(&mut self, name: &str);

    /// The document generated so far, XML declaration included.
    fn save_xml(&self) -> String;

    /// Drops everything generated so far.
    fn reset(&mut self);

    /// Returns the document and resets the generator for reuse.
    fn flush(&mut self) -> String {
        let xml = self.save_xml();
        self.reset();
        xml
    }

    /// The document generated so far, without the XML declaration.
    fn fragment(&self) -> String {
        strip_declaration(&self.save_xml())
    }
}

/// Removes a leading `<?xml version="1.0" encoding="…"?>` line.
pub fn strip_declaration(xml: &str) -> String {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    let re = DECLARATION.get_or_init(|| {
        Regex::new(r#"<\?xml version="1.0"( encoding="[^"]*")?\?>\n"#).unwrap()
    });
    re.replace(xml, "").into_owned()
}

pub(crate) fn declaration(encoding: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"{}\"?>\n", encoding)
}

pub(crate) fn is_unicode(encoding: &str) -> bool {
    let lower = encoding.to_ascii_lowercase();
    lower == "utf-8" || lower == "utf8"
}

/// Writes text content for `encoding`.
///
/// Characters outside ASCII become numeric references unless the output
/// encoding is UTF-8, since the buffer itself is always UTF-8.
pub(crate) fn encode_text(text: &str, encoding: &str, escape_quotes: bool) -> String {
    let escaped = if escape_quotes { escape_str_attribute(text) } else { escape_str_pcdata(text) };
    if is_unicode(encoding) || escaped.is_ascii() {
        return escaped.into_owned();
    }
    let mut out = String::with_capacity(escaped.len());
    for c in escaped.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str(&format!("&#{};", c as u32));
        }
    }
    out
}
