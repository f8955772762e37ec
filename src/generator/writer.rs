// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt::Write;

use super::{declaration, encode_text, Generator};

/// Streams markup into a string buffer as elements are opened and closed.
///
/// Quotes in text content are written as `&quot;` and `&apos;`.
#[derive(Debug, Clone)]
pub struct WriterGenerator {
    encoding: String,
    buffer: String,
    open: Vec<String>,
    // the last start tag is still missing its closing `>`
    pending: bool,
}

impl WriterGenerator {
    pub fn new(encoding: &str) -> WriterGenerator {
        WriterGenerator {
            encoding: encoding.to_string(),
            buffer: String::new(),
            open: Vec::new(),
            pending: false,
        }
    }

    fn finish_start_tag(&mut self) {
        if self.pending {
            self.buffer.push('>');
            self.pending = false;
        }
    }
}

impl Generator for WriterGenerator {
    fn encoding(&self) -> &str {
        &self.encoding
    }

    fn open_element(&mut self, name: &str, text: Option<&str>) {
        self.finish_start_tag();
        let _ = write!(self.buffer, "<{}", name);
        self.open.push(name.to_string());
        self.pending = true;
        if let Some(text) = text {
            self.finish_start_tag();
            self.buffer.push_str(&encode_text(text, &self.encoding, true));
        }
    }

    fn close_element(&mut self, name: &str) {
        let opened = self.open.pop();
        debug_assert_eq!(Some(name), opened.as_deref(), "mismatched close_element");
        if self.pending {
            self.buffer.push_str("/>");
            self.pending = false;
        } else {
            let _ = write!(self.buffer, "</{}>", name);
        }
    }

    fn save_xml(&self) -> String {
        let mut xml = declaration(&self.encoding);
        xml.push_str(&self.buffer);
        if self.pending {
            xml.push('>');
        }
        if !self.buffer.is_empty() {
            xml.push('\n');
        }
        xml
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.open.clear();
        self.pending = false;
    }
}
