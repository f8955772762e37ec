// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use crate::dom::{Element, Node};

use super::{declaration, Generator};

/// Builds an element tree and serializes it on demand.
///
/// Quotes in text content are left as they are.
#[derive(Debug, Clone)]
pub struct DomGenerator {
    encoding: String,
    roots: Vec<Element>,
    open: Vec<Element>,
}

impl DomGenerator {
    pub fn new(encoding: &str) -> DomGenerator {
        DomGenerator {
            encoding: encoding.to_string(),
            roots: Vec::new(),
            open: Vec::new(),
        }
    }
}

impl Generator for DomGenerator {
    fn encoding(&self) -> &str {
        &self.encoding
    }

    fn open_element(&mut self, name: &str, text: Option<&str>) {
        let mut element = Element::new(name);
        if let Some(text) = text {
            element.children.push(Node::Text(text.to_string()));
        }
        self.open.push(element);
    }

    fn close_element(&mut self, name: &str) {
        let element = match self.open.pop() {
            Some(element) => element,
            None => return,
        };
        debug_assert_eq!(name, element.name, "mismatched close_element");
        match self.open.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => self.roots.push(element),
        }
    }

    fn save_xml(&self) -> String {
        let mut xml = declaration(&self.encoding);
        if self.roots.is_empty() {
            return xml;
        }
        for root in &self.roots {
            xml.push_str(&root.to_xml_encoded(&self.encoding));
        }
        xml.push('\n');
        xml
    }

    fn reset(&mut self) {
        self.roots.clear();
        self.open.clear();
    }
}
