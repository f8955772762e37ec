// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! A small element tree built from `xml-rs` reader events.
//!
//! Envelopes and values are parsed into this tree first and interpreted
//! afterwards, so lookups like "the first `<param>` without a `<value>`"
//! stay simple. The tree can also be written back out, which is how a
//! parsed value keeps the exact XML it came from.

use std::fmt;

use xml::escape::escape_str_attribute;
use xml::reader::{ParserConfig, XmlEvent};

use crate::generator::encode_text;

/// Namespace of the Apache `ex:i8` and `ex:nil` extension types.
pub const APACHE_NS: &str = "http://ws.apache.org/xmlrpc/namespaces/extensions";

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The prolog declares a document type.
    Doctype,
    /// The document is not well-formed.
    Syntax(String),
    /// The document ended before a root element was closed.
    Empty,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::Doctype => write!(f, "Invalid XML: Detected use of illegal DOCTYPE"),
            ParseError::Syntax(ref msg) => write!(f, "{}", msg),
            ParseError::Empty => write!(f, "Document has no root element"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Local name, without any prefix.
    pub name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Element {
        Element {
            name: name.to_string(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match *node {
            Node::Element(ref e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements outside any namespace.
    pub fn plain_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements().filter(|e| e.namespace.is_none())
    }

    /// First child element named `name` outside any namespace.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.plain_elements().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.plain_elements().filter(move |e| e.name == name)
    }

    /// First child element in the namespace `uri`.
    pub fn child_ns(&self, uri: &str) -> Option<&Element> {
        self.elements().find(|e| e.namespace.as_deref() == Some(uri))
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(ref t) = *node {
                text.push_str(t);
            }
        }
        text
    }

    pub fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(ref mut last)) = self.children.last_mut() {
            last.push_str(text);
            return;
        }
        self.children.push(Node::Text(text.to_string()));
    }

    fn qualified_name(&self) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    /// Serializes this element and its subtree.
    ///
    /// Namespace prefixes are declared on the first element that needs
    /// them, so a subtree taken out of a larger document stays parseable.
    pub fn to_xml(&self) -> String {
        self.to_xml_encoded("UTF-8")
    }

    /// Serializes for a document declared as `encoding`, writing characters
    /// outside ASCII as numeric references when that is not UTF-8.
    pub fn to_xml_encoded(&self, encoding: &str) -> String {
        let mut out = String::new();
        self.write_into(&mut out, encoding, &mut Vec::new());
        out
    }

    fn write_into(&self, out: &mut String, encoding: &str, declared: &mut Vec<String>) {
        let name = self.qualified_name();
        out.push('<');
        out.push_str(&name);

        let mut pushed = false;
        if let (Some(prefix), Some(uri)) = (&self.prefix, &self.namespace) {
            if !declared.contains(prefix) {
                out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, uri));
                declared.push(prefix.clone());
                pushed = true;
            }
        }
        for &(ref key, ref value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, escape_str_attribute(value)));
        }

        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for node in &self.children {
                match *node {
                    Node::Element(ref e) => e.write_into(out, encoding, declared),
                    Node::Text(ref t) => out.push_str(&encode_text(t, encoding, false)),
                }
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }

        if pushed {
            declared.pop();
        }
    }
}

/// Rejects a document whose prolog contains a document type declaration.
///
/// This runs on the raw text before any parser sees it, so entity
/// declarations in an internal subset are never expanded and external
/// identifiers are never resolved.
pub fn reject_doctype(xml: &str) -> Result<(), ParseError> {
    let mut rest = xml.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if rest.starts_with("<?") {
            match rest.find("?>") {
                Some(end) => rest = &rest[end + 2..],
                None => return Ok(()),
            }
        } else if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => rest = &rest[end + 3..],
                None => return Ok(()),
            }
        } else {
            let bytes = rest.as_bytes();
            if bytes.len() >= 9 && bytes[..9].eq_ignore_ascii_case(b"<!DOCTYPE") {
                return Err(ParseError::Doctype);
            }
            return Ok(());
        }
    }
}

/// Parses a complete document and returns its root element.
pub fn parse(xml: &str) -> Result<Element, ParseError> {
    reject_doctype(xml)?;

    let reader = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .coalesce_characters(true)
        .create_reader(xml.as_bytes());

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    for event in reader {
        let event = event.map_err(|e| ParseError::Syntax(e.to_string()))?;
        match event {
            XmlEvent::StartElement { name, attributes, .. } => {
                let mut element = Element::new(&name.local_name);
                element.prefix = name.prefix;
                element.namespace = name.namespace.filter(|ns| !ns.is_empty());
                element.attributes = attributes
                    .into_iter()
                    .map(|a| (a.name.to_string(), a.value))
                    .collect();
                stack.push(element);
            }
            XmlEvent::EndElement { .. } => {
                let element = match stack.pop() {
                    Some(e) => e,
                    None => return Err(ParseError::Syntax("Unbalanced end tag".to_string())),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) | XmlEvent::CData(text) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text);
                }
            }
            _ => {}
        }
    }

    root.ok_or(ParseError::Empty)
}
