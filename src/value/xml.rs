// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::trace;
use num::BigInt;

use crate::config::Config;
use crate::dom::{self, Element, APACHE_NS};
use crate::error::{Error, Result};
use crate::generator::Generator;

use super::{parse_double, parse_integer, truthy, Data, DateTime, Type, Value};

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    LENIENT
        .decode(compact.as_bytes())
        .map_err(|e| Error::value(format!("Invalid base64 content: {}", e)))
}

/// The wire type named by a `<value>` element, and the element holding
/// its content.
///
/// The first child outside any namespace names the type; failing that, the
/// first child in the Apache extension namespace does. A value with neither
/// is a string whose content is the element's own text.
fn type_and_content(element: &Element) -> (String, Option<&Element>) {
    if let Some(child) = element.plain_elements().next() {
        return (child.name.clone(), Some(child));
    }
    if let Some(child) = element.child_ns(APACHE_NS) {
        return (format!("ex:{}", child.name), Some(child));
    }
    (Type::String.as_str().to_string(), None)
}

impl Value {
    /// Parses a `<value>` fragment.
    pub fn from_xml(xml: &str, config: &Config) -> Result<Value> {
        let element = dom::parse(xml).map_err(|e| Error::Xml(e.to_string()))?;
        Value::from_element(&element, config)
    }

    pub(crate) fn from_element(element: &Element, config: &Config) -> Result<Value> {
        let (name, content) = type_and_content(element);
        let text = content.map_or_else(|| element.text(), |c| c.text());
        let ty = Type::from_name(&name).ok_or_else(|| {
            Error::value(format!(
                "Value type '{}' parsed from the XML string is not a known XML-RPC native type",
                name
            ))
        })?;

        let value = match ty {
            Type::I4 | Type::Int => Value::integer(parse_integer(&text)?),
            Type::I8 | Type::ApacheI8 if config.use_bigint_for_i8 => {
                let trimmed = text.trim();
                let big = trimmed
                    .parse::<BigInt>()
                    .map_err(|_| Error::value(format!("Invalid i8 value '{}'", trimmed)))?;
                Value::big_integer(big)
            }
            Type::I8 | Type::ApacheI8 => Value::integer(parse_integer(&text)?),
            Type::Double => Value::double_with_precision(parse_double(&text)?, config.precision),
            Type::Boolean => Value::boolean(truthy(text.trim())),
            Type::String => Value::text(text),
            Type::DateTime => Value::datetime(DateTime::parse(&text)?),
            Type::Base64 => Value::base64(decode_base64(&text)?),
            Type::Nil | Type::ApacheNil => Value::nil(),
            Type::Array => {
                let data = content.and_then(|array| array.child("data")).ok_or_else(|| {
                    Error::value("Invalid XML for XML-RPC native array type: ARRAY tag must contain DATA tag")
                })?;
                let items = data
                    .children_named("value")
                    .map(|item| Value::from_element(item, config))
                    .collect::<Result<Vec<Value>>>()?;
                Value::array(items)
            }
            Type::Struct => {
                let mut members = Vec::new();
                for member in content.into_iter().flat_map(|s| s.children_named("member")) {
                    let (name, value) = match (member.child("name"), member.child("value")) {
                        (Some(name), Some(value)) => (name, value),
                        _ => {
                            trace!("skipping incomplete struct member");
                            continue;
                        }
                    };
                    members.push((name.text(), Value::from_element(value, config)?));
                }
                Value::structure(members)
            }
        };

        let _ = value.xml.set(format!("{}\n", element.to_xml()));
        Ok(value)
    }

    /// Writes this value as a `<value>` element.
    pub fn generate(&self, generator: &mut dyn Generator) {
        generator.open_element("value", None);
        match self.data {
            Data::Array(ref items) => {
                generator.open_element("array", None);
                generator.open_element("data", None);
                for item in items {
                    item.generate(generator);
                }
                generator.close_element("data");
                generator.close_element("array");
            }
            Data::Struct(ref members) => {
                generator.open_element("struct", None);
                for &(ref name, ref value) in members {
                    generator.open_element("member", None);
                    generator.open_element("name", Some(name));
                    generator.close_element("name");
                    value.generate(generator);
                    generator.close_element("member");
                }
                generator.close_element("struct");
            }
            ref scalar => {
                let tag = self.get_type().as_str();
                let text = match *scalar {
                    Data::Integer(i) => Some(i.to_string()),
                    Data::BigInteger(ref b) => Some(b.to_string()),
                    Data::Double(ref d) => Some(d.clone()),
                    Data::Boolean(b) => Some(if b { "1" } else { "0" }.to_string()),
                    Data::Text(ref s) => Some(s.clone()),
                    Data::DateTime(ref dt) => Some(dt.to_string()),
                    Data::Base64(ref bytes) => Some(STANDARD.encode(bytes)),
                    _ => None,
                };
                generator.open_element(tag, text.as_deref());
                generator.close_element(tag);
            }
        }
        generator.close_element("value");
    }

    /// The `<value>` fragment for this value, computed once.
    ///
    /// A parsed value returns the XML it was parsed from.
    pub fn to_xml(&self) -> &str {
        self.xml.get_or_init(|| self.to_xml_with(&Config::default()))
    }

    /// Generates the `<value>` fragment with the generator and encoding of
    /// `config`, bypassing the cached copy.
    pub fn to_xml_with(&self, config: &Config) -> String {
        let mut generator = config.generator();
        self.generate(&mut *generator);
        generator.fragment()
    }
}
