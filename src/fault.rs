// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;

use log::debug;

use crate::config::Config;
use crate::dom;
use crate::error::{Error, Result};
use crate::value::{Data, Value};

/// Code used when a fault carries no code of its own.
pub const UNKNOWN_CODE: i32 = 404;

pub(crate) const UNKNOWN_ERROR: &str = "Unknown Error";

/// The message for one of the well-known fault codes.
pub fn default_message(code: i32) -> Option<&'static str> {
    let message = match code {
        404 => UNKNOWN_ERROR,
        // 610 - 619 reflection errors
        610 => "Invalid method class",
        611 => "Unable to attach function or callback; not callable",
        612 => "Unable to load array; not an array",
        613 => "One or more method records are corrupt or otherwise unusable",
        // 620 - 629 dispatch errors
        620 => "Method does not exist",
        621 => "Error instantiating class to invoke method",
        622 => "Method missing implementation",
        623 => "Calling parameters do not match signature",
        // 630 - 639 request errors
        630 => "Unable to read request",
        631 => "Failed to parse request",
        632 => "Invalid request, no method passed; request must contain a 'methodName' tag",
        633 => "Param must contain a value",
        634 => "Invalid method name",
        635 => "Invalid XML provided to request",
        636 => "Error creating xmlrpc value",
        // 640 - 649 system.* errors
        640 => "Method does not exist",
        // 650 - 659 response errors
        650 => "Invalid XML provided for response",
        651 => "Failed to parse response",
        652 => "Invalid response",
        653 => "Invalid XMLRPC value in response",
        _ => return None,
    };
    Some(message)
}

fn resolve_message(code: i32, message: &str) -> String {
    if !message.is_empty() {
        return message.to_string();
    }
    default_message(code).unwrap_or(UNKNOWN_ERROR).to_string()
}

/// An XML-RPC fault: a code and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    code: i32,
    message: String,
    encoding: String,
}

impl Default for Fault {
    fn default() -> Fault {
        Fault::from_code(UNKNOWN_CODE)
    }
}

impl Fault {
    /// A fault with `code` and `message`; an empty message is looked up in
    /// the table of well-known codes.
    pub fn new(code: i32, message: &str) -> Fault {
        Fault {
            code,
            message: resolve_message(code, message),
            encoding: Config::default().encoding,
        }
    }

    pub fn from_code(code: i32) -> Fault {
        Fault::new(code, "")
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn set_code(&mut self, code: i32) -> &mut Fault {
        self.code = code;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: &str) -> &mut Fault {
        self.message = message.to_string();
        self
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn set_encoding(&mut self, encoding: &str) -> &mut Fault {
        self.encoding = encoding.to_string();
        self
    }

    /// Loads a `<methodResponse><fault>` document into this fault.
    ///
    /// Returns `Ok(false)` when the document has no `<fault>` element and
    /// leaves this fault untouched.
    pub fn load_xml(&mut self, xml: &str) -> Result<bool> {
        let root = dom::parse(xml).map_err(|e| Error::Xml(format!("Failed to parse XML fault: {}", e)))?;
        let fault = match root.child("fault") {
            Some(fault) => fault,
            None => return Ok(false),
        };

        let value = fault
            .child("value")
            .filter(|v| v.child("struct").is_some())
            .ok_or_else(|| Error::Xml("Invalid fault structure".to_string()))?;
        let value = Value::from_element(value, &Config::default())
            .map_err(|e| Error::Xml(format!("Invalid fault structure: {}", e)))?;

        let code = value.get("faultCode").and_then(fault_code).unwrap_or(0);
        let message = value.get("faultString").map(fault_string).unwrap_or_default();
        if code == 0 && message.is_empty() {
            return Err(Error::Xml("Fault code and string required".to_string()));
        }

        let code = if code == 0 { UNKNOWN_CODE } else { code };
        self.code = code;
        self.message = resolve_message(code, &message);
        debug!("loaded fault {}: {}", self.code, self.message);
        Ok(true)
    }

    /// Whether `xml` is a well-formed fault document.
    pub fn is_fault(xml: &str) -> bool {
        Fault::default().load_xml(xml).unwrap_or(false)
    }

    /// The fault as a complete `<methodResponse>` document.
    pub fn save_xml(&self) -> String {
        self.save_xml_with(&Config::default().with_encoding(&self.encoding))
    }

    pub fn save_xml_with(&self, config: &Config) -> String {
        let payload = Value::structure(vec![
            ("faultCode", Value::integer(i64::from(self.code))),
            ("faultString", Value::text(self.message.as_str())),
        ]);
        let mut generator = config.generator();
        generator.open_element("methodResponse", None);
        generator.open_element("fault", None);
        payload.generate(&mut *generator);
        generator.close_element("fault");
        generator.close_element("methodResponse");
        generator.flush()
    }
}

fn fault_code(value: &Value) -> Option<i32> {
    match *value.data() {
        Data::Integer(i) => i32::try_from(i).ok(),
        Data::Text(ref s) => s.trim().parse().ok(),
        _ => value.as_i64().and_then(|i| i32::try_from(i).ok()),
    }
}

fn fault_string(value: &Value) -> String {
    match *value.data() {
        Data::Text(ref s) => s.clone(),
        Data::Integer(i) => i.to_string(),
        _ => String::new(),
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Error {
        Error::Fault { code: fault.code, message: fault.message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault_xml(code: &str, message: &str) -> String {
        format!(
            "<methodResponse><fault><value><struct>{}{}</struct></value></fault></methodResponse>",
            code, message
        )
    }

    const CODE: &str = "<member><name>faultCode</name><value><int>1000</int></value></member>";
    const STRING: &str = "<member><name>faultString</name><value><string>Error string</string></value></member>";

    #[test]
    fn test_default_messages() {
        assert_eq!("Invalid method class", Fault::from_code(610).message());
        assert_eq!("Unknown Error", Fault::from_code(1234).message());
        assert_eq!("Custom", Fault::new(610, "Custom").message());
        assert_eq!(404, Fault::default().code());
    }

    #[test]
    fn test_encode() {
        let fault = Fault::new(1000, "Error string");
        let expected = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n",
            fault_xml(
                "<member><name>faultCode</name><value><int>1000</int></value></member>",
                "<member><name>faultString</name><value><string>Error string</string></value></member>"
            )
        );
        assert_eq!(expected, fault.save_xml());
    }

    #[test]
    fn test_decode() {
        let mut fault = Fault::default();
        assert!(fault.load_xml(&fault_xml(CODE, STRING)).unwrap());
        assert_eq!(1000, fault.code());
        assert_eq!("Error string", fault.message());
    }

    #[test]
    fn test_missing_parts() {
        let mut fault = Fault::default();
        assert!(fault.load_xml(&fault_xml("", STRING)).unwrap());
        assert_eq!(404, fault.code());

        let mut fault = Fault::default();
        let code = "<member><name>faultCode</name><value><int>623</int></value></member>";
        assert!(fault.load_xml(&fault_xml(code, "")).unwrap());
        assert_eq!("Calling parameters do not match signature", fault.message());

        let err = Fault::default().load_xml(&fault_xml("", "")).unwrap_err();
        assert_eq!("Fault code and string required", err.to_string());
    }

    #[test]
    fn test_invalid_documents() {
        let mut fault = Fault::default();
        assert!(!fault.load_xml("<methodResponse><params/></methodResponse>").unwrap());

        let err = fault.load_xml("<methodResponse><fault><value><int>1</int></value></fault></methodResponse>");
        assert_eq!("Invalid fault structure", err.unwrap_err().to_string());

        let err = fault.load_xml("<methodResponse><fault>").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse XML fault"));
    }

    #[test]
    fn test_is_fault() {
        assert!(Fault::is_fault(&fault_xml(CODE, STRING)));
        assert!(!Fault::is_fault("<methodResponse><params/></methodResponse>"));
        assert!(!Fault::is_fault("foo"));
    }
}
