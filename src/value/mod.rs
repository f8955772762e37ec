// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! XML-RPC values.
//!
//! A [`Value`] holds one of the wire types together with a lazily generated
//! copy of its XML. Values come from three places: the `From` impls for
//! plain Rust values, [`to_value`] for anything implementing `Serialize`
//! (the type is picked from the value's shape), and [`Value::from_xml`].
//! [`Value::coerce`] converts a value to an explicitly requested type.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use num::{BigInt, FromPrimitive, ToPrimitive, Zero};

use crate::config::Config;
use crate::error::{Error, Result};

mod datetime;
mod de;
mod ser;
mod xml;

pub use self::datetime::DateTime;
pub use self::de::from_value;
pub use self::ser::{to_value, to_value_with, type_of};

/// Wire type names, including the aliases accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    I4,
    Int,
    I8,
    ApacheI8,
    Double,
    Boolean,
    String,
    DateTime,
    Base64,
    Array,
    Struct,
    Nil,
    ApacheNil,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Type::I4 => "i4",
            Type::Int => "int",
            Type::I8 => "i8",
            Type::ApacheI8 => "ex:i8",
            Type::Double => "double",
            Type::Boolean => "boolean",
            Type::String => "string",
            Type::DateTime => "dateTime.iso8601",
            Type::Base64 => "base64",
            Type::Array => "array",
            Type::Struct => "struct",
            Type::Nil => "nil",
            Type::ApacheNil => "ex:nil",
        }
    }

    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "i4" => Type::I4,
            "int" => Type::Int,
            "i8" => Type::I8,
            "ex:i8" => Type::ApacheI8,
            "double" => Type::Double,
            "boolean" => Type::Boolean,
            "string" => Type::String,
            "dateTime.iso8601" => Type::DateTime,
            "base64" => Type::Base64,
            "array" => Type::Array,
            "struct" => Type::Struct,
            "nil" => Type::Nil,
            "ex:nil" => Type::ApacheNil,
            _ => return None,
        };
        Some(ty)
    }

    /// The type a value of this type reports once constructed.
    pub fn canonical(self) -> Type {
        match self {
            Type::I4 => Type::Int,
            Type::ApacheI8 => Type::I8,
            Type::ApacheNil => Type::Nil,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Type> {
        Type::from_name(s).ok_or_else(|| Error::value(format!("Given type '{}' is not an XML-RPC type", s)))
    }
}

/// The contents of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Integer(i64),
    BigInteger(BigInt),
    /// Decimal text as written on the wire.
    Double(String),
    Boolean(bool),
    Text(String),
    DateTime(DateTime),
    Base64(Vec<u8>),
    Nil,
    Array(Vec<Value>),
    /// Members in wire order; names are unique.
    Struct(Vec<(String, Value)>),
}

#[derive(Clone)]
pub struct Value {
    data: Data,
    xml: OnceLock<String>,
}

pub(crate) fn format_double(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let len = text.trim_end_matches('0').len();
        text.truncate(len);
        if text.ends_with('.') {
            text.push('0');
        }
    }
    text
}

const OVERLONG: &str = "Overlong integer given";

fn parse_integer(text: &str) -> Result<i64> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Ok(i);
    }
    if let Ok(big) = text.parse::<BigInt>() {
        return big.to_i64().ok_or_else(|| Error::value(OVERLONG));
    }
    match text.parse::<f64>() {
        Ok(f) => integer_from_double(f),
        Err(_) => Err(Error::value(format!("Unable to convert '{}' to int", text))),
    }
}

fn integer_from_double(f: f64) -> Result<i64> {
    if f.is_nan() {
        return Ok(0);
    }
    if f >= 9_223_372_036_854_775_808.0 || f < -9_223_372_036_854_775_808.0 {
        return Err(Error::value(OVERLONG));
    }
    Ok(f as i64)
}

fn parse_double(text: &str) -> Result<f64> {
    let text = text.trim();
    text.parse::<f64>()
        .map_err(|_| Error::value(format!("Unable to convert '{}' to double", text)))
}

fn truthy(text: &str) -> bool {
    !(text.is_empty() || text == "0")
}

impl Value {
    fn from_data(data: Data) -> Value {
        Value { data, xml: OnceLock::new() }
    }

    pub fn integer(value: i64) -> Value {
        Value::from_data(Data::Integer(value))
    }

    pub fn big_integer(value: BigInt) -> Value {
        Value::from_data(Data::BigInteger(value))
    }

    pub fn double(value: f64) -> Value {
        Value::double_with_precision(value, Config::default().precision)
    }

    pub fn double_with_precision(value: f64, precision: usize) -> Value {
        Value::from_data(Data::Double(format_double(value, precision)))
    }

    pub fn boolean(value: bool) -> Value {
        Value::from_data(Data::Boolean(value))
    }

    pub fn text<S: Into<String>>(value: S) -> Value {
        Value::from_data(Data::Text(value.into()))
    }

    pub fn datetime<D: Into<DateTime>>(value: D) -> Value {
        Value::from_data(Data::DateTime(value.into()))
    }

    pub fn base64<B: Into<Vec<u8>>>(bytes: B) -> Value {
        Value::from_data(Data::Base64(bytes.into()))
    }

    pub fn nil() -> Value {
        Value::from_data(Data::Nil)
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::from_data(Data::Array(items))
    }

    /// A struct from members in order; a repeated name replaces the earlier
    /// member in place.
    pub fn structure<K: Into<String>>(members: Vec<(K, Value)>) -> Value {
        let mut out: Vec<(String, Value)> = Vec::with_capacity(members.len());
        for (name, value) in members {
            let name = name.into();
            match out.iter_mut().find(|member| member.0 == name) {
                Some(member) => member.1 = value,
                None => out.push((name, value)),
            }
        }
        Value::from_data(Data::Struct(out))
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn get_type(&self) -> Type {
        match self.data {
            Data::Integer(_) => Type::Int,
            Data::BigInteger(_) => Type::I8,
            Data::Double(_) => Type::Double,
            Data::Boolean(_) => Type::Boolean,
            Data::Text(_) => Type::String,
            Data::DateTime(_) => Type::DateTime,
            Data::Base64(_) => Type::Base64,
            Data::Nil => Type::Nil,
            Data::Array(_) => Type::Array,
            Data::Struct(_) => Type::Struct,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.data {
            Data::Integer(i) => Some(i),
            Data::BigInteger(ref b) => b.to_i64(),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<BigInt> {
        match self.data {
            Data::Integer(i) => Some(BigInt::from(i)),
            Data::BigInteger(ref b) => Some(b.clone()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.data {
            Data::Double(ref d) => d.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            Data::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data {
            Data::Text(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self.data {
            Data::DateTime(ref dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.data {
            Data::Base64(ref b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self.data {
            Data::Array(ref items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[(String, Value)]> {
        match self.data {
            Data::Struct(ref members) => Some(members),
            _ => None,
        }
    }

    /// Looks up a struct member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_struct()
            .and_then(|members| members.iter().find(|m| m.0 == name).map(|m| &m.1))
    }

    pub fn is_nil(&self) -> bool {
        self.data == Data::Nil
    }

    /// Converts this value to the wire type `ty`.
    ///
    /// Scalars convert between each other following the usual loose
    /// rules (numeric strings become numbers, any value has a truth
    /// value). A value already of the requested type is returned as is.
    pub fn coerce(self, ty: Type, config: &Config) -> Result<Value> {
        let ty = match ty.canonical() {
            Type::I8 if !config.use_bigint_for_i8 => Type::Int,
            other => other,
        };
        if self.get_type() == ty {
            return Ok(self);
        }
        let type_name = self.get_type();
        let unable = move || Error::value(format!("Unable to convert {} to {}", type_name, ty));

        let data = match ty {
            Type::Int => Data::Integer(match self.data {
                Data::Integer(i) => i,
                Data::BigInteger(ref b) => b.to_i64().ok_or_else(|| Error::value(OVERLONG))?,
                Data::Double(ref d) => integer_from_double(parse_double(d)?)?,
                Data::Boolean(b) => i64::from(b),
                Data::Text(ref s) => parse_integer(s)?,
                Data::Base64(ref bytes) => parse_integer(&String::from_utf8_lossy(bytes))?,
                Data::Nil => 0,
                Data::Array(ref items) => i64::from(!items.is_empty()),
                Data::Struct(ref members) => i64::from(!members.is_empty()),
                Data::DateTime(_) => return Err(unable()),
            }),
            Type::I8 => Data::BigInteger(match self.data {
                Data::Integer(i) => BigInt::from(i),
                Data::BigInteger(b) => b,
                Data::Double(ref d) => BigInt::from_f64(parse_double(d)?.trunc()).ok_or_else(unable)?,
                Data::Boolean(b) => BigInt::from(u8::from(b)),
                Data::Text(ref s) => s
                    .trim()
                    .parse::<BigInt>()
                    .map_err(|_| Error::value(format!("Unable to convert '{}' to i8", s)))?,
                Data::Nil => BigInt::zero(),
                _ => return Err(unable()),
            }),
            Type::Double => {
                let f = match self.data {
                    Data::Integer(i) => i as f64,
                    Data::BigInteger(ref b) => b.to_f64().ok_or_else(unable)?,
                    Data::Double(ref d) => parse_double(d)?,
                    Data::Boolean(b) => f64::from(u8::from(b)),
                    Data::Text(ref s) => parse_double(s)?,
                    Data::Nil => 0.0,
                    Data::Array(ref items) => f64::from(u8::from(!items.is_empty())),
                    Data::Struct(ref members) => f64::from(u8::from(!members.is_empty())),
                    Data::DateTime(_) | Data::Base64(_) => return Err(unable()),
                };
                Data::Double(format_double(f, config.precision))
            }
            Type::Boolean => Data::Boolean(match self.data {
                Data::Integer(i) => i != 0,
                Data::BigInteger(ref b) => !b.is_zero(),
                Data::Double(ref d) => parse_double(d).map(|f| f != 0.0).unwrap_or(true),
                Data::Boolean(b) => b,
                Data::Text(ref s) => truthy(s),
                Data::DateTime(_) => true,
                Data::Base64(ref bytes) => truthy(&String::from_utf8_lossy(bytes)),
                Data::Nil => false,
                Data::Array(ref items) => !items.is_empty(),
                Data::Struct(ref members) => !members.is_empty(),
            }),
            Type::String => Data::Text(match self.data {
                Data::Integer(i) => i.to_string(),
                Data::BigInteger(ref b) => b.to_string(),
                Data::Double(d) => d,
                Data::Boolean(b) => if b { "1".to_string() } else { String::new() },
                Data::Text(s) => s,
                Data::DateTime(ref dt) => dt.to_string(),
                Data::Base64(bytes) => String::from_utf8(bytes).map_err(|_| unable())?,
                Data::Nil => String::new(),
                Data::Array(_) | Data::Struct(_) => return Err(unable()),
            }),
            Type::DateTime => Data::DateTime(match self.data {
                Data::Integer(i) => DateTime::from_timestamp(i)?,
                Data::BigInteger(ref b) => DateTime::from_timestamp(b.to_i64().ok_or_else(unable)?)?,
                Data::Double(ref d) => DateTime::from_timestamp(parse_double(d)? as i64)?,
                Data::Text(ref s) => DateTime::parse(s)?,
                _ => return Err(unable()),
            }),
            Type::Base64 => Data::Base64(match self.data {
                Data::Integer(i) => i.to_string().into_bytes(),
                Data::BigInteger(ref b) => b.to_string().into_bytes(),
                Data::Double(d) => d.into_bytes(),
                Data::Boolean(b) => if b { b"1".to_vec() } else { Vec::new() },
                Data::Text(s) => s.into_bytes(),
                Data::DateTime(ref dt) => dt.to_string().into_bytes(),
                Data::Nil => Vec::new(),
                Data::Base64(_) | Data::Array(_) | Data::Struct(_) => return Err(unable()),
            }),
            Type::Nil => Data::Nil,
            Type::Array => Data::Array(match self.data {
                Data::Struct(members) => members.into_iter().map(|(_, v)| v).collect(),
                Data::Nil => Vec::new(),
                _ => vec![self],
            }),
            Type::Struct => Data::Struct(match self.data {
                Data::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
                Data::Nil => Vec::new(),
                _ => vec![("0".to_string(), self)],
            }),
            Type::I4 | Type::ApacheI8 | Type::ApacheNil => return Err(unable()),
        };
        Ok(Value::from_data(data))
    }

    /// Builds a value of type `ty` from `native`.
    pub fn typed<T: Into<Value>>(native: T, ty: Type, config: &Config) -> Result<Value> {
        native.into().coerce(ty, config)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.data == other.data
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.data.fmt(f)
    }
}

macro_rules! from_integer {
    ($($t:ty),+) => (
        $(impl From<$t> for Value {
            fn from(value: $t) -> Value { Value::integer(i64::from(value)) }
        })+
    )
}

from_integer! { i8, i16, i32, i64, u8, u16, u32 }

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        match i64::try_from(value) {
            Ok(i) => Value::integer(i),
            Err(_) => Value::big_integer(BigInt::from(value)),
        }
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Value {
        Value::integer(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Value {
        Value::from(value as u64)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Value {
        Value::big_integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::double(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::double(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::boolean(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Value {
        Value::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::text(value)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::nil()
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Value {
        Value::datetime(value)
    }
}

impl From<time::OffsetDateTime> for Value {
    fn from(value: time::OffsetDateTime) -> Value {
        Value::datetime(value)
    }
}

impl From<time::PrimitiveDateTime> for Value {
    fn from(value: time::PrimitiveDateTime) -> Value {
        Value::datetime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Value {
        match value {
            Some(v) => v.into(),
            None => Value::nil(),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::array(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(map: BTreeMap<String, V>) -> Value {
        map.into_iter().collect()
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for Value {
    fn from(map: HashMap<String, V>) -> Value {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Value {
        Value::structure(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
