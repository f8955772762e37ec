//! Wire type detection for anything implementing `Serialize`.
//!
//! The detected type follows the shape of the value: maps and records
//! become structs, sequences become arrays, integers too large for `i64`
//! become `i8`, `None` and `()` become nil, byte buffers become base64 and
//! every other scalar becomes the matching XML-RPC scalar. A map whose keys
//! are exactly the integers `0..n` in order is a sequence, so an empty map
//! is an array.

use num::BigInt;
use serde::ser::{self, Serialize, SerializeMap as _, Serializer};

use crate::config::Config;
use crate::error::{Error, Result};

use super::{Data, Type, Value};

pub(crate) const DATETIME_TOKEN: &str = "$xmlrpc::private::DateTime";
pub(crate) const BIGINT_TOKEN: &str = "$xmlrpc::private::BigInt";
pub(crate) const DOUBLE_TOKEN: &str = "$xmlrpc::private::Double";
pub(crate) const STRUCT_TOKEN: &str = "$xmlrpc::private::Struct";

/// Converts `value` to a [`Value`] using the default [`Config`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    to_value_with(value, &Config::default())
}

/// Converts `value` to a [`Value`]; doubles use `config.precision`.
pub fn to_value_with<T: Serialize + ?Sized>(value: &T, config: &Config) -> Result<Value> {
    value.serialize(ValueSerializer { config, force_struct: false })
}

/// The wire type `value` would be sent as.
pub fn type_of<T: Serialize + ?Sized>(value: &T) -> Result<Type> {
    to_value(value).map(|v| v.get_type())
}

#[derive(Clone, Copy)]
struct ValueSerializer<'a> {
    config: &'a Config,
    force_struct: bool,
}

impl<'a> ValueSerializer<'a> {
    fn nested(self) -> ValueSerializer<'a> {
        ValueSerializer { config: self.config, force_struct: false }
    }

    fn inner_text<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        match value.serialize(self.nested())?.into_data() {
            Data::Text(s) => Ok(s),
            other => Err(Error::value(format!("Expected a string, got {:?}", other))),
        }
    }
}

macro_rules! serialize_as_i64 {
    ($($method:ident: $t:ty),+) => (
        $(fn $method(self, v: $t) -> Result<Value> {
            Ok(Value::integer(i64::from(v)))
        })+
    )
}

impl<'a> Serializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = SeqSerializer<'a>;
    type SerializeTupleStruct = SeqSerializer<'a>;
    type SerializeTupleVariant = VariantSerializer<SeqSerializer<'a>>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = MapSerializer<'a>;
    type SerializeStructVariant = VariantSerializer<MapSerializer<'a>>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::boolean(v))
    }

    serialize_as_i64! {
        serialize_i8: i8, serialize_i16: i16, serialize_i32: i32, serialize_i64: i64,
        serialize_u8: u8, serialize_u16: u16, serialize_u32: u32
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::integer(i),
            Err(_) => Value::big_integer(BigInt::from(v)),
        })
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::integer(i),
            Err(_) => Value::big_integer(BigInt::from(v)),
        })
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::double_with_precision(v, self.config.precision))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::text(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::base64(v))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::nil())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::nil())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::nil())
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<Value> {
        Ok(Value::text(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, name: &'static str, value: &T) -> Result<Value> {
        match name {
            DATETIME_TOKEN => {
                let text = self.inner_text(value)?;
                Ok(Value::datetime(super::DateTime::parse(&text)?))
            }
            BIGINT_TOKEN => {
                let text = self.inner_text(value)?;
                text.parse::<BigInt>()
                    .map(Value::big_integer)
                    .map_err(|_| Error::value(format!("Invalid big integer '{}'", text)))
            }
            DOUBLE_TOKEN => Ok(Value::from_data(Data::Double(self.inner_text(value)?))),
            STRUCT_TOKEN => value.serialize(ValueSerializer { config: self.config, force_struct: true }),
            _ => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        let inner = value.serialize(self.nested())?;
        Ok(Value::structure(vec![(variant, inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer<'a>> {
        Ok(SeqSerializer { config: self.config, items: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqSerializer<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<SeqSerializer<'a>>> {
        Ok(VariantSerializer { variant, inner: self.serialize_seq(Some(len))? })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer<'a>> {
        Ok(MapSerializer {
            config: self.config,
            force_struct: self.force_struct,
            members: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapSerializer<'a>> {
        let mut map = self.serialize_map(Some(len))?;
        map.force_struct = true;
        Ok(map)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<MapSerializer<'a>>> {
        Ok(VariantSerializer { variant, inner: self.serialize_struct(name, len)? })
    }
}

pub(crate) struct SeqSerializer<'a> {
    config: &'a Config,
    items: Vec<Value>,
}

impl<'a> SeqSerializer<'a> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value_with(value, self.config)?);
        Ok(())
    }
}

impl<'a> ser::SerializeSeq for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::array(self.items))
    }
}

impl<'a> ser::SerializeTuple for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::array(self.items))
    }
}

impl<'a> ser::SerializeTupleStruct for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::array(self.items))
    }
}

enum Key {
    Index(i64),
    Name(String),
}

pub(crate) struct MapSerializer<'a> {
    config: &'a Config,
    force_struct: bool,
    members: Vec<(Key, Value)>,
    key: Option<Key>,
}

impl<'a> MapSerializer<'a> {
    fn is_sequence(&self) -> bool {
        self.members.iter().enumerate().all(|(i, member)| match member.0 {
            Key::Index(k) => k == i as i64,
            Key::Name(_) => false,
        })
    }

    fn finish(self) -> Value {
        if !self.force_struct && self.is_sequence() {
            return Value::array(self.members.into_iter().map(|(_, v)| v).collect());
        }
        let members = self
            .members
            .into_iter()
            .map(|(key, value)| match key {
                Key::Index(i) => (i.to_string(), value),
                Key::Name(name) => (name, value),
            })
            .collect();
        Value::structure(members)
    }
}

fn map_key<T: Serialize + ?Sized>(key: &T, config: &Config) -> Result<Key> {
    let key = to_value_with(key, config)?;
    match key.into_data() {
        Data::Integer(i) => Ok(Key::Index(i)),
        Data::Boolean(b) => Ok(Key::Index(i64::from(b))),
        Data::BigInteger(b) => Ok(Key::Name(b.to_string())),
        Data::Text(s) => Ok(Key::Name(s)),
        other => Err(Error::value(format!(
            "No matching XMLRPC type found for map key {:?}",
            other
        ))),
    }
}

impl<'a> ser::SerializeMap for MapSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.key = Some(map_key(key, self.config)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::value("Map value serialized before its key"))?;
        self.members.push((key, to_value_with(value, self.config)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl<'a> ser::SerializeStruct for MapSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.members.push((Key::Name(key.to_string()), to_value_with(value, self.config)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

/// Wraps an enum variant's fields in a single-member struct named after
/// the variant.
pub(crate) struct VariantSerializer<S> {
    variant: &'static str,
    inner: S,
}

impl<'a> ser::SerializeTupleVariant for VariantSerializer<SeqSerializer<'a>> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.inner.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::structure(vec![(self.variant, Value::array(self.inner.items))]))
    }
}

impl<'a> ser::SerializeStructVariant for VariantSerializer<MapSerializer<'a>> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::structure(vec![(self.variant, self.inner.finish())]))
    }
}

/// Members of a struct value, serialized as a map.
struct Members<'a>(&'a [(String, Value)]);

impl<'a> Serialize for Members<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for &(ref name, ref value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Serializes by shape, so a value converted with [`to_value`] comes back
/// unchanged.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        match *self.data() {
            Data::Integer(i) => serializer.serialize_i64(i),
            Data::BigInteger(ref b) => serializer.serialize_newtype_struct(BIGINT_TOKEN, &b.to_string()),
            Data::Double(ref d) => serializer.serialize_newtype_struct(DOUBLE_TOKEN, d),
            Data::Boolean(b) => serializer.serialize_bool(b),
            Data::Text(ref s) => serializer.serialize_str(s),
            Data::DateTime(ref dt) => dt.serialize(serializer),
            Data::Base64(ref bytes) => serializer.serialize_bytes(bytes),
            Data::Nil => serializer.serialize_none(),
            Data::Array(ref items) => items.serialize(serializer),
            Data::Struct(ref members) => serializer.serialize_newtype_struct(STRUCT_TOKEN, &Members(members)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::*;
    use crate::value::DateTime;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: f64,
        label: Option<String>,
    }

    #[derive(Serialize)]
    struct Empty {}

    #[derive(Serialize)]
    enum Shape {
        Dot,
        Circle(u32),
        Rect { w: u8, h: u8 },
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(Type::Int, type_of(&5).unwrap());
        assert_eq!(Type::I8, type_of(&u64::MAX).unwrap());
        assert_eq!(Type::I8, type_of(&(i64::MIN as i128 - 1)).unwrap());
        assert_eq!(Type::Double, type_of(&1.5).unwrap());
        assert_eq!(Type::Boolean, type_of(&true).unwrap());
        assert_eq!(Type::String, type_of("text").unwrap());
        assert_eq!(Type::Nil, type_of(&None::<i32>).unwrap());
        assert_eq!(Type::Nil, type_of(&()).unwrap());
    }

    #[test]
    fn test_collections() {
        assert_eq!(Type::Array, type_of(&vec![1, 2, 3]).unwrap());
        assert_eq!(Type::Array, type_of(&(1, "two")).unwrap());

        let mut map = BTreeMap::new();
        map.insert("a", 1);
        assert_eq!(Type::Struct, type_of(&map).unwrap());
        assert_eq!(Type::Array, type_of(&BTreeMap::<String, i32>::new()).unwrap());

        let mut indexed = BTreeMap::new();
        indexed.insert(0, "a");
        indexed.insert(1, "b");
        assert_eq!(Type::Array, type_of(&indexed).unwrap());
        indexed.insert(5, "c");
        let value = to_value(&indexed).unwrap();
        assert_eq!(Some(&Value::text("c")), value.get("5"));
    }

    #[test]
    fn test_records_are_structs() {
        let value = to_value(&Point { x: 1, y: 2.0, label: None }).unwrap();
        assert_eq!(Some(&Value::integer(1)), value.get("x"));
        assert_eq!(Some(&Value::double(2.0)), value.get("y"));
        assert_eq!(Some(&Value::nil()), value.get("label"));
        assert_eq!(Type::Struct, type_of(&Empty {}).unwrap());
    }

    #[test]
    fn test_enum_variants() {
        assert_eq!(Value::text("Dot"), to_value(&Shape::Dot).unwrap());
        let circle = to_value(&Shape::Circle(3)).unwrap();
        assert_eq!(Some(&Value::integer(3)), circle.get("Circle"));
        let rect = to_value(&Shape::Rect { w: 1, h: 2 }).unwrap();
        assert_eq!(Some(&Value::integer(2)), rect.get("Rect").and_then(|r| r.get("h")));
    }

    #[test]
    fn test_tagged_values_pass_through() {
        let dt = DateTime::parse("20390418T13:14:15").unwrap();
        assert_eq!(Value::datetime(dt), to_value(&dt).unwrap());

        let values = vec![
            Value::big_integer(BigInt::from(u64::MAX)),
            Value::structure(Vec::<(String, Value)>::new()),
            Value::structure(vec![("0", Value::integer(1))]),
            Value::base64(&b"bytes"[..]),
            Value::double(0.1234567),
        ];
        for value in values {
            assert_eq!(value, to_value(&value).unwrap());
        }
    }

    #[test]
    fn test_unrepresentable_key() {
        let mut map = BTreeMap::new();
        map.insert(vec![1], 1);
        match to_value(&map) {
            Err(Error::Value(msg)) => assert!(msg.starts_with("No matching XMLRPC type found")),
            other => panic!("expected a value error, got {:?}", other),
        }
    }

    #[test]
    fn test_precision_from_config() {
        let mut config = Config::default();
        config.precision = 2;
        let value = to_value_with(&3.14159, &config).unwrap();
        assert_eq!(Data::Double("3.14".to_string()), *value.data());
    }
}
