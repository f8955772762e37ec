//! Reading user types back out of a [`Value`].

use num::ToPrimitive;
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{
    self, Deserialize, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::error::{Error, Result};

use super::{Data, DateTime, Value};

/// Deserializes a `T` from `value`.
///
/// Integers, doubles and strings convert the way serde's primitive visitors
/// allow, a dateTime reads as its canonical string, and a struct with one
/// member can hold an enum variant.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Value;

    fn into_deserializer(self) -> Value {
        self
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

impl<'de> Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.into_data() {
            Data::Integer(i) => visitor.visit_i64(i),
            Data::BigInteger(b) => {
                if let Some(u) = b.to_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = b.to_i128() {
                    visitor.visit_i128(i)
                } else {
                    visitor.visit_string(b.to_string())
                }
            }
            Data::Double(d) => match d.parse::<f64>() {
                Ok(f) => visitor.visit_f64(f),
                Err(_) => visitor.visit_string(d),
            },
            Data::Boolean(b) => visitor.visit_bool(b),
            Data::Text(s) => visitor.visit_string(s),
            Data::DateTime(dt) => visitor.visit_string(dt.to_string()),
            Data::Base64(bytes) => visitor.visit_byte_buf(bytes),
            Data::Nil => visitor.visit_unit(),
            Data::Array(items) => visit_array(items, visitor),
            Data::Struct(members) => {
                let mut map = MapDeserializer::new(members.into_iter());
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.is_nil() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.into_data() {
            // Vec<u8> reads base64 as a sequence of bytes
            Data::Base64(bytes) => visit_array(bytes.into_iter().map(Value::from).collect(), visitor),
            data => Value::from_data(data).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.into_data() {
            Data::Text(variant) => visitor.visit_enum(EnumDeserializer { variant, value: None }),
            Data::Struct(mut members) if members.len() == 1 => {
                let (variant, value) = members.remove(0);
                visitor.visit_enum(EnumDeserializer { variant, value: Some(value) })
            }
            other => Err(Error::value(format!("Expected an enum variant, got {:?}", other))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, VariantDeserializer)> {
        let variant: de::value::StringDeserializer<Error> = self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            None => Ok(()),
            Some(value) if value.is_nil() => Ok(()),
            Some(value) => Err(Error::value(format!("Expected a unit variant, got {:?}", value))),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value> {
        match self.value {
            Some(value) => seed.deserialize(value),
            None => Err(Error::value("Expected a newtype variant")),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.value {
            Some(value) => value.deserialize_seq(visitor),
            None => Err(Error::value("Expected a tuple variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        match self.value {
            Some(value) => value.deserialize_any(visitor),
            None => Err(Error::value("Expected a struct variant")),
        }
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<DateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse(&text).map_err(de::Error::custom)
    }
}
