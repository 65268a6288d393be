use bytes::Bytes;

use crate::codec::{Context, ParquetType, expect_row};
use crate::descriptor::{Primitive, TypeDescriptor};
use crate::error::{Error, Result};
use crate::path::ColumnPath;
use crate::value::{Row, Value};

fn out_of_range(expected: &str, actual: impl std::fmt::Display) -> Error {
    Error::DecodeMismatch {
        path: ColumnPath::root(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

impl ParquetType for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Boolean)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Boolean(*self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            other => Err(Error::decode_mismatch("boolean", &other)),
        }
    }
}

/// Integers narrower than 32 bits are stored as `Int32` and range-checked
/// on the way back.
macro_rules! narrow_int {
    ($ty:ty, $primitive:ident, $label:literal) => {
        impl ParquetType for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::primitive::<Self>(Primitive::$primitive)
            }

            fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
                Ok(Value::Int32(i32::from(*self)))
            }

            fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
                match value {
                    Value::Int32(v) => <$ty>::try_from(v)
                        .map_err(|_| out_of_range($label, format!("int32 {v}"))),
                    other => Err(Error::decode_mismatch($label, &other)),
                }
            }
        }
    };
}

narrow_int!(i8, Int8, "int8");
narrow_int!(i16, Int16, "int16");

impl ParquetType for i32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Int32)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Int32(*self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Int32(v) => Ok(v),
            other => Err(Error::decode_mismatch("int32", &other)),
        }
    }
}

impl ParquetType for i64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Int64)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Int64(*self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Int64(v) => Ok(v),
            Value::Int32(v) => Ok(i64::from(v)),
            other => Err(Error::decode_mismatch("int64", &other)),
        }
    }
}

impl ParquetType for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Float)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Float(*self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(Error::decode_mismatch("float", &other)),
        }
    }
}

impl ParquetType for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Double)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Double(*self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            other => Err(Error::decode_mismatch("double", &other)),
        }
    }
}

impl ParquetType for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::String)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::string(self))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Binary(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|_| out_of_range("utf-8 string", "binary (invalid utf-8)")),
            other => Err(Error::decode_mismatch("utf-8 string", &other)),
        }
    }
}

impl ParquetType for Bytes {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Binary)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Binary(self.clone()))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Binary(bytes) => Ok(bytes),
            other => Err(Error::decode_mismatch("binary", &other)),
        }
    }
}

/// Rows pass through untouched. They have no derivable schema; writers of
/// generic rows supply one.
impl ParquetType for Row {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dynamic::<Self>()
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        Ok(Value::Row(self.clone()))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        expect_row(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::config::Configuration;

    #[test]
    fn narrow_ints_are_range_checked() {
        let cfg = Configuration::default();
        assert_eq!(encode(&-5i8, &cfg).unwrap(), Value::Int32(-5));
        assert_eq!(decode::<i16>(Value::Int32(300), &cfg).unwrap(), 300);

        let err = decode::<i8>(Value::Int32(300), &cfg).unwrap_err();
        assert_eq!(
            err,
            Error::DecodeMismatch {
                path: ColumnPath::root(),
                expected: "int8".into(),
                actual: "int32 300".into(),
            }
        );
    }

    #[test]
    fn widening_decodes_are_accepted() {
        let cfg = Configuration::default();
        assert_eq!(decode::<i64>(Value::Int32(7), &cfg).unwrap(), 7);
        assert_eq!(decode::<f64>(Value::Float(0.5), &cfg).unwrap(), 0.5);
        assert!(decode::<i32>(Value::Int64(7), &cfg).is_err());
    }

    #[test]
    fn strings_are_utf8_binary() {
        let cfg = Configuration::default();
        let value = encode(&"héllo".to_string(), &cfg).unwrap();
        assert_eq!(value, Value::string("héllo"));
        assert_eq!(decode::<String>(value, &cfg).unwrap(), "héllo");

        let err = decode::<String>(Value::binary(vec![0xff, 0xfe]), &cfg).unwrap_err();
        assert!(matches!(err, Error::DecodeMismatch { .. }));
    }

    #[test]
    fn mismatch_reports_actual_kind() {
        let err = decode::<bool>(Value::Int32(1), &Configuration::default()).unwrap_err();
        assert_eq!(err.to_string(), "decode mismatch at '<root>': expected boolean, found int32");
    }
}
