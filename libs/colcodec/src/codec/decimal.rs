use bytes::Bytes;
use rust_decimal::Decimal;

use crate::codec::{Context, ParquetType};
use crate::descriptor::{Primitive, TypeDescriptor};
use crate::error::{Error, Result};
use crate::path::ColumnPath;
use crate::policy::{DecimalFormat, DecimalPhysical, max_unscaled};
use crate::value::Value;

/// Change the scale of an unscaled integer. Reducing the scale rounds half
/// away from zero. `None` on overflow.
pub(crate) fn rescale_unscaled(unscaled: i128, from: u32, to: u32) -> Option<i128> {
    if to >= from {
        return unscaled.checked_mul(10i128.checked_pow(to - from)?);
    }
    let divisor = 10i128.checked_pow(from - to)?;
    let quotient = unscaled / divisor;
    let remainder = (unscaled % divisor).unsigned_abs();
    if remainder * 2 >= divisor.unsigned_abs() {
        quotient.checked_add(unscaled.signum())
    } else {
        Some(quotient)
    }
}

/// Sign-extending read of big-endian two's complement, 1 to 16 bytes.
pub(crate) fn unscaled_from_bytes(bytes: &[u8]) -> Option<i128> {
    let len = bytes.len();
    if len == 0 || len > 16 {
        return None;
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - len..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

/// Low `byte_len` bytes of the big-endian form. Callers guarantee the value
/// fits.
pub(crate) fn to_fixed_bytes(unscaled: i128, byte_len: usize) -> Bytes {
    let full = unscaled.to_be_bytes();
    Bytes::copy_from_slice(&full[16 - byte_len.min(16)..])
}

/// Physical scalar for `unscaled` already at `format`'s scale.
pub(crate) fn encode_unscaled(unscaled: i128, format: &DecimalFormat) -> Result<Value> {
    if unscaled.unsigned_abs() > max_unscaled(format.precision()).unsigned_abs() {
        return Err(Error::overflow(format!(
            "unscaled {unscaled} exceeds precision {}",
            format.precision()
        )));
    }
    match format.physical() {
        DecimalPhysical::Int32 => i32::try_from(unscaled)
            .map(Value::Int32)
            .map_err(|_| Error::overflow(format!("unscaled {unscaled} exceeds int32"))),
        DecimalPhysical::Int64 => i64::try_from(unscaled)
            .map(Value::Int64)
            .map_err(|_| Error::overflow(format!("unscaled {unscaled} exceeds int64"))),
        DecimalPhysical::FixedBinary { byte_len } => {
            Ok(Value::Binary(to_fixed_bytes(unscaled, byte_len)))
        }
    }
}

/// Rescale a native decimal to the configured scale and emit its physical
/// scalar.
pub(crate) fn encode_decimal(value: &Decimal, format: &DecimalFormat) -> Result<Value> {
    let unscaled = rescale_unscaled(value.mantissa(), value.scale(), format.scale())
        .ok_or_else(|| {
            Error::overflow(format!("{value} cannot be rescaled to {}", format.scale()))
        })?;
    encode_unscaled(unscaled, format)
}

/// Native decimal for `unscaled` at `scale`. Values whose mantissa needs more
/// than 96 bits at `scale` drop trailing zero digits until they fit; the
/// numeric value is unchanged.
pub(crate) fn native_decimal(mut unscaled: i128, mut scale: u32) -> Option<Decimal> {
    loop {
        if let Ok(decimal) = Decimal::try_from_i128_with_scale(unscaled, scale) {
            return Some(decimal);
        }
        if scale == 0 || unscaled % 10 != 0 {
            return None;
        }
        unscaled /= 10;
        scale -= 1;
    }
}

fn unrepresentable(actual: String) -> Error {
    Error::DecodeMismatch {
        path: ColumnPath::root(),
        expected: "decimal within 96-bit mantissa and scale 28".into(),
        actual,
    }
}

impl ParquetType for Decimal {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Decimal)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_decimal(self, &ctx.config().decimal)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        let format = ctx.config().decimal;
        let (unscaled, scale) = match value {
            Value::Int32(v) => (i128::from(v), format.scale()),
            Value::Int64(v) => (i128::from(v), format.scale()),
            Value::Binary(ref bytes) => match unscaled_from_bytes(bytes) {
                Some(unscaled) => (unscaled, format.scale()),
                None => return Err(Error::decode_mismatch("decimal bytes (1..=16)", &value)),
            },
            Value::Decimal(stored) if format.rescale_on_read() => {
                let unscaled = rescale_unscaled(stored.unscaled, stored.scale, format.scale())
                    .ok_or_else(|| unrepresentable(stored.to_string()))?;
                (unscaled, format.scale())
            }
            Value::Decimal(stored) => (stored.unscaled, stored.scale),
            other => return Err(Error::decode_mismatch("decimal", &other)),
        };
        native_decimal(unscaled, scale)
            .ok_or_else(|| unrepresentable(format!("unscaled {unscaled} at scale {scale}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::config::Configuration;
    use crate::value::DecimalValue;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rescale_rounds_half_away_from_zero() {
        assert_eq!(rescale_unscaled(12345, 3, 1), Some(123));
        assert_eq!(rescale_unscaled(12350, 3, 1), Some(124));
        assert_eq!(rescale_unscaled(-12350, 3, 1), Some(-124));
        assert_eq!(rescale_unscaled(-12349, 3, 1), Some(-123));
        assert_eq!(rescale_unscaled(5, 1, 4), Some(5000));
        assert_eq!(rescale_unscaled(i128::MAX, 0, 1), None);
    }

    #[test]
    fn fixed_bytes_sign_extend() {
        for v in [0i128, 1, -1, 255, -256, 10i128.pow(20), -(10i128.pow(20))] {
            let bytes = to_fixed_bytes(v, 12);
            assert_eq!(bytes.len(), 12);
            assert_eq!(unscaled_from_bytes(&bytes), Some(v));
        }
        assert_eq!(unscaled_from_bytes(&[]), None);
    }

    #[test]
    fn encodes_per_physical_carrier() {
        let int32 = Configuration::default().with_decimal(DecimalFormat::int32(9, 2).unwrap());
        assert_eq!(encode(&dec("12.345"), &int32).unwrap(), Value::Int32(1235));

        let int64 = Configuration::default().with_decimal(DecimalFormat::int64(18, 4).unwrap());
        assert_eq!(encode(&dec("-1.5"), &int64).unwrap(), Value::Int64(-15000));

        let fixed = Configuration::default()
            .with_decimal(DecimalFormat::fixed_binary(4, 9, 2).unwrap());
        assert_eq!(
            encode(&dec("-0.01"), &fixed).unwrap(),
            Value::binary(vec![0xff, 0xff, 0xff, 0xff])
        );
    }

    #[test]
    fn overflowing_precision_is_rejected() {
        let cfg = Configuration::default().with_decimal(DecimalFormat::int32(4, 2).unwrap());
        let err = encode(&dec("100.00"), &cfg).unwrap_err();
        assert!(matches!(err, Error::EncodeOverflow { .. }));
    }

    #[test]
    fn stored_decimal_honours_rescale_flag() {
        let stored = Value::Decimal(DecimalValue::new(1234, 10, 2));
        let format = DecimalFormat::int64(18, 4).unwrap();

        let rescaled = Configuration::default().with_decimal(format);
        let got = decode::<Decimal>(stored.clone(), &rescaled).unwrap();
        assert_eq!(got, dec("12.34"));
        assert_eq!(got.scale(), 4);

        let preserved = Configuration::default().with_decimal(format.with_rescale_on_read(false));
        let got = decode::<Decimal>(stored, &preserved).unwrap();
        assert_eq!(got.scale(), 2);
        assert_eq!(got.mantissa(), 1234);
    }

    #[test]
    fn default_format_round_trips() {
        let cfg = Configuration::default();
        let value = dec("-98765.4321");
        let encoded = encode(&value, &cfg).unwrap();
        assert!(matches!(&encoded, Value::Binary(b) if b.len() == 16));
        assert_eq!(decode::<Decimal>(encoded, &cfg).unwrap(), value);
    }

    #[test]
    fn wide_values_round_trip_at_default_scale() {
        let cfg = Configuration::default();
        for text in [
            "100000000000000000000",
            "-79228162514264337593543950335",
            "79228162514264337593543950335",
            "12345678901234567890.123456789",
        ] {
            let value = dec(text);
            let encoded = encode(&value, &cfg).unwrap();
            assert_eq!(decode::<Decimal>(encoded, &cfg).unwrap(), value, "{text}");
        }
    }

    #[test]
    fn trailing_zeros_are_dropped_only_when_needed() {
        assert_eq!(native_decimal(1234, 2).map(|d| d.scale()), Some(2));
        let wide = 10i128.pow(29);
        let got = native_decimal(wide, 9).unwrap();
        assert_eq!(got, dec("100000000000000000000"));
        assert_eq!(native_decimal(wide + 1, 9), None);
    }
}
