//! Format policies for logical types with more than one physical encoding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{LogicalType, PhysicalType, TimeUnit};

/// Largest scale the native decimal type can carry.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Physical carrier of a decimal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DecimalPhysical {
    /// Big-endian two's-complement bytes of a fixed width.
    FixedBinary { byte_len: usize },
    Int64,
    Int32,
}

impl DecimalPhysical {
    /// Maximum number of decimal digits the carrier can hold.
    pub fn max_precision(&self) -> u32 {
        match self {
            DecimalPhysical::Int32 => 9,
            DecimalPhysical::Int64 => 18,
            DecimalPhysical::FixedBinary { byte_len } => max_precision_for_bytes(*byte_len),
        }
    }
}

/// Digits that always fit into `byte_len` bytes of signed two's complement.
pub fn max_precision_for_bytes(byte_len: usize) -> u32 {
    if byte_len == 0 || byte_len > 16 {
        return 0;
    }
    let bits = (byte_len * 8 - 1) as u32;
    let max = if bits == 127 { i128::MAX } else { (1i128 << bits) - 1 };
    max.ilog10()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct DecimalFormatRepr {
    physical: DecimalPhysical,
    precision: u32,
    scale: u32,
    #[serde(default = "default_rescale_on_read")]
    rescale_on_read: bool,
}

fn default_rescale_on_read() -> bool {
    true
}

/// How decimals are laid out and whether reads rescale to this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DecimalFormatRepr", into = "DecimalFormatRepr")]
pub struct DecimalFormat {
    physical: DecimalPhysical,
    precision: u32,
    scale: u32,
    rescale_on_read: bool,
}

impl TryFrom<DecimalFormatRepr> for DecimalFormat {
    type Error = Error;

    fn try_from(repr: DecimalFormatRepr) -> Result<Self> {
        DecimalFormat::new(repr.physical, repr.precision, repr.scale, repr.rescale_on_read)
    }
}

impl From<DecimalFormat> for DecimalFormatRepr {
    fn from(format: DecimalFormat) -> Self {
        Self {
            physical: format.physical,
            precision: format.precision,
            scale: format.scale,
            rescale_on_read: format.rescale_on_read,
        }
    }
}

impl Default for DecimalFormat {
    fn default() -> Self {
        Self {
            physical: DecimalPhysical::FixedBinary { byte_len: 16 },
            precision: 38,
            scale: 9,
            rescale_on_read: true,
        }
    }
}

impl DecimalFormat {
    pub fn new(
        physical: DecimalPhysical,
        precision: u32,
        scale: u32,
        rescale_on_read: bool,
    ) -> Result<Self> {
        if let DecimalPhysical::FixedBinary { byte_len } = physical {
            if !(1..=16).contains(&byte_len) {
                return Err(Error::InvalidFormat(format!(
                    "fixed binary width {byte_len} outside 1..=16"
                )));
            }
        }
        if precision == 0 {
            return Err(Error::InvalidFormat("precision must be at least 1".into()));
        }
        if scale > precision {
            return Err(Error::InvalidFormat(format!(
                "scale {scale} exceeds precision {precision}"
            )));
        }
        if scale > MAX_DECIMAL_SCALE {
            return Err(Error::InvalidFormat(format!(
                "scale {scale} exceeds {MAX_DECIMAL_SCALE}"
            )));
        }
        let max = physical.max_precision();
        if precision > max {
            return Err(Error::InvalidFormat(format!(
                "precision {precision} does not fit {physical:?} (max {max})"
            )));
        }
        Ok(Self {
            physical,
            precision,
            scale,
            rescale_on_read,
        })
    }

    pub fn fixed_binary(byte_len: usize, precision: u32, scale: u32) -> Result<Self> {
        Self::new(DecimalPhysical::FixedBinary { byte_len }, precision, scale, true)
    }

    pub fn int64(precision: u32, scale: u32) -> Result<Self> {
        Self::new(DecimalPhysical::Int64, precision, scale, true)
    }

    pub fn int32(precision: u32, scale: u32) -> Result<Self> {
        Self::new(DecimalPhysical::Int32, precision, scale, true)
    }

    pub fn with_rescale_on_read(mut self, rescale_on_read: bool) -> Self {
        self.rescale_on_read = rescale_on_read;
        self
    }

    pub fn physical(&self) -> DecimalPhysical {
        self.physical
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn rescale_on_read(&self) -> bool {
        self.rescale_on_read
    }

    pub fn physical_type(&self) -> PhysicalType {
        match self.physical {
            DecimalPhysical::FixedBinary { byte_len } => PhysicalType::FixedLenByteArray(byte_len),
            DecimalPhysical::Int64 => PhysicalType::Int64,
            DecimalPhysical::Int32 => PhysicalType::Int32,
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        LogicalType::Decimal {
            precision: self.precision,
            scale: self.scale,
        }
    }

    /// Largest absolute unscaled value representable at this precision.
    pub fn max_unscaled(&self) -> i128 {
        max_unscaled(self.precision)
    }
}

/// `10^precision - 1`, saturating at `i128::MAX`.
pub fn max_unscaled(precision: u32) -> i128 {
    10i128
        .checked_pow(precision)
        .map(|p| p - 1)
        .unwrap_or(i128::MAX)
}

/// Physical layout of instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// 12 bytes: nanoseconds of day then Julian day. Not filterable.
    #[default]
    Int96,
    Int64Millis,
    Int64Micros,
    Int64Nanos,
}

impl TimestampFormat {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            TimestampFormat::Int96 => PhysicalType::Int96,
            _ => PhysicalType::Int64,
        }
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            TimestampFormat::Int96 => None,
            TimestampFormat::Int64Millis => Some(TimeUnit::Millis),
            TimestampFormat::Int64Micros => Some(TimeUnit::Micros),
            TimestampFormat::Int64Nanos => Some(TimeUnit::Nanos),
        }
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        self.time_unit().map(|unit| LogicalType::Timestamp { unit })
    }

    pub fn is_filterable(&self) -> bool {
        self.physical_type() != PhysicalType::Int96
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_width_precision_table() {
        assert_eq!(max_precision_for_bytes(1), 2);
        assert_eq!(max_precision_for_bytes(4), 9);
        assert_eq!(max_precision_for_bytes(8), 18);
        assert_eq!(max_precision_for_bytes(12), 28);
        assert_eq!(max_precision_for_bytes(16), 38);
        assert_eq!(max_precision_for_bytes(17), 0);
    }

    #[test]
    fn rejects_inconsistent_formats() {
        assert!(matches!(DecimalFormat::int32(10, 2), Err(Error::InvalidFormat(_))));
        assert!(matches!(DecimalFormat::int64(4, 5), Err(Error::InvalidFormat(_))));
        assert!(matches!(DecimalFormat::int64(0, 0), Err(Error::InvalidFormat(_))));
        assert!(matches!(
            DecimalFormat::fixed_binary(16, 38, 30),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            DecimalFormat::fixed_binary(0, 1, 0),
            Err(Error::InvalidFormat(_))
        ));
        assert!(DecimalFormat::fixed_binary(12, 28, 4).is_ok());
    }

    #[test]
    fn default_matches_wide_fixed_binary() {
        let format = DecimalFormat::default();
        assert_eq!(DecimalFormat::fixed_binary(16, 38, 9).unwrap(), format);
        assert_eq!(format.physical_type(), PhysicalType::FixedLenByteArray(16));
        assert_eq!(format.max_unscaled(), 10i128.pow(38) - 1);
    }

    #[test]
    fn serde_validates_on_load() {
        let ok: DecimalFormat = serde_json::from_str(
            r#"{"physical":{"type":"int64"},"precision":18,"scale":2}"#,
        )
        .unwrap();
        assert_eq!(ok, DecimalFormat::int64(18, 2).unwrap());

        let bad = serde_json::from_str::<DecimalFormat>(
            r#"{"physical":{"type":"int32"},"precision":18,"scale":2}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn only_int96_timestamps_are_unfilterable() {
        assert!(!TimestampFormat::Int96.is_filterable());
        assert!(TimestampFormat::Int64Millis.is_filterable());
        assert_eq!(TimestampFormat::Int96.logical_type(), None);
        assert_eq!(
            TimestampFormat::Int64Micros.logical_type(),
            Some(LogicalType::Timestamp { unit: TimeUnit::Micros })
        );
    }
}
