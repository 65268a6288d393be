use serde::{Deserialize, Serialize};

use crate::policy::{DecimalFormat, TimestampFormat};

/// Format policies for one read, write or filter operation.
///
/// Always passed explicitly; two operations with different configurations
/// never observe each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub decimal: DecimalFormat,
    pub timestamp: TimestampFormat,
}

impl Configuration {
    pub fn new(decimal: DecimalFormat, timestamp: TimestampFormat) -> Self {
        Self { decimal, timestamp }
    }

    pub fn with_decimal(mut self, decimal: DecimalFormat) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_timestamp(mut self, timestamp: TimestampFormat) -> Self {
        self.timestamp = timestamp;
        self
    }
}
