//! Error category classification

use super::codes::ErrorCode;
use serde::Serialize;

/// Domain of an error code, taken from its thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Tenant,
    Order,
    Payment,
    Product,
    Cart,
    /// 8xxx and above: infrastructure, logged server-side
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::Tenant,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Product,
            7 => Self::Cart,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
