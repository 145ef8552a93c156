//! Checkout error codes
//!
//! The number is what storefront clients switch on; the message is for
//! developers and logs.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    Unknown = 1,
    /// Body parsed but is not what the endpoint expects
    InvalidFormat = 6,
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    NotAuthenticated = 1001,
    TokenExpired = 1003,
    TokenInvalid = 1004,
    /// Neither a bearer token nor a guest session id was supplied
    SessionRequired = 1008,

    // ==================== 2xxx: Permission ====================
    PermissionDenied = 2001,
    AdminRequired = 2003,

    // ==================== 3xxx: Store ====================
    TenantNotSelected = 3001,
    TenantNotFound = 3002,

    // ==================== 4xxx: Order ====================
    OrderNotFound = 4001,
    OrderInvalidTransition = 4008,
    AddressNotFound = 4010,

    // ==================== 5xxx: Payment ====================
    PaymentFailed = 5001,
    /// Gateway refused or could not start the transaction; nothing was persisted
    PaymentInitiationFailed = 5006,
    InvalidSignature = 5007,

    // ==================== 6xxx: Product / stock ====================
    ProductNotFound = 6001,
    ProductOutOfStock = 6003,
    VariantNotFound = 6005,

    // ==================== 7xxx: Cart ====================
    CartEmpty = 7001,
    CartItemNotFound = 7002,
    CartQuantityInvalid = 7003,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    NetworkError = 9003,
    TimeoutError = 9004,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 28] = [
        Self::Success,
        Self::Unknown,
        Self::InvalidFormat,
        Self::RequiredField,
        Self::NotAuthenticated,
        Self::TokenExpired,
        Self::TokenInvalid,
        Self::SessionRequired,
        Self::PermissionDenied,
        Self::AdminRequired,
        Self::TenantNotSelected,
        Self::TenantNotFound,
        Self::OrderNotFound,
        Self::OrderInvalidTransition,
        Self::AddressNotFound,
        Self::PaymentFailed,
        Self::PaymentInitiationFailed,
        Self::InvalidSignature,
        Self::ProductNotFound,
        Self::ProductOutOfStock,
        Self::VariantNotFound,
        Self::CartEmpty,
        Self::CartItemNotFound,
        Self::CartQuantityInvalid,
        Self::InternalError,
        Self::DatabaseError,
        Self::NetworkError,
        Self::TimeoutError,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "An unknown error occurred",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field is missing",

            Self::NotAuthenticated => "Sign in required",
            Self::TokenExpired => "Authentication token has expired",
            Self::TokenInvalid => "Authentication token is invalid",
            Self::SessionRequired => "Missing session",

            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Store administrator role is required",

            Self::TenantNotSelected => "Store context missing",
            Self::TenantNotFound => "Store not found",

            Self::OrderNotFound => "Order not found",
            Self::OrderInvalidTransition => "Order status transition not allowed",
            Self::AddressNotFound => "Address not found",

            Self::PaymentFailed => "Payment gateway request failed",
            Self::PaymentInitiationFailed => "Payment initialization failed",
            Self::InvalidSignature => "Invalid signature",

            Self::ProductNotFound => "Product not found",
            Self::ProductOutOfStock => "Insufficient stock",
            Self::VariantNotFound => "Product variant not found",

            Self::CartEmpty => "Cart is empty",
            Self::CartItemNotFound => "Item not found in cart",
            Self::CartQuantityInvalid => "Quantity must be between 1 and 9999",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Upstream service unreachable",
            Self::TimeoutError => "Upstream service timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A number that is not one of the [`ErrorCode`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
