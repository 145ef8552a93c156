//! HTTP status for each error code

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::TenantNotFound
            | Self::OrderNotFound
            | Self::AddressNotFound
            | Self::ProductNotFound
            | Self::VariantNotFound
            | Self::CartItemNotFound => StatusCode::NOT_FOUND,

            // Request was valid but the current state forbids it
            Self::OrderInvalidTransition | Self::ProductOutOfStock => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied | Self::AdminRequired => StatusCode::FORBIDDEN,

            Self::PaymentInitiationFailed | Self::PaymentFailed => StatusCode::BAD_GATEWAY,

            // Transient; safe to retry
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError | Self::DatabaseError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            Self::InvalidFormat
            | Self::RequiredField
            | Self::SessionRequired
            | Self::TenantNotSelected
            | Self::InvalidSignature
            | Self::CartEmpty
            | Self::CartQuantityInvalid => StatusCode::BAD_REQUEST,
        }
    }
}
