//! Service errors folded into [`AppError`] at the HTTP boundary
//!
//! Business rejections carry their specific [`ErrorCode`] and details.
//! Infrastructure failures are logged here with their cause and reach the
//! client as a generic system error.

use axum::Json;
use shared::error::{ApiResponse, AppError, ErrorCode};

use crate::cart::CartError;
use crate::checkout::{CheckoutError, ReconcileError};
use crate::ledger::LedgerError;
use crate::payment::PaymentError;

/// Handler result with the standard response envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound(key) => AppError::new(ErrorCode::CartItemNotFound)
                .with_detail("itemKey", key.to_string()),
            CartError::InvalidQuantity(quantity) => AppError::new(ErrorCode::CartQuantityInvalid)
                .with_detail("quantity", quantity),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ProductNotFound(product_id) => AppError::new(ErrorCode::ProductNotFound)
                .with_detail("productId", product_id.to_string()),
            LedgerError::VariantNotFound {
                product_id,
                variant_id,
            } => AppError::new(ErrorCode::VariantNotFound)
                .with_detail("productId", product_id.to_string())
                .with_detail("variantId", variant_id.to_string()),
            LedgerError::InsufficientStock {
                unit,
                requested,
                available,
            } => AppError::new(ErrorCode::ProductOutOfStock)
                .with_detail("itemKey", unit.to_string())
                .with_detail("requested", requested)
                .with_detail("available", available),
            LedgerError::AddressNotFound(address_id) => AppError::new(ErrorCode::AddressNotFound)
                .with_detail("addressId", address_id.to_string()),
            LedgerError::OrderNotFound(order_id) => AppError::new(ErrorCode::OrderNotFound)
                .with_detail("orderId", order_id.to_string()),
            LedgerError::InvalidTransition { from, to } => AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                format!("Order cannot move from {from} to {to}"),
            )
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
            LedgerError::Database(db_err) => {
                tracing::error!(error = %db_err, "Ledger database error");
                AppError::new(ErrorCode::DatabaseError)
            }
            LedgerError::Corrupt(reason) => {
                tracing::error!(error = %reason, "Ledger returned corrupt data");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        tracing::error!(error = %e, "Payment gateway error");
        match e {
            PaymentError::Timeout(_) => AppError::new(ErrorCode::TimeoutError),
            PaymentError::Transport(_) => AppError::new(ErrorCode::NetworkError),
            PaymentError::Rejected { .. }
            | PaymentError::InvalidAmount(_)
            | PaymentError::Malformed(_) => AppError::new(ErrorCode::PaymentFailed),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart => AppError::new(ErrorCode::CartEmpty),
            CheckoutError::BlankAddressField(field) => AppError::with_message(
                ErrorCode::RequiredField,
                format!("Address field '{field}' is required"),
            )
            .with_detail("field", field),
            CheckoutError::Cart(e) => e.into(),
            CheckoutError::Ledger(e) => e.into(),
            CheckoutError::PaymentInitiation(e) => {
                tracing::error!(error = %e, "Payment initiation failed, order rolled back");
                AppError::new(ErrorCode::PaymentInitiationFailed)
            }
            CheckoutError::NotAuthenticated => AppError::not_authenticated(),
            CheckoutError::NotOrderOwner(order_id) => {
                AppError::permission_denied("Order belongs to another customer")
                    .with_detail("orderId", order_id.to_string())
            }
            CheckoutError::AdminRequired => AppError::new(ErrorCode::AdminRequired),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::InvalidSignature => AppError::new(ErrorCode::InvalidSignature),
            ReconcileError::Malformed(parse_err) => {
                AppError::with_message(ErrorCode::InvalidFormat, parse_err.to_string())
            }
            ReconcileError::Ledger(e) => e.into(),
            ReconcileError::Gateway(e) => e.into(),
        }
    }
}
