//! Unified error system for the storefront
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: domain of a code, from its thousands digit
//! - [`AppError`]: code plus message plus optional details
//! - [`ApiResponse`]: JSON envelope for every endpoint
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Tenant errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product and stock errors
//! - 7xxx: Cart errors
//! - 9xxx: System errors (logged, never detailed to clients)
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::CartEmpty);
//!
//! let err = AppError::new(ErrorCode::ProductOutOfStock)
//!     .with_detail("productId", "p-1");
//!
//! let response = ApiResponse::<()>::from(err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};
