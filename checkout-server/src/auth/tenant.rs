//! Store (tenant) resolution from the `X-Tenant-Id` header

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::state::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Store the request operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant {
    pub store_id: Uuid,
}

/// Middleware that checks the store exists and inserts [`Tenant`] into request extensions
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::TenantNotSelected))?;

    let store_id = Uuid::parse_str(raw).map_err(|_| {
        AppError::new(ErrorCode::TenantNotFound).with_detail("tenantId", raw.to_string())
    })?;

    if !state.ledger.store_exists(store_id).await? {
        return Err(
            AppError::new(ErrorCode::TenantNotFound).with_detail("tenantId", store_id.to_string())
        );
    }

    request.extensions_mut().insert(Tenant { store_id });
    Ok(next.run(request).await)
}
