//! Shopper identity: JWT-authenticated customer or guest session

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::cart::CartOwner;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    StoreAdmin,
    SuperAdmin,
}

/// JWT claims for customer authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Who is making the request, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Customer {
        user_id: Uuid,
        email: String,
        role: Role,
    },
    Guest {
        session_id: String,
    },
}

impl Actor {
    pub fn cart_owner(&self) -> CartOwner {
        match self {
            Self::Customer { user_id, .. } => CartOwner::Customer(*user_id),
            Self::Guest { session_id } => CartOwner::Guest(session_id.clone()),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Customer { user_id, .. } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Customer { email, .. } => Some(email.as_str()).filter(|e| !e.is_empty()),
            Self::Guest { .. } => None,
        }
    }

    /// Store or platform administrator
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Customer {
                role: Role::StoreAdmin | Role::SuperAdmin,
                ..
            }
        )
    }

    pub fn is_store_admin(&self) -> bool {
        matches!(
            self,
            Self::Customer {
                role: Role::StoreAdmin,
                ..
            }
        )
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for a user
pub fn create_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Bearer token wins over the session header; neither is a client error
pub fn actor_from_headers(headers: &HeaderMap, secret: &[u8]) -> Result<Actor, AppError> {
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let token = auth_header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("JWT validation failed: {e}");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
                _ => AppError::invalid_token("Invalid or expired token"),
            }
        })?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::invalid_token("Token subject is not a user id"))?;

        return Ok(Actor::Customer {
            user_id,
            email: token_data.claims.email,
            role: token_data.claims.role,
        });
    }

    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|session_id| Actor::Guest {
            session_id: session_id.to_string(),
        })
        .ok_or_else(|| AppError::new(ErrorCode::SessionRequired))
}

/// Middleware that resolves the [`Actor`] and stores it in request extensions
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers(), state.jwt_secret.expose_secret().as_bytes())?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
