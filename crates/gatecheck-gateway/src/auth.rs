// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the gateway.
//!
//! Tenant routes carry `Authorization: Bearer {token}`, resolved against
//! the tenants table; the matched [`Tenant`] is attached to the request
//! extensions for handlers. Admin routes carry `X-Admin-Secret`. With no
//! admin secret configured, admin routes reject everything (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::server::GatewayState;

/// Middleware resolving the tenant bearer token.
pub async fn tenant_auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match gatecheck_store::queries::tenants::get_tenant_by_token(&state.db, token).await {
        Ok(Some(tenant)) => {
            request.extensions_mut().insert(tenant);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "tenant lookup failed during auth");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Middleware checking the admin secret header.
pub async fn admin_auth_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(ref expected) = state.admin_secret else {
        tracing::error!("admin surface has no secret configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided = request
        .headers()
        .get("x-admin-secret")
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected.as_str()) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
