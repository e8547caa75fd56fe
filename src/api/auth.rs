use std::collections::HashMap;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use thiserror::Error;

use crate::task::OwnerId;

use super::{AppState, error::ApiError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,
}

/// Resolves an opaque bearer token to the owner it was issued for.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<OwnerId, AuthError>;
}

/// Verifier backed by a fixed token table, usually loaded from settings.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, OwnerId>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: impl IntoIterator<Item = (String, String)>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|(token, _)| !token.trim().is_empty())
            .map(|(token, owner)| (token, OwnerId::new(owner)))
            .collect();

        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<OwnerId, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Owner identity of the caller, extracted from the `Authorization` header.
pub struct AuthenticatedOwner(pub OwnerId);

impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let owner = state.verifier.verify(token)?;

        Ok(AuthenticatedOwner(owner))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header_value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();

    (!token.is_empty()).then_some(token)
}
