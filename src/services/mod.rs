// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - identity, tokens and owner-scoped storage access.

pub mod github;
pub mod oauth;
pub mod ownership;
pub mod principal;
pub mod token;

pub use github::{GithubClient, GithubEndpoints, IdentityProvider};
pub use oauth::{AuthorizationRequest, IdentityProviderClient};
pub use ownership::OwnerScope;
pub use principal::PrincipalResolver;
pub use token::{IssuedToken, TokenService};
