// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Realty-Session: session lifecycle for the real-estate marketplace client
//!
//! This crate owns the client side of authentication: token storage, the
//! auth context state machine, silent token refresh, login-redirect
//! ingestion and route guards. A loopback agent built on the same pieces
//! ships as the `realty-session` binary.

pub mod api;
pub mod callback;
pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod navigation;
pub mod refresh;
pub mod routes;
pub mod store;
pub mod time_utils;

use config::Config;
use context::AuthContext;

/// Shared agent state.
pub struct AppState {
    pub config: Config,
    pub context: AuthContext,
}
