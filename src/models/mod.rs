// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the session core.

pub mod tokens;
pub mod user;

pub use tokens::{SessionTokens, TokenGrant};
pub use user::{Role, UserProfile};
