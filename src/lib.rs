// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Rollcall: account lifecycle and activity-audit service.
//!
//! This crate provides the backend API for account registration, login,
//! Google sign-in, admin user management, account deletion, and the
//! append-only activity log behind all of it.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AccountService, ActivityLogService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub account: AccountService,
    pub activity: ActivityLogService,
}
