// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod deletion;
pub mod user;

pub use activity::{metadata_keys, ActivityKind, ActivityLogEntry, ActivityStatus, NewActivity};
pub use deletion::{DeletionRequest, DeletionStatus};
pub use user::{AccountStatus, AuthProvider, PublicUser, UserProfile, UserRole};
