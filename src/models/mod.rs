// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod goal;
pub mod principal;

pub use goal::{
    Category, Goal, GoalInput, GoalStatus, Milestone, MilestoneEntry, MilestoneInput, MilestonePatch,
    Priority,
};
pub use principal::{Principal, PrincipalResponse, ProviderProfile};
