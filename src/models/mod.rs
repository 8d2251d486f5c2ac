// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod adventure;

pub use adventure::{
    Adventure, AdventureCreate, AdventureQuery, ListParams, SortColumn, SortOrder, SweepRequest,
    SweepResponse,
};
