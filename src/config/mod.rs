// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration module for perfcore
//!
//! User settings live in a JSON file; per-tier override documents are
//! fetched separately and can change at runtime.

pub mod overrides;
pub mod settings;

pub use overrides::*;
pub use settings::*;
