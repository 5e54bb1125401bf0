// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Target Reference Value Object
//!
//! The identity key of a work item: the source catalog id together with the
//! locator the processing environment fetches the content from. The status
//! ledger upserts on this key, so an item exists at most once regardless of
//! how often a source adapter re-produces it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a work item: `(target_id, target_url)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    target_id: String,
    target_url: String,
}

impl TargetRef {
    pub fn new(target_id: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            target_url: target_url.into(),
        }
    }

    /// External identifier in the source catalog.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Locator the processing environment uses to fetch the content.
    pub fn target_url(&self) -> &str {
        &self.target_url
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.target_id, self.target_url)
    }
}
