// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Batch Name Value Object
//!
//! The remote processing service groups documents by a "creator id". A
//! processing batch registers its documents under
//! `"{batch_prefix}_{proc_batch_id}"`, which later lets the driver query all
//! tasks belonging to its own batches. The prefix must be unique per
//! deployment: the remote service keys documents on `(target_id, creator)`,
//! so two deployments sharing a prefix would silently collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment-unique name of a processing batch in the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcBatchName(String);

impl ProcBatchName {
    pub fn new(batch_prefix: &str, proc_batch_id: i64) -> Self {
        Self(format!("{}_{}", batch_prefix, proc_batch_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcBatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
