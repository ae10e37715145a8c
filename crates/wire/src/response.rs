// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The flat success/error envelope every REST response and WebSocket
//! push is wrapped in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Envelope<T> {
    Ok { data: T },
    Err { error: String },
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok { data }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self::Err { error: message.into() }
    }
}
