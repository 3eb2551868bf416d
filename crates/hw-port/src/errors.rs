/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use thiserror::Error as ThisError;

/// Errors reported by a hardware access port.
#[derive(ThisError, Clone, Debug, PartialEq, Eq)]
pub enum HwError {
    #[error("hardware resource is busy")]
    Busy,

    #[error("communication with the hardware interface failed: {reason}")]
    Transport { reason: String },

    #[error("hardware counter overflow")]
    Overflow,

    #[error("not supported by the hardware: {reason}")]
    Unsupported { reason: String },

    #[error("hardware rejected a parameter: {reason}")]
    InvalidArgument { reason: String },

    #[error("platform library initialization failed: {reason}")]
    Init { reason: String },
}

impl HwError {
    pub fn transport(reason: impl ToString) -> Self {
        Self::Transport {
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(reason: impl ToString) -> Self {
        Self::Unsupported {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_argument(reason: impl ToString) -> Self {
        Self::InvalidArgument {
            reason: reason.to_string(),
        }
    }

    pub fn init(reason: impl ToString) -> Self {
        Self::Init {
            reason: reason.to_string(),
        }
    }

    /// Contention that goes away by itself, a caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
