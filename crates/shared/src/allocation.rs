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

use serde::Deserialize;
use serde::Serialize;

/// Cache ways mask of a class of service. With CDP enabled the class carries separate
/// masks for code and data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMask {
    Unified(u64),
    Split { code: u64, data: u64 },
}

impl CacheMask {
    /// Builds a mask from the native record layout, where `cdp` tells which of the
    /// overlapping fields is meaningful.
    pub fn from_raw(cdp: bool, ways_mask: u64, code_mask: u64, data_mask: u64) -> Self {
        if cdp {
            CacheMask::Split {
                code: code_mask,
                data: data_mask,
            }
        } else {
            CacheMask::Unified(ways_mask)
        }
    }

    pub fn is_cdp(&self) -> bool {
        matches!(self, CacheMask::Split { .. })
    }

    /// Mask covering every way used by the class.
    pub fn ways_mask(&self) -> u64 {
        match *self {
            CacheMask::Unified(mask) => mask,
            CacheMask::Split { code, data } => code | data,
        }
    }

    pub fn code_mask(&self) -> u64 {
        match *self {
            CacheMask::Unified(mask) => mask,
            CacheMask::Split { code, .. } => code,
        }
    }

    pub fn data_mask(&self) -> u64 {
        match *self {
            CacheMask::Unified(mask) => mask,
            CacheMask::Split { data, .. } => data,
        }
    }
}
