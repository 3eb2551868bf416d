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

use crate::types::LogicalCoreId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuVendor {
    #[default]
    Unknown,
    Intel,
    Amd,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub detected: bool,
    pub num_ways: u32,
    pub num_sets: u32,
    pub num_partitions: u32,
    pub line_size: u32,
    pub total_size: u64,
    pub way_size: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreInfo {
    pub lcore: LogicalCoreId,
    pub socket: u32,
    pub l3_id: u32,
    pub l2_id: u32,
    pub l3cat_id: u32,
    pub mba_id: u32,
    pub numa: u32,
}

/// CPU topology as reported by the platform library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub vendor: CpuVendor,
    pub l2: CacheInfo,
    pub l3: CacheInfo,
    pub cores: Vec<CoreInfo>,
}

impl CpuInfo {
    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn find_core(&self, lcore: LogicalCoreId) -> Option<&CoreInfo> {
        self.cores.iter().find(|core| core.lcore == lcore)
    }

    pub fn contains_core(&self, lcore: LogicalCoreId) -> bool {
        self.find_core(lcore).is_some()
    }
}
