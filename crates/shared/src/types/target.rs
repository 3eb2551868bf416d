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

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use super::LogicalCoreId;
use super::ProcessId;

/// What a monitoring group observes. The kind is fixed for the whole life of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitoringTarget {
    /// Core to RMID association is static once assigned, so the set never changes.
    Cores(BTreeSet<LogicalCoreId>),
    /// Processes can join and leave the group while it's active.
    Processes(BTreeSet<ProcessId>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Cores,
    Processes,
}

impl MonitoringTarget {
    pub fn cores(core_ids: impl IntoIterator<Item = LogicalCoreId>) -> Self {
        Self::Cores(core_ids.into_iter().collect())
    }

    pub fn processes(pids: impl IntoIterator<Item = ProcessId>) -> Self {
        Self::Processes(pids.into_iter().collect())
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Cores(_) => TargetKind::Cores,
            Self::Processes(_) => TargetKind::Processes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Cores(core_ids) => core_ids.len(),
            Self::Processes(pids) => pids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn core_ids(&self) -> Option<&BTreeSet<LogicalCoreId>> {
        match self {
            Self::Cores(core_ids) => Some(core_ids),
            Self::Processes(_) => None,
        }
    }

    pub fn pids(&self) -> Option<&BTreeSet<ProcessId>> {
        match self {
            Self::Cores(_) => None,
            Self::Processes(pids) => Some(pids),
        }
    }

    /// Mutable access to the process set, `None` for core targets.
    pub fn pids_mut(&mut self) -> Option<&mut BTreeSet<ProcessId>> {
        match self {
            Self::Cores(_) => None,
            Self::Processes(pids) => Some(pids),
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Cores => write!(f, "cores"),
            TargetKind::Processes => write!(f, "processes"),
        }
    }
}
