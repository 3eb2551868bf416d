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

use std::num::NonZeroUsize;

use rdt_hw_port::InterfaceChoice;
use rdt_hw_port::Verbosity;

use crate::defaults::default_interface;
use crate::defaults::default_retain_stopped_groups;
use crate::defaults::default_verbosity;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RdtConfig {
    pub hardware: Hardware,
    pub monitoring: Monitoring,
    pub logs: Logs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hardware {
    pub interface: InterfaceChoice,
    pub verbosity: Verbosity,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Monitoring {
    /// Upper bound of simultaneously active groups, on top of the hardware RMID limit.
    pub max_groups: Option<NonZeroUsize>,
    /// Keep stopped groups readable until they are released explicitly.
    pub retain_stopped_groups: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Logs {
    pub log_level: tracing_subscriber::filter::LevelFilter,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            verbosity: default_verbosity(),
        }
    }
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            max_groups: None,
            retain_stopped_groups: default_retain_stopped_groups(),
        }
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            log_level: crate::LogLevel::from(default_verbosity()).to_tracing_filter(),
        }
    }
}
