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

use eyre::eyre;
use rdt_hw_port::InterfaceChoice;
use rdt_hw_port::Verbosity;
use serde::Deserialize;
use serde::Serialize;

use super::defaults::default_interface;
use super::defaults::default_retain_stopped_groups;
use super::defaults::default_verbosity;
use crate::*;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedRdtConfig {
    #[serde(default)]
    pub hardware: UnresolvedHardware,
    #[serde(default)]
    pub monitoring: UnresolvedMonitoring,
    #[serde(default)]
    pub logs: UnresolvedLogs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedHardware {
    #[serde(default = "default_interface")]
    pub interface: InterfaceChoice,

    #[serde(default = "default_verbosity")]
    pub verbosity: Verbosity,
}

impl Default for UnresolvedHardware {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            verbosity: default_verbosity(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedMonitoring {
    pub max_groups: Option<usize>,

    #[serde(default = "default_retain_stopped_groups")]
    pub retain_stopped_groups: bool,
}

impl Default for UnresolvedMonitoring {
    fn default() -> Self {
        Self {
            max_groups: None,
            retain_stopped_groups: default_retain_stopped_groups(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedLogs {
    /// Falls back to a level matching the hardware verbosity.
    pub log_level: Option<LogLevel>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl UnresolvedRdtConfig {
    pub fn resolve(self) -> eyre::Result<RdtConfig> {
        let hardware = self.hardware.resolve();
        let monitoring = self.monitoring.resolve()?;
        let logs = self.logs.resolve(hardware.verbosity);

        let config = RdtConfig {
            hardware,
            monitoring,
            logs,
        };
        Ok(config)
    }
}

impl UnresolvedHardware {
    pub fn resolve(self) -> Hardware {
        Hardware {
            interface: self.interface,
            verbosity: self.verbosity,
        }
    }
}

impl UnresolvedMonitoring {
    pub fn resolve(self) -> eyre::Result<Monitoring> {
        let max_groups = match self.max_groups {
            Some(max_groups) => Some(
                NonZeroUsize::new(max_groups)
                    .ok_or_else(|| eyre!("monitoring.max-groups should be greater than zero"))?,
            ),
            None => None,
        };

        let monitoring = Monitoring {
            max_groups,
            retain_stopped_groups: self.retain_stopped_groups,
        };
        Ok(monitoring)
    }
}

impl UnresolvedLogs {
    pub fn resolve(self, verbosity: Verbosity) -> Logs {
        let log_level = self.log_level.unwrap_or_else(|| verbosity.into());
        Logs {
            log_level: log_level.to_tracing_filter(),
        }
    }
}

impl LogLevel {
    pub fn to_tracing_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;

        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<Verbosity> for LogLevel {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Silent => LogLevel::Off,
            Verbosity::Default => LogLevel::Warn,
            Verbosity::Verbose => LogLevel::Info,
            Verbosity::SuperVerbose => LogLevel::Debug,
        }
    }
}
