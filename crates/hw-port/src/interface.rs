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

/// How the platform library reaches the hardware.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceChoice {
    /// Model specific registers.
    Msr,
    /// OS interface, resctrl on Linux.
    Os,
    /// OS interface with resctrl based monitoring.
    OsResctrlMon,
    /// Let the library pick the best available one.
    #[default]
    Auto,
}

/// Verbosity of the platform library's own logging.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// No messages at all.
    Silent,
    /// Warnings and errors.
    #[default]
    Default,
    /// Adds informational messages.
    Verbose,
    /// Adds debug messages.
    SuperVerbose,
}

impl std::fmt::Display for InterfaceChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InterfaceChoice::Msr => "MSR",
            InterfaceChoice::Os => "OS",
            InterfaceChoice::OsResctrlMon => "OS_RESCTRL_MON",
            InterfaceChoice::Auto => "AUTO",
        };
        write!(f, "{name}")
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verbosity::Silent => "SILENT",
            Verbosity::Default => "DEFAULT",
            Verbosity::Verbose => "VERBOSE",
            Verbosity::SuperVerbose => "SUPER_VERBOSE",
        };
        write!(f, "{name}")
    }
}
