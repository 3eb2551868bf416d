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

use rdt_config::RdtConfig;
use rdt_hw_port::InterfaceChoice;
use rdt_hw_port::Verbosity;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub interface: InterfaceChoice,
    pub verbosity: Verbosity,
    pub max_groups: Option<NonZeroUsize>,
    pub retain_stopped_groups: bool,
}

impl SessionConfig {
    pub fn new(config: &RdtConfig) -> Self {
        Self {
            interface: config.hardware.interface,
            verbosity: config.hardware.verbosity,
            max_groups: config.monitoring.max_groups,
            retain_stopped_groups: config.monitoring.retain_stopped_groups,
        }
    }

    /// Number of groups that could be active at once, given the hardware limit.
    pub(crate) fn group_limit(&self, hardware_limit: Option<usize>) -> usize {
        let configured = self.max_groups.map(NonZeroUsize::get);
        match (configured, hardware_limit) {
            (Some(configured), Some(hardware)) => configured.min(hardware),
            (Some(limit), None) | (None, Some(limit)) => limit,
            (None, None) => usize::MAX,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(&RdtConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_follows_loaded_config() {
        let mut config = RdtConfig::default();
        config.hardware.interface = InterfaceChoice::Msr;
        config.hardware.verbosity = Verbosity::Silent;
        config.monitoring.max_groups = NonZeroUsize::new(4);
        config.monitoring.retain_stopped_groups = false;

        let session_config = SessionConfig::new(&config);

        assert_eq!(session_config.interface, InterfaceChoice::Msr);
        assert_eq!(session_config.verbosity, Verbosity::Silent);
        assert_eq!(session_config.max_groups, NonZeroUsize::new(4));
        assert!(!session_config.retain_stopped_groups);
    }

    #[test]
    fn hardware_limit_caps_configured_one() {
        let config = SessionConfig {
            max_groups: NonZeroUsize::new(32),
            ..SessionConfig::default()
        };

        assert_eq!(config.group_limit(Some(15)), 15);
        assert_eq!(config.group_limit(None), 32);
        assert_eq!(SessionConfig::default().group_limit(Some(15)), 15);
    }
}
