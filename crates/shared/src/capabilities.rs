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

use crate::cpu_info::CpuInfo;
use crate::events::EventMask;
use crate::events::MonEvent;

/// Everything the platform reported about its RDT features.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    pub monitoring: Option<MonitoringCapability>,
    pub l3ca: Option<CacheAllocationCapability>,
    pub l2ca: Option<CacheAllocationCapability>,
    pub mba: Option<MbaCapability>,
    pub cpu: CpuInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringCapability {
    /// Max RMID supported by a socket.
    pub max_rmid: u32,
    /// L3 cache size in bytes.
    pub l3_size: u64,
    pub events: Vec<EventCapability>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCapability {
    pub event: MonEvent,
    pub max_rmid: u32,
    /// Factor to scale a counter value into bytes.
    pub scale_factor: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAllocationCapability {
    pub num_classes: u32,
    pub num_ways: u32,
    /// Way size in bytes.
    pub way_size: u64,
    /// Code and data prioritization is supported.
    pub cdp: bool,
    /// Code and data prioritization is currently enabled.
    pub cdp_on: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbaCapability {
    pub num_classes: u32,
    pub throttle_max: u32,
    pub throttle_step: u32,
    pub is_linear: bool,
    pub ctrl: bool,
    pub ctrl_on: bool,
}

impl PlatformCapabilities {
    /// Events that can be requested for a monitoring group. Remote bandwidth is reported
    /// when both local and total bandwidth are available, since it's computed from them.
    pub fn supported_events(&self) -> EventMask {
        let Some(monitoring) = &self.monitoring else {
            return EventMask::empty();
        };

        let mut supported = monitoring
            .events
            .iter()
            .map(|capability| capability.event)
            .collect::<EventMask>();

        if supported.contains(EventMask::LOCAL_BANDWIDTH | EventMask::TOTAL_BANDWIDTH) {
            supported |= EventMask::REMOTE_BANDWIDTH;
        }

        supported
    }

    pub fn supports(&self, events: EventMask) -> bool {
        self.supported_events().contains(events)
    }

    pub fn event(&self, event: MonEvent) -> Option<&EventCapability> {
        self.monitoring
            .as_ref()?
            .events
            .iter()
            .find(|capability| capability.event == event)
    }

    /// Scale factor for the event, 1 when the platform doesn't report one.
    pub fn scale_factor(&self, event: MonEvent) -> u64 {
        let reported = match event {
            // follows the bandwidth counters it's computed from
            MonEvent::RemoteBandwidth => self.event(MonEvent::TotalBandwidth),
            _ => self.event(event),
        };

        reported
            .map(|capability| capability.scale_factor as u64)
            .filter(|&factor| factor > 0)
            .unwrap_or(1)
    }

    /// How many groups can be monitored at once; RMID 0 is reserved for unmonitored tasks.
    pub fn max_monitoring_groups(&self) -> Option<usize> {
        self.monitoring
            .as_ref()
            .map(|monitoring| monitoring.max_rmid.saturating_sub(1) as usize)
    }

    pub fn has_monitoring(&self) -> bool {
        self.monitoring.is_some()
    }

    pub fn has_l3ca(&self) -> bool {
        self.l3ca.is_some()
    }

    pub fn has_l2ca(&self) -> bool {
        self.l2ca.is_some()
    }

    pub fn has_mba(&self) -> bool {
        self.mba.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitoring(events: &[(MonEvent, u32)]) -> PlatformCapabilities {
        let events = events
            .iter()
            .map(|&(event, scale_factor)| EventCapability {
                event,
                max_rmid: 144,
                scale_factor,
            })
            .collect();

        PlatformCapabilities {
            monitoring: Some(MonitoringCapability {
                max_rmid: 144,
                l3_size: 32 * 1024 * 1024,
                events,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn remote_bandwidth_needs_local_and_total() {
        let caps = monitoring(&[(MonEvent::LocalBandwidth, 64), (MonEvent::TotalBandwidth, 64)]);
        assert!(caps.supports(EventMask::REMOTE_BANDWIDTH));

        let caps = monitoring(&[(MonEvent::TotalBandwidth, 64)]);
        assert!(!caps.supports(EventMask::REMOTE_BANDWIDTH));
    }

    #[test]
    fn no_monitoring_means_nothing_supported() {
        let caps = PlatformCapabilities::default();
        assert!(caps.supported_events().is_empty());
        assert_eq!(caps.max_monitoring_groups(), None);
        assert!(!caps.has_monitoring());
    }

    #[test]
    fn scale_factor_defaults_to_one() {
        let caps = monitoring(&[
            (MonEvent::LlcOccupancy, 65536),
            (MonEvent::TotalBandwidth, 0),
        ]);

        assert_eq!(caps.scale_factor(MonEvent::LlcOccupancy), 65536);
        assert_eq!(caps.scale_factor(MonEvent::TotalBandwidth), 1);
        assert_eq!(caps.scale_factor(MonEvent::InstructionsRetired), 1);
        assert_eq!(caps.max_monitoring_groups(), Some(143));
    }
}
