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

/// A single monitored event kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonEvent {
    LlcOccupancy,
    LocalBandwidth,
    TotalBandwidth,
    /// Virtual event, derived from total and local bandwidth.
    RemoteBandwidth,
    InstructionsRetired,
    UnhaltedCycles,
    LlcMisses,
    LlcReferences,
}

bitflags::bitflags! {
    /// Set of monitored events. Hardware event bits match the RDT CPUID enumeration.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const LLC_OCCUPANCY = 0x1;
        const LOCAL_BANDWIDTH = 0x2;
        const TOTAL_BANDWIDTH = 0x4;
        const REMOTE_BANDWIDTH = 0x8;
        const LLC_MISSES = 0x4000;
        const INSTRUCTIONS_RETIRED = 0x8000;
        const UNHALTED_CYCLES = 0x1_0000;
        const LLC_REFERENCES = 0x2_0000;

        const IPC = Self::INSTRUCTIONS_RETIRED.bits() | Self::UNHALTED_CYCLES.bits();
        const LLC_MISS_RATIO = Self::LLC_MISSES.bits() | Self::LLC_REFERENCES.bits();
    }
}

impl MonEvent {
    pub const ALL: [MonEvent; 8] = [
        MonEvent::LlcOccupancy,
        MonEvent::LocalBandwidth,
        MonEvent::TotalBandwidth,
        MonEvent::RemoteBandwidth,
        MonEvent::InstructionsRetired,
        MonEvent::UnhaltedCycles,
        MonEvent::LlcMisses,
        MonEvent::LlcReferences,
    ];

    pub fn mask(self) -> EventMask {
        match self {
            MonEvent::LlcOccupancy => EventMask::LLC_OCCUPANCY,
            MonEvent::LocalBandwidth => EventMask::LOCAL_BANDWIDTH,
            MonEvent::TotalBandwidth => EventMask::TOTAL_BANDWIDTH,
            MonEvent::RemoteBandwidth => EventMask::REMOTE_BANDWIDTH,
            MonEvent::InstructionsRetired => EventMask::INSTRUCTIONS_RETIRED,
            MonEvent::UnhaltedCycles => EventMask::UNHALTED_CYCLES,
            MonEvent::LlcMisses => EventMask::LLC_MISSES,
            MonEvent::LlcReferences => EventMask::LLC_REFERENCES,
        }
    }

    /// Events whose counters are expressed in RMID units and scaled into bytes.
    pub fn is_rmid_event(self) -> bool {
        matches!(
            self,
            MonEvent::LlcOccupancy
                | MonEvent::LocalBandwidth
                | MonEvent::TotalBandwidth
                | MonEvent::RemoteBandwidth
        )
    }

    pub fn is_virtual(self) -> bool {
        self == MonEvent::RemoteBandwidth
    }
}

impl EventMask {
    /// Iterates over the single events of the mask in a stable order.
    pub fn events(self) -> impl Iterator<Item = MonEvent> {
        MonEvent::ALL
            .into_iter()
            .filter(move |event| self.contains(event.mask()))
    }

    /// Events that have to be bound in hardware to serve this mask:
    /// remote bandwidth is replaced with the local and total bandwidth it's computed from.
    pub fn hardware_events(self) -> EventMask {
        if self.contains(EventMask::REMOTE_BANDWIDTH) {
            (self - EventMask::REMOTE_BANDWIDTH)
                | EventMask::LOCAL_BANDWIDTH
                | EventMask::TOTAL_BANDWIDTH
        } else {
            self
        }
    }
}

impl FromIterator<MonEvent> for EventMask {
    fn from_iter<T: IntoIterator<Item = MonEvent>>(iter: T) -> Self {
        iter.into_iter()
            .fold(EventMask::empty(), |mask, event| mask | event.mask())
    }
}

impl From<MonEvent> for EventMask {
    fn from(event: MonEvent) -> Self {
        event.mask()
    }
}

impl std::fmt::Display for MonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MonEvent::LlcOccupancy => "llc-occupancy",
            MonEvent::LocalBandwidth => "local-bandwidth",
            MonEvent::TotalBandwidth => "total-bandwidth",
            MonEvent::RemoteBandwidth => "remote-bandwidth",
            MonEvent::InstructionsRetired => "instructions-retired",
            MonEvent::UnhaltedCycles => "unhalted-cycles",
            MonEvent::LlcMisses => "llc-misses",
            MonEvent::LlcReferences => "llc-references",
        };
        write!(f, "{name}")
    }
}

impl std::fmt::Display for EventMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (position, event) in self.events().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{event}")?;
        }
        write!(f, "]")
    }
}
