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

use std::collections::BTreeMap;

use rdt_hw_port::RawCounters;
use rdt_shared::events::EventMask;
use rdt_shared::events::MonEvent;

use crate::GroupId;
use crate::MonitorError;
use crate::MonitorResult;

/// Absolute values of a group's hardware counters taken by a single poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterSnapshot {
    values: BTreeMap<MonEvent, u64>,
}

impl CounterSnapshot {
    /// Takes exactly the given events from a reading, values of other events are dropped.
    pub fn capture(group_id: GroupId, events: EventMask, raw: &RawCounters) -> MonitorResult<Self> {
        let values = events
            .events()
            .map(|event| {
                raw.get(event)
                    .map(|value| (event, value))
                    .ok_or_else(|| MonitorError::missing_counter(group_id, event))
            })
            .collect::<MonitorResult<_>>()?;

        Ok(Self { values })
    }

    pub fn get(&self, event: MonEvent) -> Option<u64> {
        self.values.get(&event).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonEvent, u64)> + '_ {
        self.values.iter().map(|(&event, &value)| (event, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_event_is_reported() {
        let raw = RawCounters::new().with(MonEvent::LlcOccupancy, 10);
        let events = EventMask::LLC_OCCUPANCY | EventMask::TOTAL_BANDWIDTH;

        let result = CounterSnapshot::capture(GroupId::new(7), events, &raw);
        assert_eq!(
            result,
            Err(MonitorError::missing_counter(
                GroupId::new(7),
                MonEvent::TotalBandwidth
            ))
        );
    }

    #[test]
    fn unrequested_events_are_dropped() {
        let raw = RawCounters::new()
            .with(MonEvent::LlcOccupancy, 10)
            .with(MonEvent::LlcMisses, 3);

        let snapshot =
            CounterSnapshot::capture(GroupId::new(1), EventMask::LLC_OCCUPANCY, &raw).unwrap();
        assert_eq!(snapshot.get(MonEvent::LlcOccupancy), Some(10));
        assert_eq!(snapshot.get(MonEvent::LlcMisses), None);
        assert_eq!(snapshot.iter().count(), 1);
    }
}
