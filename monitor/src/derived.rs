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

use rdt_shared::capabilities::PlatformCapabilities;
use rdt_shared::events::EventMask;
use rdt_shared::events::MonEvent;

use crate::snapshot::CounterSnapshot;

#[cfg(test)]
mod tests;

/// Per-event outcome of the latest poll.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventSample {
    /// The group hasn't been polled yet.
    Pending,
    Valid {
        value: u64,
        delta: u64,
        scaled_value: u64,
        scaled_delta: u64,
    },
    /// The counter went backwards, its delta for this poll is unknown.
    /// `value` is `None` when the hardware reported the overflow instead of a reading.
    Overflowed { value: Option<u64> },
}

/// Values derived by one poll of a group. Published as a whole, so readers always see
/// a consistent set.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedValues {
    seq: u64,
    samples: BTreeMap<MonEvent, EventSample>,
    ipc: Option<f64>,
    llc_miss_ratio: Option<f64>,
    overflowed: EventMask,
}

/// Factors converting counter units into bytes, 1 for everything not listed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EventScales(BTreeMap<MonEvent, u64>);

impl EventSample {
    pub fn value(&self) -> Option<u64> {
        match *self {
            EventSample::Valid { value, .. } => Some(value),
            EventSample::Overflowed { value } => value,
            EventSample::Pending => None,
        }
    }

    pub fn delta(&self) -> Option<u64> {
        match *self {
            EventSample::Valid { delta, .. } => Some(delta),
            _ => None,
        }
    }

    pub fn scaled_delta(&self) -> Option<u64> {
        match *self {
            EventSample::Valid { scaled_delta, .. } => Some(scaled_delta),
            _ => None,
        }
    }

    pub fn is_overflowed(&self) -> bool {
        matches!(self, EventSample::Overflowed { .. })
    }

    fn from_delta(value: u64, delta: Option<u64>, scale: u64) -> Self {
        match delta {
            Some(delta) => EventSample::Valid {
                value,
                delta,
                scaled_value: value.saturating_mul(scale),
                scaled_delta: delta.saturating_mul(scale),
            },
            None => EventSample::Overflowed { value: Some(value) },
        }
    }
}

impl DerivedValues {
    /// Values of a group that hasn't been polled yet.
    pub fn pending(events: EventMask) -> Self {
        Self {
            seq: 0,
            samples: events
                .events()
                .map(|event| (event, EventSample::Pending))
                .collect(),
            ipc: None,
            llc_miss_ratio: None,
            overflowed: EventMask::empty(),
        }
    }

    /// Derives values of the requested events from two consecutive snapshots.
    /// Without a previous snapshot every delta is zero.
    pub(crate) fn compute(
        seq: u64,
        requested: EventMask,
        previous: Option<&CounterSnapshot>,
        current: &CounterSnapshot,
        scales: &EventScales,
    ) -> Self {
        // None marks a counter that went backwards
        let deltas = current
            .iter()
            .map(|(event, value)| {
                let delta = match previous.and_then(|previous| previous.get(event)) {
                    None => Some(0),
                    Some(previous) if value >= previous => Some(value - previous),
                    Some(_) => None,
                };
                (event, delta)
            })
            .collect::<BTreeMap<_, _>>();

        let mut overflowed = EventMask::empty();
        let samples = requested
            .events()
            .map(|event| {
                let sample = if event.is_virtual() {
                    remote_bandwidth_sample(current, &deltas, scales.get(event))
                } else {
                    match (current.get(event), deltas.get(&event)) {
                        (Some(value), Some(&delta)) => {
                            EventSample::from_delta(value, delta, scales.get(event))
                        }
                        _ => EventSample::Pending,
                    }
                };
                if sample.is_overflowed() {
                    overflowed |= event.mask();
                }
                (event, sample)
            })
            .collect();

        Self {
            seq,
            samples,
            ipc: delta_ratio(
                requested,
                MonEvent::InstructionsRetired,
                MonEvent::UnhaltedCycles,
                &deltas,
            ),
            llc_miss_ratio: delta_ratio(
                requested,
                MonEvent::LlcMisses,
                MonEvent::LlcReferences,
                &deltas,
            ),
            overflowed,
        }
    }

    /// Values of a poll for which the hardware reported an overflow instead of a reading.
    pub(crate) fn hardware_overflow(seq: u64, requested: EventMask) -> Self {
        Self {
            seq,
            samples: requested
                .events()
                .map(|event| (event, EventSample::Overflowed { value: None }))
                .collect(),
            ipc: None,
            llc_miss_ratio: None,
            overflowed: requested,
        }
    }

    /// Number of polls applied to the group.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_ready(&self) -> bool {
        self.seq > 0
    }

    pub fn events(&self) -> EventMask {
        self.samples.keys().copied().collect()
    }

    /// `None` for events the group doesn't monitor.
    pub fn sample(&self, event: MonEvent) -> Option<EventSample> {
        self.samples.get(&event).copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = (MonEvent, EventSample)> + '_ {
        self.samples.iter().map(|(&event, &sample)| (event, sample))
    }

    pub fn delta(&self, event: MonEvent) -> Option<u64> {
        self.sample(event)?.delta()
    }

    pub fn scaled_delta(&self, event: MonEvent) -> Option<u64> {
        self.sample(event)?.scaled_delta()
    }

    /// Instructions retired per unhalted cycle over the last poll interval.
    pub fn ipc(&self) -> Option<f64> {
        self.ipc
    }

    pub fn llc_miss_ratio(&self) -> Option<f64> {
        self.llc_miss_ratio
    }

    pub fn overflowed(&self) -> EventMask {
        self.overflowed
    }

    pub fn has_overflow(&self) -> bool {
        !self.overflowed.is_empty()
    }
}

impl EventScales {
    pub(crate) fn from_capabilities(
        capabilities: &PlatformCapabilities,
        events: EventMask,
    ) -> Self {
        let scales = events
            .events()
            .map(|event| (event, capabilities.scale_factor(event)))
            .collect();
        Self(scales)
    }

    pub(crate) fn get(&self, event: MonEvent) -> u64 {
        self.0.get(&event).copied().unwrap_or(1)
    }
}

/// Remote traffic is whatever total bandwidth has on top of the local one.
fn remote_bandwidth_sample(
    current: &CounterSnapshot,
    deltas: &BTreeMap<MonEvent, Option<u64>>,
    scale: u64,
) -> EventSample {
    let local = current.get(MonEvent::LocalBandwidth);
    let total = current.get(MonEvent::TotalBandwidth);
    let local_delta = deltas.get(&MonEvent::LocalBandwidth);
    let total_delta = deltas.get(&MonEvent::TotalBandwidth);

    match (local, total, local_delta, total_delta) {
        (Some(local), Some(total), Some(local_delta), Some(total_delta)) => {
            let value = total.saturating_sub(local);
            let delta = (*local_delta)
                .zip(*total_delta)
                .map(|(local_delta, total_delta)| total_delta.saturating_sub(local_delta));
            EventSample::from_delta(value, delta, scale)
        }
        _ => EventSample::Pending,
    }
}

/// Ratio of two deltas: `None` if an input isn't requested or overflowed, 0 when the
/// denominator didn't move.
fn delta_ratio(
    requested: EventMask,
    numerator: MonEvent,
    denominator: MonEvent,
    deltas: &BTreeMap<MonEvent, Option<u64>>,
) -> Option<f64> {
    if !requested.contains(numerator.mask() | denominator.mask()) {
        return None;
    }

    let numerator = (*deltas.get(&numerator)?)?;
    let denominator = (*deltas.get(&denominator)?)?;
    if denominator == 0 {
        return Some(0.0);
    }

    Some(numerator as f64 / denominator as f64)
}
