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

use rand::rngs::SmallRng;
use rand::SeedableRng;

use rdt_shared::events::EventMask;
use rdt_shared::events::MonEvent;
use rdt_test_utils::test_values as test;

use super::DerivedValues;
use super::EventSample;
use super::EventScales;
use crate::snapshot::CounterSnapshot;
use crate::GroupId;

fn snapshot(events: EventMask, values: &[(MonEvent, u64)]) -> CounterSnapshot {
    let raw = test::generate_counters(values);
    CounterSnapshot::capture(GroupId::new(1), events.hardware_events(), &raw).unwrap()
}

#[test]
fn pending_values_carry_no_data() {
    let events = EventMask::LLC_OCCUPANCY | EventMask::IPC;
    let derived = DerivedValues::pending(events);

    assert!(!derived.is_ready());
    assert_eq!(derived.seq(), 0);
    assert_eq!(derived.events(), events);
    assert!(derived
        .samples()
        .all(|(_, sample)| sample == EventSample::Pending));
    assert_eq!(derived.ipc(), None);
    assert_eq!(derived.llc_miss_ratio(), None);
    assert!(!derived.has_overflow());
}

#[test]
fn first_poll_has_zero_deltas() {
    let events = EventMask::LLC_OCCUPANCY | EventMask::TOTAL_BANDWIDTH;
    let current = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 100), (MonEvent::TotalBandwidth, 50)],
    );

    let derived = DerivedValues::compute(1, events, None, &current, &EventScales::default());

    assert!(derived.is_ready());
    assert_eq!(derived.delta(MonEvent::LlcOccupancy), Some(0));
    assert_eq!(derived.delta(MonEvent::TotalBandwidth), Some(0));
    assert_eq!(derived.sample(MonEvent::LlcOccupancy).unwrap().value(), Some(100));
    assert!(!derived.has_overflow());
}

#[test]
fn deltas_follow_counters() {
    let events = EventMask::LLC_OCCUPANCY | EventMask::TOTAL_BANDWIDTH;
    let previous = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 100), (MonEvent::TotalBandwidth, 50)],
    );
    let current = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 180), (MonEvent::TotalBandwidth, 90)],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.delta(MonEvent::LlcOccupancy), Some(80));
    assert_eq!(derived.delta(MonEvent::TotalBandwidth), Some(40));
    assert_eq!(derived.overflowed(), EventMask::empty());
}

#[test]
fn counter_going_backwards_is_an_overflow() {
    let events = EventMask::LLC_OCCUPANCY | EventMask::LOCAL_BANDWIDTH;
    let previous = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 100), (MonEvent::LocalBandwidth, 500)],
    );
    let current = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 120), (MonEvent::LocalBandwidth, 20)],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.overflowed(), EventMask::LOCAL_BANDWIDTH);
    assert_eq!(
        derived.sample(MonEvent::LocalBandwidth),
        Some(EventSample::Overflowed { value: Some(20) })
    );
    assert_eq!(derived.delta(MonEvent::LocalBandwidth), None);
    assert_eq!(derived.delta(MonEvent::LlcOccupancy), Some(20));
}

#[test]
fn remote_bandwidth_is_total_minus_local() {
    let events = EventMask::REMOTE_BANDWIDTH;
    let previous = snapshot(
        events,
        &[
            (MonEvent::LocalBandwidth, 1000),
            (MonEvent::TotalBandwidth, 1500),
        ],
    );
    let current = snapshot(
        events,
        &[
            (MonEvent::LocalBandwidth, 1300),
            (MonEvent::TotalBandwidth, 2000),
        ],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.events(), EventMask::REMOTE_BANDWIDTH);
    assert_eq!(derived.delta(MonEvent::RemoteBandwidth), Some(200));
    assert_eq!(derived.sample(MonEvent::LocalBandwidth), None);
}

#[test]
fn remote_bandwidth_doesnt_go_negative() {
    let events = EventMask::REMOTE_BANDWIDTH;
    let previous = snapshot(
        events,
        &[(MonEvent::LocalBandwidth, 0), (MonEvent::TotalBandwidth, 0)],
    );
    let current = snapshot(
        events,
        &[(MonEvent::LocalBandwidth, 700), (MonEvent::TotalBandwidth, 600)],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.delta(MonEvent::RemoteBandwidth), Some(0));
    assert_eq!(
        derived.sample(MonEvent::RemoteBandwidth).unwrap().value(),
        Some(0)
    );
}

#[test]
fn remote_bandwidth_overflows_with_its_inputs() {
    let events = EventMask::REMOTE_BANDWIDTH | EventMask::TOTAL_BANDWIDTH;
    let previous = snapshot(
        events,
        &[(MonEvent::LocalBandwidth, 10), (MonEvent::TotalBandwidth, 900)],
    );
    let current = snapshot(
        events,
        &[(MonEvent::LocalBandwidth, 20), (MonEvent::TotalBandwidth, 30)],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(
        derived.overflowed(),
        EventMask::REMOTE_BANDWIDTH | EventMask::TOTAL_BANDWIDTH
    );
}

#[test]
fn rates_are_zero_when_denominator_stands_still() {
    let events = EventMask::IPC | EventMask::LLC_MISS_RATIO;
    let values = [
        (MonEvent::InstructionsRetired, 1000),
        (MonEvent::UnhaltedCycles, 400),
        (MonEvent::LlcMisses, 5),
        (MonEvent::LlcReferences, 50),
    ];
    let previous = snapshot(events, &values);
    let current = snapshot(events, &values);

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.ipc(), Some(0.0));
    assert_eq!(derived.llc_miss_ratio(), Some(0.0));
}

#[test]
fn rates_are_computed_from_deltas() {
    let events = EventMask::IPC | EventMask::LLC_MISS_RATIO;
    let previous = snapshot(
        events,
        &[
            (MonEvent::InstructionsRetired, 1000),
            (MonEvent::UnhaltedCycles, 400),
            (MonEvent::LlcMisses, 5),
            (MonEvent::LlcReferences, 50),
        ],
    );
    let current = snapshot(
        events,
        &[
            (MonEvent::InstructionsRetired, 3000),
            (MonEvent::UnhaltedCycles, 1400),
            (MonEvent::LlcMisses, 30),
            (MonEvent::LlcReferences, 150),
        ],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    assert_eq!(derived.ipc(), Some(2.0));
    assert_eq!(derived.llc_miss_ratio(), Some(0.25));
}

#[test]
fn rates_need_both_inputs() {
    let events = EventMask::INSTRUCTIONS_RETIRED | EventMask::LLC_MISS_RATIO;
    let previous = snapshot(
        events,
        &[
            (MonEvent::InstructionsRetired, 10),
            (MonEvent::LlcMisses, 500),
            (MonEvent::LlcReferences, 600),
        ],
    );
    let current = snapshot(
        events,
        &[
            (MonEvent::InstructionsRetired, 20),
            (MonEvent::LlcMisses, 1),
            (MonEvent::LlcReferences, 700),
        ],
    );

    let derived = DerivedValues::compute(
        2,
        events,
        Some(&previous),
        &current,
        &EventScales::default(),
    );

    // cycles aren't monitored, misses overflowed
    assert_eq!(derived.ipc(), None);
    assert_eq!(derived.llc_miss_ratio(), None);
}

#[test]
fn scale_factor_converts_rmid_events() {
    let capabilities = test::generate_scaled_capabilities(64);
    let events = EventMask::LLC_OCCUPANCY | EventMask::LLC_MISSES;
    let scales = EventScales::from_capabilities(&capabilities, events);

    let previous = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 10), (MonEvent::LlcMisses, 10)],
    );
    let current = snapshot(
        events,
        &[(MonEvent::LlcOccupancy, 12), (MonEvent::LlcMisses, 12)],
    );

    let derived = DerivedValues::compute(2, events, Some(&previous), &current, &scales);

    assert_eq!(derived.scaled_delta(MonEvent::LlcOccupancy), Some(128));
    assert_eq!(derived.scaled_delta(MonEvent::LlcMisses), Some(2));
    assert_eq!(
        derived.sample(MonEvent::LlcOccupancy),
        Some(EventSample::Valid {
            value: 12,
            delta: 2,
            scaled_value: 768,
            scaled_delta: 128,
        })
    );
}

#[test]
fn hardware_overflow_marks_every_event() {
    let events = EventMask::LLC_OCCUPANCY | EventMask::IPC;
    let derived = DerivedValues::hardware_overflow(4, events);

    assert_eq!(derived.seq(), 4);
    assert_eq!(derived.overflowed(), events);
    assert_eq!(derived.ipc(), None);
    assert!(derived
        .samples()
        .all(|(_, sample)| sample == EventSample::Overflowed { value: None }));
}

#[test]
fn monotonic_sequences_never_overflow() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let events = EventMask::LLC_OCCUPANCY | EventMask::TOTAL_BANDWIDTH;

    let occupancy = test::generate_random_counter_sequence(&mut rng, 64, 1 << 20);
    let bandwidth = test::generate_random_counter_sequence(&mut rng, 64, 1 << 30);

    let mut previous = None;
    for (seq, (&occupancy, &bandwidth)) in occupancy.iter().zip(bandwidth.iter()).enumerate() {
        let current = snapshot(
            events,
            &[
                (MonEvent::LlcOccupancy, occupancy),
                (MonEvent::TotalBandwidth, bandwidth),
            ],
        );
        let derived = DerivedValues::compute(
            seq as u64 + 1,
            events,
            previous.as_ref(),
            &current,
            &EventScales::default(),
        );

        assert!(!derived.has_overflow());
        if let Some(previous) = &previous {
            let expected = occupancy - previous.get(MonEvent::LlcOccupancy).unwrap();
            assert_eq!(derived.delta(MonEvent::LlcOccupancy), Some(expected));
        }
        previous = Some(current);
    }
}
