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

use rdt_hw_port::RawCounters;
use rdt_shared::capabilities::*;
use rdt_shared::cpu_info::*;
use rdt_shared::events::MonEvent;
use rdt_shared::types::*;

pub const TEST_MAX_RMID: u32 = 16;

/// Topology with `cores_per_socket` logical cores on each socket.
pub fn generate_cpu_info(sockets: u32, cores_per_socket: u32) -> CpuInfo {
    let cores = (0..sockets)
        .flat_map(|socket| {
            (0..cores_per_socket).map(move |index| {
                let lcore = socket * cores_per_socket + index;
                CoreInfo {
                    lcore: lcore.into(),
                    socket,
                    l3_id: socket,
                    l2_id: lcore / 2,
                    l3cat_id: socket,
                    mba_id: socket,
                    numa: socket,
                }
            })
        })
        .collect();

    CpuInfo {
        vendor: CpuVendor::Intel,
        cores,
        ..Default::default()
    }
}

/// Capabilities with every hardware event available and unit scale factors.
pub fn generate_capabilities() -> PlatformCapabilities {
    generate_scaled_capabilities(1)
}

/// Capabilities with every hardware event available, RMID events are scaled by `scale_factor`.
pub fn generate_scaled_capabilities(scale_factor: u32) -> PlatformCapabilities {
    let events = MonEvent::ALL
        .into_iter()
        .filter(|event| !event.is_virtual())
        .map(|event| EventCapability {
            event,
            max_rmid: TEST_MAX_RMID,
            scale_factor: if event.is_rmid_event() {
                scale_factor
            } else {
                1
            },
        })
        .collect();

    PlatformCapabilities {
        monitoring: Some(MonitoringCapability {
            max_rmid: TEST_MAX_RMID,
            l3_size: 32 * 1024 * 1024,
            events,
        }),
        l3ca: Some(CacheAllocationCapability {
            num_classes: 16,
            num_ways: 11,
            way_size: 2816 * 1024,
            cdp: true,
            cdp_on: false,
        }),
        l2ca: None,
        mba: Some(MbaCapability {
            num_classes: 8,
            throttle_max: 90,
            throttle_step: 10,
            is_linear: true,
            ctrl: false,
            ctrl_on: false,
        }),
        cpu: generate_cpu_info(2, 4),
    }
}

/// Capabilities of a platform that can only report cache occupancy.
pub fn generate_occupancy_only_capabilities() -> PlatformCapabilities {
    let mut capabilities = generate_capabilities();
    if let Some(monitoring) = capabilities.monitoring.as_mut() {
        monitoring
            .events
            .retain(|capability| capability.event == MonEvent::LlcOccupancy);
    }
    capabilities
}

pub fn generate_counters(values: &[(MonEvent, u64)]) -> RawCounters {
    values.iter().copied().collect()
}

pub fn generate_cores_target(core_ids: &[u32]) -> MonitoringTarget {
    MonitoringTarget::cores(core_ids.iter().copied().map(LogicalCoreId::from))
}

pub fn generate_processes_target(pids: &[u32]) -> MonitoringTarget {
    MonitoringTarget::processes(generate_pids(pids))
}

pub fn generate_pids(pids: &[u32]) -> Vec<ProcessId> {
    pids.iter().copied().map(ProcessId::from).collect()
}

/// Monotonically growing counter values, every step is within `0..max_step`.
pub fn generate_random_counter_sequence(
    rng: &mut impl rand::Rng,
    size: usize,
    max_step: u64,
) -> Vec<u64> {
    let distr = rand::distributions::Uniform::from(0..max_step);
    let mut current = rng.gen_range(0..u32::MAX as u64);

    (0..size)
        .map(|_| {
            current += rng.sample(distr);
            current
        })
        .collect()
}
