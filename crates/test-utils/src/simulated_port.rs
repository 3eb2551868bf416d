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

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;

use rdt_hw_port::BindingHandle;
use rdt_hw_port::HardwareAccessPort;
use rdt_hw_port::HwError;
use rdt_hw_port::HwResult;
use rdt_hw_port::InterfaceChoice;
use rdt_hw_port::RawCounters;
use rdt_hw_port::Verbosity;
use rdt_shared::capabilities::PlatformCapabilities;
use rdt_shared::events::EventMask;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::MonitoringTarget;
use rdt_shared::types::ProcessId;

use crate::test_values::generate_capabilities;

/// Port calls that can be scripted to fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortCall {
    Init,
    Teardown,
    QueryCapabilities,
    QueryInterface,
    QueryAssociation,
    BindTarget,
    Unbind,
    AddToTarget,
    RemoveFromTarget,
    ReadCounters,
}

/// In-memory hardware port. Readings are scripted per binding, when the script is
/// exhausted the last reading is repeated.
pub struct SimulatedPort {
    state: Mutex<SimulatedState>,
    wakeup: Condvar,
    init_calls: AtomicUsize,
    teardown_calls: AtomicUsize,
}

#[derive(Clone, Debug)]
pub struct SimulatedBinding {
    pub target: MonitoringTarget,
    pub events: EventMask,
    pub rmid: u32,
    pending_readings: VecDeque<RawCounters>,
    last_reading: RawCounters,
}

struct SimulatedState {
    capabilities: PlatformCapabilities,
    initialized: bool,
    torn_down: bool,
    interface: Option<InterfaceChoice>,
    next_handle: u64,
    bindings: HashMap<BindingHandle, SimulatedBinding>,
    failures: HashMap<PortCall, VecDeque<HwError>>,
    init_held: bool,
    held_reads: HashSet<BindingHandle>,
    reads_in_flight: HashMap<BindingHandle, usize>,
    max_reads_in_flight: HashMap<BindingHandle, usize>,
}

impl SimulatedPort {
    pub fn new(capabilities: PlatformCapabilities) -> Self {
        let state = SimulatedState {
            capabilities,
            initialized: false,
            torn_down: false,
            interface: None,
            next_handle: 1,
            bindings: HashMap::new(),
            failures: HashMap::new(),
            init_held: false,
            held_reads: HashSet::new(),
            reads_in_flight: HashMap::new(),
            max_reads_in_flight: HashMap::new(),
        };

        Self {
            state: Mutex::new(state),
            wakeup: Condvar::new(),
            init_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
        }
    }

    /// Queues readings to be returned by subsequent `read_counters` calls for the binding.
    pub fn push_readings(
        &self,
        handle: BindingHandle,
        readings: impl IntoIterator<Item = RawCounters>,
    ) {
        let mut state = self.state.lock();
        if let Some(binding) = state.bindings.get_mut(&handle) {
            binding.pending_readings.extend(readings);
        }
    }

    /// The next call of the given kind fails with the error.
    pub fn fail_next(&self, call: PortCall, error: HwError) {
        self.state
            .lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Makes `init` block until `release_init` is called.
    pub fn hold_init(&self) {
        self.state.lock().init_held = true;
    }

    pub fn release_init(&self) {
        self.state.lock().init_held = false;
        self.wakeup.notify_all();
    }

    /// Makes reads of the binding block until `release_reads` is called.
    pub fn hold_reads(&self, handle: BindingHandle) {
        self.state.lock().held_reads.insert(handle);
    }

    pub fn release_reads(&self, handle: BindingHandle) {
        self.state.lock().held_reads.remove(&handle);
        self.wakeup.notify_all();
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn teardown_calls(&self) -> usize {
        self.teardown_calls.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Interface passed to the last successful `init`, as requested by the caller.
    pub fn requested_interface(&self) -> Option<InterfaceChoice> {
        self.state.lock().interface
    }

    pub fn binding(&self, handle: BindingHandle) -> Option<SimulatedBinding> {
        self.state.lock().bindings.get(&handle).cloned()
    }

    pub fn bound_handles(&self) -> Vec<BindingHandle> {
        let mut handles = self
            .state
            .lock()
            .bindings
            .keys()
            .copied()
            .collect::<Vec<_>>();
        handles.sort();
        handles
    }

    pub fn reads_in_flight(&self, handle: BindingHandle) -> usize {
        self.state
            .lock()
            .reads_in_flight
            .get(&handle)
            .copied()
            .unwrap_or_default()
    }

    /// The highest number of reads of the binding that were ever in progress at once.
    pub fn max_reads_in_flight(&self, handle: BindingHandle) -> usize {
        self.state
            .lock()
            .max_reads_in_flight
            .get(&handle)
            .copied()
            .unwrap_or_default()
    }

    fn initialized_state(&self, call: PortCall) -> HwResult<MutexGuard<'_, SimulatedState>> {
        let mut state = self.state.lock();
        state.take_failure(call)?;
        if !state.initialized {
            return Err(HwError::init("platform library is not initialized"));
        }
        Ok(state)
    }
}

impl Default for SimulatedPort {
    fn default() -> Self {
        Self::new(generate_capabilities())
    }
}

impl SimulatedState {
    fn take_failure(&mut self, call: PortCall) -> HwResult<()> {
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn binding_mut(&mut self, handle: BindingHandle) -> HwResult<&mut SimulatedBinding> {
        self.bindings
            .get_mut(&handle)
            .ok_or_else(|| HwError::invalid_argument(format!("unknown binding {handle}")))
    }
}

impl HardwareAccessPort for SimulatedPort {
    fn init(&self, interface: InterfaceChoice, _verbosity: Verbosity) -> HwResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        while state.init_held {
            self.wakeup.wait(&mut state);
        }

        state.take_failure(PortCall::Init)?;
        if state.torn_down {
            return Err(HwError::init("re-initialization after teardown is not supported"));
        }
        if state.initialized {
            return Err(HwError::init("already initialized"));
        }

        state.initialized = true;
        state.interface = Some(interface);
        Ok(())
    }

    fn teardown(&self) -> HwResult<()> {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.initialized_state(PortCall::Teardown)?;
        state.initialized = false;
        state.torn_down = true;
        state.bindings.clear();
        Ok(())
    }

    fn query_capabilities(&self) -> HwResult<PlatformCapabilities> {
        let state = self.initialized_state(PortCall::QueryCapabilities)?;
        Ok(state.capabilities.clone())
    }

    fn interface(&self) -> HwResult<InterfaceChoice> {
        let state = self.initialized_state(PortCall::QueryInterface)?;
        match state.interface {
            // resctrl is preferred when present
            Some(InterfaceChoice::Auto) => Ok(InterfaceChoice::Os),
            Some(interface) => Ok(interface),
            None => Err(HwError::init("platform library is not initialized")),
        }
    }

    fn assoc_get(&self, core: LogicalCoreId) -> HwResult<u32> {
        let state = self.initialized_state(PortCall::QueryAssociation)?;
        let rmid = state
            .bindings
            .values()
            .find(|binding| {
                binding
                    .target
                    .core_ids()
                    .is_some_and(|core_ids| core_ids.contains(&core))
            })
            .map_or(0, |binding| binding.rmid);
        Ok(rmid)
    }

    fn bind_target(
        &self,
        target: &MonitoringTarget,
        events: EventMask,
    ) -> HwResult<BindingHandle> {
        let mut state = self.initialized_state(PortCall::BindTarget)?;

        let handle = BindingHandle::new(state.next_handle);
        // RMID 0 is the default association, bindings start from 1
        let rmid = state.next_handle as u32;
        state.next_handle += 1;

        let last_reading = events.events().map(|event| (event, 0)).collect();
        let binding = SimulatedBinding {
            target: target.clone(),
            events,
            rmid,
            pending_readings: VecDeque::new(),
            last_reading,
        };
        state.bindings.insert(handle, binding);

        Ok(handle)
    }

    fn unbind(&self, handle: BindingHandle) -> HwResult<()> {
        let mut state = self.initialized_state(PortCall::Unbind)?;
        state
            .bindings
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| HwError::invalid_argument(format!("unknown binding {handle}")))
    }

    fn add_to_target(&self, handle: BindingHandle, pids: &[ProcessId]) -> HwResult<()> {
        let mut state = self.initialized_state(PortCall::AddToTarget)?;
        let binding = state.binding_mut(handle)?;
        let bound_pids = binding
            .target
            .pids_mut()
            .ok_or_else(|| HwError::invalid_argument("binding doesn't monitor processes"))?;
        bound_pids.extend(pids.iter().copied());
        Ok(())
    }

    fn remove_from_target(&self, handle: BindingHandle, pids: &[ProcessId]) -> HwResult<()> {
        let mut state = self.initialized_state(PortCall::RemoveFromTarget)?;
        let binding = state.binding_mut(handle)?;
        let bound_pids = binding
            .target
            .pids_mut()
            .ok_or_else(|| HwError::invalid_argument("binding doesn't monitor processes"))?;
        for pid in pids {
            bound_pids.remove(pid);
        }
        Ok(())
    }

    fn read_counters(&self, handle: BindingHandle) -> HwResult<RawCounters> {
        let mut state = self.initialized_state(PortCall::ReadCounters)?;
        state.binding_mut(handle)?;

        let in_flight = {
            let in_flight = state.reads_in_flight.entry(handle).or_default();
            *in_flight += 1;
            *in_flight
        };
        let max_in_flight = state.max_reads_in_flight.entry(handle).or_default();
        *max_in_flight = (*max_in_flight).max(in_flight);

        while state.held_reads.contains(&handle) {
            self.wakeup.wait(&mut state);
        }

        if let Some(in_flight) = state.reads_in_flight.get_mut(&handle) {
            *in_flight -= 1;
        }

        // the binding could be gone while the read was held
        let binding = state.binding_mut(handle)?;
        if let Some(reading) = binding.pending_readings.pop_front() {
            binding.last_reading = reading;
        }
        Ok(binding.last_reading.clone())
    }
}
