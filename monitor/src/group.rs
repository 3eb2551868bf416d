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

use std::collections::BTreeSet;

use rdt_hw_port::BindingHandle;
use rdt_hw_port::HardwareAccessPort;
use rdt_hw_port::HwError;
use rdt_hw_port::RawCounters;
use rdt_shared::capabilities::PlatformCapabilities;
use rdt_shared::events::EventMask;

use crate::derived::DerivedValues;
use crate::derived::EventScales;
use crate::snapshot::CounterSnapshot;
use crate::GroupId;
use crate::MonitorError;
use crate::MonitorResult;
use crate::MonitoringTarget;
use crate::Operation;
use crate::ProcessId;


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GroupState {
    Active,
    Stopped,
}

/// Point in time description of a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub target: MonitoringTarget,
    pub events: EventMask,
    pub binding: BindingHandle,
    pub state: GroupState,
    pub polls: u64,
    pub last_snapshot: Option<CounterSnapshot>,
    pub current_snapshot: Option<CounterSnapshot>,
}

/// A set of cores or processes bound to hardware counters. Owns the binding until stopped.
pub(crate) struct MonitoringGroup {
    id: GroupId,
    target: MonitoringTarget,
    events: EventMask,
    hardware_events: EventMask,
    binding: BindingHandle,
    state: GroupState,
    scales: EventScales,
    polls: u64,
    last_snapshot: Option<CounterSnapshot>,
    current_snapshot: Option<CounterSnapshot>,
}

impl MonitoringGroup {
    /// Binds the target in hardware. Checking events against the platform is up to the caller.
    pub(crate) fn create<P: HardwareAccessPort + ?Sized>(
        port: &P,
        id: GroupId,
        target: MonitoringTarget,
        events: EventMask,
        capabilities: &PlatformCapabilities,
    ) -> MonitorResult<Self> {
        if target.is_empty() {
            return Err(MonitorError::EmptyTarget);
        }
        if events.is_empty() {
            return Err(MonitorError::EmptyEvents);
        }

        let hardware_events = events.hardware_events();
        let binding = port
            .bind_target(&target, hardware_events)
            .map_err(|error| MonitorError::group_hardware(Operation::Bind, id, error))?;

        tracing::info!(
            "group {id}: started monitoring {} {} for events {events}",
            target.len(),
            target.kind()
        );

        let group = Self {
            id,
            target,
            events,
            hardware_events,
            binding,
            state: GroupState::Active,
            scales: EventScales::from_capabilities(capabilities, events),
            polls: 0,
            last_snapshot: None,
            current_snapshot: None,
        };
        Ok(group)
    }

    pub(crate) fn add_processes<P: HardwareAccessPort + ?Sized>(
        &mut self,
        port: &P,
        pids: &[ProcessId],
    ) -> MonitorResult<()> {
        let monitored = self.monitored_pids()?;
        self.ensure_active()?;
        if pids.is_empty() {
            return Err(MonitorError::EmptyPids);
        }

        let new_pids = pids
            .iter()
            .filter(|pid| !monitored.contains(pid))
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if new_pids.is_empty() {
            return Ok(());
        }

        port.add_to_target(self.binding, &new_pids)
            .map_err(|error| {
                MonitorError::group_hardware(Operation::AddProcesses, self.id, error)
            })?;

        tracing::debug!("group {}: added processes {new_pids:?}", self.id);
        if let Some(monitored) = self.target.pids_mut() {
            monitored.extend(new_pids);
        }
        Ok(())
    }

    pub(crate) fn remove_processes<P: HardwareAccessPort + ?Sized>(
        &mut self,
        port: &P,
        pids: &[ProcessId],
    ) -> MonitorResult<()> {
        let monitored = self.monitored_pids()?;
        self.ensure_active()?;
        if pids.is_empty() {
            return Err(MonitorError::EmptyPids);
        }

        let to_remove = pids.iter().copied().collect::<BTreeSet<_>>();
        let unknown = to_remove
            .iter()
            .filter(|pid| !monitored.contains(pid))
            .copied()
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(MonitorError::pids_not_in_group(self.id, unknown));
        }
        if to_remove.len() == monitored.len() {
            return Err(MonitorError::would_empty_target(self.id));
        }

        let to_remove = to_remove.into_iter().collect::<Vec<_>>();
        port.remove_from_target(self.binding, &to_remove)
            .map_err(|error| {
                MonitorError::group_hardware(Operation::RemoveProcesses, self.id, error)
            })?;

        tracing::debug!("group {}: removed processes {to_remove:?}", self.id);
        if let Some(monitored) = self.target.pids_mut() {
            for pid in &to_remove {
                monitored.remove(pid);
            }
        }
        Ok(())
    }

    /// Releases the hardware binding, the group stays active if that fails.
    pub(crate) fn stop<P: HardwareAccessPort + ?Sized>(&mut self, port: &P) -> MonitorResult<()> {
        self.ensure_active()?;

        port.unbind(self.binding)
            .map_err(|error| MonitorError::group_hardware(Operation::Unbind, self.id, error))?;
        self.state = GroupState::Stopped;

        tracing::info!("group {}: stopped after {} polls", self.id, self.polls);
        Ok(())
    }

    /// Stops the group unconditionally, a failed unbind is returned but the group is
    /// considered stopped anyway.
    pub(crate) fn release<P: HardwareAccessPort + ?Sized>(
        &mut self,
        port: &P,
    ) -> Result<(), HwError> {
        if self.state == GroupState::Stopped {
            return Ok(());
        }

        self.state = GroupState::Stopped;
        port.unbind(self.binding)
    }

    pub(crate) fn poll<P: HardwareAccessPort + ?Sized>(
        &mut self,
        port: &P,
    ) -> MonitorResult<DerivedValues> {
        self.ensure_active()?;

        match port.read_counters(self.binding) {
            Ok(raw) => self.apply_reading(&raw),
            Err(HwError::Overflow) => Ok(self.apply_hardware_overflow()),
            Err(error) => Err(MonitorError::group_hardware(
                Operation::ReadCounters,
                self.id,
                error,
            )),
        }
    }

    pub(crate) fn apply_reading(&mut self, raw: &RawCounters) -> MonitorResult<DerivedValues> {
        let snapshot = CounterSnapshot::capture(self.id, self.hardware_events, raw)?;

        self.polls += 1;
        let derived = DerivedValues::compute(
            self.polls,
            self.events,
            self.current_snapshot.as_ref(),
            &snapshot,
            &self.scales,
        );
        self.last_snapshot = self.current_snapshot.replace(snapshot);

        if derived.has_overflow() {
            tracing::warn!(
                "group {}: counters {} overflowed, their deltas are dropped for poll {}",
                self.id,
                derived.overflowed(),
                self.polls
            );
        } else {
            tracing::debug!("group {}: poll {} applied", self.id, self.polls);
        }

        Ok(derived)
    }

    /// Every event is reported overflowed and the next reading becomes a new baseline.
    pub(crate) fn apply_hardware_overflow(&mut self) -> DerivedValues {
        self.polls += 1;
        self.last_snapshot = None;
        self.current_snapshot = None;

        tracing::warn!(
            "group {}: hardware reported counter overflow on poll {}",
            self.id,
            self.polls
        );
        DerivedValues::hardware_overflow(self.polls, self.events)
    }

    pub(crate) fn events(&self) -> EventMask {
        self.events
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == GroupState::Active
    }

    pub(crate) fn info(&self) -> GroupInfo {
        GroupInfo {
            id: self.id,
            target: self.target.clone(),
            events: self.events,
            binding: self.binding,
            state: self.state,
            polls: self.polls,
            last_snapshot: self.last_snapshot.clone(),
            current_snapshot: self.current_snapshot.clone(),
        }
    }

    fn ensure_active(&self) -> MonitorResult<()> {
        match self.state {
            GroupState::Active => Ok(()),
            GroupState::Stopped => Err(MonitorError::already_stopped(self.id)),
        }
    }

    fn monitored_pids(&self) -> MonitorResult<BTreeSet<ProcessId>> {
        self.target
            .pids()
            .cloned()
            .ok_or_else(|| MonitorError::wrong_target_kind(self.id, self.target.kind()))
    }
}
