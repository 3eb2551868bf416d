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

//! Session manager owns the platform library lifecycle and the registry of monitoring
//! groups.
//!
//! Locks are always taken in the same order: lifecycle, registry, group. Group operations
//! hold the lifecycle lock shared, so operations on different groups run in parallel and
//! operations on the same group serialize on its mutex. `reset` and `teardown` take the
//! lifecycle lock exclusively and so wait for every operation in flight.

mod slot;


use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;

use rdt_hw_port::HardwareAccessPort;
use rdt_hw_port::HwError;
use rdt_hw_port::InterfaceChoice;
use rdt_shared::capabilities::PlatformCapabilities;
use rdt_shared::events::EventMask;

use crate::group::MonitoringGroup;
use crate::DerivedValues;
use crate::GroupId;
use crate::GroupInfo;
use crate::LogicalCoreId;
use crate::MonitorError;
use crate::MonitorResult;
use crate::MonitoringTarget;
use crate::Operation;
use crate::PollBatch;
use crate::ProcessId;
use crate::SessionConfig;
use slot::GroupSlot;

type InitOutcome = MonitorResult<Arc<PlatformCapabilities>>;

pub struct SessionManager<P> {
    port: Arc<P>,
    config: SessionConfig,
    init_gate: OnceCell<InitOutcome>,
    lifecycle: RwLock<Lifecycle>,
    registry: RwLock<HashMap<GroupId, Arc<GroupSlot>>>,
    active_groups: AtomicUsize,
    next_group_id: AtomicU64,
}

enum Lifecycle {
    Uninitialized,
    Ready {
        capabilities: Arc<PlatformCapabilities>,
        group_limit: usize,
    },
    TornDown,
}

impl<P: HardwareAccessPort> SessionManager<P> {
    pub fn new(port: Arc<P>, config: SessionConfig) -> Self {
        Self {
            port,
            config,
            init_gate: OnceCell::new(),
            lifecycle: RwLock::new(Lifecycle::Uninitialized),
            registry: RwLock::new(HashMap::new()),
            active_groups: AtomicUsize::new(0),
            next_group_id: AtomicU64::new(1),
        }
    }

    /// Initializes the platform library. Only the first caller does the work, concurrent
    /// callers wait for it and every caller gets the same outcome. A failed init is final.
    pub fn init(&self) -> MonitorResult<()> {
        let outcome = self.init_gate.get_or_init(|| self.run_init()).clone();

        if matches!(*self.lifecycle.read(), Lifecycle::TornDown) {
            return Err(MonitorError::TornDown);
        }
        outcome.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.lifecycle.read(), Lifecycle::Ready { .. })
    }

    pub fn capabilities(&self) -> MonitorResult<Arc<PlatformCapabilities>> {
        let lifecycle = self.lifecycle.read();
        lifecycle.ready().map(|(capabilities, _)| capabilities.clone())
    }

    /// Interface the platform library actually uses, `Auto` is resolved by then.
    pub fn interface(&self) -> MonitorResult<InterfaceChoice> {
        let lifecycle = self.lifecycle.read();
        lifecycle.ready()?;

        self.port
            .interface()
            .map_err(|error| MonitorError::hardware(Operation::QueryInterface, error))
    }

    /// RMID the core is associated with, 0 is the default one every core starts with.
    pub fn core_rmid(&self, core_id: LogicalCoreId) -> MonitorResult<u32> {
        let lifecycle = self.lifecycle.read();
        let (capabilities, _) = lifecycle.ready()?;
        check_cores(&MonitoringTarget::cores([core_id]), capabilities)?;

        self.port
            .assoc_get(core_id)
            .map_err(|error| MonitorError::hardware(Operation::QueryAssociation, error))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a group and binds it in hardware.
    pub fn start_group(
        &self,
        target: MonitoringTarget,
        events: EventMask,
    ) -> MonitorResult<GroupId> {
        let lifecycle = self.lifecycle.read();
        let (capabilities, group_limit) = lifecycle.ready()?;

        if target.is_empty() {
            return Err(MonitorError::EmptyTarget);
        }
        if events.is_empty() {
            return Err(MonitorError::EmptyEvents);
        }
        check_cores(&target, capabilities)?;

        let supported = capabilities.supported_events();
        if !supported.contains(events) {
            return Err(MonitorError::unsupported_events(events, supported));
        }

        self.reserve_group(group_limit)?;
        let group_id = GroupId::new(self.next_group_id.fetch_add(1, Ordering::SeqCst));
        let group = match MonitoringGroup::create(
            self.port.as_ref(),
            group_id,
            target,
            events,
            capabilities,
        ) {
            Ok(group) => group,
            Err(error) => {
                self.active_groups.fetch_sub(1, Ordering::SeqCst);
                return Err(error);
            }
        };

        self.registry
            .write()
            .insert(group_id, Arc::new(GroupSlot::new(group)));
        Ok(group_id)
    }

    pub fn add_processes(&self, group_id: GroupId, pids: &[ProcessId]) -> MonitorResult<()> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;

        let mut group = slot.lock();
        group.add_processes(self.port.as_ref(), pids)
    }

    pub fn remove_processes(&self, group_id: GroupId, pids: &[ProcessId]) -> MonitorResult<()> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;

        let mut group = slot.lock();
        group.remove_processes(self.port.as_ref(), pids)
    }

    /// Polls the given groups one by one. Fails as a whole only if the session isn't ready,
    /// per-group failures are reported inside the batch.
    pub fn poll_all(&self, group_ids: &[GroupId]) -> MonitorResult<PollBatch> {
        let lifecycle = self.lifecycle.read();
        lifecycle.ready()?;

        let mut batch = PollBatch::with_capacity(group_ids.len());
        for &group_id in group_ids {
            let outcome = self.poll_group(&lifecycle, group_id);
            if let Err(error) = &outcome {
                tracing::debug!("group {group_id}: poll failed: {error}");
            }
            batch.push(group_id, outcome.into());
        }

        Ok(batch)
    }

    /// Polls every active group. Groups stopped while the batch runs are skipped.
    pub fn poll_active(&self) -> MonitorResult<PollBatch> {
        let lifecycle = self.lifecycle.read();
        lifecycle.ready()?;

        // group locks are taken only after the registry guard is gone
        let mut slots = self
            .registry
            .read()
            .iter()
            .map(|(&group_id, slot)| (group_id, slot.clone()))
            .collect::<Vec<_>>();
        slots.sort_by_key(|(group_id, _)| *group_id);

        let mut batch = PollBatch::with_capacity(slots.len());
        for (group_id, slot) in slots {
            let mut group = slot.lock();
            if !group.is_active() {
                continue;
            }
            let outcome = group
                .poll(self.port.as_ref())
                .map(|derived| slot.publish(derived));
            batch.push(group_id, outcome.into());
        }

        Ok(batch)
    }

    /// Stops a group and returns the values it published last, they stay frozen.
    pub fn stop_group(&self, group_id: GroupId) -> MonitorResult<Arc<DerivedValues>> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;

        slot.lock().stop(self.port.as_ref())?;
        self.active_groups.fetch_sub(1, Ordering::SeqCst);

        if !self.config.retain_stopped_groups {
            self.registry.write().remove(&group_id);
        }
        Ok(slot.derived())
    }

    /// Forgets a stopped group.
    pub fn release_group(&self, group_id: GroupId) -> MonitorResult<()> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;

        if slot.lock().is_active() {
            return Err(MonitorError::group_still_active(group_id));
        }

        self.registry
            .write()
            .remove(&group_id)
            .map(|_| ())
            .ok_or_else(|| MonitorError::unknown_group(group_id))
    }

    /// Latest published values of a group, doesn't wait for a poll in progress.
    pub fn derived(&self, group_id: GroupId) -> MonitorResult<Arc<DerivedValues>> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;
        Ok(slot.derived())
    }

    pub fn group_info(&self, group_id: GroupId) -> MonitorResult<GroupInfo> {
        let lifecycle = self.lifecycle.read();
        let slot = self.slot(&lifecycle, group_id)?;
        let info = slot.lock().info();
        Ok(info)
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut group_ids = self.registry.read().keys().copied().collect::<Vec<_>>();
        group_ids.sort();
        group_ids
    }

    pub fn active_groups(&self) -> usize {
        self.active_groups.load(Ordering::SeqCst)
    }

    /// Unbinds every group and clears the registry, the session stays initialized.
    /// Group ids aren't reused afterwards.
    pub fn reset(&self) -> MonitorResult<()> {
        let lifecycle = self.lifecycle.write();
        lifecycle.ready()?;

        let failures = self.release_all();
        tracing::info!("monitoring session reset");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::ResetIncomplete { failures })
        }
    }

    /// Releases every group and shuts the platform library down. The session can't be
    /// initialized again.
    pub fn teardown(&self) -> MonitorResult<()> {
        let mut lifecycle = self.lifecycle.write();
        lifecycle.ready()?;

        for (group_id, error) in self.release_all() {
            tracing::warn!("group {group_id}: unbind on teardown failed: {error}");
        }

        *lifecycle = Lifecycle::TornDown;
        tracing::info!("monitoring session torn down");

        self.port
            .teardown()
            .map_err(|error| MonitorError::hardware(Operation::Teardown, error))
    }

    fn run_init(&self) -> InitOutcome {
        let interface = self.config.interface;
        let verbosity = self.config.verbosity;
        tracing::info!(
            "initializing platform library: interface {interface}, verbosity {verbosity}"
        );

        self.port
            .init(interface, verbosity)
            .map_err(|error| MonitorError::hardware(Operation::Init, error))?;

        let capabilities = match self.port.query_capabilities() {
            Ok(capabilities) => Arc::new(capabilities),
            Err(error) => {
                if let Err(teardown_error) = self.port.teardown() {
                    tracing::warn!(
                        "teardown after a failed capabilities query failed: {teardown_error}"
                    );
                }
                return Err(MonitorError::hardware(Operation::QueryCapabilities, error));
            }
        };

        let group_limit = self
            .config
            .group_limit(capabilities.max_monitoring_groups());
        tracing::info!(
            "platform library initialized: events {}, up to {group_limit} groups",
            capabilities.supported_events()
        );

        *self.lifecycle.write() = Lifecycle::Ready {
            capabilities: capabilities.clone(),
            group_limit,
        };
        Ok(capabilities)
    }

    fn poll_group(
        &self,
        lifecycle: &RwLockReadGuard<'_, Lifecycle>,
        group_id: GroupId,
    ) -> MonitorResult<Arc<DerivedValues>> {
        let slot = self.slot(lifecycle, group_id)?;

        let mut group = slot.lock();
        let derived = group.poll(self.port.as_ref())?;
        Ok(slot.publish(derived))
    }

    /// The lifecycle guard proves the caller holds the first lock of the hierarchy.
    fn slot(
        &self,
        lifecycle: &RwLockReadGuard<'_, Lifecycle>,
        group_id: GroupId,
    ) -> MonitorResult<Arc<GroupSlot>> {
        lifecycle.ready()?;
        self.registry
            .read()
            .get(&group_id)
            .cloned()
            .ok_or_else(|| MonitorError::unknown_group(group_id))
    }

    fn reserve_group(&self, group_limit: usize) -> MonitorResult<()> {
        self.active_groups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < group_limit).then_some(active + 1)
            })
            .map(|_| ())
            .map_err(|_| MonitorError::group_limit_reached(group_limit))
    }

    /// Must be called with the lifecycle lock held exclusively.
    fn release_all(&self) -> Vec<(GroupId, HwError)> {
        let slots = std::mem::take(&mut *self.registry.write());
        self.active_groups.store(0, Ordering::SeqCst);

        let mut failures = slots
            .into_iter()
            .filter_map(|(group_id, slot)| {
                let mut group = slot.lock();
                group
                    .release(self.port.as_ref())
                    .err()
                    .map(|error| (group_id, error))
            })
            .collect::<Vec<_>>();
        failures.sort_by_key(|(group_id, _)| *group_id);
        failures
    }
}

impl Lifecycle {
    fn ready(&self) -> MonitorResult<(&Arc<PlatformCapabilities>, usize)> {
        match self {
            Lifecycle::Ready {
                capabilities,
                group_limit,
            } => Ok((capabilities, *group_limit)),
            Lifecycle::Uninitialized => Err(MonitorError::NotInitialized),
            Lifecycle::TornDown => Err(MonitorError::TornDown),
        }
    }
}

/// Core to RMID association needs cores the platform knows about. Nothing to check
/// when the reported topology is empty.
fn check_cores(
    target: &MonitoringTarget,
    capabilities: &PlatformCapabilities,
) -> MonitorResult<()> {
    let Some(core_ids) = target.core_ids() else {
        return Ok(());
    };
    if capabilities.cpu.num_cores() == 0 {
        return Ok(());
    }

    match core_ids
        .iter()
        .find(|&&core_id| !capabilities.cpu.contains_core(core_id))
    {
        Some(&core_id) => Err(MonitorError::unknown_core(core_id)),
        None => Ok(()),
    }
}
