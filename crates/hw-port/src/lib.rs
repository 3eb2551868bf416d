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

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

/// This crate defines the boundary between the monitoring session manager and the platform
/// library that actually talks to the hardware (MSR or resctrl based). Nothing here touches
/// hardware, implementations of the port live outside.

mod counters;
mod errors;
mod handle;
mod interface;

pub use counters::RawCounters;
pub use errors::HwError;
pub use handle::BindingHandle;
pub use interface::InterfaceChoice;
pub use interface::Verbosity;

use rdt_shared::capabilities::PlatformCapabilities;
use rdt_shared::events::EventMask;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::MonitoringTarget;
use rdt_shared::types::ProcessId;

pub type HwResult<T> = Result<T, HwError>;

/// Access to the monitoring hardware. Calls may come from several threads at once,
/// but never for the same binding concurrently.
pub trait HardwareAccessPort: Send + Sync {
    /// Initializes the platform library, could be done only once per process.
    fn init(&self, interface: InterfaceChoice, verbosity: Verbosity) -> HwResult<()>;

    /// Shuts the platform library down.
    fn teardown(&self) -> HwResult<()>;

    fn query_capabilities(&self) -> HwResult<PlatformCapabilities>;

    /// Interface the library settled on during init, never `Auto`.
    fn interface(&self) -> HwResult<InterfaceChoice>;

    /// RMID the logical core is associated with, 0 when no group monitors the core.
    fn assoc_get(&self, core: LogicalCoreId) -> HwResult<u32>;

    /// Allocates an RMID for the target and starts counting the given hardware events.
    fn bind_target(&self, target: &MonitoringTarget, events: EventMask)
        -> HwResult<BindingHandle>;

    /// Releases the binding and its RMID.
    fn unbind(&self, handle: BindingHandle) -> HwResult<()>;

    fn add_to_target(&self, handle: BindingHandle, pids: &[ProcessId]) -> HwResult<()>;

    fn remove_from_target(&self, handle: BindingHandle, pids: &[ProcessId]) -> HwResult<()>;

    /// Returns absolute values of every bound event.
    fn read_counters(&self, handle: BindingHandle) -> HwResult<RawCounters>;
}
