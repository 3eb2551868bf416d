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

use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use parking_lot::RwLock;

use crate::group::MonitoringGroup;
use crate::DerivedValues;

/// A registered group together with the latest values it published.
/// Readers of the values never contend with a poll in progress.
pub(crate) struct GroupSlot {
    group: Mutex<MonitoringGroup>,
    derived: RwLock<Arc<DerivedValues>>,
}

impl GroupSlot {
    pub(crate) fn new(group: MonitoringGroup) -> Self {
        let derived = Arc::new(DerivedValues::pending(group.events()));
        Self {
            group: Mutex::new(group),
            derived: RwLock::new(derived),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MonitoringGroup> {
        self.group.lock()
    }

    pub(crate) fn derived(&self) -> Arc<DerivedValues> {
        self.derived.read().clone()
    }

    pub(crate) fn publish(&self, derived: DerivedValues) -> Arc<DerivedValues> {
        let derived = Arc::new(derived);
        *self.derived.write() = derived.clone();
        derived
    }
}
