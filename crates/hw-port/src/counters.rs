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

use serde::Deserialize;
use serde::Serialize;

use rdt_shared::events::EventMask;
use rdt_shared::events::MonEvent;

/// Absolute counter values read from hardware for a single binding, one per event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCounters(BTreeMap<MonEvent, u64>);

impl RawCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, event: MonEvent, value: u64) -> Self {
        self.insert(event, value);
        self
    }

    pub fn insert(&mut self, event: MonEvent, value: u64) {
        self.0.insert(event, value);
    }

    pub fn get(&self, event: MonEvent) -> Option<u64> {
        self.0.get(&event).copied()
    }

    pub fn events(&self) -> EventMask {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonEvent, u64)> + '_ {
        self.0.iter().map(|(&event, &value)| (event, value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(MonEvent, u64)> for RawCounters {
    fn from_iter<T: IntoIterator<Item = (MonEvent, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
