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

use rdt_shared::events::EventMask;

use crate::DerivedValues;
use crate::GroupId;
use crate::MonitorError;

/// Result of polling a set of groups. Every requested group gets a report, failures of
/// one group never prevent others from being polled.
#[derive(Clone, Debug, Default)]
pub struct PollBatch {
    reports: Vec<GroupPollReport>,
}

#[derive(Clone, Debug)]
pub struct GroupPollReport {
    pub group_id: GroupId,
    pub outcome: PollOutcome,
}

#[derive(Clone, Debug)]
pub enum PollOutcome {
    Polled(Arc<DerivedValues>),
    Failed(MonitorError),
}

impl PollBatch {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            reports: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, group_id: GroupId, outcome: PollOutcome) {
        self.reports.push(GroupPollReport { group_id, outcome });
    }

    pub fn reports(&self) -> &[GroupPollReport] {
        &self.reports
    }

    pub fn report(&self, group_id: GroupId) -> Option<&GroupPollReport> {
        self.reports
            .iter()
            .find(|report| report.group_id == group_id)
    }

    /// Fresh values of a group polled by this batch.
    pub fn derived(&self, group_id: GroupId) -> Option<&Arc<DerivedValues>> {
        match &self.report(group_id)?.outcome {
            PollOutcome::Polled(derived) => Some(derived),
            PollOutcome::Failed(_) => None,
        }
    }

    pub fn polled(&self) -> impl Iterator<Item = (GroupId, &Arc<DerivedValues>)> + '_ {
        self.reports.iter().filter_map(|report| match &report.outcome {
            PollOutcome::Polled(derived) => Some((report.group_id, derived)),
            PollOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (GroupId, &MonitorError)> + '_ {
        self.reports.iter().filter_map(|report| match &report.outcome {
            PollOutcome::Failed(error) => Some((report.group_id, error)),
            PollOutcome::Polled(_) => None,
        })
    }

    /// Groups with overflowed counters and the events that overflowed.
    pub fn overflows(&self) -> impl Iterator<Item = (GroupId, EventMask)> + '_ {
        self.polled()
            .filter(|(_, derived)| derived.has_overflow())
            .map(|(group_id, derived)| (group_id, derived.overflowed()))
    }

    pub fn has_overflow(&self) -> bool {
        self.overflows().next().is_some()
    }

    /// Overflows of this batch expressed as errors, for callers that treat them uniformly
    /// with the other failures.
    pub fn overflow_errors(&self) -> Vec<MonitorError> {
        self.overflows()
            .map(|(group_id, events)| MonitorError::counter_overflow(group_id, events))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none() && !self.has_overflow()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl PollOutcome {
    pub fn is_polled(&self) -> bool {
        matches!(self, PollOutcome::Polled(_))
    }
}

impl From<Result<Arc<DerivedValues>, MonitorError>> for PollOutcome {
    fn from(result: Result<Arc<DerivedValues>, MonitorError>) -> Self {
        match result {
            Ok(derived) => PollOutcome::Polled(derived),
            Err(error) => PollOutcome::Failed(error),
        }
    }
}
