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

use thiserror::Error as ThisError;

use rdt_hw_port::HwError;
use rdt_shared::events::EventMask;
use rdt_shared::events::MonEvent;

use crate::GroupId;
use crate::LogicalCoreId;
use crate::ProcessId;
use crate::TargetKind;

/// Coarse classification of monitor errors, stable across releases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotInitialized,
    InvalidArgument,
    InvalidOperation,
    Unsupported,
    Busy,
    Transport,
    OverflowDetected,
    AlreadyStopped,
}

/// Port operation that produced a hardware error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Teardown,
    QueryCapabilities,
    QueryInterface,
    QueryAssociation,
    Bind,
    Unbind,
    AddProcesses,
    RemoveProcesses,
    ReadCounters,
}

#[derive(ThisError, Clone, Debug, PartialEq)]
pub enum MonitorError {
    #[error("monitoring session is not initialized")]
    NotInitialized,

    #[error("monitoring session was torn down and can't be initialized again")]
    TornDown,

    #[error("monitoring target should contain at least one core or process")]
    EmptyTarget,

    #[error("at least one event should be requested")]
    EmptyEvents,

    #[error("at least one process id should be provided")]
    EmptyPids,

    #[error("logical core {core_id} isn't present in the platform topology")]
    UnknownCore { core_id: LogicalCoreId },

    #[error("processes {pids:?} aren't monitored by group {group_id}")]
    PidsNotInGroup {
        group_id: GroupId,
        pids: Vec<ProcessId>,
    },

    #[error("removing all processes of group {group_id} would leave it empty")]
    WouldEmptyTarget { group_id: GroupId },

    #[error("group {group_id} isn't known to the session")]
    UnknownGroup { group_id: GroupId },

    #[error("group {group_id} monitors {kind}, its target set can't be changed")]
    WrongTargetKind { group_id: GroupId, kind: TargetKind },

    #[error("group {group_id} is still active, stop it first")]
    GroupStillActive { group_id: GroupId },

    #[error("events {requested} aren't supported, the platform supports {supported}")]
    UnsupportedEvents {
        requested: EventMask,
        supported: EventMask,
    },

    #[error("limit of {limit} active monitoring groups is reached")]
    GroupLimitReached { limit: usize },

    #[error("reading of group {group_id} lacks the {event} counter")]
    MissingCounter { group_id: GroupId, event: MonEvent },

    #[error("counters {events} of group {group_id} overflowed")]
    CounterOverflow { group_id: GroupId, events: EventMask },

    #[error("group {group_id} is already stopped")]
    AlreadyStopped { group_id: GroupId },

    #[error("hardware {operation} failed: {error}")]
    Hardware {
        operation: Operation,
        group_id: Option<GroupId>,
        #[source]
        error: HwError,
    },

    #[error("reset left {} groups bound in hardware: {failures:?}", .failures.len())]
    ResetIncomplete { failures: Vec<(GroupId, HwError)> },
}

impl MonitorError {
    pub fn unknown_core(core_id: LogicalCoreId) -> Self {
        Self::UnknownCore { core_id }
    }

    pub fn pids_not_in_group(group_id: GroupId, pids: Vec<ProcessId>) -> Self {
        Self::PidsNotInGroup { group_id, pids }
    }

    pub fn would_empty_target(group_id: GroupId) -> Self {
        Self::WouldEmptyTarget { group_id }
    }

    pub fn unknown_group(group_id: GroupId) -> Self {
        Self::UnknownGroup { group_id }
    }

    pub fn wrong_target_kind(group_id: GroupId, kind: TargetKind) -> Self {
        Self::WrongTargetKind { group_id, kind }
    }

    pub fn group_still_active(group_id: GroupId) -> Self {
        Self::GroupStillActive { group_id }
    }

    pub fn unsupported_events(requested: EventMask, supported: EventMask) -> Self {
        Self::UnsupportedEvents {
            requested,
            supported,
        }
    }

    pub fn group_limit_reached(limit: usize) -> Self {
        Self::GroupLimitReached { limit }
    }

    pub fn missing_counter(group_id: GroupId, event: MonEvent) -> Self {
        Self::MissingCounter { group_id, event }
    }

    pub fn counter_overflow(group_id: GroupId, events: EventMask) -> Self {
        Self::CounterOverflow { group_id, events }
    }

    pub fn already_stopped(group_id: GroupId) -> Self {
        Self::AlreadyStopped { group_id }
    }

    pub fn hardware(operation: Operation, error: HwError) -> Self {
        Self::Hardware {
            operation,
            group_id: None,
            error,
        }
    }

    pub fn group_hardware(operation: Operation, group_id: GroupId, error: HwError) -> Self {
        Self::Hardware {
            operation,
            group_id: Some(group_id),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized | Self::TornDown => ErrorKind::NotInitialized,
            Self::EmptyTarget
            | Self::EmptyEvents
            | Self::EmptyPids
            | Self::UnknownCore { .. }
            | Self::PidsNotInGroup { .. }
            | Self::WouldEmptyTarget { .. }
            | Self::UnknownGroup { .. } => ErrorKind::InvalidArgument,
            Self::WrongTargetKind { .. } | Self::GroupStillActive { .. } => {
                ErrorKind::InvalidOperation
            }
            Self::UnsupportedEvents { .. } => ErrorKind::Unsupported,
            Self::GroupLimitReached { .. } => ErrorKind::Busy,
            Self::MissingCounter { .. } | Self::ResetIncomplete { .. } => ErrorKind::Transport,
            Self::CounterOverflow { .. } => ErrorKind::OverflowDetected,
            Self::AlreadyStopped { .. } => ErrorKind::AlreadyStopped,
            Self::Hardware { error, .. } => hw_error_kind(error),
        }
    }
}

fn hw_error_kind(error: &HwError) -> ErrorKind {
    match error {
        HwError::Busy => ErrorKind::Busy,
        HwError::Transport { .. } => ErrorKind::Transport,
        HwError::Overflow => ErrorKind::OverflowDetected,
        HwError::Unsupported { .. } => ErrorKind::Unsupported,
        HwError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        // the platform library stays unusable after a failed init
        HwError::Init { .. } => ErrorKind::NotInitialized,
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::Teardown => "teardown",
            Operation::QueryCapabilities => "capabilities query",
            Operation::QueryInterface => "interface query",
            Operation::QueryAssociation => "core association query",
            Operation::Bind => "bind",
            Operation::Unbind => "unbind",
            Operation::AddProcesses => "process addition",
            Operation::RemoveProcesses => "process removal",
            Operation::ReadCounters => "counters read",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_errors_keep_their_kind() {
        let group_id = GroupId::new(3);

        let busy = MonitorError::group_hardware(Operation::ReadCounters, group_id, HwError::Busy);
        assert_eq!(busy.kind(), ErrorKind::Busy);

        let transport = MonitorError::group_hardware(
            Operation::ReadCounters,
            group_id,
            HwError::transport("resctrl is gone"),
        );
        assert_eq!(transport.kind(), ErrorKind::Transport);

        let init = MonitorError::hardware(Operation::Init, HwError::init("no msr"));
        assert_eq!(init.kind(), ErrorKind::NotInitialized);
    }

    #[test]
    fn target_misuse_is_an_invalid_operation() {
        let error = MonitorError::wrong_target_kind(GroupId::new(1), TargetKind::Cores);
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            error.to_string(),
            "group 1 monitors cores, its target set can't be changed"
        );
    }

    #[test]
    fn torn_down_session_reads_as_not_initialized() {
        assert_eq!(MonitorError::TornDown.kind(), ErrorKind::NotInitialized);
        assert_eq!(
            MonitorError::group_limit_reached(15).kind(),
            ErrorKind::Busy
        );
    }
}
