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

mod config;
mod derived;
mod errors;
mod group;
mod poll;
pub mod session;
mod snapshot;

pub use config::SessionConfig;
pub use derived::DerivedValues;
pub use derived::EventSample;
pub use errors::ErrorKind;
pub use errors::MonitorError;
pub use errors::Operation;
pub use group::GroupInfo;
pub use group::GroupState;
pub use poll::GroupPollReport;
pub use poll::PollBatch;
pub use poll::PollOutcome;
pub use session::SessionManager;
pub use snapshot::CounterSnapshot;

pub type MonitorResult<T> = Result<T, MonitorError>;

pub(crate) use rdt_shared::types::*;
