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

mod core_id;
mod group_id;
mod process;
mod target;

pub use core_id::CPUIdType;
pub use core_id::LogicalCoreId;
pub use group_id::GroupId;
pub use group_id::GroupIdInner;
pub use process::ProcessId;
pub use process::ProcessIdInner;
pub use target::MonitoringTarget;
pub use target::TargetKind;
