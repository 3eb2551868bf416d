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

use newtype_derive::newtype_fmt;
use serde::Deserialize;
use serde::Serialize;

pub type GroupIdInner = u64;

/// Opaque handle of a monitoring group, issued by a session manager and never reused by it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct GroupId(GroupIdInner);

newtype_derive::NewtypeFrom! { () pub struct GroupId(GroupIdInner); }
newtype_derive::NewtypeDisplay! { () pub struct GroupId(GroupIdInner); }

impl GroupId {
    pub const fn new(id: GroupIdInner) -> Self {
        Self(id)
    }
}
