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

use rdt_hw_port::InterfaceChoice;
use rdt_hw_port::Verbosity;

pub(crate) fn default_interface() -> InterfaceChoice {
    InterfaceChoice::Auto
}

pub(crate) fn default_verbosity() -> Verbosity {
    Verbosity::Default
}

pub(crate) fn default_retain_stopped_groups() -> bool {
    true
}
