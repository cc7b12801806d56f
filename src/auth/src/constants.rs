// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The default endpoint for the authorize call.
pub const DEFAULT_ENDPOINT: &str = "https://api.backblazeb2.com";

/// Overrides the default endpoint when no endpoint is configured explicitly.
pub const ENDPOINT_VAR: &str = "B2_ENDPOINT";

/// The application key id, used when no key id is configured explicitly.
pub const KEY_ID_VAR: &str = "B2_APPLICATION_KEY_ID";

/// The application key, used when no key is configured explicitly.
pub const APPLICATION_KEY_VAR: &str = "B2_APPLICATION_KEY";

/// The path of the authorize call, relative to the endpoint.
pub(crate) const AUTHORIZE_PATH: &str = "/b2api/v2/b2_authorize_account";
