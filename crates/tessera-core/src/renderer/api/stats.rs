// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Counters describing what the binding engine did.

/// Counters accumulated by a render context since creation or the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// The frame counter at the time the stats were read.
    pub frame_number: u64,
    /// Draw calls handed to the backend.
    pub draw_calls: u32,
    /// Draws skipped because no program could be resolved.
    pub draws_skipped: u32,
    /// Draws whose binding ran while draw calls were disabled.
    pub draws_suppressed: u32,
    /// Program cache lookups that found an existing program.
    pub program_cache_hits: u32,
    /// Program cache lookups that linked a new program.
    pub program_cache_misses: u32,
    /// Dynamic buffer writes that moved to the next backing allocation.
    pub buffer_rotations: u32,
    /// Buffer writes that had to reallocate every backing allocation.
    pub buffer_reallocations: u32,
    /// Backend calls that reported an error during binding or drawing.
    pub backend_errors: u32,
}
