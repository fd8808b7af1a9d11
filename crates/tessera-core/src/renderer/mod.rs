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

//! Provides the public, backend-agnostic rendering contracts and the binding engine.
//!
//! The renderer describes each draw call with a [`PipelineState`]. The
//! [`StateMachine`] diffs it against what is currently bound and produces a
//! [`ChangeSet`], and the binder realizes only the changed slots through a
//! [`GraphicsBackend`] before issuing the draw. Concrete backends live in the
//! `tessera-infra` crate.

pub mod api;
pub mod context;
pub mod error;
pub mod resource;
pub mod shader;
pub mod state;
pub mod traits;

mod binder;
#[cfg(test)]
pub(crate) mod mock;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::context::{DrawOutcome, RenderContext};
pub use self::error::{RenderError, ResourceError, ShaderError};
pub use self::resource::{BufferState, GpuBuffer, WriteOutcome};
pub use self::shader::{CachedProgram, ProgramCache, ProgramKey, ShaderStageObject, StageIdentity};
pub use self::state::{ChangeSet, StateMachine};
pub use self::traits::GraphicsBackend;
