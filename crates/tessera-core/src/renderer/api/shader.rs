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

//! Shader stage sources and the handles the backend hands out for them.

use crate::renderer::api::common::ShaderStage;
use crate::renderer::error::ShaderError;
use std::borrow::Cow;
use std::path::PathBuf;

/// Where a stage object's source text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// Read from this file every time the stage is compiled.
    File(PathBuf),
    /// Supplied directly by the caller.
    Memory(String),
}

impl ShaderSource {
    /// Returns `true` if the source is read from disk.
    pub fn is_from_file(&self) -> bool {
        matches!(self, ShaderSource::File(_))
    }
}

/// A descriptor used to create a shader stage object.
#[derive(Debug, Clone)]
pub struct ShaderStageDescriptor<'a> {
    /// A debug label, used in compile diagnostics.
    pub label: Cow<'a, str>,
    /// The pipeline stage the object is compiled for.
    pub stage: ShaderStage,
    /// The source text origin.
    pub source: ShaderSource,
}

/// An opaque, stable handle to a shader stage object owned by a render context.
///
/// The handle survives hot reloads; the stage's generation counter tells
/// compiled versions apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderStageId(pub usize);

/// An opaque handle to a compiled backend shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawShaderId(pub u64);

/// An opaque handle to a linked backend program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

/// The result of a link attempt.
///
/// A backend returns a program handle even when linking fails; `linked` and
/// `info_log` carry the diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    /// The program object.
    pub program: ProgramId,
    /// Whether the link status check passed.
    pub linked: bool,
    /// The linker's info log, empty on success for most drivers.
    pub info_log: String,
}

impl LinkedProgram {
    /// The link failure as an error, or `None` if the program linked.
    pub fn link_error(&self) -> Option<ShaderError> {
        (!self.linked).then(|| ShaderError::LinkError {
            details: self.info_log.clone(),
        })
    }
}
