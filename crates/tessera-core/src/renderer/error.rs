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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::layout::VertexFormat;
use std::fmt;

/// An error related to loading, compiling or linking shader code.
#[derive(Debug)]
pub enum ShaderError {
    /// An error occurred while trying to load the shader source from a path.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error.
        source_error: String,
    },
    /// The shader source failed to compile into a backend stage object.
    CompilationError {
        /// A descriptive label for the shader.
        label: String,
        /// The compiler's info log.
        details: String,
    },
    /// A combination of stage objects failed to link into a program.
    LinkError {
        /// The linker's info log.
        details: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(
                    f,
                    "cannot read shader source '{path}': {source_error}"
                )
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "shader '{label}' failed to compile: {details}")
            }
            ShaderError::LinkError { details } => {
                write!(f, "program link failed: {details}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// The backend failed to create an object.
    AllocationFailed(String),
    /// A CPU-visible pointer to buffer memory could not be obtained.
    MapFailed(String),
    /// A vertex element format the layout builder does not know how to feed.
    UnsupportedFormat(VertexFormat),
    /// An input element references a vertex stream that has no buffer bound.
    MissingVertexStream {
        /// The input slot of the missing stream.
        slot: u32,
    },
    /// A generic resource could not be found.
    NotFound,
    /// An error code reported by the graphics backend after a call.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "{err}"),
            ResourceError::AllocationFailed(msg) => {
                write!(f, "backend allocation failed: {msg}")
            }
            ResourceError::MapFailed(msg) => write!(f, "buffer map failed: {msg}"),
            ResourceError::UnsupportedFormat(format) => {
                write!(f, "vertex format {format:?} has no attribute mapping")
            }
            ResourceError::MissingVertexStream { slot } => {
                write!(f, "no vertex stream bound for input slot {slot}")
            }
            ResourceError::NotFound => write!(f, "no resource with this handle"),
            ResourceError::BackendError(msg) => {
                write!(f, "backend call failed: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error returned by [`RenderContext`](crate::renderer::RenderContext) operations.
#[derive(Debug)]
pub enum RenderError {
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The renderer settings could not be parsed.
    InvalidSettings(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ResourceError(err) => {
                write!(f, "{err}")
            }
            RenderError::InvalidSettings(msg) => write!(f, "invalid renderer settings: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}
