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

//! Renderer configuration.

use crate::renderer::api::common::DEFAULT_BUFFER_ROTATION_DEPTH;
use crate::renderer::api::texture::SamplerDescriptor;
use crate::renderer::error::RenderError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that shape how a render context binds and draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// The number of backing allocations behind each dynamic buffer.
    pub buffer_rotation_depth: usize,
    /// If `false`, dynamic buffers are written in place like any other buffer.
    pub double_buffering: bool,
    /// If `false`, binding still happens but draw calls are skipped.
    pub draw_calls_enabled: bool,
    /// The static sampling policy re-applied to every texture bound on a texture-slot change.
    pub texture_sampling: SamplerDescriptor,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            buffer_rotation_depth: DEFAULT_BUFFER_ROTATION_DEPTH,
            double_buffering: true,
            draw_calls_enabled: true,
            texture_sampling: SamplerDescriptor::default(),
        }
    }
}

impl RendererSettings {
    /// Parses settings from a JSON document. Missing fields take their default.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str::<Self>(json)
            .map(Self::sanitized)
            .map_err(|e| RenderError::InvalidSettings(e.to_string()))
    }

    /// Reads and parses a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read renderer settings '{}'", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse renderer settings '{}'", path.display()))
    }

    /// The rotation depth actually used; a dynamic buffer always has at least one backing.
    pub fn effective_rotation_depth(&self) -> usize {
        if self.double_buffering {
            self.buffer_rotation_depth.max(1)
        } else {
            1
        }
    }

    fn sanitized(mut self) -> Self {
        if self.buffer_rotation_depth == 0 {
            log::warn!("buffer_rotation_depth of 0 is invalid, using 1");
            self.buffer_rotation_depth = 1;
        }
        self
    }
}
