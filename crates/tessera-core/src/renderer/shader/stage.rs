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

use crate::renderer::{
    api::{RawShaderId, ShaderSource, ShaderStage, ShaderStageDescriptor},
    error::{ResourceError, ShaderError},
    traits::GraphicsBackend,
};
use std::fs;

/// A compiled shader for one pipeline stage.
///
/// The backend object is only ever replaced by a successful compile; each
/// replacement bumps [`generation`](Self::generation).
#[derive(Debug)]
pub struct ShaderStageObject {
    label: String,
    stage: ShaderStage,
    source: ShaderSource,
    source_text: String,
    raw: RawShaderId,
    generation: u32,
}

impl ShaderStageObject {
    /// Loads and compiles a stage object.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::LoadError`] if a file source cannot be read,
    /// or the backend's compile error.
    pub fn compile(
        backend: &mut dyn GraphicsBackend,
        descriptor: &ShaderStageDescriptor,
    ) -> Result<Self, ResourceError> {
        let source_text = load_source(&descriptor.source)?;
        let raw = compile_logged(backend, descriptor.stage, &descriptor.label, &source_text)?;
        Ok(Self {
            label: descriptor.label.to_string(),
            stage: descriptor.stage,
            source: descriptor.source.clone(),
            source_text,
            raw,
            generation: 0,
        })
    }

    /// Compiles `source`, or the object's own source when `None`, and swaps it
    /// in on success.
    ///
    /// On failure the current backend object stays in place and the new one
    /// is discarded.
    pub fn recompile(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        source: Option<ShaderSource>,
    ) -> Result<(), ResourceError> {
        let source = source.unwrap_or_else(|| self.source.clone());
        let source_text = load_source(&source)?;
        let raw = compile_logged(backend, self.stage, &self.label, &source_text)?;

        let old = std::mem::replace(&mut self.raw, raw);
        if let Err(e) = backend.destroy_shader(old) {
            log::warn!("Failed to destroy replaced shader '{}': {}", self.label, e);
        }
        self.source = source;
        self.source_text = source_text;
        self.generation = self.generation.wrapping_add(1);
        log::info!(
            "Reloaded shader '{}' (generation {})",
            self.label,
            self.generation
        );
        Ok(())
    }

    /// Releases the backend object.
    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        if let Err(e) = backend.destroy_shader(self.raw) {
            log::warn!("Failed to destroy shader '{}': {}", self.label, e);
        }
    }

    /// The current backend object.
    pub fn raw(&self) -> RawShaderId {
        self.raw
    }

    /// Number of successful recompiles.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The stage this object runs in.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Where the source comes from.
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// The source text of the current backend object.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

fn load_source(source: &ShaderSource) -> Result<String, ShaderError> {
    match source {
        ShaderSource::Memory(text) => Ok(text.clone()),
        ShaderSource::File(path) => fs::read_to_string(path).map_err(|e| ShaderError::LoadError {
            path: path.display().to_string(),
            source_error: e.to_string(),
        }),
    }
}

fn compile_logged(
    backend: &mut dyn GraphicsBackend,
    stage: ShaderStage,
    label: &str,
    source: &str,
) -> Result<RawShaderId, ResourceError> {
    backend.compile_shader(stage, label, source).map_err(|e| {
        log::error!("{e}");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mock::{Call, MockBackend};
    use std::borrow::Cow;

    fn descriptor(source: ShaderSource) -> ShaderStageDescriptor<'static> {
        ShaderStageDescriptor {
            label: Cow::Borrowed("test_vs"),
            stage: ShaderStage::Vertex,
            source,
        }
    }

    #[test]
    fn compiles_from_memory() {
        let mut backend = MockBackend::new();
        let text = "void main() {}".to_string();
        let shader =
            ShaderStageObject::compile(&mut backend, &descriptor(ShaderSource::Memory(text.clone())))
                .unwrap();
        assert_eq!(shader.source_text(), text);
        assert_eq!(shader.generation(), 0);
        assert!(!shader.source().is_from_file());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let mut backend = MockBackend::new();
        let source = ShaderSource::File("/nonexistent/shader.vert".into());
        let err = ShaderStageObject::compile(&mut backend, &descriptor(source)).unwrap_err();
        assert!(matches!(err, ResourceError::Shader(ShaderError::LoadError { .. })));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn recompile_rereads_file_sources() {
        let mut backend = MockBackend::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"v1").unwrap();
        let source = ShaderSource::File(file.path().to_path_buf());
        let mut shader = ShaderStageObject::compile(&mut backend, &descriptor(source)).unwrap();
        assert_eq!(shader.source_text(), "v1");

        std::fs::write(file.path(), "v2").unwrap();
        shader.recompile(&mut backend, None).unwrap();
        assert_eq!(shader.source_text(), "v2");
        assert!(shader.source().is_from_file());
    }

    #[test]
    fn successful_recompile_replaces_and_bumps_generation() {
        let mut backend = MockBackend::new();
        let mut shader = ShaderStageObject::compile(
            &mut backend,
            &descriptor(ShaderSource::Memory("v1".into())),
        )
        .unwrap();
        let old = shader.raw();

        shader
            .recompile(&mut backend, Some(ShaderSource::Memory("v2".into())))
            .unwrap();
        assert_ne!(shader.raw(), old);
        assert_eq!(shader.generation(), 1);
        assert_eq!(shader.source_text(), "v2");
        assert!(backend.calls.contains(&Call::DestroyShader(old)));
    }

    #[test]
    fn failed_recompile_keeps_the_old_object() {
        let mut backend = MockBackend::new();
        let mut shader = ShaderStageObject::compile(
            &mut backend,
            &descriptor(ShaderSource::Memory("v1".into())),
        )
        .unwrap();
        let old = shader.raw();

        let result = shader.recompile(&mut backend, Some(ShaderSource::Memory("#error".into())));
        assert!(matches!(
            result,
            Err(ResourceError::Shader(ShaderError::CompilationError { .. }))
        ));
        assert_eq!(shader.raw(), old);
        assert_eq!(shader.generation(), 0);
        assert_eq!(shader.source_text(), "v1");
        assert_eq!(backend.count(|c| matches!(c, Call::DestroyShader(_))), 0);
    }
}
