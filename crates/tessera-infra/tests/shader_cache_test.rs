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

//! Program cache behavior seen through a render context: keying, eviction on
//! recompile, link failures and binding-point discovery.

use std::borrow::Cow;
use std::io::Write;
use tessera_core::renderer::api::*;
use tessera_core::renderer::{RenderContext, ResourceError, ShaderError};
use tessera_infra::graphics::headless::BackendCall;
use tessera_infra::HeadlessBackend;

fn context() -> RenderContext<HeadlessBackend> {
    tessera_infra::logging::init_for_tests();
    RenderContext::new(HeadlessBackend::new(), RendererSettings::default())
}

fn shader(ctx: &mut RenderContext<HeadlessBackend>, stage: ShaderStage, source: &str) -> ShaderStageId {
    ctx.create_shader(&ShaderStageDescriptor {
        label: Cow::Borrowed("test"),
        stage,
        source: ShaderSource::Memory(source.to_string()),
    })
    .expect("shader should compile")
}

fn stages(vertex: ShaderStageId, pixel: Option<ShaderStageId>) -> [Option<ShaderStageId>; SHADER_STAGE_COUNT] {
    let mut stages = [None; SHADER_STAGE_COUNT];
    stages[ShaderStage::Vertex.index()] = Some(vertex);
    stages[ShaderStage::Pixel.index()] = pixel;
    stages
}

#[test]
fn same_combination_resolves_to_same_program() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "void main() {}");
    let ps = shader(&mut ctx, ShaderStage::Pixel, "void main() {}");

    let first = ctx.resolve_program(&stages(vs, Some(ps))).unwrap().unwrap();
    let second = ctx.resolve_program(&stages(vs, Some(ps))).unwrap().unwrap();
    assert_eq!(first.program, second.program);
    assert!(first.linked);
    assert_eq!(ctx.stats().program_cache_misses, 1);
    assert_eq!(ctx.stats().program_cache_hits, 1);
}

#[test]
fn overlapping_combinations_resolve_to_different_programs() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "void main() {}");
    let ps_a = shader(&mut ctx, ShaderStage::Pixel, "void main() {}");
    let ps_b = shader(&mut ctx, ShaderStage::Pixel, "void main() {}");

    let a = ctx.resolve_program(&stages(vs, Some(ps_a))).unwrap().unwrap();
    let b = ctx.resolve_program(&stages(vs, Some(ps_b))).unwrap().unwrap();
    let vs_only = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();
    assert_ne!(a.program, b.program);
    assert_ne!(a.program, vs_only.program);
    assert_eq!(ctx.programs().len(), 3);
}

#[test]
fn discovery_binds_numbered_names_until_a_gap() {
    let mut ctx = context();
    let vs = shader(
        &mut ctx,
        ShaderStage::Vertex,
        "uniform buffer0 { mat4 view; };\nuniform buffer1 { mat4 model; };\nuniform buffer3 { vec4 unused; };",
    );
    let ps = shader(
        &mut ctx,
        ShaderStage::Pixel,
        "uniform sampler2D texture0;\nuniform sampler2D texture1;",
    );
    let program = ctx
        .resolve_program(&stages(vs, Some(ps)))
        .unwrap()
        .unwrap()
        .program;

    let backend = ctx.backend();
    assert_eq!(backend.uniform_block_binding(program, "buffer0"), Some(0));
    assert_eq!(backend.uniform_block_binding(program, "buffer1"), Some(1));
    assert_eq!(
        backend.uniform_block_binding(program, "buffer3"),
        None,
        "discovery stops at the missing buffer2"
    );
    assert_eq!(backend.sampler_unit(program, "texture1"), Some(1));
}

#[test]
fn failed_link_is_cached_and_returned() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "uniform buffer0 { mat4 m; };");
    ctx.backend_mut().failures.link = true;

    let first = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();
    assert!(!first.linked);
    ctx.backend_mut().failures.link = false;
    let second = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();

    assert_eq!(first, second, "the broken program stays cached");
    let backend = ctx.backend();
    assert_eq!(backend.count(|c| matches!(c, BackendCall::LinkProgram { .. })), 1);
    assert_eq!(
        backend.count(|c| matches!(c, BackendCall::BindUniformBlock { .. })),
        0
    );
}

#[test]
fn recompile_invalidates_cached_programs() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "void main() {}");
    let ps = shader(&mut ctx, ShaderStage::Pixel, "void main() {}");
    let before = ctx.resolve_program(&stages(vs, Some(ps))).unwrap().unwrap();

    ctx.recompile_shader(ps, Some(ShaderSource::Memory("uniform sampler2D texture0;".into())))
        .unwrap();
    assert_eq!(ctx.shader(ps).unwrap().generation(), 1);
    assert!(ctx
        .backend()
        .calls()
        .contains(&BackendCall::DestroyProgram(before.program)));

    let after = ctx.resolve_program(&stages(vs, Some(ps))).unwrap().unwrap();
    assert_ne!(before.program, after.program);
    assert_eq!(ctx.backend().sampler_unit(after.program, "texture0"), Some(0));
}

#[test]
fn failed_recompile_keeps_the_previous_shader() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "void main() {}");
    let program = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();
    let raw = ctx.shader(vs).unwrap().raw();

    let err = ctx
        .recompile_shader(vs, Some(ShaderSource::Memory("#error broken".into())))
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Shader(ShaderError::CompilationError { .. })
    ));
    assert_eq!(ctx.shader(vs).unwrap().raw(), raw);
    assert_eq!(
        ctx.resolve_program(&stages(vs, None)).unwrap().unwrap(),
        program,
        "the cache entry survives a failed recompile"
    );
}

#[test]
fn file_shaders_hot_reload() {
    let mut ctx = context();
    let mut file = tempfile::Builder::new().suffix(".vert").tempfile().unwrap();
    writeln!(file, "uniform buffer0 {{ mat4 m; }};").unwrap();

    let vs = ctx
        .create_shader(&ShaderStageDescriptor {
            label: Cow::Borrowed("hot.vert"),
            stage: ShaderStage::Vertex,
            source: ShaderSource::File(file.path().to_path_buf()),
        })
        .unwrap();
    let before = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();
    assert_eq!(ctx.backend().uniform_block_binding(before.program, "buffer1"), None);

    std::fs::write(
        file.path(),
        "uniform buffer0 { mat4 m; };\nuniform buffer1 { vec4 tint; };",
    )
    .unwrap();
    ctx.recompile_shader(vs, None).unwrap();

    let after = ctx.resolve_program(&stages(vs, None)).unwrap().unwrap();
    assert_eq!(ctx.backend().uniform_block_binding(after.program, "buffer1"), Some(1));
}

#[test]
fn unreadable_shader_file_is_a_load_error() {
    let mut ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let err = ctx
        .create_shader(&ShaderStageDescriptor {
            label: Cow::Borrowed("missing"),
            stage: ShaderStage::Pixel,
            source: ShaderSource::File(dir.path().join("missing.frag")),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Shader(ShaderError::LoadError { .. })
    ));
}

#[test]
fn destroying_a_stage_evicts_its_programs() {
    let mut ctx = context();
    let vs = shader(&mut ctx, ShaderStage::Vertex, "void main() {}");
    let ps = shader(&mut ctx, ShaderStage::Pixel, "void main() {}");
    ctx.resolve_program(&stages(vs, Some(ps))).unwrap();
    ctx.resolve_program(&stages(vs, None)).unwrap();

    ctx.destroy_shader(ps).unwrap();
    assert_eq!(ctx.programs().len(), 1);
    assert_eq!(ctx.backend().live_programs(), 1);
    assert!(matches!(
        ctx.resolve_program(&stages(vs, Some(ps))),
        Err(ResourceError::NotFound)
    ));
}
