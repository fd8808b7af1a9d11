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
    api::{
        ProgramId, RawShaderId, ShaderStageId, SAMPLER_UNIFORM_PREFIX, SHADER_STAGE_COUNT,
        UNIFORM_BLOCK_PREFIX,
    },
    error::ResourceError,
    traits::GraphicsBackend,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A stage object as seen by the cache: its handle plus how many times it
/// has been recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageIdentity {
    /// The stable stage handle.
    pub id: ShaderStageId,
    /// The stage's generation when the program was linked.
    pub generation: u32,
}

/// The ordered combination of stage identities a program is linked from.
///
/// Two keys are equal only if every stage slot holds the same identity, so
/// the same stages in different slots, or a recompiled stage, produce a
/// different key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    stages: [Option<StageIdentity>; SHADER_STAGE_COUNT],
}

impl ProgramKey {
    /// Builds a key from per-slot identities, indexed like
    /// [`ShaderStage::index`](crate::renderer::api::ShaderStage::index).
    pub fn new(stages: [Option<StageIdentity>; SHADER_STAGE_COUNT]) -> Self {
        Self { stages }
    }

    /// Returns `true` if no stage slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Option::is_none)
    }

    /// Returns `true` if any slot holds `id`, whatever its generation.
    pub fn contains(&self, id: ShaderStageId) -> bool {
        self.stages.iter().flatten().any(|s| s.id == id)
    }

    /// Per-slot identities.
    pub fn stages(&self) -> &[Option<StageIdentity>; SHADER_STAGE_COUNT] {
        &self.stages
    }

    /// A 64-bit digest of the key, for diagnostics.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedProgram {
    /// The backend program.
    pub program: ProgramId,
    /// Whether the link succeeded. Failed links are cached too.
    pub linked: bool,
}

/// Linked programs, one per distinct stage combination ever resolved.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: HashMap<ProgramKey, CachedProgram>,
    hits: u32,
    misses: u32,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program for `key`, linking `shaders` on a miss.
    ///
    /// `shaders` are the backend objects of the key's occupied slots, in slot
    /// order. A program whose link fails is logged and cached anyway; its
    /// entry carries `linked == false`. Binding-point discovery only runs for
    /// programs that linked.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] only if the backend could not create the
    /// program object at all. Nothing is cached in that case.
    pub fn resolve(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        key: ProgramKey,
        shaders: &[RawShaderId],
    ) -> Result<CachedProgram, ResourceError> {
        if let Some(cached) = self.programs.get(&key) {
            self.hits += 1;
            return Ok(*cached);
        }

        self.misses += 1;
        let linked = backend.link_program(shaders)?;
        if let Some(err) = linked.link_error() {
            log::error!("Program for key {:016x}: {}", key.fingerprint(), err);
        } else {
            let (blocks, samplers) = discover_bindings(backend, linked.program);
            log::debug!(
                "Linked program {:?} for key {:016x}: {} uniform blocks, {} samplers",
                linked.program,
                key.fingerprint(),
                blocks,
                samplers
            );
        }

        let entry = CachedProgram {
            program: linked.program,
            linked: linked.linked,
        };
        self.programs.insert(key, entry);
        Ok(entry)
    }

    /// Looks up a program without linking.
    pub fn get(&self, key: &ProgramKey) -> Option<CachedProgram> {
        self.programs.get(key).copied()
    }

    /// Evicts and destroys every program linked from `stage`. Returns the
    /// number of evicted programs.
    pub fn invalidate_stage(&mut self, backend: &mut dyn GraphicsBackend, stage: ShaderStageId) -> usize {
        let evicted: Vec<ProgramKey> = self
            .programs
            .keys()
            .filter(|key| key.contains(stage))
            .copied()
            .collect();
        for key in &evicted {
            if let Some(entry) = self.programs.remove(key) {
                destroy_logged(backend, entry.program);
            }
        }
        evicted.len()
    }

    /// Destroys every cached program.
    pub fn clear(&mut self, backend: &mut dyn GraphicsBackend) {
        for (_, entry) in self.programs.drain() {
            destroy_logged(backend, entry.program);
        }
    }

    /// Number of cached programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Lookups that linked a program.
    pub fn misses(&self) -> u32 {
        self.misses
    }
}

fn destroy_logged(backend: &mut dyn GraphicsBackend, program: ProgramId) {
    if let Err(e) = backend.destroy_program(program) {
        log::warn!("Failed to destroy program {:?}: {}", program, e);
    }
}

/// Binds `buffer0, buffer1, ...` to uniform binding points and
/// `texture0, texture1, ...` to texture units, stopping each sequence at the
/// first name the program does not declare. A gap in the numbering ends
/// discovery at the gap.
fn discover_bindings(backend: &mut dyn GraphicsBackend, program: ProgramId) -> (u32, u32) {
    let blocks = discover(UNIFORM_BLOCK_PREFIX, |name, index| {
        backend.bind_uniform_block(program, name, index)
    });
    let samplers = discover(SAMPLER_UNIFORM_PREFIX, |name, index| {
        backend.bind_sampler_uniform(program, name, index)
    });
    (blocks, samplers)
}

fn discover(
    prefix: &str,
    mut bind: impl FnMut(&str, u32) -> Result<bool, ResourceError>,
) -> u32 {
    let mut index = 0;
    loop {
        let name = format!("{prefix}{index}");
        match bind(&name, index) {
            Ok(true) => index += 1,
            Ok(false) => return index,
            Err(e) => {
                log::warn!("Binding '{name}' failed: {e}");
                return index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mock::{Call, MockBackend};

    fn key(ids: &[(usize, usize, u32)]) -> ProgramKey {
        let mut stages = [None; SHADER_STAGE_COUNT];
        for &(slot, id, generation) in ids {
            stages[slot] = Some(StageIdentity {
                id: ShaderStageId(id),
                generation,
            });
        }
        ProgramKey::new(stages)
    }

    const SHADERS: [RawShaderId; 2] = [RawShaderId(100), RawShaderId(101)];

    #[test]
    fn same_key_returns_same_program() {
        let mut backend = MockBackend::new();
        let mut cache = ProgramCache::new();
        let k = key(&[(0, 1, 0), (1, 2, 0)]);

        let first = cache.resolve(&mut backend, k, &SHADERS).unwrap();
        let second = cache.resolve(&mut backend, k, &SHADERS).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(backend.count(|c| matches!(c, Call::LinkProgram(..))), 1);
    }

    #[test]
    fn different_combinations_get_different_programs() {
        let mut backend = MockBackend::new();
        let mut cache = ProgramCache::new();

        let a = cache.resolve(&mut backend, key(&[(0, 1, 0), (1, 2, 0)]), &SHADERS).unwrap();
        let b = cache.resolve(&mut backend, key(&[(0, 1, 0), (1, 3, 0)]), &SHADERS).unwrap();
        let swapped = cache.resolve(&mut backend, key(&[(0, 2, 0), (1, 1, 0)]), &SHADERS).unwrap();
        let newer = cache.resolve(&mut backend, key(&[(0, 1, 1), (1, 2, 0)]), &SHADERS).unwrap();

        assert_ne!(a.program, b.program);
        assert_ne!(a.program, swapped.program);
        assert_ne!(a.program, newer.program);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn discovery_stops_at_first_missing_name() {
        let mut backend = MockBackend::new();
        backend.uniform_blocks = vec!["buffer0".into(), "buffer2".into()];
        backend.sampler_uniforms = vec!["texture0".into(), "texture1".into()];
        let mut cache = ProgramCache::new();

        let program = cache.resolve(&mut backend, key(&[(0, 1, 0)]), &SHADERS[..1]).unwrap();
        assert!(program.linked);
        assert!(backend
            .calls
            .contains(&Call::BindUniformBlock(program.program, "buffer0".into(), 0)));
        assert_eq!(backend.count(|c| matches!(c, Call::BindUniformBlock(..))), 1);
        assert!(backend
            .calls
            .contains(&Call::BindSamplerUniform(program.program, "texture1".into(), 1)));
        assert_eq!(backend.count(|c| matches!(c, Call::BindSamplerUniform(..))), 2);
    }

    #[test]
    fn failed_link_is_cached_without_discovery() {
        let mut backend = MockBackend::new();
        backend.fail_link = true;
        backend.uniform_blocks = vec!["buffer0".into()];
        let mut cache = ProgramCache::new();
        let k = key(&[(0, 1, 0)]);

        let first = cache.resolve(&mut backend, k, &SHADERS[..1]).unwrap();
        assert!(!first.linked);
        assert_eq!(backend.count(|c| matches!(c, Call::BindUniformBlock(..))), 0);

        backend.fail_link = false;
        let second = cache.resolve(&mut backend, k, &SHADERS[..1]).unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.count(|c| matches!(c, Call::LinkProgram(..))), 1);
    }

    #[test]
    fn invalidating_a_stage_evicts_its_programs() {
        let mut backend = MockBackend::new();
        let mut cache = ProgramCache::new();
        let with = cache.resolve(&mut backend, key(&[(0, 1, 0), (1, 2, 0)]), &SHADERS).unwrap();
        cache.resolve(&mut backend, key(&[(0, 3, 0), (1, 4, 0)]), &SHADERS).unwrap();

        assert_eq!(cache.invalidate_stage(&mut backend, ShaderStageId(2)), 1);
        assert_eq!(cache.len(), 1);
        assert!(backend.calls.contains(&Call::DestroyProgram(with.program)));

        cache.clear(&mut backend);
        assert!(cache.is_empty());
    }

    #[test]
    fn fingerprint_tracks_equality() {
        assert_eq!(key(&[(0, 1, 0)]).fingerprint(), key(&[(0, 1, 0)]).fingerprint());
        assert_ne!(key(&[(0, 1, 0)]).fingerprint(), key(&[(1, 1, 0)]).fingerprint());
        assert!(ProgramKey::default().is_empty());
    }
}
