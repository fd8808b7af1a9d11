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

//! Texture handles and sampling parameters.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A descriptor used to create a 2D texture object.
///
/// Image upload is the asset layer's business; the core only needs the
/// object and its mip count.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Width of mip level 0 in texels.
    pub width: u32,
    /// Height of mip level 0 in texels.
    pub height: u32,
    /// The number of mip levels in the chain.
    pub mip_levels: u32,
}

/// An opaque handle to a texture owned by a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a backend texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawTextureId(pub u64);

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    /// Tile the texture.
    Repeat,
    /// Tile the texture, mirroring every other tile.
    MirrorRepeat,
    /// Clamp to the edge texel.
    ClampToEdge,
}

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Fixed-function sampling parameters applied to a bound texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerDescriptor {
    /// Wrap mode for both texture axes.
    pub address_mode: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Filter between mip levels; `None` samples level 0 only.
    pub mipmap_filter: Option<FilterMode>,
    /// Anisotropy as a fraction of the device maximum, `0.0` disables it.
    pub anisotropy_scale: f32,
}

impl SamplerDescriptor {
    /// Repeat wrap, linear filtering with linear mip blending and the device's
    /// full anisotropy.
    pub const TRILINEAR_MAX_ANISOTROPY: SamplerDescriptor = SamplerDescriptor {
        address_mode: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        mipmap_filter: Some(FilterMode::Linear),
        anisotropy_scale: 1.0,
    };
}

impl Default for SamplerDescriptor {
    /// The static policy re-applied whenever texture slots change: trilinear
    /// with half the device's maximum anisotropy.
    fn default() -> Self {
        SamplerDescriptor {
            anisotropy_scale: 0.5,
            ..SamplerDescriptor::TRILINEAR_MAX_ANISOTROPY
        }
    }
}

/// An opaque handle to a registered [`SamplerDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerStateId(pub usize);
