//! Built-in shading nodes.
//!
//! | Node | Class id | Produces |
//! |------|----------|----------|
//! | [`VertexNode`] | `vertex` | world-space position, normal, tangent frame |
//! | [`CameraDataNode`] | `cameraData` | camera matrices, clip/view-space positions |
//! | [`VertexAttributeNode`] | `vertexAttribute` | a raw mesh attribute as a varying |
//! | [`TextureNode`] | `texture` | sampled colour and alpha |
//! | [`UniformNode`] | `uniform` | a named, per-object overridable constant |
//! | [`OperationNode`] | `operation` | a free-form expression over its inputs |
//! | [`NormalMapNode`] | `normalMap` | a normal perturbed by a tangent-space map |
//! | [`PbrNode`] | `pbr` | metallic-roughness shading under the scene's lights |
//! | [`ToneMapNode`] | `toneMap` | display-range colour |
//! | [`OutputNode`] | `output` | `gl_Position` and the fragment colour |

mod attribute;
mod camera_data;
mod normal_map;
mod operation;
mod output;
mod pbr;
mod texture;
mod tone_map;
mod uniform;
mod vertex;

pub use attribute::VertexAttributeNode;
pub use camera_data::CameraDataNode;
pub use normal_map::NormalMapNode;
pub use operation::OperationNode;
pub use output::OutputNode;
pub use pbr::PbrNode;
pub use texture::TextureNode;
pub use tone_map::{ToneMapMode, ToneMapNode};
pub use uniform::UniformNode;
pub use vertex::VertexNode;
