//! Importer for The Sims 1 character assets.
//!
//! Decodes FAR archives, character files (`.cmx`/`.bcf`), deformable meshes (`.skn`/`.bmf`) and
//! keyframe streams (`.cfp`) into an editor-agnostic model, then rebuilds the bind pose, the
//! skinned meshes and the keyframe curves from it. Scene creation is left to the caller.

#![forbid(unsafe_code)]

mod cfp;
mod character;
mod error;
mod far;
mod importer;
mod input;
mod mesh;
mod model;
mod resolver;
mod rig;

pub use cfp::delta as cfp_delta;
pub use character::*;
pub use error::*;
pub use far::*;
pub use importer::*;
pub use mesh::*;
pub use model::*;
pub use resolver::*;
pub use rig::*;

#[cfg(test)]
mod fixtures;






#[cfg(test)]
mod importer_tests;
