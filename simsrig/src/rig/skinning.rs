use crate::{BindPose, DeformableMesh, Error};
use glam::Vec3;
use std::collections::BTreeMap;

/// Raw blend weights are divided by this to land in `[0, 1]`. It is 65568, not 65535.
pub const BLEND_WEIGHT_DIVISOR: f32 = 65568.0;

pub fn blend_weight(raw: i32) -> f32 {
    raw as f32 / BLEND_WEIGHT_DIVISOR
}

/// Per-bone vertex weights. Repeated assignments add up and are never renormalized.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VertexGroup {
    pub bone: String,
    pub weights: BTreeMap<usize, f32>,
}

impl VertexGroup {
    pub fn new(bone: impl Into<String>) -> Self {
        Self {
            bone: bone.into(),
            weights: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, vertices: impl IntoIterator<Item = usize>, weight: f32) {
        for v in vertices {
            *self.weights.entry(v).or_insert(0.0) += weight;
        }
    }

    pub fn weight(&self, vertex: usize) -> f32 {
        self.weights.get(&vertex).copied().unwrap_or(0.0)
    }
}

/// A mesh moved from bone-local coordinates into mesh space, with its skin weights.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkinnedMesh {
    pub name: String,
    pub texture: Option<String>,
    pub positions: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
    /// One per position, as stored (no V flip).
    pub uvs: Vec<[f32; 2]>,
    pub groups: Vec<VertexGroup>,
}

impl SkinnedMesh {
    pub fn bind(mesh: &DeformableMesh, pose: &BindPose) -> Result<Self, Error> {
        let skinned = mesh.skinned_vertex_count();
        let dropped = mesh.vertices.len() - skinned;
        if dropped > 0 {
            log::debug!(
                "mesh '{}': ignoring {dropped} vertices past the {skinned} uv coordinates",
                mesh.name
            );
        }
        let fail = |message: String| Error::format("mesh", format!("'{}': {message}", mesh.name));

        let mut positions: Vec<Vec3> = mesh
            .skinned_vertices()
            .iter()
            .map(|v| Vec3::from_array(v.position))
            .collect();
        let mut groups: Vec<VertexGroup> = Vec::new();

        for binding in &mesh.bindings {
            let bone_name = mesh.bones.get(binding.bone_index).ok_or_else(|| {
                fail(format!(
                    "binding references bone {} of {}",
                    binding.bone_index,
                    mesh.bones.len()
                ))
            })?;
            let blends = mesh.blends.get(binding.blends()).ok_or_else(|| {
                fail(format!(
                    "bone '{bone_name}' blends entries {:?} past {}",
                    binding.blends(),
                    mesh.blends.len()
                ))
            })?;
            let bone = pose.bone(bone_name).ok_or_else(|| Error::UnknownBone {
                bone: bone_name.clone(),
                context: format!("mesh '{}'", mesh.name),
            })?;

            let range = binding.vertices();
            if range.end > skinned {
                return Err(fail(format!(
                    "bone '{bone_name}' owns vertices {range:?} past the {skinned} skinned vertices"
                )));
            }
            for p in &mut positions[range.clone()] {
                *p = bone.world.transform_point3(*p);
            }

            let group = match groups.iter().position(|g| g.bone == *bone_name) {
                Some(i) => &mut groups[i],
                None => {
                    groups.push(VertexGroup::new(bone_name.as_str()));
                    let last = groups.len() - 1;
                    &mut groups[last]
                }
            };
            group.add(range, 1.0);
            for blend in blends {
                if blend.vertex >= skinned {
                    return Err(fail(format!(
                        "bone '{bone_name}' blends vertex {} past the {skinned} skinned vertices",
                        blend.vertex
                    )));
                }
                group.add([blend.vertex], blend_weight(blend.weight));
            }
        }

        if let Some(face) = mesh.faces.iter().find(|f| f.iter().any(|&v| v >= skinned)) {
            return Err(fail(format!(
                "face {face:?} references a vertex past the {skinned} skinned vertices"
            )));
        }

        Ok(Self {
            name: mesh.name.clone(),
            texture: mesh.texture().map(str::to_string),
            positions,
            faces: mesh.faces.clone(),
            uvs: mesh.uvs[..skinned].to_vec(),
            groups,
        })
    }

    pub fn group(&self, bone: &str) -> Option<&VertexGroup> {
        self.groups.iter().find(|g| g.bone == bone)
    }

    /// Sum of the vertex's weights over all groups.
    pub fn total_weight(&self, vertex: usize) -> f32 {
        self.groups.iter().map(|g| g.weight(vertex)).sum()
    }
}
