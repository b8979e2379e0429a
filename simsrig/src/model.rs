use crate::Error;
use std::collections::HashMap;

/// Parent name used by root bones.
pub const NO_PARENT: &str = "NULL";

/// Texture name used by meshes without a default texture.
pub const NO_TEXTURE: &str = "x";

pub type Props = Vec<(String, String)>;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimeProps {
    pub time: i32,
    pub props: Props,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bone {
    pub name: String,
    /// `None` for roots (stored as `NULL` in the files).
    pub parent: Option<String>,
    pub props: Props,
    pub position: [f32; 3],
    /// Rest rotation as stored in the file. Bind poses do not use it.
    pub rotation: [f32; 4],
    pub can_translate: bool,
    pub can_rotate: bool,
    pub can_blend: bool,
    pub can_wiggle: bool,
    pub wiggle_power: f32,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Skeleton {
    pub name: String,
    /// Parents precede children.
    pub bones: Vec<Bone>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) bone_index: HashMap<String, usize>,
}

impl Skeleton {
    pub fn bone(&self, name: &str) -> Option<(usize, &Bone)> {
        let index = *self.bone_index.get(name)?;
        Some((index, &self.bones[index]))
    }

    pub fn bone_at(&self, index: usize) -> Result<&Bone, Error> {
        self.bones.get(index).ok_or(Error::IndexOutOfRange {
            kind: "bone",
            index,
            len: self.bones.len(),
        })
    }

    pub fn parent_of(&self, bone: &Bone) -> Option<(usize, &Bone)> {
        self.bone(bone.parent.as_deref()?)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SuitSkin {
    pub bone_name: String,
    /// Mesh basename, resolved as `<mesh_name>.bmf` / `.skn`.
    pub mesh_name: String,
    pub censor_flags: i32,
    pub reserved: i32,
}

/// An appearance: the set of meshes worn by a skeleton.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Suit {
    pub name: String,
    pub kind: i32,
    pub skins: Vec<SuitSkin>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Motion {
    pub bone_name: String,
    pub num_frames: usize,
    pub duration: f32,
    pub positions_used: bool,
    pub rotations_used: bool,
    pub position_offset: usize,
    pub rotation_offset: usize,
    pub props: Props,
    pub time_props: Vec<TimeProps>,
}

/// Value counts for the seven channels of an animation frame stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelCounts {
    pub position: [usize; 3],
    pub rotation: [usize; 4],
}

impl ChannelCounts {
    pub fn uniform(num_positions: usize, num_rotations: usize) -> Self {
        Self {
            position: [num_positions; 3],
            rotation: [num_rotations; 4],
        }
    }

    pub fn as_array(&self) -> [usize; 7] {
        let [px, py, pz] = self.position;
        let [r0, r1, r2, r3] = self.rotation;
        [px, py, pz, r0, r1, r2, r3]
    }
}

/// A named animation clip. The keyframes live in a separate `.cfp` asset.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Skill {
    pub name: String,
    pub animation_name: String,
    pub duration: f32,
    pub distance: f32,
    pub moving: bool,
    pub num_positions: usize,
    pub num_rotations: usize,
    pub motions: Vec<Motion>,
}

impl Skill {
    pub fn channel_counts(&self) -> ChannelCounts {
        ChannelCounts::uniform(self.num_positions, self.num_rotations)
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CharacterData {
    pub version: Option<i32>,
    pub skeletons: Vec<Skeleton>,
    pub suits: Vec<Suit>,
    pub skills: Vec<Skill>,
}

impl CharacterData {
    /// The single skeleton of a character file.
    pub fn skeleton(&self) -> Result<&Skeleton, Error> {
        match self.skeletons.as_slice() {
            [skeleton] => Ok(skeleton),
            other => Err(Error::format(
                "character",
                format!("expected exactly one skeleton, found {}", other.len()),
            )),
        }
    }

    pub fn skill(&self, name: &str) -> Result<&Skill, Error> {
        self.skills
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound {
                kind: "skill",
                name: name.to_string(),
            })
    }

    pub fn skill_at(&self, index: usize) -> Result<&Skill, Error> {
        self.skills.get(index).ok_or(Error::IndexOutOfRange {
            kind: "skill",
            index,
            len: self.skills.len(),
        })
    }

    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.name.as_str())
    }

    pub fn suit(&self, name: &str) -> Result<&Suit, Error> {
        self.suits
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound {
                kind: "suit",
                name: name.to_string(),
            })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vertex {
    /// Bone-local for skinned vertices.
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Ties one mesh bone to its vertices: an exclusive range with weight one, plus a range of the
/// blend table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoneBinding {
    pub bone_index: usize,
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub first_blend: usize,
    pub blend_count: usize,
}

impl BoneBinding {
    pub fn vertices(&self) -> std::ops::Range<usize> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }

    pub fn blends(&self) -> std::ops::Range<usize> {
        self.first_blend..self.first_blend + self.blend_count
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlendEntry {
    pub vertex: usize,
    /// Unscaled; see [`crate::BLEND_WEIGHT_DIVISOR`].
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeformableMesh {
    pub name: String,
    pub texture_name: String,
    pub bones: Vec<String>,
    pub faces: Vec<[usize; 3]>,
    pub bindings: Vec<BoneBinding>,
    pub uvs: Vec<[f32; 2]>,
    pub blends: Vec<BlendEntry>,
    pub vertices: Vec<Vertex>,
}

impl DeformableMesh {
    pub fn texture(&self) -> Option<&str> {
        (self.texture_name != NO_TEXTURE).then_some(self.texture_name.as_str())
    }

    /// Vertices that take part in skinning: one per UV coordinate.
    pub fn skinned_vertex_count(&self) -> usize {
        self.uvs.len().min(self.vertices.len())
    }

    pub fn skinned_vertices(&self) -> &[Vertex] {
        &self.vertices[..self.skinned_vertex_count()]
    }

    /// Trailing vertices past the UV count; skinning ignores them.
    pub fn blend_vertices(&self) -> &[Vertex] {
        &self.vertices[self.skinned_vertex_count()..]
    }
}

/// Decoded keyframe values: `position[axis]` and `rotation[component]`, addressed by the
/// offsets in each [`Motion`].
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnimFrameTable {
    pub position: [Vec<f32>; 3],
    pub rotation: [Vec<f32>; 4],
}

impl AnimFrameTable {
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        match index {
            0..=2 => Some(&self.position[index]),
            3..=6 => Some(&self.rotation[index - 3]),
            _ => None,
        }
    }
}
