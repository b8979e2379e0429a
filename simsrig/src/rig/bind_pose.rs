use crate::{Error, Skeleton};
use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

/// Maps a `[a, b, c, d]` quaternion from the game files into the `(w, x, y, z)` convention of
/// the rotation curves: `w = -a`, `x = b`, `y = c`, `z = d`.
pub fn consumer_quaternion(raw: [f32; 4]) -> Quat {
    let [a, b, c, d] = raw;
    Quat::from_xyzw(b, c, d, -a)
}

/// Rest rotation used for every bone, `[1, 0, 0, 0]` in file order.
///
/// Animation rotations are absolute rather than relative to the rest pose. With an identity
/// rest pose the two coincide, so the decoded bone rotations are deliberately ignored here.
pub const REST_ROTATION: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoneTransform {
    pub name: String,
    pub parent: Option<usize>,
    pub rest_rotation: Quat,
    /// Bone space to mesh space.
    pub world: Mat4,
    pub head: Vec3,
    pub tail: Vec3,
}

/// World transforms of a skeleton in its rest pose.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BindPose {
    pub skeleton: String,
    pub bones: Vec<BoneTransform>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, usize>,
}

impl BindPose {
    pub fn from_skeleton(skeleton: &Skeleton) -> Result<Self, Error> {
        let mut bones: Vec<BoneTransform> = Vec::with_capacity(skeleton.bones.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(skeleton.bones.len());

        for bone in &skeleton.bones {
            let (parent, parent_world) = match bone.parent.as_deref() {
                None => (None, Mat4::IDENTITY),
                Some(parent_name) => {
                    let &i = index.get(parent_name).ok_or_else(|| {
                        Error::format(
                            "character",
                            format!(
                                "bone '{}' is posed before its parent '{parent_name}'",
                                bone.name
                            ),
                        )
                    })?;
                    (Some(i), bones[i].world)
                }
            };

            let rest_rotation = consumer_quaternion(REST_ROTATION);
            let rotation = Mat4::from_quat(rest_rotation);
            let world =
                parent_world * rotation * Mat4::from_translation(Vec3::from_array(bone.position));
            let head = world.transform_point3(Vec3::ZERO);
            let tail = head + rest_rotation * Vec3::Z;

            index.insert(bone.name.clone(), bones.len());
            bones.push(BoneTransform {
                name: bone.name.clone(),
                parent,
                rest_rotation,
                world,
                head,
                tail,
            });
        }

        Ok(Self {
            skeleton: skeleton.name.clone(),
            bones,
            index,
        })
    }

    pub fn bone(&self, name: &str) -> Option<&BoneTransform> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    pub fn bone_at(&self, index: usize) -> Result<&BoneTransform, Error> {
        self.bones.get(index).ok_or(Error::IndexOutOfRange {
            kind: "bone",
            index,
            len: self.bones.len(),
        })
    }
}
