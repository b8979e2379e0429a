use crate::{AnimFrameTable, Error, Motion, Skeleton, Skill};

/// Time between consecutive keyframes, in frames.
pub const DEFAULT_FRAME_LENGTH: f32 = 1.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Channel {
    /// x, y, z
    Location,
    /// w, x, y, z
    RotationQuaternion,
}

impl Channel {
    pub fn component_count(self) -> usize {
        match self {
            Self::Location => 3,
            Self::RotationQuaternion => 4,
        }
    }

    pub fn data_path(self, bone: &str) -> String {
        match self {
            Self::Location => format!("pose.bones[\"{bone}\"].location"),
            Self::RotationQuaternion => format!("pose.bones[\"{bone}\"].rotation_quaternion"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FCurve {
    pub bone: String,
    pub channel: Channel,
    pub index: usize,
    pub keyframes: Vec<Keyframe>,
}

impl FCurve {
    pub fn data_path(&self) -> String {
        self.channel.data_path(&self.bone)
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.keyframes.iter().map(|k| k.value)
    }
}

/// Keyframe curves for one skill.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Action {
    pub name: String,
    pub frame_length: f32,
    pub curves: Vec<FCurve>,
}

impl Action {
    /// Assembles curves for every motion of `skill` from its decoded frames.
    ///
    /// The first rotation component is negated on the way out, the other three are copied.
    pub fn from_skill(
        skill: &Skill,
        frames: &AnimFrameTable,
        frame_length: f32,
    ) -> Result<Self, Error> {
        let mut curves = Vec::new();
        for motion in &skill.motions {
            if motion.positions_used {
                for axis in 0..3 {
                    let raw = slice(skill, motion, &frames.position[axis], motion.position_offset)?;
                    curves.push(curve(motion, Channel::Location, axis, raw, frame_length, 1.0));
                }
            }
            if motion.rotations_used {
                for component in 0..4 {
                    let raw = slice(
                        skill,
                        motion,
                        &frames.rotation[component],
                        motion.rotation_offset,
                    )?;
                    let sign = if component == 0 { -1.0 } else { 1.0 };
                    curves.push(curve(
                        motion,
                        Channel::RotationQuaternion,
                        component,
                        raw,
                        frame_length,
                        sign,
                    ));
                }
            }
        }
        log::debug!(
            "assembled action '{}': {} curves from {} motions",
            skill.name,
            curves.len(),
            skill.motions.len()
        );
        Ok(Self {
            name: skill.name.clone(),
            frame_length,
            curves,
        })
    }

    pub fn curve(&self, bone: &str, channel: Channel, index: usize) -> Option<&FCurve> {
        self.curves
            .iter()
            .find(|c| c.bone == bone && c.channel == channel && c.index == index)
    }

    pub fn frame_count(&self) -> usize {
        self.curves
            .iter()
            .map(|c| c.keyframes.len())
            .max()
            .unwrap_or(0)
    }

    /// Fails if a curve animates a bone `skeleton` does not have.
    pub fn check_bones(&self, skeleton: &Skeleton) -> Result<(), Error> {
        match self.curves.iter().find(|c| skeleton.bone(&c.bone).is_none()) {
            Some(c) => Err(Error::UnknownBone {
                bone: c.bone.clone(),
                context: format!("action '{}'", self.name),
            }),
            None => Ok(()),
        }
    }
}

fn slice<'a>(
    skill: &Skill,
    motion: &Motion,
    channel: &'a [f32],
    offset: usize,
) -> Result<&'a [f32], Error> {
    channel
        .get(offset..offset + motion.num_frames)
        .ok_or_else(|| {
            Error::format(
                "animation frames",
                format!(
                    "skill '{}', bone '{}': frames {}..{} exceed {} decoded values",
                    skill.name,
                    motion.bone_name,
                    offset,
                    offset + motion.num_frames,
                    channel.len()
                ),
            )
        })
}

fn curve(
    motion: &Motion,
    channel: Channel,
    index: usize,
    raw: &[f32],
    frame_length: f32,
    sign: f32,
) -> FCurve {
    FCurve {
        bone: motion.bone_name.clone(),
        channel,
        index,
        keyframes: raw
            .iter()
            .enumerate()
            .map(|(i, &v)| Keyframe {
                time: frame_length * i as f32,
                value: sign * v,
            })
            .collect(),
    }
}
