//! Character files: `.bcf` (binary) and `.cmx` (text).
//!
//! Both encodings carry the same records (skeletons, then suits, then skills) and are decoded
//! by one generic reader. The encoding is picked by an explicit sniff, see
//! [`CharacterFormat::sniff`].

use crate::input::{BinaryInput, RecordReader, TextInput, decode_text};
use crate::{
    Bone, CharacterData, Error, Motion, NO_PARENT, Props, Skeleton, Skill, Suit, SuitSkin,
    TimeProps,
};
use std::collections::HashMap;

const FORMAT: &str = "character";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CharacterFormat {
    Binary,
    Text,
}

impl CharacterFormat {
    /// Text files open with a `//` comment block or a `version` line; anything else is BCF.
    pub fn sniff(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let head = &bytes[start..];
        if head.starts_with(b"//") || head.len() >= 7 && head[..7].eq_ignore_ascii_case(b"version")
        {
            Self::Text
        } else {
            Self::Binary
        }
    }
}

impl CharacterData {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match CharacterFormat::sniff(bytes) {
            CharacterFormat::Binary => Self::from_bcf_bytes(bytes),
            CharacterFormat::Text => Self::from_cmx_str(&decode_text(bytes)),
        }
    }

    pub fn from_bcf_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(FORMAT, bytes);
        let data = read_character(&mut input, None)?;
        if input.remaining() > 0 {
            log::warn!("{} trailing bytes after character data", input.remaining());
        }
        Ok(data)
    }

    pub fn from_cmx_str(text: &str) -> Result<Self, Error> {
        let mut input = TextInput::new(FORMAT, text);
        let version = input.read_version()?;
        read_character(&mut input, version)
    }
}

impl Skeleton {
    /// Decodes a character file that must hold exactly one skeleton.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut data = CharacterData::from_bytes(bytes)?;
        data.skeleton()?;
        Ok(data.skeletons.remove(0))
    }

    /// Builds a skeleton from bones listed parents first.
    pub fn from_bones(name: impl Into<String>, bones: Vec<Bone>) -> Result<Self, Error> {
        let name = name.into();
        let mut bone_index = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent.as_deref() {
                if !bone_index.contains_key(parent) {
                    return Err(Error::format(
                        FORMAT,
                        format!(
                            "bone '{}' in skeleton '{name}' precedes its parent '{parent}'",
                            bone.name
                        ),
                    ));
                }
            }
            if bone_index.insert(bone.name.clone(), i).is_some() {
                return Err(Error::format(
                    FORMAT,
                    format!("duplicate bone '{}' in skeleton '{name}'", bone.name),
                ));
            }
        }
        Ok(Self {
            name,
            bones,
            bone_index,
        })
    }
}

fn read_character<R: RecordReader>(
    input: &mut R,
    version: Option<i32>,
) -> Result<CharacterData, Error> {
    let skeleton_count = input.read_count("skeleton")?;
    let mut skeletons = Vec::with_capacity(skeleton_count.min(16));
    for _ in 0..skeleton_count {
        skeletons.push(read_skeleton(input)?);
    }

    let suit_count = input.read_count("suit")?;
    let mut suits = Vec::with_capacity(suit_count.min(256));
    for _ in 0..suit_count {
        suits.push(read_suit(input)?);
    }

    let skill_count = input.read_count("skill")?;
    let mut skills = Vec::with_capacity(skill_count.min(256));
    for _ in 0..skill_count {
        skills.push(read_skill(input)?);
    }

    log::debug!(
        "decoded character: {} skeletons, {} suits, {} skills",
        skeletons.len(),
        suits.len(),
        skills.len()
    );
    Ok(CharacterData {
        version,
        skeletons,
        suits,
        skills,
    })
}

fn read_props<R: RecordReader>(input: &mut R) -> Result<Props, Error> {
    let count = input.read_count("prop")?;
    let mut props = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let key = input.read_string()?;
        let value = input.read_string()?;
        props.push((key, value));
    }
    Ok(props)
}

fn read_time_props<R: RecordReader>(input: &mut R) -> Result<Vec<TimeProps>, Error> {
    let count = input.read_count("time prop")?;
    let mut out = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let time = input.read_i32()?;
        let props = read_props(input)?;
        out.push(TimeProps { time, props });
    }
    Ok(out)
}

fn read_skeleton<R: RecordReader>(input: &mut R) -> Result<Skeleton, Error> {
    let name = input.read_string()?;
    let bone_count = input.read_count("bone")?;
    let mut bones = Vec::with_capacity(bone_count.min(256));
    for _ in 0..bone_count {
        let bone_name = input.read_string()?;
        let parent = input.read_string()?;
        let props = read_props(input)?;
        let position = input.read_vec3()?;
        let rotation = input.read_vec4()?;
        let can_translate = input.read_flag()?;
        let can_rotate = input.read_flag()?;
        let can_blend = input.read_flag()?;
        let can_wiggle = input.read_flag()?;
        let wiggle_power = input.read_f32()?;
        bones.push(Bone {
            name: bone_name,
            parent: (parent != NO_PARENT).then_some(parent),
            props,
            position,
            rotation,
            can_translate,
            can_rotate,
            can_blend,
            can_wiggle,
            wiggle_power,
        });
    }
    Skeleton::from_bones(name, bones)
}

fn read_suit<R: RecordReader>(input: &mut R) -> Result<Suit, Error> {
    let name = input.read_string()?;
    let kind = input.read_i32()?;
    let skin_count = input.read_count("skin")?;
    let mut skins = Vec::with_capacity(skin_count.min(64));
    for _ in 0..skin_count {
        skins.push(SuitSkin {
            bone_name: input.read_string()?,
            mesh_name: input.read_string()?,
            censor_flags: input.read_i32()?,
            reserved: input.read_i32()?,
        });
    }
    Ok(Suit { name, kind, skins })
}

fn read_skill<R: RecordReader>(input: &mut R) -> Result<Skill, Error> {
    let name = input.read_string()?;
    let animation_name = input.read_string()?;
    let duration = input.read_f32()?;
    let distance = input.read_f32()?;
    let moving = input.read_flag()?;
    let num_positions = input.read_count("translation")?;
    let num_rotations = input.read_count("rotation")?;
    let motion_count = input.read_count("motion")?;

    let mut motions = Vec::with_capacity(motion_count.min(256));
    for _ in 0..motion_count {
        let bone_name = input.read_string()?;
        let num_frames = input.read_count("frame")?;
        let motion_duration = input.read_f32()?;
        let positions_used = input.read_flag()?;
        let rotations_used = input.read_flag()?;
        let position_offset = read_offset(input, positions_used, "position offset")?;
        let rotation_offset = read_offset(input, rotations_used, "rotation offset")?;
        let props = read_props(input)?;
        let time_props = read_time_props(input)?;
        motions.push(Motion {
            bone_name,
            num_frames,
            duration: motion_duration,
            positions_used,
            rotations_used,
            position_offset,
            rotation_offset,
            props,
            time_props,
        });
    }

    Ok(Skill {
        name,
        animation_name,
        duration,
        distance,
        moving,
        num_positions,
        num_rotations,
        motions,
    })
}

// Unused channels are stored as -1.
fn read_offset<R: RecordReader>(input: &mut R, used: bool, what: &str) -> Result<usize, Error> {
    let v = input.read_i32()?;
    match usize::try_from(v) {
        Ok(offset) => Ok(offset),
        Err(_) if !used => Ok(0),
        Err(_) => Err(input.error(format!("negative {what} {v}"))),
    }
}
