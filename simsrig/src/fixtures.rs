//! Writers for synthesizing test assets in every supported encoding.

#![allow(dead_code)]

use crate::{
    BlendEntry, Bone, BoneBinding, CharacterData, DeformableMesh, Motion, Props, Skeleton, Skill,
    Suit, Vertex,
};
use byteorder::{LittleEndian, WriteBytesExt};

pub(crate) trait RecordWriter {
    fn string(&mut self, s: &str);
    fn int(&mut self, v: i32);
    fn float(&mut self, v: f32);
    fn end_record(&mut self) {}

    fn count(&mut self, n: usize) {
        self.int(n as i32);
        self.end_record();
    }
}

#[derive(Default)]
pub(crate) struct BinaryWriter {
    pub(crate) bytes: Vec<u8>,
}

impl RecordWriter for BinaryWriter {
    fn string(&mut self, s: &str) {
        self.bytes.write_u8(s.len() as u8).unwrap();
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn int(&mut self, v: i32) {
        self.bytes.write_i32::<LittleEndian>(v).unwrap();
    }

    fn float(&mut self, v: f32) {
        self.bytes.write_f32::<LittleEndian>(v).unwrap();
    }
}

#[derive(Default)]
pub(crate) struct TextWriter {
    pub(crate) out: String,
    line_open: bool,
}

impl TextWriter {
    fn token(&mut self, token: &str) {
        if self.line_open {
            self.out.push(' ');
        }
        self.out.push_str(token);
        self.line_open = true;
    }
}

impl RecordWriter for TextWriter {
    fn string(&mut self, s: &str) {
        self.end_record();
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn int(&mut self, v: i32) {
        self.token(&v.to_string());
    }

    fn float(&mut self, v: f32) {
        self.token(&v.to_string());
    }

    fn end_record(&mut self) {
        if self.line_open {
            self.out.push('\n');
            self.line_open = false;
        }
    }
}

pub(crate) fn bone(name: &str, parent: Option<&str>, position: [f32; 3]) -> Bone {
    Bone {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        props: Vec::new(),
        position,
        rotation: [0.0, 0.0, 0.0, 1.0],
        can_translate: true,
        can_rotate: true,
        can_blend: true,
        can_wiggle: false,
        wiggle_power: 0.0,
    }
}

pub(crate) fn skeleton(name: &str, bones: Vec<Bone>) -> Skeleton {
    Skeleton::from_bones(name, bones).expect("valid skeleton")
}

/// `ROOT` at the origin with `SPINE` one unit up the z axis.
pub(crate) fn two_bone_skeleton() -> Skeleton {
    skeleton(
        "adult",
        vec![
            bone("ROOT", None, [0.0, 0.0, 0.0]),
            bone("SPINE", Some("ROOT"), [0.0, 0.0, 1.0]),
        ],
    )
}

pub(crate) fn motion(
    bone_name: &str,
    num_frames: usize,
    pos: Option<usize>,
    rot: Option<usize>,
) -> Motion {
    Motion {
        bone_name: bone_name.to_string(),
        num_frames,
        duration: num_frames as f32 * 33.0,
        positions_used: pos.is_some(),
        rotations_used: rot.is_some(),
        position_offset: pos.unwrap_or(0),
        rotation_offset: rot.unwrap_or(0),
        props: Vec::new(),
        time_props: Vec::new(),
    }
}

pub(crate) fn skill(
    name: &str,
    animation_name: &str,
    num_positions: usize,
    num_rotations: usize,
    motions: Vec<Motion>,
) -> Skill {
    Skill {
        name: name.to_string(),
        animation_name: animation_name.to_string(),
        duration: 1000.0,
        distance: 0.0,
        moving: false,
        num_positions,
        num_rotations,
        motions,
    }
}

pub(crate) fn character(
    skeletons: Vec<Skeleton>,
    suits: Vec<Suit>,
    skills: Vec<Skill>,
) -> CharacterData {
    CharacterData {
        version: None,
        skeletons,
        suits,
        skills,
    }
}

fn write_props<W: RecordWriter>(w: &mut W, props: &Props) {
    w.count(props.len());
    for (key, value) in props {
        w.string(key);
        w.string(value);
    }
}

pub(crate) fn write_character<W: RecordWriter>(w: &mut W, data: &CharacterData) {
    w.count(data.skeletons.len());
    for skeleton in &data.skeletons {
        w.string(&skeleton.name);
        w.count(skeleton.bones.len());
        for bone in &skeleton.bones {
            w.string(&bone.name);
            w.string(bone.parent.as_deref().unwrap_or(crate::NO_PARENT));
            write_props(w, &bone.props);
            for v in bone.position {
                w.float(v);
            }
            w.end_record();
            for v in bone.rotation {
                w.float(v);
            }
            w.end_record();
            w.int(bone.can_translate as i32);
            w.int(bone.can_rotate as i32);
            w.int(bone.can_blend as i32);
            w.int(bone.can_wiggle as i32);
            w.float(bone.wiggle_power);
            w.end_record();
        }
    }

    w.count(data.suits.len());
    for suit in &data.suits {
        w.string(&suit.name);
        w.int(suit.kind);
        w.end_record();
        w.count(suit.skins.len());
        for skin in &suit.skins {
            w.string(&skin.bone_name);
            w.string(&skin.mesh_name);
            w.int(skin.censor_flags);
            w.int(skin.reserved);
            w.end_record();
        }
    }

    w.count(data.skills.len());
    for skill in &data.skills {
        w.string(&skill.name);
        w.string(&skill.animation_name);
        w.float(skill.duration);
        w.float(skill.distance);
        w.int(skill.moving as i32);
        w.end_record();
        w.count(skill.num_positions);
        w.count(skill.num_rotations);
        w.count(skill.motions.len());
        for motion in &skill.motions {
            w.string(&motion.bone_name);
            w.int(motion.num_frames as i32);
            w.float(motion.duration);
            w.end_record();
            w.int(motion.positions_used as i32);
            w.int(motion.rotations_used as i32);
            w.end_record();
            let unused = |used: bool, offset: usize| if used { offset as i32 } else { -1 };
            w.int(unused(motion.positions_used, motion.position_offset));
            w.int(unused(motion.rotations_used, motion.rotation_offset));
            w.end_record();
            write_props(w, &motion.props);
            w.count(motion.time_props.len());
            for tp in &motion.time_props {
                w.int(tp.time);
                w.end_record();
                write_props(w, &tp.props);
            }
        }
    }
}

pub(crate) fn bcf_bytes(data: &CharacterData) -> Vec<u8> {
    let mut w = BinaryWriter::default();
    write_character(&mut w, data);
    w.bytes
}

pub(crate) fn cmx_text(data: &CharacterData) -> String {
    let mut w = TextWriter::default();
    w.out.push_str("// Character File. Copyright 1997, Maxis Inc.\nversion 300\n");
    write_character(&mut w, data);
    w.end_record();
    w.out
}

pub(crate) fn write_mesh<W: RecordWriter>(w: &mut W, mesh: &DeformableMesh) {
    w.string(&mesh.name);
    w.string(&mesh.texture_name);
    w.count(mesh.bones.len());
    for bone in &mesh.bones {
        w.string(bone);
    }
    w.count(mesh.faces.len());
    for face in &mesh.faces {
        for &v in face {
            w.int(v as i32);
        }
        w.end_record();
    }
    w.count(mesh.bindings.len());
    for b in &mesh.bindings {
        for v in [b.bone_index, b.first_vertex, b.vertex_count, b.first_blend, b.blend_count] {
            w.int(v as i32);
        }
        w.end_record();
    }
    w.count(mesh.uvs.len());
    for [u, v] in &mesh.uvs {
        w.float(*u);
        w.float(*v);
        w.end_record();
    }
    w.count(mesh.blends.len());
    for blend in &mesh.blends {
        w.int(blend.weight);
        w.int(blend.vertex as i32);
        w.end_record();
    }
    w.count(mesh.vertices.len());
    for vertex in &mesh.vertices {
        for v in vertex.position.into_iter().chain(vertex.normal) {
            w.float(v);
        }
        w.end_record();
    }
}

pub(crate) fn bmf_bytes(mesh: &DeformableMesh) -> Vec<u8> {
    let mut w = BinaryWriter::default();
    write_mesh(&mut w, mesh);
    w.bytes
}

pub(crate) fn skn_text(mesh: &DeformableMesh) -> String {
    let mut w = TextWriter::default();
    write_mesh(&mut w, mesh);
    w.end_record();
    w.out
}

pub(crate) fn vertex(position: [f32; 3]) -> Vertex {
    Vertex {
        position,
        normal: [0.0, 0.0, 1.0],
    }
}

/// Two bones, four skinned vertices and one trailing blend vertex.
///
/// `ROOT` owns vertices 0..2, `SPINE` owns 2..4 and blends vertex 1 at half weight.
pub(crate) fn two_bone_mesh() -> DeformableMesh {
    DeformableMesh {
        name: "body".to_string(),
        texture_name: "bodytex".to_string(),
        bones: vec!["ROOT".to_string(), "SPINE".to_string()],
        faces: vec![[0, 1, 2], [1, 3, 2]],
        bindings: vec![
            BoneBinding {
                bone_index: 0,
                first_vertex: 0,
                vertex_count: 2,
                first_blend: 0,
                blend_count: 0,
            },
            BoneBinding {
                bone_index: 1,
                first_vertex: 2,
                vertex_count: 2,
                first_blend: 0,
                blend_count: 1,
            },
        ],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        blends: vec![BlendEntry {
            vertex: 1,
            weight: 32784,
        }],
        vertices: vec![
            vertex([0.0, 0.0, 0.0]),
            vertex([1.0, 0.0, 0.0]),
            vertex([0.0, 0.0, 0.5]),
            vertex([1.0, 0.0, 0.5]),
            vertex([1.0, 0.0, -0.5]),
        ],
    }
}

/// Encodes every value as a literal.
pub(crate) fn cfp_literal_bytes(channels: &[&[f32]]) -> Vec<u8> {
    let mut out = Vec::new();
    for channel in channels {
        for &v in *channel {
            out.push(0xFF);
            out.write_f32::<LittleEndian>(v).unwrap();
        }
    }
    out
}

pub(crate) fn far_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(crate::FAR_SIGNATURE);
    out.write_u32::<LittleEndian>(crate::FAR_VERSION).unwrap();
    let payload_len: usize = entries.iter().map(|(_, data)| data.len()).sum();
    out.write_u32::<LittleEndian>((16 + payload_len) as u32).unwrap();

    let mut offsets = Vec::new();
    for (_, data) in entries {
        offsets.push(out.len() as u32);
        out.extend_from_slice(data);
    }

    out.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
    for ((name, data), offset) in entries.iter().zip(offsets) {
        out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(offset).unwrap();
        out.write_u32::<LittleEndian>(name.len() as u32).unwrap();
        out.extend_from_slice(name.as_bytes());
    }
    out
}
