//! Deformable meshes: `.bmf` (binary) and `.skn` (text).
//!
//! The decoder keeps vertices in the file's bone-local frame and keeps blend weights as the
//! raw integers; both are resolved later by [`crate::SkinnedMesh::bind`].

use crate::input::{BinaryInput, RecordReader, TextInput, decode_text};
use crate::{BlendEntry, BoneBinding, DeformableMesh, Error, Vertex};

const FORMAT: &str = "mesh";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MeshFormat {
    /// `.bmf`
    Binary,
    /// `.skn`
    Text,
}

impl MeshFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".bmf") {
            Some(Self::Binary)
        } else if lower.ends_with(".skn") {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Fallback for unknown extensions. SKN text never holds a NUL byte, while every BMF does
    /// in the high bytes of its little-endian counts and indices.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.contains(&0) {
            Self::Binary
        } else {
            Self::Text
        }
    }
}

impl DeformableMesh {
    /// Decodes `bytes`, choosing the encoding from `file_name`'s extension.
    pub fn from_file_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, Error> {
        let format =
            MeshFormat::from_file_name(file_name).unwrap_or_else(|| MeshFormat::sniff(bytes));
        Self::from_bytes_with_format(bytes, format)
    }

    pub fn from_bytes_with_format(bytes: &[u8], format: MeshFormat) -> Result<Self, Error> {
        match format {
            MeshFormat::Binary => Self::from_bmf_bytes(bytes),
            MeshFormat::Text => Self::from_skn_str(&decode_text(bytes)),
        }
    }

    pub fn from_bmf_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(FORMAT, bytes);
        read_mesh(&mut input)
    }

    pub fn from_skn_str(text: &str) -> Result<Self, Error> {
        let mut input = TextInput::new(FORMAT, text);
        read_mesh(&mut input)
    }
}

fn read_mesh<R: RecordReader>(input: &mut R) -> Result<DeformableMesh, Error> {
    let name = input.read_string()?;
    let texture_name = input.read_string()?;

    let bone_count = input.read_count("bone")?;
    let mut bones = Vec::with_capacity(bone_count.min(256));
    for _ in 0..bone_count {
        bones.push(input.read_string()?);
    }

    let face_count = input.read_count("face")?;
    let mut faces = Vec::with_capacity(face_count.min(1 << 16));
    for _ in 0..face_count {
        faces.push([
            input.read_index("face index")?,
            input.read_index("face index")?,
            input.read_index("face index")?,
        ]);
    }

    let binding_count = input.read_count("binding")?;
    let mut bindings = Vec::with_capacity(binding_count.min(256));
    for _ in 0..binding_count {
        bindings.push(read_binding(input)?);
    }

    let uv_count = input.read_count("uv")?;
    let mut uvs = Vec::with_capacity(uv_count.min(1 << 16));
    for _ in 0..uv_count {
        uvs.push([input.read_f32()?, input.read_f32()?]);
    }

    let blend_count = input.read_count("blend")?;
    let mut blends = Vec::with_capacity(blend_count.min(1 << 16));
    for _ in 0..blend_count {
        let weight = input.read_i32()?;
        let vertex = input.read_index("blend vertex")?;
        blends.push(BlendEntry { vertex, weight });
    }

    let vertex_count = input.read_count("vertex")?;
    let mut vertices = Vec::with_capacity(vertex_count.min(1 << 16));
    for _ in 0..vertex_count {
        let position = input.read_vec3()?;
        let normal = input.read_vec3()?;
        vertices.push(Vertex { position, normal });
    }

    let mesh = DeformableMesh {
        name,
        texture_name,
        bones,
        faces,
        bindings,
        uvs,
        blends,
        vertices,
    };
    validate(&mesh)?;
    log::debug!(
        "decoded mesh '{}': {} vertices ({} skinned), {} faces, {} bindings, {} blends",
        mesh.name,
        mesh.vertices.len(),
        mesh.skinned_vertex_count(),
        mesh.faces.len(),
        mesh.bindings.len(),
        mesh.blends.len()
    );
    Ok(mesh)
}

fn read_binding<R: RecordReader>(input: &mut R) -> Result<BoneBinding, Error> {
    Ok(BoneBinding {
        bone_index: input.read_index("binding bone index")?,
        first_vertex: input.read_index("binding first vertex")?,
        vertex_count: input.read_count("binding vertex")?,
        first_blend: input.read_index("binding first blend")?,
        blend_count: input.read_count("binding blend")?,
    })
}

fn validate(mesh: &DeformableMesh) -> Result<(), Error> {
    let fail = |message: String| Err(Error::format(FORMAT, format!("'{}': {message}", mesh.name)));

    if mesh.uvs.len() > mesh.vertices.len() {
        return fail(format!(
            "{} uv coordinates for {} vertices",
            mesh.uvs.len(),
            mesh.vertices.len()
        ));
    }
    let skinned = mesh.skinned_vertex_count();

    for (i, binding) in mesh.bindings.iter().enumerate() {
        if binding.bone_index >= mesh.bones.len() {
            return fail(format!(
                "binding {i} references bone {} of {}",
                binding.bone_index,
                mesh.bones.len()
            ));
        }
        if binding.vertices().end > mesh.vertices.len() {
            return fail(format!(
                "binding {i} vertex range {:?} exceeds {} vertices",
                binding.vertices(),
                mesh.vertices.len()
            ));
        }
        if binding.blends().end > mesh.blends.len() {
            return fail(format!(
                "binding {i} blend range {:?} exceeds {} blend entries",
                binding.blends(),
                mesh.blends.len()
            ));
        }
        if binding.vertex_count + binding.blend_count > skinned {
            return fail(format!(
                "binding {i} covers {} vertices but only {skinned} are skinned",
                binding.vertex_count + binding.blend_count
            ));
        }
    }

    if let Some(blend) = mesh.blends.iter().find(|b| b.vertex >= mesh.vertices.len()) {
        return fail(format!(
            "blend entry references vertex {} of {}",
            blend.vertex,
            mesh.vertices.len()
        ));
    }

    if let Some(face) = mesh
        .faces
        .iter()
        .find(|f| f.iter().any(|&v| v >= mesh.vertices.len()))
    {
        return fail(format!(
            "face {face:?} references a vertex past {}",
            mesh.vertices.len()
        ));
    }

    Ok(())
}
