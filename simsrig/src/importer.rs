//! End-to-end import: resolve assets, decode them, and reconstruct the rig.
//!
//! Assets are read one at a time and fully buffered before the next is requested, so sources
//! backed by a single archive cursor are never interleaved.

use crate::{
    Action, AnimFrameTable, AssetKind, AssetPath, BindPose, CharacterData, DEFAULT_FRAME_LENGTH,
    DeformableMesh, Error, Resolver, Skeleton, SkinnedMesh,
};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct ImportOptions {
    /// Keyframe spacing in time units.
    pub frame_length: f32,
    /// Resolve each mesh's default texture to a file path.
    pub load_textures: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            load_textures: true,
        }
    }
}

/// A skeleton with the meshes bound to it, ready to hand to a scene builder.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CharacterImport {
    pub name: String,
    pub skeleton: Skeleton,
    pub pose: BindPose,
    pub meshes: Vec<SkinnedMesh>,
    /// Texture basename to image path.
    pub textures: BTreeMap<String, AssetPath>,
}

impl CharacterImport {
    /// Removes textures that were extracted to temporary files.
    pub fn cleanup(&self) -> Result<(), Error> {
        for path in self.textures.values() {
            path.cleanup()?;
        }
        Ok(())
    }
}

pub struct Importer<'r> {
    resolver: &'r mut Resolver,
    options: ImportOptions,
}

impl<'r> Importer<'r> {
    pub fn new(resolver: &'r mut Resolver, options: ImportOptions) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn load_character(&mut self, basename: &str) -> Result<CharacterData, Error> {
        let asset = self.resolver.resolve(basename, AssetKind::Character)?;
        CharacterData::from_bytes(&asset.bytes)
    }

    pub fn load_mesh(&mut self, basename: &str) -> Result<DeformableMesh, Error> {
        let asset = self.resolver.resolve(basename, AssetKind::Mesh)?;
        DeformableMesh::from_file_bytes(&asset.file_name, &asset.bytes)
    }

    /// Imports the skeleton from `skeleton_basename` and binds each named mesh to it.
    pub fn import_character<S: AsRef<str>>(
        &mut self,
        skeleton_basename: &str,
        mesh_basenames: &[S],
    ) -> Result<CharacterImport, Error> {
        let character = self.load_character(skeleton_basename)?;
        let skeleton = character.skeleton()?.clone();
        self.bind_meshes(
            skeleton_basename,
            skeleton,
            mesh_basenames.iter().map(|s| s.as_ref().to_string()),
        )
    }

    /// Like [`Importer::import_character`], taking the mesh list from one of the file's suits.
    pub fn import_suit(
        &mut self,
        skeleton_basename: &str,
        suit_name: &str,
    ) -> Result<CharacterImport, Error> {
        let character = self.load_character(skeleton_basename)?;
        let skeleton = character.skeleton()?.clone();
        let suit = character.suit(suit_name)?;
        let meshes: Vec<String> = suit.skins.iter().map(|s| s.mesh_name.clone()).collect();
        self.bind_meshes(suit_name, skeleton, meshes)
    }

    fn bind_meshes(
        &mut self,
        name: &str,
        skeleton: Skeleton,
        mesh_basenames: impl IntoIterator<Item = String>,
    ) -> Result<CharacterImport, Error> {
        let pose = BindPose::from_skeleton(&skeleton)?;
        let mut meshes = Vec::new();
        let mut textures = BTreeMap::new();

        for basename in mesh_basenames {
            match self.bind_mesh(&basename, &pose, &mut textures) {
                Ok(mesh) => meshes.push(mesh),
                Err(e) => {
                    for path in textures.values() {
                        if let Err(cleanup) = path.cleanup() {
                            log::warn!("{cleanup}");
                        }
                    }
                    return Err(e);
                }
            }
        }

        log::info!(
            "imported '{name}': {} bones, {} meshes, {} textures",
            pose.bones.len(),
            meshes.len(),
            textures.len()
        );
        Ok(CharacterImport {
            name: name.to_string(),
            skeleton,
            pose,
            meshes,
            textures,
        })
    }

    fn bind_mesh(
        &mut self,
        basename: &str,
        pose: &BindPose,
        textures: &mut BTreeMap<String, AssetPath>,
    ) -> Result<SkinnedMesh, Error> {
        let mesh = self.load_mesh(basename)?;
        let skinned = SkinnedMesh::bind(&mesh, pose)?;
        if self.options.load_textures {
            if let Some(texture) = skinned.texture.as_deref() {
                if !textures.contains_key(texture) {
                    let path = self.resolver.resolve_path(texture, AssetKind::Texture)?;
                    textures.insert(texture.to_string(), path);
                }
            }
        }
        Ok(skinned)
    }

    /// Looks up `skill_name` in `character_basename` and assembles its keyframe curves.
    pub fn import_skill(
        &mut self,
        character_basename: &str,
        skill_name: &str,
    ) -> Result<Action, Error> {
        let character = self.load_character(character_basename)?;
        log::debug!(
            "available skills: {:?}",
            character.skill_names().collect::<Vec<_>>()
        );
        let skill = character.skill(skill_name)?;
        let asset = self
            .resolver
            .resolve(&skill.animation_name, AssetKind::Animation)?;
        let frames = AnimFrameTable::from_cfp_bytes(&asset.bytes, skill.channel_counts())?;
        Action::from_skill(skill, &frames, self.options.frame_length)
    }
}
