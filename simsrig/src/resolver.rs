//! Locating assets by basename across archives and directories.
//!
//! Every backing kind implements [`AssetSource`]; [`Resolver`] tries its sources in priority
//! order and returns the first hit. File names are matched case-insensitively.

use crate::far::FarArchive;
use crate::Error;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AssetKind {
    /// Keyframe data (`.cfp`).
    Animation,
    /// Skeletons, suits and skills (`.cmx.bcf`, `.cmx`, `.bcf`).
    Character,
    /// Deformable meshes (`.bmf`, `.skn`).
    Mesh,
    /// Texture images (`.bmp`).
    Texture,
}

impl AssetKind {
    /// File name suffixes, tried in order.
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Animation => &[".cfp"],
            Self::Character => &[".cmx.bcf", ".cmx", ".bcf"],
            Self::Mesh => &[".bmf", ".skn"],
            Self::Texture => &[".bmp"],
        }
    }

    pub fn file_names(self, basename: &str) -> impl Iterator<Item = String> + '_ {
        self.suffixes()
            .iter()
            .map(move |suffix| format!("{basename}{suffix}"))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Animation => "animation",
            Self::Character => "character",
            Self::Mesh => "mesh",
            Self::Texture => "texture",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedAsset {
    /// Name as stored in the source (original case).
    pub file_name: String,
    pub source: String,
    pub bytes: Vec<u8>,
}

/// A filesystem path handed to consumers that cannot read from memory.
///
/// Temporary paths are never removed automatically; call [`AssetPath::cleanup`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AssetPath {
    Existing(PathBuf),
    Temporary(PathBuf),
}

impl AssetPath {
    pub fn path(&self) -> &Path {
        match self {
            Self::Existing(p) | Self::Temporary(p) => p,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Deletes the file if it was materialized for this request.
    pub fn cleanup(&self) -> Result<(), Error> {
        match self {
            Self::Existing(_) => Ok(()),
            Self::Temporary(p) => {
                std::fs::remove_file(p).map_err(|e| Error::io(p.display().to_string(), e))
            }
        }
    }
}

pub trait AssetSource {
    fn describe(&self) -> String;

    /// Maps a file name to the stored name, ignoring case.
    fn lookup(&self, file_name: &str) -> Option<String>;

    fn read(&mut self, stored_name: &str) -> Result<Vec<u8>, Error>;

    fn path(&mut self, stored_name: &str) -> Result<AssetPath, Error>;
}

fn lowercase_index<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for name in names {
        index
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }
    index
}

pub struct FarSource<R> {
    label: String,
    archive: FarArchive<R>,
    content: HashMap<String, String>,
}

impl FarSource<BufReader<File>> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        Ok(Self::new(
            path.display().to_string(),
            FarArchive::open_path(path)?,
        ))
    }
}

impl<R: Read + Seek> FarSource<R> {
    pub fn new(label: impl Into<String>, archive: FarArchive<R>) -> Self {
        let content = lowercase_index(archive.entries().iter().map(|e| e.name.as_str()));
        Self {
            label: label.into(),
            archive,
            content,
        }
    }

    pub fn archive(&self) -> &FarArchive<R> {
        &self.archive
    }
}

impl<R: Read + Seek> AssetSource for FarSource<R> {
    fn describe(&self) -> String {
        format!("far:{}", self.label)
    }

    fn lookup(&self, file_name: &str) -> Option<String> {
        self.content.get(&file_name.to_lowercase()).cloned()
    }

    fn read(&mut self, stored_name: &str) -> Result<Vec<u8>, Error> {
        self.archive.read(stored_name)
    }

    fn path(&mut self, stored_name: &str) -> Result<AssetPath, Error> {
        let bytes = self.archive.read(stored_name)?;
        let suffix = Path::new(stored_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("simsrig-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| Error::io(stored_name, e))?;
        file.write_all(&bytes)
            .map_err(|e| Error::io(file.path().display().to_string(), e))?;
        let (_, path) = file.keep().map_err(|e| Error::io(stored_name, e.error))?;
        log::debug!(
            "materialized '{stored_name}' from {} into {}",
            self.describe(),
            path.display()
        );
        Ok(AssetPath::Temporary(path))
    }
}

pub struct DirSource {
    root: PathBuf,
    content: HashMap<String, String>,
}

impl DirSource {
    /// Lists `root` once; files added later are not seen.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let display = root.display().to_string();
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(|e| Error::io(&display, e))? {
            let entry = entry.map_err(|e| Error::io(&display, e))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        let content = lowercase_index(names.iter().map(String::as_str));
        Ok(Self { root, content })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirSource {
    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn lookup(&self, file_name: &str) -> Option<String> {
        self.content.get(&file_name.to_lowercase()).cloned()
    }

    fn read(&mut self, stored_name: &str) -> Result<Vec<u8>, Error> {
        let path = self.root.join(stored_name);
        std::fs::read(&path).map_err(|e| Error::io(path.display().to_string(), e))
    }

    fn path(&mut self, stored_name: &str) -> Result<AssetPath, Error> {
        Ok(AssetPath::Existing(self.root.join(stored_name)))
    }
}

/// Tries each source in turn; the first to hold the asset wins.
#[derive(Default)]
pub struct Resolver {
    sources: Vec<Box<dyn AssetSource>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories become [`DirSource`]s, files are opened as FAR archives. Priority follows
    /// the order of `paths`.
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self, Error> {
        let mut resolver = Self::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                resolver.push(DirSource::new(path)?);
            } else {
                resolver.push(FarSource::open_path(path)?);
            }
        }
        Ok(resolver)
    }

    pub fn push(&mut self, source: impl AssetSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn with_source(mut self, source: impl AssetSource + 'static) -> Self {
        self.push(source);
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = String> + '_ {
        self.sources.iter().map(|s| s.describe())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Reads the first match for `basename` into memory.
    pub fn resolve(&mut self, basename: &str, kind: AssetKind) -> Result<ResolvedAsset, Error> {
        self.first_match(basename, kind, |source, stored| {
            let bytes = source.read(stored)?;
            Ok(ResolvedAsset {
                file_name: stored.to_string(),
                source: source.describe(),
                bytes,
            })
        })
    }

    /// Like [`Resolver::resolve`], for consumers that need a path on disk.
    pub fn resolve_path(&mut self, basename: &str, kind: AssetKind) -> Result<AssetPath, Error> {
        self.first_match(basename, kind, |source, stored| source.path(stored))
    }

    fn first_match<T>(
        &mut self,
        basename: &str,
        kind: AssetKind,
        mut fetch: impl FnMut(&mut dyn AssetSource, &str) -> Result<T, Error>,
    ) -> Result<T, Error> {
        for source in &mut self.sources {
            for file_name in kind.file_names(basename) {
                let Some(stored) = source.lookup(&file_name) else {
                    log::trace!("{}: no '{file_name}'", source.describe());
                    continue;
                };
                match fetch(source.as_mut(), &stored) {
                    Ok(found) => {
                        log::debug!(
                            "resolved '{file_name}' as '{stored}' in {}",
                            source.describe()
                        );
                        return Ok(found);
                    }
                    Err(e) if e.is_not_found() => {
                        log::trace!("{}: '{stored}' vanished: {e}", source.describe());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Err(Error::NotFound {
            kind: kind.label(),
            name: format!("{basename} (searched {} sources)", self.sources.len()),
        })
    }
}
