//! FAR 1a archive index.
//!
//! The manifest is parsed once; afterwards entries are served by seeking the backing reader.
//! All reads go through `&mut self`, so a stream handed out by [`FarArchive::open`] must be
//! dropped before the next entry can be opened.

use crate::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub const FAR_SIGNATURE: &[u8; 8] = b"FAR!byAZ";
pub const FAR_VERSION: u32 = 1;

const FORMAT: &str = "FAR archive";

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FarEntry {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug)]
pub struct FarArchive<R> {
    reader: R,
    entries: Vec<FarEntry>,
    index: HashMap<String, usize>,
}

impl FarArchive<BufReader<File>> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> FarArchive<R> {
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let total_len = reader
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::format(FORMAT, format!("cannot size archive: {e}")))?;
        reader.rewind().map_err(|e| eof(e, "signature"))?;

        let mut signature = [0u8; 8];
        reader
            .read_exact(&mut signature)
            .map_err(|e| eof(e, "signature"))?;
        if &signature != FAR_SIGNATURE {
            return Err(Error::format(FORMAT, "missing FAR!byAZ signature"));
        }
        let version = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| eof(e, "version"))?;
        if version != FAR_VERSION {
            return Err(Error::format(FORMAT, format!("unsupported version {version}")));
        }
        let manifest_offset = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| eof(e, "manifest offset"))? as u64;
        if manifest_offset > total_len {
            return Err(Error::format(
                FORMAT,
                format!("manifest offset {manifest_offset} past end of file ({total_len})"),
            ));
        }

        reader
            .seek(SeekFrom::Start(manifest_offset))
            .map_err(|e| eof(e, "manifest"))?;
        let count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| eof(e, "entry count"))? as usize;

        let mut entries = Vec::with_capacity(count.min(4096));
        let mut index = HashMap::with_capacity(count.min(4096));
        for i in 0..count {
            let length = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| eof(e, "entry size"))? as u64;
            let stored_length = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| eof(e, "entry stored size"))? as u64;
            let offset = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| eof(e, "entry offset"))? as u64;
            let name_len = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| eof(e, "entry name length"))? as usize;
            if name_len as u64 > total_len {
                return Err(Error::format(
                    FORMAT,
                    format!("entry {i} name length {name_len} exceeds archive size"),
                ));
            }
            let mut name = vec![0u8; name_len];
            reader
                .read_exact(&mut name)
                .map_err(|e| eof(e, "entry name"))?;
            let name = String::from_utf8_lossy(&name).into_owned();

            if length != stored_length {
                return Err(Error::format(
                    FORMAT,
                    format!("entry '{name}' is compressed ({stored_length} != {length})"),
                ));
            }
            if offset.saturating_add(length) > total_len {
                return Err(Error::format(
                    FORMAT,
                    format!("entry '{name}' ({offset}+{length}) runs past end of file"),
                ));
            }

            index.entry(name.clone()).or_insert(entries.len());
            entries.push(FarEntry {
                name,
                offset,
                length,
            });
        }

        log::debug!("indexed FAR archive: {} entries", entries.len());
        Ok(Self {
            reader,
            entries,
            index,
        })
    }

    /// Entry names in manifest order.
    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[FarEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&FarEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Opens `name` (exact match) as a bounded stream over the backing reader.
    pub fn open(&mut self, name: &str) -> Result<std::io::Take<&mut R>, Error> {
        let entry = self.entry(name).ok_or_else(|| Error::NotFound {
            kind: "archive entry",
            name: name.to_string(),
        })?;
        let (offset, length) = (entry.offset, entry.length);
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(name, e))?;
        Ok(self.reader.by_ref().take(length))
    }

    /// Copies `name` out of the archive.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        let mut stream = self.open(name)?;
        let mut bytes = Vec::with_capacity(stream.limit() as usize);
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io(name, e))?;
        Ok(bytes)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

fn eof(e: std::io::Error, what: &str) -> Error {
    Error::format(FORMAT, format!("failed to read {what}: {e}"))
}
