//! In-memory OPC package.
//!
//! The whole zip container is loaded into a map of part name to bytes. The
//! presentation writer edits a handful of parts in place and serializes the
//! map back out, so parts this crate does not understand (themes, media,
//! fonts) travel through untouched.

use crate::opc::constants::relationship_type;
use crate::opc::content_types::ContentTypes;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::rel::Relationships;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the buffer reserved from a member's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Initial buffer size for a member; the declared size comes from the zip
/// header and is not trusted beyond `MAX_PREALLOC`.
fn blob_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

/// An OPC package held in memory.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<PackURI, Vec<u8>>,
}

impl Package {
    /// Open a package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load a package from the bytes of a zip container.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut parts = BTreeMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let uri = PackURI::from_membername(file.name())?;
            let mut blob = Vec::with_capacity(blob_capacity(file.size()));
            file.read_to_end(&mut blob)?;
            parts.insert(uri, blob);
        }

        let package = Self { parts };
        if !package.contains(&PackURI::new(CONTENT_TYPES_URI)?) {
            return Err(OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()));
        }
        Ok(package)
    }

    /// Serialize to a zip container, `[Content_Types].xml` first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let content_types = PackURI::new(CONTENT_TYPES_URI)?;
        let ordered = self
            .parts
            .iter()
            .filter(|(uri, _)| **uri == content_types)
            .chain(self.parts.iter().filter(|(uri, _)| **uri != content_types));

        for (uri, blob) in ordered {
            writer.start_file(uri.membername(), options)?;
            writer.write_all(blob)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Raw bytes of a part.
    pub fn part(&self, uri: &PackURI) -> Result<&[u8]> {
        self.parts
            .get(uri)
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(uri.to_string()))
    }

    #[inline]
    pub fn contains(&self, uri: &PackURI) -> bool {
        self.parts.contains_key(uri)
    }

    /// Insert or replace a part.
    pub fn set_part(&mut self, uri: PackURI, blob: Vec<u8>) {
        self.parts.insert(uri, blob);
    }

    /// Remove a part together with its `.rels` part.
    pub fn remove_part(&mut self, uri: &PackURI) -> Option<Vec<u8>> {
        self.parts.remove(&uri.rels_uri());
        self.parts.remove(uri)
    }

    /// Part names in sorted order.
    pub fn partnames(&self) -> impl Iterator<Item = &PackURI> {
        self.parts.keys()
    }

    /// Relationships of a part (or of the package for `/`).
    ///
    /// A part without a `.rels` part has an empty collection.
    pub fn rels_for(&self, source: &PackURI) -> Result<Relationships> {
        match self.parts.get(&source.rels_uri()) {
            Some(xml) => Relationships::from_xml(xml, source.base_uri()),
            None => Ok(Relationships::new(source.base_uri())),
        }
    }

    /// Replace the relationships of a part.
    pub fn set_rels(&mut self, source: &PackURI, rels: &Relationships) {
        self.parts
            .insert(source.rels_uri(), rels.to_xml().into_bytes());
    }

    /// Parsed `[Content_Types].xml`.
    pub fn content_types(&self) -> Result<ContentTypes> {
        ContentTypes::from_xml(self.part(&PackURI::new(CONTENT_TYPES_URI)?)?)
    }

    pub fn set_content_types(&mut self, types: &ContentTypes) -> Result<()> {
        self.parts
            .insert(PackURI::new(CONTENT_TYPES_URI)?, types.to_xml().into_bytes());
        Ok(())
    }

    /// The main document part (`/ppt/presentation.xml`, `/word/document.xml`).
    pub fn main_document_partname(&self) -> Result<PackURI> {
        let package_uri = PackURI::new(PACKAGE_URI)?;
        let rels = self.rels_for(&package_uri)?;
        let rel = rels.first_of(relationship_type::OFFICE_DOCUMENT)?;
        rels.target_partname(rel)
    }

    /// First unused part name following `pattern`, where `%d` is replaced by
    /// 1, 2, 3... (`/ppt/slides/slide%d.xml`).
    pub fn next_partname(&self, pattern: &str) -> Result<PackURI> {
        let mut index = 1usize;
        loop {
            let candidate = PackURI::new(pattern.replace("%d", &index.to_string()))?;
            if !self.contains(&candidate) {
                return Ok(candidate);
            }
            index += 1;
        }
    }
}
