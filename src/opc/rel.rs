//! Relationships between parts of an OPC package.
//!
//! Each source part has at most one `.rels` part listing its outgoing
//! relationships. Targets are stored relative to the source's directory.

use crate::opc::constants::{namespace, target_mode};
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use crate::xml::{attr, escape_xml};
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::fmt::Write as FmtWrite;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    is_external: bool,
}

impl Relationship {
    /// Relationship ID (e.g. `rId1`).
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Relationship type URI.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target as written in the `.rels` part.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// Ordered relationships of one source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Directory of the source part, for resolving relative targets
    base_uri: String,
    rels: SmallVec<[Relationship; 8]>,
}

impl Relationships {
    /// Create an empty collection for a source part in `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: SmallVec::new(),
        }
    }

    /// Parse a `.rels` part.
    pub fn from_xml(xml: &[u8], base_uri: &str) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let r_id = attr(e, b"Id")?;
                        let reltype = attr(e, b"Type")?;
                        let target = attr(e, b"Target")?;
                        let external = attr(e, b"TargetMode")?.as_deref() == Some(target_mode::EXTERNAL);

                        if let (Some(r_id), Some(reltype), Some(target_ref)) = (r_id, reltype, target) {
                            rels.rels.push(Relationship {
                                r_id,
                                reltype,
                                target_ref,
                                is_external: external,
                            });
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::Xml(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Serialize back to `.rels` XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS);
        for rel in &self.rels {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref)
            );
            if rel.is_external {
                let _ = write!(xml, r#" TargetMode="{}""#, target_mode::EXTERNAL);
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Iterate in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Iterate over relationships of one type.
    pub fn of_type<'a, 'b>(&'a self, reltype: &'b str) -> impl Iterator<Item = &'a Relationship> + use<'a, 'b> {
        self.rels.iter().filter(move |rel| rel.reltype == reltype)
    }

    /// The first relationship of a type, or `RelationshipNotFound`.
    pub fn first_of(&self, reltype: &str) -> Result<&Relationship> {
        self.rels
            .iter()
            .find(|rel| rel.reltype == reltype)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("No relationship of type '{}'", reltype)))
    }

    /// Resolve the absolute part name an internal relationship points to.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external {
            return Err(OpcError::RelationshipNotFound(format!(
                "{} is an external relationship",
                rel.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &rel.target_ref)
    }

    /// Resolve a relationship ID straight to its target part.
    pub fn resolve(&self, r_id: &str) -> Result<PackURI> {
        let rel = self
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
        self.target_partname(rel)
    }

    /// Add an internal relationship to `target` and return its new ID.
    pub fn add(&mut self, reltype: &str, target: &PackURI) -> String {
        let r_id = self.next_r_id();
        self.rels.push(Relationship {
            r_id: r_id.clone(),
            reltype: reltype.to_string(),
            target_ref: target.relative_ref(&self.base_uri),
            is_external: false,
        });
        r_id
    }

    /// Remove every relationship matching the predicate, returning them.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Relationship>
    where
        F: FnMut(&Relationship) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = SmallVec::new();
        for rel in self.rels.drain(..) {
            if predicate(&rel) {
                removed.push(rel);
            } else {
                kept.push(rel);
            }
        }
        self.rels = kept;
        removed
    }

    pub fn len(&self) -> usize {
        self.rels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// First unused `rIdN`, filling gaps left by removed relationships.
    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| rel.r_id.strip_prefix("rId")?.parse().ok())
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }
        format!("rId{}", next)
    }
}
