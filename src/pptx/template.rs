//! Slide layouts of a presentation template.
//!
//! Layouts are collected from every slide master in `sldMasterIdLst` order,
//! then in `sldLayoutIdLst` order within each master, which is the order
//! PowerPoint shows them in the layout gallery.

use crate::config::ConfigError;
use crate::error::{Result, SlideError};
use crate::opc::constants::{content_type as CT, relationship_type as RT};
use crate::opc::error::OpcError;
use crate::opc::{PackURI, Package, Relationships};
use crate::xml::{attr, rel_id};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;

/// What a placeholder is meant to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Title,
    /// Body text; the OOXML default when `type` is absent
    Body,
    Picture,
    /// Date, footer, slide number, chart, table and the rest
    Other,
}

impl PlaceholderKind {
    /// Classify a `p:ph/@type` value.
    pub fn from_ph_type(ph_type: Option<&str>) -> Self {
        match ph_type {
            None | Some("obj") | Some("body") | Some("subTitle") => PlaceholderKind::Body,
            Some("title") | Some("ctrTitle") => PlaceholderKind::Title,
            Some("pic") => PlaceholderKind::Picture,
            Some(_) => PlaceholderKind::Other,
        }
    }
}

/// A placeholder shape of a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    /// `p:ph/@idx`, 0 when absent
    pub idx: u32,
    /// Raw `p:ph/@type`
    pub ph_type: Option<String>,
    /// Position among the layout's placeholders
    pub position: usize,
    /// Shape name (`p:cNvPr/@name`)
    pub name: String,
}

/// A slide layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    name: String,
    partname: PackURI,
    placeholders: Vec<Placeholder>,
}

impl Layout {
    pub fn new(name: impl Into<String>, partname: PackURI, placeholders: Vec<Placeholder>) -> Self {
        Self {
            name: name.into(),
            partname,
            placeholders,
        }
    }

    /// Layout name (`p:cSld/@name`), empty when unnamed.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// First title placeholder.
    pub fn title_placeholder(&self) -> Option<&Placeholder> {
        self.placeholders
            .iter()
            .find(|ph| ph.kind == PlaceholderKind::Title)
    }

    /// Parse a `slideLayout` part.
    pub fn from_xml(xml: &[u8], partname: PackURI) -> std::result::Result<Self, OpcError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut name = String::new();
        let mut placeholders = Vec::new();
        // (shape name, ph) of the shape being read
        let mut shape: Option<(String, Option<(Option<String>, u32)>)> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"cSld" => name = attr(e, b"name")?.unwrap_or_default(),
                    b"sp" | b"pic" | b"graphicFrame" => shape = Some((String::new(), None)),
                    _ => read_shape_child(e, &mut shape)?,
                },
                Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"cSld" => name = attr(e, b"name")?.unwrap_or_default(),
                    _ => read_shape_child(e, &mut shape)?,
                },
                Ok(Event::End(ref e)) => {
                    if matches!(e.local_name().as_ref(), b"sp" | b"pic" | b"graphicFrame")
                        && let Some((shape_name, Some((ph_type, idx)))) = shape.take()
                    {
                        placeholders.push(Placeholder {
                            kind: PlaceholderKind::from_ph_type(ph_type.as_deref()),
                            idx,
                            ph_type,
                            position: placeholders.len(),
                            name: shape_name,
                        });
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::Xml(format!("Layout parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(Self::new(name, partname, placeholders))
    }
}

/// `cNvPr` and `ph` inside the current shape.
fn read_shape_child(
    e: &BytesStart<'_>,
    shape: &mut Option<(String, Option<(Option<String>, u32)>)>,
) -> std::result::Result<(), OpcError> {
    let Some((name, ph)) = shape.as_mut() else {
        return Ok(());
    };
    match e.local_name().as_ref() {
        b"cNvPr" => *name = attr(e, b"name")?.unwrap_or_default(),
        b"ph" => {
            let idx = attr(e, b"idx")?.and_then(|v| v.parse().ok()).unwrap_or(0);
            *ph = Some((attr(e, b"type")?, idx));
        },
        _ => {},
    }
    Ok(())
}

/// A loaded presentation template.
#[derive(Debug, Clone)]
pub struct Template {
    package: Package,
    presentation: PackURI,
    layouts: Vec<Layout>,
    notes_master: Option<PackURI>,
}

impl Template {
    /// Load a template file. A missing file is a configuration error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::TemplateNotFound(path.to_path_buf()).into());
        }
        let template = Self::from_package(Package::open(path)?)?;
        tracing::debug!(
            path = %path.display(),
            layouts = template.layouts.len(),
            notes_master = template.notes_master.is_some(),
            "loaded template"
        );
        Ok(template)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(data)?)
    }

    pub fn from_package(package: Package) -> Result<Self> {
        let presentation = package
            .main_document_partname()
            .map_err(|e| SlideError::InvalidTemplate(format!("no main document: {}", e)))?;
        let content_types = package.content_types()?;
        match content_types.get(&presentation) {
            Some(CT::PML_PRESENTATION_MAIN)
            | Some(CT::PML_TEMPLATE_MAIN)
            | Some(CT::PML_SLIDESHOW_MAIN)
            | Some(CT::PML_PRES_MACRO_MAIN) => {},
            other => {
                return Err(SlideError::InvalidTemplate(format!(
                    "{} is not a presentation ({})",
                    presentation,
                    other.unwrap_or("no content type")
                )));
            },
        }

        let pres_rels = package.rels_for(&presentation)?;
        let mut layouts = Vec::new();
        for master_rid in id_list_rids(package.part(&presentation)?, b"sldMasterId")? {
            let master = pres_rels.resolve(&master_rid)?;
            layouts.extend(load_master_layouts(&package, &master)?);
        }

        let notes_master = match pres_rels.first_of(RT::NOTES_MASTER) {
            Ok(rel) => Some(pres_rels.target_partname(rel)?),
            Err(_) => None,
        };

        Ok(Self {
            package,
            presentation,
            layouts,
            notes_master,
        })
    }

    /// A template holding only `layouts`, for matcher tests.
    #[cfg(test)]
    pub(crate) fn from_layouts(layouts: Vec<Layout>) -> Self {
        Self {
            package: Package::default(),
            presentation: PackURI::new("/ppt/presentation.xml").unwrap(),
            layouts,
            notes_master: None,
        }
    }

    /// Layouts in template order.
    #[inline]
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn layout_names(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(Layout::name)
    }

    #[inline]
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Part name of `presentation.xml`.
    #[inline]
    pub fn presentation_partname(&self) -> &PackURI {
        &self.presentation
    }

    /// Notes master, required for speaker notes.
    #[inline]
    pub fn notes_master(&self) -> Option<&PackURI> {
        self.notes_master.as_ref()
    }
}

fn load_master_layouts(package: &Package, master: &PackURI) -> std::result::Result<Vec<Layout>, OpcError> {
    let master_rels: Relationships = package.rels_for(master)?;
    id_list_rids(package.part(master)?, b"sldLayoutId")?
        .iter()
        .map(|rid| {
            let partname = master_rels.resolve(rid)?;
            Layout::from_xml(package.part(&partname)?, partname)
        })
        .collect()
}

/// Relationship ids of the `local_name` entries of an id list
/// (`sldMasterIdLst`, `sldLayoutIdLst`, `sldIdLst`).
pub(crate) fn id_list_rids(xml: &[u8], local_name: &[u8]) -> std::result::Result<Vec<String>, OpcError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rids = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == local_name => {
                if let Some(rid) = rel_id(e)? {
                    rids.push(rid);
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::Xml(e.to_string())),
            _ => {},
        }
        buf.clear();
    }

    Ok(rids)
}
