//! Writing generated slides into a copy of the template.
//!
//! The template package is cloned and its existing slides (with their notes
//! slides) are dropped. New slides are bound to template layouts and carry
//! placeholder shapes whose `type`/`idx` match the layout, so position and
//! formatting are inherited from the layout. Everything else in the
//! template (masters, themes, media) is kept as is.

use crate::error::Result;
use crate::opc::constants::{content_type as CT, namespace as NS, relationship_type as RT};
use crate::opc::error::OpcError;
use crate::opc::{ContentTypes, PackURI, Package, Relationships};
use crate::pptx::template::{Layout, Placeholder, Template};
use crate::xml::escape_xml;
use quick_xml::events::Event;
use quick_xml::events::attributes::Attribute;
use quick_xml::name::PrefixDeclaration;
use quick_xml::{Reader, Writer};
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// First `p:sldId/@id`; lower values are reserved.
const FIRST_SLIDE_ID: u32 = 256;

/// Children of `p:presentation` that precede `p:sldIdLst`.
const BEFORE_SLIDE_LIST: [&[u8]; 4] = [b"sldMasterIdLst", b"notesMasterIdLst", b"handoutMasterIdLst", b"sldIdLst"];

/// Builds the output presentation on top of a template.
#[derive(Debug)]
pub struct PresentationWriter<'t> {
    template: &'t Template,
    package: Package,
    pres_rels: Relationships,
    content_types: ContentTypes,
    /// `(p:sldId/@id, r:id)` in slide order
    slide_ids: Vec<(u32, String)>,
}

impl<'t> PresentationWriter<'t> {
    /// Start from the template with all of its slides removed.
    pub fn new(template: &'t Template) -> Result<Self> {
        let mut package = template.package().clone();
        let presentation = template.presentation_partname();
        let mut pres_rels = package.rels_for(presentation)?;
        let mut content_types = package.content_types()?;

        let removed = pres_rels.remove_where(|rel| rel.reltype() == RT::SLIDE);
        for rel in removed.iter().filter(|rel| !rel.is_external()) {
            let slide = pres_rels.target_partname(rel)?;
            let slide_rels = package.rels_for(&slide)?;
            for notes_rel in slide_rels.of_type(RT::NOTES_SLIDE) {
                let notes = slide_rels.target_partname(notes_rel)?;
                package.remove_part(&notes);
                content_types.remove_override(&notes);
            }
            package.remove_part(&slide);
            content_types.remove_override(&slide);
        }
        if !removed.is_empty() {
            tracing::debug!(slides = removed.len(), "removed template slides");
        }

        // A .potx/.ppsx template still produces a plain presentation
        if matches!(
            content_types.get(presentation),
            Some(CT::PML_TEMPLATE_MAIN) | Some(CT::PML_SLIDESHOW_MAIN)
        ) {
            content_types.set_override(presentation, CT::PML_PRESENTATION_MAIN);
        }

        Ok(Self {
            template,
            package,
            pres_rels,
            content_types,
            slide_ids: Vec::new(),
        })
    }

    pub fn slide_count(&self) -> usize {
        self.slide_ids.len()
    }

    /// Append a slide using `layout`.
    ///
    /// The title goes into the layout's title placeholder (dropped if it has
    /// none), `body` into the given placeholder, and non-empty `notes` into a
    /// notes slide when the template has a notes master.
    pub fn add_slide(
        &mut self,
        layout: &Layout,
        title: &str,
        body: Option<(&Placeholder, &str)>,
        notes: &str,
    ) -> Result<PackURI> {
        let slide = self.package.next_partname("/ppt/slides/slide%d.xml")?;
        let mut slide_rels = Relationships::new(slide.base_uri());
        slide_rels.add(RT::SLIDE_LAYOUT, layout.partname());

        let title_ph = layout.title_placeholder();
        if title_ph.is_none() && !title.trim().is_empty() {
            tracing::debug!(layout = layout.name(), "layout has no title placeholder, title dropped");
        }
        self.package
            .set_part(slide.clone(), slide_xml(title_ph.map(|ph| (ph, title)), body).into_bytes());
        self.content_types.set_override(&slide, CT::PML_SLIDE);

        if let Some(notes_master) = self.template.notes_master()
            && !notes.trim().is_empty()
        {
            let notes_part = self.package.next_partname("/ppt/notesSlides/notesSlide%d.xml")?;
            let mut notes_rels = Relationships::new(notes_part.base_uri());
            notes_rels.add(RT::NOTES_MASTER, notes_master);
            notes_rels.add(RT::SLIDE, &slide);
            self.package.set_part(notes_part.clone(), notes_xml(notes).into_bytes());
            self.package.set_rels(&notes_part, &notes_rels);
            self.content_types.set_override(&notes_part, CT::PML_NOTES_SLIDE);
            slide_rels.add(RT::NOTES_SLIDE, &notes_part);
        }

        self.package.set_rels(&slide, &slide_rels);
        let r_id = self.pres_rels.add(RT::SLIDE, &slide);
        let id = FIRST_SLIDE_ID + self.slide_ids.len() as u32;
        self.slide_ids.push((id, r_id));
        Ok(slide)
    }

    /// The finished package.
    pub fn to_package(&self) -> Result<Package> {
        let mut package = self.package.clone();
        let presentation = self.template.presentation_partname();
        package.set_rels(presentation, &self.pres_rels);
        package.set_content_types(&self.content_types)?;
        let xml = rewrite_slide_list(package.part(presentation)?, &self.slide_ids)?;
        package.set_part(presentation.clone(), xml);
        Ok(package)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_package()?.to_bytes()?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_package()?.save(path)?;
        Ok(())
    }
}

fn open_shape_tree(xml: &mut String, root: &str) {
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(
        xml,
        r#"<p:{} xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
        root,
        NS::DML_MAIN,
        NS::OFC_RELATIONSHIPS,
        NS::PML_MAIN
    );
    xml.push_str("<p:cSld><p:spTree>");
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
    xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
}

fn close_shape_tree(xml: &mut String, root: &str) {
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    let _ = write!(xml, "</p:{}>", root);
}

/// A placeholder shape with one paragraph per line of `text`.
fn write_placeholder_shape(xml: &mut String, id: u32, name: &str, ph_attrs: &str, text: &str) {
    let _ = write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph{}/></p:nvPr></p:nvSpPr><p:spPr/>"#,
        id,
        escape_xml(name),
        ph_attrs
    );
    xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
    let mut lines = text.lines().peekable();
    if lines.peek().is_none() {
        xml.push_str(r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
    }
    for line in lines {
        if line.is_empty() {
            xml.push_str(r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
        } else {
            let _ = write!(
                xml,
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape_xml(line)
            );
        }
    }
    xml.push_str("</p:txBody></p:sp>");
}

/// ` type=".." idx=".."` matching a layout placeholder.
fn ph_attrs(ph: &Placeholder) -> String {
    let mut attrs = String::new();
    if let Some(ph_type) = &ph.ph_type {
        let _ = write!(attrs, r#" type="{}""#, escape_xml(ph_type));
    }
    if ph.idx != 0 {
        let _ = write!(attrs, r#" idx="{}""#, ph.idx);
    }
    attrs
}

fn slide_xml(title: Option<(&Placeholder, &str)>, body: Option<(&Placeholder, &str)>) -> String {
    let mut xml = String::with_capacity(2048);
    open_shape_tree(&mut xml, "sld");
    if let Some((ph, text)) = title {
        write_placeholder_shape(&mut xml, 2, "Title 1", &ph_attrs(ph), text);
    }
    if let Some((ph, text)) = body {
        write_placeholder_shape(&mut xml, 3, "Content Placeholder 2", &ph_attrs(ph), text);
    }
    close_shape_tree(&mut xml, "sld");
    xml
}

fn notes_xml(notes: &str) -> String {
    let mut xml = String::with_capacity(1024);
    open_shape_tree(&mut xml, "notes");
    write_placeholder_shape(&mut xml, 2, "Notes Placeholder 1", r#" type="body" idx="1""#, notes);
    close_shape_tree(&mut xml, "notes");
    xml
}

/// Replace `sldIdLst` in `presentation.xml` with `slide_ids`, keeping
/// everything else byte for byte.
fn rewrite_slide_list(xml: &[u8], slide_ids: &[(u32, String)]) -> std::result::Result<Vec<u8>, OpcError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + slide_ids.len() * 48));

    let mut depth = 0usize;
    // Depth at which an old sldIdLst is being skipped
    let mut skipping: Option<usize> = None;
    let mut list: Option<String> = None;
    let mut inserted = false;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| OpcError::Xml(format!("Presentation parse error: {}", e)))?;

        if let Some(skip_depth) = skipping {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == skip_depth {
                        skipping = None;
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
            continue;
        }

        match &event {
            Event::Start(e) | Event::Empty(e) if depth == 0 => {
                list = Some(slide_list_xml(e, slide_ids)?);
            },
            Event::Start(e) | Event::Empty(e) if depth == 1 => {
                let local = e.local_name();
                if local.as_ref() == b"sldIdLst" {
                    if matches!(event, Event::Start(_)) {
                        skipping = Some(depth);
                        depth += 1;
                    }
                    buf.clear();
                    continue;
                }
                if !inserted && !BEFORE_SLIDE_LIST.contains(&local.as_ref()) {
                    writer.get_mut().extend_from_slice(list.take().unwrap_or_default().as_bytes());
                    inserted = true;
                }
            },
            Event::End(_) if depth == 1 && !inserted => {
                writer.get_mut().extend_from_slice(list.take().unwrap_or_default().as_bytes());
                inserted = true;
            },
            _ => {},
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {},
        }
        writer.write_event(event)?;
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// The new `sldIdLst` element, using the prefixes declared on the root.
fn slide_list_xml(
    root: &quick_xml::events::BytesStart<'_>,
    slide_ids: &[(u32, String)],
) -> std::result::Result<String, OpcError> {
    if slide_ids.is_empty() {
        return Ok(String::new());
    }

    let pml = root
        .name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default();

    let mut rel_prefix = None;
    for attr in root.attributes() {
        let Attribute { key, value } = attr?;
        if let Some(PrefixDeclaration::Named(prefix)) = key.as_namespace_binding()
            && value.as_ref() == NS::OFC_RELATIONSHIPS.as_bytes()
        {
            rel_prefix = Some(String::from_utf8_lossy(prefix).into_owned());
        }
    }
    let (r, declare) = match rel_prefix {
        Some(prefix) => (prefix, String::new()),
        None => ("r".to_string(), format!(r#" xmlns:r="{}""#, NS::OFC_RELATIONSHIPS)),
    };

    let mut xml = format!("<{}sldIdLst{}>", pml, declare);
    for (id, r_id) in slide_ids {
        let _ = write!(xml, r#"<{}sldId id="{}" {}:id="{}"/>"#, pml, id, r, r_id);
    }
    let _ = write!(xml, "</{}sldIdLst>", pml);
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::fixtures::{self, FixtureLayout};
    use crate::pptx::matcher::{find_content_placeholder, find_slide_layout_by_name};
    use crate::pptx::template::id_list_rids;

    fn template(notes: bool, slides: usize) -> Template {
        Template::from_bytes(&fixtures::template(&fixtures::standard_layouts(), notes, slides)).unwrap()
    }

    fn presentation_xml(package: &Package) -> String {
        let pres = package.main_document_partname().unwrap();
        String::from_utf8(package.part(&pres).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_template_slides_are_removed() {
        let template = template(true, 2);
        let package = PresentationWriter::new(&template).unwrap().to_package().unwrap();

        for part in [
            "/ppt/slides/slide1.xml",
            "/ppt/slides/slide2.xml",
            "/ppt/slides/_rels/slide1.xml.rels",
            "/ppt/notesSlides/notesSlide1.xml",
        ] {
            assert!(!package.contains(&PackURI::new(part).unwrap()), "{} left behind", part);
        }

        let pres = template.presentation_partname();
        let rels = package.rels_for(pres).unwrap();
        assert_eq!(rels.of_type(RT::SLIDE).count(), 0);
        assert_eq!(rels.of_type(RT::SLIDE_MASTER).count(), 1);

        let types = package.content_types().unwrap();
        assert!(!types.has_override(&PackURI::new("/ppt/slides/slide1.xml").unwrap()));
        assert!(!types.has_override(&PackURI::new("/ppt/notesSlides/notesSlide1.xml").unwrap()));

        let xml = presentation_xml(&package);
        assert!(!xml.contains("sldIdLst"));
        assert!(xml.contains("<p:sldSz"));
        // Layouts survive
        assert_eq!(Template::from_package(package).unwrap().layouts().len(), 4);
    }

    #[test]
    fn test_added_slides_are_linked() {
        let template = template(true, 1);
        let layout = find_slide_layout_by_name(&template, "Two Content").unwrap();
        let body = find_content_placeholder(layout).unwrap();

        let mut writer = PresentationWriter::new(&template).unwrap();
        let first = writer.add_slide(layout, "Intro", Some((body, "- one\n- two")), "Say hello").unwrap();
        let second = writer.add_slide(layout, "Next", None, "").unwrap();
        assert_eq!(writer.slide_count(), 2);
        assert_eq!(first.as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(second.as_str(), "/ppt/slides/slide2.xml");

        let package = Package::from_bytes(&writer.to_bytes().unwrap()).unwrap();
        let pres = template.presentation_partname();
        let pres_rels = package.rels_for(pres).unwrap();
        let xml = presentation_xml(&package);

        let slides: Vec<PackURI> = id_list_rids(xml.as_bytes(), b"sldId")
            .unwrap()
            .iter()
            .map(|rid| pres_rels.resolve(rid).unwrap())
            .collect();
        assert_eq!(slides, vec![first.clone(), second.clone()]);
        assert!(xml.contains(r#"<p:sldId id="256""#));
        assert!(xml.contains(r#"<p:sldId id="257""#));
        // Schema order: the list sits between the master lists and sldSz
        assert!(xml.find("notesMasterIdLst").unwrap() < xml.find("sldIdLst").unwrap());
        assert!(xml.find("sldIdLst").unwrap() < xml.find("sldSz").unwrap());

        let slide_rels = package.rels_for(&first).unwrap();
        let layout_rel = slide_rels.first_of(RT::SLIDE_LAYOUT).unwrap();
        assert_eq!(slide_rels.target_partname(layout_rel).unwrap(), *layout.partname());
        let notes_rel = slide_rels.first_of(RT::NOTES_SLIDE).unwrap();
        let notes = slide_rels.target_partname(notes_rel).unwrap();
        assert!(package.contains(&notes));
        assert!(package.rels_for(&second).unwrap().first_of(RT::NOTES_SLIDE).is_err());

        let types = package.content_types().unwrap();
        assert_eq!(types.get(&first), Some(CT::PML_SLIDE));
        assert_eq!(types.get(&notes), Some(CT::PML_NOTES_SLIDE));
    }

    #[test]
    fn test_slide_xml_copies_layout_placeholders() {
        let template = template(false, 0);
        let layout = find_slide_layout_by_name(&template, "Title and Content").unwrap();
        let body = find_content_placeholder(layout).unwrap();

        let mut writer = PresentationWriter::new(&template).unwrap();
        let slide = writer.add_slide(layout, "R&D <2024>", Some((body, "line one\n\nline two")), "ignored").unwrap();
        let package = writer.to_package().unwrap();
        let xml = String::from_utf8(package.part(&slide).unwrap().to_vec()).unwrap();

        assert!(xml.contains(r#"<p:ph type="title"/>"#));
        assert!(xml.contains(r#"<p:ph idx="1"/>"#));
        assert!(xml.contains("<a:t>R&amp;D &lt;2024&gt;</a:t>"));
        assert_eq!(xml.matches("<a:p>").count(), 4);
        // No notes master in this template
        assert!(!package.partnames().any(|p| p.as_str().starts_with("/ppt/notesSlides/")));
    }

    #[test]
    fn test_layout_without_title_drops_title() {
        let bytes = fixtures::template(&[FixtureLayout::new("Blank", &[])], false, 0);
        let template = Template::from_bytes(&bytes).unwrap();
        let mut writer = PresentationWriter::new(&template).unwrap();
        let slide = writer.add_slide(&template.layouts()[0], "Lost title", None, "").unwrap();

        let package = writer.to_package().unwrap();
        let xml = String::from_utf8(package.part(&slide).unwrap().to_vec()).unwrap();
        assert!(!xml.contains("Lost title"));
        assert!(!xml.contains("<p:sp>"));
    }

    #[test]
    fn test_rewrite_declares_missing_prefix() {
        let xml = br#"<presentation xmlns="http://schemas.openxmlformats.org/presentationml/2006/main"><sldMasterIdLst/><sldSz cx="1" cy="1"/></presentation>"#;
        let out = rewrite_slide_list(xml, &[(256, "rId7".to_string())]).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            format!(
                r#"<presentation xmlns="http://schemas.openxmlformats.org/presentationml/2006/main"><sldMasterIdLst/><sldIdLst xmlns:r="{}"><sldId id="256" r:id="rId7"/></sldIdLst><sldSz cx="1" cy="1"/></presentation>"#,
                NS::OFC_RELATIONSHIPS
            )
        );
    }

    #[test]
    fn test_rewrite_replaces_existing_list() {
        let xml = format!(
            r#"<p:presentation xmlns:p="{}" xmlns:rel="{}"><p:sldIdLst><p:sldId id="300" rel:id="rId2"/></p:sldIdLst></p:presentation>"#,
            NS::PML_MAIN,
            NS::OFC_RELATIONSHIPS
        );
        let out = String::from_utf8(rewrite_slide_list(xml.as_bytes(), &[(256, "rId5".to_string())]).unwrap()).unwrap();
        assert!(out.contains(r#"<p:sldIdLst><p:sldId id="256" rel:id="rId5"/></p:sldIdLst></p:presentation>"#));
        assert!(!out.contains("300"));
    }
}
