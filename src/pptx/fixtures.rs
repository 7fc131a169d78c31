//! Small packages assembled with the zip crate for tests.

use crate::xml::escape_xml;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(crate) struct FixtureLayout {
    name: Option<&'static str>,
    placeholders: Vec<Option<&'static str>>,
}

impl FixtureLayout {
    /// A named layout with one placeholder per entry (`None` = untyped body).
    pub(crate) fn new(name: &'static str, placeholders: &[Option<&'static str>]) -> Self {
        Self {
            name: Some(name),
            placeholders: placeholders.to_vec(),
        }
    }

    pub(crate) fn unnamed(placeholders: &[Option<&'static str>]) -> Self {
        Self {
            name: None,
            placeholders: placeholders.to_vec(),
        }
    }
}

/// The layouts most tests need.
pub(crate) fn standard_layouts() -> Vec<FixtureLayout> {
    vec![
        FixtureLayout::new("Title Slide", &[Some("ctrTitle"), Some("subTitle")]),
        FixtureLayout::new("Title and Content", &[Some("title"), None, Some("dt")]),
        FixtureLayout::new("Two Content", &[Some("title"), None, None]),
        FixtureLayout::new("Title Only", &[Some("title")]),
    ]
}

pub(crate) fn layout_xml(name: Option<&str>, placeholders: &[Option<&str>]) -> String {
    let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {}>"#, NS);
    match name {
        Some(name) => write!(xml, r#"<p:cSld name="{}">"#, escape_xml(name)).unwrap(),
        None => xml.push_str("<p:cSld>"),
    }
    xml.push_str(r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#);
    for (i, ph_type) in placeholders.iter().enumerate() {
        let type_attr = ph_type.map(|t| format!(r#" type="{}""#, t)).unwrap_or_default();
        write!(
            xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="Placeholder {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph{} idx="{}"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
            i + 2,
            i + 1,
            type_attr,
            i
        )
        .unwrap();
    }
    xml.push_str("</p:spTree></p:cSld></p:sldLayout>");
    xml
}

fn rels(entries: &[(String, &str, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, reltype, target) in entries {
        write!(xml, r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#, id, REL, reltype, target).unwrap();
    }
    xml.push_str("</Relationships>");
    xml
}

fn old_slide_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        NS, title
    )
}

/// A template with the given layouts under one master, an optional notes
/// master, and `slides` existing slides (the first with a notes slide).
pub(crate) fn template(layouts: &[FixtureLayout], notes_master: bool, slides: usize) -> Vec<u8> {
    let mut parts: Vec<(String, String)> = Vec::new();

    let mut types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
    );
    let mut add_override = |partname: &str, kind: &str| {
        write!(types, r#"<Override PartName="{}" ContentType="{}.{}+xml"/>"#, partname, PML, kind).unwrap();
    };
    add_override("/ppt/presentation.xml", "presentation.main");
    add_override("/ppt/slideMasters/slideMaster1.xml", "slideMaster");
    for i in 1..=layouts.len() {
        add_override(&format!("/ppt/slideLayouts/slideLayout{}.xml", i), "slideLayout");
    }
    if notes_master {
        add_override("/ppt/notesMasters/notesMaster1.xml", "notesMaster");
    }
    for i in 1..=slides {
        add_override(&format!("/ppt/slides/slide{}.xml", i), "slide");
    }
    if notes_master && slides > 0 {
        add_override("/ppt/notesSlides/notesSlide1.xml", "notesSlide");
    }
    types.push_str("</Types>");
    parts.push(("[Content_Types].xml".into(), types));

    parts.push((
        "_rels/.rels".into(),
        rels(&[("rId1".into(), "officeDocument", "ppt/presentation.xml".into())]),
    ));

    // presentation.xml and its relationships
    let mut pres = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
        NS
    );
    let mut pres_rels = vec![("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string())];
    if notes_master {
        pres.push_str(r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst>"#);
        pres_rels.push(("rId2".into(), "notesMaster", "notesMasters/notesMaster1.xml".into()));
    }
    if slides > 0 {
        pres.push_str("<p:sldIdLst>");
        for i in 1..=slides {
            write!(pres, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, 9 + i).unwrap();
            pres_rels.push((format!("rId{}", 9 + i), "slide", format!("slides/slide{}.xml", i)));
        }
        pres.push_str("</p:sldIdLst>");
    }
    pres.push_str(r#"<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#);
    parts.push(("ppt/presentation.xml".into(), pres));
    parts.push(("ppt/_rels/presentation.xml.rels".into(), rels(&pres_rels)));

    // Master and layouts
    let mut master = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst>"#,
        NS
    );
    let mut master_rels = Vec::new();
    for (i, layout) in layouts.iter().enumerate() {
        write!(master, r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483649usize + i, i + 1).unwrap();
        master_rels.push((
            format!("rId{}", i + 1),
            "slideLayout",
            format!("../slideLayouts/slideLayout{}.xml", i + 1),
        ));
        parts.push((
            format!("ppt/slideLayouts/slideLayout{}.xml", i + 1),
            layout_xml(layout.name, &layout.placeholders),
        ));
        parts.push((
            format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
            rels(&[("rId1".into(), "slideMaster", "../slideMasters/slideMaster1.xml".into())]),
        ));
    }
    master.push_str("</p:sldLayoutIdLst></p:sldMaster>");
    parts.push(("ppt/slideMasters/slideMaster1.xml".into(), master));
    parts.push(("ppt/slideMasters/_rels/slideMaster1.xml.rels".into(), rels(&master_rels)));

    if notes_master {
        parts.push((
            "ppt/notesMasters/notesMaster1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notesMaster {}><p:cSld><p:spTree/></p:cSld></p:notesMaster>"#,
                NS
            ),
        ));
    }

    for i in 1..=slides {
        parts.push((format!("ppt/slides/slide{}.xml", i), old_slide_xml(&format!("Old slide {}", i))));
        let mut slide_rels = vec![("rId1".to_string(), "slideLayout", "../slideLayouts/slideLayout1.xml".to_string())];
        if notes_master && i == 1 {
            slide_rels.push(("rId2".into(), "notesSlide", "../notesSlides/notesSlide1.xml".into()));
        }
        parts.push((format!("ppt/slides/_rels/slide{}.xml.rels", i), rels(&slide_rels)));
    }
    if notes_master && slides > 0 {
        parts.push((
            "ppt/notesSlides/notesSlide1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notes {}><p:cSld><p:spTree/></p:cSld></p:notes>"#,
                NS
            ),
        ));
        parts.push((
            "ppt/notesSlides/_rels/notesSlide1.xml.rels".into(),
            rels(&[
                ("rId1".into(), "notesMaster", "../notesMasters/notesMaster1.xml".into()),
                ("rId2".into(), "slide", "../slides/slide1.xml".into()),
            ]),
        ));
    }

    zip_parts(&parts)
}

/// A Word document with one paragraph per entry.
pub(crate) fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for paragraph in paragraphs {
        write!(body, "<w:p><w:r><w:t>{}</w:t></w:r></w:p>", escape_xml(paragraph)).unwrap();
    }
    let parts = vec![
        (
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels".to_string(),
            rels(&[("rId1".into(), "officeDocument", "word/document.xml".into())]),
        ),
        (
            "word/document.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                body
            ),
        ),
    ];
    zip_parts(&parts)
}

fn zip_parts(parts: &[(String, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
