//! The `[Content_Types].xml` part.

use crate::opc::constants::namespace;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use crate::xml::{attr, escape_xml};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;

/// Extension defaults and per-part overrides, in document order.
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parse `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) = (attr(e, b"Extension")?, attr(e, b"ContentType")?) {
                            map.defaults.push((ext.to_lowercase(), ct));
                        }
                    },
                    b"Override" => {
                        if let (Some(name), Some(ct)) = (attr(e, b"PartName")?, attr(e, b"ContentType")?) {
                            map.overrides.push((name, ct));
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::Xml(format!("Content types parse error: {}", e)));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Serialize back to XML, defaults first.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + (self.defaults.len() + self.overrides.len()) * 120);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES);
        for (ext, ct) in &self.defaults {
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            );
        }
        for (name, ct) in &self.overrides {
            let _ = write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(name),
                escape_xml(ct)
            );
        }
        xml.push_str("</Types>");
        xml
    }

    /// Content type of a part: its override, else its extension default.
    pub fn get(&self, partname: &PackURI) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name == partname.as_str())
            .or_else(|| {
                let ext = partname.ext().to_lowercase();
                self.defaults.iter().find(|(e, _)| *e == ext)
            })
            .map(|(_, ct)| ct.as_str())
    }

    /// Register an override, replacing any existing one for the part.
    pub fn set_override(&mut self, partname: &PackURI, content_type: &str) {
        self.remove_override(partname);
        self.overrides
            .push((partname.as_str().to_string(), content_type.to_string()));
    }

    /// Drop the override of a part, if any.
    pub fn remove_override(&mut self, partname: &PackURI) {
        self.overrides.retain(|(name, _)| name != partname.as_str());
    }

    /// Whether the part has an explicit override.
    pub fn has_override(&self, partname: &PackURI) -> bool {
        self.overrides.iter().any(|(name, _)| name == partname.as_str())
    }
}
