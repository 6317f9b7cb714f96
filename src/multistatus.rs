//! PROPFIND multistatus generation.
//!
//! The whole document is built in memory and only handed out on
//! success; if the directory walk fails halfway, the partial document
//! is dropped and the caller answers 500 instead.

use std::time::SystemTime;

use bytes::Bytes;
use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::rootfs::{entity_tag, ResourceMeta};
use crate::util::{systemtime_to_httpdate, MemBuffer};
use crate::DavResult;

// every addressed resource reports success; per-resource failure is
// not modeled (a broken walk fails the whole response).
const STATUS_OK: &str = "HTTP/1.1 200 OK";

pub(crate) struct MultistatusWriter {
    xml: EventWriter<MemBuffer>,
}

impl MultistatusWriter {
    pub fn new() -> DavResult<MultistatusWriter> {
        let mut xml = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(MemBuffer::new());
        xml.write(XmlEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        })?;
        xml.write(XmlEvent::start_element("d:multistatus").ns("d", "DAV:"))?;
        Ok(MultistatusWriter { xml })
    }

    /// One `<d:response>` for a collection.
    pub fn collection_response(&mut self, href: &str, modified: SystemTime) -> DavResult<()> {
        self.xml.write(XmlEvent::start_element("d:response"))?;
        self.text_element("d:href", href)?;
        self.xml.write(XmlEvent::start_element("d:propstat"))?;
        self.xml.write(XmlEvent::start_element("d:prop"))?;

        self.xml.write(XmlEvent::start_element("d:resourcetype"))?;
        self.empty_element("d:collection")?;
        self.xml.write(XmlEvent::end_element())?;
        self.text_element("d:getlastmodified", &systemtime_to_httpdate(modified))?;
        self.empty_element("d:displayname")?;

        self.xml.write(XmlEvent::end_element())?; // d:prop
        self.text_element("d:status", STATUS_OK)?;
        self.xml.write(XmlEvent::end_element())?; // d:propstat
        self.xml.write(XmlEvent::end_element())?; // d:response
        Ok(())
    }

    /// One `<d:response>` for a file.
    pub fn file_response(&mut self, href: &str, meta: &ResourceMeta) -> DavResult<()> {
        self.xml.write(XmlEvent::start_element("d:response"))?;
        self.text_element("d:href", href)?;
        self.xml.write(XmlEvent::start_element("d:propstat"))?;
        self.xml.write(XmlEvent::start_element("d:prop"))?;

        self.empty_element("d:resourcetype")?;
        self.text_element("d:getcontentlength", &meta.len.to_string())?;
        let tag = entity_tag(meta.modified, href);
        self.text_element("d:getetag", &format!("\"{}\"", tag))?;
        self.text_element("d:getcontenttype", "application/octet-stream")?;
        self.empty_element("d:displayname")?;
        self.text_element("d:getlastmodified", &systemtime_to_httpdate(meta.modified))?;

        self.xml.write(XmlEvent::end_element())?; // d:prop
        self.text_element("d:status", STATUS_OK)?;
        self.xml.write(XmlEvent::end_element())?; // d:propstat
        self.xml.write(XmlEvent::end_element())?; // d:response
        Ok(())
    }

    /// Close the envelope and hand out the document.
    pub fn finish(mut self) -> DavResult<Bytes> {
        self.xml.write(XmlEvent::end_element())?; // d:multistatus
        Ok(self.xml.into_inner().take())
    }

    fn text_element(&mut self, name: &str, text: &str) -> DavResult<()> {
        self.xml.write(XmlEvent::start_element(name))?;
        self.xml.write(XmlEvent::characters(text))?;
        self.xml.write(XmlEvent::end_element())?;
        Ok(())
    }

    fn empty_element(&mut self, name: &str) -> DavResult<()> {
        self.xml.write(XmlEvent::start_element(name))?;
        self.xml.write(XmlEvent::end_element())?;
        Ok(())
    }
}
