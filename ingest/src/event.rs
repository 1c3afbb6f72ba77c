//! XML event stream.
//!
//! Wraps the `quick-xml` pull reader and reduces its output to the four
//! events the tree builder cares about. Declarations, comments, processing
//! instructions and doctypes are skipped; self-closing tags are expanded
//! into a start and an end; element attributes are not part of the model.

use std::io::BufRead;

use quick_xml::events::Event as XmlEvent;
use quick_xml::reader::Reader;

use crate::error::{IngestError, Result};

/// A parsing event, with names reduced to their local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartElement(String),
    EndElement(String),
    /// Entity-decoded character data; CDATA sections included.
    CharacterData(String),
    EndOfInput,
}

/// Pull reader producing [`Event`]s from a byte stream.
pub struct EventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        config.check_end_names = true;
        Self {
            reader,
            buf: Vec::with_capacity(8192),
        }
    }

    /// Byte offset of the reader in the input.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Reads the next relevant event.
    ///
    /// After [`Event::EndOfInput`] has been returned, further calls keep
    /// returning it.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ReadInput`] on I/O, syntax, or decoding errors.
    pub fn next_event(&mut self) -> Result<Event> {
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| IngestError::read(self.reader.buffer_position() as u64, e))?;

            let position = self.reader.buffer_position() as u64;
            return match event {
                XmlEvent::Start(start) => Ok(Event::StartElement(
                    String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                )),
                XmlEvent::End(end) => Ok(Event::EndElement(
                    String::from_utf8_lossy(end.local_name().as_ref()).into_owned(),
                )),
                XmlEvent::Text(text) => {
                    let text = text.unescape().map_err(|e| IngestError::read(position, e))?;
                    Ok(Event::CharacterData(text.into_owned()))
                }
                XmlEvent::CData(cdata) => Ok(Event::CharacterData(
                    String::from_utf8_lossy(&cdata.into_inner()).into_owned(),
                )),
                XmlEvent::Eof => Ok(Event::EndOfInput),
                // expand_empty_elements turns these into Start/End pairs
                XmlEvent::Empty(_)
                | XmlEvent::Comment(_)
                | XmlEvent::Decl(_)
                | XmlEvent::PI(_)
                | XmlEvent::DocType(_) => continue,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<Event> {
        let mut reader = EventReader::new(xml.as_bytes());
        let mut events = Vec::new();
        loop {
            let event = reader.next_event().unwrap();
            let done = event == Event::EndOfInput;
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[test]
    fn test_basic_sequence() {
        let events = collect("<?xml version=\"1.0\"?><a><b>x</b></a>");
        assert_eq!(
            events,
            vec![
                Event::StartElement("a".into()),
                Event::StartElement("b".into()),
                Event::CharacterData("x".into()),
                Event::EndElement("b".into()),
                Event::EndElement("a".into()),
                Event::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_local_names_strip_prefix() {
        let events = collect(r#"<env:a xmlns:env="urn:x"><env:b/></env:a>"#);
        assert_eq!(events[0], Event::StartElement("a".into()));
        assert_eq!(events[1], Event::StartElement("b".into()));
        assert_eq!(events[2], Event::EndElement("b".into()));
        assert_eq!(events[3], Event::EndElement("a".into()));
    }

    #[test]
    fn test_entities_and_cdata_decoded() {
        let events = collect("<a>Fish &amp; chips<![CDATA[<raw>]]></a>");
        assert_eq!(events[1], Event::CharacterData("Fish & chips".into()));
        assert_eq!(events[2], Event::CharacterData("<raw>".into()));
    }

    #[test]
    fn test_comments_skipped() {
        let events = collect("<a><!-- note --></a>");
        assert_eq!(
            events,
            vec![
                Event::StartElement("a".into()),
                Event::EndElement("a".into()),
                Event::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_mismatched_end_tag_is_read_error() {
        let mut reader = EventReader::new("<a><b></a>".as_bytes());
        let mut result = Ok(Event::EndOfInput);
        for _ in 0..4 {
            result = reader.next_event();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(IngestError::ReadInput { .. })));
    }
}
