//! XML parsing utilities for the Office Open XML parts of a workbook
//! Provides an event reader wrapper, attribute helpers and text extraction

use crate::error::RustyTablesError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Loops over the events of an [`XmlReader`], ignoring events no arm matches
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

pub(crate) use match_xml_events;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute '{0}' with value '{1}' failed")]
    ParseAttributeValueError(String, String),
}

/// XML reader wrapper configured for spreadsheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true; // <c/> arrives as Start + End
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustyTablesError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RustyTablesError::XmlError(error)),
        }
    }

    /// Collects the text content up to the closing `end_tag`.
    ///
    /// Text is only collected inside `<t>` elements unless `is_text_content` is set,
    /// and phonetic runs (`<rPh>`) are skipped.
    pub(crate) fn read_text(&mut self, end_tag: QName, is_text_content: bool) -> Result<String, RustyTablesError> {
        const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
        const TAG_TEXT: QName = QName(b"t");

        let mut is_phonetic_text = false;
        let mut is_text = is_text_content;
        let mut text = String::new();
        match_xml_events!(self => {
            Event::End(event) if event.name() == end_tag => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
            Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
            Event::Text(event) if is_text && !is_phonetic_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if is_text && !is_phonetic_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if is_text && !is_phonetic_text => push_reference(&mut text, &event)?,
        });
        Ok(text)
    }
}

/// Attribute access on element start events
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets the unescaped attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyTablesError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, RustyTablesError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyTablesError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, RustyTablesError> {
        match self.get_attribute_value(name)? {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| XmlError::ParseAttributeValueError(name.to_owned(), value.to_string()).into()),
            None => Ok(None),
        }
    }
}

/// Appends an entity or character reference (`&amp;`, `&#10;`, `&#x41;`) to `text`
fn push_reference(text: &mut String, bytes: &BytesRef) -> Result<(), RustyTablesError> {
    let raw = bytes.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16)?,
            None => number.parse::<u32>()?,
        };
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        Err(XmlError::ParseEntityError(raw.to_string()))?;
    }
    Ok(())
}
