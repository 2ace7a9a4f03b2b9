//! A small owned XML tree built on top of `quick-xml`.
//!
//! Course documents are read in full and checked for well-formedness before
//! any node is created. Comments, processing instructions and whitespace-only
//! text are dropped, mirroring how the course content is authored.

use std::fmt::Write as _;

use quick_xml::{
    Reader,
    escape::escape,
    events::{BytesStart, Event},
};

/// The deepest element nesting [`parse_document`] accepts. The root element is
/// at depth 1.
pub const MAX_DEPTH: usize = 256;

/// A node in an XML tree: either an element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A nested element.
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
}

/// An XML element with its attributes (in document order) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an empty element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing any existing value in place.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// All child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Child elements in document order, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Removes and returns the child elements, leaving any text in place.
    pub fn take_child_elements(&mut self) -> Vec<Self> {
        let (elements, text): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|child| matches!(child, XmlNode::Element(_)));
        self.children = text;

        elements
            .into_iter()
            .filter_map(|child| match child {
                XmlNode::Element(element) => Some(element),
                XmlNode::Text(_) => None,
            })
            .collect()
    }

    /// The concatenated text directly inside this element.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Serialises the children of this element.
    #[must_use]
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(&mut out, child);
        }
        out
    }

    /// Serialises this element, including its own tag.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

fn write_node(out: &mut String, node: &XmlNode) {
    match node {
        XmlNode::Element(element) => write_element(out, element),
        XmlNode::Text(text) => out.push_str(&escape(text.as_str())),
    }
}

fn write_element(out: &mut String, element: &XmlElement) {
    out.push('<');
    out.push_str(&element.tag);
    for (key, value) in &element.attributes {
        // writing to a String cannot fail
        let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", element.tag);
}

/// The document is not well-formed XML.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("malformed XML at byte {position}: {message}")]
pub struct XmlError {
    /// Byte offset in the input where the problem was detected.
    pub position: u64,
    /// Description of the problem.
    pub message: String,
}

impl XmlError {
    fn at(reader: &Reader<&[u8]>, message: impl Into<String>) -> Self {
        Self {
            position: reader.buffer_position().try_into().unwrap_or(u64::MAX),
            message: message.into(),
        }
    }
}

/// Parses a complete XML document into its root element.
///
/// # Errors
///
/// Returns an [`XmlError`] if the input is not a single well-formed element:
/// mismatched or unclosed tags, bad attributes, text or a second element
/// outside the root, no root at all, or elements nested deeper than
/// [`MAX_DEPTH`].
pub fn parse_document(text: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::at(&reader, e.to_string()))?;

        match event {
            Event::Start(start) => {
                check_depth(&reader, &stack)?;
                let element = element_from_start(&reader, &start)?;
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::at(&reader, "more than one root element"));
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                check_depth(&reader, &stack)?;
                let element = element_from_start(&reader, &start)?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::at(&reader, "unexpected closing tag"))?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|e| XmlError::at(&reader, e.to_string()))?;
                push_text(&reader, &mut stack, &content)?;
            }
            Event::CData(content) => {
                let content = String::from_utf8_lossy(&content).into_owned();
                push_text(&reader, &mut stack, &content)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::at(
            &reader,
            format!("unclosed element <{}>", open.tag),
        ));
    }

    root.ok_or_else(|| XmlError::at(&reader, "no root element"))
}

fn check_depth(reader: &Reader<&[u8]>, stack: &[XmlElement]) -> Result<(), XmlError> {
    if stack.len() >= MAX_DEPTH {
        return Err(XmlError::at(
            reader,
            format!("elements nested deeper than {MAX_DEPTH} levels"),
        ));
    }
    Ok(())
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, XmlError> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| XmlError::at(reader, format!("invalid tag name: {e}")))?
        .to_string();

    let mut element = XmlElement::new(tag);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::at(reader, e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| XmlError::at(reader, format!("invalid attribute name: {e}")))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::at(reader, e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    reader: &Reader<&[u8]>,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(XmlError::at(reader, "more than one root element"));
    }
    Ok(())
}

fn push_text(
    reader: &Reader<&[u8]>,
    stack: &mut [XmlElement],
    content: &str,
) -> Result<(), XmlError> {
    if content.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(content.to_string()));
            Ok(())
        }
        None => Err(XmlError::at(reader, "text outside the root element")),
    }
}
