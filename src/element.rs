//! In-memory XML element tree.
//!
//! Both engines work purely on [`Element`]: a tag name, an ordered attribute
//! list, an ordered child list and optional text. Reading and writing XML text
//! goes through `quick-xml`; nothing here streams, the whole document is held
//! in memory.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

/// A single XML element and everything beneath it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

/// Rendering options for [`Element::to_xml_string`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Indent nested elements by this many spaces; `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Emit an `<?xml version="1.0" encoding="UTF-8"?>` declaration first.
    pub declaration: bool,
}

impl WriteOptions {
    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Value of the attribute called `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing one in place so order is kept.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// The element's own text, or `""` when it has none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Immediate children called `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Every element below this one, pre-order (document order), excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Descendants called `name`, in document order, at any depth.
    pub fn descendants_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |el| el.name == name)
    }

    /// The first descendant called `name` in document order.
    pub fn first_descendant(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|el| el.name == name)
    }

    // ── Text I/O ───────────────────────────────────────────────────────────

    /// Parse an XML document and return its root element.
    pub fn parse_str(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        // Whitespace-only runs between children are dropped when an element
        // closes; trimming here would also eat the spaces around entity
        // references and the text of whitespace-only leaves.
        reader.config_mut().trim_text(false);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => open.push(open_element(&start)?),
                Event::Empty(start) => {
                    let element = open_element(&start)?;
                    close_element(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    close_element(&mut open, &mut root, element)?;
                }
                Event::Text(text) => push_text(&mut open, utf8(&text)?),
                Event::CData(data) => push_text(&mut open, utf8(&data)?),
                Event::GeneralRef(reference) => {
                    let resolved = resolve_reference(utf8(&reference)?)?;
                    push_text(&mut open, &resolved);
                }
                Event::Eof => break,
                // Comments, declarations, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(Error::Xml(format!("unclosed element <{}>", unclosed.name)));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// Parse an XML document from raw bytes (must be UTF-8).
    pub fn parse_bytes(xml: &[u8]) -> Result<Element> {
        let xml = std::str::from_utf8(xml).map_err(|e| Error::Xml(format!("invalid UTF-8: {}", e)))?;
        Element::parse_str(xml)
    }

    /// Render this element (and its subtree) as XML text.
    pub fn to_xml_string(&self, options: &WriteOptions) -> Result<String> {
        let mut writer = match options.indent {
            Some(spaces) => Writer::new_with_indent(Vec::new(), b' ', spaces),
            None => Writer::new(Vec::new()),
        };
        if options.declaration {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    fn write_into<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let text = self.text.as_deref().filter(|t| !t.is_empty());
        if text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Pre-order iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

// ── Parse helpers ──────────────────────────────────────────────────────────

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(format!("invalid UTF-8: {}", e)))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("malformed attribute: {}", e)))?;
        let key = utf8(attr.key.as_ref())?;
        let value = quick_xml::escape::unescape(utf8(&attr.value)?)
            .map_err(|e| Error::Xml(format!("attribute `{}`: {}", key, e)))?;
        element.attributes.push((key.to_string(), value.into_owned()));
    }
    Ok(element)
}

fn close_element(open: &mut Vec<Element>, root: &mut Option<Element>, mut element: Element) -> Result<()> {
    // Indentation between child elements is not content; a leaf keeps its text as is.
    if !element.children.is_empty() && element.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        element.text = None;
    }
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Xml("document has more than one root element".to_string())),
    }
    Ok(())
}

fn push_text(open: &mut [Element], text: &str) {
    // Text outside the root (whitespace between prolog items) is ignored.
    if let Some(current) = open.last_mut() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn resolve_reference(name: &str) -> Result<String> {
    let resolved = match name.strip_prefix('#') {
        Some(code) => {
            let point = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            point.and_then(char::from_u32).map(String::from)
        }
        None => match name {
            "amp" => Some("&".to_string()),
            "lt" => Some("<".to_string()),
            "gt" => Some(">".to_string()),
            "quot" => Some("\"".to_string()),
            "apos" => Some("'".to_string()),
            _ => None,
        },
    };
    resolved.ok_or_else(|| Error::Xml(format!("unknown entity reference &{};", name)))
}
