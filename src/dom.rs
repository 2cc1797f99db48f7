//! Owned XML element tree built from quick-xml events.
//!
//! The tree is read-only once built, apart from the one-off
//! [`Document::strip_namespaces`] normalization applied before wrapping.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use quick_xml::Reader;
use quick_xml::encoding::detect_encoding;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};

use crate::error::{ReaderError, Result};
use crate::options::ReadOptions;

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    /// Short name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Text(_) => "text",
            Self::Comment(_) => "comment",
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An XML element with its attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.name
    }

    /// Look up an attribute on this element (not its descendants).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Leading text content: the text and CDATA before the first child
    /// element or comment. Text after a child is not included.
    pub fn text(&self) -> &str {
        match self.children.first() {
            Some(Node::Text(t)) => t,
            _ => "",
        }
    }

    /// First element reachable by a `/`-separated path of child tags.
    ///
    /// `*` matches any tag and `.` stays on the current element.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let steps: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        find_path(self, &steps)
    }

    /// Text of the element at `path`. A matching element without text
    /// yields `Some("")`; no match yields `None`.
    pub fn findtext(&self, path: &str) -> Option<&str> {
        self.find(path).map(Element::text)
    }

    /// Every element below this one, in document order (pre-order).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    pub fn descendants_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.descendants().filter(move |e| e.name == tag)
    }

    /// Remove namespace prefixes from this element and every element
    /// below it, and drop namespace declarations and `xsi` annotations.
    pub fn strip_namespaces(&mut self) {
        let mut pending: Vec<&mut Element> = vec![self];
        while let Some(elem) = pending.pop() {
            let local = elem.name.rsplit_once(':').map(|(_, l)| l.to_string());
            if let Some(local) = local {
                elem.name = local;
            }
            elem.attributes.retain(|(key, _)| !is_namespace_annotation(key));
            pending.extend(elem.children.iter_mut().filter_map(Node::as_element_mut));
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

fn find_path<'a>(elem: &'a Element, steps: &[&str]) -> Option<&'a Element> {
    let Some((first, rest)) = steps.split_first() else {
        return Some(elem);
    };
    if *first == "." {
        return find_path(elem, rest);
    }
    elem.child_elements()
        .filter(|child| *first == "*" || child.name == *first)
        .find_map(|child| find_path(child, rest))
}

fn is_namespace_annotation(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:") || key == "xsi:type" || key == "xsi:nil"
}

/// Pre-order iterator over the elements below a starting element.
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(Node::Element(e)) => {
                    self.stack.push(e.children.iter());
                    return Some(e);
                }
                Some(_) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// A parsed XML document with exactly one root element.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse document text. The text is already decoded, so any
    /// `encoding` in the XML declaration is ignored.
    pub fn parse_str(xml: &str, options: &ReadOptions) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.trim_text(options.trim_text);
        config.check_end_names = options.check_end_names;

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut entities = Entities::default();
        let mut element_count = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    element_count += 1;
                    stack.push(start_element(&e, &entities)?);
                }
                Ok(Event::Empty(e)) => {
                    element_count += 1;
                    close_element(start_element(&e, &entities)?, &mut stack, &mut root)?;
                }
                Ok(Event::End(_)) => {
                    if let Some(elem) = stack.pop() {
                        close_element(elem, &mut stack, &mut root)?;
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(current) = stack.last_mut() {
                        // Character references (&#60; &#x3C;)
                        if let Ok(Some(ch)) = e.resolve_char_ref() {
                            current.push_text(ch.encode_utf8(&mut [0u8; 4]));
                        } else {
                            let name = std::str::from_utf8(e.as_ref())?;
                            current.push_text(entities.resolve(name));
                        }
                    }
                }
                Ok(Event::Comment(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = std::str::from_utf8(e.as_ref())?;
                        current.children.push(Node::Comment(text.to_string()));
                    }
                }
                Ok(Event::DocType(e)) => {
                    entities.declare(std::str::from_utf8(e.as_ref())?);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ReaderError::XmlParse(e)),
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ReaderError::UnclosedElement(open.name));
        }
        let root = root.ok_or(ReaderError::NoRootElement)?;
        tracing::debug!(root = %root.name, elements = element_count, "Parsed XML document");
        Ok(Self { root })
    }

    /// Parse raw document bytes, decoding them first according to the
    /// byte order mark or the `encoding` of the XML declaration.
    /// Undeclared documents are read as UTF-8.
    pub fn parse_bytes(bytes: &[u8], options: &ReadOptions) -> Result<Self> {
        Self::parse_str(&decode_document(bytes)?, options)
    }

    /// Parse a document from any byte source.
    pub fn parse_reader<R: Read>(mut source: R, options: &ReadOptions) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Self::parse_bytes(&bytes, options)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    pub fn strip_namespaces(&mut self) {
        self.root.strip_namespaces();
    }
}

/// Decode `bytes` to UTF-8 text.
fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, bom_len) = match detect_encoding(bytes) {
        Some((encoding, bom_len)) if encoding != UTF_8 || bom_len > 0 => (encoding, bom_len),
        _ => (declared_encoding(bytes)?.unwrap_or(UTF_8), 0),
    };
    let body = &bytes[bom_len..];
    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(std::str::from_utf8(body)?));
    }
    tracing::trace!(encoding = encoding.name(), "Decoding document");
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or(ReaderError::Decode {
            encoding: encoding.name(),
        })
}

/// Encoding named by the XML declaration of an ASCII-compatible document.
///
/// A 16-bit label on 8-bit content names the encoding the text was
/// converted from, so it reads as `None`.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>> {
    let mut reader = Reader::from_reader(bytes);
    let Ok(Event::Decl(decl)) = reader.read_event() else {
        return Ok(None);
    };
    let Some(Ok(label)) = decl.encoding() else {
        return Ok(None);
    };
    match Encoding::for_label(&label) {
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => Ok(None),
        Some(encoding) => Ok(Some(encoding)),
        None => Err(ReaderError::UnknownEncoding(
            String::from_utf8_lossy(&label).into_owned(),
        )),
    }
}

/// General entities: the predefined five plus those declared in the
/// internal DTD subset. References to anything else expand to nothing,
/// in text and attribute values alike.
#[derive(Debug, Default)]
struct Entities {
    declared: HashMap<String, String>,
}

impl Entities {
    /// Record the `<!ENTITY name "value">` declarations of a DOCTYPE.
    /// Parameter and external entities are ignored.
    fn declare(&mut self, doctype: &str) {
        let mut rest = doctype;
        while let Some(start) = rest.find("<!ENTITY") {
            rest = rest[start + "<!ENTITY".len()..].trim_start();
            if rest.starts_with('%') {
                continue;
            }
            let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let (name, tail) = rest.split_at(name_end);
            let tail = tail.trim_start();
            let Some(quote) = tail.chars().next().filter(|c| *c == '"' || *c == '\'') else {
                rest = tail;
                continue;
            };
            let Some(len) = tail[1..].find(quote) else {
                break;
            };
            let raw = &tail[1..1 + len];
            let value = unescape_with(raw, resolve_predefined_entity)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            self.declared.entry(name.to_string()).or_insert(value);
            rest = &tail[len + 2..];
        }
    }

    fn resolve(&self, name: &str) -> &str {
        if let Some(value) = resolve_predefined_entity(name) {
            return value;
        }
        match self.declared.get(name) {
            Some(value) => value.as_str(),
            None => {
                tracing::trace!(entity = name, "Skipping unknown entity");
                ""
            }
        }
    }
}

fn start_element(e: &BytesStart<'_>, entities: &Entities) -> Result<Element> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ReaderError::XmlParse(e.into()))?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape_with(raw, |name| Some(entities.resolve(name)))?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn close_element(elem: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(elem));
    } else if let Some(first) = root.as_ref() {
        return Err(ReaderError::MultipleRootElements {
            first: first.name.clone(),
            extra: elem.name,
        });
    } else {
        *root = Some(elem);
    }
    Ok(())
}
