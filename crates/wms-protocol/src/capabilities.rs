//! Read-only navigation over a parsed WMS capabilities document.
//!
//! The document is parsed once into an owned element tree. Element names are
//! stored by their local part, so `sld:GetLegendGraphic` and
//! `GetLegendGraphic` are the same element to every lookup here. Absence is
//! never an error: lookups return `None` or an empty string and the caller
//! decides on a default.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{CapabilityError, CapabilityResult};

const CAPABILITIES_ROOT: &str = "WMS_Capabilities";
const EXCEPTION_ROOT: &str = "ServiceExceptionReport";

/// One XML element with its attributes, text content and child elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Local element name (namespace prefix stripped).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content of this element, empty if it has none.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Direct child elements in document order.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a slash-separated path of local names, e.g. `"Service/KeywordList"`.
    ///
    /// Each step picks the first direct child with that name.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |node, part| node.child(part))
    }

    /// Text content at `path`, or an empty string if the path does not resolve.
    pub fn value(&self, path: &str) -> &str {
        self.find(path).map(Element::text).unwrap_or("")
    }

    /// Text content at `path`, `None` if missing or empty.
    pub fn non_empty_value(&self, path: &str) -> Option<&str> {
        Some(self.value(path)).filter(|v| !v.is_empty())
    }

    /// Attribute value by name.
    ///
    /// `name` matches either the full qualified key (`xlink:href`) or its
    /// local part (`href`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name || local_part(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// Boolean attribute: `Some(true)` for `"1"`/`"true"`, `Some(false)` for
    /// any other value, `None` when absent.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.attr(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    /// The `xlink:href` of the `OnlineResource` child found at `path`.
    pub fn online_resource(&self, path: &str) -> Option<&str> {
        self.find(path)
            .and_then(|el| el.child("OnlineResource"))
            .and_then(|res| res.attr("xlink:href"))
    }

    /// All descendants (not including self) with the given local name,
    /// in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_named(self, name, &mut found);
        found
    }

    fn from_start(start: &BytesStart<'_>) -> CapabilityResult<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| CapabilityError::Xml {
                position: 0,
                message: format!("invalid attribute on <{}>: {}", name, e),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| CapabilityError::Xml {
                    position: 0,
                    message: format!("invalid value for '{}' on <{}>: {}", key, name, e),
                })?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }
}

fn local_part(key: &str) -> &str {
    key.rsplit_once(':').map(|(_, local)| local).unwrap_or(key)
}

fn collect_named<'a>(parent: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    for child in &parent.children {
        if child.name == name {
            found.push(child);
        }
        collect_named(child, name, found);
    }
}

/// A parsed `WMS_Capabilities` document.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDocument {
    root: Element,
}

impl CapabilityDocument {
    /// Parse a capabilities response.
    ///
    /// Fails on malformed XML, on a `ServiceExceptionReport` and on any other
    /// root element than `WMS_Capabilities`.
    pub fn parse(xml: &str) -> CapabilityResult<Self> {
        let root = parse_tree(xml)?;
        let root_name = root.name().to_string();
        match root_name.as_str() {
            CAPABILITIES_ROOT => Ok(Self { root }),
            EXCEPTION_ROOT => {
                let message = root
                    .descendants_named("ServiceException")
                    .into_iter()
                    .map(|e| e.text().to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(CapabilityError::ServiceException(message))
            }
            other => Err(CapabilityError::UnexpectedRoot(other.to_string())),
        }
    }

    /// Parse raw response bytes (lossy UTF-8).
    pub fn from_bytes(bytes: &[u8]) -> CapabilityResult<Self> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// The `WMS_Capabilities` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The top-level `Capability/Layer` element.
    pub fn top_layer(&self) -> CapabilityResult<&Element> {
        self.root
            .find("Capability/Layer")
            .ok_or_else(|| CapabilityError::MissingElement("Capability/Layer".to_string()))
    }

    /// First `Layer` anywhere in the document whose `Name` equals `name`.
    pub fn find_layer(&self, name: &str) -> Option<&Element> {
        self.root
            .descendants_named("Layer")
            .into_iter()
            .find(|layer| layer.value("Name") == name)
    }
}

fn parse_tree(xml: &str) -> CapabilityResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| CapabilityError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;
        match event {
            Event::Start(e) => stack.push(Element::from_start(&e)?),
            Event::Empty(e) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| CapabilityError::Xml {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CapabilityError::Xml {
            position: reader.buffer_position(),
            message: format!("unclosed element <{}>", open.name),
        });
    }
    root.ok_or(CapabilityError::Empty)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
