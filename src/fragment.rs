//! The XML side of the conversion: a `fragment` document describing one registry
//! subtree, read fully into memory and written back in one go.

use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use tracing::warn;

use crate::error::XmlRegError;
use crate::hive::{Hive, HiveView};
use crate::redirection::Redirection;
use crate::registry_utils::normalize_path;

pub const ROOT_ELEMENT: &str = "fragment";
pub const KEY_ELEMENT: &str = "key";
pub const VALUE_ELEMENT: &str = "value";
pub const ITEM_ELEMENT: &str = "li";

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml parse error: {0}")]
    Parse(String),
    #[error("root element is '{0}', expected 'fragment'")]
    Schema(String),
    #[error("xml write error: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    /// `None` when the document names no hive (or one that is not recognized).
    pub hive: Option<Hive>,
    pub key: String,
    pub redirection: Redirection,
    pub children: Vec<FragmentNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentNode {
    Key(KeyElement),
    Value(ValueElement),
    /// Element with an unexpected name, kept so traversals can report it.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyElement {
    pub name: String,
    pub children: Vec<FragmentNode>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueElement {
    pub name: String,
    pub type_tag: String,
    pub text: String,
    pub items: Vec<String>,
    /// Names of child elements other than `li`.
    pub ignored_children: Vec<String>,
}

impl ValueElement {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            ..Self::default()
        }
    }
}

impl KeyElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

impl Fragment {
    pub fn new(hive: Hive, key: impl Into<String>, redirection: Redirection) -> Self {
        Self {
            hive: Some(hive),
            key: key.into(),
            redirection,
            children: Vec::new(),
        }
    }

    pub fn view(&self) -> HiveView {
        HiveView::new(self.hive.unwrap_or_default(), self.redirection)
    }

    /// View and normalized key path the fragment addresses. A missing hive means HKCU.
    pub fn target(&self) -> (HiveView, String) {
        if self.hive.is_none() {
            warn!("no hive, assuming HKCU");
        }
        (self.view(), normalize_path(&self.key))
    }

    /// Same root attributes, no content.
    pub fn placeholder(&self) -> Fragment {
        Fragment {
            children: Vec::new(),
            ..self.clone()
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Fragment, FragmentError> {
        let text = fs::read_to_string(path)?;
        Self::load_from_text(&text)
    }

    pub fn load_from_text(text: &str) -> Result<Fragment, FragmentError> {
        let root = read_document(text)?;
        if root.name != ROOT_ELEMENT {
            return Err(FragmentError::Schema(root.name));
        }
        let hive = match root.attribute("hive") {
            None | Some("") => None,
            Some(name) => match name.parse::<Hive>() {
                Ok(hive) => Some(hive),
                Err(err) => {
                    warn!("{}", err);
                    None
                }
            },
        };
        Ok(Fragment {
            hive,
            key: root.attribute("key").unwrap_or_default().to_string(),
            redirection: Redirection::from_tag(root.attribute("redirection").unwrap_or_default()),
            children: convert_children(root.children),
        })
    }

    pub fn write_to_string(&self) -> Result<String, FragmentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        self.write_all(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| FragmentError::Write(e.to_string()))
    }

    /// Writes through a temporary sibling file renamed into place.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FragmentError> {
        let content = self.write_to_string()?;
        let mut tmp = path.as_ref().to_path_buf();
        let file_name = tmp
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "fragment.xml".into());
        tmp.set_file_name(format!("{}.tmp", file_name));
        fs::write(&tmp, content.as_bytes())?;
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    fn write_all<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), FragmentError> {
        emit(writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        let mut root = BytesStart::new(ROOT_ELEMENT);
        root.push_attribute(("hive", self.hive.unwrap_or_default().short_name()));
        root.push_attribute(("key", self.key.as_str()));
        if let Some(tag) = self.redirection.as_tag() {
            root.push_attribute(("redirection", tag));
        }
        write_element(writer, root, ROOT_ELEMENT, &self.children)
    }
}

/// Loads a fragment for import or wipe, mapping failures onto the tool's error taxonomy.
pub fn load_fragment(path: &Path) -> crate::error::Result<Fragment> {
    Fragment::load_from_file(path).map_err(|err| match err {
        FragmentError::Schema(found) => XmlRegError::Schema {
            file: path.to_path_buf(),
            found,
        },
        other => XmlRegError::Parse {
            file: path.to_path_buf(),
            message: other.to_string(),
        },
    })
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    name: &str,
    children: &[FragmentNode],
) -> Result<(), FragmentError> {
    let written: Vec<&FragmentNode> = children
        .iter()
        .filter(|c| !matches!(c, FragmentNode::Unknown(_)))
        .collect();
    if written.is_empty() {
        return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    for child in written {
        match child {
            FragmentNode::Key(key) => {
                let mut start = BytesStart::new(KEY_ELEMENT);
                start.push_attribute(("name", key.name.as_str()));
                write_element(writer, start, KEY_ELEMENT, &key.children)?;
            }
            FragmentNode::Value(value) => write_value(writer, value)?,
            FragmentNode::Unknown(_) => {}
        }
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_value<W: Write>(writer: &mut Writer<W>, value: &ValueElement) -> Result<(), FragmentError> {
    let mut start = BytesStart::new(VALUE_ELEMENT);
    start.push_attribute(("name", value.name.as_str()));
    start.push_attribute(("type", value.type_tag.as_str()));
    if !value.items.is_empty() {
        emit(writer, Event::Start(start))?;
        for item in &value.items {
            write_text_element(writer, BytesStart::new(ITEM_ELEMENT), ITEM_ELEMENT, item)?;
        }
        return emit(writer, Event::End(BytesEnd::new(VALUE_ELEMENT)));
    }
    write_text_element(writer, start, VALUE_ELEMENT, &value.text)
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    name: &str,
    text: &str,
) -> Result<(), FragmentError> {
    if text.is_empty() {
        return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), FragmentError> {
    writer
        .write_event(event)
        .map_err(|e| FragmentError::Write(e.to_string()))
}

// Minimal document tree; only what the fragment conversion needs.
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn read_document(text: &str) -> Result<Element, FragmentError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FragmentError::Parse(format!("{} (at byte {})", e, reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FragmentError::Parse("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(parent) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| FragmentError::Parse(e.to_string()))?;
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Event::CData(c) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Text(String::from_utf8_lossy(&c).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FragmentError::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| FragmentError::Parse("no document element".into()))
}

fn start_element(e: &BytesStart<'_>) -> Result<Element, FragmentError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| FragmentError::Parse(err.to_string()))?
        .to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| FragmentError::Parse(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| FragmentError::Parse(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), FragmentError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(FragmentError::Parse("more than one document element".into()));
    }
    *root = Some(element);
    Ok(())
}

fn convert_children(children: Vec<Node>) -> Vec<FragmentNode> {
    children
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(element) => Some(convert_element(element)),
            Node::Text(_) => None,
        })
        .collect()
}

fn convert_element(element: Element) -> FragmentNode {
    match element.name.as_str() {
        KEY_ELEMENT => FragmentNode::Key(KeyElement {
            name: element.attribute("name").unwrap_or_default().to_string(),
            children: convert_children(element.children),
        }),
        VALUE_ELEMENT => {
            let mut value = ValueElement::new(
                element.attribute("name").unwrap_or_default(),
                element.attribute("type").unwrap_or_default(),
            );
            // Text between child elements is layout, not payload.
            if !element.children.iter().any(|c| matches!(c, Node::Element(_))) {
                value.text = element.text();
            }
            for child in &element.children {
                if let Node::Element(child) = child {
                    if child.name == ITEM_ELEMENT {
                        value.items.push(child.text());
                    } else {
                        value.ignored_children.push(child.name.clone());
                    }
                }
            }
            FragmentNode::Value(value)
        }
        _ => FragmentNode::Unknown(element.name),
    }
}
