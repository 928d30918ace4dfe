//! Minimal element tree over `quick-xml` events.
//!
//! EWS responses are small, so they are read into memory once and walked by
//! local name. Namespace prefixes are dropped: `t:Subject` and `Subject`
//! are the same element here.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::EwsError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document and return its root element.
    ///
    /// # Errors
    ///
    /// Fails on malformed XML or a document without a root element.
    pub fn parse(xml: &str) -> Result<Self, EwsError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        // Bottom of the stack is a synthetic holder for the root element
        let mut stack = vec![XmlNode::default()];

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let node = Self::from_start(&start)?;
                    attach(&mut stack, node)?;
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(EwsError::InvalidResponse("unbalanced end tag".to_string()));
                    }
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, node)?;
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(EwsError::InvalidResponse("unclosed element".to_string()));
        }

        stack
            .pop()
            .and_then(|holder| holder.children.into_iter().next())
            .ok_or_else(|| EwsError::InvalidResponse("empty document".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, EwsError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with this local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with this local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first direct child with this local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Depth-first search for the first descendant with this local name.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }
}

fn attach(stack: &mut [XmlNode], node: XmlNode) -> Result<(), EwsError> {
    stack
        .last_mut()
        .map(|parent| parent.children.push(node))
        .ok_or_else(|| EwsError::InvalidResponse("element outside document".to_string()))
}
