//! Minimal element tree built from quick-xml events.
//!
//! Text is kept verbatim: object keys may carry significant whitespace.

use crate::error::ResponseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

/// An XML element with its attributes, text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, namespace prefix stripped.
    pub name: String,
    /// Attributes by local name.
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

fn xml_error(message: impl ToString) -> ResponseError {
    ResponseError::XmlParse {
        message: message.to_string(),
    }
}

fn open(start: &BytesStart<'_>) -> Result<Element, ResponseError> {
    let mut element = Element {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(body: &[u8]) -> Result<Element, ResponseError> {
        let xml = std::str::from_utf8(body).map_err(xml_error)?;
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(open(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = open(&e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(e)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&e.unescape().map_err(xml_error)?);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| xml_error("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(e)),
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(xml_error("unexpected end of document"));
        }
        root.ok_or_else(|| xml_error("document has no root element"))
    }

    /// First child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child named `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    /// Text of a child that must be present.
    pub fn required_text(
        &self,
        name: &'static str,
        document: &'static str,
    ) -> Result<String, ResponseError> {
        self.child_text(name).ok_or(ResponseError::MissingField {
            field: name,
            document,
        })
    }

    /// Parse the trimmed text of a child; absent or unparsable yields `None`.
    pub fn child_parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.child(name).and_then(|c| c.text.trim().parse().ok())
    }

    /// Boolean child; anything but `true` is false.
    pub fn child_bool(&self, name: &str) -> bool {
        self.child(name)
            .map_or(false, |c| c.text.trim().eq_ignore_ascii_case("true"))
    }

    /// Attribute by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <Root xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
                <A>one</A>
                <B><C>two &amp; three</C></B>
                <A> spaced </A>
                <Empty/>
            </Root>"#;
        let root = Element::parse(xml).unwrap();

        assert_eq!(root.name, "Root");
        assert_eq!(root.child_text("A").unwrap(), "one");
        let all: Vec<_> = root.children_named("A").map(|a| a.text.as_str()).collect();
        assert_eq!(all, vec!["one", " spaced "]);
        assert_eq!(
            root.child("B").unwrap().child_text("C").unwrap(),
            "two & three"
        );
        assert_eq!(root.child_text("Empty").unwrap(), "");
    }

    #[test]
    fn test_namespaced_attributes() {
        let xml = br#"<Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group"><URI>x</URI></Grantee>"#;
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.attribute("type"), Some("Group"));
    }

    #[test]
    fn test_rejects_broken_documents() {
        assert!(Element::parse(b"").is_err());
        assert!(Element::parse(b"<Open><Inner></Inner>").is_err());
        assert!(Element::parse(b"not xml at all").is_err());
    }

    #[test]
    fn test_typed_children() {
        let root = Element::parse(b"<R><N> 42 </N><T>true</T><F>no</F></R>").unwrap();
        assert_eq!(root.child_parse::<u64>("N"), Some(42));
        assert!(root.child_bool("T"));
        assert!(!root.child_bool("F"));
        assert!(!root.child_bool("Missing"));
    }
}
