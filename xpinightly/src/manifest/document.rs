//! Owned XML tree over quick-xml events.
//!
//! Only what manifest editing needs: elements with ordered attributes and
//! children, text, and everything else (comments, CDATA, processing
//! instructions, doctype) carried through untouched. Element names keep their
//! prefixes (`em:version`), matched literally like DOM tag-name lookup.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::{ManifestError, ManifestResult};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Other(Event<'static>),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element holding a single text child.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(text.into()));
        element
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }
}

/// A parsed XML document. The declaration is regenerated on output.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
}

fn push_node(stack: &mut [Element], top: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn element_from(start: &BytesStart<'_>) -> ManifestResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ManifestError::Parse(e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| ManifestError::Parse(e.to_string()))?;
        element.attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn find_path(nodes: &[Node], name: &str, path: &mut Vec<usize>) -> bool {
    for (index, node) in nodes.iter().enumerate() {
        if let Node::Element(element) = node {
            path.push(index);
            if element.name == name || find_path(&element.children, name, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn collect<'a>(nodes: &'a [Node], name: &str, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.name == name {
                found.push(element);
            }
            collect(&element.children, name, found);
        }
    }
}

fn visit_mut(nodes: &mut [Node], name: &str, f: &mut dyn FnMut(&mut Element)) -> usize {
    let mut count = 0;
    for node in nodes {
        if let Node::Element(element) = node {
            if element.name == name {
                f(element);
                count += 1;
            }
            count += visit_mut(&mut element.children, name, f);
        }
    }
    count
}

fn remove_named(nodes: &mut Vec<Node>, name: &str) -> usize {
    let before = nodes.len();
    nodes.retain(|n| !matches!(n, Node::Element(e) if e.name == name));
    let mut removed = before - nodes.len();
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            removed += remove_named(&mut element.children, name);
        }
    }
    removed
}

fn write_error(e: impl std::fmt::Display) -> ManifestError {
    ManifestError::Write(e.to_string())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> ManifestResult<()> {
    match node {
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (key, value) in &element.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start)).map_err(write_error)?;
            } else {
                writer.write_event(Event::Start(start)).map_err(write_error)?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(element.name.as_str())))
                    .map_err(write_error)?;
            }
        }
        Node::Text(text) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?,
        Node::Other(event) => writer.write_event(event.borrow()).map_err(write_error)?,
    }
    Ok(())
}

impl Document {
    /// Parse a document from text.
    pub fn parse(text: &str) -> ManifestResult<Self> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                ManifestError::Parse(format!("at byte {}: {}", reader.buffer_position(), e))
            })?;
            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    push_node(&mut stack, &mut top, Node::Element(element));
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ManifestError::Parse("unexpected closing tag".to_string())
                    })?;
                    push_node(&mut stack, &mut top, Node::Element(element));
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| ManifestError::Parse(e.to_string()))?;
                    push_node(&mut stack, &mut top, Node::Text(text.into_owned()));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
                other => push_node(&mut stack, &mut top, Node::Other(other.into_owned())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(ManifestError::Parse(format!("unclosed element <{}>", open.name)));
        }
        if !top.iter().any(|n| matches!(n, Node::Element(_))) {
            return Err(ManifestError::Parse("no root element".to_string()));
        }
        Ok(Self { nodes: top })
    }

    /// Serialize with a UTF-8 XML declaration.
    pub fn to_xml(&self) -> ManifestResult<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_error)?;
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| ManifestError::Write(e.to_string()))
    }

    /// First element named `name` in document order.
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        let path = self.path_to_first(name)?;
        self.element_at(&path)
    }

    /// Mutable first element named `name` in document order.
    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut Element> {
        let path = self.path_to_first(name)?;
        self.element_at_mut(&path)
    }

    /// All elements named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect(&self.nodes, name, &mut found);
        found
    }

    /// Index path from the top level down to the first element named `name`.
    pub fn path_to_first(&self, name: &str) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        find_path(&self.nodes, name, &mut path).then_some(path)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        let mut current = match self.nodes.get(*first)? {
            Node::Element(e) => e,
            _ => return None,
        };
        for index in rest {
            current = match current.children.get(*index)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let (first, rest) = path.split_first()?;
        let mut current = match self.nodes.get_mut(*first)? {
            Node::Element(e) => e,
            _ => return None,
        };
        for index in rest {
            current = match current.children.get_mut(*index)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Apply `f` to every element named `name`. Returns how many matched.
    pub fn for_each_mut(&mut self, name: &str, mut f: impl FnMut(&mut Element)) -> usize {
        visit_mut(&mut self.nodes, name, &mut f)
    }

    /// Remove every element named `name`. Returns how many were removed.
    pub fn remove_all(&mut self, name: &str) -> usize {
        remove_named(&mut self.nodes, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<!-- nightly -->
<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:em="http://www.mozilla.org/2004/em-rdf#">
  <RDF:Description about="urn:x">
    <em:version>1.0</em:version>
    <em:note>a &amp; b</em:note>
    <em:empty/>
  </RDF:Description>
</RDF:RDF>"#;

    #[test]
    fn test_parse_and_find() {
        let doc = Document::parse(SAMPLE).unwrap();
        let version = doc.find_first("em:version").unwrap();
        assert_eq!(version.text(), "1.0");
        assert_eq!(doc.find_first("em:note").unwrap().text(), "a & b");
        assert_eq!(
            doc.find_first("RDF:Description").unwrap().attribute("about"),
            Some("urn:x")
        );
        assert!(doc.find_first("em:missing").is_none());
    }

    #[test]
    fn test_path_navigation() {
        let doc = Document::parse(SAMPLE).unwrap();
        let path = doc.path_to_first("em:version").unwrap();
        let parent = doc.element_at(&path[..path.len() - 1]).unwrap();
        assert_eq!(parent.name, "RDF:Description");
    }

    #[test]
    fn test_serialize_preserves_content() {
        let doc = Document::parse(SAMPLE).unwrap();
        let xml = doc.to_xml().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<!-- nightly -->"));
        assert!(xml.contains("<em:note>a &amp; b</em:note>"));
        assert!(xml.contains("<em:empty/>"));

        let reparsed = Document::parse(&xml).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_mutation_helpers() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        doc.find_first_mut("em:version").unwrap().set_text("2.0");
        assert_eq!(doc.find_first("em:version").unwrap().text(), "2.0");

        let touched = doc.for_each_mut("em:note", |e| e.set_attribute("lang", "en"));
        assert_eq!(touched, 1);
        assert_eq!(doc.find_first("em:note").unwrap().attribute("lang"), Some("en"));

        assert_eq!(doc.remove_all("em:empty"), 1);
        assert!(doc.find_all("em:empty").is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            Document::parse("<a><b></a>"),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            Document::parse("<a>"),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            Document::parse("just text"),
            Err(ManifestError::Parse(_))
        ));
    }
}
