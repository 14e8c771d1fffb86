//! Markup writer
//!
//! Element-level writer over `quick_xml` and the tree every DIMAP document
//! is built as. Output is indented and encoded as ISO-8859-1.

use log::warn;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::errors::{SpotError, SpotResult};

const INDENT: usize = 2;
const ENCODING: &str = "ISO-8859-1";

/// Quote character around an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
}

impl QuoteStyle {
    fn quote(&self) -> char {
        match self {
            QuoteStyle::Double => '"',
            QuoteStyle::Single => '\'',
        }
    }
}

/// A single attribute on a leaf element
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub quote: QuoteStyle,
}

/// A node of a markup document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Element holding child elements
    Group { name: String, children: Vec<Node> },
    /// Leaf element holding text, with an optional attribute
    Value { name: String, value: String, attribute: Option<Attribute> },
    /// Element with no content
    Empty { name: String },
}

impl Node {
    pub fn group(name: &str, children: Vec<Node>) -> Self {
        Node::Group { name: name.to_string(), children }
    }

    pub fn value(name: &str, value: impl ToString) -> Self {
        Node::Value { name: name.to_string(), value: value.to_string(), attribute: None }
    }

    /// Leaf element with one double-quoted attribute
    pub fn value_with(name: &str, value: impl ToString, attr_name: &str, attr_value: &str) -> Self {
        Node::Value {
            name: name.to_string(),
            value: value.to_string(),
            attribute: Some(Attribute {
                name: attr_name.to_string(),
                value: attr_value.to_string(),
                quote: QuoteStyle::Double,
            }),
        }
    }

    pub fn empty(name: &str) -> Self {
        Node::Empty { name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Group { name, .. } | Node::Value { name, .. } | Node::Empty { name } => name,
        }
    }

    /// Direct child with the given name
    pub fn child(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Group { children, .. } => children.iter().find(|c| c.name() == name),
            _ => None,
        }
    }

    /// Child groups, in document order
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// Text of a leaf element
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Value { value, .. } => Some(value),
            _ => None,
        }
    }
}

fn encoding_error(e: impl std::fmt::Display) -> SpotError {
    SpotError::EncodingError(format!("Markup write failed: {}", e))
}

/// Element-level markup writer
///
/// Tags must be closed in the reverse order they were opened.
pub struct MarkupWriter {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
}

impl MarkupWriter {
    /// Starts a document with its declaration
    pub fn new() -> SpotResult<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(ENCODING), None)))
            .map_err(encoding_error)?;
        Ok(MarkupWriter { writer, open: Vec::new() })
    }

    pub fn open_tag(&mut self, name: &str) -> SpotResult<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(encoding_error)?;
        self.open.push(name.to_string());
        Ok(())
    }

    /// Closes the innermost open tag, which must be `name`
    pub fn close_tag(&mut self, name: &str) -> SpotResult<()> {
        match self.open.pop() {
            Some(open) if open == name => self
                .writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encoding_error),
            Some(open) => Err(SpotError::EncodingError(format!(
                "Cannot close <{}> while <{}> is open",
                name, open
            ))),
            None => Err(SpotError::EncodingError(format!("No open tag to close for <{}>", name))),
        }
    }

    pub fn empty_tag(&mut self, name: &str) -> SpotResult<()> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(encoding_error)
    }

    /// Writes `<name>value</name>`
    pub fn element(&mut self, name: &str, value: &str) -> SpotResult<()> {
        self.writer
            .create_element(name)
            .write_text_content(BytesText::new(value))
            .map_err(encoding_error)?;
        Ok(())
    }

    /// Writes a leaf element carrying one attribute
    ///
    /// An empty value writes a self-closing element.
    pub fn element_with_attribute(
        &mut self,
        name: &str,
        value: &str,
        attr_name: &str,
        attr_value: &str,
        quote_style: QuoteStyle,
    ) -> SpotResult<()> {
        let quote = quote_style.quote();
        let content = format!("{} {}={}{}{}", name, attr_name, quote, escape(attr_value), quote);
        let start = BytesStart::from_content(content, name.len());

        if value.is_empty() {
            return self.writer.write_event(Event::Empty(start)).map_err(encoding_error);
        }
        self.writer.write_event(Event::Start(start)).map_err(encoding_error)?;
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(encoding_error)?;
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(encoding_error)
    }

    /// Finishes the document and returns it encoded as ISO-8859-1
    ///
    /// Characters outside the encoding are replaced by `?`.
    pub fn finish(self) -> SpotResult<Vec<u8>> {
        if let Some(open) = self.open.last() {
            return Err(SpotError::EncodingError(format!("Tag <{}> was never closed", open)));
        }
        let text = String::from_utf8(self.writer.into_inner()).map_err(encoding_error)?;
        let mut out = Vec::with_capacity(text.len() + 1);
        let mut replaced = 0usize;
        for c in text.chars() {
            match u8::try_from(u32::from(c)) {
                Ok(b) => out.push(b),
                Err(_) => {
                    out.push(b'?');
                    replaced += 1;
                }
            }
        }
        if replaced > 0 {
            warn!("Replaced {} characters not representable in {}", replaced, ENCODING);
        }
        out.push(b'\n');
        Ok(out)
    }
}

/// Writes a node and its descendants depth-first
pub fn render(node: &Node, writer: &mut MarkupWriter) -> SpotResult<()> {
    match node {
        Node::Group { name, children } => {
            writer.open_tag(name)?;
            for child in children {
                render(child, writer)?;
            }
            writer.close_tag(name)
        }
        Node::Value { name, value, attribute: None } => writer.element(name, value),
        Node::Value { name, value, attribute: Some(attr) } => {
            writer.element_with_attribute(name, value, &attr.name, &attr.value, attr.quote)
        }
        Node::Empty { name } => writer.empty_tag(name),
    }
}

/// Renders a whole document rooted at `root`
pub fn render_document(root: &Node) -> SpotResult<Vec<u8>> {
    let mut writer = MarkupWriter::new()?;
    render(root, &mut writer)?;
    writer.finish()
}
