//! The XML boundary.
//!
//! Mapping walks only need a forward-only cursor on read and an element
//! emitter on write. Both are traits so any tokenizer/emitter can sit behind
//! them; [`TokenReader`] and [`XmlBuffer`] are in-memory implementations.

mod async_sink;
mod memory;

pub use async_sink::AsyncXmlSink;
pub use memory::{TokenReader, XmlBuffer, XmlElement};

/// Error type for XML cursor and emitter operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("end element without a matching start element")]
    Unbalanced,
    #[error("attribute `{0}` written outside of a start element")]
    MisplacedAttribute(String),
}

/// A namespace-qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName {
    pub namespace_uri: String,
    pub prefix: Option<String>,
    pub local_name: String,
}

impl XmlName {
    pub fn new(namespace_uri: &str, prefix: Option<&str>, local_name: &str) -> Self {
        XmlName {
            namespace_uri: namespace_uri.to_string(),
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
        }
    }

    pub fn matches(&self, namespace_uri: &str, local_name: &str) -> bool {
        self.namespace_uri == namespace_uri && self.local_name == local_name
    }

    /// The `prefix:local` form used when rendering.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.local_name),
            _ => self.local_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: XmlName,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(namespace_uri: &str, prefix: Option<&str>, local_name: &str, value: &str) -> Self {
        XmlAttribute {
            name: XmlName::new(namespace_uri, prefix, local_name),
            value: value.to_string(),
        }
    }
}

/// A single XML token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken {
    Start {
        name: XmlName,
        attributes: Vec<XmlAttribute>,
    },
    Text(String),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlNodeType {
    Element,
    EndElement,
    Text,
    None,
}

/// Forward-only XML cursor.
pub trait XmlReader {
    fn node_type(&self) -> XmlNodeType;

    /// Name of the current element; `None` on any other node.
    fn name(&self) -> Option<&XmlName>;

    /// Attributes of the current element; empty on any other node.
    fn attributes(&self) -> &[XmlAttribute];

    /// Content of the current text node; `None` on any other node.
    fn value(&self) -> Option<&str>;

    /// Advances to the next node. Returns false at the end of the document.
    fn read(&mut self) -> Result<bool, XmlError>;

    /// On an element, moves past its matching end element without looking at
    /// the subtree. On any other node, behaves like `read`.
    fn skip(&mut self) -> Result<(), XmlError>;

    /// On an element, returns its concatenated text and moves past its end
    /// element. Fails if the element has child elements.
    fn read_element_text(&mut self) -> Result<String, XmlError>;

    fn local_name(&self) -> &str {
        self.name().map_or("", |n| n.local_name.as_str())
    }

    fn namespace_uri(&self) -> &str {
        self.name().map_or("", |n| n.namespace_uri.as_str())
    }

    fn attribute(&self, namespace_uri: &str, local_name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|a| a.name.matches(namespace_uri, local_name))
            .map(|a| a.value.as_str())
    }
}

/// XML emitter.
pub trait XmlWriter {
    fn start_element(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: &str,
    ) -> Result<(), XmlError>;

    /// Adds an attribute to the element started last. Must precede any
    /// content of that element.
    fn attribute(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: &str,
        value: &str,
    ) -> Result<(), XmlError>;

    fn text(&mut self, text: &str) -> Result<(), XmlError>;

    fn end_element(&mut self) -> Result<(), XmlError>;

    /// Writes `<prefix:local>text</prefix:local>`.
    fn element_with_text(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: &str,
        text: &str,
    ) -> Result<(), XmlError> {
        self.start_element(prefix, local_name, namespace_uri)?;
        if !text.is_empty() {
            self.text(text)?;
        }
        self.end_element()
    }

    /// Declares `prefix` for `namespace_uri` on the element started last.
    fn namespace_declaration(&mut self, prefix: &str, namespace_uri: &str) -> Result<(), XmlError> {
        self.attribute(
            Some("xmlns"),
            prefix,
            crate::atom::XMLNS_NAMESPACE,
            namespace_uri,
        )
    }

    /// Makes `namespace_uri` the default namespace of the element started
    /// last.
    fn default_namespace_declaration(&mut self, namespace_uri: &str) -> Result<(), XmlError> {
        self.attribute(None, "xmlns", crate::atom::XMLNS_NAMESPACE, namespace_uri)
    }
}

/// Replays one token into a writer.
pub fn write_token<W: XmlWriter + ?Sized>(writer: &mut W, token: &XmlToken) -> Result<(), XmlError> {
    match token {
        XmlToken::Start { name, attributes } => {
            writer.start_element(name.prefix.as_deref(), &name.local_name, &name.namespace_uri)?;
            for attr in attributes {
                writer.attribute(
                    attr.name.prefix.as_deref(),
                    &attr.name.local_name,
                    &attr.name.namespace_uri,
                    &attr.value,
                )?;
            }
            Ok(())
        }
        XmlToken::Text(text) => writer.text(text),
        XmlToken::End => writer.end_element(),
    }
}
