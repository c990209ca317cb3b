use crate::xml::{AsyncXmlSink, XmlAttribute, XmlError, XmlName, XmlNodeType, XmlReader, XmlToken, XmlWriter};

/// An in-memory XML cursor over a token vector.
///
/// Unlike a streaming parser, a freshly created reader is already positioned
/// on the first token.
#[derive(Debug, Clone)]
pub struct TokenReader {
    tokens: Vec<XmlToken>,
    pos: usize,
}

impl TokenReader {
    pub fn new(tokens: Vec<XmlToken>) -> Self {
        TokenReader { tokens, pos: 0 }
    }

    pub fn from_element(element: XmlElement) -> Self {
        Self::new(element.into_tokens())
    }

    fn current(&self) -> Option<&XmlToken> {
        self.tokens.get(self.pos)
    }

    fn matching_end(&self, start: usize) -> Result<usize, XmlError> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(start) {
            match token {
                XmlToken::Start { .. } => depth += 1,
                XmlToken::End => {
                    depth = depth.checked_sub(1).ok_or(XmlError::Unbalanced)?;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                XmlToken::Text(_) => {}
            }
        }
        Err(XmlError::UnexpectedEof)
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(XmlToken::Start { name, .. }) => format!("element `{}`", name.qualified()),
            Some(XmlToken::Text(_)) => "text".to_string(),
            Some(XmlToken::End) => "end element".to_string(),
            None => "end of document".to_string(),
        }
    }
}

impl XmlReader for TokenReader {
    fn node_type(&self) -> XmlNodeType {
        match self.current() {
            Some(XmlToken::Start { .. }) => XmlNodeType::Element,
            Some(XmlToken::End) => XmlNodeType::EndElement,
            Some(XmlToken::Text(_)) => XmlNodeType::Text,
            None => XmlNodeType::None,
        }
    }

    fn name(&self) -> Option<&XmlName> {
        match self.current() {
            Some(XmlToken::Start { name, .. }) => Some(name),
            _ => None,
        }
    }

    fn attributes(&self) -> &[XmlAttribute] {
        match self.current() {
            Some(XmlToken::Start { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    fn value(&self) -> Option<&str> {
        match self.current() {
            Some(XmlToken::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn read(&mut self) -> Result<bool, XmlError> {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        Ok(self.pos < self.tokens.len())
    }

    fn skip(&mut self) -> Result<(), XmlError> {
        if self.node_type() == XmlNodeType::Element {
            self.pos = self.matching_end(self.pos)? + 1;
        } else {
            self.read()?;
        }
        Ok(())
    }

    fn read_element_text(&mut self) -> Result<String, XmlError> {
        if self.node_type() != XmlNodeType::Element {
            return Err(XmlError::Unexpected {
                expected: "element",
                found: self.describe_current(),
            });
        }
        let mut text = String::new();
        let mut i = self.pos + 1;
        loop {
            match self.tokens.get(i) {
                Some(XmlToken::Text(t)) => text.push_str(t),
                Some(XmlToken::End) => {
                    self.pos = i + 1;
                    return Ok(text);
                }
                Some(XmlToken::Start { name, .. }) => {
                    return Err(XmlError::Unexpected {
                        expected: "text",
                        found: format!("element `{}`", name.qualified()),
                    });
                }
                None => return Err(XmlError::UnexpectedEof),
            }
            i += 1;
        }
    }
}

/// An [`XmlWriter`] that records tokens in memory.
///
/// The recorded tokens can be rendered, read back with a [`TokenReader`], or
/// flushed into an [`AsyncXmlSink`] once the synchronous write completed.
#[derive(Debug, Default, Clone)]
pub struct XmlBuffer {
    tokens: Vec<XmlToken>,
    open: usize,
    attributes_open: bool,
}

impl XmlBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[XmlToken] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<XmlToken> {
        self.tokens
    }

    pub fn into_reader(self) -> TokenReader {
        TokenReader::new(self.tokens)
    }

    /// True when every started element has been ended.
    pub fn is_balanced(&self) -> bool {
        self.open == 0
    }

    /// Replays the recorded tokens into an async sink and flushes it.
    pub async fn flush_async<S: AsyncXmlSink>(&self, sink: &mut S) -> Result<(), XmlError> {
        sink.async_write_tokens(&self.tokens).await?;
        sink.async_flush().await
    }

    /// Renders the recorded tokens as XML text. Empty elements are
    /// self-closing.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        let mut names: Vec<String> = Vec::new();
        let mut iter = self.tokens.iter().peekable();
        while let Some(token) = iter.next() {
            match token {
                XmlToken::Start { name, attributes } => {
                    let qualified = name.qualified();
                    out.push('<');
                    out.push_str(&qualified);
                    for attr in attributes {
                        out.push(' ');
                        out.push_str(&attr.name.qualified());
                        out.push_str("=\"");
                        escape_into(&mut out, &attr.value, true);
                        out.push('"');
                    }
                    if matches!(iter.peek(), Some(XmlToken::End)) {
                        iter.next();
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        names.push(qualified);
                    }
                }
                XmlToken::Text(text) => escape_into(&mut out, text, false),
                XmlToken::End => {
                    if let Some(name) = names.pop() {
                        out.push_str("</");
                        out.push_str(&name);
                        out.push('>');
                    }
                }
            }
        }
        out
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl XmlWriter for XmlBuffer {
    fn start_element(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: &str,
    ) -> Result<(), XmlError> {
        self.tokens.push(XmlToken::Start {
            name: XmlName::new(namespace_uri, prefix, local_name),
            attributes: Vec::new(),
        });
        self.open += 1;
        self.attributes_open = true;
        Ok(())
    }

    fn attribute(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: &str,
        value: &str,
    ) -> Result<(), XmlError> {
        match self.tokens.last_mut() {
            Some(XmlToken::Start { attributes, .. }) if self.attributes_open => {
                attributes.push(XmlAttribute::new(namespace_uri, prefix, local_name, value));
                Ok(())
            }
            _ => Err(XmlError::MisplacedAttribute(local_name.to_string())),
        }
    }

    fn text(&mut self, text: &str) -> Result<(), XmlError> {
        self.attributes_open = false;
        self.tokens.push(XmlToken::Text(text.to_string()));
        Ok(())
    }

    fn end_element(&mut self) -> Result<(), XmlError> {
        self.open = self.open.checked_sub(1).ok_or(XmlError::Unbalanced)?;
        self.attributes_open = false;
        self.tokens.push(XmlToken::End);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Builder for small XML trees, mainly to feed a [`TokenReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: XmlName,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(namespace_uri: &str, local_name: &str) -> Self {
        XmlElement {
            name: XmlName::new(namespace_uri, None, local_name),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.name.prefix = Some(prefix.to_string());
        self
    }

    pub fn attr(mut self, namespace_uri: &str, local_name: &str, value: &str) -> Self {
        self.attributes
            .push(XmlAttribute::new(namespace_uri, None, local_name, value));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    pub fn into_tokens(self) -> Vec<XmlToken> {
        let mut tokens = Vec::new();
        self.push_tokens(&mut tokens);
        tokens
    }

    fn push_tokens(self, tokens: &mut Vec<XmlToken>) {
        tokens.push(XmlToken::Start {
            name: self.name,
            attributes: self.attributes,
        });
        for child in self.children {
            match child {
                XmlNode::Element(element) => element.push_tokens(tokens),
                XmlNode::Text(text) => tokens.push(XmlToken::Text(text)),
            }
        }
        tokens.push(XmlToken::End);
    }
}
