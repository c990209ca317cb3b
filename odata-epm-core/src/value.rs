use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat};

/// A source of materialized items.
///
/// Implementations may be single-pass (e.g. backed by a generator that can only
/// be drained once); callers that need the items more than once go through
/// [`crate::ValueCache`].
pub trait Enumerable<T>: Send + Sync {
    fn enumerate(&self) -> Vec<T>;
}

impl<T: Clone + Send + Sync> Enumerable<T> for Vec<T> {
    fn enumerate(&self) -> Vec<T> {
        self.clone()
    }
}

/// Primitive EDM kinds supported by the mapping layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Int32,
    Int64,
    Double,
    DateTimeOffset,
}

impl PrimitiveKind {
    pub fn edm_name(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "Edm.String",
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::DateTimeOffset => "Edm.DateTimeOffset",
        }
    }

    pub fn from_edm_name(name: &str) -> Option<Self> {
        match name {
            "Edm.String" => Some(PrimitiveKind::String),
            "Edm.Boolean" => Some(PrimitiveKind::Boolean),
            "Edm.Int32" => Some(PrimitiveKind::Int32),
            "Edm.Int64" => Some(PrimitiveKind::Int64),
            "Edm.Double" => Some(PrimitiveKind::Double),
            "Edm.DateTimeOffset" => Some(PrimitiveKind::DateTimeOffset),
            _ => None,
        }
    }

    /// Parses the EPM text form of a value of this kind.
    pub fn parse(&self, text: &str) -> Option<Primitive> {
        match self {
            PrimitiveKind::String => Some(Primitive::String(text.to_string())),
            PrimitiveKind::Boolean => match text {
                "true" | "1" => Some(Primitive::Boolean(true)),
                "false" | "0" => Some(Primitive::Boolean(false)),
                _ => None,
            },
            PrimitiveKind::Int32 => text.trim().parse().ok().map(Primitive::Int32),
            PrimitiveKind::Int64 => text.trim().parse().ok().map(Primitive::Int64),
            PrimitiveKind::Double => match text.trim() {
                "INF" => Some(Primitive::Double(f64::INFINITY)),
                "-INF" => Some(Primitive::Double(f64::NEG_INFINITY)),
                "NaN" => Some(Primitive::Double(f64::NAN)),
                other => other.parse().ok().map(Primitive::Double),
            },
            PrimitiveKind::DateTimeOffset => parse_timestamp(text).map(Primitive::DateTimeOffset),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.edm_name())
    }
}

/// A primitive property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String(String),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::String(_) => PrimitiveKind::String,
            Primitive::Boolean(_) => PrimitiveKind::Boolean,
            Primitive::Int32(_) => PrimitiveKind::Int32,
            Primitive::Int64(_) => PrimitiveKind::Int64,
            Primitive::Double(_) => PrimitiveKind::Double,
            Primitive::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
        }
    }

    /// Canonical text form, as written into syndication and custom elements.
    pub fn to_epm_string(&self) -> String {
        match self {
            Primitive::String(s) => s.clone(),
            Primitive::Boolean(b) => b.to_string(),
            Primitive::Int32(i) => i.to_string(),
            Primitive::Int64(i) => i.to_string(),
            Primitive::Double(d) if d.is_nan() => "NaN".to_string(),
            Primitive::Double(d) if d.is_infinite() => {
                let text = if d.is_sign_positive() { "INF" } else { "-INF" };
                text.to_string()
            }
            Primitive::Double(d) => d.to_string(),
            Primitive::DateTimeOffset(ts) => format_timestamp(ts),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Formats a timestamp in the ISO 8601 round-trip form used on the wire.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Parses an ISO 8601 timestamp with offset.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text.trim()).ok()
}

/// A complex value: a typed bag of properties behind a (possibly single-pass)
/// enumerable.
pub struct ComplexValue {
    type_name: String,
    properties: Box<dyn Enumerable<Property>>,
}

impl ComplexValue {
    pub fn new(type_name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self::from_source(type_name, properties)
    }

    pub fn from_source(type_name: impl Into<String>, source: impl Enumerable<Property> + 'static) -> Self {
        ComplexValue {
            type_name: type_name.into(),
            properties: Box::new(source),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Walks the underlying property source. Prefer the value cache.
    pub fn enumerate_properties(&self) -> Vec<Property> {
        self.properties.enumerate()
    }
}

impl fmt::Debug for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A collection value: a typed sequence of items behind a (possibly
/// single-pass) enumerable.
pub struct CollectionValue {
    type_name: Option<String>,
    items: Box<dyn Enumerable<PropertyValue>>,
}

impl CollectionValue {
    pub fn new(type_name: Option<String>, items: Vec<PropertyValue>) -> Self {
        Self::from_source(type_name, items)
    }

    pub fn from_source(type_name: Option<String>, source: impl Enumerable<PropertyValue> + 'static) -> Self {
        CollectionValue {
            type_name,
            items: Box::new(source),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Walks the underlying item source. Prefer the value cache.
    pub fn enumerate_items(&self) -> Vec<PropertyValue> {
        self.items.enumerate()
    }
}

impl fmt::Debug for CollectionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Value of a single property.
///
/// Complex and collection values are shared and compared by identity.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Null,
    Primitive(Primitive),
    Complex(Arc<ComplexValue>),
    Collection(Arc<CollectionValue>),
}

impl PropertyValue {
    pub fn complex(type_name: impl Into<String>, properties: Vec<Property>) -> Self {
        PropertyValue::Complex(Arc::new(ComplexValue::new(type_name, properties)))
    }

    pub fn collection(type_name: Option<String>, items: Vec<PropertyValue>) -> Self {
        PropertyValue::Collection(Arc::new(CollectionValue::new(type_name, items)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            PropertyValue::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Arc<ComplexValue>> {
        match self {
            PropertyValue::Complex(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Null, PropertyValue::Null) => true,
            (PropertyValue::Primitive(a), PropertyValue::Primitive(b)) => a == b,
            (PropertyValue::Complex(a), PropertyValue::Complex(b)) => Arc::ptr_eq(a, b),
            (PropertyValue::Collection(a), PropertyValue::Collection(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Primitive> for PropertyValue {
    fn from(p: Primitive) -> Self {
        PropertyValue::Primitive(p)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Primitive(Primitive::String(s.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Primitive(Primitive::String(s))
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Primitive(Primitive::Boolean(b))
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Primitive(Primitive::Int32(i))
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Primitive(Primitive::Int64(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(d: f64) -> Self {
        PropertyValue::Primitive(Primitive::Double(d))
    }
}

impl From<DateTime<FixedOffset>> for PropertyValue {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        PropertyValue::Primitive(Primitive::DateTimeOffset(ts))
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PropertyValue::Null, Into::into)
    }
}

/// A named property value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Property {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn null(name: impl Into<String>) -> Self {
        Property {
            name: name.into(),
            value: PropertyValue::Null,
        }
    }
}

/// Finds a property by name in a materialized list.
pub fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties.iter().find(|p| p.name == name)
}

/// The structural state of one entry: its entity type and top-level
/// properties.
#[derive(Debug, Clone)]
pub struct Entry {
    pub type_name: String,
    pub properties: Vec<Property>,
}

impl Entry {
    pub fn new(type_name: impl Into<String>, properties: Vec<Property>) -> Self {
        Entry {
            type_name: type_name.into(),
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name)
    }
}
