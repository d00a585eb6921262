//! Minimal PDF object model and serialization.

use std::io::{self, Write};

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// `/Name`
    Name(String),
    /// Byte string
    String(PdfString),
    /// `[ ... ]`
    Array(Vec<PdfObject>),
    /// `<< ... >>`
    Dictionary(PdfDictionary),
    /// `n 0 R`
    Reference(u32),
}

/// String encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfString {
    /// `( ... )` with escapes
    Literal(Vec<u8>),
    /// `< ... >`
    Hex(Vec<u8>),
}

impl PdfString {
    /// Encode a text string: ASCII as a literal, anything else as UTF-16BE
    /// with a byte order mark.
    pub fn text(s: &str) -> Self {
        if s.is_ascii() {
            PdfString::Literal(s.as_bytes().to_vec())
        } else {
            let mut bytes = vec![0xFE, 0xFF];
            for unit in s.encode_utf16() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
            PdfString::Hex(bytes)
        }
    }
}

/// Dictionary preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfDictionary {
    entries: Vec<(String, PdfObject)>,
}

impl PdfDictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary with a `/Type` entry.
    pub fn typed(type_name: &str) -> Self {
        Self::new().with("Type", PdfObject::name(type_name))
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: PdfObject) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace an entry.
    pub fn set(&mut self, key: &str, value: PdfObject) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PdfObject {
    /// `/name`
    pub fn name(s: impl Into<String>) -> Self {
        PdfObject::Name(s.into())
    }

    /// Text string.
    pub fn text(s: &str) -> Self {
        PdfObject::String(PdfString::text(s))
    }

    /// Indirect reference.
    pub fn reference(obj: u32) -> Self {
        PdfObject::Reference(obj)
    }

    /// Array of reals.
    pub fn rect(values: [f64; 4]) -> Self {
        PdfObject::Array(values.iter().map(|v| PdfObject::Real(*v)).collect())
    }

    /// Serialize into `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            PdfObject::Null => out.write_all(b"null"),
            PdfObject::Boolean(b) => out.write_all(if *b { b"true" } else { b"false" }),
            PdfObject::Integer(n) => write!(out, "{}", n),
            PdfObject::Real(n) => out.write_all(format_real(*n).as_bytes()),
            PdfObject::Name(name) => write_name(out, name),
            PdfObject::String(PdfString::Literal(bytes)) => {
                out.write_all(b"(")?;
                for &b in bytes {
                    match b {
                        b'(' | b')' | b'\\' => out.write_all(&[b'\\', b])?,
                        b'\n' => out.write_all(b"\\n")?,
                        b'\r' => out.write_all(b"\\r")?,
                        0x20..=0x7E => out.write_all(&[b])?,
                        _ => write!(out, "\\{:03o}", b)?,
                    }
                }
                out.write_all(b")")
            }
            PdfObject::String(PdfString::Hex(bytes)) => {
                out.write_all(b"<")?;
                for b in bytes {
                    write!(out, "{:02X}", b)?;
                }
                out.write_all(b">")
            }
            PdfObject::Array(items) => {
                out.write_all(b"[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_all(b" ")?;
                    }
                    item.write_to(out)?;
                }
                out.write_all(b"]")
            }
            PdfObject::Dictionary(dict) => {
                out.write_all(b"<<")?;
                for (key, value) in &dict.entries {
                    out.write_all(b" ")?;
                    write_name(out, key)?;
                    out.write_all(b" ")?;
                    value.write_to(out)?;
                }
                out.write_all(b" >>")
            }
            PdfObject::Reference(obj) => write!(out, "{} 0 R", obj),
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }
}

impl From<PdfDictionary> for PdfObject {
    fn from(dict: PdfDictionary) -> Self {
        PdfObject::Dictionary(dict)
    }
}

impl From<i64> for PdfObject {
    fn from(n: i64) -> Self {
        PdfObject::Integer(n)
    }
}

impl From<u32> for PdfObject {
    fn from(n: u32) -> Self {
        PdfObject::Integer(n as i64)
    }
}

impl From<f64> for PdfObject {
    fn from(n: f64) -> Self {
        PdfObject::Real(n)
    }
}

/// Real number with at most four decimals and no trailing zeros.
pub fn format_real(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.4}", n);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn write_name<W: Write>(out: &mut W, name: &str) -> io::Result<()> {
    out.write_all(b"/")?;
    for b in name.bytes() {
        match b {
            b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' => {
                write!(out, "#{:02X}", b)?
            }
            0x21..=0x7E => out.write_all(&[b])?,
            _ => write!(out, "#{:02X}", b)?,
        }
    }
    Ok(())
}
