//! In-memory PDF file writer: header, objects, cross-reference table and
//! trailer.

use super::objects::{PdfDictionary, PdfObject};
use crate::error::{Error, Result};
use crate::model::Metadata;
use chrono::{DateTime, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// PDF version written in the header.
pub const PDF_VERSION: &str = "1.4";

/// Writes numbered objects into a byte buffer.
pub struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<Option<usize>>,
    compress: bool,
}

impl PdfWriter {
    /// Start a document, writing the header.
    pub fn new(compress: bool) -> Self {
        let mut buf = Vec::with_capacity(64 * 1024);
        buf.extend_from_slice(format!("%PDF-{}\n", PDF_VERSION).as_bytes());
        // binary marker so transfer tools treat the file as binary
        buf.extend_from_slice(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n']);
        Self {
            buf,
            offsets: Vec::new(),
            compress,
        }
    }

    /// Reserve the next object number.
    pub fn allocate(&mut self) -> u32 {
        self.offsets.push(None);
        self.offsets.len() as u32
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing but the header was written.
    pub fn is_empty(&self) -> bool {
        self.offsets.iter().all(Option::is_none)
    }

    fn begin(&mut self, obj: u32) -> Result<()> {
        let slot = self
            .offsets
            .get_mut(obj as usize - 1)
            .ok_or_else(|| Error::EncodingFailed(format!("object {} was never allocated", obj)))?;
        if slot.is_some() {
            return Err(Error::EncodingFailed(format!("object {} written twice", obj)));
        }
        *slot = Some(self.buf.len());
        self.buf.extend_from_slice(format!("{} 0 obj\n", obj).as_bytes());
        Ok(())
    }

    /// Write a direct object under number `obj`.
    pub fn write_object(&mut self, obj: u32, value: &PdfObject) -> Result<()> {
        self.begin(obj)?;
        value.write_to(&mut self.buf)?;
        self.buf.extend_from_slice(b"\nendobj\n");
        Ok(())
    }

    /// Write a stream whose data is already encoded (the dictionary carries
    /// its `/Filter`, if any).
    pub fn write_raw_stream(&mut self, obj: u32, mut dict: PdfDictionary, data: &[u8]) -> Result<()> {
        dict.set("Length", PdfObject::Integer(data.len() as i64));
        self.begin(obj)?;
        PdfObject::Dictionary(dict).write_to(&mut self.buf)?;
        self.buf.extend_from_slice(b"\nstream\n");
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        Ok(())
    }

    /// Write a stream, deflating it when compression is on.
    pub fn write_stream(&mut self, obj: u32, mut dict: PdfDictionary, data: &[u8]) -> Result<()> {
        if self.compress {
            dict.set("Filter", PdfObject::name("FlateDecode"));
            let packed = deflate(data)?;
            self.write_raw_stream(obj, dict, &packed)
        } else {
            self.write_raw_stream(obj, dict, data)
        }
    }

    /// Write the xref table and trailer, returning the finished file.
    pub fn finish(mut self, catalog: u32, info: Option<u32>) -> Result<Vec<u8>> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (i, offset) in self.offsets.iter().enumerate() {
            match offset {
                Some(o) => table.push_str(&format!("{:010} 00000 n \n", o)),
                None => {
                    return Err(Error::EncodingFailed(format!(
                        "object {} was allocated but never written",
                        i + 1
                    )))
                }
            }
        }
        self.buf.extend_from_slice(table.as_bytes());

        let mut trailer = PdfDictionary::new()
            .with("Size", PdfObject::Integer(size as i64))
            .with("Root", PdfObject::reference(catalog));
        if let Some(info) = info {
            trailer.set("Info", PdfObject::reference(info));
        }
        self.buf.extend_from_slice(b"trailer\n");
        PdfObject::Dictionary(trailer).write_to(&mut self.buf)?;
        self.buf
            .extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        Ok(self.buf)
    }
}

/// zlib-compress a buffer.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn pdf_date(date: &DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// The document information dictionary.
pub fn info_dictionary(metadata: &Metadata) -> PdfDictionary {
    let mut dict = PdfDictionary::new();
    let fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
        ("Creator", &metadata.creator),
    ];
    for (key, value) in fields {
        if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            dict.set(key, PdfObject::text(v));
        }
    }
    let producer = metadata
        .producer
        .clone()
        .unwrap_or_else(|| format!("resume-export {}", crate::VERSION));
    dict.set("Producer", PdfObject::text(&producer));
    let created = metadata.created.unwrap_or_else(Utc::now);
    dict.set("CreationDate", PdfObject::text(&pdf_date(&created)));
    dict
}
