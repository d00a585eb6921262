//! PDF output.
//!
//! A small object model ([`PdfObject`], [`PdfDictionary`]), a file writer
//! that tracks object offsets for the cross-reference table, and the
//! [`PdfEncoder`] that places a paginated bitmap on physical pages.

mod encoder;
mod objects;
mod writer;

pub use encoder::{encode_image, EncodedImage, PdfEncoder};
pub use objects::{format_real, PdfDictionary, PdfObject, PdfString};
pub use writer::{deflate, info_dictionary, pdf_date, PdfWriter, PDF_VERSION};
