//! Virtual document model.
//!
//! This module defines the owned visual tree that stands in for a live page:
//! an arena of element and text nodes with attribute and style maps. Every
//! export stage receives the document explicitly instead of reaching for
//! ambient global state.

mod document;
mod node;
mod style;

pub use document::{Metadata, VirtualDocument};
pub use node::{Element, Node, NodeId, NodeKind, NodeTree};
pub use style::{
    parse_length, Border, Color, Display, Sides, Style, TextAlign, DEFAULT_FONT_SIZE, PX_PER_MM,
};
