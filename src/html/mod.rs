//! HTML parsing, querying, mutation and serialization.
//!
//! The tree is deliberately small: an arena of nodes with element, text,
//! comment and doctype data. It is rebuilt from the markup string for every
//! action and serialized back afterwards, so node ids never outlive the
//! [`Document`] they came from.

mod dom;
mod entities;
mod selector;
mod serialize;
mod style;
mod tokenizer;

pub use dom::{is_heading, Descendants, Document, ElementData, NodeData, NodeId};
pub use entities::{decode_entities, escape_attr, escape_text};
pub use selector::{SelectorError, SelectorList};
pub use style::{parse_declarations, Declaration};
pub use tokenizer::{is_raw_text_element, is_void_element, tokenize, Attribute, ParseError, Token};
