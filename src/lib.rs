//! A round-trip-faithful parser for MediaWiki Wikitext.
//!
//! The parser consumes a single input string and produces an abstract syntax
//! tree whose [`Display`](core::fmt::Display) output reproduces the input
//! byte-for-byte for well-formed fragments. Malformed constructs never fail
//! the parse; they fall back to plain text.
//!
//! ```
//! use wikitext_rs::{Parser, ParserOptions};
//!
//! let options = ParserOptions::default();
//! let ast = Parser::new(&options).parse("== Title ==\nhello");
//! assert_eq!(ast.to_string(), "== Title ==\nhello");
//! ```

#![warn(
    clippy::pedantic,
    clippy::missing_docs_in_private_items,
    missing_docs,
    rust_2018_idioms
)]

mod config;
mod nodes;
mod parser;
mod scanner;
mod terminator;
#[cfg(test)]
mod tests;

pub use config::ParserOptions;
pub use nodes::{
    ArgumentReference, AttributeQuote, Comment, ExternalLink, FormatSwitch, Heading, HeadingLevel,
    HeadingRangeError, HtmlTag, InlineNode, LineNode, ListItem, NodeError, Paragraph, ParserTag,
    PlainText, Run, TagAttribute, TagAttributeValue, TagData, Template, TemplateArgument, WikiLink,
    Wikitext,
};
pub use parser::Parser;
