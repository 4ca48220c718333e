//! The Wikitext AST node taxonomy.
//!
//! Every node stringifies back to the source text it was parsed from via
//! [`core::fmt::Display`]; a document round-trips byte-for-byte for
//! well-formed input. Nodes own their children outright, so cloning a node
//! deep-copies its content and the clone starts out detached.

use core::fmt::{self, Display};

/// An error raised by a node mutation guard.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A whitespace-only field was given non-whitespace content.
    #[error("the field accepts only whitespace")]
    NotWhitespace,
    /// A tag with content cannot be made self-closing.
    #[error("cannot self-close a tag that has content")]
    HasContent,
}

/// Validates that `text` is acceptable for a whitespace-only field.
fn check_whitespace(text: &str, allow_empty: bool) -> Result<(), NodeError> {
    if (!allow_empty && text.is_empty()) || !text.chars().all(char::is_whitespace) {
        return Err(NodeError::NotWhitespace);
    }
    Ok(())
}

/// A parsed Wikitext document, or a document-valued part of one (template
/// argument values and argument-reference names are also `Wikitext`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Wikitext {
    /// The lines of the document, in source order.
    pub lines: Vec<LineNode>,
}

impl fmt::Display for Wikitext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines.iter().enumerate() {
            if index != 0 {
                f.write_str("\n")?;
            }
            line.fmt(f)?;
        }
        Ok(())
    }
}

/// A line-level node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineNode {
    /// A paragraph.
    Paragraph(Paragraph),
    /// A heading.
    Heading(Heading),
    /// A list item, horizontal rule, or preformatted line.
    ListItem(ListItem),
}

impl fmt::Display for LineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineNode::Paragraph(node) => node.fmt(f),
            LineNode::Heading(node) => node.fmt(f),
            LineNode::ListItem(node) => node.fmt(f),
        }
    }
}

/// A paragraph.
///
/// A compact paragraph is still open: subsequent input lines may be appended
/// to it. Only the line-end rule closes a paragraph, when it consumes the
/// blank line that the closed form stringifies back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Paragraph {
    /// The paragraph content. Interior line breaks are part of the content.
    pub inlines: Vec<InlineNode>,
    /// Whether the paragraph is still open for appending.
    pub compact: bool,
}

impl fmt::Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_inlines(f, &self.inlines)?;
        if !self.compact {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// A heading.
///
/// ```wikitext
/// == Title ==
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Heading {
    /// The heading outline level.
    pub level: HeadingLevel,
    /// The heading content, including any surrounding spaces.
    pub inlines: Vec<InlineNode>,
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bar = "======";
        let bar = &bar[..usize::from(u8::from(self.level))];
        f.write_str(bar)?;
        fmt_inlines(f, &self.inlines)?;
        f.write_str(bar)
    }
}

/// A conversion error for out-of-range heading levels.
#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid heading level")]
pub struct HeadingRangeError(u8);

/// A heading level, 1 through 6.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct HeadingLevel(u8);

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = HeadingRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HeadingRangeError(value))
        }
    }
}

/// A list item. The prefix distinguishes bullet, numbered, definition, and
/// indented items, horizontal rules, and space-preformatted lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListItem {
    /// The item prefix: `[*#:;]+`, `----`-or-longer, or a single space.
    pub prefix: String,
    /// The item content.
    pub inlines: Vec<InlineNode>,
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        fmt_inlines(f, &self.inlines)
    }
}

/// A sequence of inline nodes confined to a single logical line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Run {
    /// The inline content.
    pub inlines: Vec<InlineNode>,
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_inlines(f, &self.inlines)
    }
}

/// Writes a slice of inline nodes.
fn fmt_inlines(f: &mut fmt::Formatter<'_>, inlines: &[InlineNode]) -> fmt::Result {
    for inline in inlines {
        inline.fmt(f)?;
    }
    Ok(())
}

/// An inline-level node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InlineNode {
    /// A run of plain text.
    PlainText(PlainText),
    /// A bold/italics toggle.
    FormatSwitch(FormatSwitch),
    /// An internal link.
    WikiLink(WikiLink),
    /// An external link, bracketed or bare.
    ExternalLink(ExternalLink),
    /// A template transclusion.
    Template(Template),
    /// A template argument reference.
    ArgumentReference(ArgumentReference),
    /// An HTML comment.
    Comment(Comment),
    /// An extension tag with opaque content.
    ParserTag(ParserTag),
    /// An HTML tag whose content is Wikitext.
    HtmlTag(HtmlTag),
}

impl fmt::Display for InlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineNode::PlainText(node) => node.fmt(f),
            InlineNode::FormatSwitch(node) => node.fmt(f),
            InlineNode::WikiLink(node) => node.fmt(f),
            InlineNode::ExternalLink(node) => node.fmt(f),
            InlineNode::Template(node) => node.fmt(f),
            InlineNode::ArgumentReference(node) => node.fmt(f),
            InlineNode::Comment(node) => node.fmt(f),
            InlineNode::ParserTag(node) => node.fmt(f),
            InlineNode::HtmlTag(node) => node.fmt(f),
        }
    }
}

/// A run of plain text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlainText {
    /// The text.
    pub content: String,
}

impl fmt::Display for PlainText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// A bold and/or italics toggle.
///
/// ```wikitext
/// '''bold''' and ''italic'' and '''''both'''''
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormatSwitch {
    /// Whether the switch toggles bold.
    pub switch_bold: bool,
    /// Whether the switch toggles italics.
    pub switch_italics: bool,
}

impl fmt::Display for FormatSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.switch_bold, self.switch_italics) {
            (true, true) => "'''''",
            (true, false) => "'''",
            (false, true) => "''",
            (false, false) => "",
        })
    }
}

/// An internal link.
///
/// ```wikitext
/// [[Target|displayed text]]
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WikiLink {
    /// The link target. Never contains a line break.
    pub target: Run,
    /// The displayed text, if a `|` was present. May be empty, which is
    /// distinct from absent.
    pub text: Option<Run>,
}

impl fmt::Display for WikiLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}", self.target)?;
        if let Some(text) = &self.text {
            write!(f, "|{text}")?;
        }
        f.write_str("]]")
    }
}

/// An external link.
///
/// ```wikitext
/// [https://example.com displayed text]
/// https://example.com
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternalLink {
    /// The link target. Never contains whitespace or `]`.
    pub target: Run,
    /// The displayed text, if any. Includes the whitespace character that
    /// separated it from the target, so the node round-trips exactly.
    pub text: Option<Run>,
    /// Whether the link was bracketed.
    pub brackets: bool,
}

impl fmt::Display for ExternalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.brackets {
            f.write_str("[")?;
        }
        self.target.fmt(f)?;
        if let Some(text) = &self.text {
            text.fmt(f)?;
        }
        if self.brackets {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// A template transclusion.
///
/// ```wikitext
/// {{Name|anonymous|name=value}}
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    /// The template name.
    pub name: Run,
    /// The template arguments, in source order.
    pub arguments: Vec<TemplateArgument>,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", self.name)?;
        for argument in &self.arguments {
            write!(f, "|{argument}")?;
        }
        f.write_str("}}")
    }
}

/// A single template argument. Anonymous when `name` is `None`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateArgument {
    /// The argument name, for `name=value` arguments.
    pub name: Option<Wikitext>,
    /// The argument value.
    pub value: Wikitext,
}

impl fmt::Display for TemplateArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}=")?;
        }
        self.value.fmt(f)
    }
}

/// A template argument reference.
///
/// ```wikitext
/// {{{name|default value}}}
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArgumentReference {
    /// The referenced argument name.
    pub name: Wikitext,
    /// The default value, if a `|` was present.
    pub default_value: Option<Wikitext>,
}

impl fmt::Display for ArgumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{{{}", self.name)?;
        if let Some(default_value) = &self.default_value {
            write!(f, "|{default_value}")?;
        }
        f.write_str("}}}")
    }
}

/// An HTML comment. The content is opaque.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    /// The text between `<!--` and `-->`.
    pub content: String,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<!--{}-->", self.content)
    }
}

/// The data common to both tag node variants.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagData {
    /// The tag name, as written in the opening tag.
    pub name: String,
    /// The closing tag name, when it differs textually from `name`.
    pub closing_tag_name: Option<String>,
    /// The tag attributes.
    pub attributes: Vec<TagAttribute>,
    /// Whitespace between the last attribute and `>` (or `/>`).
    trailing_whitespace: String,
    /// Whitespace between the closing tag name and its `>`.
    closing_tag_trailing_whitespace: String,
    /// Whether the tag was written in self-closing form.
    self_closing: bool,
}

impl TagData {
    /// Creates tag data from parsed parts.
    pub(crate) fn new(
        name: String,
        closing_tag_name: Option<String>,
        attributes: Vec<TagAttribute>,
        trailing_whitespace: String,
        closing_tag_trailing_whitespace: String,
        self_closing: bool,
    ) -> Self {
        Self {
            name,
            closing_tag_name,
            attributes,
            trailing_whitespace,
            closing_tag_trailing_whitespace,
            self_closing,
        }
    }

    /// Whitespace between the last attribute and the end of the opening tag.
    pub fn trailing_whitespace(&self) -> &str {
        &self.trailing_whitespace
    }

    /// Replaces the opening tag's trailing whitespace.
    pub fn set_trailing_whitespace(&mut self, text: impl Into<String>) -> Result<(), NodeError> {
        let text = text.into();
        check_whitespace(&text, true)?;
        self.trailing_whitespace = text;
        Ok(())
    }

    /// Whitespace between the closing tag name and its `>`.
    pub fn closing_tag_trailing_whitespace(&self) -> &str {
        &self.closing_tag_trailing_whitespace
    }

    /// Replaces the closing tag's trailing whitespace.
    pub fn set_closing_tag_trailing_whitespace(
        &mut self,
        text: impl Into<String>,
    ) -> Result<(), NodeError> {
        let text = text.into();
        check_whitespace(&text, true)?;
        self.closing_tag_trailing_whitespace = text;
        Ok(())
    }

    /// Whether the tag was written in self-closing form.
    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Writes the opening tag up to, but not including, its `>` or `/>`.
    fn fmt_open(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for attribute in &self.attributes {
            attribute.fmt(f)?;
        }
        f.write_str(&self.trailing_whitespace)
    }

    /// Writes the closing tag.
    fn fmt_close(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "</{}{}>",
            self.closing_tag_name.as_deref().unwrap_or(&self.name),
            self.closing_tag_trailing_whitespace
        )
    }
}

/// An extension tag whose content is not re-parsed.
///
/// ```wikitext
/// <nowiki>[[not a link]]</nowiki>
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParserTag {
    /// The common tag data.
    pub tag: TagData,
    /// The raw tag content. `None` for a self-closing tag.
    pub content: Option<String>,
}

impl ParserTag {
    /// Switches the tag between self-closing and open/close form. A tag with
    /// non-empty content cannot be made self-closing.
    pub fn set_self_closing(&mut self, self_closing: bool) -> Result<(), NodeError> {
        if self_closing && self.content.as_ref().is_some_and(|c| !c.is_empty()) {
            return Err(NodeError::HasContent);
        }
        self.tag.self_closing = self_closing;
        Ok(())
    }
}

impl fmt::Display for ParserTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tag.fmt_open(f)?;
        if self.tag.self_closing {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        if let Some(content) = &self.content {
            f.write_str(content)?;
        }
        self.tag.fmt_close(f)
    }
}

/// An HTML tag whose content is parsed as Wikitext.
///
/// ```wikitext
/// <span class="x">''content''</span>
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HtmlTag {
    /// The common tag data.
    pub tag: TagData,
    /// The parsed tag content. `None` for a self-closing tag.
    pub content: Option<Wikitext>,
}

impl HtmlTag {
    /// Switches the tag between self-closing and open/close form. A tag with
    /// non-empty content cannot be made self-closing.
    pub fn set_self_closing(&mut self, self_closing: bool) -> Result<(), NodeError> {
        if self_closing && self.content.as_ref().is_some_and(|c| !c.lines.is_empty()) {
            return Err(NodeError::HasContent);
        }
        self.tag.self_closing = self_closing;
        Ok(())
    }
}

impl fmt::Display for HtmlTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tag.fmt_open(f)?;
        if self.tag.self_closing {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        if let Some(content) = &self.content {
            content.fmt(f)?;
        }
        self.tag.fmt_close(f)
    }
}

/// A tag attribute.
///
/// ```wikitext
/// <tag name="value">
///     ^^^^^^^^^^^^^
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagAttribute {
    /// The whitespace before the attribute name. Always non-empty.
    leading_whitespace: String,
    /// The attribute name.
    pub name: Run,
    /// The attribute value, if an `=` was present.
    pub value: Option<TagAttributeValue>,
}

impl TagAttribute {
    /// Creates an attribute from parsed parts.
    pub(crate) fn new(
        leading_whitespace: String,
        name: Run,
        value: Option<TagAttributeValue>,
    ) -> Self {
        Self {
            leading_whitespace,
            name,
            value,
        }
    }

    /// The whitespace before the attribute name.
    pub fn leading_whitespace(&self) -> &str {
        &self.leading_whitespace
    }

    /// Replaces the whitespace before the attribute name. The replacement
    /// must be non-empty whitespace.
    pub fn set_leading_whitespace(&mut self, text: impl Into<String>) -> Result<(), NodeError> {
        let text = text.into();
        check_whitespace(&text, false)?;
        self.leading_whitespace = text;
        Ok(())
    }
}

impl fmt::Display for TagAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.leading_whitespace)?;
        self.name.fmt(f)?;
        if let Some(value) = &self.value {
            value.fmt(f)?;
        }
        Ok(())
    }
}

/// The value half of a tag attribute, `= value` with its exact spelling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagAttributeValue {
    /// Whitespace between the attribute name and the `=`.
    pub whitespace_before: String,
    /// Whitespace between the `=` and the value.
    pub whitespace_after: String,
    /// The quote style the value was written with.
    pub quote: AttributeQuote,
    /// The value content.
    pub value: Wikitext,
}

impl fmt::Display for TagAttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = self.quote.as_str();
        write!(
            f,
            "{}={}{quote}{}{quote}",
            self.whitespace_before, self.whitespace_after, self.value
        )
    }
}

/// The quote style of an attribute value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeQuote {
    /// An unquoted value.
    None,
    /// A single-quoted value.
    Single,
    /// A double-quoted value.
    Double,
}

impl AttributeQuote {
    /// The quote character as a string slice, empty for unquoted values.
    fn as_str(self) -> &'static str {
        match self {
            AttributeQuote::None => "",
            AttributeQuote::Single => "'",
            AttributeQuote::Double => "\"",
        }
    }
}
