//! The recursive-descent Wikitext grammar.
//!
//! Every production opens a context frame that is either accepted, advancing
//! the cursor, or fallen back, restoring it. A failed alternative is an
//! `Option::None`, never an error; the characters it looked at are consumed
//! by a lower-priority alternative instead, so every input parses.

use crate::{
    config::ParserOptions,
    nodes::{
        ArgumentReference, AttributeQuote, Comment, ExternalLink, FormatSwitch, Heading,
        HeadingLevel, HtmlTag, InlineNode, LineNode, ListItem, Paragraph, ParserTag, PlainText,
        Run, TagAttribute, TagAttributeValue, TagData, Template, TemplateArgument, WikiLink,
        Wikitext,
    },
    scanner::ParseState,
    terminator,
};
use fancy_regex::Regex;
use std::sync::LazyLock;

/// Whitespace that may sit between the two line breaks of a blank line.
const LINE_END_WHITESPACE: &str = r"[\f\r\t\v\x85\p{Z}]+";

/// A position at which a plain text run may be hiding the start of a more
/// interesting construct: a link, a brace construct, a tag or comment, an
/// apostrophe toggle, or an autolinkable URL.
static SUSPECT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\[",
        r"|\{\{\{?",
        r"|<(?:\s*\w|!--)",
        r"|(?:'{5}|'''|'')(?!')",
        r"|(?:(?i:\bhttps?:|\bftp:|\birc:|\bgopher:)//|//|(?i:\bnews:|\bmailto:))",
    ))
    .unwrap()
});

/// The URL token of a bare or bracketed external link. Trailing punctuation
/// is handed back so that a sentence-ending URL does not swallow its period.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\A(?:(?i:\bhttps?:|\bftp:|\birc:|\bgopher:)//|//|(?i:\bnews:|\bmailto:))",
        r#"(?:[^\x00-\x20\s"\[\]\x7f|{}<>]|<[^>]*>)+"#,
        r#"(?<![!"().,:;‘-•])"#,
    ))
    .unwrap()
});

/// A Wikitext parser.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    /// The configuration for the parser.
    options: &'a ParserOptions,
}

impl<'a> Parser<'a> {
    /// Creates a new parser with the given options.
    pub fn new(options: &'a ParserOptions) -> Self {
        Self { options }
    }

    /// Parses `source` into an AST.
    ///
    /// Parsing never fails; malformed constructs come back as plain text.
    pub fn parse(&self, source: &str) -> Wikitext {
        log::trace!("parsing {} bytes of wikitext", source.len());
        let mut state = ParseState::new(self.options, source);
        let document = state.parse_wikitext();
        debug_assert_eq!(state.position, source.len(), "input fully consumed");
        document
    }
}

/// How a run production selects its non-expandable children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RunMode {
    /// The full inline set.
    Run,
    /// Plain text only; structural inlines are forbidden here.
    ExpandableText,
    /// URL tokens only.
    ExpandableUrl,
}

/// The outcome of the line-end rule.
enum LineEnd {
    /// A terminator other than a line break was reached; the document ends.
    End,
    /// The document continues on the next line.
    Continued,
    /// The document continues, starting with this extra paragraph.
    Extra(Paragraph),
}

/// Appends `text` to the container, merging with a trailing plain text node.
fn append_text(inlines: &mut Vec<InlineNode>, text: &str) {
    if let Some(InlineNode::PlainText(last)) = inlines.last_mut() {
        last.content.push_str(text);
    } else {
        inlines.push(InlineNode::PlainText(PlainText {
            content: text.to_string(),
        }));
    }
}

/// Appends a parsed child to the container. Adjacent plain text children are
/// coalesced; the grammar produces text in chunks.
fn push_inline(inlines: &mut Vec<InlineNode>, node: InlineNode) {
    if let InlineNode::PlainText(text) = &node
        && let Some(InlineNode::PlainText(last)) = inlines.last_mut()
    {
        last.content.push_str(&text.content);
        return;
    }
    inlines.push(node);
}

/// Closes the trailing paragraph of `lines`, if there is one.
fn close_last_paragraph(lines: &mut [LineNode]) {
    if let Some(LineNode::Paragraph(paragraph)) = lines.last_mut() {
        paragraph.compact = false;
    }
}

impl<'a> ParseState<'a> {
    //
    // Block flow
    //

    /// Parses a document: a sequence of lines separated by line ends.
    pub(crate) fn parse_wikitext(&mut self) -> Wikitext {
        self.push(None, true);
        let mut lines = Vec::new();
        if !self.needs_terminate(None) {
            loop {
                self.parse_line(&mut lines);
                match self.parse_line_end(&mut lines) {
                    LineEnd::End => break,
                    LineEnd::Extra(paragraph) => lines.push(LineNode::Paragraph(paragraph)),
                    LineEnd::Continued => {}
                }
                if self.needs_terminate(None) {
                    break;
                }
            }
        }
        self.accept();
        Wikitext { lines }
    }

    /// Parses one line into `lines`, either as a new line node or by merging
    /// into a trailing compact paragraph.
    fn parse_line(&mut self, lines: &mut Vec<LineNode>) {
        self.push(Some(r"\n"), true);
        if let Some(item) = self.parse_list_item() {
            lines.push(LineNode::ListItem(item));
        } else if let Some(heading) = self.parse_heading() {
            lines.push(LineNode::Heading(heading));
        } else {
            self.parse_compact_paragraph(lines);
        }
        self.accept();
    }

    /// Parses a list item, horizontal rule, or preformatted line.
    fn parse_list_item(&mut self) -> Option<ListItem> {
        self.push(None, true);
        let Some(prefix) = self.consume(r"[*#:;]+|-{4,}| ") else {
            self.fallback();
            return None;
        };
        let mut inlines = Vec::new();
        // The content is optional; a bare bullet is a valid item.
        self.parse_run(RunMode::Run, &mut inlines);
        self.accept();
        Some(ListItem {
            prefix: prefix.to_string(),
            inlines,
        })
    }

    /// Parses a heading.
    ///
    /// Level matching is greedy but both sides must balance at the end of the
    /// line, so candidates are tried from the deepest level downwards.
    fn parse_heading(&mut self) -> Option<Heading> {
        let equals = self.look_ahead(r"={1,6}")?;
        let deepest = u8::try_from(equals.len()).unwrap_or(6);
        for level in (1..=deepest).rev() {
            self.push(None, true);
            if self.consume(&format!("={{{level}}}")).is_none() {
                self.fallback();
                continue;
            }
            let closing = format!(r"(?m)={{{level}}}$");
            self.push(Some(&closing), true);
            let mut inlines = Vec::new();
            let has_content = self.parse_run(RunMode::Run, &mut inlines);
            self.accept();
            if has_content && self.consume(&closing).is_some() {
                self.accept();
                let level = HeadingLevel::try_from(level).expect("level is 1..=6");
                return Some(Heading { level, inlines });
            }
            self.fallback();
        }
        None
    }

    /// Parses a paragraph line. Always succeeds: the line is merged into a
    /// trailing compact paragraph when there is one, and becomes a new
    /// (possibly empty) compact paragraph otherwise.
    fn parse_compact_paragraph(&mut self, lines: &mut Vec<LineNode>) {
        if let Some(LineNode::Paragraph(paragraph)) = lines.last_mut()
            && paragraph.compact
        {
            // The previous line continues here. Its line break was consumed
            // by the line-end rule and becomes paragraph content.
            append_text(&mut paragraph.inlines, "\n");
            self.parse_run(RunMode::Run, &mut paragraph.inlines);
            return;
        }
        let mut paragraph = Paragraph {
            inlines: Vec::new(),
            compact: true,
        };
        self.parse_run(RunMode::Run, &mut paragraph.inlines);
        lines.push(LineNode::Paragraph(paragraph));
    }

    /// Terminates a line, deciding whether the trailing paragraph closes.
    ///
    /// ```text
    /// abc TERM          -> compact [abc]
    /// abc \n TERM       -> closed  [abc]
    /// abc \n ws \n TERM -> closed  [abc], compact [ws]
    /// ```
    fn parse_line_end(&mut self, lines: &mut [LineNode]) -> LineEnd {
        self.push(None, true);
        if self.consume(r"\n").is_none() {
            // A terminator other than the line break was reached.
            self.fallback();
            return LineEnd::End;
        }
        // Whitespace between two line breaks, held speculatively.
        self.push(None, true);
        let ws = self.consume(LINE_END_WHITESPACE);
        let unclosed = matches!(lines.last(), Some(LineNode::Paragraph(p)) if p.compact);
        let line_break = terminator::get(r"\n");
        if unclosed {
            if self.consume(r"\n").is_some() {
                // A blank line; the paragraph ends here.
                close_last_paragraph(lines);
                if self.needs_terminate(Some(&line_break)) {
                    let mut extra = Paragraph {
                        inlines: Vec::new(),
                        compact: true,
                    };
                    if let Some(ws) = ws {
                        append_text(&mut extra.inlines, ws);
                    }
                    self.accept();
                    self.accept();
                    return LineEnd::Extra(extra);
                }
                self.accept();
                self.accept();
                return LineEnd::Continued;
            }
            if self.needs_terminate(None) {
                // A single line break straight into the terminator.
                close_last_paragraph(lines);
                self.accept();
                self.accept();
                return LineEnd::Continued;
            }
        } else if self.needs_terminate(Some(&line_break)) {
            // A heading or list item followed by trailing whitespace at the
            // end of the document becomes an open paragraph.
            let mut extra = Paragraph {
                inlines: Vec::new(),
                compact: true,
            };
            if let Some(ws) = ws {
                append_text(&mut extra.inlines, ws);
            }
            self.accept();
            self.accept();
            return LineEnd::Extra(extra);
        }
        // The line continues; hand back the speculative whitespace.
        self.fallback();
        self.accept();
        LineEnd::Continued
    }

    //
    // Inline flow
    //

    /// Produces inline children into `inlines` until the frame terminator
    /// matches or nothing more can be produced. Returns whether at least one
    /// child was added.
    fn parse_run(&mut self, mode: RunMode, inlines: &mut Vec<InlineNode>) -> bool {
        let mut any = false;
        loop {
            if self.needs_terminate(None) {
                break;
            }
            // Expandable constructs may appear in any run mode.
            if let Some(node) = self.parse_expandable() {
                push_inline(inlines, node);
                any = true;
                continue;
            }
            let node = match mode {
                RunMode::Run => self.parse_inline(),
                RunMode::ExpandableText => self.parse_partial_plain_text(),
                RunMode::ExpandableUrl => self.parse_url_text(),
            };
            match node {
                Some(node) => {
                    push_inline(inlines, node);
                    any = true;
                }
                None => break,
            }
        }
        any
    }

    /// Parses one inline node, trying the alternatives in priority order.
    fn parse_inline(&mut self) -> Option<InlineNode> {
        if let Some(node) = self.parse_tag() {
            return Some(node);
        }
        if let Some(node) = self.parse_wiki_link() {
            return Some(InlineNode::WikiLink(node));
        }
        if let Some(node) = self.parse_external_link() {
            return Some(InlineNode::ExternalLink(node));
        }
        if let Some(node) = self.parse_format_switch() {
            return Some(node);
        }
        self.parse_partial_plain_text()
    }

    /// Parses an internal link. Wikilinks do not nest within themselves.
    fn parse_wiki_link(&mut self) -> Option<WikiLink> {
        self.push(Some(r"\||\n|\[\[|\]\]"), true);
        if self.consume(r"\[\[").is_none() {
            self.fallback();
            return None;
        }
        let mut target = Run::default();
        if !self.parse_run(RunMode::ExpandableText, &mut target.inlines) {
            self.fallback();
            return None;
        }
        let text = if self.consume(r"\|").is_some() {
            // Past the first pipe, further pipes are literal text.
            self.push(Some(r"\n|\[\[|\]\]"), false);
            let mut text = Run::default();
            // The text may be empty, which is distinct from absent.
            self.parse_run(RunMode::Run, &mut text.inlines);
            self.accept();
            Some(text)
        } else {
            None
        };
        if self.consume(r"\]\]").is_none() {
            self.fallback();
            return None;
        }
        self.accept();
        Some(WikiLink { target, text })
    }

    /// Parses a bracketed or bare external link.
    fn parse_external_link(&mut self) -> Option<ExternalLink> {
        self.push(Some(r"[\s\]\|]"), true);
        let brackets = self.consume(r"\[").is_some();
        let mut target = Run::default();
        if brackets {
            if !self.parse_run(RunMode::ExpandableUrl, &mut target.inlines) {
                self.fallback();
                return None;
            }
        } else {
            match self.parse_url_text() {
                Some(url) => target.inlines.push(url),
                None => {
                    self.fallback();
                    return None;
                }
            }
        }
        let mut text = None;
        if brackets {
            if let Some(delimiter) = self.consume(r"[ \t]") {
                self.push(Some(r"[\]\n]"), false);
                let mut run = Run::default();
                // Keep the separator with the text so the node round-trips.
                append_text(&mut run.inlines, delimiter);
                self.parse_run(RunMode::Run, &mut run.inlines);
                self.accept();
                text = Some(run);
            }
            if self.consume(r"\]").is_none() {
                self.fallback();
                return None;
            }
        }
        self.accept();
        Some(ExternalLink {
            target,
            text,
            brackets,
        })
    }

    /// Parses an apostrophe toggle. A lone run of four apostrophes never
    /// matches; the extra apostrophe falls through as plain text.
    fn parse_format_switch(&mut self) -> Option<InlineNode> {
        let token = self.consume(r"('{5}|'''|'')(?!')")?;
        let (switch_bold, switch_italics) = match token.len() {
            5 => (true, true),
            3 => (true, false),
            _ => (false, true),
        };
        Some(InlineNode::FormatSwitch(FormatSwitch {
            switch_bold,
            switch_italics,
        }))
    }

    /// Consumes at least one character of plain text, stopping early where a
    /// higher-priority construct might begin.
    fn parse_partial_plain_text(&mut self) -> Option<InlineNode> {
        if self.position >= self.source.len() {
            return None;
        }
        let terminator_pos = self.find_terminator(1);
        let search_from = self.char_boundary_from(self.position + 1);
        let suspect = SUSPECT_END
            .find_from_pos(self.source, search_from)
            .ok()
            .flatten()
            .map(|m| m.start())
            .filter(|start| *start < terminator_pos);
        let end = suspect.unwrap_or(terminator_pos);
        let content = self.consume_until(end).to_string();
        Some(InlineNode::PlainText(PlainText { content }))
    }

    /// Consumes a single URL token.
    fn parse_url_text(&mut self) -> Option<InlineNode> {
        let matched = URL
            .find(&self.source[self.position..])
            .ok()
            .flatten()?;
        let content = self
            .consume_until(self.position + matched.end())
            .to_string();
        Some(InlineNode::PlainText(PlainText { content }))
    }

    //
    // Expandable constructs
    //

    /// Parses a construct that MediaWiki substitutes at transclusion time.
    /// These may appear in any run mode.
    fn parse_expandable(&mut self) -> Option<InlineNode> {
        if let Some(node) = self.parse_argument_reference() {
            return Some(InlineNode::ArgumentReference(node));
        }
        if let Some(node) = self.parse_template() {
            return Some(InlineNode::Template(node));
        }
        self.parse_comment().map(InlineNode::Comment)
    }

    /// Parses a `{{{name|default}}}` argument reference.
    fn parse_argument_reference(&mut self) -> Option<ArgumentReference> {
        self.push(Some(r"\}\}\}"), false);
        if self.consume(r"\{\{\{").is_none() {
            self.fallback();
            return None;
        }
        self.push(Some(r"\|"), true);
        let name = self.parse_wikitext();
        self.accept();
        let default_value = if self.consume(r"\|").is_some() {
            Some(self.parse_wikitext())
        } else {
            None
        };
        if self.consume(r"\}\}\}").is_none() {
            self.fallback();
            return None;
        }
        self.accept();
        Some(ArgumentReference {
            name,
            default_value,
        })
    }

    /// Parses a `{{name|…}}` template transclusion.
    fn parse_template(&mut self) -> Option<Template> {
        self.push(Some(r"\}\}"), false);
        if self.consume(r"\{\{").is_none() {
            self.fallback();
            return None;
        }
        let mut name = Run::default();
        self.push(Some(r"\|"), true);
        let has_name = self.parse_run(RunMode::ExpandableText, &mut name.inlines);
        self.accept();
        if !has_name {
            self.fallback();
            return None;
        }
        let mut arguments = Vec::new();
        while self.consume(r"\|").is_some() {
            arguments.push(self.parse_template_argument());
        }
        if self.consume(r"\}\}").is_none() {
            self.fallback();
            return None;
        }
        self.accept();
        Some(Template { name, arguments })
    }

    /// Parses one template argument, splitting `name=value` on the first
    /// top-level equals sign. Always succeeds; the value may be empty.
    fn parse_template_argument(&mut self) -> TemplateArgument {
        self.push(Some(r"\|"), true);
        // Speculatively read a name.
        self.push(None, true);
        self.push(Some(r"="), true);
        let name = self.parse_wikitext();
        self.accept();
        if self.consume(r"=").is_some() {
            self.accept();
            let value = self.parse_wikitext();
            self.accept();
            return TemplateArgument {
                name: Some(name),
                value,
            };
        }
        // No equals sign: the whole argument is an anonymous value.
        self.fallback();
        let value = self.parse_wikitext();
        self.accept();
        TemplateArgument { name: None, value }
    }

    /// Parses an HTML comment. The content is opaque, crossing any enclosing
    /// terminator; an unterminated comment is not a comment.
    fn parse_comment(&mut self) -> Option<Comment> {
        self.push(None, true);
        if self.consume(r"<!--").is_none() {
            self.fallback();
            return None;
        }
        let tail = &self.source.as_bytes()[self.position..];
        let Some(index) = memchr::memmem::find(tail, b"-->") else {
            self.fallback();
            return None;
        };
        let content = self.consume_until(self.position + index).to_string();
        self.consume_until(self.position + "-->".len());
        self.accept();
        Some(Comment { content })
    }

    //
    // Tags
    //

    /// Parses an extension or HTML tag. Unrecognized names and unmatched
    /// closing tags fall back to plain text.
    fn parse_tag(&mut self) -> Option<InlineNode> {
        self.push(None, true);
        if self.consume(r"<").is_none() {
            self.fallback();
            return None;
        }
        let Some(name) = self.consume(r"[a-zA-Z][\w-]*") else {
            self.fallback();
            return None;
        };
        let is_parser_tag = self.options.is_parser_tag(name);
        if !is_parser_tag && !self.options.is_html_tag(name) {
            self.fallback();
            return None;
        }
        let mut attributes = Vec::new();
        let trailing_whitespace = loop {
            let ws = self.consume(r"\s+");
            if self.look_ahead(r"/?>").is_some() {
                break ws.unwrap_or_default().to_string();
            }
            // An attribute must be separated from what precedes it.
            let Some(ws) = ws else {
                self.fallback();
                return None;
            };
            let Some(attribute) = self.parse_tag_attribute(ws.to_string()) else {
                self.fallback();
                return None;
            };
            attributes.push(attribute);
        };
        let self_closing = self.consume(r"/>").is_some();
        if !self_closing && self.consume(r">").is_none() {
            self.fallback();
            return None;
        }
        let name = name.to_string();
        if self_closing {
            let tag = TagData::new(
                name,
                None,
                attributes,
                trailing_whitespace,
                String::new(),
                true,
            );
            self.accept();
            return Some(if is_parser_tag {
                InlineNode::ParserTag(ParserTag { tag, content: None })
            } else {
                InlineNode::HtmlTag(HtmlTag { tag, content: None })
            });
        }
        let fold = !is_parser_tag || self.options.case_fold_parser_tags;
        let close_pattern = if fold {
            format!(r"(?i)</{name}\s*>")
        } else {
            format!(r"</{name}\s*>")
        };
        if is_parser_tag {
            // Raw content: scan straight to the closing tag, crossing any
            // enclosing terminator.
            let close = terminator::get(&close_pattern);
            let Some(start) = close.find_from(self.source, self.position) else {
                self.fallback();
                return None;
            };
            let content = self.consume_until(start).to_string();
            let (closing_tag_name, closing_ws) = self.consume_closing_tag(&name);
            let tag = TagData::new(
                name,
                closing_tag_name,
                attributes,
                trailing_whitespace,
                closing_ws,
                false,
            );
            self.accept();
            Some(InlineNode::ParserTag(ParserTag {
                tag,
                content: Some(content),
            }))
        } else {
            self.push(Some(&close_pattern), true);
            let content = self.parse_wikitext();
            self.accept();
            if self.look_ahead(&close_pattern).is_none() {
                self.fallback();
                return None;
            }
            let (closing_tag_name, closing_ws) = self.consume_closing_tag(&name);
            let tag = TagData::new(
                name,
                closing_tag_name,
                attributes,
                trailing_whitespace,
                closing_ws,
                false,
            );
            self.accept();
            Some(InlineNode::HtmlTag(HtmlTag {
                tag,
                content: Some(content),
            }))
        }
    }

    /// Consumes a closing tag known to sit at the cursor, returning the
    /// written name (when it differs from the opening name) and the
    /// whitespace before its `>`.
    fn consume_closing_tag(&mut self, opening_name: &str) -> (Option<String>, String) {
        self.consume(r"</");
        let written = self.consume(r"[a-zA-Z][\w-]*").unwrap_or_default();
        let ws = self.consume(r"\s*").unwrap_or_default().to_string();
        self.consume(r">");
        let closing_tag_name = (written != opening_name).then(|| written.to_string());
        (closing_tag_name, ws)
    }

    /// Parses one tag attribute, `leading_whitespace` already consumed.
    fn parse_tag_attribute(&mut self, leading_whitespace: String) -> Option<TagAttribute> {
        self.push(None, true);
        let mut name = Run::default();
        self.push(Some(r"[\s=/>]"), true);
        let has_name = self.parse_run(RunMode::ExpandableText, &mut name.inlines);
        self.accept();
        if !has_name {
            self.fallback();
            return None;
        }
        // Speculatively read `= value`.
        self.push(None, true);
        let whitespace_before = self.consume(r"\s*").unwrap_or_default().to_string();
        let value = if self.consume(r"=").is_some() {
            let whitespace_after = self.consume(r"\s*").unwrap_or_default().to_string();
            let (quote, quote_pattern) = if self.consume("\"").is_some() {
                (AttributeQuote::Double, Some("\""))
            } else if self.consume(r"'").is_some() {
                (AttributeQuote::Single, Some(r"'"))
            } else {
                (AttributeQuote::None, None)
            };
            let value = if let Some(quote_pattern) = quote_pattern {
                self.push(Some(quote_pattern), true);
                let value = self.parse_wikitext();
                self.accept();
                if self.consume(quote_pattern).is_none() {
                    // Unterminated quote: the whole attribute fails.
                    self.fallback();
                    self.fallback();
                    return None;
                }
                value
            } else {
                self.push(Some(r"[\s>]|/>"), true);
                let value = self.parse_wikitext();
                self.accept();
                value
            };
            self.accept();
            Some(TagAttributeValue {
                whitespace_before,
                whitespace_after,
                quote,
                value,
            })
        } else {
            self.fallback();
            None
        };
        self.accept();
        Some(TagAttribute::new(leading_whitespace, name, value))
    }
}
