//! Parser configuration data.

use phf::Set;
use std::collections::HashSet;
use unicase::UniCase;

/// Tag names whose content is opaque to the parser by default.
///
/// These are the extension tags every MediaWiki installation registers whose
/// body must not be re-parsed as Wikitext.
static DEFAULT_PARSER_TAGS: Set<&str> = phf::phf_set! {
    "math", "nowiki", "pre", "ref", "source", "syntaxhighlight",
};

/// HTML5 tags allowed in Wikitext.
///
/// Tags outside this set (and outside the parser-tag set) are left alone as
/// plain text.
static HTML5_TAGS: Set<&str> = phf::phf_set! {
    // Explicit `<a>` tags are forbidden in Wikitext.
    "abbr",
    "b", "bdi", "bdo", "big", "blockquote", "br",
    "caption", "center", "cite", "code",
    "data", "dd", "del", "dfn", "div", "dl", "dt",
    "em",
    "font",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "ins",
    "kbd",
    "li",
    "mark",
    "ol",
    "p",
    "q",
    "rb", "rp", "rt", "rtc", "ruby",
    "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "table", "td", "th", "time", "tr", "tt",
    "u", "ul",
    "var",
    "wbr",
};

/// Configuration for a [`Parser`](crate::Parser).
#[derive(Clone, Debug)]
pub struct ParserOptions {
    /// Tag names whose content is stored as an opaque string instead of being
    /// re-parsed as Wikitext.
    pub parser_tag_names: HashSet<String>,
    /// Whether parser-tag name comparison is case-insensitive.
    pub case_fold_parser_tags: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            parser_tag_names: DEFAULT_PARSER_TAGS
                .iter()
                .map(|tag| (*tag).to_string())
                .collect(),
            case_fold_parser_tags: true,
        }
    }
}

impl ParserOptions {
    /// Returns true if `name` names a parser tag under these options.
    pub(crate) fn is_parser_tag(&self, name: &str) -> bool {
        if self.case_fold_parser_tags {
            let name = UniCase::new(name);
            self.parser_tag_names
                .iter()
                .any(|tag| UniCase::new(tag.as_str()) == name)
        } else {
            self.parser_tag_names.contains(name)
        }
    }

    /// Returns true if `name` is a recognized HTML tag whose content is
    /// re-parsed as Wikitext.
    pub(crate) fn is_html_tag(&self, name: &str) -> bool {
        HTML5_TAGS.contains(name.to_ascii_lowercase().as_str())
    }
}
