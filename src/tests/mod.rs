use super::*;
use crate::nodes::{InlineNode, LineNode, Wikitext};


/// Parses `source` with default options.
fn parse(source: &str) -> Wikitext {
    let _ = env_logger::try_init();
    let options = ParserOptions::default();
    Parser::new(&options).parse(source)
}

/// Asserts that `source` survives a parse/stringify round trip and that
/// re-parsing the output is idempotent.
#[track_caller]
fn assert_round_trip(source: &str) {
    let printed = parse(source).to_string();
    assert_eq!(printed, source, "round trip of {source:?}");
    assert_eq!(
        parse(&printed).to_string(),
        printed,
        "idempotence of {source:?}"
    );
}

/// The plain text content of an inline node, for shape assertions.
#[track_caller]
fn text_of(node: &InlineNode) -> &str {
    match node {
        InlineNode::PlainText(text) => &text.content,
        other => panic!("expected plain text, got {other:?}"),
    }
}

/// A `(compact, content)` view of a paragraph line.
#[track_caller]
fn paragraph_of(line: &LineNode) -> (bool, String) {
    match line {
        LineNode::Paragraph(paragraph) => {
            let content = paragraph
                .inlines
                .iter()
                .map(ToString::to_string)
                .collect::<String>();
            (paragraph.compact, content)
        }
        other => panic!("expected a paragraph, got {other:?}"),
    }
}

/// Checks every inline sequence in the tree for adjacent plain text nodes.
fn assert_coalesced(document: &Wikitext) {
    fn check_inlines(inlines: &[InlineNode]) {
        for pair in inlines.windows(2) {
            assert!(
                !matches!(
                    pair,
                    [InlineNode::PlainText(_), InlineNode::PlainText(_)]
                ),
                "adjacent plain text nodes: {pair:?}"
            );
        }
        for inline in inlines {
            match inline {
                InlineNode::WikiLink(link) => {
                    check_inlines(&link.target.inlines);
                    if let Some(text) = &link.text {
                        check_inlines(&text.inlines);
                    }
                }
                InlineNode::ExternalLink(link) => {
                    check_inlines(&link.target.inlines);
                    if let Some(text) = &link.text {
                        check_inlines(&text.inlines);
                    }
                }
                InlineNode::Template(template) => {
                    check_inlines(&template.name.inlines);
                    for argument in &template.arguments {
                        if let Some(name) = &argument.name {
                            check(name);
                        }
                        check(&argument.value);
                    }
                }
                InlineNode::ArgumentReference(reference) => {
                    check(&reference.name);
                    if let Some(default_value) = &reference.default_value {
                        check(default_value);
                    }
                }
                InlineNode::HtmlTag(tag) => {
                    if let Some(content) = &tag.content {
                        check(content);
                    }
                }
                _ => {}
            }
        }
    }

    fn check(document: &Wikitext) {
        for line in &document.lines {
            match line {
                LineNode::Paragraph(p) => check_inlines(&p.inlines),
                LineNode::Heading(h) => check_inlines(&h.inlines),
                LineNode::ListItem(i) => check_inlines(&i.inlines),
            }
        }
    }

    check(document);
}

//
// Paragraph closure
//

#[test]
fn test_compact_paragraph_at_end() {
    let document = parse("abc");
    assert_eq!(document.lines.len(), 1);
    assert_eq!(paragraph_of(&document.lines[0]), (true, "abc".to_string()));
    assert_round_trip("abc");
}

#[test]
fn test_single_line_break_closes_paragraph() {
    let document = parse("abc\n");
    assert_eq!(document.lines.len(), 1);
    assert_eq!(paragraph_of(&document.lines[0]), (false, "abc".to_string()));
    assert_round_trip("abc\n");
}

#[test]
fn test_blank_line_closes_paragraph() {
    let document = parse("abc\n\n");
    assert_eq!(document.lines.len(), 2);
    assert_eq!(paragraph_of(&document.lines[0]), (false, "abc".to_string()));
    assert_eq!(paragraph_of(&document.lines[1]), (true, String::new()));
    assert_round_trip("abc\n\n");
}

#[test]
fn test_whitespace_between_line_breaks() {
    // A whitespace-only blank line is not well-formed; the whitespace moves
    // into the trailing open paragraph.
    let document = parse("abc\n \n");
    assert_eq!(document.lines.len(), 2);
    assert_eq!(paragraph_of(&document.lines[0]), (false, "abc".to_string()));
    assert_eq!(paragraph_of(&document.lines[1]), (true, " ".to_string()));
}

#[test]
fn test_blank_line_starts_new_paragraph() {
    let document = parse("abc\n\ndef");
    assert_eq!(document.lines.len(), 2);
    assert_eq!(paragraph_of(&document.lines[0]), (false, "abc".to_string()));
    assert_eq!(paragraph_of(&document.lines[1]), (true, "def".to_string()));
    assert_round_trip("abc\n\ndef");
}

#[test]
fn test_single_line_break_continues_paragraph() {
    let document = parse("abc\ndef");
    assert_eq!(document.lines.len(), 1);
    assert_eq!(
        paragraph_of(&document.lines[0]),
        (true, "abc\ndef".to_string())
    );
    assert_round_trip("abc\ndef");
}

#[test]
fn test_paragraph_closure_inside_template_argument() {
    assert_round_trip("{{t|abc\n\n}}");
    assert_round_trip("{{t|abc\ndef}}");
    let document = parse("{{t|abc\n\n}}");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::Template(template) = &paragraph.inlines[0] else {
        panic!("expected a template");
    };
    let value = &template.arguments[0].value;
    assert_eq!(value.lines.len(), 2);
    assert_eq!(paragraph_of(&value.lines[0]), (false, "abc".to_string()));
    assert_eq!(paragraph_of(&value.lines[1]), (true, String::new()));
}

#[test]
fn test_trailing_line_breaks() {
    assert_round_trip("abc\n\n\n");
    assert_round_trip("abc\n\n\ndef");
    assert_round_trip("\n");
    assert_round_trip("\n\n");
    assert_round_trip("");
}

//
// Headings
//

#[test]
fn test_heading_level_greediness() {
    for (source, level, content) in [
        ("===== H =====", 5, " H "),
        ("====== H ======", 6, " H "),
        ("======= H =======", 6, "= H ="),
        ("== T ==", 2, " T "),
        ("=a=b=", 1, "a=b"),
        ("=== T ==", 2, "= T "),
    ] {
        let document = parse(source);
        let LineNode::Heading(heading) = &document.lines[0] else {
            panic!("expected a heading for {source:?}");
        };
        assert_eq!(u8::from(heading.level), level, "level of {source:?}");
        assert_eq!(text_of(&heading.inlines[0]), content);
        assert_round_trip(source);
    }
}

#[test]
fn test_unbalanced_heading_is_text() {
    let document = parse("== oops");
    assert_eq!(
        paragraph_of(&document.lines[0]),
        (true, "== oops".to_string())
    );
    assert_round_trip("== oops");
    assert_round_trip("==\n");
}

#[test]
fn test_heading_then_paragraph() {
    let document = parse("== Title ==\nhello");
    assert_eq!(document.lines.len(), 2);
    let LineNode::Heading(heading) = &document.lines[0] else {
        panic!("expected a heading");
    };
    assert_eq!(u8::from(heading.level), 2);
    assert_eq!(text_of(&heading.inlines[0]), " Title ");
    assert_eq!(
        paragraph_of(&document.lines[1]),
        (true, "hello".to_string())
    );
    assert_round_trip("== Title ==\nhello");
}

//
// List items
//

#[test]
fn test_list_items() {
    let document = parse("* item 1\n* item 2");
    assert_eq!(document.lines.len(), 2);
    for (line, content) in document.lines.iter().zip([" item 1", " item 2"]) {
        let LineNode::ListItem(item) = line else {
            panic!("expected a list item");
        };
        assert_eq!(item.prefix, "*");
        assert_eq!(text_of(&item.inlines[0]), content);
    }
    assert_round_trip("* item 1\n* item 2");
}

#[test]
fn test_list_item_prefixes() {
    for source in ["*#; nested", ":indent", "---- rule", "----", " pre", "*"] {
        let document = parse(source);
        assert!(
            matches!(&document.lines[0], LineNode::ListItem(_)),
            "expected a list item for {source:?}"
        );
        assert_round_trip(source);
    }
}

//
// Format switches
//

#[test]
fn test_format_switches() {
    let document = parse("''i'' '''b''' '''''bi'''''");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let switches: Vec<_> = paragraph
        .inlines
        .iter()
        .filter_map(|node| match node {
            InlineNode::FormatSwitch(switch) => Some((switch.switch_bold, switch.switch_italics)),
            _ => None,
        })
        .collect();
    assert_eq!(
        switches,
        [
            (false, true),
            (false, true),
            (true, false),
            (true, false),
            (true, true),
            (true, true),
        ]
    );
    assert_round_trip("''i'' '''b''' '''''bi'''''");
}

#[test]
fn test_four_apostrophes_leave_a_literal() {
    // A run of four apostrophes is never a switch by itself; the leftover
    // apostrophe stays literal next to the bold toggle.
    let document = parse("''''bold''''");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    assert_eq!(text_of(&paragraph.inlines[0]), "'");
    assert!(matches!(
        &paragraph.inlines[1],
        InlineNode::FormatSwitch(s) if s.switch_bold && !s.switch_italics
    ));
    assert_eq!(text_of(&paragraph.inlines[2]), "bold'");
    assert!(matches!(
        &paragraph.inlines[3],
        InlineNode::FormatSwitch(s) if s.switch_bold && !s.switch_italics
    ));
    assert_eq!(paragraph.inlines.len(), 4);
    assert_round_trip("''''bold''''");
}

//
// Links
//

#[test]
fn test_wiki_links() {
    let document = parse("[[A|B]] and [[C]] and [[D|]]");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::WikiLink(link) = &paragraph.inlines[0] else {
        panic!("expected a wikilink");
    };
    assert_eq!(link.target.to_string(), "A");
    assert_eq!(link.text.as_ref().unwrap().to_string(), "B");
    let InlineNode::WikiLink(link) = &paragraph.inlines[2] else {
        panic!("expected a wikilink");
    };
    assert!(link.text.is_none());
    let InlineNode::WikiLink(link) = &paragraph.inlines[4] else {
        panic!("expected a wikilink");
    };
    assert_eq!(
        link.text.as_ref().map(ToString::to_string),
        Some(String::new()),
        "empty text is distinct from absent text"
    );
    assert_round_trip("[[A|B]] and [[C]] and [[D|]]");
}

#[test]
fn test_unclosed_wiki_link_is_text() {
    let document = parse("[[foo");
    assert_eq!(
        paragraph_of(&document.lines[0]),
        (true, "[[foo".to_string())
    );
    assert_round_trip("[[foo");
    assert_round_trip("[[a\nb]]");
}

#[test]
fn test_external_links() {
    let document = parse("[http://x ok] and http://y and [mailto:a@b]");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::ExternalLink(link) = &paragraph.inlines[0] else {
        panic!("expected an external link");
    };
    assert!(link.brackets);
    assert_eq!(link.target.to_string(), "http://x");
    assert_eq!(link.text.as_ref().unwrap().to_string(), " ok");
    let InlineNode::ExternalLink(link) = &paragraph.inlines[2] else {
        panic!("expected a bare external link");
    };
    assert!(!link.brackets);
    assert_eq!(link.target.to_string(), "http://y");
    assert!(link.text.is_none());
    assert_round_trip("[http://x ok] and http://y and [mailto:a@b]");
}

#[test]
fn test_bracket_without_scheme_is_text() {
    // `[C` is not a valid bracketed link; the bare URL still autolinks.
    let document = parse("[C http://x ok]");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    assert_eq!(text_of(&paragraph.inlines[0]), "[C ");
    let InlineNode::ExternalLink(link) = &paragraph.inlines[1] else {
        panic!("expected a bare external link");
    };
    assert!(!link.brackets);
    assert_eq!(link.target.to_string(), "http://x");
    assert_eq!(text_of(&paragraph.inlines[2]), " ok]");
    assert_round_trip("[C http://x ok]");
}

#[test]
fn test_url_hands_back_trailing_punctuation() {
    let document = parse("see http://x.example.com.");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::ExternalLink(link) = &paragraph.inlines[1] else {
        panic!("expected a bare external link");
    };
    assert_eq!(link.target.to_string(), "http://x.example.com");
    assert_eq!(text_of(&paragraph.inlines[2]), ".");
    assert_round_trip("see http://x.example.com.");
}

//
// Templates and argument references
//

#[test]
fn test_template_arguments() {
    let document = parse("{{t|a=1|2}}");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::Template(template) = &paragraph.inlines[0] else {
        panic!("expected a template");
    };
    assert_eq!(template.name.to_string(), "t");
    assert_eq!(template.arguments.len(), 2);
    assert_eq!(
        template.arguments[0].name.as_ref().unwrap().to_string(),
        "a"
    );
    assert_eq!(template.arguments[0].value.to_string(), "1");
    assert!(template.arguments[1].name.is_none());
    assert_eq!(template.arguments[1].value.to_string(), "2");
    assert_round_trip("{{t|a=1|2}}");
}

#[test]
fn test_nested_templates() {
    assert_round_trip("{{a|{{b}}}}");
    assert_round_trip("{{a{{b}}c|x}}");
    assert_round_trip("{{t|[[A|B]]}}");
}

#[test]
fn test_argument_reference() {
    let document = parse("{{{1|def}}}");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::ArgumentReference(reference) = &paragraph.inlines[0] else {
        panic!("expected an argument reference");
    };
    assert_eq!(reference.name.to_string(), "1");
    assert_eq!(reference.default_value.as_ref().unwrap().to_string(), "def");
    assert_round_trip("{{{1|def}}}");
    assert_round_trip("{{{name}}}");
}

#[test]
fn test_unclosed_braces_are_text() {
    for source in ["{{x", "{{{x", "{{x|y", "{{}}"] {
        let document = parse(source);
        assert_eq!(
            paragraph_of(&document.lines[0]),
            (true, source.to_string()),
            "for {source:?}"
        );
        assert_round_trip(source);
    }
}

//
// Comments
//

#[test]
fn test_comments() {
    let document = parse("a<!-- note -->b");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    assert_eq!(text_of(&paragraph.inlines[0]), "a");
    let InlineNode::Comment(comment) = &paragraph.inlines[1] else {
        panic!("expected a comment");
    };
    assert_eq!(comment.content, " note ");
    assert_eq!(text_of(&paragraph.inlines[2]), "b");
    assert_round_trip("a<!-- note -->b");
}

#[test]
fn test_comment_crosses_terminators() {
    assert_round_trip("{{t|<!-- }} -->}}");
    let document = parse("{{t|<!-- }} -->}}");
    let LineNode::Paragraph(paragraph) = &document.lines[0] else {
        panic!("expected a paragraph");
    };
    assert!(matches!(&paragraph.inlines[0], InlineNode::Template(_)));
}

#[test]
fn test_unterminated_comment_is_text() {
    let document = parse("a<!--b");
    assert_eq!(
        paragraph_of(&document.lines[0]),
        (true, "a<!--b".to_string())
    );
    assert_round_trip("a<!--b");
}

//
// Coalescing and tracking
//

#[test]
fn test_no_adjacent_plain_text() {
    for source in [
        "plain text only",
        "''''bold''''",
        "[C http://x ok]",
        "a<!--b-->c<!--d-->e",
        "{{t|a=1|2}} tail",
        "abc\ndef\nghi",
        "news: is not a link",
    ] {
        assert_coalesced(&parse(source));
    }
}
