use super::helpers::{paragraph, parse, prefixes, strong, texts};
use crate::markdown::{find_tag, Parser, Token, TokenKind, TokenTag};

const DOCUMENTS: &[&str] = &[
    "**bold** and *em* with `code`\n",
    "# Título\n\nSome **bold _and_ ü** text with [a link](http://b.c).\n\n```rust\nlet x = \"é\";\n```\n\n- item ~~one~~\n- 2 * 3\n",
    "> quoted *text*\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n1. first\n2. second\n",
    "Footnote[^1] and ![img](http://x/y.png \"title\")\n\n[^1]: note\n",
];

#[test]
fn unterminated_bold_is_incomplete_not_an_error() {
    let tokens = parse("**bold");
    let expected =
        vec![paragraph(vec![strong(vec![Token::text("bold")]).incomplete()]).incomplete()];
    assert_eq!(tokens, expected);
}

#[test]
fn closed_bold_matches_direct_parse() {
    let streamed = parse("**bold**");
    let expected = vec![paragraph(vec![strong(vec![Token::text("bold")])])];
    assert_eq!(streamed, expected);
    assert_eq!(streamed, Parser::new().parse_final("**bold**"));
}

#[test]
fn final_prefix_equals_one_pass_parse() {
    let parser = Parser::new();
    for doc in DOCUMENTS {
        let mut last = Vec::new();
        for prefix in prefixes(doc) {
            last = parser.parse(prefix);
        }
        assert_eq!(last, parser.parse(doc), "{doc:?}");
        assert_eq!(last, parser.parse_final(doc), "{doc:?}");
        assert!(last.iter().all(|token| token.count_incomplete() == 0));
    }
}

#[test]
fn reparsing_is_stateless() {
    let parser = Parser::new();
    let doc = DOCUMENTS[1];
    let first = parser.parse(&doc[..40]);
    parser.parse(doc);
    assert_eq!(parser.parse(&doc[..40]), first);
}

#[test]
fn unterminated_fence_yields_incomplete_code_block() {
    let tokens = parse("Intro\n\n```rust\nfn main() {");
    assert_eq!(tokens.len(), 2);
    assert!(tokens[0].complete);
    assert_eq!(
        tokens[1].kind,
        TokenKind::CodeBlock {
            lang: Some("rust".into()),
            text: "fn main() {\n".into()
        }
    );
    assert!(!tokens[1].complete);
}

#[test]
fn partial_closing_fence_is_not_shown_as_code() {
    let tokens = parse("```\nx = 1\n``");
    assert_eq!(
        tokens[0].kind,
        TokenKind::CodeBlock {
            lang: None,
            text: "x = 1\n".into()
        }
    );
    assert!(!tokens[0].complete);

    let closed = parse("```\nx = 1\n```");
    assert!(closed[0].complete);
}

#[test]
fn unterminated_code_span_and_link_are_incomplete() {
    let code = parse("use `foo");
    let span = find_tag(&code, TokenTag::Code).expect("code span");
    assert_eq!(span.kind, TokenKind::Code { text: "foo".into() });
    assert!(!span.complete);

    let link = parse("see [docs](https://exa");
    let token = find_tag(&link, TokenTag::Link).expect("link");
    assert_eq!(
        token.kind,
        TokenKind::Link {
            href: "https://exa".into(),
            title: String::new()
        }
    );
    assert!(!token.complete);
    assert_eq!(token.plain_text(), "docs");
}

#[test]
fn dangling_delimiters_are_withheld() {
    assert_eq!(parse("Hello **"), vec![paragraph(vec![Token::text("Hello")])]);
    assert_eq!(parse("**"), Vec::<Token>::new());
}

#[test]
fn settled_literal_delimiters_match_the_final_parse() {
    let parser = Parser::new();
    for doc in ["Compute 2*3 now", "x = a*b", "a_b_", "snake_case_", "2*3 now*"] {
        assert_eq!(parser.parse(doc), parser.parse_final(doc), "{doc:?}");
    }
    assert!(find_tag(&parser.parse("2*3 now*"), TokenTag::Emphasis).is_some());
}

#[test]
fn ambiguous_trailing_runs_wait_for_more_text() {
    let parser = Parser::new();

    assert_eq!(texts(&parser.parse("Price 5 *")), vec!["Price 5"]);
    assert_eq!(texts(&parser.parse_final("Price 5 *")), vec!["Price 5 *"]);

    assert_eq!(texts(&parser.parse("text\n\n***")), vec!["text"]);
    let settled = parser.parse_final("text\n\n***");
    assert_eq!(settled[1].tag(), TokenTag::ThematicBreak);
}

#[test]
fn earlier_blocks_stay_complete() {
    let tokens = parse("First *para*.\n\nSecond **bo");
    assert!(tokens[0].complete);
    assert!(!tokens[1].complete);
    assert_eq!(texts(&tokens), vec!["First para.", "Second bo"]);
}

#[test]
fn final_parse_keeps_unclosed_syntax_verbatim() {
    let tokens = Parser::new().parse_final("**bold");
    assert_eq!(tokens, vec![paragraph(vec![Token::text("**bold")])]);
}

#[test]
fn no_prefix_of_awkward_input_panics() {
    let awkward = "***a __b ~~c `d [e](f ![g](h <i> \\* $$ ::: ```\n~~~\n| x |\n|-";
    let parser = Parser::new();
    for prefix in prefixes(awkward) {
        parser.parse(prefix);
        parser.parse_final(prefix);
    }
}
