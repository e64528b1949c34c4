use super::helpers::paragraph;
use crate::markdown::{find_tag, Align, Parser, Token, TokenKind, TokenTag};

fn parse_final(src: &str) -> Vec<Token> {
    Parser::new().parse_final(src)
}

#[test]
fn headings_and_paragraphs() {
    let tokens = parse_final("## Title\n\nBody text");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Heading { level: 2 });
    assert_eq!(tokens[0].plain_text(), "Title");
    assert_eq!(tokens[1], paragraph(vec![Token::text("Body text")]));
}

#[test]
fn soft_breaks_split_text() {
    let tokens = parse_final("a\nb");
    assert_eq!(
        tokens,
        vec![paragraph(vec![
            Token::text("a"),
            Token::new(TokenKind::SoftBreak),
            Token::text("b"),
        ])]
    );
}

#[test]
fn task_lists_carry_checked_state() {
    let tokens = parse_final("- [x] done\n- [ ] todo\n");
    let list = &tokens[0];
    assert_eq!(list.kind, TokenKind::List { start: None });
    assert_eq!(list.children.len(), 2);
    assert_eq!(list.children[0].kind, TokenKind::ListItem { checked: Some(true) });
    assert_eq!(list.children[1].kind, TokenKind::ListItem { checked: Some(false) });
    assert_eq!(list.children[1].plain_text().trim(), "todo");
}

#[test]
fn ordered_lists_keep_start() {
    let tokens = parse_final("3. three\n4. four\n");
    assert_eq!(tokens[0].kind, TokenKind::List { start: Some(3) });
}

#[test]
fn tables_keep_alignment_and_rows() {
    let tokens = parse_final("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
    let table = &tokens[0];
    assert_eq!(
        table.kind,
        TokenKind::Table {
            alignments: vec![Align::Left, Align::Right]
        }
    );
    assert_eq!(table.children[0].tag(), TokenTag::TableHead);
    assert_eq!(table.children[1].tag(), TokenTag::TableRow);
    assert_eq!(table.children[1].children.len(), 2);
    assert_eq!(table.children[1].children[1].plain_text().trim(), "2");
}

#[test]
fn html_blocks_are_collected_verbatim() {
    let tokens = parse_final("<div>\nhi\n</div>\n");
    match &tokens[0].kind {
        TokenKind::Html { raw } => assert!(raw.contains("<div>") && raw.contains("</div>")),
        other => panic!("expected html, got {other:?}"),
    }
    assert!(tokens[0].children.is_empty());
}

#[test]
fn images_links_and_footnotes() {
    let tokens = parse_final("![alt](http://x/y.png \"t\") [^n]\n\n[^n]: note\n");
    let image = find_tag(&tokens, TokenTag::Image).expect("image");
    assert_eq!(
        image.kind,
        TokenKind::Image {
            src: "http://x/y.png".into(),
            title: "t".into()
        }
    );
    assert_eq!(image.plain_text(), "alt");
    assert!(find_tag(&tokens, TokenTag::FootnoteReference).is_some());
    assert!(find_tag(&tokens, TokenTag::FootnoteDefinition).is_some());
}

#[test]
fn block_quotes_nest_blocks() {
    let tokens = parse_final("> *quoted*\n");
    assert_eq!(tokens[0].tag(), TokenTag::BlockQuote);
    assert_eq!(tokens[0].children[0].tag(), TokenTag::Paragraph);
    assert!(find_tag(&tokens, TokenTag::Emphasis).is_some());
}

#[test]
fn unrecognized_syntax_degrades_to_text() {
    let tokens = parse_final("<<>> {{weird}} ]]");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].plain_text(), "<<>> {{weird}} ]]");
}

#[test]
fn indented_code_has_no_language() {
    let tokens = parse_final("    let x = 1;\n");
    assert_eq!(
        tokens[0].kind,
        TokenKind::CodeBlock {
            lang: None,
            text: "let x = 1;\n".into()
        }
    );
}
