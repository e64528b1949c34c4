use crate::markdown::{Parser, Token, TokenKind};

pub fn parse(src: &str) -> Vec<Token> {
    Parser::new().parse(src)
}

/// Every prefix of `doc` on a char boundary, shortest first, ending with the
/// whole document.
pub fn prefixes(doc: &str) -> impl Iterator<Item = &str> {
    doc.char_indices()
        .map(move |(idx, _)| &doc[..idx])
        .chain(std::iter::once(doc))
}

pub fn paragraph(children: Vec<Token>) -> Token {
    Token::new(TokenKind::Paragraph).with_children(children)
}

pub fn strong(children: Vec<Token>) -> Token {
    Token::new(TokenKind::Strong).with_children(children)
}

pub fn texts(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(Token::plain_text).collect()
}
