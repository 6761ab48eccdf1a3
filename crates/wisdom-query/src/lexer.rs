//! Search query tokenizer using logos
//!
//! Commas are soft separators and behave like whitespace. Double-quoted spans
//! are literal terms: reserved words inside quotes stay terms. `(` and `)` are
//! standalone tokens even when glued to a word. Quotes pair up left to right;
//! a final quote without a partner is dropped and the text after it is read
//! as plain words.

use crate::parser::BoolOp;
use logos::Logos;
use serde::{Deserialize, Serialize};

/// Raw lexemes of the text outside quoted spans
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")]
enum Lexeme {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("and", ignore(ascii_case))]
    And,

    #[token("or", ignore(ascii_case))]
    Or,

    #[regex(r"[^\s()]+", |lex| lex.slice().to_string())]
    Word(String),
}

/// A stretch of the input either inside or outside a pair of quotes
#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment<'a> {
    Plain(&'a str),
    Quoted(&'a str),
}

/// Split on quote pairs. Text after a quote with no partner is plain.
fn segments(input: &str) -> Vec<Segment<'_>> {
    let quotes: Vec<usize> = input.match_indices('"').map(|(i, _)| i).collect();
    let mut out = Vec::new();
    let mut cursor = 0;
    for pair in quotes.chunks(2) {
        match *pair {
            [open, close] => {
                out.push(Segment::Plain(&input[cursor..open]));
                out.push(Segment::Quoted(&input[open + 1..close]));
                cursor = close + 1;
            }
            [open] => {
                out.push(Segment::Plain(&input[cursor..open]));
                cursor = open + 1;
            }
            _ => {}
        }
    }
    out.push(Segment::Plain(&input[cursor..]));
    out
}

fn lex_plain(text: &str, tokens: &mut Vec<Token>) {
    let mut lexer = Lexeme::lexer(text);
    while let Some(result) = lexer.next() {
        let token = match result {
            Ok(Lexeme::LParen) => Token::open_paren(),
            Ok(Lexeme::RParen) => Token::close_paren(),
            Ok(Lexeme::And) => Token::keyword(BoolOp::And),
            Ok(Lexeme::Or) => Token::keyword(BoolOp::Or),
            Ok(Lexeme::Word(word)) => Token::term(word),
            Err(()) => {
                let slice = lexer.slice().trim();
                if slice.is_empty() {
                    continue;
                }
                Token::term(slice)
            }
        };
        tokens.push(token);
    }
}

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// A search term, quoted or bare
    Term,
    /// `and` / `or`, normalized to lowercase
    Keyword,
    /// `(` or `)`
    Parenthesis,
}

/// A token of a search query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub quoted: bool,
}

impl Token {
    /// Bare term
    pub fn term<S: Into<String>>(value: S) -> Self {
        Self {
            kind: TokenKind::Term,
            value: value.into(),
            quoted: false,
        }
    }

    /// Quoted literal term
    pub fn quoted<S: Into<String>>(value: S) -> Self {
        Self {
            kind: TokenKind::Term,
            value: value.into(),
            quoted: true,
        }
    }

    /// Boolean keyword
    pub fn keyword(op: BoolOp) -> Self {
        Self {
            kind: TokenKind::Keyword,
            value: op.keyword().to_string(),
            quoted: false,
        }
    }

    pub fn open_paren() -> Self {
        Self {
            kind: TokenKind::Parenthesis,
            value: "(".to_string(),
            quoted: false,
        }
    }

    pub fn close_paren() -> Self {
        Self {
            kind: TokenKind::Parenthesis,
            value: ")".to_string(),
            quoted: false,
        }
    }

    /// The operator this token stands for, if it is a keyword
    pub fn as_operator(&self) -> Option<BoolOp> {
        match (self.kind, self.value.as_str()) {
            (TokenKind::Keyword, "and") => Some(BoolOp::And),
            (TokenKind::Keyword, "or") => Some(BoolOp::Or),
            _ => None,
        }
    }

    pub fn is_open_paren(&self) -> bool {
        self.kind == TokenKind::Parenthesis && self.value == "("
    }

    pub fn is_close_paren(&self) -> bool {
        self.kind == TokenKind::Parenthesis && self.value == ")"
    }
}

/// Tokenize a search query string
pub fn tokenize(input: &str) -> Vec<Token> {
    let normalized = input.replace(',', " ");
    let mut tokens = Vec::new();
    for segment in segments(&normalized) {
        match segment {
            Segment::Plain(text) => lex_plain(text, &mut tokens),
            Segment::Quoted("") => {}
            Segment::Quoted(text) => tokens.push(Token::quoted(text)),
        }
    }
    tokens
}

/// True while a quote is open, i.e. the input holds an odd number of `"`.
///
/// Keystroke-driven callers suppress completion while this holds.
pub fn has_unclosed_quote(input: &str) -> bool {
    input.chars().filter(|c| *c == '"').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_query() {
        let tokens = tokenize("apex AND nova");
        assert_eq!(
            tokens,
            vec![
                Token::term("apex"),
                Token::keyword(BoolOp::And),
                Token::term("nova"),
            ]
        );
    }

    #[test]
    fn test_quoted_reserved_words() {
        let tokens = tokenize(r#"find "and this""#);
        assert_eq!(tokens, vec![Token::term("find"), Token::quoted("and this")]);
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let tokens = tokenize("a Or b aNd c");
        assert_eq!(tokens[1], Token::keyword(BoolOp::Or));
        assert_eq!(tokens[3], Token::keyword(BoolOp::And));
        assert_eq!(tokens[1].value, "or");
    }

    #[test]
    fn test_keyword_prefix_is_a_term() {
        let tokens = tokenize("android oracle");
        assert_eq!(tokens, vec![Token::term("android"), Token::term("oracle")]);
    }

    #[test]
    fn test_parentheses_split_words() {
        let tokens = tokenize("(apex OR nova)AND active");
        assert_eq!(
            tokens,
            vec![
                Token::open_paren(),
                Token::term("apex"),
                Token::keyword(BoolOp::Or),
                Token::term("nova"),
                Token::close_paren(),
                Token::keyword(BoolOp::And),
                Token::term("active"),
            ]
        );
    }

    #[test]
    fn test_commas_are_separators() {
        let tokens = tokenize("tokyo,osaka , kyoto");
        assert_eq!(
            tokens,
            vec![Token::term("tokyo"), Token::term("osaka"), Token::term("kyoto")]
        );
    }

    #[test]
    fn test_quotes_glued_to_words() {
        let tokens = tokenize(r#"abc"def ghi"jkl"#);
        assert_eq!(
            tokens,
            vec![Token::term("abc"), Token::quoted("def ghi"), Token::term("jkl")]
        );
    }

    #[test]
    fn test_unclosed_quote() {
        let input = r#"apex "nova inc"#;
        assert!(has_unclosed_quote(input));
        assert!(!has_unclosed_quote(r#"apex "nova inc""#));

        let tokens = tokenize(input);
        assert_eq!(
            tokens,
            vec![Token::term("apex"), Token::term("nova"), Token::term("inc")]
        );
    }

    #[test]
    fn test_unclosed_quote_after_pairs() {
        let tokens = tokenize(r#""a b" or "c (d"#);
        assert_eq!(
            tokens,
            vec![
                Token::quoted("a b"),
                Token::keyword(BoolOp::Or),
                Token::term("c"),
                Token::open_paren(),
                Token::term("d"),
            ]
        );
        assert_eq!(tokenize(r#"apex ""#), vec![Token::term("apex")]);
    }

    #[test]
    fn test_unicode_whitespace_separates_words() {
        let tokens = tokenize("apex\u{A0}corp\u{2003}and\tnova");
        assert_eq!(
            tokens,
            vec![
                Token::term("apex"),
                Token::term("corp"),
                Token::keyword(BoolOp::And),
                Token::term("nova"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ,, ").is_empty());
        assert!(tokenize(r#""""#).is_empty());
    }
}
