//! Lexical analysis for RC source text.
//!
//! Tokenization uses a [`logos`] derive lexer. Whitespace and comments are
//! skipped at the lexer level; the parser receives tokens paired with their
//! byte ranges so spans can be reconstructed exactly.

use logos::Logos;

/// One RC token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // === Declarations ===
    #[token("type")]
    Type,
    #[token("struct")]
    Struct,
    #[token("component")]
    Component,
    #[token("func")]
    Func,
    #[token("init")]
    Init,
    #[token("getter")]
    Getter,
    #[token("action")]
    Action,
    #[token("reaction")]
    Reaction,
    #[token("bind")]
    Bind,
    #[token("instance")]
    Instance,
    #[token("const")]
    Const,
    #[token("var")]
    Var,

    // === Type constructors ===
    #[token("push")]
    Push,
    #[token("pull")]
    Pull,
    #[token("heap")]
    Heap,
    #[token("map")]
    Map,
    #[token("foreign")]
    Foreign,

    // === Statements ===
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("range")]
    Range,
    #[token("return")]
    Return,
    #[token("change")]
    Change,
    #[token("activate")]
    Activate,

    // === Literals ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    /// Integer literal; decimal or hexadecimal.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i128::from_str_radix(&lex.slice()[2..], 16).ok())]
    Integer(i128),

    /// Floating point literal.
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// Rune literal, e.g. `'a'` or `'\n'`.
    #[regex(r"'([^'\\\n]|\\.)'", |lex| unescape_rune(lex.slice()))]
    Rune(i32),

    /// String literal.
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    Str(String),

    /// Identifier.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&^")]
    AmpCaret,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("||")]
    PipePipe,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<-")]
    LeftArrow,
    #[token("->")]
    RightArrow,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token(":=")]
    ColonEq,
    #[token("=")]
    Eq,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn unescape_rune(slice: &str) -> Option<i32> {
    let inner = &slice[1..slice.len() - 1];
    let mut chars = inner.chars();
    let first = chars.next()?;
    let c = if first == '\\' {
        unescape_char(chars.next()?)
    } else {
        first
    };
    Some(c as i32)
}

fn unescape_string(slice: &str) -> Option<String> {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(unescape_char(chars.next()?));
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Token::Type => "type",
            Token::Struct => "struct",
            Token::Component => "component",
            Token::Func => "func",
            Token::Init => "init",
            Token::Getter => "getter",
            Token::Action => "action",
            Token::Reaction => "reaction",
            Token::Bind => "bind",
            Token::Instance => "instance",
            Token::Const => "const",
            Token::Var => "var",
            Token::Push => "push",
            Token::Pull => "pull",
            Token::Heap => "heap",
            Token::Map => "map",
            Token::Foreign => "foreign",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Range => "range",
            Token::Return => "return",
            Token::Change => "change",
            Token::Activate => "activate",
            Token::True => "true",
            Token::False => "false",
            Token::Nil => "nil",
            Token::Integer(n) => return write!(f, "{}", n),
            Token::Float(x) => return write!(f, "{}", x),
            Token::Rune(r) => return write!(f, "'{}'", *r),
            Token::Str(s) => return write!(f, "{:?}", s),
            Token::Ident(id) => return write!(f, "{}", id),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::AmpCaret => "&^",
            Token::AmpAmp => "&&",
            Token::Amp => "&",
            Token::PipePipe => "||",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::LeftArrow => "<-",
            Token::RightArrow => "->",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Bang => "!",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::ColonEq => ":=",
            Token::Eq => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Dot => ".",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source)
            .collect::<Result<Vec<_>, _>>()
            .expect("lexing failed")
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            lex("type Counter component"),
            vec![
                Token::Type,
                Token::Ident("Counter".to_string()),
                Token::Component
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            lex("42 0xff 3.5 1e9"),
            vec![
                Token::Integer(42),
                Token::Integer(255),
                Token::Float(3.5),
                Token::Float(1e9)
            ]
        );
    }

    #[test]
    fn rune_and_string_literals() {
        assert_eq!(
            lex(r#"'a' '\n' "hi\t""#),
            vec![
                Token::Rune('a' as i32),
                Token::Rune('\n' as i32),
                Token::Str("hi\t".to_string())
            ]
        );
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            lex("&^ && & << >>= "),
            vec![
                Token::AmpCaret,
                Token::AmpAmp,
                Token::Amp,
                Token::Shl,
                Token::Shr,
                Token::Eq
            ]
        );
        assert_eq!(
            lex("-> <- := += -="),
            vec![
                Token::RightArrow,
                Token::LeftArrow,
                Token::ColonEq,
                Token::PlusEq,
                Token::MinusEq
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("instance // trailing\n/* block\ncomment */ main"),
            vec![Token::Instance, Token::Ident("main".to_string())]
        );
    }

    #[test]
    fn bind_arrows() {
        assert_eq!(
            lex("s.out -> t.tick"),
            vec![
                Token::Ident("s".to_string()),
                Token::Dot,
                Token::Ident("out".to_string()),
                Token::RightArrow,
                Token::Ident("t".to_string()),
                Token::Dot,
                Token::Ident("tick".to_string()),
            ]
        );
    }

    #[test]
    fn invalid_token_is_an_error() {
        let results: Vec<_> = Token::lexer("var @ x").collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
