use std::fmt;

/// Tokens of kernel source.
///
/// Only what the specializer needs to recognize is distinguished:
/// `@`, identifiers, delimiters and commas. Everything else is
/// carried as a literal or punctuation and copied through verbatim.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    Ident(String),
    Integer(u64),
    Float(f64),
    Str(String),
    At,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Punct(char),
    Eof,
}

impl Lexeme {
    pub fn is_open(&self) -> bool {
        matches!(self, Lexeme::LParen | Lexeme::LBrace | Lexeme::LBracket)
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Lexeme::RParen | Lexeme::RBrace | Lexeme::RBracket)
    }

    /// Closing delimiter matching an opening one.
    pub fn closer(&self) -> Option<Lexeme> {
        match self {
            Lexeme::LParen => Some(Lexeme::RParen),
            Lexeme::LBrace => Some(Lexeme::RBrace),
            Lexeme::LBracket => Some(Lexeme::RBracket),
            _ => None,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Ident(name) => write!(f, "{}", name),
            Lexeme::Integer(n) => write!(f, "{}", n),
            Lexeme::Float(v) => write!(f, "{}", v),
            Lexeme::Str(s) => write!(f, "{:?}", s),
            Lexeme::At => f.write_str("@"),
            Lexeme::LParen => f.write_str("("),
            Lexeme::RParen => f.write_str(")"),
            Lexeme::LBrace => f.write_str("{"),
            Lexeme::RBrace => f.write_str("}"),
            Lexeme::LBracket => f.write_str("["),
            Lexeme::RBracket => f.write_str("]"),
            Lexeme::Comma => f.write_str(","),
            Lexeme::Punct(c) => write!(f, "{}", c),
            Lexeme::Eof => f.write_str("end of file"),
        }
    }
}
