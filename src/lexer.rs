use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    file_id: u16,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            source: source.as_bytes(),
            file_id,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        self.skip_whitespace_and_comments();

        if self.pos >= self.source.len() {
            return self.make_token(Lexeme::Eof, self.pos, self.pos);
        }

        let start = self.pos;
        let ch = self.source[self.pos];

        if is_ident_start(ch) {
            return self.scan_ident();
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        if ch == b'"' {
            return self.scan_string();
        }

        self.scan_symbol(start)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.starts_with(b"//") {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if self.starts_with(b"/*") {
                let start = self.pos;
                self.pos += 2;
                let mut depth = 1;
                while depth > 0 {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", start, self.pos);
                        return;
                    }
                    if self.starts_with(b"/*") {
                        depth += 1;
                        self.pos += 2;
                    } else if self.starts_with(b"*/") {
                        depth -= 1;
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = self.text(start, self.pos);
        self.make_token(Lexeme::Ident(text), start, self.pos)
    }

    /// Integers and floats, with optional `_` separators, fraction,
    /// exponent and type suffix (`1.5e-3f32`, `4u32`).
    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        self.eat_digits();
        let mut is_float = false;

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.eat_digits();
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let sign = matches!(self.peek_at(1), Some(b'+') | Some(b'-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += digit_at;
                self.eat_digits();
            }
        }

        let number_end = self.pos;
        // Type suffix.
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let suffix = self.text(number_end, self.pos);
        if suffix.starts_with('f') {
            is_float = true;
        }

        let digits: String = self.text(start, number_end).replace('_', "");
        let token = if is_float {
            match digits.parse::<f64>() {
                Ok(v) => Lexeme::Float(v),
                Err(_) => {
                    self.error("malformed float literal", start, self.pos);
                    Lexeme::Float(0.0)
                }
            }
        } else {
            match digits.parse::<u64>() {
                Ok(n) => Lexeme::Integer(n),
                Err(_) => {
                    let text = self.text(start, self.pos);
                    self.diagnostics.push(Diagnostic::error(
                        format!("integer literal '{}' is too large", text),
                        Span::new(self.file_id, start as u32, self.pos as u32),
                    ));
                    Lexeme::Integer(0)
                }
            }
        };
        self.make_token(token, start, self.pos)
    }

    fn scan_string(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => {
                    self.error("unterminated string literal", start, self.pos);
                    let text = self.text(start + 1, self.pos);
                    return self.make_token(Lexeme::Str(text), start, self.pos);
                }
                Some(b'\\') => self.pos = (self.pos + 2).min(self.source.len()),
                Some(b'"') => break,
                Some(_) => self.pos += 1,
            }
        }
        let text = self.text(start + 1, self.pos);
        self.pos += 1;
        self.make_token(Lexeme::Str(text), start, self.pos)
    }

    fn scan_symbol(&mut self, start: usize) -> Spanned<Lexeme> {
        let ch = self.source[self.pos];

        // Character literal: 'a' or '\n'. A lone quote stays punctuation.
        if ch == b'\'' {
            if let Some(len) = self.char_literal_len() {
                self.pos += len;
                let text = self.text(start, self.pos);
                return self.make_token(Lexeme::Str(text), start, self.pos);
            }
        }

        if !ch.is_ascii() {
            // Skip the whole UTF-8 sequence so the next token starts on a boundary.
            let width = utf8_width(ch);
            self.pos = (self.pos + width).min(self.source.len());
            let text = self.text(start, self.pos);
            self.error(&format!("unexpected character '{}'", text), start, self.pos);
            return self.next_token();
        }

        self.pos += 1;
        let token = match ch {
            b'@' => Lexeme::At,
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            c if c.is_ascii_punctuation() => Lexeme::Punct(c as char),
            c => {
                self.error(
                    &format!("unexpected control character {:#04x}", c),
                    start,
                    self.pos,
                );
                return self.next_token();
            }
        };

        self.make_token(token, start, self.pos)
    }

    fn char_literal_len(&self) -> Option<usize> {
        match (self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (Some(b'\\'), Some(_), Some(b'\'')) => Some(4),
            (Some(c), Some(b'\''), _) if c != b'\'' && c != b'\\' => Some(3),
            _ => None,
        }
    }

    fn eat_digits(&mut self) {
        while self.pos < self.source.len()
            && (self.source[self.pos].is_ascii_digit() || self.source[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    fn starts_with(&self, pat: &[u8]) -> bool {
        self.source[self.pos..].starts_with(pat)
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    fn error(&mut self, message: &str, start: usize, end: usize) {
        self.diagnostics.push(Diagnostic::error(
            message.to_string(),
            Span::new(self.file_id, start as u32, end as u32),
        ));
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(self.file_id, start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
