//! Dual-mode tokenizer for a single passage body.
//!
//! Carries a mutable `command_mode` flag (default `false`, narrative mode).
//! The parser is responsible for flipping it before each sub-call; the
//! lexer itself never changes it on its own.

mod cursor;

use cursor::Cursor;

use crate::token::{Pos, Token, TokenKind};

pub struct Tokenizer {
    cursor: Cursor,
    pub command_mode: bool,
}

impl Tokenizer {
    pub fn new(body: &str, start_line: usize) -> Self {
        Tokenizer {
            cursor: Cursor::new(body, start_line),
            command_mode: false,
        }
    }

    fn pos(&self) -> Pos {
        let (line, column) = self.cursor.current_pos();
        Pos { line, column }
    }

    /// Consume exactly one `\n` character if the cursor is sitting on one.
    /// Operates directly on the character stream, bypassing tokenization, so
    /// a macro or selection on its own line does not leave a blank line.
    pub fn skip_one_newline(&mut self) {
        if self.cursor.peek() == Some('\n') {
            self.cursor.advance();
        }
    }

    /// Scan and consume the next token under the current mode.
    pub fn next_token(&mut self) -> Token {
        if self.command_mode {
            self.next_command_token()
        } else {
            self.next_narrative_token()
        }
    }

    /// Return `count` tokens of lookahead without consuming them or changing
    /// `command_mode`. Correctly returns up to `count` tokens (trailing
    /// `Eof`s once the passage body is exhausted), unlike a naive
    /// out-of-bounds-indexing lookahead.
    pub fn peek(&mut self, count: usize) -> Vec<Token> {
        let mark = self.cursor.mark();
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.next_token());
        }
        self.cursor.reset(mark);
        out
    }

    // ---- narrative sub-grammar ----

    fn next_narrative_token(&mut self) -> Token {
        let pos = self.pos();

        if self.cursor.is_at_end() {
            return Token { kind: TokenKind::Eof, pos };
        }

        let at_line_start = pos.column == 1;
        let ch = self.cursor.peek().unwrap();

        match ch {
            '<' if self.cursor.peek_at(1) == Some('<') => {
                self.cursor.advance();
                self.cursor.advance();
                Token { kind: TokenKind::CommandStart, pos }
            }
            '>' if self.cursor.peek_at(1) == Some('>') => {
                self.cursor.advance();
                self.cursor.advance();
                Token { kind: TokenKind::CommandEnd, pos }
            }
            '[' => {
                self.cursor.advance();
                Token { kind: TokenKind::SpecialOpen, pos }
            }
            ']' => {
                self.cursor.advance();
                Token { kind: TokenKind::SpecialClose, pos }
            }
            '|' => {
                self.cursor.advance();
                Token { kind: TokenKind::SpecialSeparator, pos }
            }
            '*' if at_line_start => {
                self.cursor.advance();
                Token { kind: TokenKind::Asterisk, pos }
            }
            _ => self.scan_text(pos),
        }
    }

    fn scan_text(&mut self, pos: Pos) -> Token {
        let mut text = String::new();
        loop {
            if self.cursor.is_at_end() {
                break;
            }
            let ch = self.cursor.peek().unwrap();
            let at_line_start = self.cursor.current_pos().1 == 1;
            let is_boundary = matches!(ch, '[' | ']' | '|')
                || (ch == '<' && self.cursor.peek_at(1) == Some('<'))
                || (ch == '>' && self.cursor.peek_at(1) == Some('>'))
                || (ch == '*' && at_line_start);
            if is_boundary {
                break;
            }
            text.push(ch);
            self.cursor.advance();
        }
        Token { kind: TokenKind::Text(text), pos }
    }

    // ---- command sub-grammar ----

    fn next_command_token(&mut self) -> Token {
        while matches!(self.cursor.peek(), Some(c) if c.is_whitespace()) {
            self.cursor.advance();
        }

        let pos = self.pos();

        if self.cursor.is_at_end() {
            return Token { kind: TokenKind::Eof, pos };
        }

        let ch = self.cursor.peek().unwrap();

        match ch {
            '<' => self.scan_lt(pos),
            '>' => self.scan_gt(pos),
            '=' => {
                self.cursor.advance();
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    Token { kind: TokenKind::Equals, pos }
                } else {
                    Token { kind: TokenKind::Assign, pos }
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    Token { kind: TokenKind::NotEqual, pos }
                } else {
                    Token { kind: TokenKind::Unknown('!'), pos }
                }
            }
            '(' => {
                self.cursor.advance();
                Token { kind: TokenKind::ParenOpen, pos }
            }
            ')' => {
                self.cursor.advance();
                Token { kind: TokenKind::ParenClose, pos }
            }
            ',' => {
                self.cursor.advance();
                Token { kind: TokenKind::Comma, pos }
            }
            '+' => {
                self.cursor.advance();
                Token { kind: TokenKind::Add, pos }
            }
            '-' => {
                self.cursor.advance();
                Token { kind: TokenKind::Subtract, pos }
            }
            '*' => {
                self.cursor.advance();
                Token { kind: TokenKind::Multiply, pos }
            }
            '/' => {
                self.cursor.advance();
                Token { kind: TokenKind::Divide, pos }
            }
            '%' => {
                self.cursor.advance();
                Token { kind: TokenKind::Remainder, pos }
            }
            '"' => self.scan_string(pos),
            c if c.is_ascii_digit() => self.scan_number(pos),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(pos),
            other => {
                self.cursor.advance();
                Token { kind: TokenKind::Unknown(other), pos }
            }
        }
    }

    fn scan_lt(&mut self, pos: Pos) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => {
                self.cursor.advance();
                Token { kind: TokenKind::LesserEqual, pos }
            }
            Some('>') => {
                self.cursor.advance();
                Token { kind: TokenKind::NotEqualWeird, pos }
            }
            Some('<') => {
                self.cursor.advance();
                Token { kind: TokenKind::CommandStart, pos }
            }
            _ => Token { kind: TokenKind::LesserThan, pos },
        }
    }

    fn scan_gt(&mut self, pos: Pos) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => {
                self.cursor.advance();
                Token { kind: TokenKind::GreaterEqual, pos }
            }
            Some('>') => {
                self.cursor.advance();
                Token { kind: TokenKind::CommandEnd, pos }
            }
            _ => Token { kind: TokenKind::GreaterThan, pos },
        }
    }

    fn scan_string(&mut self, pos: Pos) -> Token {
        self.cursor.advance(); // opening quote
        let mut raw = String::new();
        loop {
            match self.cursor.peek() {
                None => {
                    return Token { kind: TokenKind::Invalid(raw), pos };
                }
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    raw.push(self.cursor.advance().unwrap());
                    if let Some(escaped) = self.cursor.advance() {
                        raw.push(escaped);
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.cursor.advance();
                }
            }
        }
        Token { kind: TokenKind::String(raw), pos }
    }

    fn scan_number(&mut self, pos: Pos) -> Token {
        let mut digits = String::new();
        while matches!(self.cursor.peek(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.cursor.advance().unwrap());
        }
        match digits.parse::<i32>() {
            Ok(n) => Token { kind: TokenKind::Number(n), pos },
            Err(_) => Token { kind: TokenKind::Invalid(digits), pos },
        }
    }

    fn scan_identifier(&mut self, pos: Pos) -> Token {
        let mut name = String::new();
        while matches!(self.cursor.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            name.push(self.cursor.advance().unwrap());
        }
        Token { kind: TokenKind::reserved_or_identifier(name), pos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &str, command_mode: bool) -> Vec<TokenKind> {
        let mut tok = Tokenizer::new(body, 1);
        tok.command_mode = command_mode;
        let mut out = Vec::new();
        loop {
            let t = tok.next_token();
            let done = matches!(t.kind, TokenKind::Eof);
            out.push(t.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn narrative_stops_text_at_command_start() {
        let kinds = kinds("Hello<<pause>>", false);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("Hello".into()),
                TokenKind::CommandStart,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn asterisk_only_special_at_line_start() {
        let kinds = kinds("a*b", false);
        assert_eq!(kinds, vec![TokenKind::Text("a*b".into()), TokenKind::Eof]);

        let kinds = kinds("*[[x|y]]", false);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Asterisk,
                TokenKind::SpecialOpen,
                TokenKind::SpecialOpen,
                TokenKind::Text("x".into()),
                TokenKind::SpecialSeparator,
                TokenKind::Text("y".into()),
                TokenKind::SpecialClose,
                TokenKind::SpecialClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reserved_words_are_case_insensitive() {
        let kinds = kinds("TRUE oR NOT", true);
        assert_eq!(
            kinds,
            vec![TokenKind::True, TokenKind::Or, TokenKind::Not, TokenKind::Eof]
        );
    }

    #[test]
    fn operator_maximal_munch() {
        let kinds = kinds("<= >= == != <> << >> < >", true);
        assert_eq!(
            kinds,
            vec![
                TokenKind::LesserEqual,
                TokenKind::GreaterEqual,
                TokenKind::Equals,
                TokenKind::NotEqual,
                TokenKind::NotEqualWeird,
                TokenKind::CommandStart,
                TokenKind::CommandEnd,
                TokenKind::LesserThan,
                TokenKind::GreaterThan,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escape_is_kept_verbatim() {
        let kinds = kinds(r#""a\"b""#, true);
        assert_eq!(kinds, vec![TokenKind::String("a\\\"b".into()), TokenKind::Eof]);
    }

    #[test]
    fn peek_does_not_consume_or_change_position() {
        let mut tok = Tokenizer::new("<<pause>>", false);
        let peeked = tok.peek(2);
        assert_eq!(peeked[0].kind, TokenKind::CommandStart);
        let real = tok.next_token();
        assert_eq!(real.kind, TokenKind::CommandStart);
    }

    #[test]
    fn peek_past_eof_yields_repeated_eof() {
        let mut tok = Tokenizer::new("", false);
        let peeked = tok.peek(3);
        assert_eq!(peeked.len(), 3);
        assert!(peeked.iter().all(|t| matches!(t.kind, TokenKind::Eof)));
    }
}
