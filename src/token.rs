//! Token types produced by [`crate::lexer::Tokenizer`].
//!
//! Each token carries its 1-based line/column so the parser can attach a
//! source position to any error it raises.

/// Position of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Narrative mode
    Text(String),
    CommandStart, // <<
    CommandEnd,   // >>
    SpecialOpen,  // [
    SpecialClose, // ]
    SpecialSeparator, // |
    Asterisk,     // *

    // Command mode literals/identifiers
    Identifier(String),
    Number(i32),
    String(String),

    // Reserved words (reclassified from Identifier)
    True,
    False,
    Or,
    And,
    Not,
    Is,

    // Operators
    Assign,        // =
    ParenOpen,
    ParenClose,
    Comma,
    Equals,        // ==
    NotEqual,      // !=
    NotEqualWeird, // <>
    LesserThan,
    GreaterThan,
    LesserEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,

    Eof,
    Unknown(char),
    Invalid(String),
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TokenKind::*;
        match self {
            Text(t) => write!(f, "text {:?}", t),
            CommandStart => write!(f, "\"<<\""),
            CommandEnd => write!(f, "\">>\""),
            SpecialOpen => write!(f, "\"[\""),
            SpecialClose => write!(f, "\"]\""),
            SpecialSeparator => write!(f, "\"|\""),
            Asterisk => write!(f, "\"*\""),
            Identifier(name) => write!(f, "identifier {:?}", name),
            Number(n) => write!(f, "number {}", n),
            String(s) => write!(f, "string {:?}", s),
            True => write!(f, "\"true\""),
            False => write!(f, "\"false\""),
            Or => write!(f, "\"or\""),
            And => write!(f, "\"and\""),
            Not => write!(f, "\"not\""),
            Is => write!(f, "\"is\""),
            Assign => write!(f, "\"=\""),
            ParenOpen => write!(f, "\"(\""),
            ParenClose => write!(f, "\")\""),
            Comma => write!(f, "\",\""),
            Equals => write!(f, "\"==\""),
            NotEqual => write!(f, "\"!=\""),
            NotEqualWeird => write!(f, "\"<>\""),
            LesserThan => write!(f, "\"<\""),
            GreaterThan => write!(f, "\">\""),
            LesserEqual => write!(f, "\"<=\""),
            GreaterEqual => write!(f, "\">=\""),
            Add => write!(f, "\"+\""),
            Subtract => write!(f, "\"-\""),
            Multiply => write!(f, "\"*\""),
            Divide => write!(f, "\"/\""),
            Remainder => write!(f, "\"%\""),
            Eof => write!(f, "end of passage"),
            Unknown(c) => write!(f, "unexpected character {:?}", c),
            Invalid(s) => write!(f, "invalid token {:?}", s),
        }
    }
}

impl TokenKind {
    /// Reclassify a scanned identifier into a reserved-word token if its
    /// lowercase form matches one of the six reserved words. Case folding is
    /// applied only here, per spec.
    pub fn reserved_or_identifier(raw: String) -> TokenKind {
        match raw.to_ascii_lowercase().as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "or" => TokenKind::Or,
            "and" => TokenKind::And,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            _ => TokenKind::Identifier(raw),
        }
    }
}
