//! Recursive-descent parser: passage body -> `Vec<Command>`.
//!
//! The parser owns a single [`Tokenizer`] and explicitly flips its
//! `command_mode` flag before every sub-call, per spec — narrative parsing
//! requires narrative mode, expression parsing requires command mode, and
//! the tokenizer never changes the flag on its own.

use crate::ast::{BinaryOp, Command, Expression, UnaryOp};
use crate::error::{ExpectedSet, ParseError, ParseErrorCode};
use crate::lexer::Tokenizer;
use crate::token::{Pos, Token, TokenKind};

pub fn parse_passage(name: &str, body: &str, start_line: usize) -> Result<Vec<Command>, ParseError> {
    let mut parser = Parser::new(name, body, start_line);
    parser.parse_body()
}

struct Parser {
    passage_name: String,
    tokenizer: Tokenizer,
    current: Token,
}

impl Parser {
    fn new(passage_name: &str, body: &str, start_line: usize) -> Self {
        let mut tokenizer = Tokenizer::new(body, start_line);
        tokenizer.command_mode = false;
        let current = tokenizer.next_token();
        Parser {
            passage_name: passage_name.to_string(),
            tokenizer,
            current,
        }
    }

    fn err(&self, code: ParseErrorCode) -> ParseError {
        ParseError::new(self.passage_name.clone(), self.current.pos.line, self.current.pos.column, code)
    }

    fn err_at(&self, pos: Pos, code: ParseErrorCode) -> ParseError {
        ParseError::new(self.passage_name.clone(), pos.line, pos.column, code)
    }

    fn unexpected(&self, expected: &[&'static str]) -> ParseError {
        self.err(ParseErrorCode::UnexpectedToken {
            expected: ExpectedSet(expected.to_vec()),
            found: self.current.kind.to_string(),
        })
    }

    fn advance_narrative(&mut self) {
        self.tokenizer.command_mode = false;
        self.current = self.tokenizer.next_token();
    }

    fn advance_command(&mut self) {
        self.tokenizer.command_mode = true;
        self.current = self.tokenizer.next_token();
    }

    /// Consume the immediately-following newline (if any) and fetch the next
    /// narrative-mode token. Used after `>>` and after `]]`/selections, so a
    /// macro on its own line does not leave a spurious blank line behind.
    fn finish_construct(&mut self) {
        self.tokenizer.command_mode = false;
        self.tokenizer.skip_one_newline();
        self.current = self.tokenizer.next_token();
    }

    fn expect_command_end(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::CommandEnd) {
            self.finish_construct();
            Ok(())
        } else {
            Err(self.unexpected(&["\">>\""]))
        }
    }

    // ---- passage body ----

    fn parse_body(&mut self) -> Result<Vec<Command>, ParseError> {
        let mut commands = Vec::new();
        loop {
            self.tokenizer.command_mode = false;
            match self.current.kind.clone() {
                TokenKind::Eof => break,
                TokenKind::Text(text) => {
                    commands.push(Command::PrintText { text });
                    self.advance_narrative();
                }
                TokenKind::CommandStart => {
                    commands.extend(self.parse_command()?);
                }
                TokenKind::SpecialOpen => {
                    let cmd = self.parse_special()?;
                    commands.push(cmd);
                }
                TokenKind::Asterisk => {
                    if self.selection_follows() {
                        let cmd = self.parse_selection()?;
                        commands.push(cmd);
                    } else {
                        commands.push(Command::PrintText { text: "*".to_string() });
                        self.advance_narrative();
                    }
                }
                _ => return Err(self.unexpected(&["text", "\"<<\"", "\"[\"", "\"*\""])),
            }
        }
        Ok(commands)
    }

    /// `* [[TEXT|TARGET]]` only counts as a selection when the asterisk is
    /// followed by exactly one space then `[[`; otherwise it is plain text.
    fn selection_follows(&mut self) -> bool {
        let lookahead = self.tokenizer.peek(3);
        matches!(&lookahead[0].kind, TokenKind::Text(s) if s == " ")
            && matches!(lookahead[1].kind, TokenKind::SpecialOpen)
            && matches!(lookahead[2].kind, TokenKind::SpecialOpen)
    }

    fn parse_selection(&mut self) -> Result<Command, ParseError> {
        // self.current == Asterisk
        self.advance_narrative(); // Text(" ")
        self.advance_narrative(); // SpecialOpen #1
        self.advance_narrative(); // SpecialOpen #2

        let text = match self.current.kind.clone() {
            TokenKind::Text(s) => {
                self.advance_narrative();
                s
            }
            _ => return Err(self.unexpected(&["selection text"])),
        };

        if !matches!(self.current.kind, TokenKind::SpecialSeparator) {
            return Err(self.unexpected(&["\"|\""]));
        }
        self.advance_narrative();

        let target = match self.current.kind.clone() {
            TokenKind::Text(s) => {
                self.advance_narrative();
                s
            }
            _ => return Err(self.unexpected(&["selection target"])),
        };

        if !matches!(self.current.kind, TokenKind::SpecialClose) {
            return Err(self.unexpected(&["\"]\""]));
        }
        self.advance_narrative();
        if !matches!(self.current.kind, TokenKind::SpecialClose) {
            return Err(self.unexpected(&["\"]\""]));
        }
        self.finish_construct();

        Ok(Command::AddSelection { text, target })
    }

    // ---- specials ----

    fn parse_special(&mut self) -> Result<Command, ParseError> {
        // self.current == SpecialOpen (outer `[`)
        self.advance_command();
        let name = self.expect_identifier()?;
        match name.as_str() {
            "img" => {
                self.advance_narrative();
                if !matches!(self.current.kind, TokenKind::SpecialOpen) {
                    return Err(self.unexpected(&["\"[\""]));
                }
                self.advance_narrative();
                let image_name = match self.current.kind.clone() {
                    TokenKind::Text(s) => {
                        self.advance_narrative();
                        s
                    }
                    TokenKind::SpecialClose => String::new(),
                    _ => return Err(self.unexpected(&["image name"])),
                };
                if !matches!(self.current.kind, TokenKind::SpecialClose) {
                    return Err(self.unexpected(&["\"]\""]));
                }
                self.advance_narrative();
                if !matches!(self.current.kind, TokenKind::SpecialClose) {
                    return Err(self.unexpected(&["\"]\""]));
                }
                self.finish_construct();
                Ok(Command::SetImage { name: image_name })
            }
            other => Err(self.err(ParseErrorCode::UnknownSpecial(other.to_string()))),
        }
    }

    // ---- commands ----

    fn parse_command(&mut self) -> Result<Vec<Command>, ParseError> {
        // self.current == CommandStart
        self.advance_command();
        let name = self.expect_identifier()?;
        match name.as_str() {
            "pause" => {
                self.advance_command();
                self.expect_command_end()?;
                Ok(vec![Command::Pause])
            }
            "return" => {
                self.advance_command();
                self.expect_command_end()?;
                Ok(vec![Command::ReturnPassage])
            }
            "jump" => {
                let target = self.parse_target_name()?;
                self.expect_command_end()?;
                Ok(vec![Command::JumpToPassage { target }])
            }
            "call" => {
                let target = self.parse_target_name()?;
                self.expect_command_end()?;
                Ok(vec![Command::CallPassage { target }])
            }
            "music" => {
                self.advance_command();
                let music_name = self.expect_string()?;
                self.advance_command();
                let track = if matches!(self.current.kind, TokenKind::Comma) {
                    self.advance_command();
                    self.parse_expression()?
                } else {
                    Expression::Int(0)
                };
                self.expect_command_end()?;
                Ok(vec![Command::SetMusic { name: music_name, track }])
            }
            "set" => {
                self.advance_command();
                let var_name = self.expect_identifier()?;
                self.advance_command();
                if !matches!(self.current.kind, TokenKind::Assign) {
                    return Err(self.unexpected(&["\"=\""]));
                }
                self.advance_command();
                let expr = self.parse_expression()?;
                self.expect_command_end()?;
                Ok(vec![Command::SetVariable { name: var_name, expr }])
            }
            "print" => {
                self.advance_command();
                let expr = self.parse_expression()?;
                self.expect_command_end()?;
                Ok(vec![Command::PrintResult { expr }])
            }
            "if" => {
                self.advance_command();
                let condition = self.parse_expression()?;
                self.expect_command_end()?;
                let body = self.parse_if_body()?;
                let skip_count = body.len() + 1;
                let mut out = Vec::with_capacity(body.len() + 1);
                out.push(Command::If { condition, skip_count });
                out.extend(body);
                Ok(out)
            }
            other => Err(self.err(ParseErrorCode::UnknownCommand(other.to_string()))),
        }
    }

    /// Reads a jump/call target. The target is scanned as a narrative `Text`
    /// run (so passage names may contain spaces and punctuation), trimmed of
    /// surrounding whitespace.
    fn parse_target_name(&mut self) -> Result<String, ParseError> {
        self.advance_narrative();
        let target = match self.current.kind.clone() {
            TokenKind::Text(s) => s.trim().to_string(),
            TokenKind::CommandEnd => String::new(),
            _ => return Err(self.unexpected(&["passage name"])),
        };
        if !matches!(self.current.kind, TokenKind::CommandEnd) {
            self.advance_command();
        }
        Ok(target)
    }

    fn parse_if_body(&mut self) -> Result<Vec<Command>, ParseError> {
        let mut commands = Vec::new();
        loop {
            self.tokenizer.command_mode = false;
            match self.current.kind.clone() {
                TokenKind::Eof => return Err(self.err(ParseErrorCode::UnterminatedIf)),
                TokenKind::CommandStart => {
                    self.tokenizer.command_mode = true;
                    let lookahead = self.tokenizer.peek(1);
                    if let TokenKind::Identifier(ident) = &lookahead[0].kind {
                        if ident == "endif" {
                            self.advance_command(); // consume CommandStart, read "endif"
                            self.advance_command(); // consume "endif", read ">>"
                            self.expect_command_end()?;
                            return Ok(commands);
                        }
                        if ident == "if" {
                            return Err(self.err(ParseErrorCode::NestedIfUnsupported));
                        }
                    }
                    commands.extend(self.parse_command()?);
                }
                TokenKind::Text(text) => {
                    commands.push(Command::PrintText { text });
                    self.advance_narrative();
                }
                TokenKind::SpecialOpen => {
                    let cmd = self.parse_special()?;
                    commands.push(cmd);
                }
                TokenKind::Asterisk => {
                    if self.selection_follows() {
                        let cmd = self.parse_selection()?;
                        commands.push(cmd);
                    } else {
                        commands.push(Command::PrintText { text: "*".to_string() });
                        self.advance_narrative();
                    }
                }
                _ => return Err(self.unexpected(&["text", "\"<<\"", "\"[\"", "\"*\""])),
            }
        }
    }

    // ---- expressions ----
    //
    // Precedence, lowest to highest: Cond (or/and) -> Equality -> Comparison
    // -> AddSub -> MulDiv -> Unary -> Atom. Each level is a thin loop over a
    // small operator table consulting the next tighter level, per the
    // "parser tables" design note.

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_cond()
    }

    fn parse_cond(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::And => BinaryOp::And,
                _ => break,
            };
            self.advance_command();
            let right = self.parse_equality()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Equals | TokenKind::Is => BinaryOp::Eq,
                TokenKind::NotEqual | TokenKind::NotEqualWeird => BinaryOp::NotEq,
                _ => break,
            };
            self.advance_command();
            let right = self.parse_comparison()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_addsub()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LesserThan => BinaryOp::Lt,
                TokenKind::GreaterThan => BinaryOp::Gt,
                TokenKind::LesserEqual => BinaryOp::Le,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            self.advance_command();
            let right = self.parse_addsub()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_addsub(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_muldiv()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Add => BinaryOp::Add,
                TokenKind::Subtract => BinaryOp::Sub,
                _ => break,
            };
            self.advance_command();
            let right = self.parse_muldiv()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_muldiv(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Multiply => BinaryOp::Mul,
                TokenKind::Divide => BinaryOp::Div,
                TokenKind::Remainder => BinaryOp::Rem,
                _ => break,
            };
            self.advance_command();
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        match self.current.kind {
            TokenKind::Not => {
                self.advance_command();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::LogicalNot, Box::new(operand)))
            }
            TokenKind::Subtract => {
                self.advance_command();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::Negate, Box::new(operand)))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance_command();
                Ok(Expression::Int(n))
            }
            TokenKind::String(s) => {
                self.advance_command();
                Ok(Expression::String(s))
            }
            TokenKind::True => {
                self.advance_command();
                Ok(Expression::Bool(true))
            }
            TokenKind::False => {
                self.advance_command();
                Ok(Expression::Bool(false))
            }
            TokenKind::Identifier(name) => {
                self.advance_command();
                if matches!(self.current.kind, TokenKind::ParenOpen) {
                    self.advance_command();
                    let mut args = Vec::new();
                    if !matches!(self.current.kind, TokenKind::ParenClose) {
                        loop {
                            args.push(self.parse_expression()?);
                            if matches!(self.current.kind, TokenKind::Comma) {
                                self.advance_command();
                                continue;
                            }
                            break;
                        }
                    }
                    if !matches!(self.current.kind, TokenKind::ParenClose) {
                        return Err(self.unexpected(&["\")\""]));
                    }
                    self.advance_command();
                    Ok(Expression::FunctionCall(name, args))
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            TokenKind::ParenOpen => {
                self.advance_command();
                let inner = self.parse_expression()?;
                if !matches!(self.current.kind, TokenKind::ParenClose) {
                    return Err(self.unexpected(&["\")\""]));
                }
                self.advance_command();
                Ok(inner)
            }
            _ => Err(self.unexpected(&["number", "string", "\"true\"", "\"false\"", "identifier", "\"(\""])),
        }
    }

    // ---- token-kind helpers ----

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current.kind.clone() {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(self.unexpected(&["identifier"])),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.current.kind.clone() {
            TokenKind::String(s) => Ok(s),
            _ => Err(self.unexpected(&["string literal"])),
        }
    }
}
