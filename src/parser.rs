// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::Diagnostics;
use crate::lexer::*;
use crate::rvm::instructions::fold::{self, Fragment};
use crate::rvm::instructions::{BinaryOp, Instruction, UnaryOp};
use crate::rvm::program::Program;
use crate::value::Value;

use anyhow::Result;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    depth: usize,
}

/// Deepest nesting of sub-expressions a rule may use.
pub const MAX_NESTING_DEPTH: usize = 128;

const KEYWORDS: [&str; 10] = [
    "True", "False", "None", "and", "or", "not", "in", "is", "if", "else",
];

pub fn is_keyword(ident: &str) -> bool {
    KEYWORDS.contains(&ident)
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            depth: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_token(&self) -> Result<Token> {
        self.lexer.clone().next_token()
    }

    fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.tok.1.line, self.tok.1.col, msg)
    }

    fn is_symbol(&self, text: &str) -> bool {
        self.tok.0 == TokenKind::Symbol && self.tok.1.text() == text
    }

    fn is_kw(&self, kw: &str) -> bool {
        self.tok.0 == TokenKind::Ident && self.tok.1.text() == kw
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text && self.tok.0 != TokenKind::Eof {
            self.next_token()
        } else {
            Err(self.error(&format!("expecting `{text}` {context}")))
        }
    }

    /// Current token is `{` (or `}`) immediately followed by another one.
    fn at_double(&self, brace: &str) -> Result<bool> {
        if !self.is_symbol(brace) {
            return Ok(false);
        }
        let next = self.peek_token()?;
        Ok(next.0 == TokenKind::Symbol && next.1.text() == brace && next.1.start == self.tok.1.end)
    }

    fn expect_double(&mut self, brace: &str, context: &str) -> Result<()> {
        if !self.at_double(brace)? {
            return Err(self.error(&format!("expecting `{brace}{brace}` {context}")));
        }
        self.next_token()?;
        self.next_token()
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    pub fn parse_expr(&mut self) -> Result<Fragment> {
        self.nested(Self::parse_trinary_expr)
    }

    // a if cond else b
    fn parse_trinary_expr(&mut self) -> Result<Fragment> {
        let then = self.parse_or_expr()?;
        if !self.is_kw("if") {
            return Ok(then);
        }
        self.next_token()?;
        let cond = self.parse_or_expr()?;
        if !self.is_kw("else") {
            return Err(self.error("expecting `else` in conditional expression"));
        }
        self.next_token()?;
        let otherwise = self.nested(Self::parse_trinary_expr)?;
        Ok(fold::trinary(then, cond, otherwise))
    }

    fn parse_or_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_and_expr()?;
        while self.is_kw("or") {
            self.next_token()?;
            let right = self.parse_and_expr()?;
            expr = fold::or(expr, right);
        }
        Ok(expr)
    }

    fn parse_and_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_not_expr()?;
        while self.is_kw("and") {
            self.next_token()?;
            let right = self.parse_not_expr()?;
            expr = fold::and(expr, right);
        }
        Ok(expr)
    }

    fn parse_not_expr(&mut self) -> Result<Fragment> {
        if self.is_kw("not") {
            self.next_token()?;
            let operand = self.nested(Self::parse_not_expr)?;
            return Ok(fold::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison_expr()
    }

    fn comparison_op(&self) -> Result<Option<(BinaryOp, usize)>> {
        if self.tok.0 == TokenKind::Ident {
            let next_is = |kw: &str| -> Result<bool> {
                let next = self.peek_token()?;
                Ok(next.0 == TokenKind::Ident && next.1.text() == kw)
            };
            return Ok(match self.tok.1.text() {
                "not" if next_is("in")? => Some((BinaryOp::NotIn, 2)),
                "is" if next_is("not")? => Some((BinaryOp::IsNot, 2)),
                "in" => Some((BinaryOp::In, 1)),
                "is" => Some((BinaryOp::Is, 1)),
                _ => None,
            });
        }
        if self.tok.0 != TokenKind::Symbol {
            return Ok(None);
        }
        Ok(match self.tok.1.text() {
            "<" => Some((BinaryOp::Lt, 1)),
            ">" => Some((BinaryOp::Gt, 1)),
            "<=" => Some((BinaryOp::Le, 1)),
            ">=" => Some((BinaryOp::Ge, 1)),
            "!=" => Some((BinaryOp::Ne, 1)),
            "==" => Some((BinaryOp::Eq, 1)),
            _ => None,
        })
    }

    fn parse_comparison_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_bit_or_expr()?;
        while let Some((op, tokens)) = self.comparison_op()? {
            for _ in 0..tokens {
                self.next_token()?;
            }
            let right = self.parse_bit_or_expr()?;
            expr = fold::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_bit_or_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_bit_xor_expr()?;
        while self.is_symbol("|") {
            self.next_token()?;
            let right = self.parse_bit_xor_expr()?;
            expr = fold::binary(BinaryOp::BitOr, expr, right);
        }
        Ok(expr)
    }

    fn parse_bit_xor_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_bit_and_expr()?;
        while self.is_symbol("^") {
            self.next_token()?;
            let right = self.parse_bit_and_expr()?;
            expr = fold::binary(BinaryOp::BitXor, expr, right);
        }
        Ok(expr)
    }

    fn parse_bit_and_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_shift_expr()?;
        while self.is_symbol("&") {
            self.next_token()?;
            let right = self.parse_shift_expr()?;
            expr = fold::binary(BinaryOp::BitAnd, expr, right);
        }
        Ok(expr)
    }

    fn parse_shift_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_arith_expr()?;
        loop {
            let op = match self.token_text() {
                "<<" => BinaryOp::LeftShift,
                ">>" => BinaryOp::RightShift,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_arith_expr()?;
            expr = fold::binary(op, expr, right);
        }
    }

    fn parse_arith_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_mul_div_mod_expr()?;
        loop {
            let op = match self.token_text() {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_mul_div_mod_expr()?;
            expr = fold::binary(op, expr, right);
        }
    }

    fn parse_mul_div_mod_expr(&mut self) -> Result<Fragment> {
        let mut expr = self.parse_unary_expr()?;
        loop {
            let op = match self.token_text() {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::TrueDiv,
                "//" => BinaryOp::FloorDiv,
                "%" => BinaryOp::Mod,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_unary_expr()?;
            expr = fold::binary(op, expr, right);
        }
    }

    fn parse_unary_expr(&mut self) -> Result<Fragment> {
        let op = match self.token_text() {
            "+" if self.tok.0 == TokenKind::Symbol => UnaryOp::Positive,
            "-" if self.tok.0 == TokenKind::Symbol => UnaryOp::Negative,
            "~" if self.tok.0 == TokenKind::Symbol => UnaryOp::Invert,
            _ => return self.parse_power_expr(),
        };
        self.next_token()?;
        let operand = self.nested(Self::parse_unary_expr)?;
        Ok(fold::unary(op, operand))
    }

    // Right associative; the exponent may carry a sign.
    fn parse_power_expr(&mut self) -> Result<Fragment> {
        let base = self.parse_postfix_expr()?;
        if !self.is_symbol("**") {
            return Ok(base);
        }
        self.next_token()?;
        let exponent = self.nested(Self::parse_unary_expr)?;
        Ok(fold::binary(BinaryOp::Pow, base, exponent))
    }

    fn parse_postfix_expr(&mut self) -> Result<Fragment> {
        let mut term = self.parse_primary()?;
        loop {
            if self.tok.0 != TokenKind::Symbol {
                return Ok(term);
            }
            match self.tok.1.text() {
                "." => {
                    self.next_token()?;
                    if self.tok.0 != TokenKind::Ident {
                        return Err(self.error("expecting attribute name after `.`"));
                    }
                    term = fold::attribute(term, self.tok.1.text());
                    self.next_token()?;
                }
                "[" => {
                    self.next_token()?;
                    let key = self.parse_expr()?;
                    self.expect("]", "while parsing item access")?;
                    term = fold::item(term, key);
                }
                "(" => {
                    self.next_token()?;
                    let args = self.parse_comma_list(")")?;
                    self.expect(")", "while parsing call expr")?;
                    term = fold::call(term, args);
                }
                _ => return Ok(term),
            }
        }
    }

    // Items up to `close`. A lone comma or a trailing comma is tolerated.
    fn parse_comma_list(&mut self, close: &str) -> Result<Vec<Fragment>> {
        let mut items = vec![];
        if self.is_symbol(",") {
            self.next_token()?;
            return Ok(items);
        }
        if self.is_symbol(close) {
            return Ok(items);
        }
        items.push(self.parse_expr()?);
        while self.is_symbol(",") {
            self.next_token()?;
            if self.is_symbol(close) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }

    fn read_number(span: &Span) -> Result<Value> {
        let text = span.text();
        if text.contains(['.', 'e', 'E']) {
            match text.parse::<f64>() {
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => Err(span.error("invalid number")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => Ok(Value::Int(i)),
                Err(_) => Err(span.error("integer literal out of range")),
            }
        }
    }

    fn read_string(&mut self) -> Result<Value> {
        let mut text = String::new();
        while self.tok.0 == TokenKind::String {
            match unescape(self.tok.1.text()) {
                Ok(s) => text.push_str(&s),
                Err(msg) => return Err(self.error(&msg)),
            }
            self.next_token()?;
        }
        Ok(Value::from(text))
    }

    fn parse_primary(&mut self) -> Result<Fragment> {
        match self.tok.0 {
            TokenKind::Number => {
                let value = Self::read_number(&self.tok.1)?;
                self.next_token()?;
                Ok(fold::constant(value))
            }
            TokenKind::String => Ok(fold::constant(self.read_string()?)),
            TokenKind::Ident => {
                let value = match self.tok.1.text() {
                    "True" => Value::Bool(true),
                    "False" => Value::Bool(false),
                    "None" => Value::None,
                    kw if is_keyword(kw) => {
                        return Err(self.error(&format!("unexpected keyword `{kw}`")))
                    }
                    name => {
                        let ident = vec![Instruction::Ident(name.to_string())];
                        self.next_token()?;
                        return Ok(ident);
                    }
                };
                self.next_token()?;
                Ok(fold::constant(value))
            }
            TokenKind::Symbol if self.is_symbol("{") => {
                self.next_token()?;
                let items = self.parse_comma_list("}")?;
                self.expect("}", "while parsing set")?;
                Ok(fold::set(items))
            }
            TokenKind::Symbol if self.is_symbol("(") => {
                self.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(")", "while parsing parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::Eof => Err(self.error("expecting expression")),
            _ => Err(self.error(&format!("unexpected `{}`", self.tok.1.text()))),
        }
    }

    fn at_rule_end(&self) -> Result<bool> {
        Ok(self.tok.0 == TokenKind::Eof || self.at_double("{")?)
    }

    fn parse_condition(&mut self) -> Result<Fragment> {
        if self.tok.0 == TokenKind::Eof {
            return Ok(fold::constant(Value::Bool(false)));
        }
        if self.at_double("{")? {
            // Either a set of sets or the attribute block of a rule
            // without condition.
            let state = self.clone();
            if let Ok(expr) = self.parse_expr() {
                if self.at_rule_end()? {
                    return Ok(expr);
                }
            }
            *self = state;
            return Ok(fold::constant(Value::Bool(false)));
        }
        self.parse_expr()
    }

    fn parse_attribute_name(&mut self) -> Result<String> {
        let text = self.tok.1.text();
        let valid = self.tok.0 == TokenKind::Ident
            && text.starts_with(|c: char| c.is_ascii_alphabetic())
            && !is_keyword(text);
        if !valid {
            return Err(self.error("expecting authorization attribute name"));
        }
        let name = text.to_string();
        self.next_token()?;
        Ok(name)
    }

    // {{ [name = [expr] (, name = [expr])*] [,] }}
    fn parse_attribute_block(&mut self, code: &mut Fragment) -> Result<()> {
        self.expect_double("{", "to open authorization attributes")?;
        if self.is_symbol(",") {
            self.next_token()?;
        } else if !self.at_double("}")? {
            loop {
                let name = self.parse_attribute_name()?;
                self.expect("=", "after authorization attribute name")?;
                let value = if self.is_symbol(",") || self.at_double("}")? {
                    fold::constant(Value::None)
                } else {
                    self.parse_expr()?
                };
                code.extend(value);
                code.push(Instruction::SetAuthorizationAttr(name));
                if self.at_double("}")? {
                    break;
                }
                if !self.is_symbol(",") {
                    return Err(self.error("expecting `,` or `}}` in authorization attributes"));
                }
                self.next_token()?;
                if self.at_double("}")? {
                    break;
                }
            }
        }
        self.expect_double("}", "to close authorization attributes")
    }

    /// `[expression] ["{{" attributes "}}"]`
    pub fn parse_rule(&mut self) -> Result<Fragment> {
        let mut code = self.parse_condition()?;
        code.push(Instruction::SetAuthorization);
        if self.at_double("{")? {
            self.parse_attribute_block(&mut code)?;
        }
        if self.tok.0 != TokenKind::Eof {
            return Err(self.error(&format!("unexpected `{}`", self.tok.1.text())));
        }
        Ok(code)
    }
}

/// Parse and compile rule text. Errors downcast to [`SyntaxError`].
pub fn parse_rule(name: &str, text: &str) -> Result<Program> {
    let source = Source::from_contents(name.to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    let code = parser.parse_rule()?;
    match Program::new(code) {
        Ok(program) => Ok(program),
        Err(e) => Err(source.error(1, 1, &e.to_string())),
    }
}

/// Compile rule text, failing closed.
///
/// A rule that does not parse is reported once and compiles to a program
/// that denies.
pub fn compile_rule(name: &str, text: &str, diagnostics: &dyn Diagnostics) -> Program {
    match parse_rule(name, text) {
        Ok(program) => program,
        Err(err) => {
            match err.downcast_ref::<SyntaxError>() {
                Some(e) => diagnostics.syntax_error(e),
                None => diagnostics.syntax_error(&SyntaxError {
                    rule: name.to_string(),
                    line: 1,
                    col: 1,
                    source_line: text.lines().next().unwrap_or_default().to_string(),
                    message: format!("{err:#}"),
                }),
            }
            Program::fail_closed()
        }
    }
}
