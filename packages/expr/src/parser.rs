use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use std::rc::Rc;

/// Deepest nesting of sub-expressions and prefix operators the parser accepts
pub const MAX_NESTING: usize = 96;

/// Recursive-descent parser for template expressions
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a full program: one or more `;`-separated expressions
    pub fn parse_program(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut expressions = Vec::new();

        while !self.is_at_end() {
            if self.match_token(Token::Semicolon) {
                continue;
            }
            expressions.push(self.parse_expression()?);
            if !self.is_at_end() {
                self.expect(Token::Semicolon)?;
            }
        }

        match expressions.len() {
            0 => Err(ParseError::invalid_syntax(start, "Empty expression")),
            1 => Ok(expressions.remove(0)),
            _ => Ok(Expression::Sequence {
                expressions,
                span: Span::new(start, self.prev_end()),
            }),
        }
    }

    /// Parse a single expression (assignment precedence)
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<Expression>) -> ParseResult<Expression> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::invalid_syntax(
                self.current_pos(),
                "Expression nested too deeply",
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expression> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        let start = self.current_pos();
        let target = self.parse_conditional()?;

        if let Some(operator) = self.match_assign_op() {
            if !target.is_assignable() {
                return Err(ParseError::invalid_syntax(start, "Invalid assignment target"));
            }
            let value = self.parse_assignment()?;
            return Ok(Expression::Assign {
                target: Box::new(target),
                operator,
                value: Box::new(value),
                span: Span::new(start, self.prev_end()),
            });
        }

        Ok(target)
    }

    /// `x => body`, `(a, b) => body`
    fn parse_arrow(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut params = Vec::new();

        if self.match_token(Token::LParen) {
            while !self.check(Token::RParen) && !self.is_at_end() {
                params.push(self.expect_ident()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        } else {
            params.push(self.expect_ident()?);
        }

        self.expect(Token::Arrow)?;
        let body = self.parse_assignment()?;

        Ok(Expression::Arrow {
            params,
            body: Rc::new(body),
            span: Span::new(start, self.prev_end()),
        })
    }

    fn is_arrow_ahead(&self) -> bool {
        match self.peek() {
            Some((Token::Ident(_), _)) => {
                matches!(self.peek_ahead(1), Some((Token::Arrow, _)))
            }
            Some((Token::LParen, _)) => {
                let mut depth = 0usize;
                let mut index = self.pos;
                while let Some((token, _)) = self.tokens.get(index) {
                    match token {
                        Token::LParen => depth += 1,
                        Token::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(self.tokens.get(index + 1), Some((Token::Arrow, _)));
                            }
                        }
                        _ => {}
                    }
                    index += 1;
                }
                false
            }
            _ => false,
        }
    }

    /// Parse `test ? consequent : alternate`
    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let test = self.parse_nullish()?;

        if self.match_token(Token::Question) {
            let consequent = self.parse_assignment()?;
            self.expect(Token::Colon)?;
            let alternate = self.parse_assignment()?;
            return Ok(Expression::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                span: Span::new(start, self.prev_end()),
            });
        }

        Ok(test)
    }

    /// Parse `??` (lowest binary precedence)
    fn parse_nullish(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_or()?;

        while self.match_token(Token::QuestionQuestion) {
            let right = self.parse_or()?;
            left = self.logical(left, LogicalOp::Nullish, right, start);
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_and()?;

        while self.match_token(Token::Or) {
            let right = self.parse_and()?;
            left = self.logical(left, LogicalOp::Or, right, start);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_equality()?;

        while self.match_token(Token::And) {
            let right = self.parse_equality()?;
            left = self.logical(left, LogicalOp::And, right, start);
        }

        Ok(left)
    }

    /// Parse equality expression (== != === !==)
    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_comparison()?;

        while let Some(op) = self.match_equality_op() {
            let right = self.parse_comparison()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse comparison expression (< > <= >=)
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_additive()?;

        while let Some(op) = self.match_comparison_op() {
            let right = self.parse_additive()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse additive expression (+ -)
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_multiplicative()?;

        while let Some(op) = self.match_additive_op() {
            let right = self.parse_multiplicative()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse multiplicative expression (* / %)
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut left = self.parse_unary()?;

        while let Some(op) = self.match_multiplicative_op() {
            let right = self.parse_unary()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();

        let operator = match self.peek() {
            Some((Token::Bang, _)) => Some(UnaryOp::Not),
            Some((Token::Minus, _)) => Some(UnaryOp::Negate),
            Some((Token::Plus, _)) => Some(UnaryOp::Plus),
            Some((Token::Typeof, _)) => Some(UnaryOp::Typeof),
            Some((Token::Delete, _)) => Some(UnaryOp::Delete),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let operand = self.nested(Self::parse_unary)?;
            if operator == UnaryOp::Delete
                && !matches!(operand, Expression::Member { .. } | Expression::Index { .. })
            {
                return Err(ParseError::invalid_syntax(start, "delete expects a property access"));
            }
            return Ok(Expression::Unary {
                operator,
                operand: Box::new(operand),
                span: Span::new(start, self.prev_end()),
            });
        }

        if let Some(operator) = self.match_update_op() {
            let target = self.nested(Self::parse_unary)?;
            if !target.is_assignable() {
                return Err(ParseError::invalid_syntax(
                    start,
                    "Invalid left-hand side in prefix operation",
                ));
            }
            return Ok(Expression::Update {
                operator,
                prefix: true,
                target: Box::new(target),
                span: Span::new(start, self.prev_end()),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let expr = self.parse_call_member()?;

        if expr.is_assignable() {
            if let Some(operator) = self.match_update_op() {
                return Ok(Expression::Update {
                    operator,
                    prefix: false,
                    target: Box::new(expr),
                    span: Span::new(start, self.prev_end()),
                });
            }
        }

        Ok(expr)
    }

    /// Member access, indexing and calls, left to right
    fn parse_call_member(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(Token::Dot) {
                let property = self.expect_property_name()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::QuestionDot) {
                let property = self.expect_property_name()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                    optional: true,
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                    span: Span::new(start, self.prev_end()),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Arguments after an opening paren, consuming the closing one
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        while !self.check(Token::RParen) && !self.is_at_end() {
            arguments.push(self.parse_expression()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(arguments)
    }

    /// Parse primary expression (literals, identifiers, groups)
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let start = self.current_pos();

        let Some((token, range)) = self.peek().cloned() else {
            return Err(ParseError::unexpected_eof(self.source.len(), "expression"));
        };

        match token {
            Token::Number(n) => {
                self.advance();
                let value = n.parse::<f64>().map_err(|_| {
                    ParseError::invalid_syntax(start, format!("Invalid number literal '{}'", n))
                })?;
                Ok(Expression::Number {
                    value,
                    span: Span::new(start, range.end),
                })
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::String {
                    value: unescape(&s[1..s.len() - 1]),
                    span: Span::new(start, range.end),
                })
            }
            Token::Template(s) => {
                self.advance();
                self.parse_template_string(s, range)
            }
            Token::True | Token::False => {
                self.advance();
                Ok(Expression::Boolean {
                    value: token == Token::True,
                    span: Span::new(start, range.end),
                })
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Null {
                    span: Span::new(start, range.end),
                })
            }
            Token::Undefined => {
                self.advance();
                Ok(Expression::Undefined {
                    span: Span::new(start, range.end),
                })
            }
            Token::This => {
                self.advance();
                Ok(Expression::This {
                    span: Span::new(start, range.end),
                })
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expression::Identifier {
                    name: name.to_string(),
                    span: Span::new(start, range.end),
                })
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                self.parse_array_literal(start)
            }
            Token::LBrace => {
                self.advance();
                self.parse_object_literal(start)
            }
            other => Err(ParseError::unexpected_token(
                start,
                "expression",
                other.to_string(),
            )),
        }
    }

    fn parse_array_literal(&mut self, start: usize) -> ParseResult<Expression> {
        let mut elements = Vec::new();
        while !self.check(Token::RBracket) && !self.is_at_end() {
            elements.push(self.parse_expression()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket)?;

        Ok(Expression::Array {
            elements,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_object_literal(&mut self, start: usize) -> ParseResult<Expression> {
        let mut properties = Vec::new();

        while !self.check(Token::RBrace) && !self.is_at_end() {
            let key_start = self.current_pos();
            let (key, shorthand_ok) = match self.peek().cloned() {
                Some((Token::Ident(name), _)) => (name.to_string(), true),
                Some((Token::String(s), _)) => (unescape(&s[1..s.len() - 1]), false),
                Some((Token::Number(n), _)) => (n.to_string(), false),
                Some((token, _)) => match token.keyword_text() {
                    Some(keyword) => (keyword.to_string(), false),
                    None => {
                        return Err(ParseError::unexpected_token(
                            key_start,
                            "property name",
                            token.to_string(),
                        ))
                    }
                },
                None => return Err(ParseError::unexpected_eof(self.source.len(), "property name")),
            };
            self.advance();

            let value = if self.match_token(Token::Colon) {
                self.parse_expression()?
            } else if shorthand_ok {
                Expression::Identifier {
                    name: key.clone(),
                    span: Span::new(key_start, self.prev_end()),
                }
            } else {
                return Err(ParseError::invalid_syntax(
                    key_start,
                    format!("Expected ':' after property '{}'", key),
                ));
            };

            properties.push((key, value));
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;

        Ok(Expression::Object {
            properties,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Parse template literal with ${...} interpolation
    fn parse_template_string(
        &mut self,
        raw: &str,
        range: std::ops::Range<usize>,
    ) -> ParseResult<Expression> {
        let mut parts = Vec::new();
        let content = &raw[1..raw.len() - 1];
        // content starts one byte after the opening backtick
        let base = range.start + 1;
        let mut current = String::new();
        let mut chars = content.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            if ch == '$' && matches!(chars.peek(), Some((_, '{'))) {
                chars.next();

                if !current.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut current)));
                }

                let expr_start = index + 2;
                let mut expr_end = content.len();
                let mut depth = 1;
                for (i, c) in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                expr_end = i;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                if depth != 0 {
                    return Err(ParseError::unexpected_eof(range.end, "'}' closing template part"));
                }

                let expr_src = &content[expr_start..expr_end];
                let expr = Parser::new(expr_src)
                    .and_then(|mut sub| sub.parse_program())
                    .map_err(|e| e.offset(base + expr_start))?;
                parts.push(TemplatePart::Expression(expr));
            } else if ch == '\\' {
                if let Some((_, next)) = chars.next() {
                    push_escape(&mut current, next);
                }
            } else {
                current.push(ch);
            }
        }

        if !current.is_empty() {
            parts.push(TemplatePart::Literal(current));
        }

        Ok(Expression::Template {
            parts,
            span: Span::new(range.start, range.end),
        })
    }

    // Helper methods for matching operators

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek() {
            Some((Token::Assign, _)) => AssignOp::Assign,
            Some((Token::PlusAssign, _)) => AssignOp::Add,
            Some((Token::MinusAssign, _)) => AssignOp::Subtract,
            Some((Token::StarAssign, _)) => AssignOp::Multiply,
            Some((Token::SlashAssign, _)) => AssignOp::Divide,
            Some((Token::PercentAssign, _)) => AssignOp::Remainder,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_update_op(&mut self) -> Option<UpdateOp> {
        if self.match_token(Token::PlusPlus) {
            Some(UpdateOp::Increment)
        } else if self.match_token(Token::MinusMinus) {
            Some(UpdateOp::Decrement)
        } else {
            None
        }
    }

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek() {
            Some((Token::EqualsEquals, _)) => BinaryOp::Equals,
            Some((Token::NotEquals, _)) => BinaryOp::NotEquals,
            Some((Token::StrictEquals, _)) => BinaryOp::StrictEquals,
            Some((Token::StrictNotEquals, _)) => BinaryOp::StrictNotEquals,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_comparison_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek() {
            Some((Token::Less, _)) => BinaryOp::LessThan,
            Some((Token::LessEquals, _)) => BinaryOp::LessThanOrEqual,
            Some((Token::Greater, _)) => BinaryOp::GreaterThan,
            Some((Token::GreaterEquals, _)) => BinaryOp::GreaterThanOrEqual,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Plus) {
            Some(BinaryOp::Add)
        } else if self.match_token(Token::Minus) {
            Some(BinaryOp::Subtract)
        } else {
            None
        }
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Star) {
            Some(BinaryOp::Multiply)
        } else if self.match_token(Token::Slash) {
            Some(BinaryOp::Divide)
        } else if self.match_token(Token::Percent) {
            Some(BinaryOp::Remainder)
        } else {
            None
        }
    }

    fn binary(&self, left: Expression, operator: BinaryOp, right: Expression, start: usize) -> Expression {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::new(start, self.prev_end()),
        }
    }

    fn logical(&self, left: Expression, operator: LogicalOp, right: Expression, start: usize) -> Expression {
        Expression::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::new(start, self.prev_end()),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            return Ok(());
        }
        match self.peek() {
            Some((found, range)) => Err(ParseError::unexpected_token(
                range.start,
                format!("'{}'", token),
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len(), format!("'{}'", token))),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            Some((found, range)) => Err(ParseError::unexpected_token(
                range.start,
                "identifier",
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len(), "identifier")),
        }
    }

    /// Identifiers and keywords are both valid after `.`
    fn expect_property_name(&mut self) -> ParseResult<String> {
        if let Some((token, _)) = self.peek() {
            if let Some(keyword) = token.keyword_text() {
                self.advance();
                return Ok(keyword.to_string());
            }
        }
        self.expect_ident()
    }

    fn current_pos(&self) -> usize {
        self.peek()
            .map(|(_, range)| range.start)
            .unwrap_or(self.source.len())
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, range)| range.end)
            .unwrap_or(0)
    }
}

fn push_escape(out: &mut String, escaped: char) {
    match escaped {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        '0' => out.push('\0'),
        other => out.push(other),
    }
}

/// Resolve backslash escapes inside a quoted string body
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                push_escape(&mut out, next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse an expression source into a program
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    let body = parser.parse_program()?;
    Ok(Program {
        source: source.to_string(),
        body,
    })
}
