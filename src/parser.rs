//! Filter的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ "Filter:" → parse_field_filters()
//!   │               └─ parse_field_filter()
//!   │                    ├─ 解析字段名 (Identifier)
//!   │                    ├─ 期望 '['
//!   │                    ├─ parse_condition()
//!   │                    └─ 期望 ']'
//!   │
//!   └─ parse_condition() (递归下降解析)
//!        └─ parse_or_expression()
//!             ├─ parse_and_expression()
//!             │    ├─ parse_not_expression()
//!             │    │    └─ parse_primary_expression()
//!             │    │         ├─ "(" → 分组表达式 (递归调用parse_condition)
//!             │    │         ├─ "IS" → IS NULL / IS NOT NULL
//!             │    │         ├─ "IN" → IN (值列表)
//!             │    │         ├─ "LIKE" → LIKE 模式
//!             │    │         ├─ 比较运算符 → 比较操作 + 字面值
//!             │    │         └─ 其他 → 默认相等比较 + 字面值
//!             │    │
//!             │    └─ 遇到AND时，继续解析右侧NOT表达式
//!             │
//!             └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **NOT操作** `NOT expression`
//! 3. **比较操作** `field[>value]`, `field[=value]`, `IS NULL`, `IN (...)`, `LIKE "a%"`
//! 4. **AND操作** `expr1 AND expr2`
//! 5. **OR操作** `expr1 OR expr2`
//!
//! ### 字面值类型
//! - **字符串**: `"quoted string"` 或 `unquoted_identifier`
//! - **数字**: `123`, `-456`, `2.5`
//! - **布尔值**: `true`, `false`
//! - **空值**: `null`
//!
//! ## 解析示例
//!
//! ```text
//! Filter: Status["Active"]
//! Filter: Age[>=18 AND <65]; Status["Active" OR "Held"]
//! Filter: EmailAddress[LIKE "%@example.com"]; Region[NOT IN ("EU", "APAC")]
//! ```

use thiserror::Error;

use crate::ast::{Query, FieldFilter, Condition, Identifier, CompOp, Literal};
use crate::token::{Token, TokenKind, Span};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        let tokens = self.tokens;
        tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    /// 检查当前 token 是否为比较运算符
    fn is_comparison_operator(&self) -> bool {
        if let Some(token) = self.peek() {
            matches!(token.kind,
                TokenKind::Eq | TokenKind::NotEq | TokenKind::Gt |
                TokenKind::Lt | TokenKind::Gte | TokenKind::Lte)
        } else {
            false
        }
    }

    pub fn parse(&mut self) -> Result<Query, ParseError> {
        let mut filters = Vec::new();

        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Filter => {
                    self.advance(); // 消费 "Filter:"
                    filters.extend(self.parse_field_filters()?);
                }
                _ => {
                    return Err(ParseError::at_position(
                        format!("Unexpected token: {:?}", token.kind),
                        token.span,
                    ));
                }
            }
        }

        if filters.is_empty() {
            return Err(ParseError::new("Expected at least one field filter".to_string(), None));
        }

        Ok(Query { filters })
    }

    /// 解析字段Filter，直到遇到下一个 "Filter:" 或输入结束
    fn parse_field_filters(&mut self) -> Result<Vec<FieldFilter>, ParseError> {
        let mut filters = Vec::new();

        loop {
            let filter = self.parse_field_filter()?;
            filters.push(filter);

            let Some(token) = self.peek() else {
                break; // 输入结束
            };
            match &token.kind {
                TokenKind::Semicolon => {
                    self.advance(); // 消费分号
                    // 允许末尾分号
                    if self.peek().is_none() || self.match_token(&TokenKind::Filter) {
                        break;
                    }
                }
                TokenKind::Filter => break,
                _ => {
                    return Err(ParseError::at_position(
                        format!("Expected semicolon, found {:?}", token.kind),
                        token.span,
                    ));
                }
            }
        }

        Ok(filters)
    }

    fn parse_field_filter(&mut self) -> Result<FieldFilter, ParseError> {
        let field_token = self.expect(TokenKind::Identifier(""))?;
        let field = if let TokenKind::Identifier(name) = &field_token.kind {
            Identifier(name.to_string())
        } else {
            return Err(ParseError::at_position(
                "Expected field identifier".to_string(),
                field_token.span,
            ));
        };

        self.expect(TokenKind::LBracket)?;
        let condition = self.parse_condition()?;
        self.expect(TokenKind::RBracket)?;

        Ok(FieldFilter { field, condition })
    }

    /// 解析条件表达式的入口点
    ///
    /// 条件解析采用递归下降方式，按照优先级从低到高依次处理：
    /// OR → AND → NOT → PRIMARY
    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.parse_or_expression()
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    /// 示例: `"Active" OR "Held" OR "Bounced"`
    fn parse_or_expression(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            let right = self.parse_and_expression()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// 解析AND表达式 (中等优先级)
    ///
    /// 语法: `not_expr (AND not_expr)*`
    /// 示例: `>5 AND <=10`
    fn parse_and_expression(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_not_expression()?;

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 AND
            let right = self.parse_not_expression()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// 解析NOT表达式 (较高优先级)
    ///
    /// 语法: `NOT* primary_expr`
    /// 示例: `NOT "Closed"`, `NOT NOT "Open"`
    fn parse_not_expression(&mut self) -> Result<Condition, ParseError> {
        if self.match_token(&TokenKind::Not) {
            self.advance(); // 消费 NOT
            let expr = self.parse_not_expression()?; // 允许 NOT 链式调用
            Ok(Condition::Not(Box::new(expr)))
        } else {
            self.parse_primary_expression()
        }
    }

    /// 解析基础表达式 (最高优先级)
    ///
    /// 支持的表达式类型:
    /// - `(condition)` - 分组表达式
    /// - `IS [NOT] NULL` - 空值检查
    /// - `IN (value1, value2, ...)` - 列表包含
    /// - `LIKE value` - 模式匹配
    /// - `op value` - 带运算符的比较 (如 `>5`, `="test"`)
    /// - `value` - 默认相等比较 (如 `"Open"` 等价于 `="Open"`)
    fn parse_primary_expression(&mut self) -> Result<Condition, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new("Unexpected end of input".to_string(), None));
        };

        match &token.kind {
            TokenKind::LParen => {
                self.advance(); // 消费 (
                let expr = self.parse_condition()?;
                self.expect(TokenKind::RParen)?;
                Ok(Condition::Grouped(Box::new(expr)))
            }
            TokenKind::Is => {
                self.advance(); // 消费 IS
                if self.match_token(&TokenKind::Not) {
                    self.advance(); // 消费 NOT
                    self.expect(TokenKind::Null)?;
                    Ok(Condition::IsNotNull)
                } else {
                    self.expect(TokenKind::Null)?;
                    Ok(Condition::IsNull)
                }
            }
            TokenKind::In => {
                self.advance(); // 消费 IN
                self.expect(TokenKind::LParen)?;
                let mut values = Vec::new();

                // 解析逗号分隔的值列表
                if !self.match_token(&TokenKind::RParen) {
                    loop {
                        values.push(self.parse_literal()?);
                        if self.match_token(&TokenKind::RParen) {
                            break;
                        }
                        self.expect(TokenKind::Comma)?;
                    }
                }

                self.expect(TokenKind::RParen)?;
                Ok(Condition::In(values))
            }
            TokenKind::Like => {
                self.advance(); // 消费 LIKE
                let pattern = self.parse_literal()?;
                Ok(Condition::Like(pattern))
            }
            _ => {
                // 检查是否以比较运算符开始
                if self.is_comparison_operator() {
                    let op = self.parse_comparison_operator()?;
                    let value = self.parse_literal()?;
                    Ok(Condition::Comparison { op, value })
                } else {
                    // 如果没有指定运算符，默认为相等比较
                    let value = self.parse_literal()?;
                    Ok(Condition::Comparison { op: CompOp::Eq, value })
                }
            }
        }
    }

    fn parse_comparison_operator(&mut self) -> Result<CompOp, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::new("Expected comparison operator".to_string(), None));
        };

        match &token.kind {
            TokenKind::Eq => Ok(CompOp::Eq),
            TokenKind::NotEq => Ok(CompOp::NotEq),
            TokenKind::Gt => Ok(CompOp::Gt),
            TokenKind::Lt => Ok(CompOp::Lt),
            TokenKind::Gte => Ok(CompOp::Gte),
            TokenKind::Lte => Ok(CompOp::Lte),
            _ => Err(ParseError::at_position(
                format!("Expected comparison operator, found {:?}", token.kind),
                token.span,
            )),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::new("Expected literal value".to_string(), None));
        };

        match &token.kind {
            TokenKind::String(s) => Ok(Literal::String(s.to_string())),
            TokenKind::Number(n) => Ok(Literal::Number(*n)),
            TokenKind::Float(x) => Ok(Literal::Float(*x)),
            TokenKind::True => Ok(Literal::Boolean(true)),
            TokenKind::False => Ok(Literal::Boolean(false)),
            TokenKind::Null => Ok(Literal::Null),
            // 不带引号的字符串
            TokenKind::Identifier(s) => Ok(Literal::String(s.to_string())),
            _ => Err(ParseError::at_position(
                format!("Expected literal value, found {:?}", token.kind),
                token.span,
            )),
        }
    }
}

/// 对输入字符串进行分词并解析
pub fn parse_str(input: &str) -> Result<Query, ParseError> {
    let tokens: Vec<_> = crate::lexer::Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}
