//! Filter的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取数字字面量，支持负号和小数部分
    /// 注意：第一个字符（数字或负号）已经被调用者消费
    fn read_number(&mut self, start: usize) -> Token<'a> {
        self.skip_digits();

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump(); // 消费 '.'
            self.skip_digits();
        }

        let literal = &self.input[start..self.position];
        let kind = if is_float {
            literal.parse::<f64>().map_or(TokenKind::Illegal, TokenKind::Float)
        } else {
            // 超出 i64 范围时视为非法 token
            literal.parse::<i64>().map_or(TokenKind::Illegal, TokenKind::Number)
        };
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取双引号包围的字符串字面量
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            self.bump();
        }
        let content_end = self.position;

        // 缺少结束引号
        if self.bump().is_none() {
            return Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) };
        }

        let content = &self.input[content_start..content_end];
        Token {
            kind: TokenKind::String(content),
            span: Span::new(start, self.position),
        }
    }

    /// 读取标识符或关键字
    /// 标识符可以包含字母、数字、连字符、下划线和点（嵌套属性，如 `Subscriber.EmailAddress`）
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];

        // 检查特殊关键字 "Filter:"
        if self.peek() == Some(':') && literal.eq_ignore_ascii_case("Filter") {
            self.bump(); // 消费 ':'
            return Token { kind: TokenKind::Filter, span: Span::new(start, self.position) };
        }

        let kind = match_keyword(literal);
        Token { kind, span: Span::new(start, self.position) }
    }
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "like" => TokenKind::Like,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '=' => Token { kind: TokenKind::Eq, span: Span::new(start, self.position) },
            '(' => Token { kind: TokenKind::LParen, span: Span::new(start, self.position) },
            ')' => Token { kind: TokenKind::RParen, span: Span::new(start, self.position) },
            '[' => Token { kind: TokenKind::LBracket, span: Span::new(start, self.position) },
            ']' => Token { kind: TokenKind::RBracket, span: Span::new(start, self.position) },
            ',' => Token { kind: TokenKind::Comma, span: Span::new(start, self.position) },
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Lte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Lt, span: Span::new(start, self.position) }
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Gte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Gt, span: Span::new(start, self.position) }
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::NotEq, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) }
                }
            }
            ';' => Token { kind: TokenKind::Semicolon, span: Span::new(start, self.position) },
            '"' => self.read_string(start),
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() => self.read_identifier(start),
            _ => Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) },
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_filter() {
        let input = r#"Filter: Status["Open"]"#;
        let mut lexer = Lexer::new(input);

        assert_eq!(lexer.next().unwrap().kind, TokenKind::Filter);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier("Status"));
        assert_eq!(lexer.next().unwrap().kind, TokenKind::LBracket);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::String("Open"));
        assert_eq!(lexer.next().unwrap().kind, TokenKind::RBracket);
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        assert_eq!(
            kinds("!= = > < >= <= ( ) [ ] ; ,"),
            vec![
                TokenKind::NotEq, TokenKind::Eq, TokenKind::Gt, TokenKind::Lt,
                TokenKind::Gte, TokenKind::Lte, TokenKind::LParen, TokenKind::RParen,
                TokenKind::LBracket, TokenKind::RBracket, TokenKind::Semicolon,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("AND or nOt is IN Like NULL TRUE false Subscriber.Email_Address"),
            vec![
                TokenKind::And, TokenKind::Or, TokenKind::Not, TokenKind::Is, TokenKind::In,
                TokenKind::Like, TokenKind::Null, TokenKind::True, TokenKind::False,
                TokenKind::Identifier("Subscriber.Email_Address"),
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            kinds(r#"12345 -7 2.5 "hello world""#),
            vec![
                TokenKind::Number(12345),
                TokenKind::Number(-7),
                TokenKind::Float(2.5),
                TokenKind::String("hello world"),
            ]
        );
    }

    #[test]
    fn test_range_condition() {
        assert_eq!(
            kinds("Age[>=18 AND <65]"),
            vec![
                TokenKind::Identifier("Age"),
                TokenKind::LBracket,
                TokenKind::Gte,
                TokenKind::Number(18),
                TokenKind::And,
                TokenKind::Lt,
                TokenKind::Number(65),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_illegal_input() {
        assert_eq!(kinds("! @"), vec![TokenKind::Illegal, TokenKind::Illegal]);
        assert_eq!(kinds(r#""unterminated"#), vec![TokenKind::Illegal]);
        assert_eq!(kinds("99999999999999999999"), vec![TokenKind::Illegal]);
        // 单独的连字符不是数字
        assert_eq!(kinds("- 5"), vec![TokenKind::Illegal, TokenKind::Number(5)]);
    }
}
