// Formula parser - builds an expression tree from tokens

use super::error::{ExpressionError, ExpressionResult};
use super::expr::Expression;
use super::lexer::Lexer;
use super::operator::{BinaryOperator, UnaryOperator};
use super::token::Token;
use crate::table::Value;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ExpressionResult<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            source,
            tokens,
            position: 0,
        })
    }

    /// Parse the whole input as a single expression
    pub fn parse(&mut self) -> ExpressionResult<Expression> {
        if self.match_token(&Token::Eof) {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_expression()?;
        if !self.match_token(&Token::Eof) {
            return Err(self.error(format!(
                "unexpected trailing token {:?}",
                self.current_token()
            )));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> ExpressionResult<Expression> {
        self.parse_or()
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::binary_op(BinaryOperator::Or, left, right);
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::binary_op(BinaryOperator::And, left, right);
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> ExpressionResult<Expression> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::unary_op(UnaryOperator::Not, operand))
        } else {
            self.parse_comparison()
        }
    }

    /// Parse comparison expression
    fn parse_comparison(&mut self) -> ExpressionResult<Expression> {
        let left = self.parse_addition()?;

        if self.match_token(&Token::Is) {
            self.advance();
            let negated = if self.match_token(&Token::Not) {
                self.advance();
                true
            } else {
                false
            };
            self.expect_token(Token::Null)?;
            let op = if negated {
                UnaryOperator::IsNotNull
            } else {
                UnaryOperator::IsNull
            };
            return Ok(Expression::unary_op(op, left));
        }

        let op = match self.current_token() {
            Token::Equal => BinaryOperator::Eq,
            Token::NotEqual => BinaryOperator::Ne,
            Token::Less => BinaryOperator::Lt,
            Token::LessEqual => BinaryOperator::Le,
            Token::Greater => BinaryOperator::Gt,
            Token::GreaterEqual => BinaryOperator::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_addition()?;
        Ok(Expression::binary_op(op, left, right))
    }

    /// Parse addition/subtraction expression
    fn parse_addition(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_multiplication()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();

            let right = self.parse_multiplication()?;
            left = Expression::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplication/division expression
    fn parse_multiplication(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();

            let right = self.parse_unary()?;
            left = Expression::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> ExpressionResult<Expression> {
        match self.current_token() {
            Token::Plus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::unary_op(UnaryOperator::Plus, operand))
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::unary_op(UnaryOperator::Minus, operand))
            }
            _ => self.parse_primary(),
        }
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> ExpressionResult<Expression> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                // Try to parse as integer first, then float
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Expression::Literal(Value::Integer(i)))
                } else if let Ok(f) = n.parse::<f64>() {
                    Ok(Expression::Literal(Value::Float(f)))
                } else {
                    Err(self.error(format!("invalid number {}", n)))
                }
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Literal(Value::Null))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expression::Column(name))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            Token::Eof => Err(self.error("unexpected end of input")),
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    // Helper methods

    fn error(&self, reason: impl Into<String>) -> ExpressionError {
        ExpressionError::parse(self.source, reason)
    }

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position < self.tokens.len().saturating_sub(1) {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> ExpressionResult<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?}, found {:?}",
                token,
                self.current_token()
            )))
        }
    }
}

/// Parse expression text into an expression tree
pub fn parse_expression(source: &str) -> ExpressionResult<Expression> {
    Parser::new(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expression::binary_op(
                BinaryOperator::Add,
                Expression::column("a"),
                Expression::binary_op(
                    BinaryOperator::Mul,
                    Expression::column("b"),
                    Expression::literal(2)
                )
            )
        );
    }

    #[test]
    fn test_parentheses_and_unary() {
        let expr = parse_expression("-(a - 1.5)").unwrap();
        assert_eq!(
            expr,
            Expression::unary_op(
                UnaryOperator::Minus,
                Expression::binary_op(
                    BinaryOperator::Sub,
                    Expression::column("a"),
                    Expression::literal(1.5)
                )
            )
        );
    }

    #[test]
    fn test_boolean_expression() {
        let expr = parse_expression("value > 10 and not label is null").unwrap();
        assert_eq!(
            expr,
            Expression::binary_op(
                BinaryOperator::And,
                Expression::binary_op(
                    BinaryOperator::Gt,
                    Expression::column("value"),
                    Expression::literal(10)
                ),
                Expression::unary_op(
                    UnaryOperator::Not,
                    Expression::unary_op(UnaryOperator::IsNull, Expression::column("label"))
                )
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("(a + 1").is_err());
        assert!(parse_expression("a b").is_err());
    }
}
