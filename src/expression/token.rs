// Formula tokens for lexical analysis

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Number(String),
    String(String),

    // Keywords
    And,
    Or,
    Not,
    Is,
    Null,
    True,
    False,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,

    Eof,
}

impl Token {
    /// Keywords are case-insensitive
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_lowercase().as_str() {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            "is" => Some(Token::Is),
            "null" | "none" => Some(Token::Null),
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Token::keyword_from_str("AND"), Some(Token::And));
        assert_eq!(Token::keyword_from_str("True"), Some(Token::True));
        assert_eq!(Token::keyword_from_str("None"), Some(Token::Null));
        assert_eq!(Token::keyword_from_str("price"), None);
    }
}
