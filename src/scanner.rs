use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};
use substring::Substring;

use crate::error::Reporter;
use crate::literal::Literal;
use crate::token::{Token, TokenKind};

pub struct Scanner<'a, 'r> {
    source: &'a str,
    chars: PeekMoreIterator<Chars<'a>>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    reporter: &'r mut Reporter,
}

impl<'a, 'r> Scanner<'a, 'r> {
    pub fn new(source: &'a str, reporter: &'r mut Reporter) -> Scanner<'a, 'r> {
        Scanner {
            source,
            chars: source.chars().peekmore(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            reporter,
        }
    }

    /// Scans the source and returns its tokens, terminated by `Eof`.
    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenKind::Eof, String::new(), None, self.line));
        self.tokens
    }

    /// Scans the next lexeme, classified by its first character.
    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),

            '!' => {
                let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add_token(kind);
            },
            '=' => {
                let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.add_token(kind);
            },
            '<' => {
                let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            },
            '>' => {
                let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            },

            '/' => {
                if self.matches('/') {
                    // A line comment produces no token.
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            },

            ' ' | '\r' | '\t' => {},

            '\n' => self.line += 1,

            '"' => self.string(),

            c if c.is_ascii_digit() => self.number(),

            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            _ => self.reporter.error(self.line, "Unexpected character."),
        }
    }

    /// Consumes and returns the next character.
    fn advance(&mut self) -> char {
        self.current += 1;
        self.chars.next().expect("advance is only called before the end of the source")
    }

    /// Consumes the next character if it matches `expected`.
    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }

        false
    }

    /// Returns the next character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Returns the character after the next one without consuming anything.
    fn peek_next(&mut self) -> Option<char> {
        let c = self.chars.peek_next().copied();
        // peek_next moves peekmore's cursor; put it back so peek keeps
        // looking at the next unconsumed character.
        self.chars.reset_cursor();
        c
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal_token(kind, None);
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.source.substring(self.start, self.current).to_string();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    /// Scans a string literal. The opening quote has been consumed.
    fn string(&mut self) {
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.reporter.error(self.line, "Unterminated string.");
            return;
        }

        self.advance(); // The closing quote.

        // The literal value excludes the surrounding quotes.
        let value = self.source.substring(self.start + 1, self.current - 1).to_string();
        self.add_literal_token(TokenKind::String, Some(Literal::String(value)));
    }

    /// Scans a number literal. A dot not followed by a digit is left for the
    /// next lexeme.
    fn number(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // The dot.

            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let value: f64 = self.source.substring(self.start, self.current)
            .parse()
            .expect("scanned number lexeme to be a valid double");

        self.add_literal_token(TokenKind::Number, Some(Literal::Number(value)));
    }

    /// Scans an identifier and promotes it to a keyword if the whole lexeme
    /// matches one.
    fn identifier(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let kind = match self.source.substring(self.start, self.current) {
            "and"    => TokenKind::And,
            "class"  => TokenKind::Class,
            "else"   => TokenKind::Else,
            "false"  => TokenKind::False,
            "for"    => TokenKind::For,
            "fun"    => TokenKind::Fun,
            "if"     => TokenKind::If,
            "nil"    => TokenKind::Nil,
            "or"     => TokenKind::Or,
            "print"  => TokenKind::Print,
            "return" => TokenKind::Return,
            "super"  => TokenKind::Super,
            "this"   => TokenKind::This,
            "true"   => TokenKind::True,
            "var"    => TokenKind::Var,
            "while"  => TokenKind::While,
            _        => TokenKind::Identifier,
        };

        self.add_token(kind);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source, &mut reporter).scan_tokens();
        assert!(!reporter.had_error());
        tokens
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn scan_punctuation() {
        let tokens = scan("(){},.-+;*/");

        assert_eq!(kinds(&tokens), vec![
            TokenKind::LeftParen, TokenKind::RightParen,
            TokenKind::LeftBrace, TokenKind::RightBrace,
            TokenKind::Comma, TokenKind::Dot, TokenKind::Minus, TokenKind::Plus,
            TokenKind::Semicolon, TokenKind::Star, TokenKind::Slash,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn scan_two_char_operators() {
        let tokens = scan("! != = == < <= > >=");

        assert_eq!(kinds(&tokens), vec![
            TokenKind::Bang, TokenKind::BangEqual,
            TokenKind::Equal, TokenKind::EqualEqual,
            TokenKind::Less, TokenKind::LessEqual,
            TokenKind::Greater, TokenKind::GreaterEqual,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn scan_keywords_and_identifiers() {
        let tokens = scan("class classy _under score99 var");

        assert_eq!(kinds(&tokens), vec![
            TokenKind::Class,
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::Var,
            TokenKind::Eof,
        ]);
        assert_eq!(tokens[1].lexeme, "classy");
    }

    #[test]
    fn scan_number_literals() {
        let tokens = scan("123 45.67");

        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(45.67)));
    }

    #[test]
    fn trailing_dot_is_not_part_of_a_number() {
        let tokens = scan("123.");

        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Dot, TokenKind::Eof]);
        assert_eq!(tokens[0].lexeme, "123");
    }

    #[test]
    fn scan_string_literal() {
        let tokens = scan("\"hello world\"");

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(tokens[0].literal, Some(Literal::String("hello world".to_string())));
    }

    #[test]
    fn string_literal_may_span_lines() {
        let tokens = scan("\"one\ntwo\"\nx");

        assert_eq!(tokens[0].literal, Some(Literal::String("one\ntwo".to_string())));
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn unterminated_string_reports_and_emits_no_token() {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new("\"abc", &mut reporter).scan_tokens();

        assert!(reporter.had_error());
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
    }

    #[test]
    fn comments_and_whitespace_produce_no_tokens() {
        let tokens = scan("// a comment\n\t 1 // trailing");

        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Eof]);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn unexpected_character_reports_and_continues() {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new("@1", &mut reporter).scan_tokens();

        assert!(reporter.had_error());
        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn lexemes_are_substrings_of_the_source() {
        let source = "var answer = 4.2 + \"str\"; // comment";
        let tokens = scan(source);

        for token in tokens.iter().filter(|token| token.kind != TokenKind::Eof) {
            assert!(source.contains(&token.lexeme), "lexeme {:?} not in source", token.lexeme);
        }
    }
}
