#[cfg(test)]
mod scanner_tests {
    use rolox as lox;

    use lox::scanner::Scanner;
    use lox::token::{Token, TokenType};

    fn scan(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes().to_vec())
            .scan()
            .expect("source should scan cleanly")
    }

    fn scan_errors(source: &str) -> Vec<String> {
        match Scanner::new(source.as_bytes().to_vec()).scan() {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens = scan(source);

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == > >= < <= / -",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var language = nil; classy orchid",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "language"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_number_literals() {
        let numbers: Vec<f64> = scan("12 12.5 0.5")
            .into_iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        assert_eq!(numbers, vec![12.0, 12.5, 0.5]);
    }

    #[test]
    fn test_scanner_05_trailing_dot_is_not_part_of_number() {
        assert_token_sequence(
            "12.",
            &[
                (TokenType::NUMBER(12.0), "12"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_string_literal_spans_lines() {
        let tokens = scan("\"one\ntwo\" done");

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "one\ntwo"),
            other => panic!("expected string literal, got {:?}", other),
        }

        // Newline inside the literal bumps the line counter.
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_07_comments_and_whitespace_are_skipped() {
        assert_token_sequence(
            "a // the rest is ignored\nb",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_08_unterminated_string_is_an_error() {
        let errors = scan_errors("\"never closed");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Unterminated string."), "{}", errors[0]);
        assert!(errors[0].contains("[line 1]"), "{}", errors[0]);
    }

    #[test]
    fn test_scanner_09_scan_continues_past_bad_characters() {
        // Both stray characters are reported, so the scan did not stop at
        // the first one.
        let errors = scan_errors(",.$(#");

        assert_eq!(errors.len(), 2, "{:?}", errors);

        for error in &errors {
            assert!(
                error.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                error
            );
        }
    }

    #[test]
    fn test_scanner_10_line_numbers() {
        let lines: Vec<usize> = scan("a\nb\n\nc").iter().map(|t| t.line).collect();

        // a=1, b=2, c=4, EOF=4
        assert_eq!(lines, vec![1, 2, 4, 4]);
    }

    #[test]
    fn token_types_compare_by_tag() {
        assert_eq!(TokenType::NUMBER(1.0), TokenType::NUMBER(2.5));
        assert_eq!(
            TokenType::STRING("a".to_string()),
            TokenType::STRING("b".to_string())
        );
        assert_ne!(TokenType::NUMBER(1.0), TokenType::STRING("1".to_string()));
        assert_eq!(TokenType::EOF, TokenType::EOF);
    }

    #[test]
    fn token_display_dumps_type_lexeme_literal() {
        let token = Token::new(TokenType::NUMBER(5.0), "5".to_string(), 1);
        assert_eq!(token.to_string(), "NUMBER 5 5.0");

        let token = Token::new(TokenType::SEMICOLON, ";".to_string(), 1);
        assert_eq!(token.to_string(), "SEMICOLON ; null");
    }
}
