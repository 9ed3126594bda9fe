//! Lexer implementation using logos

mod layout;
mod token;

pub use token::{SlashSlash, Token};

use crate::ast::{Language, LineIndex, Span};
use crate::error::SyntaxError;
use logos::Logos;

/// Tokenize source code for the given dialect.
///
/// Python sources get `Newline`/`Indent`/`Dedent` layout tokens; brace
/// dialects get no line structure at all.
pub fn tokenize(source: &str, language: Language) -> Result<Vec<(Token, Span)>, SyntaxError> {
    let lines = LineIndex::new(source);
    let extras = if language.uses_indentation() {
        SlashSlash::Operator
    } else {
        SlashSlash::Comment
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer_with_extras(source, extras);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(SyntaxError::new(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                    &lines,
                ));
            }
        }
    }

    if language.uses_indentation() {
        layout::apply(source, tokens, &lines)
    } else {
        tokens.retain(|(t, _)| *t != Token::Newline);
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str, language: Language) -> Vec<Token> {
        tokenize(source, language)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("", Language::JavaScript).unwrap().is_empty());
        assert!(tokenize("", Language::Python).unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("def if elif else while for", Language::Python),
            vec![
                Token::Def,
                Token::If,
                Token::Elif,
                Token::Else,
                Token::While,
                Token::For,
                Token::Newline
            ]
        );
    }

    #[test]
    fn test_tokenize_literal_spellings() {
        assert_eq!(
            kinds("True true None nullptr", Language::JavaScript),
            vec![Token::True, Token::True, Token::Null, Token::Null]
        );
    }

    #[test]
    fn test_tokenize_big_integer_literal() {
        let tokens = kinds("123456789012345678901234567890", Language::Cpp);
        assert!(matches!(&tokens[0], Token::IntLit(n) if n.to_string() == "123456789012345678901234567890"));
    }

    #[test]
    fn test_tokenize_float_literal() {
        let tokens = kinds("1.5 2e3", Language::Java);
        assert!(matches!(tokens[0], Token::FloatLit(x) if (x - 1.5).abs() < f64::EPSILON));
        assert!(matches!(tokens[1], Token::FloatLit(x) if (x - 2000.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_tokenize_string_escapes() {
        let tokens = kinds(r#""a\tb" 'it\'s'"#, Language::JavaScript);
        assert_eq!(tokens[0], Token::StringLit("a\tb".into()));
        assert_eq!(tokens[1], Token::StringLit("it's".into()));
    }

    #[test]
    fn test_double_slash_is_floor_division_in_python() {
        assert_eq!(
            kinds("a // b", Language::Python),
            vec![
                Token::Ident("a".into()),
                Token::SlashSlash,
                Token::Ident("b".into()),
                Token::Newline
            ]
        );
    }

    #[test]
    fn test_double_slash_is_comment_in_brace_dialects() {
        assert_eq!(
            kinds("a // b\nc", Language::JavaScript),
            vec![Token::Ident("a".into()), Token::Ident("c".into())]
        );
    }

    #[test]
    fn test_skips_hash_and_block_comments() {
        assert_eq!(
            kinds("#include <iostream>\nx /* y */ z", Language::Cpp),
            vec![Token::Ident("x".into()), Token::Ident("z".into())]
        );
    }

    #[test]
    fn test_strict_equality_aliases() {
        assert_eq!(
            kinds("a === b !== c", Language::JavaScript),
            vec![
                Token::Ident("a".into()),
                Token::EqEq,
                Token::Ident("b".into()),
                Token::NotEq,
                Token::Ident("c".into())
            ]
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("let main", Language::JavaScript).unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 3));
        assert_eq!(tokens[1].1, Span::new(4, 8));
    }

    #[test]
    fn test_unexpected_character_reports_position() {
        let err = tokenize("x = 1\ny = $", Language::JavaScript).unwrap_err();
        assert_eq!((err.line, err.column), (2, 5));
        assert!(err.message.contains("unexpected character"));
    }
}
