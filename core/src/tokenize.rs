//! Command line tokenizer.
//!
//! Splits raw message text into tokens on runs of whitespace. A double
//! quote opens a span that runs to the next double quote; everything in the
//! span, whitespace included, stays in the current token and the quotes are
//! dropped. Spans may be glued to unquoted text, so `detail="two words"`
//! becomes the single token `detail=two words`.
//!
//! There is no escape for a literal `"` inside a span.

use thiserror::Error;
use tracing::trace;

/// Malformed command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A double quote was opened but never closed.
    #[error("unterminated quote starting at byte {offset}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote.
        offset: usize,
    },
}

/// Splits `raw` into tokens, honoring double-quoted spans.
///
/// # Errors
///
/// Returns [`TokenizeError::UnterminatedQuote`] if a quoted span is not
/// closed.
///
/// # Examples
///
/// ```
/// use chain_command_core::tokenize;
///
/// assert_eq!(tokenize(r#"a "b c" d"#).unwrap(), vec!["a", "b c", "d"]);
/// assert_eq!(tokenize(r#"/sub now detail="x y""#).unwrap(), vec!["/sub", "now", "detail=x y"]);
/// assert!(tokenize("").unwrap().is_empty());
/// assert!(tokenize(r#""unterminated"#).is_err());
/// ```
pub fn tokenize(raw: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token exists once any character or quote pair has been seen, so `""`
    // produces an empty token rather than nothing.
    let mut in_token = false;
    let mut quote_start: Option<usize> = None;

    for (idx, ch) in raw.char_indices() {
        match (quote_start, ch) {
            (Some(_), '"') => quote_start = None,
            (Some(_), _) => current.push(ch),
            (None, '"') => {
                quote_start = Some(idx);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(offset) = quote_start {
        return Err(TokenizeError::UnterminatedQuote { offset });
    }
    if in_token {
        tokens.push(current);
    }

    trace!(count = tokens.len(), "Tokenized command line");
    Ok(tokens)
}

/// Returns the first token of `raw` without tokenizing the rest.
///
/// Used to cheaply decide whether a message is addressed to a command root
/// at all. Quotes are not interpreted; a command name never contains them.
pub fn first_word(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(tokenize("/git remote add").unwrap(), vec!["/git", "remote", "add"]);
    }

    #[test]
    fn test_whitespace_runs_and_edges() {
        assert_eq!(tokenize("  a \t\n b  ").unwrap(), vec!["a", "b"]);
        assert!(tokenize("   ").unwrap().is_empty());
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_span_is_one_token() {
        assert_eq!(tokenize(r#"a "b c" d"#).unwrap(), vec!["a", "b c", "d"]);
        assert_eq!(
            tokenize(r#""program name with space""#).unwrap(),
            vec!["program name with space"]
        );
    }

    #[test]
    fn test_quoted_value_after_key() {
        assert_eq!(
            tokenize(r#"detail="optional arg with key" days=3,4,5"#).unwrap(),
            vec!["detail=optional arg with key", "days=3,4,5"]
        );
    }

    #[test]
    fn test_empty_quotes_yield_empty_token() {
        assert_eq!(tokenize(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_adjacent_spans_join() {
        assert_eq!(tokenize(r#"ab"c d"ef"#).unwrap(), vec!["abc def"]);
    }

    #[test]
    fn test_unterminated_quote_reports_offset() {
        assert_eq!(
            tokenize(r#"/say "hello"#),
            Err(TokenizeError::UnterminatedQuote { offset: 5 })
        );
        assert!(matches!(
            tokenize(r#""unterminated"#),
            Err(TokenizeError::UnterminatedQuote { offset: 0 })
        ));
    }

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("  /git  status"), Some("/git"));
        assert_eq!(first_word(" "), None);
    }
}
