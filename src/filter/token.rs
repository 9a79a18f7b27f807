//! Tokenizer for gathered-filter expressions.

use crate::error::{Error, Result};

/// Token is one lexical unit of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    /// A bare or quoted word. Quoted words never act as keywords.
    Word { text: String, quoted: bool },
}

impl Token {
    /// Returns the text of an unquoted word.
    pub fn bare(&self) -> Option<&str> {
        match self {
            Token::Word { text, quoted: false } => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Splits an expression into tokens.
///
/// Words are whitespace-delimited; single or double quotes group a value
/// containing spaces. Backslash has no special meaning, so regex values pass
/// through untouched. Parentheses may stand alone or be fused onto a word:
/// leading `(` on any word, `not(` / `!(`, and any number of trailing `)`.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        while chars.peek() == Some(&'(') {
            chars.next();
            tokens.push(Token::Open);
        }
        match chars.peek() {
            None => break,
            Some(c) if c.is_whitespace() => continue,
            Some(_) => {}
        }

        let mut text = String::new();
        let mut quoted = false;
        let mut first_quote_at: Option<usize> = None;
        let mut closers = 0usize;
        let mut quote: Option<char> = None;

        while let Some(&c) = chars.peek() {
            if let Some(q) = quote {
                chars.next();
                if c == q {
                    quote = None;
                } else {
                    text.push(c);
                }
                continue;
            }
            if c.is_whitespace() {
                break;
            }
            chars.next();
            match c {
                ')' => closers += 1,
                '"' | '\'' => {
                    flush_closers(&mut text, &mut closers);
                    quoted = true;
                    first_quote_at.get_or_insert(text.len());
                    quote = Some(c);
                }
                _ => {
                    flush_closers(&mut text, &mut closers);
                    text.push(c);
                }
            }
        }
        if let Some(q) = quote {
            return Err(Error::filter_syntax(format!("unterminated {} quote", q)));
        }

        let rest = split_negation(&mut tokens, &text, first_quote_at);
        let rest = rest.to_string();
        if !rest.is_empty() || quoted {
            tokens.push(Token::Word { text: rest, quoted });
        }
        for _ in 0..closers {
            tokens.push(Token::Close);
        }
    }

    Ok(tokens)
}

fn flush_closers(text: &mut String, closers: &mut usize) {
    for _ in 0..*closers {
        text.push(')');
    }
    *closers = 0;
}

/// Splits a fused `not(` / `!(` prefix off an unquoted word, pushing the
/// negation and open tokens. Returns what is left of the word.
fn split_negation<'a>(tokens: &mut Vec<Token>, text: &'a str, first_quote_at: Option<usize>) -> &'a str {
    for keyword in ["not", "!"] {
        let Some(prefix) = text.get(..keyword.len()).filter(|p| p.eq_ignore_ascii_case(keyword)) else {
            continue;
        };
        let after = &text[keyword.len()..];
        let opens = after.chars().take_while(|&c| c == '(').count();
        if opens == 0 {
            continue;
        }
        let consumed = keyword.len() + opens;
        if first_quote_at.is_some_and(|q| q < consumed) {
            continue;
        }
        tokens.push(Token::Word {
            text: prefix.to_string(),
            quoted: false,
        });
        for _ in 0..opens {
            tokens.push(Token::Open);
        }
        return &text[consumed..];
    }
    text
}
