//! Minimal STAR/mmCIF reader
//!
//! Handles `data_` blocks, `loop_` tables, `_category.attribute value` pairs,
//! single and double quoted values, `;`-delimited text fields and `#` comments.
//! Save frames and global blocks are not supported.

use super::SourceParser;
use crate::domain::{Category, CifdbError, Result, ResultExt, SourceContainer};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Unquoted word: keyword, tag or plain value
    Bare(String),
    /// Quoted string or text field; always a value
    Quoted(String),
}

#[derive(Debug)]
struct Lexeme {
    token: Token,
    line: usize,
}

fn parse_error(line: usize, message: impl std::fmt::Display) -> CifdbError {
    CifdbError::Parse(format!("line {line}: {message}"))
}

/// Splits CIF text into tokens, resolving text fields and quotes
fn tokenize(text: &str) -> Result<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((line_no, line)) = lines.next() {
        if let Some(first) = line.strip_prefix(';') {
            let mut field = vec![first.to_string()];
            let mut closed = false;
            for (_, next) in lines.by_ref() {
                if next.starts_with(';') {
                    closed = true;
                    break;
                }
                field.push(next.to_string());
            }
            if !closed {
                return Err(parse_error(line_no, "unterminated text field"));
            }
            let value = field.join("\n").trim_matches('\n').to_string();
            lexemes.push(Lexeme {
                token: Token::Quoted(value),
                line: line_no,
            });
            continue;
        }
        tokenize_line(line, line_no, &mut lexemes)?;
    }
    Ok(lexemes)
}

fn tokenize_line(line: &str, line_no: usize, out: &mut Vec<Lexeme>) -> Result<()> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            // A quote closes only when followed by whitespace or end of line
            let start = i + 1;
            let mut end = start;
            loop {
                if end >= chars.len() {
                    return Err(parse_error(line_no, "unterminated quoted value"));
                }
                if chars[end] == c && chars.get(end + 1).map_or(true, |n| n.is_whitespace()) {
                    break;
                }
                end += 1;
            }
            out.push(Lexeme {
                token: Token::Quoted(chars[start..end].iter().collect()),
                line: line_no,
            });
            i = end + 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        out.push(Lexeme {
            token: Token::Bare(chars[start..i].iter().collect()),
            line: line_no,
        });
    }
    Ok(())
}

fn is_keyword(word: &str, keyword: &str) -> bool {
    word.get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

fn is_structural(token: &Token) -> bool {
    match token {
        Token::Bare(word) => {
            word.starts_with('_') || is_keyword(word, "loop_") || is_keyword(word, "data_")
        }
        Token::Quoted(_) => false,
    }
}

fn split_tag(tag: &str, line: usize) -> Result<(String, String)> {
    tag.trim_start_matches('_')
        .split_once('.')
        .filter(|(c, a)| !c.is_empty() && !a.is_empty())
        .map(|(c, a)| (c.to_string(), a.to_string()))
        .ok_or_else(|| parse_error(line, format!("malformed tag '{tag}'")))
}

/// Parses CIF text into containers, one per `data_` block
pub fn parse_cif_str(text: &str) -> Result<Vec<SourceContainer>> {
    let lexemes = tokenize(text)?;
    let mut containers: Vec<SourceContainer> = Vec::new();
    let mut cursor = lexemes.into_iter().peekable();

    while let Some(Lexeme { token, line }) = cursor.next() {
        let word = match token {
            Token::Bare(word) => word,
            Token::Quoted(value) => {
                return Err(parse_error(line, format!("unexpected value '{value}'")))
            }
        };

        if is_keyword(&word, "data_") {
            containers.push(SourceContainer::new(&word[5..]));
            continue;
        }
        let Some(container) = containers.last_mut() else {
            return Err(parse_error(line, "content before the first data_ block"));
        };

        if word.eq_ignore_ascii_case("loop_") {
            let mut tags = Vec::new();
            while let Some(Lexeme {
                token: Token::Bare(tag),
                ..
            }) = cursor.peek()
            {
                if !tag.starts_with('_') {
                    break;
                }
                tags.push(split_tag(tag, line)?);
                cursor.next();
            }
            let Some((category, _)) = tags.first().cloned() else {
                return Err(parse_error(line, "loop_ without tags"));
            };
            if tags.iter().any(|(c, _)| *c != category) {
                return Err(parse_error(line, "loop_ mixes categories"));
            }

            let mut values = Vec::new();
            while let Some(next) = cursor.peek() {
                if is_structural(&next.token) {
                    break;
                }
                if let Some(Lexeme { token, .. }) = cursor.next() {
                    values.push(match token {
                        Token::Bare(v) | Token::Quoted(v) => v,
                    });
                }
            }
            if values.len() % tags.len() != 0 {
                return Err(parse_error(
                    line,
                    format!(
                        "loop_ for '{category}' has {} values for {} tags",
                        values.len(),
                        tags.len()
                    ),
                ));
            }

            let attributes = tags.into_iter().map(|(_, a)| a).collect::<Vec<_>>();
            let rows = values
                .chunks(attributes.len())
                .map(<[String]>::to_vec)
                .collect();
            container.append(Category::with_rows(category, attributes, rows));
            continue;
        }

        if word.starts_with('_') {
            let (category, attribute) = split_tag(&word, line)?;
            let value = match cursor.next() {
                Some(Lexeme { token, .. }) if !is_structural(&token) => match token {
                    Token::Bare(v) | Token::Quoted(v) => v,
                },
                _ => return Err(parse_error(line, format!("tag '{word}' has no value"))),
            };
            if !container.exists(&category) {
                container.append(Category::new(category.clone(), Vec::new()));
            }
            if let Some(target) = container.get_obj_mut(&category) {
                target.set_value(value, &attribute, 0);
            }
            continue;
        }

        return Err(parse_error(line, format!("unexpected token '{word}'")));
    }
    Ok(containers)
}

/// Reads CIF files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct CifReader;

impl CifReader {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for CifReader {
    fn parse(&self, locator: &str) -> Result<Vec<SourceContainer>> {
        let text = std::fs::read_to_string(Path::new(locator))
            .with_context(|| format!("Failed to read {locator}"))?;
        let containers = parse_cif_str(&text).with_context(|| format!("Failed to parse {locator}"))?;
        tracing::debug!(locator, containers = containers.len(), "Parsed CIF file");
        Ok(containers)
    }
}
