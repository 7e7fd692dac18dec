//! Lightweight reference extraction.
//!
//! A byte-walk scanner, not a parser: it tracks just enough lexical state
//! (comments, string bodies, template literals) to pull out import
//! specifiers, `require`/dynamic-`import` arguments, and triple-slash
//! reference directives. Malformed source degrades to fewer references,
//! never to an error.

/// References extracted from one source file, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileReferences {
    /// Module specifiers from `import`/`export ... from`/`require(...)`.
    pub imports: Vec<String>,
    /// `/// <reference path="..."/>` targets.
    pub referenced_paths: Vec<String>,
    /// `/// <reference types="..."/>` directive names.
    pub type_directives: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
}

/// Extract all references from `text`.
#[must_use]
pub fn preprocess(text: &str) -> FileReferences {
    let mut refs = FileReferences::default();
    let tokens = tokenize(text, &mut refs);
    collect_imports(&tokens, &mut refs.imports);
    refs
}

fn tokenize(text: &str, refs: &mut FileReferences) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = line_end(bytes, i);
                scan_directive(&text[i..end], refs);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = block_comment_end(bytes, i + 2);
            }
            b'\'' | b'"' => {
                let (literal, end) = string_literal(text, i, b);
                tokens.push(Token::Str(literal));
                i = end;
            }
            b'`' => {
                // Template bodies can't host static imports; skip wholesale.
                i = template_end(bytes, i + 1);
            }
            _ if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(text[start..i].to_string()));
            }
            b'(' | b')' | b';' | b',' | b'{' | b'}' => {
                tokens.push(Token::Punct(b as char));
                i += 1;
            }
            _ => i += 1,
        }
    }

    tokens
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

fn block_comment_end(bytes: &[u8], mut i: usize) -> usize {
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

fn string_literal(text: &str, start: usize, quote: u8) -> (String, usize) {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                return (text[start + 1..i].to_string(), i + 1);
            }
            b'\n' => break,
            _ => i += 1,
        }
    }
    (text[start + 1..i.min(bytes.len())].to_string(), i.min(bytes.len()))
}

fn template_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Recognize `/// <reference path="..."/>` and `types="..."` in a line
/// comment that has already been sliced out of the source. Only
/// triple-slash comments qualify.
fn scan_directive(comment: &str, refs: &mut FileReferences) {
    let Some(rest) = comment.strip_prefix("///") else {
        return;
    };
    let Some(tag_at) = rest.find("<reference") else {
        return;
    };
    let tag = &rest[tag_at..];
    if let Some(path) = attribute_value(tag, "path") {
        refs.referenced_paths.push(path);
    } else if let Some(types) = attribute_value(tag, "types") {
        refs.type_directives.push(types);
    }
}

fn attribute_value(tag: &str, name: &str) -> Option<String> {
    let at = tag.find(&format!("{name}="))?;
    let rest = &tag[at + name.len() + 1..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[1..];
    let end = body.find(quote)?;
    Some(body[..end].to_string())
}

/// Walk the token stream for the four import shapes.
fn collect_imports(tokens: &[Token], out: &mut Vec<String>) {
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Ident(kw) if kw == "import" => {
                match tokens.get(i + 1) {
                    // import "spec";
                    Some(Token::Str(spec)) => {
                        out.push(spec.clone());
                        i += 2;
                    }
                    // import("spec")
                    Some(Token::Punct('(')) => {
                        if let Some(Token::Str(spec)) = tokens.get(i + 2) {
                            out.push(spec.clone());
                        }
                        i += 3;
                    }
                    // import d, {a} from "spec";
                    _ => i = consume_from_clause(tokens, i + 1, out),
                }
            }
            Token::Ident(kw) if kw == "export" => {
                // export {a} from "spec"; only the re-export form names a
                // module.
                i = consume_from_clause(tokens, i + 1, out);
            }
            Token::Ident(kw) if kw == "require" => {
                if let (Some(Token::Punct('(')), Some(Token::Str(spec))) =
                    (tokens.get(i + 1), tokens.get(i + 2))
                {
                    out.push(spec.clone());
                    i += 3;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
}

/// Scan forward to the end of the statement; record the string following a
/// `from` keyword if one appears. Returns the index to resume from.
fn consume_from_clause(tokens: &[Token], mut i: usize, out: &mut Vec<String>) -> usize {
    while i < tokens.len() {
        match &tokens[i] {
            Token::Ident(kw) if kw == "from" => {
                if let Some(Token::Str(spec)) = tokens.get(i + 1) {
                    out.push(spec.clone());
                    return i + 2;
                }
                return i + 1;
            }
            Token::Punct(';') => return i + 1,
            // A new statement started without a terminating semicolon.
            Token::Ident(kw) if kw == "import" || kw == "export" => return i,
            _ => i += 1,
        }
    }
    i
}
