//! Source tree analysis.
//!
//! Walks a Go source tree and collects the external import paths it
//! references. Standard-library packages, cgo's `"C"`, relative imports
//! and the project's own packages are left out.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::config::{Config, WORK_DIR};
use crate::error::{GopackError, Result};

/// Snapshot of the external packages a source tree imports.
///
/// Iteration order is lexicographic, which keeps reports deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    imports: BTreeSet<String>,
}

impl Project {
    pub fn new<I, S>(imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            imports: imports.into_iter().map(Into::into).collect(),
        }
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    pub fn uses(&self, import: &str) -> bool {
        self.imports.contains(import)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

/// Analyze the tree at `config.project_root`.
///
/// `own_path` is the project's own import path (the manifest's `repo`);
/// it and everything beneath it count as internal.
pub fn analyze(config: &Config, own_path: Option<&str>) -> Result<Project> {
    let root = &config.project_root;
    info!(root = ?root, "analyzing source tree");

    let mut imports = BTreeSet::new();
    let mut files = 0usize;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_go_source(entry.path(), config.include_tests) {
            continue;
        }

        let text = fs::read_to_string(entry.path()).map_err(|e| GopackError::Analysis {
            path: entry.path().to_path_buf(),
            message: e.to_string(),
        })?;
        let found = scan_imports(&text).map_err(|message| GopackError::Analysis {
            path: entry.path().to_path_buf(),
            message,
        })?;
        files += 1;

        imports.extend(
            found
                .into_iter()
                .filter(|p| is_external(p, own_path)),
        );
    }

    debug!(files, imports = imports.len(), "analysis complete");
    Ok(Project { imports })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.')
        || name.starts_with('_')
        || name == "testdata"
        || name == "vendor"
        || name == WORK_DIR
}

fn is_go_source(path: &Path, include_tests: bool) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !name.ends_with(".go") || name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    include_tests || !name.ends_with("_test.go")
}

/// Whether `import` names a package outside the project and the standard library.
pub fn is_external(import: &str, own_path: Option<&str>) -> bool {
    if import.is_empty() || import == "C" || import.starts_with('.') || import.starts_with('/') {
        return false;
    }
    let first = import.split('/').next().unwrap_or(import);
    if !first.contains('.') {
        return false;
    }
    match own_path.map(|p| p.trim_end_matches('/')) {
        Some(own) if !own.is_empty() => {
            !(import == own || import.strip_prefix(own).is_some_and(|rest| rest.starts_with('/')))
        }
        _ => true,
    }
}

/// Extract the import paths declared in one Go source file.
///
/// Only the preamble is read: the scan stops at the first top-level
/// declaration that is not an import. A leading byte order mark is
/// ignored; anything other than a package clause before the imports,
/// or an unexpected character inside an import clause, is an error.
pub fn scan_imports(src: &str) -> std::result::Result<Vec<String>, String> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let tokens = tokenize_preamble(src)?;
    let mut imports = Vec::new();
    let mut iter = tokens.into_iter();
    let mut seen_package = false;

    while let Some(tok) = iter.next() {
        match tok {
            Token::Semi => {}
            Token::Word(w) if w == "package" && !seen_package => match iter.next() {
                Some(Token::Word(_)) => seen_package = true,
                other => return Err(format!("expected package name, found {other:?}")),
            },
            other if !seen_package => {
                return Err(format!("expected package clause, found {other:?}"));
            }
            Token::Word(w) if w == "import" => match iter.next() {
                Some(Token::Open) => loop {
                    match iter.next() {
                        Some(Token::Close) => break,
                        Some(Token::Semi) => continue,
                        Some(tok) => imports.push(import_spec(tok, &mut iter)?),
                        None => return Err("unterminated import group".to_string()),
                    }
                },
                Some(tok) => imports.push(import_spec(tok, &mut iter)?),
                None => return Err("dangling import keyword".to_string()),
            },
            _ => break,
        }
    }

    Ok(imports)
}

fn import_spec<I>(first: Token, rest: &mut I) -> std::result::Result<String, String>
where
    I: Iterator<Item = Token>,
{
    match first {
        Token::Str(path) => Ok(path),
        Token::Word(_) | Token::Dot => match rest.next() {
            Some(Token::Str(path)) => Ok(path),
            other => Err(format!("expected import path after alias, found {other:?}")),
        },
        other => Err(format!("expected import path, found {other:?}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(String),
    Open,
    Close,
    Dot,
    /// Newline or `;`
    Semi,
    Other(char),
}

/// Tokenize until something that cannot be part of the package/import
/// preamble shows up. Comments are dropped.
fn tokenize_preamble(src: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' | ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                loop {
                    if i + 1 >= chars.len() {
                        return Err("unterminated block comment".to_string());
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => return Err("unterminated string literal".to_string()),
                        Some('"') => break,
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                s.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                i += 1;
                tokens.push(Token::Str(s));
            }
            '`' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == '`')
                    .map(|off| start + off)
                    .ok_or_else(|| "unterminated raw string literal".to_string())?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let is_decl = matches!(word.as_str(), "func" | "type" | "var" | "const");
                tokens.push(Token::Word(word));
                if is_decl {
                    break;
                }
            }
            other => {
                tokens.push(Token::Other(other));
                break;
            }
        }
    }

    Ok(tokens)
}
