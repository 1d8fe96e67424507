//! Parser and translator seams.
//!
//! The dialect parser and the per-language code generators live outside this
//! crate. The pipeline talks to them through [`Parser`] and [`Translator`];
//! translators are registered per language id in a [`TranslatorRegistry`]
//! when the compiler is assembled.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Failure to parse a dialect source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable reason
    pub message: String,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Column number (1-indexed, None if unknown)
    pub column: Option<usize>,
}

impl ParseError {
    /// Create a parse error without location.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), line: None, column: None }
    }

    /// Create a parse error at a line and column.
    pub fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { message: message.into(), line: Some(line), column: Some(column) }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "{}", line)?;
            if let Some(col) = self.column {
                write!(f, ":{}", col)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Turns dialect source text into a syntax tree.
pub trait Parser {
    /// Syntax tree produced for one file
    type Ast;

    /// Parse the content of `path`.
    fn parse(&self, content: &str, path: &Path) -> Result<Self::Ast, ParseError>;
}

/// Generates target-language text from a syntax tree.
pub trait Translator<A> {
    /// Render the whole file.
    fn translate(&self, ast: &A) -> String;
}

impl<A, F> Translator<A> for F
where
    F: Fn(&A) -> String,
{
    fn translate(&self, ast: &A) -> String {
        self(ast)
    }
}

/// Translators keyed by target language id.
pub struct TranslatorRegistry<A> {
    translators: BTreeMap<String, Box<dyn Translator<A>>>,
}

impl<A> TranslatorRegistry<A> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { translators: BTreeMap::new() }
    }

    /// Register the translator for `lang`, replacing any previous one.
    pub fn register(&mut self, lang: impl Into<String>, translator: impl Translator<A> + 'static) {
        self.translators.insert(lang.into(), Box::new(translator));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(
        mut self,
        lang: impl Into<String>,
        translator: impl Translator<A> + 'static,
    ) -> Self {
        self.register(lang, translator);
        self
    }

    /// Translator for `lang`, if one is registered.
    pub fn get(&self, lang: &str) -> Option<&dyn Translator<A>> {
        self.translators.get(lang).map(|t| t.as_ref())
    }

    /// Registered language ids, sorted.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.translators.keys().map(String::as_str)
    }
}

impl<A> Default for TranslatorRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for TranslatorRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("languages", &self.translators.keys().collect::<Vec<_>>())
            .finish()
    }
}
