//! Abstract Syntax Tree definitions

mod expr;
mod span;
mod stmt;

pub use expr::*;
pub use span::*;
pub use stmt::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Surface language of the analysed source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Cpp,
    ];

    /// Python blocks are indentation-delimited, everything else uses braces
    pub fn uses_indentation(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Java and C++ run the body of `main`; the others run top-level statements
    pub fn has_entry_point(self) -> bool {
        matches!(self, Language::Java | Language::Cpp)
    }

    /// Guess the language from a file extension
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext {
            "py" => Some(Language::Python),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" | "hpp" | "c++" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(format!(
                "unsupported language '{other}' (expected python, javascript, java or cpp)"
            )),
        }
    }
}

/// A parsed program. Immutable once produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub language: Language,
    /// User-defined functions in definition order
    pub functions: Vec<Function>,
    /// Statements executed in the global frame (`main`'s body for Java/C++)
    pub body: Block,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Every statement of the program, functions first
    pub fn statements(&self) -> Vec<&Stmt> {
        let mut out = Vec::new();
        for block in self
            .functions
            .iter()
            .map(|f| &f.body)
            .chain(std::iter::once(&self.body))
        {
            for stmt in block {
                stmt.walk(&mut |s| out.push(s));
            }
        }
        out
    }

    /// Source text of the branch or loop condition anchored at `line`
    pub fn condition_text(&self, line: u32) -> Option<&str> {
        self.statements().into_iter().find_map(|s| match &s.kind {
            StmtKind::If { branches, .. } => branches
                .iter()
                .find(|b| b.cond.line == line)
                .map(|b| b.cond.text.as_str()),
            StmtKind::While { cond, .. } if cond.line == line => Some(cond.text.as_str()),
            StmtKind::For {
                cond: Some(cond), ..
            } if cond.line == line => Some(cond.text.as_str()),
            _ => None,
        })
    }

    /// The loop statement whose header is at `line`
    pub fn loop_at(&self, line: u32) -> Option<&Stmt> {
        self.statements()
            .into_iter()
            .find(|s| s.is_loop() && s.line == line)
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    /// Line of the definition header
    pub line: u32,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str_aliases() {
        assert_eq!("py".parse::<Language>(), Ok(Language::Python));
        assert_eq!("C++".parse::<Language>(), Ok(Language::Cpp));
        assert_eq!("JavaScript".parse::<Language>(), Ok(Language::JavaScript));
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_serde_names() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
        let back: Language = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(back, Language::Cpp);
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("cc"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn test_language_layout() {
        assert!(Language::Python.uses_indentation());
        assert!(!Language::Java.uses_indentation());
        assert!(Language::Cpp.has_entry_point());
        assert!(!Language::JavaScript.has_entry_point());
    }
}
