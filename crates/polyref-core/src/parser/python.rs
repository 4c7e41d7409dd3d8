//! Python 解析器实现
//!
//! 基于 Tree-sitter 的 Python 源码解析器

use super::common::{LanguageParser, SupportedLanguage, parse_to_generic, tree_sitter_parser};
use super::tree::GenericTree;
use crate::error::Result;
use tree_sitter::Parser;

/// Python 解析器
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// 创建新的 Python 解析器
    pub fn new() -> Result<Self> {
        let parser = tree_sitter_parser(tree_sitter_python::LANGUAGE.into(), "Python")?;
        Ok(Self { parser })
    }
}

impl LanguageParser for PythonParser {
    fn parse_source(&mut self, source: &str) -> Result<GenericTree> {
        parse_to_generic(&mut self.parser, source, "Python")
    }

    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }
}
