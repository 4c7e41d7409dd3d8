//! JavaScript 解析器实现
//!
//! 基于 Tree-sitter 的 JavaScript 源码解析器

use super::common::{LanguageParser, SupportedLanguage, parse_to_generic, tree_sitter_parser};
use super::tree::GenericTree;
use crate::error::Result;
use tree_sitter::Parser;

/// JavaScript 解析器
pub struct JavaScriptParser {
    parser: Parser,
}

impl JavaScriptParser {
    /// 创建新的 JavaScript 解析器
    pub fn new() -> Result<Self> {
        let parser = tree_sitter_parser(tree_sitter_javascript::LANGUAGE.into(), "JavaScript")?;
        Ok(Self { parser })
    }
}

impl LanguageParser for JavaScriptParser {
    fn parse_source(&mut self, source: &str) -> Result<GenericTree> {
        parse_to_generic(&mut self.parser, source, "JavaScript")
    }

    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::JavaScript
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "mjs", "cjs"]
    }
}
