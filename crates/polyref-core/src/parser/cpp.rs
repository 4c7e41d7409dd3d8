//! C++ 解析器实现
//!
//! 基于 Tree-sitter 的 C++ 源码解析器

use super::common::{LanguageParser, SupportedLanguage, parse_to_generic, tree_sitter_parser};
use super::tree::GenericTree;
use crate::error::Result;
use tree_sitter::Parser;

/// C++ 解析器
pub struct CppParser {
    parser: Parser,
}

impl CppParser {
    /// 创建新的 C++ 解析器
    pub fn new() -> Result<Self> {
        let parser = tree_sitter_parser(tree_sitter_cpp::LANGUAGE.into(), "C++")?;
        Ok(Self { parser })
    }
}

impl LanguageParser for CppParser {
    fn parse_source(&mut self, source: &str) -> Result<GenericTree> {
        parse_to_generic(&mut self.parser, source, "C++")
    }

    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Cpp
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cpp", "cc", "cxx", "hpp", "hh", "h"]
    }
}
