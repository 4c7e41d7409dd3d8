//! 通用解析器接口
//!
//! 定义多语言解析器的通用接口和语言检测逻辑

use super::tree::GenericTree;
use crate::error::{PolyrefError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 支持的编程语言枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportedLanguage {
    Python,
    JavaScript,
    Cpp,
}

impl SupportedLanguage {
    /// 所有支持的语言
    pub const ALL: [SupportedLanguage; 3] = [
        SupportedLanguage::Python,
        SupportedLanguage::JavaScript,
        SupportedLanguage::Cpp,
    ];

    /// 根据文件扩展名检测语言
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "py" => Some(SupportedLanguage::Python),
            "js" | "mjs" | "cjs" => Some(SupportedLanguage::JavaScript),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "h" => Some(SupportedLanguage::Cpp),
            _ => None,
        }
    }

    /// 根据文件路径字符串检测语言
    pub fn from_path(file_path: &str) -> Option<Self> {
        Path::new(file_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// 语言的展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            SupportedLanguage::Python => "Python",
            SupportedLanguage::JavaScript => "JavaScript",
            SupportedLanguage::Cpp => "C++",
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 通用语言解析器接口
pub trait LanguageParser: Send + Sync {
    /// 解析源码为通用语法树
    fn parse_source(&mut self, source: &str) -> Result<GenericTree>;

    /// 获取语言类型
    fn language(&self) -> SupportedLanguage;

    /// 获取语言名称
    fn language_name(&self) -> &'static str {
        self.language().display_name()
    }

    /// 获取支持的文件扩展名
    fn file_extensions(&self) -> &'static [&'static str];
}

/// 解析器工厂
pub struct ParserFactory;

impl ParserFactory {
    /// 根据语言类型创建解析器
    pub fn create_parser(language: SupportedLanguage) -> Result<Box<dyn LanguageParser>> {
        match language {
            SupportedLanguage::Python => Ok(Box::new(super::python::PythonParser::new()?)),
            SupportedLanguage::JavaScript => {
                Ok(Box::new(super::javascript::JavaScriptParser::new()?))
            }
            SupportedLanguage::Cpp => Ok(Box::new(super::cpp::CppParser::new()?)),
        }
    }

    /// 根据文件路径检测语言类型
    pub fn detect_language(file_path: &Path) -> Option<SupportedLanguage> {
        SupportedLanguage::from_extension(file_path.extension()?.to_str()?)
    }

    /// 根据文件路径创建对应的解析器
    pub fn create_parser_for_file(file_path: &Path) -> Result<Box<dyn LanguageParser>> {
        let language = Self::detect_language(file_path).ok_or_else(|| {
            PolyrefError::UnsupportedFileType(file_path.to_string_lossy().to_string())
        })?;
        Self::create_parser(language)
    }
}

/// 使用给定语法创建 Tree-sitter 解析器
pub(crate) fn tree_sitter_parser(
    language: tree_sitter::Language,
    name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language).map_err(|e| {
        PolyrefError::TreeSitterError(format!("Failed to set {name} language: {e}"))
    })?;
    Ok(parser)
}

/// 解析源码并转换为通用语法树
pub(crate) fn parse_to_generic(
    parser: &mut tree_sitter::Parser,
    source: &str,
    name: &str,
) -> Result<GenericTree> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| PolyrefError::ParseError(format!("Failed to parse {name} source code")))?;
    Ok(GenericTree::from_tree_sitter(&tree, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_language_detection() {
        let cases = [
            ("src/app.py", Some(SupportedLanguage::Python)),
            ("web/index.js", Some(SupportedLanguage::JavaScript)),
            ("web/module.mjs", Some(SupportedLanguage::JavaScript)),
            ("lib/math.cpp", Some(SupportedLanguage::Cpp)),
            ("include/math.hpp", Some(SupportedLanguage::Cpp)),
            ("main.go", None),
            ("README", None),
        ];

        for (path, expected) in cases {
            assert_eq!(
                ParserFactory::detect_language(&PathBuf::from(path)),
                expected,
                "unexpected language for {path}"
            );
            assert_eq!(SupportedLanguage::from_path(path), expected);
        }
    }

    #[test]
    fn test_parser_creation() {
        for language in SupportedLanguage::ALL {
            let parser = ParserFactory::create_parser(language).unwrap();
            assert_eq!(parser.language(), language);
            assert!(!parser.file_extensions().is_empty());
        }
    }

    #[test]
    fn test_parser_creation_for_file() {
        let parser = ParserFactory::create_parser_for_file(&PathBuf::from("a/b.cpp")).unwrap();
        assert_eq!(parser.language_name(), "C++");

        let result = ParserFactory::create_parser_for_file(&PathBuf::from("a/b.rb"));
        assert!(matches!(result, Err(PolyrefError::UnsupportedFileType(_))));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SupportedLanguage::Python.to_string(), "Python");
        assert_eq!(SupportedLanguage::JavaScript.to_string(), "JavaScript");
        assert_eq!(SupportedLanguage::Cpp.to_string(), "C++");
    }
}
