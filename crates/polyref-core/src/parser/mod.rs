//! 多语言解析器模块
//!
//! 提供通用的语言解析器接口、通用语法树和具体的语言实现

pub mod common;
pub mod cpp;
pub mod javascript;
pub mod python;
pub mod tree;

// 重新导出核心类型
pub use common::{LanguageParser, ParserFactory, SupportedLanguage};
pub use cpp::CppParser;
pub use javascript::JavaScriptParser;
pub use python::PythonParser;
pub use tree::{GenericTree, NodeId, Point, SyntaxNode, TreeBuilder};
