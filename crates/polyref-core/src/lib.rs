//! polyref-core - 多语言重构检测核心库
//!
//! 基于 Tree-sitter 解析 Python、JavaScript 与 C++ 源码，构建与语言无关的代码模型，
//! 比较两个版本的模型并报告参数重命名、参数新增、参数类型变更与方法重命名。

pub mod diff;
pub mod error;
pub mod formatter;
pub mod git;
pub mod model;
pub mod parser;
pub mod performance;
pub mod reader;
pub mod refactoring;
pub mod visitor;

// 重新导出主要的公共 API
pub use diff::{DiffConfig, ModelDiff, OperationBodyMapper, detect_refactorings};
pub use error::{PolyrefError, Result};
pub use formatter::{
    FormattedOutput, FormatterConfig, OutputFormat, OutputMetadata, ReportRenderer, ReportSection,
};
pub use git::{CommitSnapshots, GitSnapshotLoader, validate_commit_hash};
pub use model::{Class, CodeModel, Location, Operation, Parameter, Type};
pub use parser::{GenericTree, LanguageParser, ParserFactory, SupportedLanguage};
pub use reader::{ModelReader, ReadOutcome, ReaderConfig, SourceFiles, load_directory};
pub use refactoring::{Refactoring, RefactoringSummary, RefactoringType};
pub use visitor::build_model;
// 导出性能统计组件
pub use performance::{CacheStats, ParserCache, PerformanceMonitor, PerformanceStats};
