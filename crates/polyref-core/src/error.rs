use thiserror::Error;

/// polyref 工具的错误类型定义
#[derive(Error, Debug)]
pub enum PolyrefError {
    #[error("Git repository error: {0}")]
    GitError(String),

    #[error("Source parsing error: {0}")]
    ParseError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid commit hash: {0}")]
    InvalidCommitHash(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Tree-sitter parsing failed: {0}")]
    TreeSitterError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 位置信息违反构造约束（访问器缺陷，而非输入错误）
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// 模型实体违反构造约束
    #[error("Invalid model element: {0}")]
    InvalidModel(String),
}

impl PolyrefError {
    /// 是否属于构造约束错误
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            PolyrefError::InvalidLocation(_) | PolyrefError::InvalidModel(_)
        )
    }
}

/// 项目通用的 Result 类型别名
pub type Result<T> = std::result::Result<T, PolyrefError>;
