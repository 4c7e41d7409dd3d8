//! 命令行接口模块
//!
//! 提供命令行参数解析、参数校验与配置转换

use clap::{Parser, Subcommand, ValueEnum};
use polyref_core::{
    DiffConfig, FormatterConfig, OutputFormat, PolyrefError, ReaderConfig, Result,
    validate_commit_hash,
};
use std::path::{Path, PathBuf};

/// polyref - 多语言重构检测工具
///
/// 基于 Tree-sitter 解析 Python、JavaScript 与 C++ 源码，
/// 比较两个版本并报告参数与方法层面的重构。
#[derive(Parser, Debug)]
#[command(name = "polyref")]
#[command(author = "polyref contributors")]
#[command(version)]
#[command(about = "Detect refactorings between two versions of a Python, JavaScript or C++ codebase")]
#[command(
    long_about = "polyref builds a language-agnostic model of two versions of a codebase, matches their operations by signature and body similarity, and reports renamed parameters, added parameters, changed parameter types and renamed methods."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 输出格式
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        global = true,
        default_value_t = OutputFormatArg::PlainText,
        help = "Output format for the report"
    )]
    pub format: OutputFormatArg,

    /// 输出到文件
    #[arg(
        short = 'o',
        long = "output",
        global = true,
        value_name = "FILE",
        help = "Write the report to a file instead of stdout"
    )]
    pub output_file: Option<PathBuf>,

    /// 方法重命名所需的语句相似度
    #[arg(
        long = "similarity-threshold",
        global = true,
        default_value_t = 0.7,
        value_name = "RATIO",
        help = "Minimum statement similarity (0.0-1.0) for matching renamed operations"
    )]
    pub similarity_threshold: f64,

    /// 名称相关性允许的最大编辑距离
    #[arg(
        long = "max-edit-distance",
        global = true,
        default_value_t = 2,
        value_name = "DISTANCE",
        help = "Maximum edit distance between normalized names of a renamed operation"
    )]
    pub max_edit_distance: usize,

    /// 工作线程数
    #[arg(
        short = 'j',
        long = "threads",
        global = true,
        env = "POLYREF_THREADS",
        value_name = "N",
        help = "Number of worker threads used to build models (defaults to the CPU count)",
        value_parser = clap::value_parser!(u32).range(1..=256)
    )]
    pub threads: Option<u32>,

    /// 串行构建模型
    #[arg(
        long = "sequential",
        global = true,
        help = "Build models on the current thread only"
    )]
    pub sequential: bool,

    /// 不显示位置
    #[arg(
        long = "no-locations",
        global = true,
        help = "Omit before/after source locations from the report"
    )]
    pub no_locations: bool,

    /// 不显示统计信息
    #[arg(
        long = "no-summary",
        global = true,
        help = "Omit the summary section from the report"
    )]
    pub no_summary: bool,

    /// 详细输出
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        help = "Enable verbose logging output"
    )]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 比较两个目录
    #[command(about = "Compare two directory trees")]
    Dirs {
        #[arg(long = "before", value_name = "DIR", help = "Directory with the old version")]
        before: PathBuf,
        #[arg(long = "after", value_name = "DIR", help = "Directory with the new version")]
        after: PathBuf,
    },
    /// 比较提交与其第一个父提交
    #[command(about = "Compare a commit against its first parent")]
    Commit {
        #[arg(
            help = "Git commit hash to analyze (supports both full and short format)",
            value_name = "COMMIT_HASH"
        )]
        commit_hash: String,
        #[arg(
            short = 'r',
            long = "repo",
            default_value = ".",
            value_name = "PATH",
            help = "Path to the Git repository"
        )]
        repo_path: PathBuf,
        #[arg(long = "changed-only", help = "Only model files changed by the commit")]
        changed_only: bool,
    },
    /// 沿第一父提交链逐个分析提交
    #[command(about = "Analyze commits along the first-parent history")]
    History {
        #[arg(
            long = "rev",
            default_value = "HEAD",
            value_name = "REV",
            help = "Revision to start from"
        )]
        rev: String,
        #[arg(
            short = 'n',
            long = "limit",
            default_value_t = 10,
            value_name = "N",
            help = "Maximum number of commits to analyze",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        limit: u32,
        #[arg(
            short = 'r',
            long = "repo",
            default_value = ".",
            value_name = "PATH",
            help = "Path to the Git repository"
        )]
        repo_path: PathBuf,
        #[arg(long = "changed-only", help = "Only model files changed by each commit")]
        changed_only: bool,
    },
}

/// 输出格式命令行参数
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    /// 纯文本格式输出
    #[value(name = "text")]
    PlainText,
    /// Markdown 格式输出
    #[value(name = "markdown")]
    Markdown,
    /// HTML 格式输出
    #[value(name = "html")]
    Html,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::PlainText => OutputFormat::PlainText,
            OutputFormatArg::Markdown => OutputFormat::Markdown,
            OutputFormatArg::Html => OutputFormat::Html,
        }
    }
}

/// 要比较的两个版本从哪里来
#[derive(Debug, Clone)]
pub enum Source {
    Directories {
        before: PathBuf,
        after: PathBuf,
    },
    Commit {
        repo_path: PathBuf,
        commit_hash: String,
        changed_only: bool,
    },
    History {
        repo_path: PathBuf,
        rev: String,
        limit: usize,
        changed_only: bool,
    },
}

/// 应用程序配置信息
#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub diff: DiffConfig,
    pub reader: ReaderConfig,
    pub formatter: FormatterConfig,
    /// 输出文件路径
    pub output_file: Option<PathBuf>,
    /// 是否启用详细输出
    pub verbose: bool,
}

impl From<Command> for Source {
    fn from(command: Command) -> Self {
        match command {
            Command::Dirs { before, after } => Source::Directories { before, after },
            Command::Commit {
                commit_hash,
                repo_path,
                changed_only,
            } => Source::Commit {
                repo_path,
                commit_hash,
                changed_only,
            },
            Command::History {
                rev,
                limit,
                repo_path,
                changed_only,
            } => Source::History {
                repo_path,
                rev,
                limit: limit as usize,
                changed_only,
            },
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let mut reader = ReaderConfig::new().with_parallel(!cli.sequential);
        if let Some(threads) = cli.threads {
            reader = reader.with_threads(threads as usize);
        }

        Config {
            source: cli.command.into(),
            diff: DiffConfig::default()
                .with_body_similarity_threshold(cli.similarity_threshold)
                .with_max_name_edit_distance(cli.max_edit_distance),
            reader,
            formatter: FormatterConfig {
                output_format: cli.format.into(),
                show_locations: !cli.no_locations,
                show_summary: !cli.no_summary,
            },
            output_file: cli.output_file,
            verbose: cli.verbose,
        }
    }
}

impl Cli {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 验证参数的有效性
    pub fn validate(&self) -> Result<()> {
        DiffConfig::default()
            .with_body_similarity_threshold(self.similarity_threshold)
            .validate()?;

        match &self.command {
            Command::Dirs { before, after } => {
                require_directory(before)?;
                require_directory(after)?;
            }
            Command::Commit {
                commit_hash,
                repo_path,
                ..
            } => {
                validate_commit_hash(commit_hash)?;
                require_directory(repo_path)?;
            }
            Command::History { rev, repo_path, .. } => {
                if rev.trim().is_empty() {
                    return Err(PolyrefError::ConfigError(
                        "Revision cannot be empty".to_string(),
                    ));
                }
                require_directory(repo_path)?;
            }
        }

        // 验证并创建输出文件路径 (如果指定)
        if let Some(output_file) = &self.output_file
            && let Some(parent) = output_file.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PolyrefError::IoError(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        Ok(())
    }
}

fn require_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PolyrefError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", path.display()),
        )))
    }
}
