//! polyref - 多语言重构检测工具
//!
//! 比较两个目录、一个提交或一段提交历史，报告检测到的重构。

mod cli;

use cli::{Cli, Config, Source};
use polyref_core::{
    CodeModel, DiffConfig, GitSnapshotLoader, ModelDiff, ModelReader, PolyrefError, Refactoring,
    RefactoringSummary, ReportRenderer, ReportSection,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// 命令行程序的错误类型
#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Core(#[from] PolyrefError),

    #[error("Failed to write report to {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: PolyrefError,
    },
}

fn main() {
    // 解析命令行参数
    let cli = Cli::parse_args();

    // 初始化日志记录，RUST_LOG 优先
    init_logging(cli.verbose);

    // 验证参数
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config: Config = cli.into();
    if config.verbose {
        info!("开始分析");
        debug!(
            "配置: source={:?}, format={:?}, threshold={}",
            config.source, config.formatter.output_format, config.diff.body_similarity_threshold
        );
    }

    if let Err(e) = run(&config) {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    info!("分析完成");
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 主要应用逻辑
fn run(config: &Config) -> Result<(), CliError> {
    let reader = ModelReader::with_config(config.reader.clone());

    let sections = match &config.source {
        Source::Directories { before, after } => {
            info!("比较目录 {} 与 {}", before.display(), after.display());
            let old = reader.read_directory(before)?;
            let new = reader.read_directory(after)?;
            vec![ReportSection::new(None, summarize(&old, &new, &config.diff))]
        }
        Source::Commit {
            repo_path,
            commit_hash,
            changed_only,
        } => {
            let loader = GitSnapshotLoader::new(repo_path)?;
            vec![analyze_commit(&loader, &reader, config, commit_hash, *changed_only, false)?]
        }
        Source::History {
            repo_path,
            rev,
            limit,
            changed_only,
        } => {
            let loader = GitSnapshotLoader::new(repo_path)?;
            let commits = loader.first_parent_history(rev, *limit)?;
            info!("分析 {} 个提交", commits.len());
            commits
                .iter()
                .map(|commit| analyze_commit(&loader, &reader, config, commit, *changed_only, true))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let output = ReportRenderer::new(config.formatter.clone()).render_sections(&sections);
    match &config.output_file {
        Some(path) => {
            output.save_to_file(path).map_err(|source| CliError::Output {
                path: path.clone(),
                source,
            })?;
            info!(
                "报告已写入 {} ({} 个重构, {} 字节)",
                path.display(),
                output.metadata.refactoring_count,
                output.metadata.content_size
            );
        }
        None => print!("{}", output.content),
    }
    Ok(())
}

fn summarize(old: &CodeModel, new: &CodeModel, diff: &DiffConfig) -> Vec<RefactoringSummary> {
    ModelDiff::with_config(old, new, diff.clone())
        .detect_refactorings()
        .iter()
        .map(Refactoring::summary)
        .collect()
}

/// 分析单个提交；`titled` 为真时以短哈希作为分组标题
fn analyze_commit(
    loader: &GitSnapshotLoader,
    reader: &ModelReader,
    config: &Config,
    commit_hash: &str,
    changed_only: bool,
    titled: bool,
) -> Result<ReportSection, CliError> {
    let snapshots = loader.commit_snapshots(commit_hash, changed_only)?;
    let old = reader.read(&snapshots.before)?;
    let new = reader.read(&snapshots.after)?;
    let refactorings = summarize(&old, &new, &config.diff);

    let short_hash = &snapshots.commit[..snapshots.commit.len().min(7)];
    info!("提交 {short_hash}: 检测到 {} 个重构", refactorings.len());
    let title = titled.then(|| format!("Commit {short_hash}"));
    Ok(ReportSection::new(title, refactorings))
}
