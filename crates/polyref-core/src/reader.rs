//! 模型读取器
//!
//! 将一组源文件（路径到源码的映射）构建为一个代码模型：
//! 按扩展名识别语言，解析为通用语法树，再交给对应语言的访问器。
//! 并行模式下每个文件构建为独立的部分模型，最后按输入顺序合并。

use crate::error::{PolyrefError, Result};
use crate::model::CodeModel;
use crate::parser::SupportedLanguage;
use crate::performance::{ParserCache, PerformanceMonitor, PerformanceStats};
use crate::visitor;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::PoisonError;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 文件路径到源码文本的映射，按路径排序保证处理与合并顺序确定
pub type SourceFiles = BTreeMap<String, String>;

/// 读取器配置
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// 工作线程数量
    pub threads: usize,
    /// 是否并行处理文件
    pub parallel: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            parallel: true,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// 一次构建的完整结果
#[derive(Debug)]
pub struct ReadOutcome {
    pub model: CodeModel,
    /// 语言不受支持而跳过的文件
    pub skipped: Vec<String>,
    /// 构建失败的文件及原因
    pub failed: Vec<(String, PolyrefError)>,
    pub stats: PerformanceStats,
}

enum FileResult {
    Built(SupportedLanguage, CodeModel),
    Skipped(String),
    Failed(String, PolyrefError),
}

/// 模型读取器
#[derive(Default)]
pub struct ModelReader {
    config: ReaderConfig,
    cache: ParserCache,
}

impl ModelReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            config,
            cache: ParserCache::new(),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 构建代码模型，忽略跳过与失败的文件
    pub fn read(&self, files: &SourceFiles) -> Result<CodeModel> {
        Ok(self.build(files)?.model)
    }

    /// 读取目录下所有受支持的源文件并构建代码模型
    pub fn read_directory(&self, root: &Path) -> Result<CodeModel> {
        self.read(&load_directory(root)?)
    }

    /// 构建代码模型并报告跳过、失败的文件与性能统计
    pub fn build(&self, files: &SourceFiles) -> Result<ReadOutcome> {
        let monitor = PerformanceMonitor::new();
        info!("开始构建代码模型: {} 个文件", files.len());

        let entries: Vec<(&String, &String)> = files.iter().collect();
        let results: Vec<FileResult> = if self.config.parallel && entries.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads.max(1))
                .build()
                .map_err(|e| {
                    PolyrefError::ConfigError(format!("Failed to create thread pool: {e}"))
                })?;
            pool.install(|| {
                entries
                    .par_iter()
                    .map(|(path, source)| self.read_file(path, source, &monitor))
                    .collect()
            })
        } else {
            entries
                .iter()
                .map(|(path, source)| self.read_file(path, source, &monitor))
                .collect()
        };

        let mut model = CodeModel::new(None);
        let mut languages = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            match result {
                FileResult::Built(language, partial) => {
                    languages.push(language);
                    model.merge(partial);
                }
                FileResult::Skipped(path) => skipped.push(path),
                FileResult::Failed(path, error) => failed.push((path, error)),
            }
        }
        model.set_language(dominant_language(&languages));
        model.link_out_of_class_members();

        let stats = monitor.get_stats(self.cache.get_stats());
        info!(
            "代码模型构建完成: {} 个类, {} 个独立操作, 跳过 {}, 失败 {}, 耗时 {:?}",
            model.number_of_classes(),
            model.operations().len(),
            skipped.len(),
            failed.len(),
            stats.total_duration
        );

        Ok(ReadOutcome {
            model,
            skipped,
            failed,
            stats,
        })
    }

    fn read_file(&self, path: &str, source: &str, monitor: &PerformanceMonitor) -> FileResult {
        let Some(language) = SupportedLanguage::from_path(path) else {
            warn!("跳过不支持的文件: {path}");
            monitor.record_skipped();
            return FileResult::Skipped(path.to_string());
        };

        let start_time = Instant::now();
        let result = self.build_file(language, path, source);
        let processing_time = start_time.elapsed();
        monitor.record_file_processed(processing_time);

        match result {
            Ok(partial) => {
                debug!("成功处理文件: {path} ({language}), 耗时: {processing_time:?}");
                FileResult::Built(language, partial)
            }
            Err(error) => {
                warn!("处理文件失败: {path}, 错误: {error}");
                monitor.record_error();
                FileResult::Failed(path.to_string(), error)
            }
        }
    }

    fn build_file(&self, language: SupportedLanguage, path: &str, source: &str) -> Result<CodeModel> {
        let parser = self.cache.get_or_create_parser(language)?;
        let tree = {
            let mut parser = parser.lock().unwrap_or_else(PoisonError::into_inner);
            parser.parse_source(source)?
        };
        visitor::build_model(language, &tree, path)
    }
}

/// 文件数最多的语言；数量相同时取最先处理的文件所属语言
fn dominant_language(languages: &[SupportedLanguage]) -> Option<SupportedLanguage> {
    let mut counts: Vec<(SupportedLanguage, usize)> = Vec::new();
    for language in languages {
        match counts.iter_mut().find(|(l, _)| l == language) {
            Some((_, count)) => *count += 1,
            None => counts.push((*language, 1)),
        }
    }
    // counts 按首次出现排序，max_by 在相等时取后者，因此倒序查找
    counts
        .iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(language, _)| *language)
}

/// 加载目录下所有受支持的源文件，路径相对于根目录并使用 `/` 分隔
pub fn load_directory(root: &Path) -> Result<SourceFiles> {
    let mut files = SourceFiles::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            PolyrefError::IoError(std::io::Error::other(format!(
                "Failed to walk {}: {e}",
                root.display()
            )))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if SupportedLanguage::from_path(&relative).is_none() {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => {
                files.insert(relative, content);
            }
            Err(e) => warn!("无法读取文件 {}: {e}", entry.path().display()),
        }
    }

    debug!("从 {} 加载了 {} 个源文件", root.display(), files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sources(entries: &[(&str, &str)]) -> SourceFiles {
        entries
            .iter()
            .map(|(path, source)| (path.to_string(), source.to_string()))
            .collect()
    }

    #[test]
    fn test_unsupported_files_are_skipped() {
        let files = sources(&[
            ("app/main.py", "def main():\n    return 0\n"),
            ("README.md", "# readme"),
            ("build.rs", "fn main() {}"),
        ]);
        let outcome = ModelReader::new().build(&files).unwrap();

        assert_eq!(outcome.skipped, vec!["README.md".to_string(), "build.rs".to_string()]);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.model.operations().len(), 1);
        assert_eq!(outcome.model.language(), Some(SupportedLanguage::Python));
        assert_eq!(outcome.stats.skipped_files, 2);
        assert_eq!(outcome.stats.files_processed, 1);
    }

    #[test]
    fn test_dominant_language() {
        use SupportedLanguage::*;
        assert_eq!(dominant_language(&[Cpp, Python, Python]), Some(Python));
        assert_eq!(dominant_language(&[Cpp, Python]), Some(Cpp));
        assert_eq!(dominant_language(&[JavaScript, Cpp, Cpp, JavaScript]), Some(JavaScript));
        assert_eq!(dominant_language(&[]), None);
    }

    #[test]
    fn test_parallel_and_sequential_models_agree() {
        let files = sources(&[
            ("a.py", "class A:\n    def run(self, x):\n        return x\n"),
            ("b.py", "def helper(y):\n    return y * 2\n"),
            ("c.js", "function greet(name) { return 'hi ' + name; }\n"),
            ("d.cpp", "int add(int a, int b) { return a + b; }\n"),
        ]);
        let parallel = ModelReader::with_config(ReaderConfig::new().with_threads(4))
            .read(&files)
            .unwrap();
        let sequential = ModelReader::with_config(ReaderConfig::new().with_parallel(false))
            .read(&files)
            .unwrap();

        let names = |model: &CodeModel| -> Vec<String> {
            model.all_operations().map(|op| op.qualified_name()).collect()
        };
        assert_eq!(names(&parallel), vec!["helper", "greet", "add", "A.run"]);
        assert_eq!(names(&parallel), names(&sequential));
        assert_eq!(parallel.language(), Some(SupportedLanguage::Python));
        assert_eq!(parallel.number_of_files(), 4);
    }

    #[test]
    fn test_definitions_linked_across_files() {
        let files = sources(&[
            ("counter.cpp", "int Counter::count = 5;\nvoid Counter::tick() { count++; }\n"),
            ("counter.hpp", "class Counter {\npublic:\n    void tick();\n    static int count;\n};\n"),
        ]);
        let model = ModelReader::new().read(&files).unwrap();

        let class = model.class("Counter").unwrap();
        assert_eq!(class.operation("tick").unwrap().body.as_deref(), Some("{ count++; }"));
        assert_eq!(class.attribute("count").unwrap().initial_value.as_deref(), Some("5"));
        assert!(model.operations().is_empty());
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("pkg/sub/mod.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("main.js"), "let a;\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join(".git/config.py"), "hidden").unwrap();

        let files = load_directory(dir.path()).unwrap();
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["main.js", "pkg/sub/mod.py"]);

        let model = ModelReader::new().read_directory(dir.path()).unwrap();
        assert_eq!(model.number_of_files(), 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let result = load_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(PolyrefError::IoError(_))));
    }
}
