//! Git 快照加载模块
//!
//! 读取某个提交及其第一个父提交的源码树，得到差异分析所需的前后两份源文件集合

use crate::error::{PolyrefError, Result};
use crate::parser::SupportedLanguage;
use crate::reader::SourceFiles;
use gix::{ObjectId, ThreadSafeRepository};
use std::path::Path;
use tracing::{debug, info, warn};

/// 二进制检测时检查的前缀长度
const BINARY_PROBE_LEN: usize = 8192;

/// Git 快照加载器
pub struct GitSnapshotLoader {
    repo: ThreadSafeRepository,
}

/// 一个提交前后的源码快照
#[derive(Debug, Clone, Default)]
pub struct CommitSnapshots {
    /// 提交的完整哈希
    pub commit: String,
    /// 第一个父提交的完整哈希，根提交为 None
    pub parent: Option<String>,
    /// 父提交中的受支持源文件
    pub before: SourceFiles,
    /// 提交中的受支持源文件
    pub after: SourceFiles,
    /// 内容发生变化的受支持源文件（新增、删除或修改）
    pub changed_files: Vec<String>,
}

impl CommitSnapshots {
    /// 只保留发生变化的文件
    pub fn retain_changed(&mut self) {
        let changed = &self.changed_files;
        self.before.retain(|path, _| changed.contains(path));
        self.after.retain(|path, _| changed.contains(path));
    }
}

impl GitSnapshotLoader {
    /// 打开 Git 仓库
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        let repo_path = repo_path.as_ref();
        let repo = ThreadSafeRepository::open(repo_path).map_err(|e| {
            PolyrefError::GitError(format!(
                "Failed to open repository at {}: {}",
                repo_path.display(),
                e
            ))
        })?;

        Ok(Self { repo })
    }

    /// 加载提交及其第一个父提交的源码快照
    pub fn commit_snapshots(&self, commit_hash: &str, changed_only: bool) -> Result<CommitSnapshots> {
        let commit_id = self.parse_commit_hash(commit_hash)?;
        let repo = self.repo.to_thread_local();

        let commit = repo
            .find_object(commit_id)
            .map_err(|e| PolyrefError::GitError(format!("Failed to find commit {commit_hash}: {e}")))?
            .try_into_commit()
            .map_err(|e| PolyrefError::GitError(format!("{commit_hash} is not a commit: {e}")))?;

        let tree_id = commit
            .tree_id()
            .map_err(|e| PolyrefError::GitError(format!("Failed to get commit tree: {e}")))?;
        let after = self.tree_sources(tree_id.into(), &repo)?;

        let parent_id: Option<ObjectId> = commit.parent_ids().next().map(Into::into);
        let before = match parent_id {
            Some(parent_id) => {
                let parent_tree = repo
                    .find_object(parent_id)
                    .map_err(|e| {
                        PolyrefError::GitError(format!("Failed to find parent commit: {e}"))
                    })?
                    .try_into_commit()
                    .map_err(|e| PolyrefError::GitError(format!("Parent is not a commit: {e}")))?
                    .tree_id()
                    .map_err(|e| {
                        PolyrefError::GitError(format!("Failed to get parent tree: {e}"))
                    })?;
                self.tree_sources(parent_tree.into(), &repo)?
            }
            None => SourceFiles::new(),
        };

        let mut snapshots = CommitSnapshots {
            commit: commit_id.to_string(),
            parent: parent_id.map(|id| id.to_string()),
            changed_files: changed_paths(&before, &after),
            before,
            after,
        };
        if changed_only {
            snapshots.retain_changed();
        }

        info!(
            "加载提交 {} 的快照: 之前 {} 个文件, 之后 {} 个文件, 变更 {} 个",
            snapshots.commit,
            snapshots.before.len(),
            snapshots.after.len(),
            snapshots.changed_files.len()
        );
        Ok(snapshots)
    }

    /// 沿第一父提交链列出提交（从 `rev` 开始，最多 `limit` 个）
    pub fn first_parent_history(&self, rev: &str, limit: usize) -> Result<Vec<String>> {
        let repo = self.repo.to_thread_local();
        let mut current: Option<ObjectId> = Some(
            repo.rev_parse_single(rev)
                .map_err(|e| PolyrefError::GitError(format!("Failed to resolve {rev}: {e}")))?
                .into(),
        );

        let mut history = Vec::new();
        while let Some(id) = current {
            if history.len() >= limit {
                break;
            }
            let commit = repo
                .find_object(id)
                .map_err(|e| PolyrefError::GitError(format!("Failed to find commit {id}: {e}")))?
                .try_into_commit()
                .map_err(|e| PolyrefError::GitError(format!("{id} is not a commit: {e}")))?;
            history.push(id.to_string());
            current = commit.parent_ids().next().map(Into::into);
        }

        debug!("从 {rev} 开始的第一父提交链: {} 个提交", history.len());
        Ok(history)
    }

    /// 解析提交哈希字符串为 ObjectId
    pub fn parse_commit_hash(&self, commit_hash: &str) -> Result<ObjectId> {
        validate_commit_hash(commit_hash)?;

        let repo = self.repo.to_thread_local();
        repo.rev_parse_single(commit_hash)
            .map_err(|e| {
                PolyrefError::InvalidCommitHash(format!(
                    "Failed to resolve commit hash {commit_hash}: {e}"
                ))
            })
            .map(|obj| obj.into())
    }

    /// 读取树中所有受支持语言的文本文件
    fn tree_sources(&self, tree_id: ObjectId, repo: &gix::Repository) -> Result<SourceFiles> {
        let tree = repo
            .find_object(tree_id)
            .map_err(|e| PolyrefError::GitError(format!("Failed to find tree: {e}")))?
            .try_into_tree()
            .map_err(|e| PolyrefError::GitError(format!("{tree_id} is not a tree: {e}")))?;

        let entries = tree
            .traverse()
            .breadthfirst
            .files()
            .map_err(|e| PolyrefError::GitError(format!("Failed to traverse tree: {e}")))?;

        let mut sources = SourceFiles::new();
        for entry in entries {
            if !entry.mode.is_blob() {
                continue;
            }
            let path = entry.filepath.to_string();
            if SupportedLanguage::from_path(&path).is_none() {
                continue;
            }

            let blob = repo
                .find_object(entry.oid)
                .map_err(|e| PolyrefError::GitError(format!("Failed to find blob {path}: {e}")))?;
            if is_binary(&blob.data) {
                warn!("跳过二进制文件: {path}");
                continue;
            }
            sources.insert(path, String::from_utf8_lossy(&blob.data).into_owned());
        }
        Ok(sources)
    }
}

/// 校验提交哈希：4 到 40 个十六进制字符
pub fn validate_commit_hash(commit_hash: &str) -> Result<()> {
    if commit_hash.is_empty() {
        return Err(PolyrefError::InvalidCommitHash(
            "Empty commit hash".to_string(),
        ));
    }

    // 支持短哈希和完整哈希
    let hash_len = commit_hash.len();
    if !(4..=40).contains(&hash_len) {
        return Err(PolyrefError::InvalidCommitHash(format!(
            "Invalid commit hash length: {hash_len}"
        )));
    }

    if !commit_hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PolyrefError::InvalidCommitHash(format!(
            "Invalid commit hash format: {commit_hash}"
        )));
    }
    Ok(())
}

/// 简单的二进制检测：前缀中是否包含 null 字节
fn is_binary(data: &[u8]) -> bool {
    data[..data.len().min(BINARY_PROBE_LEN)].contains(&0)
}

/// 两个快照之间内容不同的路径（按路径排序）
fn changed_paths(before: &SourceFiles, after: &SourceFiles) -> Vec<String> {
    let mut changed: Vec<String> = after
        .iter()
        .filter(|(path, content)| before.get(*path) != Some(*content))
        .map(|(path, _)| path.clone())
        .collect();
    changed.extend(
        before
            .keys()
            .filter(|path| !after.contains_key(*path))
            .cloned(),
    );
    changed.sort();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo_path: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .output()
            .expect("Failed to run git");
        assert!(output.status.success(), "git {args:?} failed");
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    /// 创建一个临时的 Git 仓库用于测试
    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();
        git(&repo_path, &["init"]);
        git(&repo_path, &["config", "user.name", "Test User"]);
        git(&repo_path, &["config", "user.email", "test@example.com"]);
        (temp_dir, repo_path)
    }

    fn commit_files(repo_path: &Path, files: &[(&str, &[u8])], message: &str) -> String {
        for (name, content) in files {
            let path = repo_path.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        git(repo_path, &["add", "-A"]);
        git(repo_path, &["commit", "-m", message]);
        git(repo_path, &["rev-parse", "HEAD"])
    }

    #[test]
    fn test_validate_commit_hash() {
        assert!(validate_commit_hash("").is_err());
        assert!(validate_commit_hash("abc").is_err());
        assert!(validate_commit_hash(&"a".repeat(41)).is_err());
        assert!(validate_commit_hash("abcdefghij1234567890").is_err());
        assert!(validate_commit_hash("deadbeef").is_ok());
    }

    #[test]
    fn test_open_invalid_path() {
        let result = GitSnapshotLoader::new("/nonexistent/path");
        assert!(matches!(result, Err(PolyrefError::GitError(_))));
    }

    #[test]
    fn test_root_commit_has_empty_before() {
        let (_temp_dir, repo_path) = create_test_repo();
        let hash = commit_files(
            &repo_path,
            &[("src/app.py", b"def run():\n    pass\n"), ("README.md", b"docs")],
            "initial",
        );

        let loader = GitSnapshotLoader::new(&repo_path).unwrap();
        let snapshots = loader.commit_snapshots(&hash, false).unwrap();
        assert_eq!(snapshots.commit, hash);
        assert_eq!(snapshots.parent, None);
        assert!(snapshots.before.is_empty());
        assert_eq!(snapshots.after.keys().collect::<Vec<_>>(), vec!["src/app.py"]);
        assert_eq!(snapshots.changed_files, vec!["src/app.py".to_string()]);
    }

    #[test]
    fn test_snapshots_against_first_parent() {
        let (_temp_dir, repo_path) = create_test_repo();
        let first = commit_files(
            &repo_path,
            &[
                ("calc.cpp", b"int add(int a, int b) { return a + b; }\n"),
                ("util.js", b"function id(x) { return x; }\n"),
            ],
            "initial",
        );
        let second = commit_files(
            &repo_path,
            &[
                ("calc.cpp", b"int add(int x, int b) { return x + b; }\n"),
                ("blob.cpp", b"\0\x01binary"),
            ],
            "rename parameter",
        );

        let loader = GitSnapshotLoader::new(&repo_path).unwrap();
        let snapshots = loader.commit_snapshots(&second, false).unwrap();
        assert_eq!(snapshots.parent.as_deref(), Some(first.as_str()));
        assert_eq!(snapshots.before.len(), 2);
        // 二进制文件被跳过
        assert_eq!(snapshots.after.len(), 2);
        assert_eq!(snapshots.changed_files, vec!["calc.cpp".to_string()]);

        let changed = loader.commit_snapshots(&second[..12], true).unwrap();
        assert_eq!(changed.before.keys().collect::<Vec<_>>(), vec!["calc.cpp"]);
        assert_eq!(changed.after.keys().collect::<Vec<_>>(), vec!["calc.cpp"]);
    }

    #[test]
    fn test_unknown_commit() {
        let (_temp_dir, repo_path) = create_test_repo();
        commit_files(&repo_path, &[("a.py", b"x = 1\n")], "initial");
        let loader = GitSnapshotLoader::new(&repo_path).unwrap();
        let result = loader.commit_snapshots("1234567890abcdef1234567890abcdef12345678", false);
        assert!(result.is_err());
    }

    #[test]
    fn test_first_parent_history() {
        let (_temp_dir, repo_path) = create_test_repo();
        let first = commit_files(&repo_path, &[("a.py", b"x = 1\n")], "one");
        let second = commit_files(&repo_path, &[("a.py", b"x = 2\n")], "two");
        let third = commit_files(&repo_path, &[("a.py", b"x = 3\n")], "three");

        let loader = GitSnapshotLoader::new(&repo_path).unwrap();
        assert_eq!(
            loader.first_parent_history("HEAD", 10).unwrap(),
            vec![third.clone(), second.clone(), first]
        );
        assert_eq!(loader.first_parent_history("HEAD", 2).unwrap(), vec![third, second]);
    }

    #[test]
    fn test_changed_paths() {
        let before: SourceFiles = [("a.py", "1"), ("b.py", "2"), ("c.py", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let after: SourceFiles = [("a.py", "1"), ("b.py", "changed"), ("d.py", "4")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(changed_paths(&before, &after), vec!["b.py", "c.py", "d.py"]);
    }
}
