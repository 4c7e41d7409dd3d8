//! 测试数据集模块
//!
//! 提供多语言源码样例，以及基于临时目录的 Git 仓库

#![allow(dead_code)]

use polyref_core::SourceFiles;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// 由 (路径, 内容) 列表构造源码集合
pub fn sources(files: &[(&str, &str)]) -> SourceFiles {
    files
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect()
}

/// 一个重构场景：重构前后的源码
pub struct Scenario {
    pub before: SourceFiles,
    pub after: SourceFiles,
}

impl Scenario {
    pub fn single(path: &str, before: &str, after: &str) -> Self {
        Self {
            before: sources(&[(path, before)]),
            after: sources(&[(path, after)]),
        }
    }
}

/// 多语言混合项目，用于幂等性与读取器测试
pub fn mixed_project() -> SourceFiles {
    sources(&[
        (
            "app/models.py",
            r#"class Account:
    """Bank account."""
    rate = 0.02

    def __init__(self, owner, balance: float = 0.0):
        self.owner = owner
        self.balance = balance

    def deposit(self, amount: float):
        self.balance += amount
        return self.balance

def interest(account, years: int):
    return account.balance * account.rate * years
"#,
        ),
        (
            "web/cart.js",
            r#"import { total } from './pricing';

export class Cart {
  constructor(owner) {
    this.owner = owner;
    this.items = [];
  }

  add(item, quantity = 1) {
    this.items.push({ item, quantity });
    return this.items.length;
  }
}

function checkout(cart, coupon) {
  return total(cart.items, coupon);
}
"#,
        ),
        (
            "native/counter.hpp",
            r#"class Counter {
public:
    void tick(int step);
    int value() const { return count; }
private:
    int count;
};
"#,
        ),
        (
            "native/counter.cpp",
            r#"#include "counter.hpp"

void Counter::tick(int step) {
    count += step;
}

int clamp(int v, int lo, int hi) {
    return v < lo ? lo : (v > hi ? hi : v);
}
"#,
        ),
    ])
}

/// 临时 Git 仓库
pub struct TestRepo {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repo");
        std::fs::create_dir_all(&path).unwrap();
        let repo = Self {
            _temp_dir: temp_dir,
            path,
        };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let file = self.path.join(relative);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, content).unwrap();
    }

    /// 写入文件并提交，返回提交哈希
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (relative, content) in files {
            self.write(relative, content);
        }
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }
}
