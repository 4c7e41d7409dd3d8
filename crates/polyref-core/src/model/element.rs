//! 注解、注释与导入

use super::location::Location;
use serde::Serialize;
use std::fmt;

/// 注解（Python 装饰器、JavaScript 装饰器、C++ 属性）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub name: String,
    pub location: Location,
    /// 按出现顺序保存的键值对；单值注解使用键 `value`
    pub values: Vec<(String, String)>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 去掉限定前缀的名称，如 `functools.wraps` -> `wraps`
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        match self.values.as_slice() {
            [] => Ok(()),
            [(key, value)] if key == "value" => write!(f, "({value})"),
            values => {
                let pairs: Vec<String> = values.iter().map(|(k, v)| format!("{k} = {v}")).collect();
                write!(f, "({})", pairs.join(", "))
            }
        }
    }
}

/// 注释种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommentKind {
    /// `//`、`#`
    Line,
    /// `/* */`
    Block,
    /// 文档注释：Python docstring、`/** */`
    Doc,
}

/// 源码注释
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub text: String,
    pub location: Location,
    pub kind: CommentKind,
}

impl Comment {
    pub fn new(text: impl Into<String>, location: Location, kind: CommentKind) -> Self {
        Self {
            text: text.into(),
            location,
            kind,
        }
    }

    /// 根据注释文本推断种类
    pub fn classify(text: &str) -> CommentKind {
        let trimmed = text.trim_start();
        if trimmed.starts_with("/**") || trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")
        {
            CommentKind::Doc
        } else if trimmed.starts_with("/*") {
            CommentKind::Block
        } else {
            CommentKind::Line
        }
    }

    /// 去掉注释定界符后的正文
    pub fn clean_text(&self) -> String {
        let text = self.text.trim();
        match self.kind {
            CommentKind::Line => text
                .trim_start_matches("//")
                .trim_start_matches('#')
                .trim()
                .to_string(),
            CommentKind::Block | CommentKind::Doc => {
                let inner = strip_delimiters(text);
                inner
                    .lines()
                    .map(|line| line.trim().trim_start_matches('*').trim())
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

fn strip_delimiters(text: &str) -> &str {
    for (open, close) in [("/**", "*/"), ("/*", "*/"), ("\"\"\"", "\"\"\""), ("'''", "'''")] {
        if let Some(rest) = text.strip_prefix(open) {
            return rest.strip_suffix(close).unwrap_or(rest);
        }
    }
    text
}

/// 导入种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImportKind {
    /// 导入单个名称
    Single,
    /// `from x import *`、`import * from`
    Wildcard,
    /// JavaScript 默认导入
    Default,
    /// JavaScript `import * as ns`
    Namespace,
    /// Python 相对导入
    Relative,
    /// 直接引入文件，如 `#include`
    Direct,
}

/// 导入声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub name: String,
    pub alias: Option<String>,
    pub kind: ImportKind,
    pub location: Location,
}

impl Import {
    pub fn new(name: impl Into<String>, kind: ImportKind, location: Location) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            location,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn package_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(package, _)| package)
    }

    /// 在导入方作用域中可见的名称
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.simple_name())
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ImportKind::Single | ImportKind::Relative => write!(f, "import {}", self.name)?,
            ImportKind::Wildcard => write!(f, "import * from {}", self.name)?,
            ImportKind::Default => write!(
                f,
                "import {} from {}",
                self.alias.as_deref().unwrap_or("default"),
                self.name
            )?,
            ImportKind::Namespace => {
                return write!(
                    f,
                    "import * as {} from {}",
                    self.alias.as_deref().unwrap_or(self.simple_name()),
                    self.name
                );
            }
            ImportKind::Direct => return write!(f, "#include <{}>", self.name),
        }
        match (&self.kind, &self.alias) {
            (ImportKind::Default, _) | (_, None) => Ok(()),
            (_, Some(alias)) => write!(f, " as {alias}"),
        }
    }
}
