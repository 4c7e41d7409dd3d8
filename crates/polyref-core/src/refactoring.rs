//! 重构类型
//!
//! 重构只由模型差异分析产生，借用两个代码模型中的操作与参数，
//! 因此两个模型的生命周期必须长于重构列表。

use crate::model::{Location, Operation, Parameter};
use crate::parser::SupportedLanguage;
use serde::Serialize;
use std::fmt;

/// 重构种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefactoringType {
    RenameParameter,
    AddParameter,
    ChangeParameterType,
    RenameMethod,
}

impl RefactoringType {
    /// 报告中的固定顺序
    pub const ALL: [RefactoringType; 4] = [
        RefactoringType::RenameParameter,
        RefactoringType::AddParameter,
        RefactoringType::ChangeParameterType,
        RefactoringType::RenameMethod,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RefactoringType::RenameParameter => "Rename Parameter",
            RefactoringType::AddParameter => "Add Parameter",
            RefactoringType::ChangeParameterType => "Change Parameter Type",
            RefactoringType::RenameMethod => "Rename Method",
        }
    }
}

impl fmt::Display for RefactoringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 检测到的重构
#[derive(Debug, Clone)]
pub enum Refactoring<'a> {
    /// 同一位置的参数名称改变
    RenameParameter {
        original: &'a Parameter,
        renamed: &'a Parameter,
        /// 新版本中的操作
        operation: &'a Operation,
    },
    /// 新版本参数列表末尾新增的参数
    AddParameter {
        added: &'a Parameter,
        operation: &'a Operation,
    },
    /// 名称不变而类型改变的参数
    ChangeParameterType {
        original: &'a Parameter,
        changed: &'a Parameter,
        operation: &'a Operation,
    },
    RenameMethod {
        original: &'a Operation,
        renamed: &'a Operation,
    },
}

/// 描述中引用操作的方式：`method 'C.m'` 或 `function 'f'`
fn owner_phrase(operation: &Operation) -> String {
    match &operation.class_name {
        Some(class_name) => format!("method '{class_name}.{}'", operation.name),
        None => format!("function '{}'", operation.name),
    }
}

/// 按文件扩展名给出语言名称
fn language_of(operation: &Operation) -> &'static str {
    SupportedLanguage::from_path(operation.location.file_path())
        .map(|language| language.display_name())
        .unwrap_or("Unknown")
}

impl<'a> Refactoring<'a> {
    pub fn refactoring_type(&self) -> RefactoringType {
        match self {
            Refactoring::RenameParameter { .. } => RefactoringType::RenameParameter,
            Refactoring::AddParameter { .. } => RefactoringType::AddParameter,
            Refactoring::ChangeParameterType { .. } => RefactoringType::ChangeParameterType,
            Refactoring::RenameMethod { .. } => RefactoringType::RenameMethod,
        }
    }

    /// 决定语言与涉及文件的操作
    fn anchor(&self) -> &'a Operation {
        match *self {
            Refactoring::RenameParameter { operation, .. }
            | Refactoring::AddParameter { operation, .. }
            | Refactoring::ChangeParameterType { operation, .. } => operation,
            Refactoring::RenameMethod { original, .. } => original,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Refactoring::RenameParameter {
                original,
                renamed,
                operation,
            } => format!(
                "Parameter '{}' renamed to '{}' in {}",
                original.name,
                renamed.name,
                owner_phrase(operation)
            ),
            Refactoring::AddParameter { added, operation } => {
                let mut description = format!(
                    "Parameter '{}' of type '{}' added to {}",
                    added.name,
                    added.parameter_type,
                    owner_phrase(operation)
                );
                if let Some(default_value) = &added.default_value {
                    description.push_str(&format!(" with default value '{default_value}'"));
                }
                description
            }
            Refactoring::ChangeParameterType {
                original,
                changed,
                operation,
            } => format!(
                "Parameter '{}' type changed from '{}' to '{}' in {}",
                original.name,
                original.parameter_type,
                changed.parameter_type,
                owner_phrase(operation)
            ),
            Refactoring::RenameMethod { original, renamed } => match &original.class_name {
                Some(class_name) => format!(
                    "Method '{class_name}.{}' renamed to '{}'",
                    original.name, renamed.name
                ),
                None => format!(
                    "Function '{}' renamed to '{}'",
                    original.name, renamed.name
                ),
            },
        }
    }

    pub fn language(&self) -> &'static str {
        language_of(self.anchor())
    }

    /// 重构前的位置
    pub fn left_side_locations(&self) -> Vec<&'a Location> {
        match *self {
            Refactoring::RenameParameter { original, .. }
            | Refactoring::ChangeParameterType { original, .. } => vec![&original.location],
            Refactoring::AddParameter { operation, .. } => vec![&operation.location],
            Refactoring::RenameMethod { original, .. } => vec![&original.location],
        }
    }

    /// 重构后的位置
    pub fn right_side_locations(&self) -> Vec<&'a Location> {
        match *self {
            Refactoring::RenameParameter { renamed, .. } => vec![&renamed.location],
            Refactoring::ChangeParameterType { changed, .. } => vec![&changed.location],
            Refactoring::AddParameter { added, operation } => {
                vec![&operation.location, &added.location]
            }
            Refactoring::RenameMethod { renamed, .. } => vec![&renamed.location],
        }
    }

    /// 涉及的文件（去重，保持顺序）
    pub fn involved_files(&self) -> Vec<&'a str> {
        let mut files = vec![self.anchor().location.file_path()];
        if let Refactoring::RenameMethod { renamed, .. } = *self {
            let renamed_file = renamed.location.file_path();
            if !files.contains(&renamed_file) {
                files.push(renamed_file);
            }
        }
        files
    }

    /// 生成不借用模型的可序列化摘要
    pub fn summary(&self) -> RefactoringSummary {
        RefactoringSummary {
            kind: self.refactoring_type(),
            name: self.refactoring_type().display_name().to_string(),
            description: self.description(),
            language: self.language().to_string(),
            left_side_locations: self.left_side_locations().into_iter().cloned().collect(),
            right_side_locations: self.right_side_locations().into_iter().cloned().collect(),
            involved_files: self
                .involved_files()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for Refactoring<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}: {}",
            self.refactoring_type(),
            self.language(),
            self.description()
        )
    }
}

/// 重构的自有摘要，用于报告输出与序列化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefactoringSummary {
    pub kind: RefactoringType,
    pub name: String,
    pub description: String,
    pub language: String,
    pub left_side_locations: Vec<Location>,
    pub right_side_locations: Vec<Location>,
    pub involved_files: Vec<String>,
}

impl fmt::Display for RefactoringSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.name, self.language, self.description)
    }
}
