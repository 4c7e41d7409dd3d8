//! 参数映射器
//!
//! 按位置对齐两个操作的参数列表。同一位置名称不同记为重命名，
//! 否则类型不同记为类型变更；新列表多出的尾部参数记为新增参数。
//! 参数删除不做检测。

use super::statement_mapper::ParameterReplacements;
use crate::model::{Operation, Parameter};
use crate::parser::SupportedLanguage;
use crate::refactoring::Refactoring;
use std::collections::HashSet;

#[derive(Debug)]
pub struct ParameterMapper<'a> {
    parameter_replacements: ParameterReplacements,
    refactorings: Vec<Refactoring<'a>>,
}

impl<'a> ParameterMapper<'a> {
    pub fn new(operation1: &'a Operation, operation2: &'a Operation) -> Self {
        let mut mapper = Self {
            parameter_replacements: ParameterReplacements::new(),
            refactorings: Vec::new(),
        };
        mapper.map_parameters(operation1, operation2);
        mapper
    }

    fn map_parameters(&mut self, operation1: &'a Operation, operation2: &'a Operation) {
        let params1 = &operation1.parameters;
        let params2 = &operation2.parameters;
        let mut processed: HashSet<(&str, &str)> = HashSet::new();

        // 只有 Python 文件跳过双方共有的首个 self 参数
        let is_python = SupportedLanguage::from_path(operation1.location.file_path())
            == Some(SupportedLanguage::Python);
        let start = if is_python && skips_self(params1, params2) {
            1
        } else {
            0
        };

        for (param1, param2) in params1.iter().zip(params2).skip(start) {
            if param1.name != param2.name {
                if processed.insert((param1.name.as_str(), param2.name.as_str())) {
                    self.parameter_replacements
                        .insert(param1.name.clone(), param2.name.clone());
                    self.refactorings.push(Refactoring::RenameParameter {
                        original: param1,
                        renamed: param2,
                        operation: operation2,
                    });
                }
            } else if param1.parameter_type != param2.parameter_type {
                self.refactorings.push(Refactoring::ChangeParameterType {
                    original: param1,
                    changed: param2,
                    operation: operation2,
                });
            }
        }

        for added in params2.iter().skip(params1.len()) {
            self.refactorings.push(Refactoring::AddParameter {
                added,
                operation: operation2,
            });
        }
    }

    /// 参数重命名表
    pub fn parameter_replacements(&self) -> &ParameterReplacements {
        &self.parameter_replacements
    }

    pub fn refactorings(&self) -> &[Refactoring<'a>] {
        &self.refactorings
    }

    pub fn into_refactorings(self) -> Vec<Refactoring<'a>> {
        self.refactorings
    }

    pub fn is_parameter_renamed(&self, old_name: &str, new_name: &str) -> bool {
        self.parameter_replacements
            .get(old_name)
            .is_some_and(|renamed| renamed == new_name)
    }

    /// 参数在新版本中的名称
    pub fn mapped_name<'n>(&'n self, original_name: &'n str) -> &'n str {
        self.parameter_replacements
            .get(original_name)
            .map_or(original_name, String::as_str)
    }
}

fn skips_self(params1: &[Parameter], params2: &[Parameter]) -> bool {
    matches!(
        (params1.first(), params2.first()),
        (Some(first1), Some(first2)) if first1.name == "self" && first2.name == "self"
    )
}
