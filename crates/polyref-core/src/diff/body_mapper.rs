//! 操作体映射器
//!
//! 对一对操作：先做参数映射，再把两个操作体按行拆成语句，
//! 用最长公共子序列（LCS）求有序对齐，随后贪心配对剩余语句。
//! 名称不同且语句相似度达到阈值时报告方法重命名。

use super::DiffConfig;
use super::mapping::StatementMapping;
use super::parameter_mapper::ParameterMapper;
use super::statement_mapper::{ParameterReplacements, StatementMapper};
use crate::model::Operation;
use crate::refactoring::Refactoring;
use tracing::debug;

/// 把操作体拆成语句：逐行去除首尾空白，丢弃空行
pub fn split_statements(body: &str) -> Vec<&str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

#[derive(Debug)]
pub struct OperationBodyMapper<'a> {
    operation1: &'a Operation,
    operation2: &'a Operation,
    parameter_replacements: ParameterReplacements,
    mappings: Vec<StatementMapping>,
    refactorings: Vec<Refactoring<'a>>,
}

impl<'a> OperationBodyMapper<'a> {
    pub fn new(operation1: &'a Operation, operation2: &'a Operation, config: &DiffConfig) -> Self {
        let parameter_mapper = ParameterMapper::new(operation1, operation2);
        let parameter_replacements = parameter_mapper.parameter_replacements().clone();
        let mut mapper = Self {
            operation1,
            operation2,
            parameter_replacements,
            mappings: Vec::new(),
            refactorings: parameter_mapper.into_refactorings(),
        };

        if let (Some(body1), Some(body2)) = (&operation1.body, &operation2.body) {
            let statements1 = split_statements(body1);
            let statements2 = split_statements(body2);
            mapper.map_statements(&statements1, &statements2);
        }

        if operation1.name != operation2.name {
            let score = mapper.body_comparator_score();
            if score >= config.body_similarity_threshold {
                debug!(
                    "方法重命名: {} -> {} (相似度 {score:.2})",
                    operation1.qualified_name(),
                    operation2.name
                );
                mapper.refactorings.push(Refactoring::RenameMethod {
                    original: operation1,
                    renamed: operation2,
                });
            }
        }
        mapper
    }

    fn statement_mapper<'s>(&self, statement1: &'s str, statement2: &'s str) -> StatementMapper<'s> {
        StatementMapper::new(statement1, statement2, &self.parameter_replacements)
    }

    fn map_statements(&mut self, statements1: &[&str], statements2: &[&str]) {
        let (rows, columns) = (statements1.len(), statements2.len());

        // matrix[i][j]：前 i 条与前 j 条语句的 LCS 长度
        let mut matrix = vec![vec![0usize; columns + 1]; rows + 1];
        for i in 1..=rows {
            for j in 1..=columns {
                matrix[i][j] = if self
                    .statement_mapper(statements1[i - 1], statements2[j - 1])
                    .matches()
                {
                    matrix[i - 1][j - 1] + 1
                } else {
                    matrix[i - 1][j].max(matrix[i][j - 1])
                };
            }
        }

        let mut mapped1 = vec![false; rows];
        let mut mapped2 = vec![false; columns];
        let mut ordered = Vec::new();
        let (mut i, mut j) = (rows, columns);
        while i > 0 && j > 0 {
            if matrix[i][j] > matrix[i - 1][j].max(matrix[i][j - 1]) {
                if let Some(mapping) = self
                    .statement_mapper(statements1[i - 1], statements2[j - 1])
                    .create_mapping()
                {
                    ordered.push(mapping);
                    mapped1[i - 1] = true;
                    mapped2[j - 1] = true;
                }
                i -= 1;
                j -= 1;
            } else if matrix[i - 1][j] > matrix[i][j - 1] {
                i -= 1;
            } else {
                j -= 1;
            }
        }
        ordered.reverse();
        self.mappings.extend(ordered);

        // 剩余语句贪心配对：每条旧语句取第一条可匹配的新语句
        for (i, statement1) in statements1.iter().enumerate() {
            if mapped1[i] {
                continue;
            }
            for (j, statement2) in statements2.iter().enumerate() {
                if mapped2[j] {
                    continue;
                }
                if let Some(mapping) = self.statement_mapper(statement1, statement2).create_mapping()
                {
                    self.mappings.push(mapping);
                    mapped1[i] = true;
                    mapped2[j] = true;
                    break;
                }
            }
        }
    }

    /// 已映射语句数与较长操作体语句数之比；任一操作体缺失时为 0
    pub fn body_comparator_score(&self) -> f64 {
        let (Some(body1), Some(body2)) = (&self.operation1.body, &self.operation2.body) else {
            return 0.0;
        };
        let max_statements = split_statements(body1)
            .len()
            .max(split_statements(body2).len());
        if max_statements == 0 {
            0.0
        } else {
            self.mappings.len() as f64 / max_statements as f64
        }
    }

    pub fn operation1(&self) -> &'a Operation {
        self.operation1
    }

    pub fn operation2(&self) -> &'a Operation {
        self.operation2
    }

    pub fn mappings(&self) -> &[StatementMapping] {
        &self.mappings
    }

    pub fn parameter_replacements(&self) -> &ParameterReplacements {
        &self.parameter_replacements
    }

    pub fn refactorings(&self) -> &[Refactoring<'a>] {
        &self.refactorings
    }

    pub fn into_refactorings(self) -> Vec<Refactoring<'a>> {
        self.refactorings
    }
}
