//! 语句映射器
//!
//! 在已知参数重命名表的前提下判断两条语句是否对应。
//! 对第一条语句做整词替换，结果与第二条语句完全相同才算匹配。
//! 不相等时再按词法单元逐位比较，记录方法调用名、变量名、字面量与参数列表的
//! 替换候选；候选只用于诊断，不参与匹配判断。

use super::mapping::{Replacement, ReplacementType, StatementMapping};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// 参数重命名表：旧名称到新名称
pub type ParameterReplacements = BTreeMap<String, String>;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_]\w*\b").unwrap());

// 数字字面量连同后缀（`1n`、`2j`、`10u`）视为一个单元
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\d*\.?\d+\w*|[A-Za-z_]\w*|\S"#).unwrap()
});

static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(([^()]*)\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Identifier,
    Literal,
    Punctuation,
}

fn token_kind(token: &str) -> TokenKind {
    match token.chars().next() {
        Some('"' | '\'') => TokenKind::Literal,
        Some(c) if c.is_ascii_digit() || (c == '.' && token.len() > 1) => TokenKind::Literal,
        Some(c) if c.is_alphabetic() || c == '_' => TokenKind::Identifier,
        _ => TokenKind::Punctuation,
    }
}

/// 去掉名称前的非标识符字符（如 `...rest` 与 `*args`）
fn identifier_part(name: &str) -> &str {
    name.trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
}

/// 同时执行全部整词替换，返回结果与实际发生的替换（按首次出现顺序）
fn substitute_words<'t>(
    text: &str,
    table: &HashMap<&'t str, &'t str>,
) -> (String, Vec<(&'t str, &'t str)>) {
    let mut applied: Vec<(&str, &str)> = Vec::new();
    let result = IDENTIFIER.replace_all(text, |caps: &Captures| {
        let word = &caps[0];
        match table.get_key_value(word) {
            Some((&before, &after)) => {
                if !applied.iter().any(|(b, _)| *b == before) {
                    applied.push((before, after));
                }
                after.to_string()
            }
            None => word.to_string(),
        }
    });
    (result.into_owned(), applied)
}

/// 两条语句之间的映射尝试
#[derive(Debug)]
pub struct StatementMapper<'s> {
    statement1: &'s str,
    statement2: &'s str,
    /// 第一条语句应用参数重命名后的文本
    substituted: String,
    replacements: Vec<Replacement>,
}

impl<'s> StatementMapper<'s> {
    pub fn new(
        statement1: &'s str,
        statement2: &'s str,
        parameter_replacements: &ParameterReplacements,
    ) -> Self {
        let table: HashMap<&str, &str> = parameter_replacements
            .iter()
            .map(|(before, after)| (identifier_part(before), identifier_part(after)))
            .filter(|(before, after)| !before.is_empty() && before != after)
            .collect();
        let (substituted, applied) = substitute_words(statement1, &table);

        let mut mapper = Self {
            statement1,
            statement2,
            substituted,
            replacements: Vec::new(),
        };
        for (before, after) in applied {
            mapper.record(Replacement::new(before, after, ReplacementType::ParameterName));
        }
        if !mapper.matches() {
            mapper.find_candidates();
        }
        mapper
    }

    fn find_candidates(&mut self) {
        let substituted = self.substituted.clone();
        let tokens1: Vec<&str> = TOKEN.find_iter(&substituted).map(|m| m.as_str()).collect();
        let tokens2: Vec<&str> = TOKEN.find_iter(self.statement2).map(|m| m.as_str()).collect();
        if tokens1.len() == tokens2.len() {
            self.find_token_replacements(&tokens1, &tokens2);
        } else {
            self.find_argument_replacements(&substituted);
        }
    }

    /// 形状相同的两条语句：同一位置上的标识符或字面量不同即为候选替换
    fn find_token_replacements(&mut self, tokens1: &[&str], tokens2: &[&str]) {
        let mut candidates = Vec::new();
        for (index, (left, right)) in tokens1.iter().zip(tokens2).enumerate() {
            if left == right {
                continue;
            }
            let replacement_type = match (token_kind(left), token_kind(right)) {
                (TokenKind::Identifier, TokenKind::Identifier) => {
                    let is_call = |tokens: &[&str]| tokens.get(index + 1) == Some(&"(");
                    if is_call(tokens1) && is_call(tokens2) {
                        ReplacementType::MethodInvocation
                    } else {
                        ReplacementType::VariableName
                    }
                }
                (TokenKind::Literal, TokenKind::Literal) => ReplacementType::Literal,
                // 结构不同，不产生候选
                _ => return,
            };
            candidates.push(Replacement::new(*left, *right, replacement_type));
        }
        for candidate in candidates {
            self.record(candidate);
        }
    }

    /// 同名调用的参数列表不同
    fn find_argument_replacements(&mut self, substituted: &str) {
        let calls2: Vec<(&str, &str)> = CALL
            .captures_iter(self.statement2)
            .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
            .collect();
        let calls1: Vec<(String, String)> = CALL
            .captures_iter(substituted)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        for (name, arguments) in calls1 {
            if let Some((_, new_arguments)) = calls2
                .iter()
                .find(|(new_name, new_arguments)| *new_name == name && *new_arguments != arguments)
            {
                self.record(Replacement::new(
                    arguments,
                    *new_arguments,
                    ReplacementType::Argument,
                ));
            }
        }
    }

    fn record(&mut self, replacement: Replacement) {
        if !self.replacements.contains(&replacement) {
            self.replacements.push(replacement);
        }
    }

    /// 应用参数重命名后两条语句是否相同
    pub fn matches(&self) -> bool {
        self.substituted == self.statement2
    }

    /// 参数重命名记录，以及不匹配时发现的替换候选
    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// 语句匹配时生成映射
    pub fn create_mapping(&self) -> Option<StatementMapping> {
        if !self.matches() {
            return None;
        }
        let mut mapping = StatementMapping::new(self.statement1, self.statement2);
        for replacement in &self.replacements {
            mapping.add_replacement(replacement.clone());
        }
        Some(mapping)
    }
}
