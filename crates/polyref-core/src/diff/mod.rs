//! 模型差异分析
//!
//! 在两个代码模型之间匹配操作并检测重构：
//! 先按签名键精确匹配，再对剩余操作按名称相关性与操作体相似度做模糊匹配。
//! 每一对匹配的操作由一个 [`OperationBodyMapper`] 处理，
//! 重构按映射器创建顺序汇总。

pub mod body_mapper;
pub mod mapping;
pub mod parameter_mapper;
pub mod statement_mapper;

pub use body_mapper::{OperationBodyMapper, split_statements};
pub use mapping::{Replacement, ReplacementType, StatementMapping};
pub use parameter_mapper::ParameterMapper;
pub use statement_mapper::{ParameterReplacements, StatementMapper};

use crate::error::{PolyrefError, Result};
use crate::model::{CodeModel, Operation};
use crate::refactoring::Refactoring;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

/// 名称归一化时去除的动词前缀
const NAME_PREFIXES: &[&str] = &[
    "get",
    "set",
    "is",
    "has",
    "do",
    "make",
    "create",
    "build",
    "compute",
    "calculate",
    "find",
    "search",
    "fetch",
];

/// 名称归一化时去除的后缀
const NAME_SUFFIXES: &[&str] = &["Async", "Impl", "Internal", "Helper"];

static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?i)^(?:{})", NAME_PREFIXES.join("|"))).unwrap());

static SUFFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?i)(?:{})$", NAME_SUFFIXES.join("|"))).unwrap());

/// 差异分析配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// 模糊匹配与方法重命名所需的最低操作体相似度
    pub body_similarity_threshold: f64,
    /// 归一化名称之间允许的最大编辑距离
    pub max_name_edit_distance: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            body_similarity_threshold: 0.7,
            max_name_edit_distance: 2,
        }
    }
}

impl DiffConfig {
    pub fn with_body_similarity_threshold(mut self, threshold: f64) -> Self {
        self.body_similarity_threshold = threshold;
        self
    }

    pub fn with_max_name_edit_distance(mut self, distance: usize) -> Self {
        self.max_name_edit_distance = distance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.body_similarity_threshold) {
            return Err(PolyrefError::ConfigError(format!(
                "body similarity threshold must be within [0, 1], got {}",
                self.body_similarity_threshold
            )));
        }
        Ok(())
    }
}

/// 按插入顺序保存的签名键到操作的映射
///
/// 键重复时后插入的操作覆盖先前的值，但保留首次出现的位置。
struct OperationIndex<'a> {
    entries: Vec<(String, &'a Operation)>,
    positions: HashMap<String, usize>,
}

impl<'a> OperationIndex<'a> {
    fn build(model: &'a CodeModel, key_of: impl Fn(&Operation) -> String) -> Self {
        let mut index = Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        };
        for operation in model.all_operations() {
            let key = key_of(operation);
            match index.positions.get(&key) {
                Some(&position) => index.entries[position].1 = operation,
                None => {
                    index.positions.insert(key.clone(), index.entries.len());
                    index.entries.push((key, operation));
                }
            }
        }
        index
    }

    fn get(&self, key: &str) -> Option<&'a Operation> {
        self.positions.get(key).map(|&position| self.entries[position].1)
    }

    fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &'a Operation)> + '_ {
        self.entries
            .iter()
            .map(|(key, operation)| (key.as_str(), *operation))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// 两个代码模型之间的差异分析
pub struct ModelDiff<'a> {
    old_model: &'a CodeModel,
    new_model: &'a CodeModel,
    config: DiffConfig,
}

impl<'a> ModelDiff<'a> {
    pub fn new(old_model: &'a CodeModel, new_model: &'a CodeModel) -> Self {
        Self::with_config(old_model, new_model, DiffConfig::default())
    }

    pub fn with_config(old_model: &'a CodeModel, new_model: &'a CodeModel, config: DiffConfig) -> Self {
        Self {
            old_model,
            new_model,
            config,
        }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// 操作的签名键：`[类名.]名称(参数类型,...)`，Python 模型省略参数类型
    pub fn operation_key(&self, operation: &Operation) -> String {
        let mut key = operation.qualified_name();
        key.push('(');
        if !self.old_model.is_python() {
            let types: Vec<&str> = operation
                .parameters
                .iter()
                .map(|parameter| parameter.parameter_type.name.as_str())
                .collect();
            key.push_str(&types.join(","));
        }
        key.push(')');
        key
    }

    /// 检测两个模型之间的重构
    pub fn detect_refactorings(&self) -> Vec<Refactoring<'a>> {
        let refactorings: Vec<Refactoring<'a>> = self
            .match_operations()
            .into_iter()
            .flat_map(OperationBodyMapper::into_refactorings)
            .collect();
        info!("检测到 {} 个重构", refactorings.len());
        refactorings
    }

    /// 匹配两个模型中的操作，按创建顺序返回每一对的映射器
    pub fn match_operations(&self) -> Vec<OperationBodyMapper<'a>> {
        let old_index = OperationIndex::build(self.old_model, |op| self.operation_key(op));
        let new_index = OperationIndex::build(self.new_model, |op| self.operation_key(op));
        info!(
            "开始匹配操作: 旧版本 {} 个, 新版本 {} 个",
            old_index.len(),
            new_index.len()
        );

        let mut mappers = Vec::new();

        // 精确匹配
        for (key, old_operation) in old_index.iter() {
            if let Some(new_operation) = new_index.get(key) {
                debug!("精确匹配: {key}");
                mappers.push(OperationBodyMapper::new(
                    old_operation,
                    new_operation,
                    &self.config,
                ));
            }
        }
        let exact_matches = mappers.len();

        // 模糊匹配：每个旧操作取得分最高的候选，新操作一旦匹配即不再参与
        let mut unmatched_new: Vec<(&str, &'a Operation)> = new_index
            .iter()
            .filter(|(key, _)| !old_index.contains(key))
            .collect();
        for (old_key, old_operation) in old_index.iter() {
            if new_index.contains(old_key) {
                continue;
            }

            let mut best: Option<(usize, OperationBodyMapper<'a>)> = None;
            let mut max_similarity = 0.0;
            for (position, &(_, new_operation)) in unmatched_new.iter().enumerate() {
                if !self.are_names_related(&old_operation.name, &new_operation.name) {
                    continue;
                }
                let mapper = OperationBodyMapper::new(old_operation, new_operation, &self.config);
                let similarity = mapper.body_comparator_score();
                if similarity > max_similarity
                    && similarity >= self.config.body_similarity_threshold
                {
                    max_similarity = similarity;
                    best = Some((position, mapper));
                }
            }

            if let Some((position, mapper)) = best {
                let (new_key, _) = unmatched_new.remove(position);
                debug!("模糊匹配: {old_key} -> {new_key} (相似度 {max_similarity:.2})");
                mappers.push(mapper);
            }
        }

        info!(
            "操作匹配完成: 精确 {exact_matches} 对, 模糊 {} 对",
            mappers.len() - exact_matches
        );
        mappers
    }

    /// 两个名称是否相关：相等、归一化后相等、互相包含，或归一化编辑距离足够小
    pub fn are_names_related(&self, old_name: &str, new_name: &str) -> bool {
        if old_name == new_name {
            return true;
        }
        let old_normalized = normalize_name(old_name);
        let new_normalized = normalize_name(new_name);
        old_normalized == new_normalized
            || old_normalized.contains(&new_normalized)
            || new_normalized.contains(&old_normalized)
            || levenshtein(&old_normalized, &new_normalized) <= self.config.max_name_edit_distance
    }
}

/// 使用默认配置检测两个模型之间的重构
pub fn detect_refactorings<'a>(
    old_model: &'a CodeModel,
    new_model: &'a CodeModel,
) -> Vec<Refactoring<'a>> {
    ModelDiff::new(old_model, new_model).detect_refactorings()
}

/// 去除常见动词前缀与后缀并转为小写
pub fn normalize_name(name: &str) -> String {
    let stripped = PREFIX_PATTERN.replace(name, "");
    SUFFIX_PATTERN.replace(&stripped, "").to_lowercase()
}

/// 字符级编辑距离
pub fn levenshtein(left: &str, right: &str) -> usize {
    let right: Vec<char> = right.chars().collect();
    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0; right.len() + 1];

    for (i, left_char) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != *right_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, CodeElementType, Location, Parameter, Type};
    use crate::parser::{Point, SupportedLanguage};
    use crate::refactoring::RefactoringType;
    use pretty_assertions::assert_eq;

    fn location(file: &str, row: usize) -> Location {
        Location::new(file, Point::new(row, 0), Point::new(row, 1), CodeElementType::MethodDeclaration)
            .unwrap()
    }

    fn operation(file: &str, name: &str, params: &[(&str, &str)], body: &str) -> Operation {
        let mut operation = Operation::new(name, location(file, 0));
        operation.parameters = params
            .iter()
            .map(|(name, type_name)| Parameter::new(*name, Type::new(*type_name), location(file, 0)))
            .collect();
        operation.body = Some(body.to_string());
        operation
    }

    fn model(language: SupportedLanguage, operations: Vec<Operation>) -> CodeModel {
        let mut model = CodeModel::new(Some(language));
        for operation in operations {
            model.add_operation(operation);
        }
        model
    }

    fn kinds(refactorings: &[Refactoring<'_>]) -> Vec<RefactoringType> {
        refactorings.iter().map(Refactoring::refactoring_type).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("getUserName"), "username");
        assert_eq!(normalize_name("loadAsync"), "load");
        assert_eq!(normalize_name("calculate_sum"), "_sum");
        assert_eq!(normalize_name("calc_sum"), "calc_sum");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("日本", "日本語"), 1);
    }

    #[test]
    fn test_names_related() {
        let old = CodeModel::new(Some(SupportedLanguage::Python));
        let diff = ModelDiff::new(&old, &old);
        assert!(diff.are_names_related("calc_sum", "calculate_sum"));
        assert!(diff.are_names_related("getUser", "fetchUser"));
        assert!(diff.are_names_related("parse", "parser"));
        assert!(!diff.are_names_related("open", "shutdown"));
    }

    #[test]
    fn test_operation_key_depends_on_language() {
        let mut method = operation("a.cpp", "area", &[("w", "int"), ("h", "double")], "{}");
        method.class_name = Some("Rect".to_string());

        let cpp = CodeModel::new(Some(SupportedLanguage::Cpp));
        assert_eq!(ModelDiff::new(&cpp, &cpp).operation_key(&method), "Rect.area(int,double)");

        let python = CodeModel::new(Some(SupportedLanguage::Python));
        assert_eq!(ModelDiff::new(&python, &python).operation_key(&method), "Rect.area()");
    }

    #[test]
    fn test_identical_models_have_no_refactorings() {
        let build = || {
            let mut model = model(
                SupportedLanguage::Cpp,
                vec![operation("m.cpp", "add", &[("a", "int"), ("b", "int")], "{ return a + b; }")],
            );
            let mut class = Class::new("", "Box", location("m.cpp", 3));
            class.add_operation(operation("m.cpp", "size", &[], "{ return n; }"));
            model.add_class(class);
            model
        };
        let (old, new) = (build(), build());
        assert!(detect_refactorings(&old, &new).is_empty());
        assert_eq!(ModelDiff::new(&old, &new).match_operations().len(), 2);
    }

    #[test]
    fn test_fuzzy_match_reports_rename() {
        let old = model(
            SupportedLanguage::Python,
            vec![operation("m.py", "calc_sum", &[("x", "object"), ("y", "object")], "return x+y")],
        );
        let new = model(
            SupportedLanguage::Python,
            vec![operation("m.py", "calculate_sum", &[("x", "object"), ("y", "object")], "return x+y")],
        );
        let refactorings = detect_refactorings(&old, &new);
        assert_eq!(kinds(&refactorings), vec![RefactoringType::RenameMethod]);
        assert_eq!(
            refactorings[0].description(),
            "Function 'calc_sum' renamed to 'calculate_sum'"
        );
    }

    #[test]
    fn test_fuzzy_match_keeps_best_candidate_and_claims_it() {
        let old = model(
            SupportedLanguage::Python,
            vec![
                operation("m.py", "load", &[], "a = read()\nreturn a"),
                operation("m.py", "loads", &[], "a = read()\nreturn a"),
            ],
        );
        let new = model(
            SupportedLanguage::Python,
            vec![
                operation("m.py", "load_all", &[], "a = read()\nfilter(a)\nreturn a"),
                operation("m.py", "load_data", &[], "a = read()\nreturn a"),
            ],
        );
        let mappers = ModelDiff::new(&old, &new).match_operations();
        let pairs: Vec<(&str, &str)> = mappers
            .iter()
            .map(|m| (m.operation1().name.as_str(), m.operation2().name.as_str()))
            .collect();
        // load_all 的相似度只有 2/3，load 取得分 1.0 的 load_data；
        // loads 与剩下的 load_all 名称不相关
        assert_eq!(pairs, vec![("load", "load_data")]);
    }

    #[test]
    fn test_missing_bodies_never_fuzzy_match() {
        let mut old_op = operation("m.cpp", "start", &[], "");
        old_op.body = None;
        let mut new_op = operation("m.cpp", "starts", &[], "");
        new_op.body = None;
        let old = model(SupportedLanguage::Cpp, vec![old_op]);
        let new = model(SupportedLanguage::Cpp, vec![new_op]);
        assert!(ModelDiff::new(&old, &new).match_operations().is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(DiffConfig::default().validate().is_ok());
        let invalid = DiffConfig::default().with_body_similarity_threshold(1.5);
        assert!(matches!(invalid.validate(), Err(PolyrefError::ConfigError(_))));
    }
}
