//! 语句映射与文本替换记录

use serde::Serialize;
use std::fmt;

/// 替换类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReplacementType {
    ParameterName,
    VariableName,
    MethodInvocation,
    Literal,
    Argument,
}

impl ReplacementType {
    pub fn description(&self) -> &'static str {
        match self {
            ReplacementType::ParameterName => "Parameter name replacement",
            ReplacementType::VariableName => "Variable name replacement",
            ReplacementType::MethodInvocation => "Method invocation replacement",
            ReplacementType::Literal => "Literal value replacement",
            ReplacementType::Argument => "Method argument replacement",
        }
    }
}

impl fmt::Display for ReplacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// 对齐两条语句时发现的一次文本替换
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Replacement {
    pub before: String,
    pub after: String,
    pub replacement_type: ReplacementType,
}

impl Replacement {
    pub fn new(
        before: impl Into<String>,
        after: impl Into<String>,
        replacement_type: ReplacementType,
    ) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
            replacement_type,
        }
    }
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.replacement_type, self.before, self.after)
    }
}

/// 两条语句之间的映射
///
/// 相等性只比较两侧语句文本。
#[derive(Debug, Clone, Serialize)]
pub struct StatementMapping {
    statement1: String,
    statement2: String,
    replacements: Vec<Replacement>,
}

impl StatementMapping {
    pub fn new(statement1: impl Into<String>, statement2: impl Into<String>) -> Self {
        Self {
            statement1: statement1.into(),
            statement2: statement2.into(),
            replacements: Vec::new(),
        }
    }

    /// 添加替换，重复的替换被忽略
    pub fn add_replacement(&mut self, replacement: Replacement) {
        if !self.replacements.contains(&replacement) {
            self.replacements.push(replacement);
        }
    }

    pub fn statement1(&self) -> &str {
        &self.statement1
    }

    pub fn statement2(&self) -> &str {
        &self.statement2
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// 两侧语句是否完全相同（无需任何替换）
    pub fn is_identical(&self) -> bool {
        self.statement1 == self.statement2
    }
}

impl PartialEq for StatementMapping {
    fn eq(&self, other: &Self) -> bool {
        self.statement1 == other.statement1 && self.statement2 == other.statement2
    }
}

impl Eq for StatementMapping {}

impl fmt::Display for StatementMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ⇒ {}", self.statement1, self.statement2)?;
        if !self.replacements.is_empty() {
            let replacements: Vec<String> =
                self.replacements.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", replacements.join("; "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replacements_are_deduplicated() {
        let mut mapping = StatementMapping::new("return x", "return n");
        mapping.add_replacement(Replacement::new("x", "n", ReplacementType::ParameterName));
        mapping.add_replacement(Replacement::new("x", "n", ReplacementType::ParameterName));
        mapping.add_replacement(Replacement::new("x", "n", ReplacementType::VariableName));

        assert_eq!(mapping.replacements().len(), 2);
        assert!(!mapping.is_identical());
        assert_eq!(
            mapping.to_string(),
            "return x ⇒ return n [Parameter name replacement: x → n; Variable name replacement: x → n]"
        );
    }

    #[test]
    fn test_equality_ignores_replacements() {
        let mut left = StatementMapping::new("a", "b");
        left.add_replacement(Replacement::new("a", "b", ReplacementType::VariableName));
        let right = StatementMapping::new("a", "b");
        assert_eq!(left, right);
    }
}
