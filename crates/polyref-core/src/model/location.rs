//! 源码位置信息

use crate::error::{PolyrefError, Result};
use crate::parser::{GenericTree, NodeId, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 位置所描述的代码元素种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeElementType {
    Module,
    ClassDeclaration,
    MethodDeclaration,
    FieldDeclaration,
    ParameterDeclaration,
    ImportDeclaration,
    AnnotationTypeDeclaration,
    Comment,
    DocComment,
}

impl CodeElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeElementType::Module => "MODULE",
            CodeElementType::ClassDeclaration => "CLASS_DECLARATION",
            CodeElementType::MethodDeclaration => "METHOD_DECLARATION",
            CodeElementType::FieldDeclaration => "FIELD_DECLARATION",
            CodeElementType::ParameterDeclaration => "PARAMETER_DECLARATION",
            CodeElementType::ImportDeclaration => "IMPORT_DECLARATION",
            CodeElementType::AnnotationTypeDeclaration => "ANNOTATION_TYPE_DECLARATION",
            CodeElementType::Comment => "COMMENT",
            CodeElementType::DocComment => "DOC_COMMENT",
        }
    }
}

impl fmt::Display for CodeElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 不可变的文件区间
///
/// 只能通过 [`Location::new`] 构造，保证文件路径非空且起点不晚于终点。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    file_path: String,
    start: Point,
    end: Point,
    element_type: CodeElementType,
}

impl Location {
    pub fn new(
        file_path: impl Into<String>,
        start: Point,
        end: Point,
        element_type: CodeElementType,
    ) -> Result<Self> {
        let file_path = file_path.into();
        if file_path.is_empty() {
            return Err(PolyrefError::InvalidLocation(
                "file path must not be empty".to_string(),
            ));
        }
        if end < start {
            return Err(PolyrefError::InvalidLocation(format!(
                "{file_path}: end {end} precedes start {start}"
            )));
        }
        Ok(Self {
            file_path,
            start,
            end,
            element_type,
        })
    }

    /// 根据语法树节点的区间创建位置
    pub fn from_node(
        tree: &GenericTree,
        node: NodeId,
        file_path: &str,
        element_type: CodeElementType,
    ) -> Result<Self> {
        let syntax = tree.node(node);
        Self::new(file_path, syntax.start_point, syntax.end_point, element_type)
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn element_type(&self) -> CodeElementType {
        self.element_type
    }

    /// 点是否落在区间内（两端包含）
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    /// 是否完整包含另一个位置，跨文件时总为 false
    pub fn contains(&self, other: &Location) -> bool {
        self.file_path == other.file_path
            && self.contains_point(other.start)
            && self.contains_point(other.end)
    }

    pub fn overlaps(&self, other: &Location) -> bool {
        self.file_path == other.file_path
            && (self.contains_point(other.start)
                || self.contains_point(other.end)
                || other.contains_point(self.start)
                || other.contains_point(self.end))
    }

    /// 按起点排序；不同文件时按路径字典序比较
    pub fn is_before(&self, other: &Location) -> bool {
        if self.file_path != other.file_path {
            return self.file_path < other.file_path;
        }
        self.start < other.start
    }

    pub fn is_on_same_line(&self, other: &Location) -> bool {
        self.file_path == other.file_path && self.start.row == other.start.row
    }

    /// 跨越的行数
    pub fn row_length(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    /// 单行区间的列宽
    pub fn column_length(&self) -> Result<usize> {
        if self.start.row != self.end.row {
            return Err(PolyrefError::InvalidLocation(format!(
                "cannot take the column length of multi-line location {self}"
            )));
        }
        Ok(self.end.column - self.start.column)
    }

    /// 合并为覆盖两个区间的新位置
    pub fn merge(&self, other: &Location) -> Result<Location> {
        if self.file_path != other.file_path {
            return Err(PolyrefError::InvalidLocation(format!(
                "cannot merge locations from {} and {}",
                self.file_path, other.file_path
            )));
        }
        Ok(Location {
            file_path: self.file_path.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            element_type: self.element_type,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{} [{}]",
            self.file_path, self.start, self.end, self.element_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(file: &str, start: (usize, usize), end: (usize, usize)) -> Location {
        Location::new(
            file,
            Point::new(start.0, start.1),
            Point::new(end.0, end.1),
            CodeElementType::MethodDeclaration,
        )
        .unwrap()
    }

    #[test]
    fn test_construction_invariants() {
        let empty = Location::new(
            "",
            Point::new(0, 0),
            Point::new(0, 1),
            CodeElementType::Comment,
        );
        assert!(matches!(empty, Err(PolyrefError::InvalidLocation(_))));

        let reversed = Location::new(
            "a.py",
            Point::new(3, 0),
            Point::new(2, 9),
            CodeElementType::Comment,
        );
        assert!(reversed.is_err());
        assert!(reversed.unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_contains_and_overlaps_are_file_local() {
        let outer = loc("a.py", (1, 0), (10, 0));
        let inner = loc("a.py", (2, 4), (3, 8));
        let elsewhere = loc("b.py", (2, 4), (3, 8));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&elsewhere));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(!outer.overlaps(&elsewhere));

        let tail = loc("a.py", (10, 0), (12, 0));
        assert!(outer.overlaps(&tail));
        let after = loc("a.py", (11, 0), (12, 0));
        assert!(!outer.overlaps(&after));
    }

    #[test]
    fn test_ordering() {
        let first = loc("a.py", (1, 0), (1, 5));
        let second = loc("a.py", (1, 6), (1, 9));
        let other_file = loc("0.py", (9, 0), (9, 1));

        assert!(first.is_before(&second));
        assert!(!second.is_before(&first));
        assert!(other_file.is_before(&first));
        assert!(first.is_on_same_line(&second));
    }

    #[test]
    fn test_lengths_and_merge() {
        let single = loc("a.py", (4, 2), (4, 10));
        let multi = loc("a.py", (1, 0), (3, 1));

        assert_eq!(single.column_length().unwrap(), 8);
        assert!(multi.column_length().is_err());
        assert_eq!(multi.row_length(), 3);

        let merged = single.merge(&multi).unwrap();
        assert_eq!(merged.start(), Point::new(1, 0));
        assert_eq!(merged.end(), Point::new(4, 10));
        assert!(single.merge(&loc("b.py", (0, 0), (0, 1))).is_err());
    }

    #[test]
    fn test_display_is_one_based() {
        let location = loc("src/a.py", (0, 0), (2, 4));
        assert_eq!(location.to_string(), "src/a.py:1:1-3:5 [METHOD_DECLARATION]");
    }
}
