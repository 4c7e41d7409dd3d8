//! 通用语法树
//!
//! 将 Tree-sitter 的具体语法树转换为基于索引的节点数组（arena），
//! 父节点以可选索引表示，避免引用环。访问器只依赖这里的只读接口。

use crate::error::{PolyrefError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 源码中的行列位置（从 0 开始）
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// 节点在 arena 中的索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 语法树节点
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: &'static str,
    /// 节点在父节点中的字段名
    pub field_name: Option<&'static str>,
    /// 是否为具名节点（匿名节点是关键字、标点等 token）
    pub named: bool,
    pub start_point: Point,
    pub end_point: Point,
    pub start_byte: usize,
    pub end_byte: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// 通用语法树
#[derive(Debug, Clone)]
pub struct GenericTree {
    source: String,
    nodes: Vec<SyntaxNode>,
}

impl GenericTree {
    /// 从 Tree-sitter 语法树构建
    pub fn from_tree_sitter(tree: &tree_sitter::Tree, source: &str) -> Self {
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut parents: Vec<NodeId> = Vec::new();
        let mut cursor = tree.walk();

        loop {
            let node = cursor.node();
            let id = NodeId(nodes.len());
            let parent = parents.last().copied();

            nodes.push(SyntaxNode {
                kind: node.kind(),
                field_name: cursor.field_name(),
                named: node.is_named(),
                start_point: node.start_position().into(),
                end_point: node.end_position().into(),
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
                parent,
                children: Vec::new(),
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }

            if cursor.goto_first_child() {
                parents.push(id);
                continue;
            }

            // 回溯到下一个兄弟节点
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Self {
                        source: source.to_string(),
                        nodes,
                    };
                }
                parents.pop();
            }
        }
    }

    /// 创建手工构建语法树的构建器
    pub fn builder(source: impl Into<String>) -> TreeBuilder {
        TreeBuilder {
            source: source.into(),
            nodes: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.node(id).kind
    }

    pub fn field_name(&self, id: NodeId) -> Option<&'static str> {
        self.node(id).field_name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn named_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.node(*child).named)
    }

    /// 获取节点的源码文本
    pub fn text(&self, id: NodeId) -> &str {
        let node = self.node(id);
        self.source.get(node.start_byte..node.end_byte).unwrap_or("")
    }

    /// 获取第一个指定类型的子节点的文本
    pub fn child_text(&self, id: NodeId, kind: &str) -> Option<&str> {
        self.child_by_kind(id, kind).map(|child| self.text(child))
    }

    pub fn has_kind(&self, id: NodeId, kind: &str) -> bool {
        self.kind(id) == kind
    }

    pub fn child_by_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    /// 查找类型属于给定集合的第一个子节点
    pub fn child_by_kinds(&self, id: NodeId, kinds: &[&str]) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| kinds.contains(&self.kind(*child)))
    }

    pub fn children_by_kind(&self, id: NodeId, kind: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == kind)
            .collect()
    }

    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.field_name(*child) == Some(field))
    }

    pub fn children_by_field(&self, id: NodeId, field: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.field_name(*child) == Some(field))
            .collect()
    }

    /// 深度优先（前序）查找第一个指定类型的节点，包含节点自身
    pub fn first_descendant_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.kind(current) == kind {
                return Some(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        None
    }

    /// 前序收集所有指定类型的后代节点，包含节点自身
    pub fn descendants_of_kind(&self, id: NodeId, kind: &str) -> Vec<NodeId> {
        let mut results = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.kind(current) == kind {
                results.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        results
    }

    /// 同 [`Self::descendants_of_kind`]，但不进入 `barriers` 中类型的子树（起始节点除外）
    pub fn descendants_of_kind_within(&self, id: NodeId, kind: &str, barriers: &[&str]) -> Vec<NodeId> {
        let mut results = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let current_kind = self.kind(current);
            if current != id && barriers.contains(&current_kind) {
                continue;
            }
            if current_kind == kind {
                results.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        results
    }

    /// 从父节点到根节点依次返回祖先
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }
}

/// 手工构建 [`GenericTree`] 的构建器
///
/// 第一个加入的节点为根节点，位置信息由字节偏移在源码中推算。
pub struct TreeBuilder {
    source: String,
    nodes: Vec<SyntaxNode>,
}

impl TreeBuilder {
    /// 添加节点并返回其索引
    pub fn node(
        &mut self,
        parent: Option<NodeId>,
        kind: &'static str,
        field_name: Option<&'static str>,
        byte_range: std::ops::Range<usize>,
    ) -> Result<NodeId> {
        if byte_range.start > byte_range.end || byte_range.end > self.source.len() {
            return Err(PolyrefError::ParseError(format!(
                "Node range {byte_range:?} is outside of the source ({} bytes)",
                self.source.len()
            )));
        }
        if let Some(parent) = parent {
            if parent.0 >= self.nodes.len() {
                return Err(PolyrefError::ParseError(format!(
                    "Unknown parent node {}",
                    parent.0
                )));
            }
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(SyntaxNode {
            kind,
            field_name,
            named: true,
            start_point: self.point_at(byte_range.start),
            end_point: self.point_at(byte_range.end),
            start_byte: byte_range.start,
            end_byte: byte_range.end,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        Ok(id)
    }

    pub fn build(self) -> Result<GenericTree> {
        if self.nodes.is_empty() {
            return Err(PolyrefError::ParseError(
                "A syntax tree needs at least a root node".to_string(),
            ));
        }
        Ok(GenericTree {
            source: self.source,
            nodes: self.nodes,
        })
    }

    fn point_at(&self, byte: usize) -> Point {
        let prefix = &self.source.as_bytes()[..byte];
        let row = prefix.iter().filter(|b| **b == b'\n').count();
        let line_start = prefix
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |pos| pos + 1);
        Point::new(row, byte - line_start)
    }
}
