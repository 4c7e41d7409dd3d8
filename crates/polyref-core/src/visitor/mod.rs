//! AST 访问器
//!
//! 将通用语法树翻译为统一代码模型。每种语言一个访问器，
//! 遍历状态（当前类、作用域、可见性、命名空间）保存在显式传递的
//! [`TraversalContext`] 中，访问器本身只持有语法树与正在构建的单文件模型。

pub mod cpp;
pub mod javascript;
pub mod python;

pub use cpp::CppVisitor;
pub use javascript::JavaScriptVisitor;
pub use python::PythonVisitor;

use crate::error::Result;
use crate::model::{Class, CodeElementType, CodeModel, Comment, CommentKind, Location, Operation, Visibility};
use crate::parser::{GenericTree, NodeId, SupportedLanguage};

/// 词法作用域
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Class(String),
    Function(String),
}

/// 遍历上下文
///
/// 同一时刻最多只有一个“当前类”；进入嵌套类时用 [`enter_class`](Self::enter_class)
/// 换入新类并保留外层类，处理完后用 [`leave_class`](Self::leave_class) 换回。
#[derive(Debug, Clone, Default)]
pub struct TraversalContext {
    pub current_class: Option<Class>,
    pub scopes: Vec<Scope>,
    /// C++ 当前成员可见性
    pub visibility: Visibility,
    /// C++ 当前命名空间栈
    pub namespaces: Vec<String>,
    /// 是否位于 C++ 模板声明内
    pub in_template: bool,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 换入新的当前类，返回外层类
    pub fn enter_class(&mut self, class: Class) -> Option<Class> {
        self.scopes.push(Scope::Class(class.name.clone()));
        self.current_class.replace(class)
    }

    /// 恢复外层类，返回处理完的类
    pub fn leave_class(&mut self, outer: Option<Class>) -> Option<Class> {
        if matches!(self.scopes.last(), Some(Scope::Class(_))) {
            self.scopes.pop();
        }
        std::mem::replace(&mut self.current_class, outer)
    }

    pub fn enter_function(&mut self, name: &str) {
        self.scopes.push(Scope::Function(name.to_string()));
    }

    pub fn leave_function(&mut self) {
        if matches!(self.scopes.last(), Some(Scope::Function(_))) {
            self.scopes.pop();
        }
    }

    pub fn in_class(&self) -> bool {
        self.current_class.is_some()
    }

    /// 最内层作用域是否为函数体
    pub fn in_function(&self) -> bool {
        matches!(self.scopes.last(), Some(Scope::Function(_)))
    }

    /// 最内层作用域是否直接是类体
    pub fn in_class_body(&self) -> bool {
        matches!(self.scopes.last(), Some(Scope::Class(_)))
    }

    pub fn current_class_name(&self) -> Option<&str> {
        self.current_class.as_ref().map(|class| class.name.as_str())
    }

    /// 以 `::` 连接的当前命名空间
    pub fn current_namespace(&self) -> String {
        self.namespaces.join("::")
    }
}

/// 语法树访问器
///
/// `visit` 按节点类型分派；`process_*` 钩子负责构建实体。
/// 缺少必需子节点时钩子返回 `Ok(())` 并跳过该声明，
/// 只有实体构造约束错误才会向上传播。
pub trait AstVisitor<'t> {
    fn tree(&self) -> &'t GenericTree;

    fn file_path(&self) -> &str;

    fn model(&mut self) -> &mut CodeModel;

    fn visit(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    fn process_module(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    fn process_class(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    fn process_method(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    fn process_field(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    fn process_import(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()>;

    /// 依次访问所有子节点
    fn visit_children(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree();
        for &child in tree.children(node) {
            self.visit(child, ctx)?;
        }
        Ok(())
    }

    fn location(&self, node: NodeId, element_type: CodeElementType) -> Result<Location> {
        Location::from_node(self.tree(), node, self.file_path(), element_type)
    }

    /// 记录文件中的全部注释节点
    fn record_comments(&mut self, root: NodeId) -> Result<()> {
        let tree = self.tree();
        let file_path = self.file_path().to_string();
        for node in tree.descendants_of_kind(root, "comment") {
            let comment = self.comment(node)?;
            self.model().add_comment(&file_path, comment);
        }
        Ok(())
    }

    fn comment(&self, node: NodeId) -> Result<Comment> {
        let text = self.tree().text(node);
        let kind = Comment::classify(text);
        let element_type = match kind {
            CommentKind::Doc => CodeElementType::DocComment,
            _ => CodeElementType::Comment,
        };
        Ok(Comment::new(text, self.location(node, element_type)?, kind))
    }

    /// 当前类存在时加入当前类，否则作为独立操作加入模型
    fn record_operation(&mut self, operation: Operation, ctx: &mut TraversalContext) {
        match ctx.current_class.as_mut() {
            Some(class) => class.add_operation(operation),
            None => self.model().add_operation(operation),
        }
    }
}

/// 使用对应语言的访问器为单个文件构建代码模型
pub fn build_model(
    language: SupportedLanguage,
    tree: &GenericTree,
    file_path: &str,
) -> Result<CodeModel> {
    match language {
        SupportedLanguage::Python => PythonVisitor::new(tree, file_path).build(),
        SupportedLanguage::JavaScript => JavaScriptVisitor::new(tree, file_path).build(),
        SupportedLanguage::Cpp => CppVisitor::new(tree, file_path).build(),
    }
}

/// 去掉路径扩展名
pub(crate) fn strip_extension(file_path: &str) -> &str {
    match file_path.rsplit_once('.') {
        Some((stem, extension)) if !extension.contains('/') && !stem.is_empty() => stem,
        _ => file_path,
    }
}
