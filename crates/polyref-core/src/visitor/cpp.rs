//! C++ 访问器
//!
//! 处理类与结构体、命名空间、模板、成员函数声明与定义、字段、
//! 类外静态成员初始化和 `#include`。类内成员的可见性随 `access_specifier` 变化。

use super::{AstVisitor, TraversalContext, strip_extension};
use crate::error::Result;
use crate::model::{
    Attribute, Class, CodeElementType, CodeModel, Import, ImportKind, Operation, Parameter,
    StaticInitializer, Type, Visibility,
};
use crate::parser::{GenericTree, NodeId, SupportedLanguage};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// 纯虚函数声明结尾：`) [const] [noexcept] [override] = 0;`
static PURE_VIRTUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\)\s*(const\s*)?(noexcept\s*)?(override\s*)?=\s*0\s*;?\s*$").unwrap()
});

const COLLECTION_TYPES: &[&str] = &["vector", "list", "deque", "set", "unordered_set", "array"];
const MAP_TYPES: &[&str] = &["map", "unordered_map", "multimap"];

/// 访问器关心的 C++ 语法节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CppNode {
    TranslationUnit,
    Namespace,
    ClassSpecifier,
    StructSpecifier,
    FunctionDefinition,
    Declaration,
    FieldDeclaration,
    AccessSpecifier,
    Include,
    Template,
    Other,
}

impl CppNode {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "translation_unit" => CppNode::TranslationUnit,
            "namespace_definition" => CppNode::Namespace,
            "class_specifier" => CppNode::ClassSpecifier,
            "struct_specifier" => CppNode::StructSpecifier,
            "function_definition" => CppNode::FunctionDefinition,
            "declaration" => CppNode::Declaration,
            "field_declaration" => CppNode::FieldDeclaration,
            "access_specifier" => CppNode::AccessSpecifier,
            "preproc_include" => CppNode::Include,
            "template_declaration" => CppNode::Template,
            _ => CppNode::Other,
        }
    }
}

/// C++ 访问器
pub struct CppVisitor<'t> {
    tree: &'t GenericTree,
    file_path: String,
    module_path: String,
    model: CodeModel,
}

impl<'t> CppVisitor<'t> {
    pub fn new(tree: &'t GenericTree, file_path: &str) -> Self {
        let mut model = CodeModel::new(Some(SupportedLanguage::Cpp));
        model.add_source(file_path, tree.source());
        Self {
            tree,
            file_path: file_path.to_string(),
            module_path: strip_extension(file_path).replace(['/', '\\'], "::"),
            model,
        }
    }

    pub fn build(mut self) -> Result<CodeModel> {
        let mut ctx = TraversalContext::new();
        self.process_module(self.tree.root(), &mut ctx)?;
        self.model.link_out_of_class_members();
        debug!(
            "C++ 文件 {} 提取了 {} 个类和 {} 个独立函数",
            self.file_path,
            self.model.number_of_classes(),
            self.model.operations().len()
        );
        Ok(self.model)
    }

    /// 模块路径与当前命名空间组成的包名
    fn package_name(&self, ctx: &TraversalContext) -> String {
        let namespace = ctx.current_namespace();
        if namespace.is_empty() {
            self.module_path.clone()
        } else {
            format!("{}::{namespace}", self.module_path)
        }
    }

    fn process_namespace(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(body) = tree.child_by_field(node, "body") else {
            return Ok(());
        };
        let name = tree.child_by_field(node, "name").map(|n| tree.text(n));
        if let Some(name) = name {
            ctx.namespaces.push(name.to_string());
        }
        let visited = self.visit_children(body, ctx);
        if name.is_some() {
            ctx.namespaces.pop();
        }
        visited
    }

    fn process_template(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let saved = std::mem::replace(&mut ctx.in_template, true);
        let visited = self.visit_children(node, ctx);
        ctx.in_template = saved;
        visited
    }

    /// 命名空间级或类体内的 `declaration`：函数原型、类外静态成员初始化或其他声明
    fn process_declaration(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        for declarator in tree.children_by_field(node, "declarator") {
            if tree.kind(declarator) != "init_declarator" {
                if let Some(function) = tree.first_descendant_of_kind(declarator, "function_declarator") {
                    if let Some(operation) = self.operation(node, function, ctx)? {
                        self.record_operation(operation, ctx);
                    }
                    continue;
                }
            }
            if !ctx.in_class() && tree.kind(declarator) == "init_declarator" {
                self.process_static_initializer(declarator);
            }
        }
        self.visit_children(node, ctx)
    }

    /// `int Counter::count = 0;` 挂接到已记录的类属性上，类尚未出现时延迟处理
    fn process_static_initializer(&mut self, init_declarator: NodeId) {
        let tree = self.tree;
        let (Some(target), Some(value)) = (
            tree.child_by_field(init_declarator, "declarator"),
            tree.child_by_field(init_declarator, "value"),
        ) else {
            return;
        };
        if tree.kind(target) != "qualified_identifier" {
            return;
        }
        let Some((scope, attribute_name)) = tree.text(target).rsplit_once("::") else {
            return;
        };
        let class_name = scope.rsplit("::").next().unwrap_or(scope);
        let value = tree.text(value).trim_end_matches(';').trim().to_string();

        let attribute = self
            .model
            .class_mut(class_name)
            .and_then(|class| class.attribute_mut(attribute_name.trim()));
        match attribute {
            Some(attribute) => attribute.initial_value = Some(value),
            None => self.model.defer_initializer(StaticInitializer {
                class_name: class_name.to_string(),
                attribute_name: attribute_name.trim().to_string(),
                value,
            }),
        }
    }

    /// 根据函数声明符构建操作；缺少名称时返回 `None`
    ///
    /// `node` 是包含声明符的外层节点（函数定义、字段声明或声明），
    /// 修饰符从其声明符之前的子节点中读取。
    fn operation(
        &self,
        node: NodeId,
        function: NodeId,
        ctx: &TraversalContext,
    ) -> Result<Option<Operation>> {
        let tree = self.tree;
        let Some(name_node) = tree.child_by_field(function, "declarator") else {
            return Ok(None);
        };
        let (owner, name) = split_qualified_name(tree.text(name_node));
        if name.is_empty() {
            return Ok(None);
        }

        let mut operation =
            Operation::new(name, self.location(node, CodeElementType::MethodDeclaration)?);
        operation.visibility = if ctx.in_class() {
            ctx.visibility
        } else {
            Visibility::Public
        };
        if !ctx.in_class() {
            operation.class_name = owner.map(str::to_string);
        }
        let class_name = ctx.current_class_name().or(owner);
        operation.is_destructor = name.starts_with('~');
        operation.is_constructor = class_name == Some(name);
        operation.is_template = ctx.in_template;
        operation.return_type = tree
            .child_by_field(node, "type")
            .map(|t| cpp_type(tree.text(t)));

        for &child in tree.children(node) {
            if tree.field_name(child) == Some("declarator") {
                break;
            }
            match (tree.kind(child), tree.text(child)) {
                (_, "virtual") => operation.is_virtual = true,
                ("storage_class_specifier", "static") => operation.is_static = true,
                ("storage_class_specifier", "inline") => operation.is_inline = true,
                _ => {}
            }
        }
        for &child in tree.children(function) {
            match (tree.kind(child), tree.text(child)) {
                ("type_qualifier", "const") => operation.is_const = true,
                ("noexcept", _) => operation.is_noexcept = true,
                ("virtual_specifier", "final") => operation.is_final = true,
                _ => {}
            }
        }
        operation.is_abstract = PURE_VIRTUAL.is_match(tree.text(node));

        if let Some(parameters) = tree.child_by_field(function, "parameters") {
            operation.parameters = self.parameters(parameters)?;
        }
        Ok(Some(operation))
    }

    fn parameters(&self, list: NodeId) -> Result<Vec<Parameter>> {
        let tree = self.tree;
        let mut parameters = Vec::new();
        for child in tree.named_children(list) {
            let is_varargs = match tree.kind(child) {
                "parameter_declaration" | "optional_parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(type_node) = tree.child_by_field(child, "type") else {
                continue;
            };
            let declarator = tree.child_by_field(child, "declarator");
            let type_text = tree.text(type_node);
            // `f(void)` 没有参数
            if declarator.is_none() && type_text == "void" {
                continue;
            }

            let name = declarator
                .and_then(|d| tree.first_descendant_of_kind(d, "identifier"))
                .map_or("", |n| tree.text(n));
            let mut parameter = Parameter::new(
                name,
                cpp_type(type_text),
                self.location(child, CodeElementType::ParameterDeclaration)?,
            )
            .with_default(
                tree.child_by_field(child, "default_value")
                    .map(|v| tree.text(v).to_string()),
            );
            parameter.is_varargs = is_varargs;
            for qualifier in tree.children_by_kind(child, "type_qualifier") {
                match tree.text(qualifier) {
                    "const" => parameter.is_const = true,
                    "volatile" => parameter.is_volatile = true,
                    _ => {}
                }
            }
            if let Some(declarator) = declarator {
                parameter.is_pointer = ["pointer_declarator", "abstract_pointer_declarator"]
                    .iter()
                    .any(|kind| tree.first_descendant_of_kind(declarator, kind).is_some());
                let reference = ["reference_declarator", "abstract_reference_declarator"]
                    .iter()
                    .find_map(|kind| tree.first_descendant_of_kind(declarator, kind));
                if let Some(reference) = reference {
                    if tree.text(reference).trim_start().starts_with("&&") {
                        parameter.set_rvalue_reference(true);
                    } else {
                        parameter.set_reference(true);
                    }
                }
            }
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    fn field(&self, node: NodeId, declarator: NodeId, ctx: &TraversalContext) -> Result<Option<Attribute>> {
        let tree = self.tree;
        let name_node = tree
            .first_descendant_of_kind(declarator, "field_identifier")
            .or_else(|| tree.first_descendant_of_kind(declarator, "identifier"));
        let (Some(name_node), Some(type_node)) = (name_node, tree.child_by_field(node, "type")) else {
            return Ok(None);
        };

        let mut attribute = Attribute::new(
            tree.text(name_node),
            cpp_type(tree.text(type_node)),
            self.location(node, CodeElementType::FieldDeclaration)?,
        )
        .with_initial_value(
            tree.child_by_field(node, "default_value")
                .map(|v| tree.text(v).to_string()),
        );
        attribute.visibility = ctx.visibility;
        for &child in tree.children(node) {
            match (tree.kind(child), tree.text(child)) {
                ("storage_class_specifier", "static") => attribute.is_static = true,
                ("type_qualifier", "const") => attribute.is_const = true,
                ("type_qualifier", "volatile") => attribute.is_volatile = true,
                _ => {}
            }
        }
        Ok(Some(attribute))
    }
}

impl<'t> AstVisitor<'t> for CppVisitor<'t> {
    fn tree(&self) -> &'t GenericTree {
        self.tree
    }

    fn file_path(&self) -> &str {
        &self.file_path
    }

    fn model(&mut self) -> &mut CodeModel {
        &mut self.model
    }

    fn visit(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        match CppNode::from_kind(self.tree.kind(node)) {
            CppNode::TranslationUnit => self.process_module(node, ctx),
            CppNode::Namespace => self.process_namespace(node, ctx),
            CppNode::ClassSpecifier | CppNode::StructSpecifier => self.process_class(node, ctx),
            CppNode::FunctionDefinition => self.process_method(node, ctx),
            CppNode::Declaration => self.process_declaration(node, ctx),
            CppNode::FieldDeclaration => self.process_field(node, ctx),
            CppNode::AccessSpecifier => {
                if let Some(visibility) = Visibility::from_cpp_specifier(self.tree.text(node)) {
                    ctx.visibility = visibility;
                }
                Ok(())
            }
            CppNode::Include => self.process_import(node, ctx),
            CppNode::Template => self.process_template(node, ctx),
            CppNode::Other => self.visit_children(node, ctx),
        }
    }

    fn process_module(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let file_path = self.file_path.clone();
        let module_path = self.module_path.clone();
        self.model.set_package(&file_path, module_path);
        self.record_comments(node)?;
        self.visit_children(node, ctx)
    }

    fn process_class(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        // 没有类体的是前置声明
        let (Some(name_node), Some(body)) = (
            tree.child_by_field(node, "name"),
            tree.child_by_field(node, "body"),
        ) else {
            return Ok(());
        };

        let name = tree.text(name_node);
        let mut class = Class::new(
            self.package_name(ctx),
            name,
            self.location(node, CodeElementType::ClassDeclaration)?,
        );
        class.is_inner_class = ctx.in_class();
        class.is_template = ctx.in_template;
        if ctx.in_class() {
            class.visibility = ctx.visibility;
        }
        if let Some(bases) = tree.child_by_kind(node, "base_class_clause") {
            for base in tree.named_children(bases) {
                if matches!(
                    tree.kind(base),
                    "type_identifier" | "qualified_identifier" | "template_type"
                ) {
                    class.add_superclass(tree.text(base));
                }
            }
        }

        let default_visibility = if tree.kind(node) == "struct_specifier" {
            Visibility::Public
        } else {
            Visibility::Private
        };
        let saved_visibility = std::mem::replace(&mut ctx.visibility, default_visibility);
        let saved_template = std::mem::replace(&mut ctx.in_template, false);
        let outer = ctx.enter_class(class);
        let visited = self.visit_children(body, ctx);
        let finished = ctx.leave_class(outer);
        ctx.visibility = saved_visibility;
        ctx.in_template = saved_template;
        visited?;

        if let Some(mut class) = finished {
            class.is_abstract = class.operations.iter().any(|op| op.is_abstract);
            self.model.add_class(class);
        }
        Ok(())
    }

    fn process_method(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(declarator) = tree.child_by_field(node, "declarator") else {
            return Ok(());
        };
        let Some(function) = tree.first_descendant_of_kind(declarator, "function_declarator") else {
            return Ok(());
        };
        let Some(mut operation) = self.operation(node, function, ctx)? else {
            return Ok(());
        };
        operation.body = tree
            .child_by_field(node, "body")
            .map(|body| tree.text(body).to_string());

        // 类外定义 `R C::m(..) {..}` 暂存为带类名的独立操作，构建结束时挂接到声明
        if operation.class_name.is_some() {
            self.model.add_operation(operation);
        } else {
            self.record_operation(operation, ctx);
        }
        Ok(())
    }

    fn process_field(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        // 字段类型本身可能是嵌套的类定义
        if let Some(type_node) = tree.child_by_field(node, "type") {
            if matches!(tree.kind(type_node), "class_specifier" | "struct_specifier") {
                self.process_class(type_node, ctx)?;
            }
        }
        if !ctx.in_class() {
            return Ok(());
        }

        for declarator in tree.children_by_field(node, "declarator") {
            if let Some(function) = tree.first_descendant_of_kind(declarator, "function_declarator") {
                if let Some(operation) = self.operation(node, function, ctx)? {
                    self.record_operation(operation, ctx);
                }
            } else if let Some(attribute) = self.field(node, declarator, ctx)? {
                if let Some(class) = ctx.current_class.as_mut() {
                    class.add_attribute(attribute);
                }
            }
        }
        Ok(())
    }

    fn process_import(&mut self, node: NodeId, _ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(path) = tree.child_by_field(node, "path") else {
            return Ok(());
        };
        let name = match tree.kind(path) {
            "system_lib_string" => tree.text(path).trim_start_matches('<').trim_end_matches('>'),
            _ => tree
                .child_text(path, "string_content")
                .unwrap_or_else(|| tree.text(path).trim_matches('"')),
        };
        let import = Import::new(
            name,
            ImportKind::Direct,
            self.location(node, CodeElementType::ImportDeclaration)?,
        );
        let file_path = self.file_path.clone();
        self.model.add_import(&file_path, import);
        Ok(())
    }
}

/// 拆分 `Owner::name`；模板实参从所属类名中去掉
fn split_qualified_name(text: &str) -> (Option<&str>, &str) {
    match text.rsplit_once("::") {
        Some((scope, name)) => {
            let owner = scope.rsplit("::").next().unwrap_or(scope);
            let owner = owner.split('<').next().unwrap_or(owner).trim();
            (Some(owner).filter(|o| !o.is_empty()), name.trim())
        }
        None => (None, text.trim()),
    }
}

/// 解析类型文本，模板实参递归解析为类型参数：`std::map<int, std::vector<T>>`
fn cpp_type(text: &str) -> Type {
    let text = text.trim();
    let (Some(open), true) = (text.find('<'), text.ends_with('>')) else {
        return Type::new(text);
    };
    let base = text[..open].trim();
    let arguments = split_top_level(&text[open + 1..text.len() - 1])
        .into_iter()
        .map(cpp_type)
        .collect();

    let mut parsed = Type::with_parameters(base, arguments);
    let simple = base.rsplit("::").next().unwrap_or(base);
    parsed.is_collection = COLLECTION_TYPES.contains(&simple);
    parsed.is_map = MAP_TYPES.contains(&simple);
    parsed
}

/// 按最外层逗号切分模板实参列表
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}
