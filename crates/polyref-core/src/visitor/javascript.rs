//! JavaScript 访问器
//!
//! 类方法、函数声明与赋值给变量的箭头函数都会成为操作；
//! 函数节点不再作为普通子节点继续遍历，避免重复处理函数体。

use super::{AstVisitor, TraversalContext, strip_extension};
use crate::error::Result;
use crate::model::{
    Annotation, Attribute, Class, CodeElementType, CodeModel, Import, ImportKind, Operation,
    Parameter, Type, Visibility,
};
use crate::parser::{GenericTree, NodeId, SupportedLanguage};
use tracing::debug;

/// 访问器关心的 JavaScript 语法节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaScriptNode {
    Program,
    ClassDeclaration,
    MethodDefinition,
    FunctionDeclaration,
    /// 箭头函数与函数表达式，需由外层变量声明命名
    FunctionValue,
    FieldDefinition,
    ImportStatement,
    Other,
}

impl JavaScriptNode {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "program" => JavaScriptNode::Program,
            "class_declaration" => JavaScriptNode::ClassDeclaration,
            "method_definition" => JavaScriptNode::MethodDefinition,
            "function_declaration" | "generator_function_declaration" => {
                JavaScriptNode::FunctionDeclaration
            }
            "arrow_function" | "function_expression" => JavaScriptNode::FunctionValue,
            "field_definition" => JavaScriptNode::FieldDefinition,
            "import_statement" => JavaScriptNode::ImportStatement,
            _ => JavaScriptNode::Other,
        }
    }
}

/// JavaScript 访问器
pub struct JavaScriptVisitor<'t> {
    tree: &'t GenericTree,
    file_path: String,
    module_name: String,
    model: CodeModel,
}

impl<'t> JavaScriptVisitor<'t> {
    pub fn new(tree: &'t GenericTree, file_path: &str) -> Self {
        let mut model = CodeModel::new(Some(SupportedLanguage::JavaScript));
        model.add_source(file_path, tree.source());
        Self {
            tree,
            file_path: file_path.to_string(),
            module_name: strip_extension(file_path).to_string(),
            model,
        }
    }

    pub fn build(mut self) -> Result<CodeModel> {
        let mut ctx = TraversalContext::new();
        self.process_module(self.tree.root(), &mut ctx)?;
        debug!(
            "JavaScript 文件 {} 提取了 {} 个类和 {} 个独立函数",
            self.file_path,
            self.model.number_of_classes(),
            self.model.operations().len()
        );
        Ok(self.model)
    }

    /// 操作名称；匿名函数值没有外层变量声明时返回 `None`
    fn operation_name(&self, node: NodeId) -> Option<&'t str> {
        let tree = self.tree;
        match JavaScriptNode::from_kind(tree.kind(node)) {
            JavaScriptNode::FunctionValue => {
                let declarator = tree.parent(node)?;
                if tree.kind(declarator) != "variable_declarator" {
                    return None;
                }
                tree.child_by_field(declarator, "name").map(|n| tree.text(n))
            }
            _ => tree.child_by_field(node, "name").map(|n| tree.text(n)),
        }
    }

    fn decorators(&self, node: NodeId) -> Result<Vec<Annotation>> {
        let tree = self.tree;
        let mut annotations = Vec::new();
        for decorator in tree.children_by_kind(node, "decorator") {
            let Some(expression) = tree.named_children(decorator).next() else {
                continue;
            };
            let location = self.location(decorator, CodeElementType::AnnotationTypeDeclaration)?;
            let annotation = match tree.kind(expression) {
                "call_expression" | "decorator_call_expression" => {
                    let name = tree
                        .child_by_field(expression, "function")
                        .map_or("", |f| tree.text(f));
                    let annotation = Annotation::new(name, location);
                    match tree.child_by_field(expression, "arguments") {
                        Some(arguments) => annotation.with_value(
                            "value",
                            tree.text(arguments).trim_start_matches('(').trim_end_matches(')'),
                        ),
                        None => annotation,
                    }
                }
                _ => Annotation::new(tree.text(expression), location),
            };
            annotations.push(annotation);
        }
        Ok(annotations)
    }

    fn parameters(&self, node: NodeId) -> Result<Vec<Parameter>> {
        let tree = self.tree;
        // 箭头函数的单个裸参数
        if let Some(single) = tree.child_by_field(node, "parameter") {
            return Ok(vec![Parameter::new(
                tree.text(single),
                Type::new("any"),
                self.location(single, CodeElementType::ParameterDeclaration)?,
            )]);
        }
        let Some(list) = tree.child_by_field(node, "parameters") else {
            return Ok(Vec::new());
        };

        let mut parameters = Vec::new();
        for child in tree.named_children(list) {
            let (name, default_value, is_varargs) = match tree.kind(child) {
                "identifier" | "object_pattern" | "array_pattern" => {
                    (tree.text(child).to_string(), None, false)
                }
                "rest_pattern" | "rest_parameter" => {
                    let inner = tree.named_children(child).next().map_or("", |n| tree.text(n));
                    (format!("...{inner}"), None, true)
                }
                "assignment_pattern" => {
                    let Some(left) = tree.child_by_field(child, "left") else {
                        continue;
                    };
                    let default_value = tree
                        .child_by_field(child, "right")
                        .map(|r| tree.text(r).to_string());
                    (tree.text(left).to_string(), default_value, false)
                }
                _ => continue,
            };
            let mut parameter = Parameter::new(
                name,
                Type::new("any"),
                self.location(child, CodeElementType::ParameterDeclaration)?,
            )
            .with_default(default_value);
            parameter.is_varargs = is_varargs;
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    fn record_import(&mut self, import: Import) {
        let file_path = self.file_path.clone();
        self.model.add_import(&file_path, import);
    }
}

impl<'t> AstVisitor<'t> for JavaScriptVisitor<'t> {
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
        match JavaScriptNode::from_kind(self.tree.kind(node)) {
            JavaScriptNode::Program => self.process_module(node, ctx),
            JavaScriptNode::ClassDeclaration => self.process_class(node, ctx),
            JavaScriptNode::MethodDefinition if ctx.in_class() => self.process_method(node, ctx),
            JavaScriptNode::FunctionDeclaration | JavaScriptNode::FunctionValue
                if !ctx.in_class() =>
            {
                self.process_method(node, ctx)
            }
            // 类外的方法定义（对象字面量）与类内的函数值都不建模，也不继续下探
            JavaScriptNode::MethodDefinition
            | JavaScriptNode::FunctionDeclaration
            | JavaScriptNode::FunctionValue => Ok(()),
            JavaScriptNode::FieldDefinition => self.process_field(node, ctx),
            JavaScriptNode::ImportStatement => self.process_import(node, ctx),
            JavaScriptNode::Other => self.visit_children(node, ctx),
        }
    }

    fn process_module(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let file_path = self.file_path.clone();
        let module_name = self.module_name.clone();
        self.model.set_package(&file_path, module_name);
        self.record_comments(node)?;
        self.visit_children(node, ctx)
    }

    fn process_class(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let (Some(name_node), Some(body)) = (
            tree.child_by_field(node, "name"),
            tree.child_by_field(node, "body"),
        ) else {
            return Ok(());
        };

        let name = tree.text(name_node);
        let mut class = Class::new(
            self.module_name.clone(),
            name,
            self.location(node, CodeElementType::ClassDeclaration)?,
        );
        class.is_inner_class = ctx.in_class();
        if let Some(heritage) = tree.child_by_kind(node, "class_heritage") {
            if let Some(base) = tree.named_children(heritage).next() {
                class.add_superclass(tree.text(base));
            }
        }
        for annotation in self.decorators(node)? {
            class.add_annotation(annotation);
        }

        let outer = ctx.enter_class(class);
        let visited = self.visit_children(body, ctx);
        let finished = ctx.leave_class(outer);
        visited?;

        if let Some(class) = finished {
            self.model.add_class(class);
        }
        Ok(())
    }

    fn process_method(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(name) = self.operation_name(node) else {
            return Ok(());
        };

        let mut operation =
            Operation::new(name, self.location(node, CodeElementType::MethodDeclaration)?);
        operation.visibility = Visibility::from_javascript_name(name);
        operation.is_constructor = ctx.in_class() && name == "constructor";
        operation.is_static = tree.child_by_kind(node, "static").is_some();
        operation.is_async = tree.child_by_kind(node, "async").is_some();
        operation.is_generator = tree.kind(node) == "generator_function_declaration"
            || tree.child_by_kind(node, "*").is_some();
        for annotation in self.decorators(node)? {
            operation.add_annotation(annotation);
        }
        operation.parameters = self.parameters(node)?;
        operation.body = tree
            .child_by_field(node, "body")
            .map(|body| tree.text(body).to_string());

        self.record_operation(operation, ctx);
        Ok(())
    }

    fn process_field(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(property) = tree.child_by_field(node, "property") else {
            return Ok(());
        };
        let name = tree.text(property);
        let mut attribute = Attribute::new(
            name,
            Type::new("any"),
            self.location(node, CodeElementType::FieldDeclaration)?,
        )
        .with_initial_value(
            tree.child_by_field(node, "value")
                .map(|v| tree.text(v).to_string()),
        );
        attribute.visibility = Visibility::from_javascript_name(name);
        attribute.is_static = tree.child_by_kind(node, "static").is_some();

        if let Some(class) = ctx.current_class.as_mut() {
            class.add_attribute(attribute);
        }
        Ok(())
    }

    fn process_import(&mut self, node: NodeId, _ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(source) = tree.child_by_field(node, "source") else {
            return Ok(());
        };
        let module = tree.text(source).trim_matches(|c| c == '"' || c == '\'' || c == '`');
        let location = self.location(node, CodeElementType::ImportDeclaration)?;

        let Some(clause) = tree.child_by_kind(node, "import_clause") else {
            // 仅执行副作用的导入
            self.record_import(Import::new(module, ImportKind::Direct, location));
            return Ok(());
        };

        for child in tree.named_children(clause) {
            match tree.kind(child) {
                "identifier" => self.record_import(
                    Import::new(module, ImportKind::Default, location.clone())
                        .with_alias(Some(tree.text(child).to_string())),
                ),
                "namespace_import" => {
                    let alias = tree.child_text(child, "identifier").map(str::to_string);
                    self.record_import(
                        Import::new(module, ImportKind::Namespace, location.clone()).with_alias(alias),
                    );
                }
                "named_imports" => {
                    for specifier in tree.children_by_kind(child, "import_specifier") {
                        let Some(name) = tree.child_by_field(specifier, "name") else {
                            continue;
                        };
                        let alias = tree
                            .child_by_field(specifier, "alias")
                            .map(|a| tree.text(a).to_string());
                        let import = Import::new(
                            format!("{module}.{}", tree.text(name)),
                            ImportKind::Single,
                            self.location(specifier, CodeElementType::ImportDeclaration)?,
                        )
                        .with_alias(alias);
                        self.record_import(import);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaScriptParser, LanguageParser};
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> CodeModel {
        let mut parser = JavaScriptParser::new().unwrap();
        let tree = parser.parse_source(source).unwrap();
        JavaScriptVisitor::new(&tree, "src/cart.js").build().unwrap()
    }

    #[test]
    fn test_class_with_members() {
        let source = r#"class Cart extends Base {
  #items = [];
  static count = 0;

  constructor(owner) {
    super();
    this.owner = owner;
  }

  async checkout(card, retries = 3, ...extras) {
    return pay(card);
  }

  static *ids() {
    yield 1;
  }

  #total() {
    return 0;
  }
}
"#;
        let model = build(source);
        assert_eq!(model.package("src/cart.js"), Some("src/cart"));
        let class = model.class("Cart").unwrap();
        assert_eq!(class.superclasses, vec!["Base".to_string()]);

        let items = class.attribute("#items").unwrap();
        assert_eq!(items.visibility, Visibility::Private);
        assert_eq!(items.initial_value.as_deref(), Some("[]"));
        assert!(class.attribute("count").unwrap().is_static);

        assert!(class.operation("constructor").unwrap().is_constructor);
        let checkout = class.operation("checkout").unwrap();
        assert!(checkout.is_async);
        let names: Vec<&str> = checkout.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["card", "retries", "...extras"]);
        assert_eq!(checkout.parameters[1].default_value.as_deref(), Some("3"));
        assert!(checkout.parameters[2].is_varargs);
        assert_eq!(checkout.parameters[0].parameter_type, Type::new("any"));

        let ids = class.operation("ids").unwrap();
        assert!(ids.is_static);
        assert!(ids.is_generator);
        assert_eq!(class.operation("#total").unwrap().visibility, Visibility::Private);
        assert!(model.operations().is_empty());
    }

    #[test]
    fn test_functions_and_arrow_functions() {
        let source = r#"function add(a, b) {
  const inner = (x) => x * 2;
  return a + b;
}

const double = x => x * 2;
export const sum = async (values, { strict }) => {
  return values.reduce((acc, v) => acc + v, 0);
};
[1, 2].map((n) => n + 1);
"#;
        let model = build(source);
        let names: Vec<&str> = model.operations().iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["add", "double", "sum"]);

        let double = &model.operations()[1];
        assert_eq!(double.parameters.len(), 1);
        assert_eq!(double.parameters[0].name, "x");
        assert_eq!(double.body.as_deref(), Some("x * 2"));

        let sum = &model.operations()[2];
        assert!(sum.is_async);
        assert_eq!(sum.parameters[1].name, "{ strict }");
    }

    #[test]
    fn test_imports() {
        let source = r#"import React, { useState, useEffect as effect } from 'react';
import * as path from "path";
import './styles.css';
"#;
        let model = build(source);
        let imports = model.imports("src/cart.js");

        assert_eq!(imports.len(), 5);
        assert_eq!(imports[0].kind, ImportKind::Default);
        assert_eq!(imports[0].effective_name(), "React");
        assert_eq!(imports[1].name, "react.useState");
        assert_eq!(imports[2].name, "react.useEffect");
        assert_eq!(imports[2].alias.as_deref(), Some("effect"));
        assert_eq!(imports[3].kind, ImportKind::Namespace);
        assert_eq!(imports[3].alias.as_deref(), Some("path"));
        assert_eq!(imports[4].kind, ImportKind::Direct);
        assert_eq!(imports[4].name, "./styles.css");
    }

    #[test]
    fn test_comments_are_recorded() {
        let model = build("/** Adds numbers. */\nfunction add(a, b) { return a + b; } // inline\n");
        let comments = model.comments("src/cart.js");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].clean_text(), "Adds numbers.");
    }
}
