//! Python 访问器
//!
//! 处理类、函数（含装饰器包装）、参数、类属性与实例属性、导入和文档字符串。
//! 函数体不会作为普通子节点继续遍历，嵌套函数不进入模型。

use super::{AstVisitor, TraversalContext, strip_extension};
use crate::error::Result;
use crate::model::{
    Annotation, Attribute, Class, CodeElementType, CodeModel, Comment, CommentKind, Import,
    ImportKind, Operation, Parameter, Type, Visibility,
};
use crate::parser::{GenericTree, NodeId, SupportedLanguage};
use tracing::debug;

/// 访问器关心的 Python 语法节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PythonNode {
    Module,
    ClassDefinition,
    FunctionDefinition,
    ExpressionStatement,
    ImportStatement,
    ImportFromStatement,
    Other,
}

impl PythonNode {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "module" => PythonNode::Module,
            "class_definition" => PythonNode::ClassDefinition,
            "function_definition" => PythonNode::FunctionDefinition,
            "expression_statement" => PythonNode::ExpressionStatement,
            "import_statement" => PythonNode::ImportStatement,
            "import_from_statement" => PythonNode::ImportFromStatement,
            _ => PythonNode::Other,
        }
    }
}

/// Python 访问器
pub struct PythonVisitor<'t> {
    tree: &'t GenericTree,
    file_path: String,
    module_name: String,
    model: CodeModel,
}

impl<'t> PythonVisitor<'t> {
    pub fn new(tree: &'t GenericTree, file_path: &str) -> Self {
        let mut model = CodeModel::new(Some(SupportedLanguage::Python));
        model.add_source(file_path, tree.source());
        Self {
            tree,
            file_path: file_path.to_string(),
            module_name: module_name(file_path),
            model,
        }
    }

    /// 遍历整棵树并返回单文件模型
    pub fn build(mut self) -> Result<CodeModel> {
        let mut ctx = TraversalContext::new();
        self.process_module(self.tree.root(), &mut ctx)?;
        debug!(
            "Python 文件 {} 提取了 {} 个类和 {} 个独立函数",
            self.file_path,
            self.model.number_of_classes(),
            self.model.operations().len()
        );
        Ok(self.model)
    }

    /// 包裹在 `decorated_definition` 中的定义所带的装饰器
    fn decorators(&self, definition: NodeId) -> Result<Vec<Annotation>> {
        let tree = self.tree;
        let Some(parent) = tree.parent(definition) else {
            return Ok(Vec::new());
        };
        if tree.kind(parent) != "decorated_definition" {
            return Ok(Vec::new());
        }

        let mut annotations = Vec::new();
        for decorator in tree.children_by_kind(parent, "decorator") {
            let Some(expression) = tree.named_children(decorator).next() else {
                continue;
            };
            let location = self.location(decorator, CodeElementType::AnnotationTypeDeclaration)?;
            let annotation = if tree.kind(expression) == "call" {
                let Some(function) = tree.child_by_field(expression, "function") else {
                    continue;
                };
                let annotation = Annotation::new(tree.text(function), location);
                match tree.child_by_field(expression, "arguments") {
                    Some(arguments) => {
                        annotation.with_value("value", strip_parentheses(tree.text(arguments)))
                    }
                    None => annotation,
                }
            } else {
                Annotation::new(tree.text(expression), location)
            };
            annotations.push(annotation);
        }
        Ok(annotations)
    }

    /// 函数或类体中的文档字符串
    fn docstring(&self, body: NodeId) -> Result<Option<Comment>> {
        let tree = self.tree;
        let Some(first) = tree.named_children(body).next() else {
            return Ok(None);
        };
        if tree.kind(first) != "expression_statement" {
            return Ok(None);
        }
        match tree.named_children(first).next() {
            Some(string) if tree.kind(string) == "string" => Ok(Some(Comment::new(
                tree.text(string),
                self.location(string, CodeElementType::DocComment)?,
                CommentKind::Doc,
            ))),
            _ => Ok(None),
        }
    }

    fn parameters(&self, parameters: NodeId) -> Result<Vec<Parameter>> {
        let tree = self.tree;
        let mut result = Vec::new();
        let mut keyword_only = false;

        for child in tree.named_children(parameters) {
            let (name_node, type_node, value_node, is_varargs) = match tree.kind(child) {
                "keyword_separator" => {
                    // 单独的 `*` 只影响其后的参数
                    keyword_only = true;
                    continue;
                }
                "identifier" => (Some(child), None, None, false),
                "typed_parameter" => {
                    let Some(first) = tree.named_children(child).next() else {
                        continue;
                    };
                    let splat = is_splat(tree.kind(first));
                    let name = if splat { splat_name(tree, first) } else { Some(first) };
                    (name, tree.child_by_field(child, "type"), None, splat)
                }
                "default_parameter" => (
                    tree.child_by_field(child, "name"),
                    None,
                    tree.child_by_field(child, "value"),
                    false,
                ),
                "typed_default_parameter" => (
                    tree.child_by_field(child, "name"),
                    tree.child_by_field(child, "type"),
                    tree.child_by_field(child, "value"),
                    false,
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (splat_name(tree, child), None, None, true)
                }
                _ => continue,
            };
            let Some(name_node) = name_node else {
                continue;
            };

            let parameter_type = type_node.map_or_else(|| Type::new("object"), |t| python_type(tree, t));
            let mut parameter = Parameter::new(
                tree.text(name_node),
                parameter_type,
                self.location(child, CodeElementType::ParameterDeclaration)?,
            )
            .with_default(value_node.map(|v| tree.text(v).to_string()));
            parameter.is_varargs = is_varargs;
            parameter.is_keyword_only = keyword_only;
            result.push(parameter);
        }
        Ok(result)
    }

    /// 方法体中的 `self.<name> = ...` 赋值
    fn collect_instance_attributes(
        &mut self,
        body: NodeId,
        ctx: &mut TraversalContext,
    ) -> Result<()> {
        let tree = self.tree;
        // 嵌套函数与类中的 self 属于其他作用域
        let nested = ["function_definition", "class_definition"];
        for assignment in tree.descendants_of_kind_within(body, "assignment", &nested) {
            let Some(left) = tree.child_by_field(assignment, "left") else {
                continue;
            };
            if tree.kind(left) != "attribute" {
                continue;
            }
            let object = tree.child_by_field(left, "object").map(|o| tree.text(o));
            let Some(attribute_node) = tree.child_by_field(left, "attribute") else {
                continue;
            };
            if object != Some("self") {
                continue;
            }

            let name = tree.text(attribute_node);
            let attribute = self.attribute(assignment, name)?;
            if let Some(class) = ctx.current_class.as_mut() {
                if class.attribute(name).is_none() {
                    class.add_attribute(attribute);
                }
            }
        }
        Ok(())
    }

    fn attribute(&self, assignment: NodeId, name: &str) -> Result<Attribute> {
        let tree = self.tree;
        let attribute_type = tree
            .child_by_field(assignment, "type")
            .map_or_else(|| Type::new("object"), |t| python_type(tree, t));
        let mut attribute = Attribute::new(
            name,
            attribute_type,
            self.location(assignment, CodeElementType::FieldDeclaration)?,
        )
        .with_initial_value(
            tree.child_by_field(assignment, "right")
                .map(|r| tree.text(r).to_string()),
        );
        attribute.visibility = Visibility::from_python_name(name);
        Ok(attribute)
    }

    fn import(&self, node: NodeId, name: String, kind: ImportKind, alias: Option<String>) -> Result<Import> {
        Ok(Import::new(name, kind, self.location(node, CodeElementType::ImportDeclaration)?).with_alias(alias))
    }
}

impl<'t> AstVisitor<'t> for PythonVisitor<'t> {
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
        match PythonNode::from_kind(self.tree.kind(node)) {
            PythonNode::Module => self.process_module(node, ctx),
            PythonNode::ClassDefinition => self.process_class(node, ctx),
            PythonNode::FunctionDefinition => self.process_method(node, ctx),
            PythonNode::ExpressionStatement => self.process_field(node, ctx),
            PythonNode::ImportStatement | PythonNode::ImportFromStatement => {
                self.process_import(node, ctx)
            }
            PythonNode::Other => self.visit_children(node, ctx),
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
        class.visibility = Visibility::from_python_name(name);
        class.is_inner_class = ctx.in_class();

        if let Some(superclasses) = tree.child_by_field(node, "superclasses") {
            for base in tree.named_children(superclasses) {
                if tree.kind(base) == "keyword_argument" {
                    continue;
                }
                class.add_superclass(tree.text(base));
            }
        }
        class.is_abstract = class
            .superclasses
            .iter()
            .any(|base| base == "ABC" || base == "abc.ABC");
        for annotation in self.decorators(node)? {
            class.add_annotation(annotation);
        }
        if let Some(docstring) = self.docstring(body)? {
            class.add_comment(docstring);
        }

        let outer = ctx.enter_class(class);
        let visited = self.visit_children(body, ctx);
        let finished = ctx.leave_class(outer);
        visited?;

        if let Some(mut class) = finished {
            class.is_abstract |= class.operations.iter().any(|op| op.is_abstract);
            self.model.add_class(class);
        }
        Ok(())
    }

    fn process_method(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let Some(name_node) = tree.child_by_field(node, "name") else {
            return Ok(());
        };
        let name = tree.text(name_node);

        let mut operation =
            Operation::new(name, self.location(node, CodeElementType::MethodDeclaration)?);
        operation.visibility = Visibility::from_python_name(name);
        operation.is_async = tree.child_by_kind(node, "async").is_some();
        operation.is_constructor = ctx.in_class() && name == "__init__";

        for annotation in self.decorators(node)? {
            match annotation.simple_name() {
                "staticmethod" => operation.is_static = true,
                "abstractmethod" => operation.is_abstract = true,
                _ => {}
            }
            operation.add_annotation(annotation);
        }

        if let Some(parameters) = tree.child_by_field(node, "parameters") {
            operation.parameters = self.parameters(parameters)?;
        }
        operation.return_type = Some(
            tree.child_by_field(node, "return_type")
                .map_or_else(|| Type::new("None"), |t| python_type(tree, t)),
        );

        if let Some(body) = tree.child_by_field(node, "body") {
            operation.body = Some(tree.text(body).to_string());
            if let Some(docstring) = self.docstring(body)? {
                operation.add_comment(docstring);
            }
            if ctx.in_class() {
                ctx.enter_function(name);
                let collected = self.collect_instance_attributes(body, ctx);
                ctx.leave_function();
                collected?;
            }
        }

        self.record_operation(operation, ctx);
        Ok(())
    }

    /// 类体中直接出现的 `<name> = ...` 赋值为类属性
    fn process_field(&mut self, node: NodeId, ctx: &mut TraversalContext) -> Result<()> {
        if !ctx.in_class_body() {
            return Ok(());
        }
        let tree = self.tree;
        let Some(assignment) = tree.child_by_kind(node, "assignment") else {
            return Ok(());
        };
        let Some(left) = tree.child_by_field(assignment, "left") else {
            return Ok(());
        };
        if tree.kind(left) != "identifier" {
            return Ok(());
        }

        let name = tree.text(left);
        let mut attribute = self.attribute(assignment, name)?;
        attribute.is_static = true;
        if let Some(class) = ctx.current_class.as_mut() {
            class.add_attribute(attribute);
        }
        Ok(())
    }

    fn process_import(&mut self, node: NodeId, _ctx: &mut TraversalContext) -> Result<()> {
        let tree = self.tree;
        let mut imports = Vec::new();

        if tree.kind(node) == "import_statement" {
            for child in tree.children_by_field(node, "name") {
                let (name, alias) = imported_name(tree, child);
                imports.push(self.import(child, name, ImportKind::Single, alias)?);
            }
        } else {
            let Some(module_node) = tree.child_by_field(node, "module_name") else {
                return Ok(());
            };
            let module = tree.text(module_node);
            let kind = if tree.kind(module_node) == "relative_import" {
                ImportKind::Relative
            } else {
                ImportKind::Single
            };

            if let Some(wildcard) = tree.child_by_kind(node, "wildcard_import") {
                imports.push(self.import(wildcard, join_module(module, "*"), ImportKind::Wildcard, None)?);
            }
            for child in tree.children_by_field(node, "name") {
                let (name, alias) = imported_name(tree, child);
                imports.push(self.import(child, join_module(module, &name), kind, alias)?);
            }
        }

        let file_path = self.file_path.clone();
        for import in imports {
            self.model.add_import(&file_path, import);
        }
        Ok(())
    }
}

/// 文件路径对应的模块名：`pkg/util.py` -> `pkg.util`
fn module_name(file_path: &str) -> String {
    strip_extension(file_path).replace(['/', '\\'], ".")
}

fn join_module(module: &str, name: &str) -> String {
    if module.ends_with('.') {
        format!("{module}{name}")
    } else {
        format!("{module}.{name}")
    }
}

/// `dotted_name` 或 `aliased_import` 的名称与别名
fn imported_name(tree: &GenericTree, node: NodeId) -> (String, Option<String>) {
    if tree.kind(node) == "aliased_import" {
        let name = tree
            .child_by_field(node, "name")
            .map_or_else(String::new, |n| tree.text(n).to_string());
        let alias = tree
            .child_by_field(node, "alias")
            .map(|a| tree.text(a).to_string());
        (name, alias)
    } else {
        (tree.text(node).to_string(), None)
    }
}

fn is_splat(kind: &str) -> bool {
    matches!(kind, "list_splat_pattern" | "dictionary_splat_pattern")
}

fn splat_name(tree: &GenericTree, splat: NodeId) -> Option<NodeId> {
    tree.child_by_kind(splat, "identifier")
}

fn strip_parentheses(text: &str) -> &str {
    text.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(text)
}

/// 将类型注解线性化，泛型递归展开为 `Base[P1, P2]`
fn python_type(tree: &GenericTree, node: NodeId) -> Type {
    Type::new(linearize_type(tree, node))
}

fn linearize_type(tree: &GenericTree, node: NodeId) -> String {
    let target = if tree.kind(node) == "type" {
        tree.named_children(node).next().unwrap_or(node)
    } else {
        node
    };
    if tree.kind(target) != "generic_type" {
        return tree.text(target).to_string();
    }

    let mut children = tree.named_children(target);
    let base = children.next().map_or("", |b| tree.text(b));
    let parameters: Vec<String> = tree
        .child_by_kind(target, "type_parameter")
        .map(|list| {
            tree.named_children(list)
                .map(|parameter| linearize_type(tree, parameter))
                .collect()
        })
        .unwrap_or_default();
    format!("{base}[{}]", parameters.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LanguageParser, PythonParser};
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> CodeModel {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse_source(source).unwrap();
        PythonVisitor::new(&tree, "shapes/geometry.py").build().unwrap()
    }

    #[test]
    fn test_module_level_function() {
        let model = build("def fullname(fname, lname):\n    return fname + lname\n");

        assert_eq!(model.package("shapes/geometry.py"), Some("shapes.geometry"));
        assert_eq!(model.operations().len(), 1);
        let op = &model.operations()[0];
        assert_eq!(op.name, "fullname");
        assert!(op.is_standalone());
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["fname", "lname"]);
        assert_eq!(op.parameters[0].parameter_type, Type::new("object"));
        assert_eq!(op.return_type, Some(Type::new("None")));
        assert_eq!(op.body.as_deref().map(str::trim), Some("return fname + lname"));
    }

    #[test]
    fn test_parameter_shapes() {
        let source = "def f(self, a, b: int, c=1, d: str = 'x', *args, e, **kwargs):\n    pass\n";
        let model = build(source);
        let op = &model.operations()[0];

        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["self", "a", "b", "c", "d", "args", "e", "kwargs"]);
        assert_eq!(op.parameters[2].parameter_type, Type::new("int"));
        assert_eq!(op.parameters[3].default_value.as_deref(), Some("1"));
        assert_eq!(op.parameters[4].parameter_type, Type::new("str"));
        assert_eq!(op.parameters[4].default_value.as_deref(), Some("'x'"));
        assert!(op.parameters[5].is_varargs);
        assert!(op.parameters[7].is_varargs);
    }

    #[test]
    fn test_keyword_only_separator_is_not_a_parameter() {
        let model = build("def f(a, *, b, c=2):\n    return a\n");
        let op = &model.operations()[0];

        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(!op.parameters[0].is_keyword_only);
        assert!(op.parameters[1].is_keyword_only);
        assert!(op.parameters[2].is_keyword_only);
    }

    #[test]
    fn test_generic_types_are_linearized() {
        let source = "def f(items: List[int], table: Dict[str, List[float]]) -> Optional[str]:\n    return None\n";
        let model = build(source);
        let op = &model.operations()[0];

        assert_eq!(op.parameters[0].parameter_type.name, "List[int]");
        assert_eq!(op.parameters[1].parameter_type.name, "Dict[str, List[float]]");
        assert_eq!(op.return_type.as_ref().map(|t| t.name.as_str()), Some("Optional[str]"));
    }

    #[test]
    fn test_class_members_and_attributes() {
        let source = r#"class Circle(Shape):
    """A circle."""
    count = 0

    def __init__(self, radius):
        self.radius = radius
        self._cache = None

    @staticmethod
    def unit():
        return Circle(1)

    def __area(self):
        return 3.14 * self.radius ** 2
"#;
        let model = build(source);
        let class = model.class("Circle").unwrap();

        assert_eq!(class.package_name, "shapes.geometry");
        assert_eq!(class.superclasses, vec!["Shape".to_string()]);
        assert_eq!(class.comments.len(), 1);
        assert_eq!(class.comments[0].kind, CommentKind::Doc);

        let count = class.attribute("count").unwrap();
        assert!(count.is_static);
        assert_eq!(count.initial_value.as_deref(), Some("0"));
        let radius = class.attribute("radius").unwrap();
        assert!(!radius.is_static);
        assert_eq!(class.attribute("_cache").unwrap().visibility, Visibility::Protected);

        let init = class.operation("__init__").unwrap();
        assert!(init.is_constructor);
        assert_eq!(init.class_name.as_deref(), Some("Circle"));
        assert!(class.operation("unit").unwrap().is_static);
        assert_eq!(class.operation("__area").unwrap().visibility, Visibility::Private);
        assert!(model.operations().is_empty());
    }

    #[test]
    fn test_nested_scopes_do_not_leak_instance_attributes() {
        let source = r#"class Widget:
    def __init__(self, size):
        self.size = size

        def callback(self):
            self.clicked = True

        class Handler:
            def __init__(self):
                self.target = None
"#;
        let model = build(source);
        let widget = model.class("Widget").unwrap();

        let names: Vec<&str> = widget.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["size"]);
    }

    #[test]
    fn test_nested_class_is_visited_once() {
        let source = "class Outer:\n    class Inner:\n        def run(self):\n            pass\n    def go(self):\n        pass\n";
        let model = build(source);

        assert_eq!(model.number_of_classes(), 2);
        let inner = model.class("Inner").unwrap();
        assert!(inner.is_inner_class);
        assert_eq!(inner.operations.len(), 1);
        let outer = model.class("Outer").unwrap();
        assert!(!outer.is_inner_class);
        assert_eq!(outer.operations.len(), 1);
        assert_eq!(outer.operations[0].name, "go");
    }

    #[test]
    fn test_decorators_and_async() {
        let source = "from abc import ABC, abstractmethod\n\nclass Base(ABC):\n    @abstractmethod\n    async def fetch(self, url):\n        pass\n\n    @retry(times=3)\n    def run(self):\n        pass\n";
        let model = build(source);
        let class = model.class("Base").unwrap();
        assert!(class.is_abstract);

        let fetch = class.operation("fetch").unwrap();
        assert!(fetch.is_async);
        assert!(fetch.is_abstract);
        let run = class.operation("run").unwrap();
        let retry = &run.annotations[0];
        assert_eq!(retry.name, "retry");
        assert_eq!(retry.value("value"), Some("times=3"));
    }

    #[test]
    fn test_imports_and_comments() {
        let source = "import os.path as osp\nimport sys\nfrom collections import OrderedDict, deque as dq\nfrom . import utils\n# trailing note\n";
        let model = build(source);
        let imports = model.imports("shapes/geometry.py");

        let names: Vec<&str> = imports.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "os.path",
                "sys",
                "collections.OrderedDict",
                "collections.deque",
                ".utils"
            ]
        );
        assert_eq!(imports[0].alias.as_deref(), Some("osp"));
        assert_eq!(imports[3].effective_name(), "dq");
        assert_eq!(imports[4].kind, ImportKind::Relative);

        let comments = model.comments("shapes/geometry.py");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].clean_text(), "trailing note");
    }
}
