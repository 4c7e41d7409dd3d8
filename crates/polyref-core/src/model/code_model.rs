//! 代码模型
//!
//! 一个快照（某一版本的代码库）的统一结构表示。由 [`ModelReader`](crate::reader::ModelReader)
//! 构建一次，之后只读地交给差异分析使用。

use super::class::Class;
use super::element::{Comment, Import};
use super::index::LocationIndex;
use super::operation::Operation;
use crate::parser::SupportedLanguage;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 单个快照的代码模型
#[derive(Debug, Clone, Default)]
pub struct CodeModel {
    language: Option<SupportedLanguage>,
    classes: Vec<Class>,
    /// 不属于任何类的独立操作
    operations: Vec<Operation>,
    comments: HashMap<String, Vec<Comment>>,
    imports: HashMap<String, Vec<Import>>,
    packages: HashMap<String, String>,
    sources: HashMap<String, String>,
    /// 尚未找到所属类的类外静态成员初始化
    deferred_initializers: Vec<StaticInitializer>,
    class_index: LocationIndex,
    operation_index: LocationIndex,
}

/// 类外静态成员初始化，如 C++ 的 `int Counter::count = 0;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticInitializer {
    pub class_name: String,
    pub attribute_name: String,
    pub value: String,
}

impl CodeModel {
    pub fn new(language: Option<SupportedLanguage>) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn language(&self) -> Option<SupportedLanguage> {
        self.language
    }

    pub fn set_language(&mut self, language: Option<SupportedLanguage>) {
        self.language = language;
    }

    pub fn is_python(&self) -> bool {
        self.language == Some(SupportedLanguage::Python)
    }

    /// 加入类，与已有类相等时忽略
    pub fn add_class(&mut self, class: Class) {
        self.class_index
            .push_unique(&mut self.classes, class, |class| &class.location);
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operation_index
            .push_unique(&mut self.operations, operation, |op| &op.location);
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut [Operation] {
        &mut self.operations
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|class| class.name == name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.iter_mut().find(|class| class.name == name)
    }

    /// 独立操作在前，随后按类的顺序列出类中的方法
    pub fn all_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .chain(self.classes.iter().flat_map(|class| class.operations.iter()))
    }

    pub fn classes_in_file(&self, file_path: &str) -> Vec<&Class> {
        self.classes
            .iter()
            .filter(|class| class.location.file_path() == file_path)
            .collect()
    }

    pub fn classes_by_package(&self, package_name: &str) -> Vec<&Class> {
        self.classes
            .iter()
            .filter(|class| class.package_name == package_name)
            .collect()
    }

    pub fn operations_in_file(&self, file_path: &str) -> Vec<&Operation> {
        self.all_operations()
            .filter(|op| op.location.file_path() == file_path)
            .collect()
    }

    pub fn add_import(&mut self, file_path: &str, import: Import) {
        self.imports
            .entry(file_path.to_string())
            .or_default()
            .push(import);
    }

    pub fn imports(&self, file_path: &str) -> &[Import] {
        self.imports.get(file_path).map_or(&[], Vec::as_slice)
    }

    pub fn add_comment(&mut self, file_path: &str, comment: Comment) {
        self.comments
            .entry(file_path.to_string())
            .or_default()
            .push(comment);
    }

    pub fn comments(&self, file_path: &str) -> &[Comment] {
        self.comments.get(file_path).map_or(&[], Vec::as_slice)
    }

    pub fn set_package(&mut self, file_path: &str, package_name: impl Into<String>) {
        self.packages
            .insert(file_path.to_string(), package_name.into());
    }

    pub fn package(&self, file_path: &str) -> Option<&str> {
        self.packages.get(file_path).map(String::as_str)
    }

    pub fn add_source(&mut self, file_path: &str, content: impl Into<String>) {
        self.sources.insert(file_path.to_string(), content.into());
    }

    pub fn source(&self, file_path: &str) -> Option<&str> {
        self.sources.get(file_path).map(String::as_str)
    }

    /// 已收录源码的文件路径（排序后）
    pub fn source_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn number_of_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn number_of_files(&self) -> usize {
        self.sources.len()
    }

    pub fn classes_per_file(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for class in &self.classes {
            *counts.entry(class.location.file_path()).or_insert(0) += 1;
        }
        counts
    }

    /// 合并另一个（通常是单文件的）部分模型
    ///
    /// 只追加不覆盖：类与操作按相等性去重，按文件的注释与导入依次追加。
    pub fn merge(&mut self, other: CodeModel) {
        if self.language.is_none() {
            self.language = other.language;
        }
        for class in other.classes {
            self.add_class(class);
        }
        for operation in other.operations {
            self.add_operation(operation);
        }
        for (file_path, comments) in other.comments {
            self.comments.entry(file_path).or_default().extend(comments);
        }
        for (file_path, imports) in other.imports {
            self.imports.entry(file_path).or_default().extend(imports);
        }
        for (file_path, package_name) in other.packages {
            self.packages.entry(file_path).or_insert(package_name);
        }
        for (file_path, content) in other.sources {
            self.sources.entry(file_path).or_insert(content);
        }
        self.deferred_initializers.extend(other.deferred_initializers);
    }

    pub fn defer_initializer(&mut self, initializer: StaticInitializer) {
        self.deferred_initializers.push(initializer);
    }

    pub fn deferred_initializers(&self) -> &[StaticInitializer] {
        &self.deferred_initializers
    }

    /// 将类外定义挂接到类中的声明
    ///
    /// 带所属类名的独立操作若在该类中找到同名、同参数类型且没有函数体的声明，
    /// 则把函数体移入声明并从独立操作中删除；延迟的静态成员初始化同理。
    /// 找不到声明的定义保持为带类名的独立操作。
    pub fn link_out_of_class_members(&mut self) {
        let operations = std::mem::take(&mut self.operations);
        for operation in operations {
            if let Some(unlinked) = self.attach_definition(operation) {
                self.operations.push(unlinked);
            }
        }

        let initializers = std::mem::take(&mut self.deferred_initializers);
        for initializer in initializers {
            let attribute = self
                .class_mut(&initializer.class_name)
                .and_then(|class| class.attribute_mut(&initializer.attribute_name));
            match attribute {
                Some(attribute) => attribute.initial_value = Some(initializer.value),
                None => self.deferred_initializers.push(initializer),
            }
        }
    }

    /// 挂接成功返回 `None`，否则原样返回操作
    fn attach_definition(&mut self, definition: Operation) -> Option<Operation> {
        let (Some(class_name), Some(body)) = (&definition.class_name, &definition.body) else {
            return Some(definition);
        };
        let Some(class) = self.class_mut(class_name) else {
            return Some(definition);
        };
        let declaration = class.operations.iter_mut().find(|declared| {
            declared.name == definition.name
                && declared.body.is_none()
                && same_parameter_types(declared, &definition)
        });
        let Some(declaration) = declaration else {
            return Some(definition);
        };

        declaration.body = Some(body.clone());
        if declaration.parameters.iter().any(|p| p.name.is_empty()) {
            declaration.parameters = definition.parameters.clone();
        }
        None
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.operations.clear();
        self.comments.clear();
        self.imports.clear();
        self.packages.clear();
        self.sources.clear();
        self.deferred_initializers.clear();
    }
}

fn same_parameter_types(left: &Operation, right: &Operation) -> bool {
    left.parameters.len() == right.parameters.len()
        && left
            .parameters
            .iter()
            .zip(&right.parameters)
            .all(|(l, r)| l.parameter_type == r.parameter_type)
}

impl fmt::Display for CodeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let language = self.language.map_or("unknown", |l| l.display_name());
        writeln!(
            f,
            "Code model ({language}): {} classes, {} standalone operations, {} files",
            self.classes.len(),
            self.operations.len(),
            self.sources.len()
        )?;
        for class in &self.classes {
            writeln!(
                f,
                "- {} ({})",
                class.fully_qualified_name(),
                class.location.file_path()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeElementType, ImportKind, Location};
    use crate::parser::Point;
    use pretty_assertions::assert_eq;

    fn location(file: &str, row: usize, kind: CodeElementType) -> Location {
        Location::new(file, Point::new(row, 0), Point::new(row + 1, 0), kind).unwrap()
    }

    fn class(file: &str, name: &str, row: usize) -> Class {
        let mut class = Class::new("pkg", name, location(file, row, CodeElementType::ClassDeclaration));
        class.add_operation(Operation::new(
            "run",
            location(file, row + 1, CodeElementType::MethodDeclaration),
        ));
        class
    }

    #[test]
    fn test_insertion_deduplicates() {
        let mut model = CodeModel::new(Some(SupportedLanguage::Python));
        model.add_class(class("a.py", "A", 0));
        model.add_class(class("a.py", "A", 0));
        let op = Operation::new("helper", location("a.py", 9, CodeElementType::MethodDeclaration));
        model.add_operation(op.clone());
        model.add_operation(op);

        assert_eq!(model.number_of_classes(), 1);
        assert_eq!(model.operations().len(), 1);
        assert!(model.is_python());
    }

    #[test]
    fn test_all_operations_lists_standalone_first() {
        let mut model = CodeModel::new(None);
        model.add_class(class("a.py", "A", 0));
        model.add_operation(Operation::new(
            "main",
            location("b.py", 0, CodeElementType::MethodDeclaration),
        ));

        let names: Vec<String> = model.all_operations().map(|op| op.qualified_name()).collect();
        assert_eq!(names, vec!["main".to_string(), "A.run".to_string()]);
        assert_eq!(model.operations_in_file("a.py").len(), 1);
    }

    #[test]
    fn test_per_file_queries() {
        let mut model = CodeModel::new(None);
        model.add_class(class("a.py", "A", 0));
        model.add_class(class("a.py", "B", 10));
        model.add_class(class("c.py", "C", 0));
        model.add_import(
            "a.py",
            Import::new("os.path", ImportKind::Single, location("a.py", 0, CodeElementType::ImportDeclaration)),
        );
        model.set_package("a.py", "a");
        model.add_source("a.py", "class A: ...");

        assert_eq!(model.classes_in_file("a.py").len(), 2);
        assert_eq!(model.classes_by_package("pkg").len(), 3);
        assert_eq!(model.imports("a.py").len(), 1);
        assert!(model.imports("missing.py").is_empty());
        assert!(model.comments("a.py").is_empty());
        assert_eq!(model.package("a.py"), Some("a"));
        assert_eq!(model.source("a.py"), Some("class A: ..."));

        let per_file = model.classes_per_file();
        assert_eq!(per_file.get("a.py"), Some(&2));
        assert_eq!(per_file.get("c.py"), Some(&1));
    }

    #[test]
    fn test_out_of_class_definitions_are_linked() {
        let mut model = CodeModel::new(Some(SupportedLanguage::Cpp));
        let mut class = Class::new(
            "counter",
            "Counter",
            location("counter.hpp", 0, CodeElementType::ClassDeclaration),
        );
        class.add_operation(Operation::new(
            "tick",
            location("counter.hpp", 2, CodeElementType::MethodDeclaration),
        ));
        class.add_attribute(crate::model::Attribute::new(
            "count",
            crate::model::Type::new("int"),
            location("counter.hpp", 3, CodeElementType::FieldDeclaration),
        ));
        model.add_class(class);

        let mut definition = Operation::new(
            "tick",
            location("counter.cpp", 5, CodeElementType::MethodDeclaration),
        );
        definition.class_name = Some("Counter".to_string());
        definition.body = Some("{ ++count; }".to_string());
        model.add_operation(definition);
        let mut orphan = Operation::new(
            "reset",
            location("counter.cpp", 9, CodeElementType::MethodDeclaration),
        );
        orphan.class_name = Some("Counter".to_string());
        orphan.body = Some("{}".to_string());
        model.add_operation(orphan);
        model.defer_initializer(StaticInitializer {
            class_name: "Counter".to_string(),
            attribute_name: "count".to_string(),
            value: "0".to_string(),
        });

        model.link_out_of_class_members();

        let class = model.class("Counter").unwrap();
        assert_eq!(class.operation("tick").unwrap().body.as_deref(), Some("{ ++count; }"));
        assert_eq!(class.attribute("count").unwrap().initial_value.as_deref(), Some("0"));
        assert_eq!(model.operations().len(), 1);
        assert_eq!(model.operations()[0].name, "reset");
        assert!(model.deferred_initializers().is_empty());
    }

    #[test]
    fn test_merge_is_append_only() {
        let mut left = CodeModel::new(Some(SupportedLanguage::Cpp));
        left.add_class(class("a.cpp", "A", 0));
        left.add_source("a.cpp", "class A {};");

        let mut right = CodeModel::new(Some(SupportedLanguage::Python));
        right.add_class(class("a.cpp", "A", 0));
        right.add_class(class("b.cpp", "B", 0));
        right.add_source("b.cpp", "class B {};");

        left.merge(right);
        assert_eq!(left.language(), Some(SupportedLanguage::Cpp));
        assert_eq!(left.number_of_classes(), 2);
        assert_eq!(left.source_paths(), vec!["a.cpp", "b.cpp"]);
    }
}
