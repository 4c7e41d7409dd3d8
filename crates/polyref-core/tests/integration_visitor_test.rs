//! 多语言模型构建集成测试

mod test_data;

use polyref_core::model::{CommentKind, ImportKind, Visibility};
use polyref_core::{CodeModel, ModelReader, ReaderConfig, SupportedLanguage, Type};
use pretty_assertions::assert_eq;
use test_data::{mixed_project, sources};

fn read_mixed() -> CodeModel {
    ModelReader::new().read(&mixed_project()).unwrap()
}

#[test]
fn test_mixed_project_overview() {
    let model = read_mixed();

    assert_eq!(model.number_of_files(), 4);
    assert_eq!(
        model.source_paths(),
        vec![
            "app/models.py",
            "native/counter.cpp",
            "native/counter.hpp",
            "web/cart.js"
        ]
    );
    // 两个 C++ 文件占多数
    assert_eq!(model.language(), Some(SupportedLanguage::Cpp));
    assert_eq!(model.number_of_classes(), 3);

    let standalone: Vec<&str> = model.operations().iter().map(|op| op.name.as_str()).collect();
    assert_eq!(standalone, vec!["interest", "clamp", "checkout"]);
}

#[test]
fn test_python_module_extraction() {
    let model = read_mixed();
    assert_eq!(model.package("app/models.py"), Some("app.models"));

    let account = model.class("Account").unwrap();
    assert_eq!(account.comments[0].kind, CommentKind::Doc);
    assert!(account.attribute("rate").unwrap().is_static);
    assert!(account.attribute("balance").is_some());

    let init = account.operation("__init__").unwrap();
    assert!(init.is_constructor);
    let balance = init.parameter("balance").unwrap();
    assert_eq!(balance.parameter_type, Type::new("float"));
    assert_eq!(balance.default_value.as_deref(), Some("0.0"));

    let deposit = account.operation("deposit").unwrap();
    assert_eq!(deposit.qualified_name(), "Account.deposit");
    assert_eq!(
        deposit.body.as_deref().map(str::trim),
        Some("self.balance += amount\n        return self.balance")
    );

    assert_eq!(model.operations_in_file("app/models.py").len(), 3);
}

#[test]
fn test_javascript_module_extraction() {
    let model = read_mixed();

    let imports = model.imports("web/cart.js");
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].name, "./pricing.total");
    assert_eq!(imports[0].kind, ImportKind::Single);

    let cart = model.class("Cart").unwrap();
    assert!(cart.operation("constructor").unwrap().is_constructor);
    let add = cart.operation("add").unwrap();
    assert_eq!(add.parameters[1].default_value.as_deref(), Some("1"));
    assert_eq!(add.parameters[1].parameter_type, Type::new("any"));

    let checkout = model
        .operations()
        .iter()
        .find(|op| op.name == "checkout")
        .unwrap();
    assert!(checkout.is_standalone());
    assert_eq!(checkout.location.file_path(), "web/cart.js");
}

#[test]
fn test_cpp_header_and_definition_are_linked() {
    let model = read_mixed();
    let counter = model.class("Counter").unwrap();

    let tick = counter.operation("tick").unwrap();
    assert_eq!(
        tick.body.as_deref().map(str::trim),
        Some("{\n    count += step;\n}")
    );
    assert!(
        model
            .operations()
            .iter()
            .all(|op| op.name != "tick"),
        "linked definition must not stay standalone"
    );

    let value = counter.operation("value").unwrap();
    assert!(value.is_const);
    assert_eq!(counter.attribute("count").unwrap().visibility, Visibility::Private);

    let imports: Vec<&str> = model
        .imports("native/counter.cpp")
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(imports, vec!["counter.hpp"]);
}

#[test]
fn test_sequential_and_parallel_reads_agree() {
    let files = mixed_project();
    let parallel = ModelReader::with_config(ReaderConfig::new().with_threads(4))
        .read(&files)
        .unwrap();
    let sequential = ModelReader::with_config(ReaderConfig::new().with_parallel(false))
        .read(&files)
        .unwrap();

    let names = |model: &CodeModel| -> Vec<String> {
        model.all_operations().map(|op| op.qualified_name()).collect()
    };
    assert_eq!(names(&parallel), names(&sequential));
    assert_eq!(parallel.language(), sequential.language());
    assert_eq!(parallel.number_of_classes(), sequential.number_of_classes());
}

#[test]
fn test_unsupported_files_are_reported_not_fatal() {
    let files = sources(&[
        ("README.md", "# docs"),
        ("main.py", "def main():\n    pass\n"),
        ("Makefile", "all:\n\tcc main.c\n"),
    ]);
    let outcome = ModelReader::new().build(&files).unwrap();

    assert_eq!(outcome.skipped, vec!["Makefile".to_string(), "README.md".to_string()]);
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.model.operations().len(), 1);
    assert_eq!(outcome.model.language(), Some(SupportedLanguage::Python));
    assert_eq!(outcome.stats.files_processed, 1);
    assert_eq!(outcome.stats.skipped_files, 2);
}
