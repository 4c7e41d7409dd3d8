//! 操作（函数与方法）

use super::element::{Annotation, Comment};
use super::location::Location;
use super::parameter::Parameter;
use super::types::{Type, Visibility};
use serde::Serialize;
use std::fmt;

/// 函数或方法，可独立存在也可归属某个类
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub name: String,
    pub location: Location,
    pub class_name: Option<String>,
    pub return_type: Option<Type>,
    pub parameters: Vec<Parameter>,
    /// 原始函数体文本，按行切分为语句
    pub body: Option<String>,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_synchronized: bool,
    pub is_native: bool,
    pub is_default: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_virtual: bool,
    pub is_const: bool,
    pub is_inline: bool,
    pub is_noexcept: bool,
    pub is_template: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            class_name: None,
            return_type: None,
            parameters: Vec::new(),
            body: None,
            visibility: Visibility::Public,
            annotations: Vec::new(),
            comments: Vec::new(),
            is_static: false,
            is_abstract: false,
            is_final: false,
            is_constructor: false,
            is_destructor: false,
            is_synchronized: false,
            is_native: false,
            is_default: false,
            is_async: false,
            is_generator: false,
            is_virtual: false,
            is_const: false,
            is_inline: false,
            is_noexcept: false,
            is_template: false,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| a.name == name || a.simple_name() == name)
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        if !self.annotations.contains(&annotation) {
            self.annotations.push(annotation);
        }
    }

    pub fn add_comment(&mut self, comment: Comment) {
        if !self.comments.contains(&comment) {
            self.comments.push(comment);
        }
    }

    pub fn is_instance_method(&self) -> bool {
        !self.is_static && self.class_name.is_some()
    }

    pub fn is_class_method(&self) -> bool {
        self.is_static && self.class_name.is_some()
    }

    pub fn is_standalone(&self) -> bool {
        self.class_name.is_none()
    }

    /// 带类名前缀的名称，如 `Shape.area`
    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class_name) => format!("{class_name}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// 渲染操作签名
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        for annotation in &self.annotations {
            signature.push_str(&annotation.to_string());
            signature.push('\n');
        }
        signature.push_str(self.visibility.as_str());
        signature.push(' ');
        let modifiers = [
            (self.is_static, "static "),
            (self.is_abstract, "abstract "),
            (self.is_final, "final "),
            (self.is_virtual, "virtual "),
            (self.is_inline, "inline "),
            (self.is_async, "async "),
        ];
        for (enabled, keyword) in modifiers {
            if enabled {
                signature.push_str(keyword);
            }
        }
        if !self.is_constructor {
            if let Some(return_type) = &self.return_type {
                signature.push_str(&return_type.to_string());
                signature.push(' ');
            }
        }
        signature.push_str(&self.name);
        let parameters: Vec<String> = self.parameters.iter().map(Parameter::signature).collect();
        signature.push('(');
        signature.push_str(&parameters.join(", "));
        signature.push(')');
        if self.is_const {
            signature.push_str(" const");
        }
        if self.is_noexcept {
            signature.push_str(" noexcept");
        }
        signature
    }
}

/// 名称、所属类、参数列表与位置全部相同才视为同一操作
impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.class_name == other.class_name
            && self.parameters == other.parameters
            && self.location == other.location
    }
}

impl Eq for Operation {}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
