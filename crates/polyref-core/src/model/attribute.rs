//! 类属性

use super::element::{Annotation, Comment};
use super::location::Location;
use super::types::{Type, Visibility};
use serde::Serialize;

/// 类的字段或属性
///
/// 遍历类体时属性可能暂时没有所属类，加入类后由 [`Class::add_attribute`](super::Class::add_attribute)
/// 设置 `class_name`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: Type,
    pub location: Location,
    pub class_name: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_volatile: bool,
    pub is_transient: bool,
    pub is_const: bool,
    pub is_readonly: bool,
    pub initial_value: Option<String>,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: Type, location: Location) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            location,
            class_name: None,
            visibility: Visibility::Public,
            is_static: false,
            is_final: false,
            is_volatile: false,
            is_transient: false,
            is_const: false,
            is_readonly: false,
            initial_value: None,
            annotations: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn with_initial_value(mut self, initial_value: Option<String>) -> Self {
        self.initial_value = initial_value;
        self
    }

    /// 实例属性：非静态且已归属某个类
    pub fn is_instance_attribute(&self) -> bool {
        !self.is_static && self.class_name.is_some()
    }
}
