//! 类

use super::attribute::Attribute;
use super::element::{Annotation, Comment};
use super::index::LocationIndex;
use super::location::Location;
use super::operation::Operation;
use super::types::Visibility;
use serde::Serialize;

/// 类、结构体或接口
#[derive(Debug, Clone, Serialize)]
pub struct Class {
    pub package_name: String,
    pub name: String,
    pub location: Location,
    pub operations: Vec<Operation>,
    pub attributes: Vec<Attribute>,
    /// 支持多继承
    pub superclasses: Vec<String>,
    pub interfaces: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub is_enum: bool,
    pub is_record: bool,
    pub is_inner_class: bool,
    pub is_template: bool,
    #[serde(skip)]
    operation_index: LocationIndex,
    #[serde(skip)]
    attribute_index: LocationIndex,
}

impl Class {
    pub fn new(package_name: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            package_name: package_name.into(),
            name: name.into(),
            location,
            operations: Vec::new(),
            attributes: Vec::new(),
            superclasses: Vec::new(),
            interfaces: Vec::new(),
            annotations: Vec::new(),
            comments: Vec::new(),
            visibility: Visibility::Public,
            is_abstract: false,
            is_interface: false,
            is_final: false,
            is_static: false,
            is_enum: false,
            is_record: false,
            is_inner_class: false,
            is_template: false,
            operation_index: LocationIndex::default(),
            attribute_index: LocationIndex::default(),
        }
    }

    /// 包名加类名；包名为空时只返回类名
    pub fn fully_qualified_name(&self) -> String {
        if self.package_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package_name, self.name)
        }
    }

    /// 加入操作并设置其所属类，重复的操作会被忽略
    pub fn add_operation(&mut self, mut operation: Operation) {
        operation.class_name = Some(self.name.clone());
        self.operation_index
            .push_unique(&mut self.operations, operation, |op| &op.location);
    }

    pub fn add_attribute(&mut self, mut attribute: Attribute) {
        attribute.class_name = Some(self.name.clone());
        self.attribute_index
            .push_unique(&mut self.attributes, attribute, |attr| &attr.location);
    }

    pub fn add_superclass(&mut self, superclass: impl Into<String>) {
        let superclass = superclass.into();
        if !self.superclasses.contains(&superclass) {
            self.superclasses.push(superclass);
        }
    }

    pub fn add_interface(&mut self, interface: impl Into<String>) {
        let interface = interface.into();
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
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

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn operation_mut(&mut self, name: &str) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|attr| attr.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.package_name == other.package_name
            && self.name == other.name
            && self.location == other.location
    }
}

impl Eq for Class {}
