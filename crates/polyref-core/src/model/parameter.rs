//! 操作参数

use super::element::Annotation;
use super::location::Location;
use super::types::Type;
use crate::error::{PolyrefError, Result};
use serde::Serialize;
use std::fmt;

/// 参数方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterKind {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterKind {
    pub fn parse(kind: &str) -> Result<Self> {
        match kind.to_lowercase().as_str() {
            "in" => Ok(ParameterKind::In),
            "out" => Ok(ParameterKind::Out),
            "inout" => Ok(ParameterKind::InOut),
            other => Err(PolyrefError::InvalidModel(format!(
                "unknown parameter kind '{other}'"
            ))),
        }
    }
}

/// 操作的形式参数，归属于唯一的 [`Operation`](super::Operation)
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub parameter_type: Type,
    pub location: Location,
    pub annotations: Vec<Annotation>,
    pub kind: ParameterKind,
    pub default_value: Option<String>,
    pub is_varargs: bool,
    pub is_final: bool,
    pub is_keyword_only: bool,
    pub is_const: bool,
    pub is_pointer: bool,
    pub is_volatile: bool,
    is_reference: bool,
    is_rvalue_reference: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, parameter_type: Type, location: Location) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            location,
            annotations: Vec::new(),
            kind: ParameterKind::In,
            default_value: None,
            is_varargs: false,
            is_final: false,
            is_keyword_only: false,
            is_const: false,
            is_pointer: false,
            is_volatile: false,
            is_reference: false,
            is_rvalue_reference: false,
        }
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }

    /// 按字符串设置参数方向，未知取值视为构造错误
    pub fn set_kind_str(&mut self, kind: &str) -> Result<()> {
        self.kind = ParameterKind::parse(kind)?;
        Ok(())
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn is_rvalue_reference(&self) -> bool {
        self.is_rvalue_reference
    }

    /// 左值引用与右值引用互斥
    pub fn set_reference(&mut self, reference: bool) {
        self.is_reference = reference;
        if reference {
            self.is_rvalue_reference = false;
        }
    }

    pub fn set_rvalue_reference(&mut self, rvalue_reference: bool) {
        self.is_rvalue_reference = rvalue_reference;
        if rvalue_reference {
            self.is_reference = false;
        }
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    /// 渲染参数签名，例如 `const std::string& name = ""`
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        for annotation in &self.annotations {
            signature.push_str(&annotation.to_string());
            signature.push(' ');
        }
        if self.is_const {
            signature.push_str("const ");
        }
        if self.is_volatile {
            signature.push_str("volatile ");
        }
        if self.is_final {
            signature.push_str("final ");
        }
        signature.push_str(&self.parameter_type.to_string());
        if self.is_pointer {
            signature.push('*');
        }
        if self.is_reference {
            signature.push('&');
        } else if self.is_rvalue_reference {
            signature.push_str("&&");
        }
        if self.is_varargs && !self.parameter_type.is_varargs {
            signature.push_str("...");
        }
        signature.push(' ');
        signature.push_str(&self.name);
        if let Some(default_value) = &self.default_value {
            signature.push_str(" = ");
            signature.push_str(default_value);
        }
        signature
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameter_type == other.parameter_type
            && self.location == other.location
    }
}

impl Eq for Parameter {}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeElementType;
    use crate::parser::Point;
    use pretty_assertions::assert_eq;

    fn param(name: &str, type_name: &str) -> Parameter {
        let location = Location::new(
            "a.cpp",
            Point::new(0, 4),
            Point::new(0, 9),
            CodeElementType::ParameterDeclaration,
        )
        .unwrap();
        Parameter::new(name, Type::new(type_name), location)
    }

    #[test]
    fn test_kind_parsing() {
        let mut parameter = param("x", "int");
        parameter.set_kind_str("InOut").unwrap();
        assert_eq!(parameter.kind, ParameterKind::InOut);

        let err = parameter.set_kind_str("sideways").unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_reference_flags_are_exclusive() {
        let mut parameter = param("value", "T");
        parameter.set_reference(true);
        parameter.set_rvalue_reference(true);
        assert!(parameter.is_rvalue_reference());
        assert!(!parameter.is_reference());

        parameter.set_reference(true);
        assert!(parameter.is_reference());
        assert!(!parameter.is_rvalue_reference());
    }

    #[test]
    fn test_signature_rendering() {
        let mut parameter = param("name", "std::string").with_default(Some("\"\"".to_string()));
        parameter.is_const = true;
        parameter.set_reference(true);
        assert_eq!(parameter.signature(), "const std::string& name = \"\"");

        let mut pointer = param("data", "char");
        pointer.is_pointer = true;
        assert_eq!(pointer.to_string(), "char* data");
    }

    #[test]
    fn test_equality_ignores_defaults() {
        let a = param("x", "int");
        let b = param("x", "int").with_default(Some("0".to_string()));
        assert_eq!(a, b);
        assert_ne!(a, param("y", "int"));
        assert_ne!(a, param("x", "float"));
    }
}
