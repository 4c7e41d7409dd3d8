//! 类型与可见性

use serde::{Deserialize, Serialize};
use std::fmt;

/// 类型名称被视为基本类型的集合（比较时忽略大小写）
const PRIMITIVE_TYPES: &[&str] = &[
    "byte", "short", "int", "long", "float", "double", "boolean", "char", "complex", "size_t",
    "wchar_t",
];

/// 语法层面的类型描述
///
/// 只记录源码中出现的类型提示，不做语义解析。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    /// 泛型或模板参数
    pub type_parameters: Vec<Type>,
    pub annotations: Vec<String>,
    pub array_dimensions: usize,
    pub is_collection: bool,
    pub is_map: bool,
    pub is_varargs: bool,
}

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_parameters(name: impl Into<String>, type_parameters: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            type_parameters,
            ..Self::default()
        }
    }

    pub fn void() -> Self {
        Self::new("void")
    }

    pub fn array(element: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: element.into(),
            array_dimensions: dimensions,
            ..Self::default()
        }
    }

    pub fn collection(name: impl Into<String>, element: Type) -> Self {
        Self {
            name: name.into(),
            type_parameters: vec![element],
            is_collection: true,
            ..Self::default()
        }
    }

    pub fn map(name: impl Into<String>, key: Type, value: Type) -> Self {
        Self {
            name: name.into(),
            type_parameters: vec![key, value],
            is_map: true,
            ..Self::default()
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0
    }

    pub fn is_void(&self) -> bool {
        self.name == "void"
    }

    pub fn is_primitive(&self) -> bool {
        let lower = self.name.to_lowercase();
        PRIMITIVE_TYPES.contains(&lower.as_str())
    }

    /// 带点号的非基本类型名称中的包名部分
    pub fn package_name(&self) -> Option<&str> {
        if self.is_primitive() {
            return None;
        }
        self.name.rsplit_once('.').map(|(package, _)| package)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_parameters == other.type_parameters
            && self.array_dimensions == other.array_dimensions
            && self.is_varargs == other.is_varargs
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_parameters.is_empty() {
            let parameters: Vec<String> =
                self.type_parameters.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", parameters.join(", "))?;
        }
        for _ in 0..self.array_dimensions {
            f.write_str("[]")?;
        }
        if self.is_varargs {
            f.write_str("...")?;
        }
        Ok(())
    }
}

/// 成员可见性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    /// 语言默认（无显式修饰）
    Package,
}

impl Visibility {
    /// Python 约定：`__` 前缀为私有，`_` 前缀为受保护
    pub fn from_python_name(name: &str) -> Self {
        if name.starts_with("__") {
            Visibility::Private
        } else if name.starts_with('_') {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    /// JavaScript 约定：`#` 前缀为私有，其余均为公开
    pub fn from_javascript_name(name: &str) -> Self {
        if name.starts_with('#') {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    /// 解析 C++ 访问说明符文本（可能带冒号）
    pub fn from_cpp_specifier(text: &str) -> Option<Self> {
        match text.trim().trim_end_matches(':').trim() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
            Visibility::Package => "package",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Visibility::Private => 0,
            Visibility::Package => 1,
            Visibility::Protected => 2,
            Visibility::Public => 3,
        }
    }

    pub fn is_more_restrictive_than(&self, other: Visibility) -> bool {
        self.rank() < other.rank()
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_equality_is_structural() {
        let a = Type::with_parameters("List", vec![Type::new("int")]);
        let mut b = Type::with_parameters("List", vec![Type::new("int")]);
        b.annotations.push("NonNull".to_string());
        assert_eq!(a, b);

        let c = Type::with_parameters("List", vec![Type::new("str")]);
        assert_ne!(a, c);
        assert_ne!(Type::new("int"), Type::array("int", 1));
    }

    #[test]
    fn test_type_flags() {
        assert!(Type::new("int").is_primitive());
        assert!(Type::new("Size_T").is_primitive());
        assert!(!Type::new("str").is_primitive());
        assert!(Type::void().is_void());
        assert!(Type::array("char", 2).is_array());
        assert_eq!(Type::new("os.path.Path").package_name(), Some("os.path"));
        assert_eq!(Type::new("object").package_name(), None);
    }

    #[test]
    fn test_type_display() {
        let map = Type::map("std::map", Type::new("int"), Type::new("std::string"));
        assert_eq!(map.to_string(), "std::map<int, std::string>");
        assert_eq!(Type::array("int", 2).to_string(), "int[][]");

        let mut varargs = Type::new("any");
        varargs.is_varargs = true;
        assert_eq!(varargs.to_string(), "any...");
    }

    #[test]
    fn test_visibility_conventions() {
        assert_eq!(Visibility::from_python_name("__secret"), Visibility::Private);
        assert_eq!(Visibility::from_python_name("_internal"), Visibility::Protected);
        assert_eq!(Visibility::from_python_name("run"), Visibility::Public);
        assert_eq!(Visibility::from_javascript_name("#count"), Visibility::Private);
        assert_eq!(Visibility::from_javascript_name("_count"), Visibility::Public);
        assert_eq!(
            Visibility::from_cpp_specifier("protected:"),
            Some(Visibility::Protected)
        );
        assert_eq!(Visibility::from_cpp_specifier("friend"), None);
        assert!(Visibility::Private.is_more_restrictive_than(Visibility::Public));
    }
}
