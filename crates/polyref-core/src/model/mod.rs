//! 统一代码模型
//!
//! 与语言无关的结构化表示：类、操作、参数、属性、导入与注释。

pub mod attribute;
pub mod class;
pub mod code_model;
pub mod element;
mod index;
pub mod location;
pub mod operation;
pub mod parameter;
pub mod types;

pub use attribute::Attribute;
pub use class::Class;
pub use code_model::{CodeModel, StaticInitializer};
pub use element::{Annotation, Comment, CommentKind, Import, ImportKind};
pub use location::{CodeElementType, Location};
pub use operation::Operation;
pub use parameter::{Parameter, ParameterKind};
pub use types::{Type, Visibility};
