//! DREAM.3D 体积单元映射层
//!
//! 在工作流引擎与 DREAM.3D 之间转换数据：写出流水线描述和辅助文本文件，
//! 并把 DREAM.3D 的结果文件解析为体积单元。

pub mod config;
pub mod container;
pub mod error;
pub mod geometry;
pub mod index_remap;
pub mod mappers;
pub mod orientation;
pub mod parsers;
pub mod pipeline;
pub mod registry;
pub mod volume_element;
pub mod writers;

pub use config::MapperConfig;
pub use error::{MapperError, MapperResult};
pub use geometry::GridGeometry;
pub use mappers::TaskInputs;
pub use registry::{Mapper, MapperKey, MapperRegistry, MapperRole};
pub use volume_element::{FieldData, VolumeElement};
