mod dream3d;

use std::path::Path;

pub use dream3d::{ContainerLayout, Dream3dParser};

#[cfg(feature = "hdf5")]
use crate::container::Hdf5Container;
use crate::container::{MemoryContainer, ResultContainer};
use crate::error::{MapperError, MapperResult};
use crate::volume_element::VolumeElement;

/// 可读取的结果文件扩展名
/// HDF5 后端需要启用 `hdf5` feature
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions = vec!["json"];
    if cfg!(feature = "hdf5") {
        extensions.extend(["dream3d", "h5", "hdf5"]);
    }
    extensions
}

/// 根据文件扩展名选择后端打开结果容器
pub fn open_container(path: &Path) -> MapperResult<Box<dyn ResultContainer>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(Box::new(MemoryContainer::from_json_file(path)?)),
        #[cfg(feature = "hdf5")]
        "dream3d" | "h5" | "hdf5" => Ok(Box::new(Hdf5Container::open(path)?)),
        _ => Err(MapperError::UnsupportedFormat {
            file: path.display().to_string(),
            supported: supported_extensions(),
        }),
    }
}

/// 打开结果文件并解析为体积单元，文件在返回前关闭
pub fn parse_volume_element(path: &Path, layout: &ContainerLayout) -> MapperResult<VolumeElement> {
    let container = open_container(path)?;
    Dream3dParser::new(layout.clone()).parse(container.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension() {
        let err = open_container(Path::new("result.vtk")).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_open_json_container() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("result.json");
        std::fs::write(&path, r#"{"datasets": {}}"#).unwrap();

        let container = open_container(&path).unwrap();
        assert!(format!("{:?}", container).contains("MemoryContainer"));
        assert!(!container.contains("DataContainers"));
    }

    #[test]
    fn test_json_is_always_supported() {
        assert!(supported_extensions().contains(&"json"));
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn test_dream3d_needs_hdf5_feature() {
        let err = open_container(Path::new("pipeline.dream3d")).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedFormat { .. }));
    }
}
