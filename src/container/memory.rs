use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Dataset, ResultContainer, normalize_path};
use crate::error::{MapperError, MapperResult};

/// 内存中的结果容器
/// 路径 -> 数据集，可从 JSON 文件加载（测试夹具或调用方已读入的数据）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryContainer {
    datasets: BTreeMap<String, Dataset>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, dataset: Dataset) {
        self.datasets.insert(normalize_path(path).to_string(), dataset);
    }

    /// 链式插入
    pub fn with(mut self, path: &str, dataset: Dataset) -> Self {
        self.insert(path, dataset);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Dataset> {
        self.datasets.remove(normalize_path(path))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> MapperResult<Self> {
        let file = File::open(path.as_ref())?;
        let container = serde_json::from_reader(BufReader::new(file))?;
        Ok(container)
    }
}

impl ResultContainer for MemoryContainer {
    fn dataset(&self, path: &str) -> MapperResult<Dataset> {
        self.datasets
            .get(normalize_path(path))
            .cloned()
            .ok_or_else(|| MapperError::missing(path))
    }

    /// 数据集路径或其任一上级组存在即为 true
    fn contains(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.datasets.keys().any(|key| {
            key == path || (key.starts_with(path) && key[path.len()..].starts_with('/'))
        })
    }

    fn describe(&self) -> String {
        format!("内存容器 ({} 个数据集)", self.datasets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dataset() {
        let container = MemoryContainer::new();
        let err = container.dataset("/DataContainers/x").unwrap_err();
        assert!(matches!(err, MapperError::MissingData { .. }));
    }

    #[test]
    fn test_group_lookup() {
        let container = MemoryContainer::new()
            .with("/A/B/C", Dataset::int(vec![1], vec![1]).unwrap());
        assert!(container.contains("A/B"));
        assert!(container.contains("/A/B/C"));
        assert!(!container.contains("A/Bx"));
        assert!(container.dataset("A/B/C/").is_ok());
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("container.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"datasets": {{"G/DIMENSIONS": {{"shape": [3], "values": [2, 3, 4]}}}}}}"#
        )
        .unwrap();
        drop(file);

        let container = MemoryContainer::from_json_file(&path).unwrap();
        let dims = container.dataset("G/DIMENSIONS").unwrap();
        assert_eq!(dims.shape, vec![3]);
    }

    #[test]
    fn test_floats_survive_json_file_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("container.json");
        let values = vec![15.258569717407227, 15.949015617370605, 15.441672325134277, 0.1];
        let container =
            MemoryContainer::new().with("G/EulerAngles", Dataset::float(vec![4], values.clone()).unwrap());
        std::fs::write(&path, serde_json::to_string(&container).unwrap()).unwrap();

        let loaded = MemoryContainer::from_json_file(&path).unwrap();
        let read = loaded.dataset("G/EulerAngles").unwrap().to_f64_array("G/EulerAngles").unwrap();
        assert_eq!(read.iter().copied().collect::<Vec<_>>(), values);
    }
}
