mod memory;

#[cfg(feature = "hdf5")]
mod h5;

pub use memory::MemoryContainer;

#[cfg(feature = "hdf5")]
pub use h5::Hdf5Container;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

/// 分层结果容器（只读）
/// 不同存储后端需要实现这个 trait，路径以 "/" 分隔
pub trait ResultContainer: std::fmt::Debug {
    /// 读取完整数据集，不存在时返回 MissingData
    fn dataset(&self, path: &str) -> MapperResult<Dataset>;

    /// 检查路径是否存在
    fn contains(&self, path: &str) -> bool;

    /// 容器描述（用于日志和错误信息）
    fn describe(&self) -> String;
}

/// 数据集的取值，按存储类型区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    /// 未解码的字节串（外部工具以字节形式存储文本）
    Bytes(Vec<Vec<u8>>),
}

impl DatasetValues {
    pub fn len(&self) -> usize {
        match self {
            DatasetValues::Int(v) => v.len(),
            DatasetValues::Float(v) => v.len(),
            DatasetValues::Text(v) => v.len(),
            DatasetValues::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 完整读入内存的 n 维数据集，按 C 顺序存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: Vec<usize>,
    pub values: DatasetValues,
}

impl Dataset {
    pub fn new(shape: Vec<usize>, values: DatasetValues) -> MapperResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(MapperError::ShapeMismatch(format!(
                "形状 {:?} 需要 {} 个元素，但提供了 {} 个",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn int(shape: Vec<usize>, values: Vec<i64>) -> MapperResult<Self> {
        Self::new(shape, DatasetValues::Int(values))
    }

    pub fn float(shape: Vec<usize>, values: Vec<f64>) -> MapperResult<Self> {
        Self::new(shape, DatasetValues::Float(values))
    }

    pub fn bytes(shape: Vec<usize>, values: Vec<Vec<u8>>) -> MapperResult<Self> {
        Self::new(shape, DatasetValues::Bytes(values))
    }

    pub fn to_i64_array(&self, path: &str) -> MapperResult<ArrayD<i64>> {
        match &self.values {
            DatasetValues::Int(values) => self.shaped(values.clone()),
            _ => Err(MapperError::DataType {
                path: path.to_string(),
                expected: "整数".to_string(),
            }),
        }
    }

    /// 整数数据集也可以按浮点读取
    pub fn to_f64_array(&self, path: &str) -> MapperResult<ArrayD<f64>> {
        match &self.values {
            DatasetValues::Float(values) => self.shaped(values.clone()),
            DatasetValues::Int(values) => self.shaped(values.iter().map(|&v| v as f64).collect()),
            _ => Err(MapperError::DataType {
                path: path.to_string(),
                expected: "浮点数".to_string(),
            }),
        }
    }

    /// 读取文本，字节串按 UTF-8 解码并去掉末尾的 NUL 填充
    pub fn to_strings(&self, path: &str) -> MapperResult<Vec<String>> {
        match &self.values {
            DatasetValues::Text(values) => Ok(values.clone()),
            DatasetValues::Bytes(values) => values
                .iter()
                .map(|raw| {
                    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                    String::from_utf8(raw[..end].to_vec()).map_err(|e| MapperError::InvalidText {
                        path: path.to_string(),
                        details: e.to_string(),
                    })
                })
                .collect(),
            _ => Err(MapperError::DataType {
                path: path.to_string(),
                expected: "文本".to_string(),
            }),
        }
    }

    fn shaped<T>(&self, values: Vec<T>) -> MapperResult<ArrayD<T>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), values)
            .map_err(|e| MapperError::ShapeMismatch(e.to_string()))
    }
}

/// 去掉首尾的 "/"，统一路径写法
pub(crate) fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_shape_is_checked() {
        assert!(Dataset::int(vec![2, 2], vec![1, 2, 3]).is_err());
        let ds = Dataset::int(vec![2, 2], vec![1, 2, 3, 4]).unwrap();
        assert_eq!(ds.to_i64_array("x").unwrap().shape(), &[2, 2]);
    }

    #[test]
    fn test_int_dataset_reads_as_float() {
        let ds = Dataset::int(vec![3], vec![4, 5, 6]).unwrap();
        let values = ds.to_f64_array("DIMENSIONS").unwrap();
        assert_eq!(values.as_slice().unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_float_dataset_is_not_int() {
        let ds = Dataset::float(vec![1], vec![0.5]).unwrap();
        assert!(matches!(
            ds.to_i64_array("SPACING"),
            Err(MapperError::DataType { .. })
        ));
    }

    #[test]
    fn test_bytes_are_decoded_and_nul_trimmed() {
        let ds = Dataset::bytes(vec![2, 1], vec![b"Invalid Phase".to_vec(), b"Primary\0\0".to_vec()])
            .unwrap();
        assert_eq!(ds.to_strings("PhaseName").unwrap(), vec!["Invalid Phase", "Primary"]);
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let ds = Dataset::bytes(vec![1], vec![vec![0xff, 0xfe]]).unwrap();
        assert!(matches!(
            ds.to_strings("PhaseName"),
            Err(MapperError::InvalidText { .. })
        ));
    }

    #[test]
    fn test_untagged_values_from_json() {
        let ds: Dataset = serde_json::from_str(r#"{"shape": [2], "values": [1.5, 2.5]}"#).unwrap();
        assert_eq!(ds.values, DatasetValues::Float(vec![1.5, 2.5]));
        let ds: Dataset = serde_json::from_str(r#"{"shape": [1], "values": ["Primary"]}"#).unwrap();
        assert_eq!(ds.values, DatasetValues::Text(vec!["Primary".to_string()]));
    }
}
