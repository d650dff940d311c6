use std::path::Path;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};

use super::{Dataset, DatasetValues, ResultContainer, normalize_path};
use crate::error::{MapperError, MapperResult};

/// 定长字符串读取时的最大长度
const FIXED_TEXT_CAPACITY: usize = 1024;

/// HDF5 文件后端（`.dream3d` 文件即 HDF5）
/// 文件在构造时打开，随值一起释放
#[derive(Debug)]
pub struct Hdf5Container {
    file: hdf5::File,
}

impl Hdf5Container {
    pub fn open(path: impl AsRef<Path>) -> MapperResult<Self> {
        let file = hdf5::File::open(path)?;
        Ok(Self { file })
    }

    /// 逐级检查路径，任一级缺失都返回 MissingData
    fn locate(&self, path: &str) -> MapperResult<hdf5::Dataset> {
        let path = normalize_path(path);
        let components: Vec<&str> = path.split('/').collect();
        let Some((last, parents)) = components.split_last() else {
            return Err(MapperError::missing(path));
        };

        let mut group: hdf5::Group = (*self.file).clone();
        let mut walked = String::new();
        for name in parents {
            walked.push('/');
            walked.push_str(name);
            if !group.link_exists(name) {
                return Err(MapperError::missing(walked));
            }
            group = group.group(name)?;
        }
        if !group.link_exists(last) {
            return Err(MapperError::missing(path));
        }
        Ok(group.dataset(last)?)
    }
}

impl ResultContainer for Hdf5Container {
    fn dataset(&self, path: &str) -> MapperResult<Dataset> {
        let dataset = self.locate(path)?;
        let shape = dataset.shape();
        let values = match dataset.dtype()?.to_descriptor()? {
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
                DatasetValues::Int(dataset.read_raw::<i64>()?)
            }
            TypeDescriptor::Float(_) => DatasetValues::Float(dataset.read_raw::<f64>()?),
            TypeDescriptor::VarLenAscii => DatasetValues::Text(
                dataset
                    .read_raw::<VarLenAscii>()?
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
            TypeDescriptor::VarLenUnicode => DatasetValues::Text(
                dataset
                    .read_raw::<VarLenUnicode>()?
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
            TypeDescriptor::FixedAscii(_) => DatasetValues::Bytes(
                dataset
                    .read_raw::<FixedAscii<FIXED_TEXT_CAPACITY>>()?
                    .iter()
                    .map(|s| s.as_bytes().to_vec())
                    .collect(),
            ),
            TypeDescriptor::FixedUnicode(_) => DatasetValues::Bytes(
                dataset
                    .read_raw::<FixedUnicode<FIXED_TEXT_CAPACITY>>()?
                    .iter()
                    .map(|s| s.as_bytes().to_vec())
                    .collect(),
            ),
            other => {
                return Err(MapperError::DataType {
                    path: path.to_string(),
                    expected: format!("整数、浮点或文本，实际为 {:?}", other),
                });
            }
        };
        Dataset::new(shape, values)
    }

    fn contains(&self, path: &str) -> bool {
        self.file.link_exists(normalize_path(path))
    }

    fn describe(&self) -> String {
        format!("HDF5 文件 {}", self.file.filename())
    }
}
