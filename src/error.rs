use thiserror::Error;

/// 映射层统一错误类型
/// 所有错误在检测点立即返回，原样交给调用方（工作流引擎）
#[derive(Debug, Error)]
pub enum MapperError {
    /// 网格维度为 0，或分辨率计算结果非有限/非正
    #[error("几何参数无效: {0}")]
    InvalidGeometry(String),

    /// 结果容器中缺少预期的组或数据集
    #[error("结果容器缺少数据: {path}")]
    MissingData { path: String },

    /// 特征 ID 或相索引没有对应的数据行
    #[error("索引越界: {what} 的值 {value} 超出范围 (可用行数 {available})")]
    IndexRange {
        what: String,
        value: i64,
        available: usize,
    },

    /// 四元数模长为 0，无法归一化
    #[error("第 {index} 个四元数模长为 0，无法转换取向")]
    DegenerateOrientation { index: usize },

    /// 数据集存在但类型与预期不符
    #[error("{path} 的数据类型不符，期望 {expected}")]
    DataType { path: String, expected: String },

    #[error("数据形状不匹配: {0}")]
    ShapeMismatch(String),

    #[error("增量索引 {requested} 超出范围 (共 {available} 个增量)")]
    IncrementOutOfRange { requested: isize, available: usize },

    /// 字节串无法解码为文本
    #[error("{path} 中的文本无法解码: {details}")]
    InvalidText { path: String, details: String },

    /// 没有可用后端读取该扩展名的文件
    #[error("不支持的结果文件格式: {file} (支持的扩展名: {supported:?})")]
    UnsupportedFormat {
        file: String,
        supported: Vec<&'static str>,
    },

    #[error("映射函数缺少输入: {0}")]
    MissingInput(String),

    #[error("未注册的映射函数: {0}")]
    UnknownMapper(String),

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 错误: {0}")]
    Hdf5(#[from] hdf5::Error),
}

pub type MapperResult<T> = Result<T, MapperError>;

impl MapperError {
    pub fn missing(path: impl Into<String>) -> Self {
        MapperError::MissingData { path: path.into() }
    }
}
