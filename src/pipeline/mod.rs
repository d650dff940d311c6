//! 外部工具的过滤器流水线描述文档
//!
//! 文档是一个 JSON 对象：键 "0".."N-1" 依次为各过滤器的参数，
//! 最后的 "PipelineBuilder" 记录名称、过滤器数量和格式版本。

pub mod segmentation;
pub mod stats;
pub mod synthesis;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::MapperResult;

pub use segmentation::{AuxiliaryFiles, build_segmentation_pipeline};
pub use stats::StatsGeneratorConfig;
pub use synthesis::{SynthesisRequest, build_synthesis_pipeline};

/// (容器, 属性矩阵, 数组) 名称三元组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataArrayPath {
    #[serde(rename = "Attribute Matrix Name")]
    pub attribute_matrix: String,
    #[serde(rename = "Data Array Name")]
    pub data_array: String,
    #[serde(rename = "Data Container Name")]
    pub data_container: String,
}

impl DataArrayPath {
    pub fn new(data_container: &str, attribute_matrix: &str, data_array: &str) -> Self {
        Self {
            attribute_matrix: attribute_matrix.to_string(),
            data_array: data_array.to_string(),
            data_container: data_container.to_string(),
        }
    }

    /// 指向属性矩阵本身
    pub fn matrix(data_container: &str, attribute_matrix: &str) -> Self {
        Self::new(data_container, attribute_matrix, "")
    }

    /// 未使用的路径参数，三个名称均为空
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "Attribute Matrix Name": self.attribute_matrix,
            "Data Array Name": self.data_array,
            "Data Container Name": self.data_container,
        })
    }
}

/// {"x": .., "y": .., "z": ..}
pub fn xyz<T: Serialize>(values: [T; 3]) -> Value {
    let [x, y, z] = values;
    json!({ "x": x, "y": y, "z": z })
}

/// 单个过滤器的参数记录
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    params: Map<String, Value>,
}

impl FilterStep {
    pub fn new(filter_name: &str, human_label: &str) -> Self {
        let mut params = Map::new();
        params.insert("Filter_Human_Label".into(), json!(human_label));
        params.insert("Filter_Name".into(), json!(filter_name));
        Self { params }
    }

    pub fn version(self, version: &str) -> Self {
        self.param("FilterVersion", json!(version))
    }

    pub fn enabled(self) -> Self {
        self.param("Filter_Enabled", json!(true))
    }

    /// 花括号形式，例如 "{816fbe6b-7c38-581b-b149-3f839fb65b93}"
    pub fn uuid(self, uuid: Uuid) -> Self {
        self.param("Filter_Uuid", json!(uuid.braced().to_string()))
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn path(self, key: &str, path: DataArrayPath) -> Self {
        self.param(key, path.to_json())
    }

    pub fn filter_name(&self) -> Option<&str> {
        self.params.get("Filter_Name").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

/// 有序的过滤器流水线
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    /// 外部工具不同版本的写法不同（整数 6 或字符串 "1.0"）
    pub version: Value,
    pub steps: Vec<FilterStep>,
}

impl Pipeline {
    pub fn new(name: &str, version: Value) -> Self {
        Self {
            name: name.to_string(),
            version,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: FilterStep) {
        log::debug!(
            "流水线 '{}' 第 {} 步: {}",
            self.name,
            self.steps.len(),
            step.filter_name().unwrap_or("?")
        );
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number_Filters 始终等于实际步骤数
    pub fn to_json(&self) -> Value {
        let mut document = Map::new();
        for (index, step) in self.steps.iter().enumerate() {
            document.insert(index.to_string(), step.to_json());
        }
        document.insert(
            "PipelineBuilder".into(),
            json!({
                "Name": self.name,
                "Number_Filters": self.steps.len(),
                "Version": self.version,
            }),
        );
        Value::Object(document)
    }

    /// 写出 JSON，缩进 4 个空格
    pub fn write_to(&self, path: &Path) -> MapperResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.to_json().serialize(&mut serializer)?;
        writer.flush()?;
        log::info!(
            "已写入流水线 '{}' ({} 个过滤器): {}",
            self.name,
            self.steps.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn two_step_pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new("demo", json!(6));
        pipeline.push(FilterStep::new("CreateDataContainer", "Create Data Container").enabled());
        pipeline.push(
            FilterStep::new("DataContainerWriter", "Write DREAM.3D Data File")
                .param("WriteXdmfFile", json!(1)),
        );
        pipeline
    }

    #[test]
    fn test_document_keys_and_metadata() {
        let doc = two_step_pipeline().to_json();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["0", "1", "PipelineBuilder"]);
        assert_eq!(doc["PipelineBuilder"]["Number_Filters"], 2);
        assert_eq!(doc["PipelineBuilder"]["Version"], 6);
        assert_eq!(doc["0"]["Filter_Enabled"], true);
        assert_eq!(doc["1"]["Filter_Name"], "DataContainerWriter");
    }

    #[test]
    fn test_data_array_path_json() {
        let path = DataArrayPath::new("DataContainer", "CellData", "Phase");
        let value = serde_json::to_value(&path).unwrap();
        assert_eq!(value, path.to_json());
        assert_eq!(value["Data Array Name"], "Phase");
        assert_eq!(DataArrayPath::empty().to_json()["Data Container Name"], "");
    }

    #[test]
    fn test_braced_uuid() {
        let step = FilterStep::new("X", "X")
            .uuid(uuid::uuid!("816fbe6b-7c38-581b-b149-3f839fb65b93"));
        assert_eq!(
            step.get("Filter_Uuid").unwrap(),
            "{816fbe6b-7c38-581b-b149-3f839fb65b93}"
        );
    }

    #[test]
    fn test_write_with_four_space_indent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.json");
        two_step_pipeline().write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"0\": {\n        \""));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, two_step_pipeline().to_json());
    }
}
