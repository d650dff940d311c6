use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MapperResult;
use crate::parsers::ContainerLayout;
use crate::pipeline::StatsGeneratorConfig;
use crate::writers::EnsembleDescriptor;

/// 映射层配置
/// 所有字段都有默认值，JSON 中只需写出要覆盖的部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// 流水线描述文件名
    pub pipeline_file: String,
    /// 逐体素取向表文件名
    pub orientation_file: String,
    /// 系综描述文件名
    pub ensemble_file: String,
    /// 外部工具写出的结果文件名
    pub result_file: String,
    /// 分割时相邻体素间的取向差阈值（度）
    pub misorientation_tolerance: f64,
    /// 晶体学匹配的最大迭代次数
    pub max_iterations: u64,
    /// 写取向表时使用的增量步，-1 为最后一步
    pub increment: isize,
    /// 分割结果文件的路径布局
    pub segmentation_layout: ContainerLayout,
    /// 合成结果文件的路径布局
    pub synthesis_layout: ContainerLayout,
    pub ensemble: EnsembleDescriptor,
    pub statistics: StatsGeneratorConfig,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            pipeline_file: "pipeline.json".to_string(),
            orientation_file: "orientation_data.txt".to_string(),
            ensemble_file: "ensemble_data.txt".to_string(),
            result_file: "pipeline.dream3d".to_string(),
            misorientation_tolerance: 7.0,
            max_iterations: 100_000,
            increment: -1,
            segmentation_layout: ContainerLayout::segmentation(),
            synthesis_layout: ContainerLayout::default(),
            ensemble: EnsembleDescriptor::default(),
            statistics: StatsGeneratorConfig::default(),
        }
    }
}

impl MapperConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> MapperResult<Self> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("已加载配置: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mapper.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{"misorientation_tolerance": 5.0, "increment": 0}}"#).unwrap();
        drop(file);

        let config = MapperConfig::from_json_file(&path).unwrap();
        assert_eq!(config.misorientation_tolerance, 5.0);
        assert_eq!(config.increment, 0);
        assert_eq!(config.pipeline_file, "pipeline.json");
        assert_eq!(config.max_iterations, 100_000);
        assert_eq!(config.ensemble, EnsembleDescriptor::default());
    }

    #[test]
    fn test_missing_config_file() {
        let err = MapperConfig::from_json_file("/nonexistent/mapper.json").unwrap_err();
        assert!(matches!(err, crate::error::MapperError::Io(_)));
    }

    #[test]
    fn test_statistics_constants_survive_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mapper.json");
        std::fs::write(&path, serde_json::to_string(&MapperConfig::default()).unwrap()).unwrap();

        let config = MapperConfig::from_json_file(&path).unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(
            config.statistics.to_stats_data_array(),
            StatsGeneratorConfig::default().to_stats_data_array()
        );
    }
}
