//! 绑定到 (任务, 方法, 角色) 的具体映射函数

use std::path::Path;

use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::geometry::GridGeometry;
use crate::parsers::parse_volume_element;
use crate::pipeline::{
    AuxiliaryFiles, SynthesisRequest, build_segmentation_pipeline, build_synthesis_pipeline,
};
use crate::registry::{Mapper, MapperKey, MapperRegistry};
use crate::volume_element::{FieldData, VolumeElement};
use crate::writers::write_field_orientations;

pub const TASK_SEGMENT_GRAINS: &str = "segment_grains";
pub const METHOD_BURN: &str = "burn";
pub const TASK_GENERATE_VOLUME_ELEMENT: &str = "generate_volume_element";
pub const METHOD_FROM_STATISTICS: &str = "from_statistics";
pub const OUTPUT_VOLUME_ELEMENT: &str = "volume_element";

/// 工作流引擎交给输入映射函数的数据
#[derive(Debug, Clone)]
pub enum TaskInputs {
    /// 体积单元的几何 + 模拟结果中的场数据
    SegmentGrains {
        geometry: GridGeometry,
        field_data: FieldData,
    },
    GenerateVolumeElement(SynthesisRequest),
}

impl TaskInputs {
    fn segment_grains(&self) -> MapperResult<(&GridGeometry, &FieldData)> {
        match self {
            TaskInputs::SegmentGrains {
                geometry,
                field_data,
            } => Ok((geometry, field_data)),
            _ => Err(MapperError::MissingInput(format!(
                "{} 需要几何与场数据",
                TASK_SEGMENT_GRAINS
            ))),
        }
    }

    fn synthesis_request(&self) -> MapperResult<&SynthesisRequest> {
        match self {
            TaskInputs::GenerateVolumeElement(request) => Ok(request),
            _ => Err(MapperError::MissingInput(format!(
                "{} 需要合成参数",
                TASK_GENERATE_VOLUME_ELEMENT
            ))),
        }
    }
}

/// 注册全部映射函数，输入文件名取自配置
pub fn register_all(registry: &MapperRegistry) {
    let config = registry.config();

    registry.register(
        MapperKey::input(TASK_SEGMENT_GRAINS, METHOD_BURN, &config.pipeline_file),
        Mapper::Input(write_segmentation_pipeline),
    );
    registry.register(
        MapperKey::input(TASK_SEGMENT_GRAINS, METHOD_BURN, &config.orientation_file),
        Mapper::Input(write_segmentation_orientations),
    );
    registry.register(
        MapperKey::input(TASK_SEGMENT_GRAINS, METHOD_BURN, &config.ensemble_file),
        Mapper::Input(write_segmentation_ensemble),
    );
    registry.register(
        MapperKey::output(TASK_SEGMENT_GRAINS, METHOD_BURN, OUTPUT_VOLUME_ELEMENT),
        Mapper::Output(read_segmented_volume_element),
    );

    registry.register(
        MapperKey::input(
            TASK_GENERATE_VOLUME_ELEMENT,
            METHOD_FROM_STATISTICS,
            &config.pipeline_file,
        ),
        Mapper::Input(write_synthesis_pipeline),
    );
    registry.register(
        MapperKey::output(
            TASK_GENERATE_VOLUME_ELEMENT,
            METHOD_FROM_STATISTICS,
            OUTPUT_VOLUME_ELEMENT,
        ),
        Mapper::Output(read_synthesized_volume_element),
    );
}

pub fn write_segmentation_pipeline(
    path: &Path,
    inputs: &TaskInputs,
    config: &MapperConfig,
) -> MapperResult<()> {
    let (geometry, _) = inputs.segment_grains()?;
    let files = AuxiliaryFiles::beside(path, config);
    build_segmentation_pipeline(geometry, &files, config.misorientation_tolerance)?.write_to(path)
}

pub fn write_segmentation_orientations(
    path: &Path,
    inputs: &TaskInputs,
    config: &MapperConfig,
) -> MapperResult<()> {
    let (_, field_data) = inputs.segment_grains()?;
    write_field_orientations(path, field_data, config.increment)
}

/// 内容与输入无关，只取决于配置
pub fn write_segmentation_ensemble(
    path: &Path,
    _inputs: &TaskInputs,
    config: &MapperConfig,
) -> MapperResult<()> {
    config.ensemble.write_to(path)
}

pub fn write_synthesis_pipeline(
    path: &Path,
    inputs: &TaskInputs,
    config: &MapperConfig,
) -> MapperResult<()> {
    let request = inputs.synthesis_request()?;
    let output = AuxiliaryFiles::beside(path, config).output;
    build_synthesis_pipeline(request, &config.statistics, config.max_iterations, &output)?
        .write_to(path)
}

pub fn read_segmented_volume_element(
    path: &Path,
    config: &MapperConfig,
) -> MapperResult<VolumeElement> {
    parse_volume_element(path, &config.segmentation_layout)
}

pub fn read_synthesized_volume_element(
    path: &Path,
    config: &MapperConfig,
) -> MapperResult<VolumeElement> {
    parse_volume_element(path, &config.synthesis_layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_inputs_are_reported() {
        let inputs = TaskInputs::GenerateVolumeElement(SynthesisRequest::new([2, 2, 2]));
        let err = write_segmentation_pipeline(
            Path::new("/nonexistent/pipeline.json"),
            &inputs,
            &MapperConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MapperError::MissingInput(_)));
    }
}
