use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{DataArrayPath, FilterStep, Pipeline, StatsGeneratorConfig, xyz};
use crate::error::{MapperError, MapperResult};
use crate::geometry::{resolution_from_size, validate_grid_size, validate_resolution};

pub const PIPELINE_NAME: &str = "(04) Two Phase Cubic Hexagonal Particles Equiaxed";
pub const PIPELINE_VERSION: &str = "1.0";

const FILTER_VERSION: &str = "1.0.278";

const STATS_CONTAINER: &str = "StatsGeneratorDataContainer";
const SYNTHETIC_CONTAINER: &str = "SyntheticVolumeDataContainer";
const ENSEMBLE_DATA: &str = "CellEnsembleData";
const CELL_DATA: &str = "CellData";
const GRAIN_DATA: &str = "Grain Data";

/// 合成体积单元的几何输入
/// resolution 缺省时由 size / grid_size 推导，origin 缺省为 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub grid_size: [usize; 3],
    #[serde(default)]
    pub resolution: Option<[f64; 3]>,
    #[serde(default)]
    pub size: Option<[f64; 3]>,
    #[serde(default)]
    pub origin: Option<[f64; 3]>,
    #[serde(default)]
    pub periodic: bool,
}

impl SynthesisRequest {
    pub fn new(grid_size: [usize; 3]) -> Self {
        Self {
            grid_size,
            resolution: None,
            size: None,
            origin: None,
            periodic: false,
        }
    }

    pub fn resolved_resolution(&self) -> MapperResult<[f64; 3]> {
        validate_grid_size(self.grid_size)?;
        match (self.resolution, self.size) {
            (Some(resolution), _) => {
                validate_resolution(resolution)?;
                Ok(resolution)
            }
            (None, Some(size)) => resolution_from_size(self.grid_size, size),
            (None, None) => Err(MapperError::InvalidGeometry(
                "resolution 与 size 至少需要提供一个".to_string(),
            )),
        }
    }

    /// 0/1 整数标志，两个装填步骤共用
    pub fn periodic_flag(&self) -> u8 {
        u8::from(self.periodic)
    }
}

/// 合成流水线：按统计分布生成具有代表性的体积单元
pub fn build_synthesis_pipeline(
    request: &SynthesisRequest,
    stats: &StatsGeneratorConfig,
    max_iterations: u64,
    output_file: &Path,
) -> MapperResult<Pipeline> {
    let resolution = request.resolved_resolution()?;
    let origin = request.origin.unwrap_or([0.0; 3]);
    stats.validate()?;
    let periodic = request.periodic_flag();

    let ensemble = |array: &str| DataArrayPath::new(STATS_CONTAINER, ENSEMBLE_DATA, array);
    let synthetic = |matrix: &str, array: &str| DataArrayPath::new(SYNTHETIC_CONTAINER, matrix, array);
    let feature_ids = synthetic(CELL_DATA, "FeatureIds");

    let mut pipeline = Pipeline::new(PIPELINE_NAME, json!(PIPELINE_VERSION));

    pipeline.push(
        FilterStep::new("StatsGeneratorFilter", "StatsGenerator")
            .param("CellEnsembleAttributeMatrixName", json!(ENSEMBLE_DATA))
            .param("CrystalStructuresArrayName", json!("CrystalStructures"))
            .param("PhaseTypesArrayName", json!("PhaseTypes"))
            .param("StatsDataArray", stats.to_stats_data_array())
            .param("StatsDataArrayName", json!("Statistics"))
            .param("StatsGeneratorDataContainerName", json!(STATS_CONTAINER)),
    );

    pipeline.push(
        FilterStep::new("InitializeSyntheticVolume", "Initialize Synthetic Volume")
            .version(FILTER_VERSION)
            .param("CellAttributeMatrixName", json!(CELL_DATA))
            .param("DataContainerName", json!(SYNTHETIC_CONTAINER))
            .param("Dimensions", xyz(request.grid_size))
            .param("EstimateNumberOfFeatures", json!(0))
            .path("InputPhaseTypesArrayPath", ensemble("PhaseTypes"))
            .path("InputStatsArrayPath", ensemble("Statistics"))
            .param("InputStatsFile", json!(""))
            .param("Origin", xyz(origin))
            .param("Resolution", xyz(resolution)),
    );

    pipeline.push(
        FilterStep::new("EstablishShapeTypes", "Establish Shape Types")
            .version(FILTER_VERSION)
            .path("InputPhaseTypesArrayPath", ensemble("PhaseTypes"))
            .param("ShapeTypeData", json!(stats.shape_type_data()))
            .param("ShapeTypesArrayName", json!("ShapeTypes")),
    );

    pipeline.push(
        FilterStep::new("PackPrimaryPhases", "Pack Primary Phases")
            .version(FILTER_VERSION)
            .param("CellPhasesArrayName", json!("Phases"))
            .param("CsvOutputFile", json!(""))
            .param("ErrorOutputFile", json!(""))
            .param("FeatureGeneration", json!(0))
            .param("FeatureIdsArrayName", json!("FeatureIds"))
            .param("FeatureInputFile", json!(""))
            .param("FeaturePhasesArrayName", json!("Phases"))
            .path("InputPhaseTypesArrayPath", ensemble("PhaseTypes"))
            .path("InputShapeTypesArrayPath", ensemble("ShapeTypes"))
            .path("InputStatsArrayPath", ensemble("Statistics"))
            .path("MaskArrayPath", DataArrayPath::empty())
            .param("NumFeaturesArrayName", json!("NumFeatures"))
            .path(
                "OutputCellAttributeMatrixPath",
                DataArrayPath::matrix(SYNTHETIC_CONTAINER, CELL_DATA),
            )
            .param("OutputCellEnsembleAttributeMatrixName", json!(ENSEMBLE_DATA))
            .param("OutputCellFeatureAttributeMatrixName", json!(GRAIN_DATA))
            .param("PeriodicBoundaries", json!(periodic))
            .param("UseMask", json!(0))
            .param("VtkOutputFile", json!(""))
            .param("WriteGoalAttributes", json!(0)),
    );

    pipeline.push(
        FilterStep::new("FindBoundaryCells", "Find Boundary Cells (Image)")
            .version(FILTER_VERSION)
            .param("BoundaryCellsArrayName", json!("BoundaryCells"))
            .path("FeatureIdsArrayPath", feature_ids.clone()),
    );

    pipeline.push(
        FilterStep::new("InsertPrecipitatePhases", "Insert Precipitate Phases")
            .version(FILTER_VERSION)
            .path("BoundaryCellsArrayPath", synthetic(CELL_DATA, "BoundaryCells"))
            .path("CellPhasesArrayPath", synthetic(CELL_DATA, "Phases"))
            .param("CsvOutputFile", json!(""))
            .path("FeatureIdsArrayPath", feature_ids.clone())
            .path("FeaturePhasesArrayPath", synthetic(GRAIN_DATA, "Phases"))
            .param("HavePrecips", json!(0))
            .path("InputPhaseTypesArrayPath", ensemble("PhaseTypes"))
            .path("InputShapeTypesArrayPath", ensemble("ShapeTypes"))
            .path("InputStatsArrayPath", ensemble("Statistics"))
            .path("MaskArrayPath", DataArrayPath::empty())
            .param("MatchRDF", json!(0))
            .path("NumFeaturesArrayPath", synthetic(ENSEMBLE_DATA, "NumFeatures"))
            .param("PeriodicBoundaries", json!(periodic))
            .param("PrecipInputFile", json!(""))
            .param("UseMask", json!(0))
            .param("WriteGoalAttributes", json!(0)),
    );

    pipeline.push(
        FilterStep::new("FindNeighbors", "Find Feature Neighbors")
            .version(FILTER_VERSION)
            .param("BoundaryCellsArrayName", json!("BoundaryCells"))
            .path(
                "CellFeatureAttributeMatrixPath",
                DataArrayPath::matrix(SYNTHETIC_CONTAINER, GRAIN_DATA),
            )
            .path("FeatureIdsArrayPath", feature_ids.clone())
            .param("NeighborListArrayName", json!("NeighborList"))
            .param("NumNeighborsArrayName", json!("NumNeighbors"))
            .param("SharedSurfaceAreaListArrayName", json!("SharedSurfaceAreaList"))
            .param("StoreBoundaryCells", json!(0))
            .param("StoreSurfaceFeatures", json!(1))
            .param("SurfaceFeaturesArrayName", json!("SurfaceFeatures")),
    );

    pipeline.push(
        FilterStep::new("MatchCrystallography", "Match Crystallography")
            .version(FILTER_VERSION)
            .param("AvgQuatsArrayName", json!("AvgQuats"))
            .param("CellEulerAnglesArrayName", json!("EulerAngles"))
            .path("CrystalStructuresArrayPath", ensemble("CrystalStructures"))
            .param("FeatureEulerAnglesArrayName", json!("EulerAngles"))
            .path("FeatureIdsArrayPath", feature_ids)
            .path("FeaturePhasesArrayPath", synthetic(GRAIN_DATA, "Phases"))
            .path("InputStatsArrayPath", ensemble("Statistics"))
            .param("MaxIterations", json!(max_iterations))
            .path("NeighborListArrayPath", synthetic(GRAIN_DATA, "NeighborList"))
            .path("NumFeaturesArrayPath", synthetic(ENSEMBLE_DATA, "NumFeatures"))
            .path("PhaseTypesArrayPath", ensemble("PhaseTypes"))
            .path(
                "SharedSurfaceAreaListArrayPath",
                synthetic(GRAIN_DATA, "SharedSurfaceAreaList"),
            )
            .path("SurfaceFeaturesArrayPath", synthetic(GRAIN_DATA, "SurfaceFeatures"))
            .param("VolumesArrayName", json!("Volumes")),
    );

    pipeline.push(
        FilterStep::new("GenerateIPFColors", "Generate IPF Colors")
            .version(FILTER_VERSION)
            .path("CellEulerAnglesArrayPath", synthetic(CELL_DATA, "EulerAngles"))
            .param("CellIPFColorsArrayName", json!("IPFColor"))
            .path("CellPhasesArrayPath", synthetic(CELL_DATA, "Phases"))
            .path("CrystalStructuresArrayPath", ensemble("CrystalStructures"))
            .path(
                "GoodVoxelsArrayPath",
                DataArrayPath::matrix(SYNTHETIC_CONTAINER, CELL_DATA),
            )
            .param("ReferenceDir", xyz([0, 0, 1]))
            .param("UseGoodVoxels", json!(0)),
    );

    pipeline.push(
        FilterStep::new("DataContainerWriter", "Write DREAM.3D Data File")
            .version(FILTER_VERSION)
            .param("OutputFile", json!(output_file.to_string_lossy()))
            .param("WriteXdmfFile", json!(1)),
    );

    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const OUTPUT: &str = "/work/pipeline.dream3d";

    fn build(request: &SynthesisRequest) -> MapperResult<Value> {
        build_synthesis_pipeline(
            request,
            &StatsGeneratorConfig::default(),
            100000,
            Path::new(OUTPUT),
        )
        .map(|p| p.to_json())
    }

    #[test]
    fn test_resolution_derived_from_size() {
        let mut request = SynthesisRequest::new([10, 20, 40]);
        request.size = Some([1.0, 1.0, 1.0]);
        let doc = build(&request).unwrap();

        let resolution = &doc["1"]["Resolution"];
        for (axis, n) in [("x", 10.0), ("y", 20.0), ("z", 40.0)] {
            let r = resolution[axis].as_f64().unwrap();
            assert!((r * n - 1.0).abs() < 1e-12);
        }
        assert_eq!(doc["1"]["Origin"], json!({"x": 0.0, "y": 0.0, "z": 0.0}));
    }

    #[test]
    fn test_explicit_resolution_wins() {
        let mut request = SynthesisRequest::new([8, 8, 8]);
        request.resolution = Some([0.25, 0.5, 1.0]);
        request.size = Some([100.0, 100.0, 100.0]);
        let doc = build(&request).unwrap();
        assert_eq!(doc["1"]["Resolution"], json!({"x": 0.25, "y": 0.5, "z": 1.0}));
    }

    #[test]
    fn test_missing_resolution_and_size() {
        let err = build(&SynthesisRequest::new([8, 8, 8])).unwrap_err();
        assert!(matches!(err, MapperError::InvalidGeometry(_)));
    }

    #[test]
    fn test_zero_grid_dimension() {
        let mut request = SynthesisRequest::new([8, 0, 8]);
        request.resolution = Some([1.0; 3]);
        assert!(matches!(build(&request), Err(MapperError::InvalidGeometry(_))));
    }

    #[test]
    fn test_periodic_flag_shared_by_packing_steps() {
        for periodic in [false, true] {
            let mut request = SynthesisRequest::new([4, 4, 4]);
            request.size = Some([1.0; 3]);
            request.periodic = periodic;
            let doc = build(&request).unwrap();

            let expected = i64::from(periodic);
            assert_eq!(doc["3"]["Filter_Name"], "PackPrimaryPhases");
            assert_eq!(doc["5"]["Filter_Name"], "InsertPrecipitatePhases");
            assert_eq!(doc["3"]["PeriodicBoundaries"], expected);
            assert_eq!(doc["5"]["PeriodicBoundaries"], expected);
        }
    }

    #[test]
    fn test_step_count_matches_metadata() {
        let mut request = SynthesisRequest::new([4, 4, 4]);
        request.size = Some([1.0; 3]);
        let doc = build(&request).unwrap();

        let steps = doc.as_object().unwrap().keys().filter(|k| *k != "PipelineBuilder").count();
        assert_eq!(steps, 10);
        assert_eq!(doc["PipelineBuilder"]["Number_Filters"], 10);
        assert_eq!(doc["PipelineBuilder"]["Version"], "1.0");
        assert_eq!(doc["7"]["MaxIterations"], 100000);
        assert_eq!(doc["9"]["OutputFile"], OUTPUT);
        assert_eq!(doc["2"]["ShapeTypeData"], json!([999, 0, 0]));
        assert_eq!(doc["0"]["StatsDataArray"]["Phase Count"], 3);
    }

    #[test]
    fn test_request_from_json() {
        let request: SynthesisRequest =
            serde_json::from_str(r#"{"grid_size": [2, 2, 2], "size": [1, 1, 1], "periodic": true}"#)
                .unwrap();
        assert_eq!(request.resolved_resolution().unwrap(), [0.5, 0.5, 0.5]);
        assert_eq!(request.periodic_flag(), 1);
    }
}
