use std::path::{Path, PathBuf};

use serde_json::json;
use uuid::{Uuid, uuid};

use super::{DataArrayPath, FilterStep, Pipeline, xyz};
use crate::config::MapperConfig;
use crate::error::MapperResult;
use crate::geometry::GridGeometry;
use crate::writers::ORIENTATION_COLUMNS;

pub const PIPELINE_NAME: &str = "test_pipeline_2";
pub const PIPELINE_VERSION: i64 = 6;

const SIMPL_VERSION: &str = "1.2.815";
const ORIENTATION_ANALYSIS_VERSION: &str = "6.5.141";

const CREATE_DATA_CONTAINER: Uuid = uuid!("816fbe6b-7c38-581b-b149-3f839fb65b93");
const CREATE_GEOMETRY: Uuid = uuid!("9ac220b9-14f9-581a-9bac-5714467589cc");
const READ_ASCII_DATA: Uuid = uuid!("bdb978bc-96bf-5498-972c-b509c38b8d50");
const COMBINE_ATTRIBUTE_ARRAYS: Uuid = uuid!("a6b50fb0-eb7c-5d9b-9691-825d6a4fe772");
const CONVERT_ORIENTATIONS: Uuid = uuid!("e5629880-98c4-5656-82b8-c9fe2b9744de");
const ENSEMBLE_INFO_READER: Uuid = uuid!("33a37a47-d002-5c18-b270-86025881fe1e");
const EBSD_SEGMENT_FEATURES: Uuid = uuid!("7861c691-b821-537b-bd25-dc195578e0ea");
const DATA_CONTAINER_WRITER: Uuid = uuid!("3fcd4c43-9d75-5b86-aad4-4441bc914f37");

/// 结果文件中的组名，解析分割结果时共用
pub(crate) const CONTAINER: &str = "DataContainer";
pub(crate) const CELL_DATA: &str = "CellData";
pub(crate) const CELL_FEATURE_DATA: &str = "CellFeatureData";
pub(crate) const ENSEMBLE_MATRIX: &str = "EnsembleAttributeMatrix";

/// 流水线引用的辅助文件（与流水线文件位于同一目录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFiles {
    pub orientation_table: PathBuf,
    pub ensemble: PathBuf,
    pub output: PathBuf,
}

impl AuxiliaryFiles {
    pub fn beside(pipeline_path: &Path, config: &MapperConfig) -> Self {
        let dir = pipeline_path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            orientation_table: dir.join(&config.orientation_file),
            ensemble: dir.join(&config.ensemble_file),
            output: dir.join(&config.result_file),
        }
    }
}

/// 分割流水线：导入逐体素取向表，按取向差阈值将体素聚成晶粒
pub fn build_segmentation_pipeline(
    geometry: &GridGeometry,
    files: &AuxiliaryFiles,
    misorientation_tolerance: f64,
) -> MapperResult<Pipeline> {
    let resolution = geometry.resolution()?;
    let grid_size = geometry.grid_size;
    let cell = |array: &str| DataArrayPath::new(CONTAINER, CELL_DATA, array);

    let mut pipeline = Pipeline::new(PIPELINE_NAME, json!(PIPELINE_VERSION));

    pipeline.push(
        FilterStep::new("CreateDataContainer", "Create Data Container")
            .version(SIMPL_VERSION)
            .enabled()
            .uuid(CREATE_DATA_CONTAINER)
            .param("DataContainerName", json!(CONTAINER)),
    );

    pipeline.push(create_geometry_step(geometry, resolution));

    pipeline.push(
        FilterStep::new("ReadASCIIData", "Import ASCII Data")
            .version(SIMPL_VERSION)
            .enabled()
            .uuid(READ_ASCII_DATA)
            .param("Wizard_AttributeMatrixType", json!(3))
            .param("Wizard_AutomaticAM", json!(true))
            .param("Wizard_BeginIndex", json!(2))
            .param("Wizard_ConsecutiveDelimiters", json!(1))
            .param("Wizard_DataHeaders", json!(ORIENTATION_COLUMNS))
            .param(
                "Wizard_DataTypes",
                json!(["int32_t", "float", "float", "float"]),
            )
            .param("Wizard_Delimiters", json!(", "))
            .param("Wizard_HeaderIsCustom", json!(true))
            .param("Wizard_HeaderLine", json!(-1))
            .param("Wizard_HeaderUseDefaults", json!(false))
            .param(
                "Wizard_InputFilePath",
                json!(files.orientation_table.to_string_lossy()),
            )
            // 表头一行 + 每个体素一行
            .param("Wizard_NumberOfLines", json!(geometry.voxel_count() + 1))
            .path("Wizard_SelectedPath", DataArrayPath::matrix(CONTAINER, CELL_DATA))
            .param("Wizard_TupleDims", json!(grid_size)),
    );

    pipeline.push(
        FilterStep::new("CombineAttributeArrays", "Combine Attribute Arrays")
            .version(SIMPL_VERSION)
            .enabled()
            .uuid(COMBINE_ATTRIBUTE_ARRAYS)
            .param("MoveValues", json!(1))
            .param("NormalizeData", json!(0))
            .param(
                "SelectedDataArrayPaths",
                json!([
                    cell("Euler1").to_json(),
                    cell("Euler2").to_json(),
                    cell("Euler3").to_json(),
                ]),
            )
            .param("StackedDataArrayName", json!("Eulers")),
    );

    // InputType 0 = 欧拉角，OutputType 2 = 四元数
    pipeline.push(
        FilterStep::new("ConvertOrientations", "Convert Orientation Representation")
            .version(ORIENTATION_ANALYSIS_VERSION)
            .enabled()
            .uuid(CONVERT_ORIENTATIONS)
            .path("InputOrientationArrayPath", cell("Eulers"))
            .param("InputType", json!(0))
            .param("OutputOrientationArrayName", json!("quats"))
            .param("OutputType", json!(2)),
    );

    pipeline.push(
        FilterStep::new("EnsembleInfoReader", "Import Ensemble Info File")
            .version(ORIENTATION_ANALYSIS_VERSION)
            .enabled()
            .uuid(ENSEMBLE_INFO_READER)
            .param("CellEnsembleAttributeMatrixName", json!(ENSEMBLE_MATRIX))
            .param("CrystalStructuresArrayName", json!("CrystalStructures"))
            .param("DataContainerName", json!(CONTAINER))
            .param("InputFile", json!(files.ensemble.to_string_lossy()))
            .param("PhaseTypesArrayName", json!("PhaseTypes")),
    );

    pipeline.push(
        FilterStep::new("EBSDSegmentFeatures", "Segment Features (Misorientation)")
            .version(ORIENTATION_ANALYSIS_VERSION)
            .enabled()
            .uuid(EBSD_SEGMENT_FEATURES)
            .param("ActiveArrayName", json!("Active"))
            .param("CellFeatureAttributeMatrixName", json!(CELL_FEATURE_DATA))
            .path("CellPhasesArrayPath", cell("Phase"))
            .path(
                "CrystalStructuresArrayPath",
                DataArrayPath::new(CONTAINER, ENSEMBLE_MATRIX, "CrystalStructures"),
            )
            .param("FeatureIdsArrayName", json!("FeatureIds"))
            .path(
                "GoodVoxelsArrayPath",
                DataArrayPath::new("ImageDataContainer", CELL_DATA, "Mask"),
            )
            .param("MisorientationTolerance", json!(misorientation_tolerance))
            .path("QuatsArrayPath", cell("quats"))
            .param("UseGoodVoxels", json!(0)),
    );

    pipeline.push(
        FilterStep::new("DataContainerWriter", "Write DREAM.3D Data File")
            .version(SIMPL_VERSION)
            .enabled()
            .uuid(DATA_CONTAINER_WRITER)
            .param("OutputFile", json!(files.output.to_string_lossy()))
            .param("WriteTimeSeries", json!(0))
            .param("WriteXdmfFile", json!(1)),
    );

    Ok(pipeline)
}

/// 图像几何 (GeometryType 0)；其他几何类型的参数留空
fn create_geometry_step(geometry: &GridGeometry, resolution: [f64; 3]) -> FilterStep {
    let mut step = FilterStep::new("CreateGeometry", "Create Geometry")
        .version(SIMPL_VERSION)
        .enabled()
        .uuid(CREATE_GEOMETRY)
        .param("ArrayHandling", json!(0))
        .param("BoxDimensions", json!(box_dimensions(geometry, resolution)))
        .param("DataContainerName", json!(CONTAINER))
        .param("Dimensions", xyz(geometry.grid_size))
        .param("EdgeAttributeMatrixName", json!("EdgeData"))
        .param("FaceAttributeMatrixName0", json!("FaceData"))
        .param("FaceAttributeMatrixName1", json!("FaceData"))
        .param("GeometryType", json!(0))
        .param("HexCellAttributeMatrixName", json!(CELL_DATA))
        .param("ImageCellAttributeMatrixName", json!(CELL_DATA))
        .param("Origin", xyz(geometry.origin))
        .param("RectGridCellAttributeMatrixName", json!(CELL_DATA))
        .param("Resolution", xyz(resolution));

    for key in [
        "SharedEdgeListArrayPath",
        "SharedHexListArrayPath",
        "SharedQuadListArrayPath",
        "SharedTetListArrayPath",
        "SharedTriListArrayPath",
    ] {
        step = step.path(key, DataArrayPath::empty());
    }
    step = step.path(
        "SharedVertexListArrayPath0",
        DataArrayPath::new(CONTAINER, "CellData2", "coords"),
    );
    for i in 1..=5 {
        step = step.path(&format!("SharedVertexListArrayPath{i}"), DataArrayPath::empty());
    }
    step = step
        .param("TetCellAttributeMatrixName", json!(CELL_DATA))
        .param("TreatWarningsAsErrors", json!(0));
    for i in 0..=5 {
        step = step.param(&format!("VertexAttributeMatrixName{i}"), json!("VertexData"));
    }
    for key in ["XBoundsArrayPath", "YBoundsArrayPath", "ZBoundsArrayPath"] {
        step = step.path(key, DataArrayPath::empty());
    }
    step
}

/// 几何范围的文字说明（外部工具界面显示用）
fn box_dimensions(geometry: &GridGeometry, resolution: [f64; 3]) -> String {
    let mut text = String::from("Extents:\n");
    for (axis, n) in ["X", "Y", "Z"].iter().zip(geometry.grid_size) {
        text.push_str(&format!(
            "{axis} Extent: 0 to {} (dimension: {n})\n",
            n.saturating_sub(1)
        ));
    }
    text.push_str("Bounds:\n");
    for (i, axis) in ["X", "Y", "Z"].iter().enumerate() {
        let start = geometry.origin[i];
        let end = start + geometry.size[i];
        text.push_str(&format!(
            "{axis} Range: {start:?} to {end:?} (delta: {})\n",
            resolution[i]
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapperError;

    fn files() -> AuxiliaryFiles {
        AuxiliaryFiles::beside(Path::new("/work/pipeline.json"), &MapperConfig::default())
    }

    #[test]
    fn test_two_by_two_by_two_resolution() {
        let geometry = GridGeometry::new([2, 2, 2]).with_size([1.0, 1.0, 1.0]);
        let doc = build_segmentation_pipeline(&geometry, &files(), 7.0)
            .unwrap()
            .to_json();

        assert_eq!(doc["1"]["Resolution"], json!({"x": 0.5, "y": 0.5, "z": 0.5}));
        assert_eq!(doc["2"]["Wizard_NumberOfLines"], 9);
        assert_eq!(doc["2"]["Wizard_TupleDims"], json!([2, 2, 2]));
    }

    #[test]
    fn test_step_order_and_count() {
        let geometry = GridGeometry::new([4, 3, 2]);
        let pipeline = build_segmentation_pipeline(&geometry, &files(), 7.0).unwrap();
        let names: Vec<&str> = pipeline.steps.iter().filter_map(|s| s.filter_name()).collect();
        assert_eq!(
            names,
            vec![
                "CreateDataContainer",
                "CreateGeometry",
                "ReadASCIIData",
                "CombineAttributeArrays",
                "ConvertOrientations",
                "EnsembleInfoReader",
                "EBSDSegmentFeatures",
                "DataContainerWriter",
            ]
        );
        let doc = pipeline.to_json();
        assert_eq!(doc["PipelineBuilder"]["Number_Filters"], 8);
        assert_eq!(doc["PipelineBuilder"]["Name"], "test_pipeline_2");
    }

    #[test]
    fn test_names_chain_between_steps() {
        let geometry = GridGeometry::new([4, 3, 2]);
        let doc = build_segmentation_pipeline(&geometry, &files(), 7.0)
            .unwrap()
            .to_json();
        assert_eq!(doc["3"]["StackedDataArrayName"], "Eulers");
        assert_eq!(doc["4"]["InputOrientationArrayPath"]["Data Array Name"], "Eulers");
        assert_eq!(doc["4"]["OutputOrientationArrayName"], "quats");
        assert_eq!(doc["6"]["QuatsArrayPath"]["Data Array Name"], "quats");
        assert_eq!(
            doc["6"]["CrystalStructuresArrayPath"]["Attribute Matrix Name"],
            doc["5"]["CellEnsembleAttributeMatrixName"]
        );
        assert_eq!(doc["6"]["MisorientationTolerance"], 7.0);
    }

    #[test]
    fn test_auxiliary_files_sit_beside_pipeline() {
        let geometry = GridGeometry::new([1, 1, 1]);
        let doc = build_segmentation_pipeline(&geometry, &files(), 7.0)
            .unwrap()
            .to_json();
        assert_eq!(doc["2"]["Wizard_InputFilePath"], "/work/orientation_data.txt");
        assert_eq!(doc["5"]["InputFile"], "/work/ensemble_data.txt");
        assert_eq!(doc["7"]["OutputFile"], "/work/pipeline.dream3d");
    }

    #[test]
    fn test_zero_grid_dimension() {
        let geometry = GridGeometry::new([2, 0, 2]);
        let err = build_segmentation_pipeline(&geometry, &files(), 7.0).unwrap_err();
        assert!(matches!(err, MapperError::InvalidGeometry(_)));
    }

    #[test]
    fn test_box_dimensions_text() {
        let geometry = GridGeometry::new([2, 3, 4]);
        let text = box_dimensions(&geometry, geometry.resolution().unwrap());
        assert!(text.contains("X Extent: 0 to 1 (dimension: 2)\n"));
        assert!(text.contains("Z Extent: 0 to 3 (dimension: 4)\n"));
        assert!(text.contains("X Range: 0.0 to 1.0 (delta: 0.5)\n"));
    }

    #[test]
    fn test_group_names_match_segmentation_layout() {
        let layout = crate::parsers::ContainerLayout::segmentation();
        let geometry = GridGeometry::new([2, 2, 2]);
        let doc = build_segmentation_pipeline(&geometry, &files(), 7.0)
            .unwrap()
            .to_json();

        assert_eq!(
            layout.data_container,
            format!("DataContainers/{}", doc["0"]["DataContainerName"].as_str().unwrap())
        );
        assert_eq!(doc["2"]["Wizard_SelectedPath"]["Attribute Matrix Name"], layout.cell_data);
        assert_eq!(doc["5"]["CellEnsembleAttributeMatrixName"], layout.ensemble_data);
        assert_eq!(doc["6"]["CellFeatureAttributeMatrixName"], layout.grain_data);
    }
}
