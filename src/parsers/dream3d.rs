use ndarray::{Array2, ArrayD, Axis, Ix3, s};
use serde::{Deserialize, Serialize};

use crate::container::ResultContainer;
use crate::error::{MapperError, MapperResult};
use crate::index_remap::{rebase_one_indexed, strip_sentinel_rows};
use crate::pipeline::segmentation::{CELL_DATA, CELL_FEATURE_DATA, CONTAINER, ENSEMBLE_MATRIX};
use crate::volume_element::VolumeElement;

/// 结果容器内的固定路径布局
/// 默认值对应合成流水线的结果，`segmentation()` 对应分割流水线的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerLayout {
    pub data_container: String,
    pub geometry: String,
    pub cell_data: String,
    pub grain_data: String,
    pub ensemble_data: String,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self {
            data_container: "DataContainers/SyntheticVolumeDataContainer".to_string(),
            geometry: "_SIMPL_GEOMETRY".to_string(),
            cell_data: "CellData".to_string(),
            grain_data: "Grain Data".to_string(),
            ensemble_data: "CellEnsembleData".to_string(),
        }
    }
}

impl ContainerLayout {
    pub fn segmentation() -> Self {
        Self {
            data_container: format!("DataContainers/{}", CONTAINER),
            cell_data: CELL_DATA.to_string(),
            grain_data: CELL_FEATURE_DATA.to_string(),
            ensemble_data: ENSEMBLE_MATRIX.to_string(),
            ..Self::default()
        }
    }

    fn join(&self, group: &str, name: &str) -> String {
        format!("{}/{}/{}", self.data_container, group, name)
    }

    pub fn dimensions(&self) -> String {
        self.join(&self.geometry, "DIMENSIONS")
    }

    pub fn spacing(&self) -> String {
        self.join(&self.geometry, "SPACING")
    }

    pub fn feature_ids(&self) -> String {
        self.join(&self.cell_data, "FeatureIds")
    }

    pub fn grain_phases(&self) -> String {
        self.join(&self.grain_data, "Phases")
    }

    pub fn grain_eulers(&self) -> String {
        self.join(&self.grain_data, "EulerAngles")
    }

    pub fn phase_names(&self) -> String {
        self.join(&self.ensemble_data, "PhaseName")
    }
}

/// 外部工具结果容器解析器
pub struct Dream3dParser {
    layout: ContainerLayout,
}

impl Dream3dParser {
    pub fn new(layout: ContainerLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }

    /// 从结果容器构造体积单元
    pub fn parse(&self, container: &dyn ResultContainer) -> MapperResult<VolumeElement> {
        let layout = &self.layout;
        if !container.contains(&layout.data_container) {
            return Err(MapperError::missing(layout.data_container.clone()));
        }

        // ==================== 步骤 1: 几何信息 ====================
        // size = spacing * grid_size（逐维）
        let dims_path = layout.dimensions();
        let dims = container.dataset(&dims_path)?.to_i64_array(&dims_path)?;
        let grid_size = read_grid_size(&dims, &dims_path)?;

        let spacing_path = layout.spacing();
        let spacing = container.dataset(&spacing_path)?.to_f64_array(&spacing_path)?;
        let spacing = read_vec3(&spacing, &spacing_path)?;
        let size = [0, 1, 2].map(|i| spacing[i] * grid_size[i] as f64);

        // ==================== 步骤 2: 逐晶粒数据表 ====================
        // 第 0 行为哨兵，去掉后相编号再减 1
        let phases_path = layout.grain_phases();
        let phases = as_table(container.dataset(&phases_path)?.to_i64_array(&phases_path)?)?;
        let phases = strip_sentinel_rows(phases.view(), &phases_path)?;

        let eulers_path = layout.grain_eulers();
        let eulers = as_table(container.dataset(&eulers_path)?.to_f64_array(&eulers_path)?)?;
        let eulers = strip_sentinel_rows(eulers.view(), &eulers_path)?;

        if phases.ncols() != 1 {
            return Err(MapperError::ShapeMismatch(format!(
                "{} 每行应有 1 个相编号，实际 {} 个",
                phases_path,
                phases.ncols()
            )));
        }
        if phases.nrows() != eulers.nrows() || eulers.ncols() != 3 {
            return Err(MapperError::ShapeMismatch(format!(
                "{} 有 {} 行，{} 形状为 {:?}",
                phases_path,
                phases.nrows(),
                eulers_path,
                eulers.shape()
            )));
        }
        let grain_rows = phases.nrows();

        // ==================== 步骤 3: 逐体素特征 ID ====================
        // 存储顺序为 (z, y, x, 1)：去掉多余的末维，编号减 1，再转置为 (x, y, z)
        let ids_path = layout.feature_ids();
        let ids = container.dataset(&ids_path)?.to_i64_array(&ids_path)?;
        let ids = collapse_trailing_axis(ids, &ids_path)?;
        let stored = [grid_size[2], grid_size[1], grid_size[0]];
        if ids.shape() != stored {
            return Err(MapperError::ShapeMismatch(format!(
                "{} 形状 {:?} 与 DIMENSIONS {:?} 不一致",
                ids_path,
                ids.shape(),
                grid_size
            )));
        }
        let element_material_idx = rebase_one_indexed(ids.view(), &ids_path, grain_rows)?
            .permuted_axes([2, 1, 0])
            .as_standard_layout()
            .into_owned();

        let num_grains = element_material_idx.iter().max().map_or(0, |max| max + 1);
        if grain_rows > num_grains {
            log::warn!(
                "晶粒数据有 {} 行，但体素只引用了 {} 个晶粒，多余的行被丢弃",
                grain_rows,
                num_grains
            );
        }

        // ==================== 步骤 4: 相名称 ====================
        let names_path = layout.phase_names();
        let names = container.dataset(&names_path)?.to_strings(&names_path)?;
        let Some((_, names)) = names.split_first() else {
            return Err(MapperError::missing(names_path));
        };

        let phase_idx = rebase_one_indexed(
            phases.slice(s![..num_grains, 0]),
            &phases_path,
            names.len(),
        )?;
        let constituent_phase_label: Vec<String> =
            phase_idx.iter().map(|&i| names[i].clone()).collect();

        let euler_angles = eulers.slice(s![..num_grains, ..]).to_owned();

        // ==================== 步骤 5: 组装体积单元 ====================
        let volume_element = VolumeElement::new(
            grid_size,
            size,
            element_material_idx,
            constituent_phase_label,
            euler_angles,
        )?;
        log::info!(
            "已解析 {}: 网格 {:?}，{} 个晶粒",
            container.describe(),
            grid_size,
            volume_element.num_grains()
        );
        Ok(volume_element)
    }
}

impl Default for Dream3dParser {
    fn default() -> Self {
        Self::new(ContainerLayout::default())
    }
}

fn read_vec3<T: Copy>(values: &ArrayD<T>, path: &str) -> MapperResult<[T; 3]> {
    let flat: Vec<T> = values.iter().copied().collect();
    <[T; 3]>::try_from(flat).map_err(|v| {
        MapperError::ShapeMismatch(format!("{} 应有 3 个值，实际 {} 个", path, v.len()))
    })
}

fn read_grid_size(values: &ArrayD<i64>, path: &str) -> MapperResult<[usize; 3]> {
    let dims = read_vec3(values, path)?;
    if dims.iter().any(|&n| n <= 0) {
        return Err(MapperError::InvalidGeometry(format!(
            "{} 各维必须为正: {:?}",
            path, dims
        )));
    }
    Ok(dims.map(|n| n as usize))
}

/// 去掉特征 ID 场多余的末维（长度为 1）
/// 已经是三维的场原样返回
fn collapse_trailing_axis(ids: ArrayD<i64>, path: &str) -> MapperResult<ndarray::Array3<i64>> {
    let shape = ids.shape().to_vec();
    let ids = match shape.as_slice() {
        [_, _, _, 1] => ids.index_axis_move(Axis(3), 0),
        [_, _, _] => ids,
        other => {
            return Err(MapperError::ShapeMismatch(format!(
                "{} 应为 (z, y, x, 1)，实际 {:?}",
                path, other
            )));
        }
    };
    ids.into_dimensionality::<Ix3>()
        .map_err(|e| MapperError::ShapeMismatch(e.to_string()))
}

/// 逐晶粒数据整理成二维表：(行数, 每行分量数)
fn as_table<T: Clone>(values: ArrayD<T>) -> MapperResult<Array2<T>> {
    let rows = values.shape().first().copied().unwrap_or(0);
    let cols = values.shape().iter().skip(1).product::<usize>();
    let flat: Vec<T> = values.iter().cloned().collect();
    Array2::from_shape_vec((rows, cols), flat).map_err(|e| MapperError::ShapeMismatch(e.to_string()))
}
