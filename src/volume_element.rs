use std::collections::BTreeMap;

use ndarray::{Array2, Array3, Array4, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};
use crate::geometry::GridGeometry;

/// 单晶均匀化标签：每个晶粒视为一个晶体取向
pub const SINGLE_CRYSTAL_HOMOG: &str = "SX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationType {
    Euler,
}

/// 每个组分一行的取向数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientations {
    #[serde(rename = "type")]
    pub kind: OrientationType,
    pub euler_degrees: bool,
    /// N×3，弧度，Bunge ZXZ
    pub euler_angles: Array2<f64>,
    /// 轴 -> 晶向，例如 {"x": "a"}
    pub unit_cell_alignment: BTreeMap<String, String>,
}

impl Orientations {
    /// 弧度制欧拉角，x 轴对齐晶胞 a 轴
    pub fn euler_radians(euler_angles: Array2<f64>) -> Self {
        let mut unit_cell_alignment = BTreeMap::new();
        unit_cell_alignment.insert("x".to_string(), "a".to_string());
        Self {
            kind: OrientationType::Euler,
            euler_degrees: false,
            euler_angles,
            unit_cell_alignment,
        }
    }
}

/// 体积单元：按晶粒标记的体素网格，每个晶粒带有相和取向
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeElement {
    /// 网格维度 [nx, ny, nz]
    pub grid_size: [usize; 3],
    /// 物理尺寸，size = grid_size * spacing
    pub size: [f64; 3],
    /// 每个体素的组分索引，轴顺序 (x, y, z)，从 0 开始
    pub element_material_idx: Array3<usize>,
    pub constituent_material_idx: Vec<usize>,
    pub constituent_phase_label: Vec<String>,
    pub material_homog: Vec<String>,
    pub orientations: Orientations,
}

impl VolumeElement {
    /// 创建体积单元，组分编号为 0..N，均匀化标签统一为单晶
    pub fn new(
        grid_size: [usize; 3],
        size: [f64; 3],
        element_material_idx: Array3<usize>,
        constituent_phase_label: Vec<String>,
        euler_angles: Array2<f64>,
    ) -> MapperResult<Self> {
        let num_grains = constituent_phase_label.len();
        let volume_element = Self {
            grid_size,
            size,
            element_material_idx,
            constituent_material_idx: (0..num_grains).collect(),
            constituent_phase_label,
            material_homog: vec![SINGLE_CRYSTAL_HOMOG.to_string(); num_grains],
            orientations: Orientations::euler_radians(euler_angles),
        };
        volume_element.check_invariants()?;
        Ok(volume_element)
    }

    pub fn num_grains(&self) -> usize {
        self.constituent_material_idx.len()
    }

    /// 原点固定为 (0, 0, 0)
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.grid_size).with_size(self.size)
    }

    /// max(element_material_idx) + 1 必须等于各组分数组的长度
    pub fn check_invariants(&self) -> MapperResult<()> {
        let (nx, ny, nz) = self.element_material_idx.dim();
        if [nx, ny, nz] != self.grid_size {
            return Err(MapperError::ShapeMismatch(format!(
                "element_material_idx 形状 {:?} 与 grid_size {:?} 不一致",
                [nx, ny, nz],
                self.grid_size
            )));
        }

        let num_grains = self
            .element_material_idx
            .iter()
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        let lengths = [
            ("constituent_material_idx", self.constituent_material_idx.len()),
            ("constituent_phase_label", self.constituent_phase_label.len()),
            ("material_homog", self.material_homog.len()),
            ("orientations.euler_angles", self.orientations.euler_angles.nrows()),
        ];
        for (name, len) in lengths {
            if len != num_grains {
                return Err(MapperError::ShapeMismatch(format!(
                    "{} 长度为 {}，但晶粒数为 {}",
                    name, len, num_grains
                )));
            }
        }
        if self.orientations.euler_angles.ncols() != 3 {
            return Err(MapperError::ShapeMismatch(format!(
                "欧拉角应为 N×3，实际列数 {}",
                self.orientations.euler_angles.ncols()
            )));
        }
        Ok(())
    }
}

/// 模拟结果中的场数据：逐体素的相标签与各增量步的取向四元数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub phase: Array3<i32>,
    /// 每个增量步一个 (nx, ny, nz, 4) 数组，分量顺序 (w, x, y, z)
    pub quaternions: Vec<Array4<f64>>,
}

impl FieldData {
    pub fn new(phase: Array3<i32>, quaternions: Vec<Array4<f64>>) -> MapperResult<Self> {
        let (nx, ny, nz) = phase.dim();
        for (increment, field) in quaternions.iter().enumerate() {
            if field.dim() != (nx, ny, nz, 4) {
                return Err(MapperError::ShapeMismatch(format!(
                    "增量 {} 的四元数形状 {:?} 与相场 {:?} 不匹配",
                    increment,
                    field.shape(),
                    phase.shape()
                )));
            }
        }
        Ok(Self { phase, quaternions })
    }

    /// 按 Python 风格的带符号索引选取增量步，-1 为最后一步
    pub fn increment(&self, increment: isize) -> MapperResult<ArrayView4<'_, f64>> {
        let available = self.quaternions.len();
        let resolved = if increment < 0 {
            available.checked_sub(increment.unsigned_abs())
        } else {
            Some(increment as usize).filter(|&i| i < available)
        };
        resolved
            .map(|i| self.quaternions[i].view())
            .ok_or(MapperError::IncrementOutOfRange {
                requested: increment,
                available,
            })
    }

    /// 展平为 N×4（C 顺序，与体素场一致）
    pub fn flat_quaternions(&self, increment: isize) -> MapperResult<Array2<f64>> {
        let field = self.increment(increment)?;
        let rows = field.len() / 4;
        Array2::from_shape_vec((rows, 4), field.iter().copied().collect())
            .map_err(|e| MapperError::ShapeMismatch(e.to_string()))
    }

    /// 展平的相标签（C 顺序）
    pub fn flat_phase(&self) -> Vec<i32> {
        self.phase.iter().copied().collect()
    }
}
