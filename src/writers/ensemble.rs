use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MapperResult;

/// 晶体结构（Laue 群），取值与外部工具的枚举一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrystalStructure {
    #[serde(rename = "Hexagonal_High")]
    HexagonalHigh,
    #[serde(rename = "Cubic_High")]
    CubicHigh,
    #[serde(rename = "Hexagonal_Low")]
    HexagonalLow,
    #[serde(rename = "Cubic_Low")]
    CubicLow,
    Triclinic,
    Monoclinic,
    OrthoRhombic,
    #[serde(rename = "Tetragonal_Low")]
    TetragonalLow,
    #[serde(rename = "Tetragonal_High")]
    TetragonalHigh,
    #[serde(rename = "Trigonal_Low")]
    TrigonalLow,
    #[serde(rename = "Trigonal_High")]
    TrigonalHigh,
}

impl CrystalStructure {
    pub fn name(self) -> &'static str {
        match self {
            CrystalStructure::HexagonalHigh => "Hexagonal_High",
            CrystalStructure::CubicHigh => "Cubic_High",
            CrystalStructure::HexagonalLow => "Hexagonal_Low",
            CrystalStructure::CubicLow => "Cubic_Low",
            CrystalStructure::Triclinic => "Triclinic",
            CrystalStructure::Monoclinic => "Monoclinic",
            CrystalStructure::OrthoRhombic => "OrthoRhombic",
            CrystalStructure::TetragonalLow => "Tetragonal_Low",
            CrystalStructure::TetragonalHigh => "Tetragonal_High",
            CrystalStructure::TrigonalLow => "Trigonal_Low",
            CrystalStructure::TrigonalHigh => "Trigonal_High",
        }
    }

    /// 统计数据中 "Crystal Symmetry" 使用的整数编号
    pub fn symmetry_index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseType {
    Primary,
    Precipitate,
    Transformation,
    Matrix,
    Boundary,
}

impl PhaseType {
    /// 系综描述文件中的写法，例如 "PrimaryPhase"
    pub fn ensemble_name(self) -> &'static str {
        match self {
            PhaseType::Primary => "PrimaryPhase",
            PhaseType::Precipitate => "PrecipitatePhase",
            PhaseType::Transformation => "TransformationPhase",
            PhaseType::Matrix => "MatrixPhase",
            PhaseType::Boundary => "BoundaryPhase",
        }
    }

    /// 统计生成器中的写法，例如 "Primary"
    pub fn stats_name(self) -> &'static str {
        match self {
            PhaseType::Primary => "Primary",
            PhaseType::Precipitate => "Precipitate",
            PhaseType::Transformation => "Transformation",
            PhaseType::Matrix => "Matrix",
            PhaseType::Boundary => "Boundary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePhase {
    pub crystal_structure: CrystalStructure,
    pub phase_type: PhaseType,
}

/// 系综描述：每个相的晶体结构与角色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleDescriptor {
    pub phases: Vec<EnsemblePhase>,
}

impl Default for EnsembleDescriptor {
    /// 立方主相 + 六方析出相
    fn default() -> Self {
        Self {
            phases: vec![
                EnsemblePhase {
                    crystal_structure: CrystalStructure::CubicHigh,
                    phase_type: PhaseType::Primary,
                },
                EnsemblePhase {
                    crystal_structure: CrystalStructure::HexagonalHigh,
                    phase_type: PhaseType::Precipitate,
                },
            ],
        }
    }
}

impl EnsembleDescriptor {
    /// 渲染为 INI 风格文本，相编号从 1 开始
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "[EnsembleInfo]");
        let _ = writeln!(text, "Number_Phases={}", self.phases.len());
        for (i, phase) in self.phases.iter().enumerate() {
            let _ = writeln!(text);
            let _ = writeln!(text, "[{}]", i + 1);
            let _ = writeln!(text, "CrystalStructure={}", phase.crystal_structure.name());
            let _ = writeln!(text, "PhaseType={}", phase.phase_type.ensemble_name());
        }
        text
    }

    pub fn write_to(&self, path: &Path) -> MapperResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.render().as_bytes())?;
        writer.flush()?;
        log::info!("已写入系综描述文件: {}", path.display());
        Ok(())
    }
}
