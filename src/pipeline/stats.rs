//! 合成流水线使用的统计分布参数
//!
//! 默认值为两相体系（立方主相 + 六方析出相）的固定参数。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{MapperError, MapperResult};
use crate::writers::{CrystalStructure, PhaseType};

/// 晶粒形状，编号与外部工具一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Ellipsoid,
    SuperEllipsoid,
    CubeOctahedron,
    CylinderA,
    CylinderB,
    CylinderC,
}

impl ShapeType {
    /// 0 号相（未知相）使用的占位编号
    pub const UNKNOWN: u32 = 999;

    pub fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaDistribution {
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
}

impl BetaDistribution {
    fn to_json(&self) -> Value {
        json!({
            "Alpha": self.alpha,
            "Beta": self.beta,
            "Distribution Type": "Beta Distribution",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogNormalDistribution {
    pub average: Vec<f64>,
    pub standard_deviation: Vec<f64>,
}

/// 等效直径的对数正态分布参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSizeDistribution {
    pub average: f64,
    pub standard_deviation: f64,
}

/// 析出相的径向分布函数设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialDistribution {
    pub bin_count: u32,
    pub box_dims: [f64; 3],
    pub box_res: [f64; 3],
    pub max: f64,
    pub min: f64,
}

/// 单个相的统计描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStatistics {
    pub name: String,
    pub phase_type: PhaseType,
    pub crystal_structure: CrystalStructure,
    pub shape_type: ShapeType,
    pub phase_fraction: f64,
    pub boundary_area: f64,
    /// 各尺寸区间的起点
    pub bin_numbers: Vec<f64>,
    pub feature_size: FeatureSizeDistribution,
    /// [区间步长, 最大直径, 最小直径]
    pub feature_diameter_info: [f64; 3],
    pub b_over_a: BetaDistribution,
    pub c_over_a: BetaDistribution,
    pub omega3: BetaDistribution,
    /// 只有主相需要邻居数分布
    #[serde(default)]
    pub neighbors: Option<LogNormalDistribution>,
    #[serde(default)]
    pub precipitate_boundary_fraction: Option<f64>,
    #[serde(default)]
    pub radial_distribution: Option<RadialDistribution>,
}

impl PhaseStatistics {
    /// 每个按区间给出的分布，长度都必须等于区间数
    fn validate(&self) -> MapperResult<()> {
        let bins = self.bin_numbers.len();
        let mut lengths = vec![
            ("B/A Alpha", self.b_over_a.alpha.len()),
            ("B/A Beta", self.b_over_a.beta.len()),
            ("C/A Alpha", self.c_over_a.alpha.len()),
            ("C/A Beta", self.c_over_a.beta.len()),
            ("Omega3 Alpha", self.omega3.alpha.len()),
            ("Omega3 Beta", self.omega3.beta.len()),
        ];
        if let Some(neighbors) = &self.neighbors {
            lengths.push(("Neighbors Average", neighbors.average.len()));
            lengths.push(("Neighbors Standard Deviation", neighbors.standard_deviation.len()));
        }
        for (what, len) in lengths {
            if len != bins {
                return Err(MapperError::ShapeMismatch(format!(
                    "相 '{}' 的 {} 有 {} 个值，但区间数为 {}",
                    self.name, what, len, bins
                )));
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut stats = Map::new();
        stats.insert("AxisODF-Weights".into(), json!({}));
        stats.insert("Bin Count".into(), json!(self.bin_numbers.len()));
        stats.insert("BinNumber".into(), json!(self.bin_numbers));
        stats.insert("BoundaryArea".into(), json!(self.boundary_area));
        stats.insert(
            "Crystal Symmetry".into(),
            json!(self.crystal_structure.symmetry_index()),
        );
        stats.insert(
            "FeatureSize Distribution".into(),
            json!({
                "Average": self.feature_size.average,
                "Standard Deviation": self.feature_size.standard_deviation,
            }),
        );
        stats.insert(
            "FeatureSize Vs B Over A Distributions".into(),
            self.b_over_a.to_json(),
        );
        stats.insert(
            "FeatureSize Vs C Over A Distributions".into(),
            self.c_over_a.to_json(),
        );
        if let Some(neighbors) = &self.neighbors {
            stats.insert(
                "FeatureSize Vs Neighbors Distributions".into(),
                json!({
                    "Average": neighbors.average,
                    "Distribution Type": "Log Normal Distribution",
                    "Standard Deviation": neighbors.standard_deviation,
                }),
            );
        }
        stats.insert(
            "FeatureSize Vs Omega3 Distributions".into(),
            self.omega3.to_json(),
        );
        stats.insert(
            "Feature_Diameter_Info".into(),
            json!(self.feature_diameter_info),
        );
        stats.insert("MDF-Weights".into(), json!({}));
        stats.insert("Name".into(), json!(self.name));
        stats.insert("ODF-Weights".into(), json!({}));
        stats.insert("PhaseFraction".into(), json!(self.phase_fraction));
        stats.insert("PhaseType".into(), json!(self.phase_type.stats_name()));
        if let Some(fraction) = self.precipitate_boundary_fraction {
            stats.insert("Precipitate Boundary Fraction".into(), json!(fraction));
        }
        if let Some(rdf) = &self.radial_distribution {
            stats.insert(
                "Radial Distribution Function".into(),
                json!({
                    "Bin Count": rdf.bin_count,
                    "BoxDims": rdf.box_dims,
                    "BoxRes": rdf.box_res,
                    "Max": rdf.max,
                    "Min": rdf.min,
                }),
            );
        }
        Value::Object(stats)
    }
}

/// 统计生成器的全部输入，相编号从 1 开始
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsGeneratorConfig {
    pub phases: Vec<PhaseStatistics>,
}

impl StatsGeneratorConfig {
    pub fn validate(&self) -> MapperResult<()> {
        if self.phases.is_empty() {
            return Err(MapperError::ShapeMismatch("统计配置中没有任何相".to_string()));
        }
        self.phases.iter().try_for_each(PhaseStatistics::validate)
    }

    /// StatsDataArray 参数；"Phase Count" 包含 0 号未知相
    pub fn to_stats_data_array(&self) -> Value {
        let mut array = Map::new();
        for (i, phase) in self.phases.iter().enumerate() {
            array.insert((i + 1).to_string(), phase.to_json());
        }
        array.insert("Name".into(), json!("Statistics"));
        array.insert("Phase Count".into(), json!(self.phases.len() + 1));
        Value::Object(array)
    }

    /// ShapeTypeData 参数：[999, 各相形状编号...]
    pub fn shape_type_data(&self) -> Vec<u32> {
        std::iter::once(ShapeType::UNKNOWN)
            .chain(self.phases.iter().map(|p| p.shape_type.index()))
            .collect()
    }
}

impl Default for StatsGeneratorConfig {
    fn default() -> Self {
        Self {
            phases: vec![primary_phase(), precipitate_phase()],
        }
    }
}

fn primary_phase() -> PhaseStatistics {
    PhaseStatistics {
        name: "Primary".to_string(),
        phase_type: PhaseType::Primary,
        crystal_structure: CrystalStructure::CubicHigh,
        shape_type: ShapeType::Ellipsoid,
        phase_fraction: 0.89999997615814209,
        boundary_area: 0.0,
        bin_numbers: vec![
            7.3890562057495117,
            17.389057159423828,
            27.389057159423828,
            37.389057159423828,
        ],
        feature_size: FeatureSizeDistribution {
            average: 3.0,
            standard_deviation: 0.25,
        },
        feature_diameter_info: [10.0, 42.521083831787109, 7.3890562057495117],
        b_over_a: BetaDistribution {
            alpha: vec![
                15.845513343811035,
                15.281289100646973,
                15.406131744384766,
                15.695631980895996,
            ],
            beta: vec![
                1.5363599061965942,
                1.3575199842453003,
                1.2908644676208496,
                1.6510697603225708,
            ],
        },
        c_over_a: BetaDistribution {
            alpha: vec![
                15.830905914306641,
                15.119057655334473,
                15.210259437561035,
                15.403964042663574,
            ],
            beta: vec![
                1.4798208475112915,
                1.4391646385192871,
                1.6361048221588135,
                1.3149876594543457,
            ],
        },
        omega3: BetaDistribution {
            alpha: vec![
                10.906224250793457,
                10.030556678771973,
                10.367804527282715,
                10.777519226074219,
            ],
            beta: vec![
                1.7305665016174316,
                1.6383645534515381,
                1.6687047481536865,
                1.6839183568954468,
            ],
        },
        neighbors: Some(LogNormalDistribution {
            average: vec![
                2.3025851249694824,
                2.4849066734313965,
                2.6390573978424072,
                2.7725887298583984,
            ],
            standard_deviation: vec![
                0.40000000596046448,
                0.34999999403953552,
                0.30000001192092896,
                0.25,
            ],
        }),
        precipitate_boundary_fraction: None,
        radial_distribution: None,
    }
}

fn precipitate_phase() -> PhaseStatistics {
    PhaseStatistics {
        name: "Precipitate".to_string(),
        phase_type: PhaseType::Precipitate,
        crystal_structure: CrystalStructure::HexagonalHigh,
        shape_type: ShapeType::Ellipsoid,
        phase_fraction: 0.10000000149011612,
        boundary_area: 64498012.0,
        bin_numbers: vec![
            2.2255408763885498,
            4.2255411148071289,
            6.2255411148071289,
            8.2255411148071289,
        ],
        feature_size: FeatureSizeDistribution {
            average: 1.6000000238418579,
            standard_deviation: 0.20000000298023224,
        },
        feature_diameter_info: [2.0, 9.0250139236450195, 2.2255408763885498],
        b_over_a: BetaDistribution {
            alpha: vec![
                15.258569717407227,
                15.15038013458252,
                15.949015617370605,
                15.441672325134277,
            ],
            beta: vec![
                1.6226730346679688,
                1.5978513956069946,
                1.4994683265686035,
                1.5526076555252075,
            ],
        },
        c_over_a: BetaDistribution {
            alpha: vec![
                15.780433654785156,
                15.858841896057129,
                15.259775161743164,
                15.857120513916016,
            ],
            beta: vec![
                1.5344709157943726,
                1.2825722694396973,
                1.649916410446167,
                1.7178913354873657,
            ],
        },
        omega3: BetaDistribution {
            alpha: vec![
                10.484344482421875,
                10.260377883911133,
                10.586400985717773,
                10.218396186828613,
            ],
            beta: vec![
                1.5603832006454468,
                1.599597692489624,
                1.5324842929840088,
                1.5695462226867676,
            ],
        },
        neighbors: None,
        precipitate_boundary_fraction: Some(0.69999998807907104),
        radial_distribution: Some(RadialDistribution {
            bin_count: 50,
            box_dims: [100.0, 100.0, 100.0],
            box_res: [0.10000000149011612, 0.10000000149011612, 0.10000000149011612],
            max: 80.0,
            min: 10.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats_data_array() {
        let config = StatsGeneratorConfig::default();
        config.validate().unwrap();

        let array = config.to_stats_data_array();
        assert_eq!(array["Phase Count"], 3);
        assert_eq!(array["Name"], "Statistics");
        assert_eq!(array["1"]["Name"], "Primary");
        assert_eq!(array["1"]["PhaseType"], "Primary");
        assert_eq!(array["1"]["Crystal Symmetry"], 1);
        assert_eq!(array["1"]["Bin Count"], 4);
        assert!(array["1"].get("Precipitate Boundary Fraction").is_none());
        assert_eq!(array["2"]["Crystal Symmetry"], 0);
        assert_eq!(array["2"]["Radial Distribution Function"]["Bin Count"], 50);
        assert!(array["2"].get("FeatureSize Vs Neighbors Distributions").is_none());
    }

    #[test]
    fn test_shape_type_data() {
        assert_eq!(StatsGeneratorConfig::default().shape_type_data(), vec![999, 0, 0]);
    }

    #[test]
    fn test_bin_length_mismatch_is_rejected() {
        let mut config = StatsGeneratorConfig::default();
        config.phases[0].omega3.beta.pop();
        assert!(matches!(config.validate(), Err(MapperError::ShapeMismatch(_))));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = StatsGeneratorConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: StatsGeneratorConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
