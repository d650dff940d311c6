use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

/// 规则网格几何：体素数、原点、物理尺寸
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// 网格维度 [nx, ny, nz]
    pub grid_size: [usize; 3],
    pub origin: [f64; 3],
    pub size: [f64; 3],
}

impl GridGeometry {
    /// 原点默认为 (0, 0, 0)，尺寸默认为 (1, 1, 1)
    pub fn new(grid_size: [usize; 3]) -> Self {
        Self {
            grid_size,
            origin: [0.0; 3],
            size: [1.0; 3],
        }
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_size(mut self, size: [f64; 3]) -> Self {
        self.size = size;
        self
    }

    /// 体素间距 = size / grid_size（逐维）
    pub fn resolution(&self) -> MapperResult<[f64; 3]> {
        resolution_from_size(self.grid_size, self.size)
    }

    /// 体素总数
    pub fn voxel_count(&self) -> usize {
        self.grid_size.iter().product()
    }
}

/// 由物理尺寸推导体素间距
/// 任一维度为 0 或结果非有限/非正时返回 InvalidGeometry
pub fn resolution_from_size(grid_size: [usize; 3], size: [f64; 3]) -> MapperResult<[f64; 3]> {
    let mut resolution = [0.0; 3];
    for axis in 0..3 {
        if grid_size[axis] == 0 {
            return Err(MapperError::InvalidGeometry(format!(
                "grid_size 第 {} 维为 0: {:?}",
                axis, grid_size
            )));
        }
        resolution[axis] = size[axis] / grid_size[axis] as f64;
    }
    validate_resolution(resolution)?;
    Ok(resolution)
}

pub fn validate_resolution(resolution: [f64; 3]) -> MapperResult<()> {
    if resolution.iter().any(|r| !r.is_finite() || *r <= 0.0) {
        return Err(MapperError::InvalidGeometry(format!(
            "体素间距必须为正的有限值: {:?}",
            resolution
        )));
    }
    Ok(())
}

pub fn validate_grid_size(grid_size: [usize; 3]) -> MapperResult<()> {
    if grid_size.contains(&0) {
        return Err(MapperError::InvalidGeometry(format!(
            "grid_size 各维必须为正: {:?}",
            grid_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_times_grid_size_is_size() {
        let geometry = GridGeometry::new([3, 7, 11]).with_size([0.3, 1.4, 2.2]);
        let resolution = geometry.resolution().unwrap();
        for axis in 0..3 {
            let rebuilt = resolution[axis] * geometry.grid_size[axis] as f64;
            assert!((rebuilt - geometry.size[axis]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_default_size_and_origin() {
        let geometry = GridGeometry::new([2, 2, 2]);
        assert_eq!(geometry.origin, [0.0; 3]);
        assert_eq!(geometry.resolution().unwrap(), [0.5, 0.5, 0.5]);
        assert_eq!(geometry.voxel_count(), 8);
    }

    #[test]
    fn test_zero_grid_dimension_is_rejected() {
        let err = GridGeometry::new([4, 0, 4]).resolution().unwrap_err();
        assert!(matches!(err, MapperError::InvalidGeometry(_)));
    }

    #[test]
    fn test_non_positive_size_is_rejected() {
        let err = resolution_from_size([2, 2, 2], [1.0, -1.0, 1.0]).unwrap_err();
        assert!(matches!(err, MapperError::InvalidGeometry(_)));
    }
}
