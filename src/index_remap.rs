//! 外部格式的索引约定转换
//!
//! 外部工具的特征/相编号从 1 开始，0 号保留（"未分配"），
//! 各逐晶粒数据表的第 0 行也是无物理意义的哨兵行。

use ndarray::{Array, Array2, ArrayView, ArrayView2, Dimension, s};

use crate::error::{MapperError, MapperResult};

/// 去掉第 0 行哨兵
pub fn strip_sentinel_rows<T: Clone>(table: ArrayView2<'_, T>, what: &str) -> MapperResult<Array2<T>> {
    if table.nrows() == 0 {
        return Err(MapperError::ShapeMismatch(format!(
            "{} 为空，缺少第 0 行哨兵",
            what
        )));
    }
    Ok(table.slice(s![1.., ..]).to_owned())
}

/// 从 1 开始的编号转为从 0 开始
///
/// `available` 为去掉哨兵后的可用行数，合法取值为 1..=available，
/// 其余值（包括保留的 0）返回 IndexRange。
pub fn rebase_one_indexed<D: Dimension>(
    values: ArrayView<'_, i64, D>,
    what: &str,
    available: usize,
) -> MapperResult<Array<usize, D>> {
    if let Some(&bad) = values
        .iter()
        .find(|&&v| v < 1 || v as u64 > available as u64)
    {
        return Err(MapperError::IndexRange {
            what: what.to_string(),
            value: bad,
            available,
        });
    }
    Ok(values.mapv(|v| (v - 1) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    #[test]
    fn test_strip_sentinel_rows() {
        let table = array![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let stripped = strip_sentinel_rows(table.view(), "EulerAngles").unwrap();
        assert_eq!(stripped, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_strip_empty_table() {
        let table = Array2::<i64>::zeros((0, 1));
        assert!(strip_sentinel_rows(table.view(), "Phases").is_err());
    }

    #[test]
    fn test_rebase_keeps_shape() {
        let ids = Array3::from_shape_vec((1, 2, 2), vec![1i64, 2, 3, 4]).unwrap();
        let rebased = rebase_one_indexed(ids.view(), "FeatureIds", 4).unwrap();
        assert_eq!(rebased.shape(), &[1, 2, 2]);
        assert_eq!(rebased.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_rebase_rejects_reserved_zero() {
        let ids = array![1i64, 0, 2];
        let err = rebase_one_indexed(ids.view(), "FeatureIds", 2).unwrap_err();
        assert!(matches!(err, MapperError::IndexRange { value: 0, .. }));
    }

    #[test]
    fn test_rebase_rejects_values_beyond_table() {
        let ids = array![1i64, 5];
        let err = rebase_one_indexed(ids.view(), "FeatureIds", 4).unwrap_err();
        assert!(matches!(
            err,
            MapperError::IndexRange { value: 5, available: 4, .. }
        ));
    }
}
