//! 四元数与欧拉角之间的批量转换
//!
//! 约定：
//! - 四元数分量顺序为 (w, x, y, z)，标量在前
//! - 欧拉角为 Bunge ZXZ，单位弧度，被动旋转，P = -1
//!   (Rowenhorst et al., 2015, Modelling Simul. Mater. Sci. Eng. 23)
//! - 输出角度范围 φ1 ∈ [0, 2π)，Φ ∈ [0, π]，φ2 ∈ [0, 2π)
//!
//! 万向节锁 (Φ = 0 或 π) 时，整个绕 Z 的旋转记在 φ1 上，φ2 置 0。
//! 判定阈值只吸收舍入误差：Φ 或 π - Φ 小到 1e-12 量级才按万向节锁处理，
//! 更大的小角度走一般公式，精度不受影响。

use std::f64::consts::{PI, TAU};

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{MapperError, MapperResult};

/// 旋转方向约定参数
const P: f64 = -1.0;

/// 模长小于该值的四元数视为退化
const NORM_EPSILON: f64 = 1e-12;

/// 判定万向节锁的阈值（作用于分量平方和，约对应 Φ < 2e-12）
const GIMBAL_EPSILON: f64 = 1e-24;

/// 绝对值小于该值的角度视为舍入噪声并清零，避免 -0 回绕到 2π
const ANGLE_EPSILON: f64 = 1e-12;

/// 四元数 (N×4) 转欧拉角 (N×3)
///
/// 输入无需为单位四元数，转换前先除以模长。
/// 任一行模长为 0 时返回 DegenerateOrientation，不产生部分结果。
pub fn quat_to_euler(quaternions: ArrayView2<'_, f64>) -> MapperResult<Array2<f64>> {
    if quaternions.ncols() != 4 {
        return Err(MapperError::ShapeMismatch(format!(
            "四元数数组应为 N×4，实际为 {:?}",
            quaternions.shape()
        )));
    }

    let mut eulers = Array2::zeros((quaternions.nrows(), 3));
    for (index, (quat, mut euler)) in quaternions
        .axis_iter(Axis(0))
        .zip(eulers.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let q = normalize([quat[0], quat[1], quat[2], quat[3]])
            .ok_or(MapperError::DegenerateOrientation { index })?;
        let angles = single_quat_to_euler(q);
        euler[0] = angles[0];
        euler[1] = angles[1];
        euler[2] = angles[2];
    }
    Ok(eulers)
}

/// 欧拉角 (N×3，弧度) 转单位四元数 (N×4)，标量部分非负
pub fn euler_to_quat(eulers: ArrayView2<'_, f64>) -> MapperResult<Array2<f64>> {
    if eulers.ncols() != 3 {
        return Err(MapperError::ShapeMismatch(format!(
            "欧拉角数组应为 N×3，实际为 {:?}",
            eulers.shape()
        )));
    }

    let mut quaternions = Array2::zeros((eulers.nrows(), 4));
    for (euler, mut quat) in eulers
        .axis_iter(Axis(0))
        .zip(quaternions.axis_iter_mut(Axis(0)))
    {
        let q = single_euler_to_quat([euler[0], euler[1], euler[2]]);
        for (dst, src) in quat.iter_mut().zip(q) {
            *dst = src;
        }
    }
    Ok(quaternions)
}

/// 角度制转弧度制
pub fn degrees_to_radians(eulers: ArrayView2<'_, f64>) -> Array2<f64> {
    eulers.mapv(f64::to_radians)
}

fn normalize(q: [f64; 4]) -> Option<[f64; 4]> {
    let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < NORM_EPSILON {
        return None;
    }
    Some(q.map(|c| c / norm))
}

fn single_quat_to_euler(q: [f64; 4]) -> [f64; 3] {
    let [q0, q1, q2, q3] = q;
    let q03 = q0 * q0 + q3 * q3;
    let q12 = q1 * q1 + q2 * q2;
    let chi = (q03 * q12).sqrt();

    let mut euler = if q12 < GIMBAL_EPSILON {
        // Φ = 0
        [(-2.0 * P * q0 * q3).atan2(q0 * q0 - q3 * q3), 0.0, 0.0]
    } else if q03 < GIMBAL_EPSILON {
        // Φ = π
        [(2.0 * q1 * q2).atan2(q1 * q1 - q2 * q2), PI, 0.0]
    } else {
        [
            ((q1 * q3 - P * q0 * q2) * chi).atan2((-P * q0 * q1 - q2 * q3) * chi),
            (2.0 * chi).atan2(q03 - q12),
            ((P * q0 * q2 + q1 * q3) * chi).atan2((q2 * q3 - P * q0 * q1) * chi),
        ]
    };

    for angle in euler.iter_mut() {
        if angle.abs() < ANGLE_EPSILON {
            *angle = 0.0;
        }
    }
    euler[0] = euler[0].rem_euclid(TAU);
    euler[2] = euler[2].rem_euclid(TAU);
    euler
}

fn single_euler_to_quat(euler: [f64; 3]) -> [f64; 4] {
    let [phi1, big_phi, phi2] = euler.map(|a| 0.5 * a);
    let (s_phi, c_phi) = big_phi.sin_cos();
    let sum = phi1 + phi2;
    let diff = phi1 - phi2;

    let q = [
        c_phi * sum.cos(),
        -P * s_phi * diff.cos(),
        -P * s_phi * diff.sin(),
        -P * c_phi * sum.sin(),
    ];
    if q[0] < 0.0 { q.map(|c| -c) } else { q }
}
