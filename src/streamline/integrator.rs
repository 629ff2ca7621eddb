//! 场积分算子
//!
//! 把 (点, 主方向标志) 映射为长度约等于 dstep 的步进向量。

use crate::geometry::Vector;
use crate::tensor::TensorField;

/// 退化判据：特征向量平方长度低于此值视为零
pub const DEGENERATE_EIGEN_SQ: f64 = 0.01;

/// 积分算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIntegrator {
    Euler,
    Rk4,
}

impl FieldIntegrator {
    /// 在 p 点沿主/次特征方向走一步
    ///
    /// 退化点（特征向量近零）返回零向量。
    pub fn step(&self, field: &TensorField, p: Vector, major: bool, dstep: f64) -> Vector {
        match self {
            FieldIntegrator::Euler => {
                let k = eigenvector(field, p, major);
                if k.length_sq() < DEGENERATE_EIGEN_SQ {
                    return Vector::ZERO;
                }
                k * dstep
            }
            FieldIntegrator::Rk4 => {
                let k1 = eigenvector(field, p, major);
                if k1.length_sq() < DEGENERATE_EIGEN_SQ {
                    return Vector::ZERO;
                }
                let half = dstep / 2.0;
                let k23 = eigenvector(field, p + Vector::new(half, half), major);
                let k4 = eigenvector(field, p + Vector::new(dstep, dstep), major);
                (k1 + k23 * 4.0 + k4) * (dstep / 6.0)
            }
        }
    }
}

fn eigenvector(field: &TensorField, p: Vector, major: bool) -> Vector {
    let t = field.sample(p);
    if major {
        t.major()
    } else {
        t.minor()
    }
}
