//! 基础场
//!
//! 张量场由若干带衰减的基础场加权叠加而成。
//! 两个变体：
//! - 网格场：固定特征角 θ₀，城市路网的"棋盘"骨架
//! - 径向场：特征方向绕中心旋转，产生环路/放射状道路

use super::Tensor;
use crate::geometry::Vector;

/// 基础场变体
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BasisKind {
    /// 固定角度网格场
    Grid { angle: f64 },
    /// 径向场
    Radial,
}

/// 带衰减的基础场
#[derive(Debug, Clone, Copy)]
pub struct BasisField {
    pub center: Vector,
    /// 作用范围（> 0）
    pub size: f64,
    /// 衰减指数（≥ 0）
    pub decay: f64,
    pub kind: BasisKind,
}

impl BasisField {
    pub fn grid(center: Vector, size: f64, decay: f64, angle: f64) -> Self {
        Self {
            center,
            size,
            decay,
            kind: BasisKind::Grid { angle },
        }
    }

    pub fn radial(center: Vector, size: f64, decay: f64) -> Self {
        Self {
            center,
            size,
            decay,
            kind: BasisKind::Radial,
        }
    }

    /// p 点的标量权重
    ///
    /// 平滑模式：(‖p−C‖/S)^(−D)，随距离幂律衰减、无截断。
    /// 非平滑模式：max(0, 1 − ‖p−C‖/S)^D，超出作用范围为 0；
    /// D = 0 时 0^0 会得到 1，显式处理为 0。
    pub fn weight(&self, p: Vector, smooth: bool) -> f64 {
        let norm_dist = p.distance(self.center) / self.size;
        if smooth {
            norm_dist.powf(-self.decay)
        } else {
            if self.decay == 0.0 && norm_dist >= 1.0 {
                return 0.0;
            }
            (1.0 - norm_dist).max(0.0).powf(self.decay)
        }
    }

    /// p 点的未加权张量
    pub fn tensor_at(&self, p: Vector) -> Tensor {
        match self.kind {
            BasisKind::Grid { angle } => Tensor::from_angle(angle),
            BasisKind::Radial => {
                let d = p - self.center;
                Tensor::new(1.0, [d.y * d.y - d.x * d.x, -2.0 * d.x * d.y])
            }
        }
    }

    /// p 点的加权张量
    pub fn weighted_tensor(&self, p: Vector, smooth: bool) -> Tensor {
        let mut t = self.tensor_at(p);
        t.scale(self.weight(p, smooth));
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_field_is_constant() {
        let f = BasisField::grid(Vector::ZERO, f64::INFINITY, 0.0, 0.0);
        for p in [
            Vector::new(1.0, 0.0),
            Vector::new(0.0, 1.0),
            Vector::new(-1.0, 0.0),
        ] {
            let t = f.weighted_tensor(p, false);
            assert!(t.major().approx_eq(Vector::new(1.0, 0.0), 1e-9), "{:?}", p);
        }
    }

    #[test]
    fn radial_field_eigenvector_is_tangential() {
        let f = BasisField::radial(Vector::ZERO, 1.0, 1.0);
        // (1, 0) 处矩阵行为 (−1, 0)，θ = π/2，主方向沿 ±y
        let t = f.tensor_at(Vector::new(1.0, 0.0));
        let major = t.major();
        assert!(major.x.abs() < 1e-9);
        assert!((major.y.abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn radial_field_degenerates_at_center() {
        let f = BasisField::radial(Vector::new(2.0, 2.0), 1.0, 1.0);
        assert!(f.tensor_at(Vector::new(2.0, 2.0)).is_zero());
    }

    #[test]
    fn non_smooth_weight_cuts_off_at_size() {
        let f = BasisField::grid(Vector::ZERO, 10.0, 2.0, 0.0);
        assert!(f.weight(Vector::new(5.0, 0.0), false) > 0.0);
        assert_eq!(f.weight(Vector::new(15.0, 0.0), false), 0.0);
    }

    #[test]
    fn non_smooth_zero_decay_cuts_off_instead_of_pow_zero() {
        let f = BasisField::grid(Vector::ZERO, 10.0, 0.0, 0.0);
        assert_eq!(f.weight(Vector::new(5.0, 0.0), false), 1.0);
        assert_eq!(f.weight(Vector::new(10.0, 0.0), false), 0.0);
        assert_eq!(f.weight(Vector::new(15.0, 0.0), false), 0.0);
    }

    #[test]
    fn smooth_weight_decays_with_distance() {
        let f = BasisField::grid(Vector::ZERO, 10.0, 1.5, 0.0);
        let near = f.weight(Vector::new(5.0, 0.0), true);
        let far = f.weight(Vector::new(50.0, 0.0), true);
        assert!(near > far);
    }
}
