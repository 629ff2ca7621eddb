//! 对称无迹 2×2 张量
//!
//! 表示为非负幅值 r 与单位矩阵行 (cos 2θ, sin 2θ)。
//! 不变量：r = 0 时矩阵行为零向量且 θ 定义为 0。

use crate::geometry::Vector;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tensor {
    r: f64,
    /// (cos 2θ, sin 2θ)，r > 0 时为单位向量
    matrix: [f64; 2],
}

impl Tensor {
    /// 由幅值与矩阵行构造，矩阵行按长度归一化。
    /// 矩阵行长度为零时退化为零张量。
    pub fn new(r: f64, matrix: [f64; 2]) -> Self {
        let len = (matrix[0] * matrix[0] + matrix[1] * matrix[1]).sqrt();
        if r == 0.0 || len == 0.0 {
            return Self::zero();
        }
        Self {
            r,
            matrix: [matrix[0] / len, matrix[1] / len],
        }
    }

    pub fn zero() -> Self {
        Self {
            r: 0.0,
            matrix: [0.0, 0.0],
        }
    }

    /// 特征方向为 θ 的单位张量 (1, (cos 2θ, sin 2θ))
    pub fn from_angle(theta: f64) -> Self {
        Self {
            r: 1.0,
            matrix: [(2.0 * theta).cos(), (2.0 * theta).sin()],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.r == 0.0
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    /// 特征角 θ ∈ (−π/2, π/2]
    pub fn theta(&self) -> f64 {
        if self.r == 0.0 {
            return 0.0;
        }
        self.matrix[1].atan2(self.matrix[0]) / 2.0
    }

    /// 加权求和
    ///
    /// 两种模式：
    /// - 平滑：r 重归一化为合成矩阵行的长度
    /// - 非平滑：r 固定为 2
    pub fn add(&mut self, other: Tensor, smooth: bool) {
        self.matrix = [
            self.matrix[0] * self.r + other.matrix[0] * other.r,
            self.matrix[1] * self.r + other.matrix[1] * other.r,
        ];
        if smooth {
            self.r = (self.matrix[0] * self.matrix[0] + self.matrix[1] * self.matrix[1]).sqrt();
            if self.r == 0.0 {
                self.matrix = [0.0, 0.0];
            } else {
                self.matrix = [self.matrix[0] / self.r, self.matrix[1] / self.r];
            }
        } else {
            self.r = 2.0;
            let len =
                (self.matrix[0] * self.matrix[0] + self.matrix[1] * self.matrix[1]).sqrt();
            if len == 0.0 {
                *self = Self::zero();
            } else {
                self.matrix = [self.matrix[0] / len, self.matrix[1] / len];
            }
        }
    }

    pub fn scale(&mut self, s: f64) {
        self.r *= s;
        if self.r == 0.0 {
            self.matrix = [0.0, 0.0];
        }
    }

    /// 原地旋转到新的特征角 θ + delta
    pub fn rotate(&mut self, delta: f64) {
        if delta == 0.0 || self.r == 0.0 {
            return;
        }
        let theta = self.theta() + delta;
        self.matrix = [(2.0 * theta).cos(), (2.0 * theta).sin()];
    }

    /// 主特征方向 (cos θ, sin θ)，零张量返回零向量
    pub fn major(&self) -> Vector {
        if self.r == 0.0 {
            return Vector::ZERO;
        }
        let theta = self.theta();
        Vector::new(theta.cos(), theta.sin())
    }

    /// 次特征方向，与主方向垂直
    pub fn minor(&self) -> Vector {
        if self.r == 0.0 {
            return Vector::ZERO;
        }
        let theta = self.theta() + std::f64::consts::FRAC_PI_2;
        Vector::new(theta.cos(), theta.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_minor_orthogonal_when_nonzero() {
        let t = Tensor::from_angle(0.7);
        assert!(t.major().dot(t.minor()).abs() < 1e-12);
        assert!((t.major().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_tensor_has_zero_eigenvectors() {
        let t = Tensor::zero();
        assert_eq!(t.major(), Vector::ZERO);
        assert_eq!(t.minor(), Vector::ZERO);
        assert_eq!(t.theta(), 0.0);
    }

    #[test]
    fn from_angle_recovers_theta() {
        for &theta in &[0.0, 0.3, -0.5, 1.2] {
            let t = Tensor::from_angle(theta);
            assert!((t.theta() - theta).abs() < 1e-9, "theta {}", theta);
        }
    }

    #[test]
    fn smooth_sum_renormalizes_magnitude() {
        let mut a = Tensor::from_angle(0.0);
        a.scale(3.0);
        let b = Tensor::from_angle(0.0);
        a.add(b, true);
        assert!((a.r() - 4.0).abs() < 1e-12);
        assert!((a.theta() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn non_smooth_sum_pins_magnitude_to_two() {
        let mut a = Tensor::from_angle(0.2);
        let b = Tensor::from_angle(0.3);
        a.add(b, false);
        assert!((a.r() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn opposing_tensors_cancel_in_smooth_mode() {
        // θ=0 与 θ=π/2 的矩阵行相反
        let mut a = Tensor::from_angle(0.0);
        a.add(Tensor::from_angle(std::f64::consts::FRAC_PI_2), true);
        assert!(a.is_zero());
        assert_eq!(a.major(), Vector::ZERO);
    }

    #[test]
    fn rotate_shifts_theta() {
        let mut t = Tensor::from_angle(0.1);
        t.rotate(0.4);
        assert!((t.theta() - 0.5).abs() < 1e-9);
    }
}
