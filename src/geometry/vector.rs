//! 二维向量
//!
//! 所有几何运算的基础类型。坐标使用 f64，
//! 世界尺寸 2000+ 时 0.001 级别的容差在 f32 下不可靠。

use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 二维向量（不可变值类型）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 标准二维叉积 `x·v.y − v.x·y`
    pub fn cross(self, other: Vector) -> f64 {
        self.x * other.y - other.x * self.y
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn distance_sq(self, other: Vector) -> f64 {
        (self - other).length_sq()
    }

    pub fn distance(self, other: Vector) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// 单位化。零向量保持为零向量。
    pub fn normalized(self) -> Vector {
        let len = self.length();
        if len == 0.0 {
            return Vector::ZERO;
        }
        self / len
    }

    /// 指定长度的同方向向量。零向量保持为零向量。
    pub fn with_length(self, len: f64) -> Vector {
        self.normalized() * len
    }

    /// 顺时针旋转 90°（y 轴向下的屏幕坐标系中指向右侧）
    pub fn perpendicular_cw(self) -> Vector {
        Vector::new(self.y, -self.x)
    }

    /// 逆时针旋转 90°
    pub fn perpendicular_ccw(self) -> Vector {
        Vector::new(-self.y, self.x)
    }

    /// 到另一向量的有向夹角，范围 (−π, π]
    pub fn angle_to(self, other: Vector) -> f64 {
        self.cross(other).atan2(self.dot(other))
    }

    /// 到另一向量的方向角，范围 [0, 2π)
    ///
    /// 用于"最右转"面遍历与海岸线边排序。
    pub fn directional_angle_to(self, other: Vector) -> f64 {
        let a = self.angle_to(other);
        if a < 0.0 {
            a + std::f64::consts::TAU
        } else {
            a
        }
    }

    /// 绕指定点旋转
    pub fn rotated_around(self, center: Vector, angle: f64) -> Vector {
        let (sin, cos) = angle.sin_cos();
        let d = self - center;
        Vector::new(
            center.x + d.x * cos - d.y * sin,
            center.y + d.x * sin + d.y * cos,
        )
    }

    /// 容差内的近似相等
    pub fn approx_eq(self, other: Vector, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// 字典序比较（先 x 后 y）
    pub fn lex_cmp(self, other: Vector) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }

    /// 量化网格键，用于浮点坐标的容差去重
    ///
    /// `resolution` 是一个格子的边长。同一格内的点共享键，
    /// 不得依赖浮点哈希相等。
    pub fn grid_key(self, resolution: f64) -> (i64, i64) {
        (
            (self.x / resolution).floor() as i64,
            (self.y / resolution).floor() as i64,
        )
    }

    /// 吸附到网格：分量向下取整到 `resolution` 的倍数
    pub fn snapped(self, resolution: f64) -> Vector {
        Vector::new(
            (self.x / resolution).floor() * resolution,
            (self.y / resolution).floor() * resolution,
        )
    }

    /// 点到线段 [a, b] 的平方距离（垂足钳制在线段内）
    pub fn distance_sq_to_segment(self, a: Vector, b: Vector) -> f64 {
        let ab = b - a;
        let len_sq = ab.length_sq();
        if len_sq == 0.0 {
            return self.distance_sq(a);
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        self.distance_sq(a + ab * t)
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector {
    type Output = Vector;
    fn div(self, rhs: f64) -> Vector {
        Vector::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn cross_is_standard_2d() {
        let a = Vector::new(1.0, 0.0);
        let b = Vector::new(0.0, 1.0);
        assert_eq!(a.cross(b), 1.0);
        assert_eq!(b.cross(a), -1.0);
    }

    #[test]
    fn angle_to_is_signed_half_open() {
        let x = Vector::new(1.0, 0.0);
        assert!((x.angle_to(Vector::new(0.0, 1.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((x.angle_to(Vector::new(0.0, -1.0)) + FRAC_PI_2).abs() < 1e-12);
        // 反向向量取 +π 而非 −π
        assert!((x.angle_to(Vector::new(-1.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn directional_angle_wraps_to_two_pi() {
        let x = Vector::new(1.0, 0.0);
        let a = x.directional_angle_to(Vector::new(0.0, -1.0));
        assert!((a - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn rotation_around_center() {
        let p = Vector::new(2.0, 1.0);
        let q = p.rotated_around(Vector::new(1.0, 1.0), FRAC_PI_2);
        assert!(q.approx_eq(Vector::new(1.0, 2.0), 1e-12));
    }

    #[test]
    fn perpendiculars_are_orthogonal() {
        let v = Vector::new(3.0, -2.0);
        assert_eq!(v.dot(v.perpendicular_cw()), 0.0);
        assert_eq!(v.dot(v.perpendicular_ccw()), 0.0);
        assert!(v.perpendicular_cw().approx_eq(-v.perpendicular_ccw(), 1e-12));
    }

    #[test]
    fn grid_key_buckets_nearby_points() {
        let a = Vector::new(0.749, 0.001);
        let b = Vector::new(0.001, 0.7);
        assert_eq!(a.grid_key(0.75), (0, 0));
        assert_eq!(b.grid_key(0.75), (0, 0));
        assert_ne!(Vector::new(0.76, 0.0).grid_key(0.75), (0, 0));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Vector::new(0.0, 0.0);
        let b = Vector::new(10.0, 0.0);
        assert_eq!(Vector::new(5.0, 3.0).distance_sq_to_segment(a, b), 9.0);
        assert_eq!(Vector::new(-4.0, 0.0).distance_sq_to_segment(a, b), 16.0);
    }

    #[test]
    fn lex_ordering_x_then_y() {
        let a = Vector::new(1.0, 5.0);
        let b = Vector::new(1.0, 6.0);
        let c = Vector::new(2.0, 0.0);
        assert_eq!(a.lex_cmp(b), std::cmp::Ordering::Less);
        assert_eq!(b.lex_cmp(c), std::cmp::Ordering::Less);
    }
}
