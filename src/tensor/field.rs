//! 张量场
//!
//! 基础场的加权叠加，外加两层旋转噪声与水域掩膜：
//! 1. 水域（陆地掩膜外或河道内）→ 零张量
//! 2. 无基础场 → 默认网格张量
//! 3. 基础场加权累加（平滑 / 非平滑模式）
//! 4. 公园内 → 按公园噪声旋转
//! 5. 全局噪声开启 → 再按全局噪声旋转

use super::{BasisField, Tensor};
use crate::geometry::{Polygon, Vector};
use noise::{NoiseFn, Simplex};

/// 旋转噪声参数
///
/// size 是噪声采样的空间周期，angle 是旋转幅度上限（弧度）。
#[derive(Debug, Clone, Copy)]
pub struct NoiseParams {
    /// 是否启用全局旋转噪声
    pub global_noise: bool,
    pub park_size: f64,
    pub park_angle: f64,
    pub global_size: f64,
    pub global_angle: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            global_noise: false,
            park_size: 20.0,
            park_angle: std::f64::consts::FRAC_PI_2,
            global_size: 30.0,
            global_angle: 0.35,
        }
    }
}

/// 张量场
pub struct TensorField {
    basis_fields: Vec<BasisField>,
    noise: Simplex,
    noise_params: NoiseParams,
    parks: Vec<Polygon>,
    /// 陆地掩膜：掩膜外采样返回零张量。None 表示全图皆陆地。
    land: Option<Polygon>,
    /// 河道多边形：其内部视为水域
    river: Option<Polygon>,
    smooth: bool,
}

impl TensorField {
    /// 构造空场。噪声采样器在此处用种子固定，
    /// 同一种子下场的输出完全可复现。
    pub fn new(noise_params: NoiseParams, smooth: bool, seed: u32) -> Self {
        Self {
            basis_fields: Vec::new(),
            noise: Simplex::new(seed),
            noise_params,
            parks: Vec::new(),
            land: None,
            river: None,
            smooth,
        }
    }

    pub fn smooth(&self) -> bool {
        self.smooth
    }

    pub fn basis_field_count(&self) -> usize {
        self.basis_fields.len()
    }

    pub fn add_grid(&mut self, center: Vector, size: f64, decay: f64, angle: f64) {
        self.basis_fields
            .push(BasisField::grid(center, size, decay, angle));
    }

    pub fn add_radial(&mut self, center: Vector, size: f64, decay: f64) {
        self.basis_fields.push(BasisField::radial(center, size, decay));
    }

    pub fn set_land(&mut self, land: Polygon) {
        self.land = Some(land);
    }

    pub fn set_river(&mut self, river: Polygon) {
        self.river = Some(river);
    }

    pub fn set_parks(&mut self, parks: Vec<Polygon>) {
        self.parks = parks;
    }

    pub fn parks(&self) -> &[Polygon] {
        &self.parks
    }

    /// p 是否在陆地上（掩膜内且不在河道中）
    pub fn on_land(&self, p: Vector) -> bool {
        if let Some(land) = &self.land {
            if !land.contains(p) {
                return false;
            }
        }
        if let Some(river) = &self.river {
            if river.contains(p) {
                return false;
            }
        }
        true
    }

    /// 场采样
    pub fn sample(&self, p: Vector) -> Tensor {
        if !self.on_land(p) {
            return Tensor::zero();
        }

        if self.basis_fields.is_empty() {
            return Tensor::from_angle(0.0);
        }

        let mut acc = Tensor::zero();
        for field in &self.basis_fields {
            acc.add(field.weighted_tensor(p, self.smooth), self.smooth);
        }

        if self.parks.iter().any(|park| park.contains(p)) {
            acc.rotate(self.rotational_noise(
                p,
                self.noise_params.park_size,
                self.noise_params.park_angle,
            ));
        }

        if self.noise_params.global_noise {
            acc.rotate(self.rotational_noise(
                p,
                self.noise_params.global_size,
                self.noise_params.global_angle,
            ));
        }

        acc
    }

    /// 单纯形噪声驱动的旋转角
    fn rotational_noise(&self, p: Vector, size: f64, angle: f64) -> f64 {
        self.noise.get([p.x / size, p.y / size]) * angle
    }
}
