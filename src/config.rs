//! 地图配置
//!
//! JSON 配置文件映射到 [`MapConfig`]。所有字段都有可用的默认值，
//! 不提供配置文件时生成一座默认城市。

use crate::streamline::{FieldIntegrator, StreamlineParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 积分算子选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorKind {
    Euler,
    Rk4,
}

impl IntegratorKind {
    pub fn to_field_integrator(self) -> FieldIntegrator {
        match self {
            IntegratorKind::Euler => FieldIntegrator::Euler,
            IntegratorKind::Rk4 => FieldIntegrator::Rk4,
        }
    }
}

/// 顶层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub seed: u64,
    /// 正方形世界边长
    pub size: f64,
    /// 张量场平滑叠加模式
    pub smooth: bool,
    pub integrator: IntegratorKind,
    /// 额外随机径向基础场数量
    pub random_radial_fields: usize,
    /// 目标公园面积占比（0–1）
    pub park_area_percentage: f64,
    /// 公园质心间最小距离
    pub min_distance_between_parks: f64,
    pub road_parameters: Vec<RoadParams>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            size: 2000.0,
            smooth: false,
            integrator: IntegratorKind::Rk4,
            random_radial_fields: 2,
            park_area_percentage: 0.15,
            min_distance_between_parks: 300.0,
            road_parameters: vec![
                RoadParams::road("main", 400.0, 200.0, 500.0, 0.0, 0.0),
                RoadParams::road("major", 100.0, 30.0, 200.0, 0.0, 0.05),
                RoadParams::road("minor", 20.0, 15.0, 40.0, 0.7, 0.2),
                RoadParams::path("path", 20.0, 10.0, 40.0),
            ],
        }
    }
}

impl MapConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<MapConfig, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let config: MapConfig =
            serde_json::from_str(&text).map_err(|e| format!("invalid config: {}", e))?;
        Ok(config)
    }
}

/// 单个道路层级的参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoadParams {
    pub name: String,
    /// "road" 或 "path"
    #[serde(rename = "type")]
    pub kind: String,
    pub dsep: f64,
    pub dtest: f64,
    pub dstep: f64,
    pub d_circle_join: f64,
    #[serde(rename = "dlookahead")]
    pub d_lookahead: f64,
    pub road_join_angle: f64,
    pub path_integration_limit: usize,
    pub max_seed_tries: usize,
    pub early_collision_probability: f64,
    pub simplification_tolerance: f64,
    pub cul_de_sac_probability: f64,
    pub cul_de_sac_radius_min: f64,
    pub cul_de_sac_radius_max: f64,
}

impl Default for RoadParams {
    fn default() -> Self {
        RoadParams::road("road", 100.0, 30.0, 200.0, 0.0, 0.0)
    }
}

impl RoadParams {
    fn road(
        name: &str,
        dsep: f64,
        dtest: f64,
        d_lookahead: f64,
        early_collision_probability: f64,
        cul_de_sac_probability: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: "road".to_string(),
            dsep,
            dtest,
            dstep: 1.0,
            d_circle_join: 5.0,
            d_lookahead,
            road_join_angle: 0.1,
            path_integration_limit: 2688,
            max_seed_tries: 300,
            early_collision_probability,
            simplification_tolerance: 0.5,
            cul_de_sac_probability,
            cul_de_sac_radius_min: 4.0,
            cul_de_sac_radius_max: 9.0,
        }
    }

    fn path(name: &str, dsep: f64, dtest: f64, d_lookahead: f64) -> Self {
        let mut params = Self::road(name, dsep, dtest, d_lookahead, 0.0, 0.0);
        params.kind = "path".to_string();
        params
    }

    pub fn is_path(&self) -> bool {
        self.kind == "path"
    }

    /// 转为流线生成器参数，应用 dtest ≤ dsep 不变量
    pub fn to_streamline_params(&self) -> StreamlineParams {
        StreamlineParams {
            dsep: self.dsep,
            dtest: self.dtest,
            dstep: self.dstep,
            d_circle_join: self.d_circle_join,
            d_lookahead: self.d_lookahead,
            road_join_angle: self.road_join_angle,
            path_integration_limit: self.path_integration_limit,
            max_seed_tries: self.max_seed_tries,
            early_collision_probability: self.early_collision_probability,
            simplification_tolerance: self.simplification_tolerance,
            culdesac_probability: self.cul_de_sac_probability,
            culdesac_radius_min: self.cul_de_sac_radius_min,
            culdesac_radius_max: self.cul_de_sac_radius_max,
        }
        .normalized()
    }
}
