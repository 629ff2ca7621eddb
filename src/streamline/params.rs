//! 流线积分参数
//!
//! 每个道路层级一份。分离距离（dsep / dtest）控制密度，
//! dstep 控制积分步长，其余控制接合与断头路行为。

/// 单个道路层级的流线参数
#[derive(Debug, Clone)]
pub struct StreamlineParams {
    /// 流线间的目标分离距离（种子有效性按它判定）
    pub dsep: f64,
    /// 积分过程中的碰撞检测距离
    pub dtest: f64,
    /// 积分步长
    pub dstep: f64,
    /// 前后两个积分前沿靠近到该距离以内时闭合成环
    pub d_circle_join: f64,
    /// 悬挂端点接合的搜索半径
    pub d_lookahead: f64,
    /// 接合候选与端点方向的最大夹角（弧度）
    pub road_join_angle: f64,
    /// 单条流线的积分步数上限
    pub path_integration_limit: usize,
    /// 随机种子尝试上限
    pub max_seed_tries: usize,
    /// 流线在积分阶段就对另一方向网格做碰撞检测的概率
    pub early_collision_probability: f64,
    /// 折线简化容差（平方语义，见简化模块）
    pub simplification_tolerance: f64,
    /// 悬挂端点生成断头路的概率
    pub culdesac_probability: f64,
    pub culdesac_radius_min: f64,
    pub culdesac_radius_max: f64,
}

impl StreamlineParams {
    /// 应用参数不变量：dtest 不得超过 dsep
    pub fn normalized(mut self) -> Self {
        self.dtest = self.dtest.min(self.dsep);
        self
    }
}

/// 热路径比较用的平方缓存
#[derive(Debug, Clone, Copy)]
pub(crate) struct SquaredParams {
    pub dsep: f64,
    pub dtest: f64,
    pub dstep: f64,
    pub d_circle_join: f64,
    pub d_lookahead: f64,
}

impl From<&StreamlineParams> for SquaredParams {
    fn from(p: &StreamlineParams) -> Self {
        Self {
            dsep: p.dsep * p.dsep,
            dtest: p.dtest * p.dtest,
            dstep: p.dstep * p.dstep,
            d_circle_join: p.d_circle_join * p.d_circle_join,
            d_lookahead: p.d_lookahead * p.d_lookahead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtest_clamped_to_dsep() {
        let p = StreamlineParams {
            dsep: 20.0,
            dtest: 35.0,
            dstep: 1.0,
            d_circle_join: 5.0,
            d_lookahead: 40.0,
            road_join_angle: 0.1,
            path_integration_limit: 100,
            max_seed_tries: 30,
            early_collision_probability: 0.0,
            simplification_tolerance: 0.5,
            culdesac_probability: 0.0,
            culdesac_radius_min: 4.0,
            culdesac_radius_max: 9.0,
        }
        .normalized();
        assert_eq!(p.dtest, 20.0);
    }
}
