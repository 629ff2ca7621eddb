//! 几何基础模块
//!
//! 提供地图生成所需的全部二维几何原语：
//! - [`Vector`]: 二维向量与基础运算
//! - [`Polygon`]: 多边形（面积 / 质心 / 包含测试 / 随机内点）
//! - 凸包构建（Andrew 单调链）
//! - 折线简化（径向距离过滤 + Douglas–Peucker）

mod hull;
mod polygon;
mod simplify;
mod vector;

pub use hull::convex_hull;
pub use polygon::Polygon;
pub use simplify::{simplify, simplify_douglas_peucker, simplify_radial_dist};
pub use vector::Vector;
