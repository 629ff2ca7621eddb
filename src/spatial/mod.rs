//! 空间索引模块
//!
//! 道路生成的分离距离约束依赖大量"附近有没有已有采样点"的查询，
//! 均匀网格索引把单次查询压到 O(1)：
//! - 采样有效性检查（新点到所有已有点的最小距离）
//! - 范围收集（悬挂端点接合时的 dlookahead 搜索）
//!
//! # 主要类型
//! - [`GridIndex`][]: 基于均匀网格的采样点索引

mod grid_index;

pub use grid_index::GridIndex;
