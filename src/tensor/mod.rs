//! 张量场模块
//!
//! 道路走向由一个二维对称无迹张量场决定：场在每一点给出一对
//! 互相垂直的特征方向（Major / Minor），流线沿其中一个方向积分。
//!
//! # 主要类型
//! - [`Tensor`]: 幅值 + 角度编码的 2×2 对称无迹张量
//! - [`BasisField`]: 网格 / 径向两种带衰减的基础场
//! - [`TensorField`]: 基础场加权叠加 + 旋转噪声 + 水域掩膜
//! - [`NoiseParams`]: 旋转噪声参数

mod basis;
mod field;
#[allow(clippy::module_inception)]
mod tensor;

pub use basis::{BasisField, BasisKind};
pub use field::{NoiseParams, TensorField};
pub use tensor::Tensor;
