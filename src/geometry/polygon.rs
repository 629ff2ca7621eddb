//! 多边形
//!
//! 顶点数 ≥ 3，隐式闭合。面积（鞋带公式取绝对值）与
//! 轴对齐包围盒在构造时缓存。

use super::Vector;
use crate::error::GenerationError;
use crate::rng;

/// 随机内点采样的默认尝试上限
const RANDOM_POINT_TRIES: usize = 64;

#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Vector>,
    area: f64,
    bbox_min: Vector,
    bbox_max: Vector,
}

impl Polygon {
    /// 由顶点序列构造。顶点数不足 3 是前置条件违反。
    pub fn new(vertices: Vec<Vector>) -> Result<Self, GenerationError> {
        if vertices.len() < 3 {
            return Err(GenerationError::InvalidPolygon(vertices.len()));
        }
        let area = shoelace_area(&vertices).abs();
        let (bbox_min, bbox_max) = bounding_box(&vertices);
        Ok(Self {
            vertices,
            area,
            bbox_min,
            bbox_max,
        })
    }

    pub fn vertices(&self) -> &[Vector] {
        &self.vertices
    }

    /// 鞋带公式面积的绝对值，与顶点方向无关
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn bounding_box(&self) -> (Vector, Vector) {
        (self.bbox_min, self.bbox_max)
    }

    /// 质心：顶点的算术平均
    pub fn centroid(&self) -> Vector {
        let sum = self
            .vertices
            .iter()
            .fold(Vector::ZERO, |acc, v| acc + *v);
        sum / self.vertices.len() as f64
    }

    /// 经典射线投射（奇偶规则）包含测试
    pub fn contains(&self, p: Vector) -> bool {
        if p.x < self.bbox_min.x
            || p.x > self.bbox_max.x
            || p.y < self.bbox_min.y
            || p.y > self.bbox_max.y
        {
            return false;
        }

        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if ((vi.y > p.y) != (vj.y > p.y))
                && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// 绕质心缩放
    pub fn scaled(&self, factor: f64) -> Polygon {
        let c = self.centroid();
        let vertices = self
            .vertices
            .iter()
            .map(|v| c + (*v - c) * factor)
            .collect();
        // 缩放不改变顶点数，构造不会失败
        Polygon::new(vertices).expect("scaled polygon keeps vertex count")
    }

    /// 包围盒上的拒绝采样随机内点
    ///
    /// 尝试次数耗尽时退回第一个顶点（可恢复的局部失败）。
    pub fn random_interior_point(&self) -> Vector {
        for _ in 0..RANDOM_POINT_TRIES {
            let p = Vector::new(
                rng::next_f64(self.bbox_min.x, self.bbox_max.x),
                rng::next_f64(self.bbox_min.y, self.bbox_max.y),
            );
            if self.contains(p) {
                return p;
            }
        }
        log::warn!("random interior point sampling exhausted, falling back to a vertex");
        self.vertices[0]
    }
}

fn shoelace_area(vertices: &[Vector]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.cross(b);
    }
    sum * 0.5
}

fn bounding_box(vertices: &[Vector]) -> (Vector, Vector) {
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in &vertices[1..] {
        min.x = min.x.min(v.x);
        min.y = min.y.min(v.y);
        max.x = max.x.max(v.x);
        max.y = max.y.max(v.y);
    }
    (min, max)
}
