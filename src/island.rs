//! 岛屿轮廓
//!
//! 在 Voronoi 图上按边界形状谓词把单元格分为陆地与海洋，
//! 两侧共享的边即海岸线；贪心排序把无序边集串成闭合多边形，
//! 再细分长边并加垂直扰动得到有机的海岸形态。

use crate::error::GenerationError;
use crate::geometry::{Polygon, Vector};
use crate::rng;
use crate::voronoi::{Voronoi, VoronoiEdge};

/// 海岸线边匹配容差
const COAST_MATCH_TOLERANCE: f64 = 0.1;
/// 细分阈值：边长超过平均边长的该倍数时细分
const REFINE_LENGTH_FACTOR: f64 = 3.0;
/// 扰动换侧概率
const FLIP_SIDE_PROBABILITY: f64 = 0.2;

/// 边界形状谓词
///
/// 以标签变体取代继承：圆盘、多边形、并集，
/// 包含测试按标签分派。
#[derive(Debug, Clone)]
pub enum BoundaryShape {
    Disk { center: Vector, radius: f64 },
    Polygon(Polygon),
    Union(Vec<BoundaryShape>),
}

impl BoundaryShape {
    pub fn contains(&self, p: Vector) -> bool {
        match self {
            BoundaryShape::Disk { center, radius } => {
                p.distance_sq(*center) <= radius * radius
            }
            BoundaryShape::Polygon(polygon) => polygon.contains(p),
            BoundaryShape::Union(shapes) => shapes.iter().any(|s| s.contains(p)),
        }
    }
}

/// 由 Voronoi 图与边界形状提取海岸线多边形
///
/// 1. 非哨兵单元格按质心分为陆地 / 海洋
/// 2. 陆地边中与某条海洋边重合者构成海岸线
/// 3. 贪心排序串成闭合多边形
pub fn trace_coastline(
    voronoi: &Voronoi,
    shape: &BoundaryShape,
) -> Result<Polygon, GenerationError> {
    let mut land_edges: Vec<VoronoiEdge> = Vec::new();
    let mut sea_edges: Vec<VoronoiEdge> = Vec::new();

    for cell in voronoi.cells() {
        if shape.contains(cell.centroid()) {
            land_edges.extend(cell.edges.iter().copied());
        } else {
            sea_edges.extend(cell.edges.iter().copied());
        }
    }

    let mut coastline: Vec<VoronoiEdge> = Vec::new();
    for edge in &land_edges {
        if sea_edges
            .iter()
            .any(|sea| edge.approx_matches(sea, COAST_MATCH_TOLERANCE))
            && !coastline
                .iter()
                .any(|known| edge.approx_matches(known, COAST_MATCH_TOLERANCE))
        {
            coastline.push(*edge);
        }
    }

    log::debug!(
        "coastline: {} edges from {} land / {} sea",
        coastline.len(),
        land_edges.len(),
        sea_edges.len()
    );

    order_coastline(&coastline)
}

/// 贪心排序：把无序海岸线边集串成顶点序列
///
/// 从字典序最小的顶点出发，初始方向 (0, 1)；每步在共享当前
/// 顶点的未用边中选方向角最小者；无可用边时在所有未用边端点
/// 中按 角度 + (距离 / 最长边) · 2π 最小合成一条桥接边。
fn order_coastline(edges: &[VoronoiEdge]) -> Result<Polygon, GenerationError> {
    if edges.len() < 3 {
        return Err(GenerationError::InvalidPolygon(edges.len()));
    }

    let max_edge_length = edges
        .iter()
        .map(|e| e.length())
        .fold(0.0f64, f64::max)
        .max(1e-9);

    let start = edges
        .iter()
        .flat_map(|e| [e.start, e.end])
        .min_by(|a, b| a.lex_cmp(*b))
        .unwrap();

    let mut used = vec![false; edges.len()];
    let mut vertices = vec![start];
    let mut current = start;
    let mut prev_dir = Vector::new(0.0, 1.0);

    loop {
        // 共享当前顶点的未用边中取方向角最小者
        let mut best: Option<(usize, Vector, f64)> = None;
        for (i, edge) in edges.iter().enumerate() {
            if used[i] {
                continue;
            }
            let far = if edge.start.approx_eq(current, COAST_MATCH_TOLERANCE) {
                edge.end
            } else if edge.end.approx_eq(current, COAST_MATCH_TOLERANCE) {
                edge.start
            } else {
                continue;
            };
            let angle = prev_dir.directional_angle_to(far - current);
            if best.as_ref().map_or(true, |(_, _, a)| angle < *a) {
                best = Some((i, far, angle));
            }
        }

        match best {
            Some((i, far, _)) => {
                used[i] = true;
                prev_dir = far - current;
                current = far;
                vertices.push(current);
            }
            None => {
                // 桥接：角度与距离的联合评分
                let mut bridge: Option<(Vector, f64)> = None;
                for (i, edge) in edges.iter().enumerate() {
                    if used[i] {
                        continue;
                    }
                    for endpoint in [edge.start, edge.end] {
                        let angle = prev_dir.directional_angle_to(endpoint - current);
                        let score = angle
                            + (endpoint.distance(current) / max_edge_length)
                                * std::f64::consts::TAU;
                        if bridge.as_ref().map_or(true, |(_, s)| score < *s) {
                            bridge = Some((endpoint, score));
                        }
                    }
                }
                match bridge {
                    Some((endpoint, _)) => {
                        prev_dir = endpoint - current;
                        current = endpoint;
                        vertices.push(current);
                    }
                    None => break, // 所有边已用完
                }
            }
        }

        if current.approx_eq(start, COAST_MATCH_TOLERANCE) {
            break;
        }
    }

    // 闭合点不重复存储
    if vertices.len() > 1 && vertices.last().unwrap().approx_eq(start, COAST_MATCH_TOLERANCE) {
        vertices.pop();
    }

    Polygon::new(vertices)
}

/// 海岸线细化
///
/// 边长平方超过 (平均边长 × 3)² 的边按 ⌈长度²/阈值²⌉ 等分，
/// 中间点沿边的垂直方向加 [5%, 20%] 边长的随机扰动，
/// 以 0.2 的概率换到另一侧。
pub fn refine_coastline(coastline: &Polygon) -> Polygon {
    let vertices = coastline.vertices();
    let n = vertices.len();

    let average = (0..n)
        .map(|i| vertices[i].distance(vertices[(i + 1) % n]))
        .sum::<f64>()
        / n as f64;
    let threshold_sq = (average * REFINE_LENGTH_FACTOR).powi(2);

    let mut refined: Vec<Vector> = Vec::new();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        refined.push(a);

        let length_sq = a.distance_sq(b);
        if length_sq <= threshold_sq {
            continue;
        }

        let steps = (length_sq / threshold_sq).ceil() as usize;
        let length = length_sq.sqrt();
        let perp = (b - a).perpendicular_ccw().normalized();
        let mut side = 1.0;
        for k in 1..steps {
            if rng::value() < FLIP_SIDE_PROBABILITY {
                side = -side;
            }
            let offset = rng::next_f64(0.05, 0.20) * length * side;
            let p = a + (b - a) * (k as f64 / steps as f64) + perp * offset;
            refined.push(p);
        }
    }

    // 细分不减少顶点，构造不会失败
    Polygon::new(refined).expect("refined coastline keeps vertex count")
}
