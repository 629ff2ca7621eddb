//! Voronoi 图（增量半平面裁剪法）
//!
//! 岛屿轮廓生成的基础。逐个插入站点，对每个已有单元格用
//! 垂直平分线裁剪其边集；裁剪产生的临界点成对连成新边。
//!
//! # 算法流程
//! 1. 用四个矩形"哨兵"单元格包围平面（站点在 ±2.5 倍图尺寸处）
//! 2. 逐站点插入：对每个已有单元格按垂直平分线分类各边，
//!    同侧删除、异侧截断，恰好 2 个临界点时连成新边
//! 3. 全部站点插入后按边界矩形裁剪，边界上排序后的临界点
//!    连成贴边的新链
//! 4. 在全局边集上建图（节点容差 0.01）枚举封闭面，
//!    恰好包含一个站点的面成为输出多边形
//!
//! 临界点计数不在 {0, 2} 内说明数值不一致，本模块返回错误，
//! 调用方按"种子 +1 重试"策略恢复。

use crate::error::GenerationError;
use crate::geometry::{Polygon, Vector};
use crate::graph::Graph;
use crate::rng;

/// 平分线侧别判定容差
const POINT_POSITION_TOLERANCE: f64 = 0.001;
/// 全局边去重的端点量化分辨率
const EDGE_SNAP_RESOLUTION: f64 = 0.01;
/// 哨兵站点相对图尺寸的距离倍数
const SENTINEL_FACTOR: f64 = 2.5;
/// 图尺寸 = 站点包围盒尺寸 × 此系数
const SIZE_FACTOR: f64 = 0.51;
/// 封闭面遍历的节点数上限
const MAX_CELL_LOOP_SIZE: usize = 64;

/// Voronoi 边。Start 为字典序较小的端点。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiEdge {
    pub start: Vector,
    pub end: Vector,
}

impl VoronoiEdge {
    pub fn new(a: Vector, b: Vector) -> Self {
        if a.lex_cmp(b) == std::cmp::Ordering::Greater {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// 端点量化后的去重键
    fn key(&self) -> (i64, i64, i64, i64) {
        let s = self.start.grid_key(EDGE_SNAP_RESOLUTION);
        let e = self.end.grid_key(EDGE_SNAP_RESOLUTION);
        (s.0, s.1, e.0, e.1)
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// 与另一条边在容差内重合（不计方向）
    pub fn approx_matches(&self, other: &VoronoiEdge, tolerance: f64) -> bool {
        (self.start.approx_eq(other.start, tolerance) && self.end.approx_eq(other.end, tolerance))
            || (self.start.approx_eq(other.end, tolerance)
                && self.end.approx_eq(other.start, tolerance))
    }
}

/// Voronoi 单元格
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    pub site: Vector,
    pub edges: Vec<VoronoiEdge>,
    /// 哨兵单元格不参与输出
    pub sentinel: bool,
}

impl VoronoiCell {
    /// 单元格边端点的算术平均
    pub fn centroid(&self) -> Vector {
        if self.edges.is_empty() {
            return self.site;
        }
        let mut sum = Vector::ZERO;
        for e in &self.edges {
            sum = sum + e.start + e.end;
        }
        sum / (self.edges.len() as f64 * 2.0)
    }
}

/// Voronoi 图
#[derive(Debug)]
pub struct Voronoi {
    cells: Vec<VoronoiCell>,
    /// 全局去重边集（确定性顺序）
    pub edges: Vec<VoronoiEdge>,
    /// 恰好包含一个站点的封闭面
    pub polygons: Vec<Polygon>,
    center: Vector,
    /// 0.51 × 站点包围盒尺寸
    size: Vector,
}

impl Voronoi {
    pub fn new(sites: &[Vector]) -> Result<Self, GenerationError> {
        let (min, max) = site_bounds(sites);
        let center = (min + max) / 2.0;
        let size = Vector::new(
            ((max.x - min.x) * SIZE_FACTOR).max(1e-3),
            ((max.y - min.y) * SIZE_FACTOR).max(1e-3),
        );

        let mut voronoi = Self {
            cells: sentinel_cells(center, size),
            edges: Vec::new(),
            polygons: Vec::new(),
            center,
            size,
        };

        for &site in sites {
            voronoi.insert_site(site)?;
        }
        voronoi.clip_to_border()?;
        voronoi.collect_edges();
        voronoi.build_polygons(sites)?;
        Ok(voronoi)
    }

    /// 非哨兵单元格
    pub fn cells(&self) -> impl Iterator<Item = &VoronoiCell> {
        self.cells.iter().filter(|c| !c.sentinel)
    }

    /// Lloyd 松弛一步：以当前多边形的质心为新站点重建
    pub fn refine(&self) -> Result<Self, GenerationError> {
        let sites: Vec<Vector> = self.polygons.iter().map(|p| p.centroid()).collect();
        Self::new(&sites)
    }

    /// 插入一个站点，对所有已有单元格做半平面裁剪
    fn insert_site(&mut self, site: Vector) -> Result<(), GenerationError> {
        for cell in &self.cells {
            if cell.site.approx_eq(site, POINT_POSITION_TOLERANCE) {
                return Err(GenerationError::DuplicateSite(site));
            }
        }

        let mut new_cell = VoronoiCell {
            site,
            edges: Vec::new(),
            sentinel: false,
        };

        for cell in self.cells.iter_mut() {
            // 垂直平分线：过中点，方向垂直于站点连线。
            // 方向单位化，使侧别容差与站点间距无关。
            let mid = (site + cell.site) / 2.0;
            let dir = (cell.site - site).perpendicular_ccw().normalized();
            let site_near = point_position(mid, dir, site);

            let mut criticals: Vec<Vector> = Vec::new();
            let mut kept: Vec<VoronoiEdge> = Vec::new();

            for edge in &cell.edges {
                let start_near = point_position(mid, dir, edge.start) == site_near;
                let end_near = point_position(mid, dir, edge.end) == site_near;

                match (start_near, end_near) {
                    // 整条边在新站点一侧：删除
                    (true, true) => {}
                    // 整条边在原站点一侧：保留
                    (false, false) => kept.push(*edge),
                    // 跨线：截断到原站点一侧，交点记为临界点
                    _ => {
                        let x = line_segment_intersection(mid, dir, edge.start, edge.end)
                            .ok_or(GenerationError::DegenerateBisector)?;
                        if !criticals
                            .iter()
                            .any(|c| c.approx_eq(x, POINT_POSITION_TOLERANCE))
                        {
                            criticals.push(x);
                        }
                        let far = if start_near { edge.end } else { edge.start };
                        if !far.approx_eq(x, POINT_POSITION_TOLERANCE) {
                            kept.push(VoronoiEdge::new(far, x));
                        }
                    }
                }
            }

            match criticals.len() {
                0 => {
                    cell.edges = kept;
                }
                2 => {
                    if criticals[0].approx_eq(criticals[1], POINT_POSITION_TOLERANCE) {
                        return Err(GenerationError::SelfLoopEdge(criticals[0]));
                    }
                    let bridge = VoronoiEdge::new(criticals[0], criticals[1]);
                    kept.push(bridge);
                    cell.edges = kept;
                    new_cell.edges.push(bridge);
                }
                n => return Err(GenerationError::CriticalPointCount(n)),
            }
        }

        self.cells.push(new_cell);
        Ok(())
    }

    /// 按边界矩形裁剪全部单元格
    ///
    /// 每条边界线上的临界点（含矩形角点）排序后连成贴边的边链，
    /// 链上每条边归入站点最近的单元格。
    fn clip_to_border(&mut self) -> Result<(), GenerationError> {
        let min = self.center - self.size;
        let max = self.center + self.size;
        let corners = [
            Vector::new(min.x, min.y),
            Vector::new(max.x, min.y),
            Vector::new(max.x, max.y),
            Vector::new(min.x, max.y),
        ];

        for side in 0..4 {
            let a = corners[side];
            let b = corners[(side + 1) % 4];
            let dir = (b - a).normalized();
            // 内侧 = 矩形中心所在的一侧
            let center_near = point_position(a, dir, self.center);

            let mut criticals: Vec<Vector> = vec![a, b];

            for cell in self.cells.iter_mut() {
                let mut kept: Vec<VoronoiEdge> = Vec::new();
                for edge in &cell.edges {
                    let start_inside = point_position(a, dir, edge.start) == center_near;
                    let end_inside = point_position(a, dir, edge.end) == center_near;
                    match (start_inside, end_inside) {
                        (true, true) => kept.push(*edge),
                        (false, false) => {}
                        _ => {
                            let x = line_segment_intersection(a, dir, edge.start, edge.end)
                                .ok_or(GenerationError::DegenerateBisector)?;
                            if !criticals
                                .iter()
                                .any(|c| c.approx_eq(x, POINT_POSITION_TOLERANCE))
                            {
                                criticals.push(x);
                            }
                            let inside = if start_inside { edge.start } else { edge.end };
                            if !inside.approx_eq(x, POINT_POSITION_TOLERANCE) {
                                kept.push(VoronoiEdge::new(inside, x));
                            }
                        }
                    }
                }
                cell.edges = kept;
            }

            // 沿边界方向排序，相邻临界点连成边链
            criticals.sort_by(|p, q| {
                let tp = (*p - a).dot(dir);
                let tq = (*q - a).dot(dir);
                tp.total_cmp(&tq)
            });

            for pair in criticals.windows(2) {
                if pair[0].approx_eq(pair[1], POINT_POSITION_TOLERANCE) {
                    continue;
                }
                let edge = VoronoiEdge::new(pair[0], pair[1]);
                let midpoint = (edge.start + edge.end) / 2.0;
                if let Some(cell) = self.nearest_cell_mut(midpoint) {
                    cell.edges.push(edge);
                }
            }
        }
        Ok(())
    }

    fn nearest_cell_mut(&mut self, p: Vector) -> Option<&mut VoronoiCell> {
        self.cells
            .iter_mut()
            .min_by(|a, b| a.site.distance_sq(p).total_cmp(&b.site.distance_sq(p)))
    }

    /// 汇总非哨兵单元格的边，按量化端点去重
    fn collect_edges(&mut self) {
        let mut seen: std::collections::HashSet<(i64, i64, i64, i64)> =
            std::collections::HashSet::new();
        let mut edges = Vec::new();
        for cell in self.cells.iter().filter(|c| !c.sentinel) {
            for edge in &cell.edges {
                if seen.insert(edge.key()) {
                    edges.push(*edge);
                }
            }
        }
        self.edges = edges;
    }

    /// 在全局边集上建图并枚举封闭面
    fn build_polygons(&mut self, sites: &[Vector]) -> Result<(), GenerationError> {
        if self.edges.is_empty() {
            return Ok(());
        }
        let segments: Vec<(Vector, Vector)> =
            self.edges.iter().map(|e| (e.start, e.end)).collect();
        let mut graph = Graph::with_resolution(0.01);
        graph.add_edge_segments(&segments)?;
        graph.find_closed_loops(MAX_CELL_LOOP_SIZE);

        let mut polygons = Vec::new();
        for lp in graph.closed_loops() {
            let contained = sites.iter().filter(|s| lp.polygon.contains(**s)).count();
            if contained == 1 {
                polygons.push(lp.polygon.clone());
            }
        }
        if polygons.len() < sites.len() {
            log::warn!(
                "voronoi: {} of {} cell polygons failed to close",
                sites.len() - polygons.len(),
                sites.len()
            );
        }
        self.polygons = polygons;
        Ok(())
    }
}

/// 在矩形内均匀采样 n 个点，两两距离不小于 min_dist
///
/// 每次拒绝把目标抽样次数加一，直到接受 n 个；
/// 为防止参数过密导致死循环，抽样总数有安全上限。
pub fn generate_points(min: Vector, max: Vector, n: usize, min_dist: f64) -> Vec<Vector> {
    let min_dist_sq = min_dist * min_dist;
    let mut accepted: Vec<Vector> = Vec::new();
    let mut draws = n;
    let mut i = 0;
    let cap = n.saturating_mul(100);
    while i < draws && i < cap {
        let p = Vector::new(rng::next_f64(min.x, max.x), rng::next_f64(min.y, max.y));
        if accepted.iter().all(|q| q.distance_sq(p) >= min_dist_sq) {
            accepted.push(p);
        } else {
            draws += 1;
        }
        i += 1;
    }
    if accepted.len() < n {
        log::warn!(
            "generate_points: accepted {} of {} requested",
            accepted.len(),
            n
        );
    }
    accepted
}

/// 平分线侧别：true = 正侧。线上的点按正侧处理（右优先）。
fn point_position(anchor: Vector, dir: Vector, p: Vector) -> bool {
    let s = dir.cross(p - anchor);
    if s.abs() <= POINT_POSITION_TOLERANCE {
        return true;
    }
    s > 0.0
}

/// 直线 (anchor, dir) 与线段 [a, b] 的交点
///
/// 平行（分母退化）时返回 None。
fn line_segment_intersection(anchor: Vector, dir: Vector, a: Vector, b: Vector) -> Option<Vector> {
    let denom = dir.cross(b - a);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = dir.cross(anchor - a) / denom;
    Some(a + (b - a) * t)
}

fn site_bounds(sites: &[Vector]) -> (Vector, Vector) {
    let mut min = sites.first().copied().unwrap_or(Vector::ZERO);
    let mut max = min;
    for s in sites {
        min.x = min.x.min(s.x);
        min.y = min.y.min(s.y);
        max.x = max.x.max(s.x);
        max.y = max.y.max(s.y);
    }
    (min, max)
}

/// 四个矩形哨兵单元格：窗口 [c − 5·size, c + 5·size] 的四个象限，
/// 站点在各象限中心（即 c ± 2.5·size）。
fn sentinel_cells(center: Vector, size: Vector) -> Vec<VoronoiCell> {
    let reach = Vector::new(size.x * SENTINEL_FACTOR * 2.0, size.y * SENTINEL_FACTOR * 2.0);
    let mut cells = Vec::with_capacity(4);
    for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
        let site = center + Vector::new(sx * size.x * SENTINEL_FACTOR, sy * size.y * SENTINEL_FACTOR);
        let corner = center + Vector::new(sx * reach.x, sy * reach.y);
        let min = Vector::new(center.x.min(corner.x), center.y.min(corner.y));
        let max = Vector::new(center.x.max(corner.x), center.y.max(corner.y));
        let quad = [
            Vector::new(min.x, min.y),
            Vector::new(max.x, min.y),
            Vector::new(max.x, max.y),
            Vector::new(min.x, max.y),
        ];
        let edges = (0..4)
            .map(|i| VoronoiEdge::new(quad[i], quad[(i + 1) % 4]))
            .collect();
        cells.push(VoronoiCell {
            site,
            edges,
            sentinel: true,
        });
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vector {
        Vector::new(x, y)
    }

    fn square_sites() -> Vec<Vector> {
        vec![v(1.0, 1.0), v(9.0, 1.0), v(1.0, 9.0), v(9.0, 9.0)]
    }

    #[test]
    fn four_sites_four_polygons() {
        let voronoi = Voronoi::new(&square_sites()).unwrap();
        assert_eq!(voronoi.polygons.len(), 4);
    }

    #[test]
    fn each_polygon_contains_exactly_one_site() {
        let sites = square_sites();
        let voronoi = Voronoi::new(&sites).unwrap();
        for polygon in &voronoi.polygons {
            let contained = sites.iter().filter(|s| polygon.contains(**s)).count();
            assert_eq!(contained, 1);
        }
    }

    #[test]
    fn half_plane_correctness_on_polygon_interior() {
        let sites = square_sites();
        let voronoi = Voronoi::new(&sites).unwrap();
        crate::rng::reseed(17);
        for polygon in &voronoi.polygons {
            let owner = sites
                .iter()
                .copied()
                .find(|s| polygon.contains(*s))
                .unwrap();
            for _ in 0..16 {
                let p = polygon.random_interior_point();
                let owner_dist = p.distance(owner);
                for other in sites.iter().filter(|s| **s != owner) {
                    assert!(p.distance(*other) + 0.01 >= owner_dist);
                }
            }
        }
    }

    #[test]
    fn refine_keeps_cell_count() {
        let voronoi = Voronoi::new(&square_sites()).unwrap();
        let refined = voronoi.refine().unwrap();
        assert_eq!(refined.polygons.len(), 4);
    }

    #[test]
    fn duplicate_sites_are_fatal() {
        let err = Voronoi::new(&[v(1.0, 1.0), v(1.0, 1.0), v(5.0, 5.0)]).unwrap_err();
        assert!(matches!(err, GenerationError::DuplicateSite(_)));
    }

    #[test]
    fn edges_are_lexicographically_oriented() {
        let voronoi = Voronoi::new(&square_sites()).unwrap();
        for edge in &voronoi.edges {
            assert_ne!(edge.start.lex_cmp(edge.end), std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn generate_points_respects_min_distance() {
        crate::rng::reseed(13);
        let points = generate_points(v(0.0, 0.0), v(100.0, 100.0), 40, 5.0);
        assert_eq!(points.len(), 40);
        for (i, p) in points.iter().enumerate() {
            for q in &points[i + 1..] {
                assert!(p.distance(*q) >= 5.0 - 1e-9);
            }
        }
    }

    #[test]
    fn construction_is_deterministic() {
        crate::rng::reseed(99);
        let sites = generate_points(v(0.0, 0.0), v(50.0, 50.0), 12, 4.0);
        let a = Voronoi::new(&sites).unwrap();
        let b = Voronoi::new(&sites).unwrap();
        assert_eq!(a.edges.len(), b.edges.len());
        assert_eq!(a.polygons.len(), b.polygons.len());
    }
}
