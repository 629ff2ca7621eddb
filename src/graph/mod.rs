//! 平面图构建
//!
//! 把流线集合提升为平面图：沿每条流线按半格步长采样并吸附到
//! 粗网格，被多条流线访问的格点成为节点，节点之间沿流线的格点
//! 序列成为邻接边的路径。再用"最右转"遍历枚举最小封闭面。
//!
//! 节点按插入顺序持有稳定整数 ID，邻接关系对称；
//! 哈希查找一律走量化网格键 + 容差半径搜索，
//! 不依赖浮点坐标的哈希相等。

use crate::error::GenerationError;
use crate::geometry::{Polygon, Vector};
use std::collections::{HashMap, HashSet};

/// 流线吸附网格的格距
pub const GRID_RESOLUTION: f64 = 0.75;
/// 节点查找容差
const NODE_TOLERANCE: f64 = 0.01;
/// 封闭面质心去重容差
const CENTROID_TOLERANCE: f64 = 0.01;

/// 图节点
#[derive(Debug, Clone)]
pub struct Node {
    pub id: u32,
    pub position: Vector,
    /// 邻接表：(邻居 ID, 从本节点出发的格点路径)，插入有序
    neighbours: Vec<(u32, Vec<Vector>)>,
}

impl Node {
    pub fn neighbour_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.neighbours.iter().map(|(id, _)| *id)
    }

    pub fn is_neighbour(&self, id: u32) -> bool {
        self.neighbours.iter().any(|(n, _)| *n == id)
    }

    /// 到邻居的路径，以本节点位置开头
    pub fn path_to(&self, id: u32) -> Option<&[Vector]> {
        self.neighbours
            .iter()
            .find(|(n, _)| *n == id)
            .map(|(_, path)| path.as_slice())
    }
}

/// 最小封闭面
#[derive(Debug, Clone)]
pub struct ClosedLoop {
    /// 面上的节点 ID，遍历顺序
    pub nodes: Vec<u32>,
    /// 依次拼接邻接路径得到的多边形
    pub polygon: Polygon,
}

/// 平面图
#[derive(Debug, Clone)]
pub struct Graph {
    resolution: f64,
    nodes: Vec<Node>,
    lookup: HashMap<(i64, i64), u32>,
    closed_loops: Vec<ClosedLoop>,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_resolution(GRID_RESOLUTION)
    }

    /// 指定吸附网格格距（Voronoi 边图用 0.01）
    pub fn with_resolution(resolution: f64) -> Self {
        Self {
            resolution,
            nodes: Vec::new(),
            lookup: HashMap::new(),
            closed_loops: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: u32) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn closed_loops(&self) -> &[ClosedLoop] {
        &self.closed_loops
    }

    /// 从流线集合构建节点与邻接边
    pub fn add_streamlines(&mut self, streamlines: &[Vec<Vector>]) -> Result<(), GenerationError> {
        // Step 1: 每条流线的吸附格点序列（连续重复已去除）
        let per_streamline: Vec<Vec<Vector>> = streamlines
            .iter()
            .map(|line| self.sample_grid_points(line))
            .collect();

        // Step 2: 统计每个格点的访问次数
        let mut visit_counts: HashMap<(i64, i64), usize> = HashMap::new();
        for points in &per_streamline {
            for p in points {
                *visit_counts.entry(p.grid_key(self.resolution)).or_default() += 1;
            }
        }

        // Step 3: 访问次数 ≥ 2 的格点成为节点。
        // 按流线顺序遍历以保证节点 ID 的插入顺序确定。
        for points in &per_streamline {
            for &p in points {
                if visit_counts[&p.grid_key(self.resolution)] >= 2 {
                    self.ensure_node(p);
                }
            }
        }

        // Step 4: 沿每条流线连接相邻节点，路径为两节点之间的格点序列
        for points in &per_streamline {
            let node_positions: Vec<(usize, u32)> = points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| self.node_at(*p).map(|id| (i, id)))
                .collect();
            for pair in node_positions.windows(2) {
                let (i0, a) = pair[0];
                let (i1, b) = pair[1];
                if a == b {
                    continue;
                }
                let path: Vec<Vector> = points[i0..=i1].to_vec();
                self.add_neighbour(a, b, path)?;
            }
        }

        log::debug!("graph: {} nodes", self.nodes.len());
        Ok(())
    }

    /// 把每条流线经过的节点位置插回流线本身，
    /// 使简化后的道路精确通过交叉点。
    pub fn modify_streamlines(&self, streamlines: &mut [Vec<Vector>]) {
        for line in streamlines.iter_mut() {
            if line.len() < 2 {
                continue;
            }
            let mut insertions: Vec<(usize, Vector)> = Vec::new();
            let mut last_key: Option<(i64, i64)> = None;
            let segment_count = line.len() - 1;
            for i in 1..line.len() {
                let a = line[i - 1];
                let b = line[i];
                for p in segment_samples(a, b, self.resolution, i == 1, i == segment_count) {
                    let key = p.grid_key(self.resolution);
                    if last_key == Some(key) {
                        continue;
                    }
                    last_key = Some(key);
                    if let Some(id) = self.node_at(p.snapped(self.resolution)) {
                        insertions.push((i, self.nodes[id as usize].position));
                    }
                }
            }

            // 按原始下标插入，偏移随已有插入递增
            let mut offset = 0usize;
            for (index, p) in insertions {
                let at = (index + offset).min(line.len());
                if line[at - 1].approx_eq(p, NODE_TOLERANCE)
                    || (at < line.len() && line[at].approx_eq(p, NODE_TOLERANCE))
                {
                    continue;
                }
                line.insert(at, p);
                offset += 1;
            }
        }
    }

    /// 由一组线段直接建图（端点即节点）
    ///
    /// Voronoi 多边形提取用。端点在容差内合并；
    /// 两端合并为同一节点的退化边视为不变量破坏。
    pub fn add_edge_segments(
        &mut self,
        segments: &[(Vector, Vector)],
    ) -> Result<(), GenerationError> {
        for &(start, end) in segments {
            let a = self.ensure_node(start);
            let b = self.ensure_node(end);
            if a == b {
                return Err(GenerationError::SelfLoopEdge(start));
            }
            let path = vec![self.nodes[a as usize].position, self.nodes[b as usize].position];
            self.add_neighbour(a, b, path)?;
        }
        Ok(())
    }

    /// 最小封闭面枚举
    ///
    /// 对每个 (起点, 邻居) 组合做最右转行走：每步在未访问邻居中
    /// 选择与来向方向角最大者；走到起点的邻居且回路节点数大于 3
    /// 时闭合。面按节点位置质心去重（容差 0.01），
    /// 旋转 / 反向的同一面只保留一次。
    pub fn find_closed_loops(&mut self, max_size: usize) {
        let mut loops: Vec<ClosedLoop> = Vec::new();
        let mut seen_centroids: HashSet<(i64, i64)> = HashSet::new();

        for b in 0..self.nodes.len() as u32 {
            let first_neighbours: Vec<u32> = self.nodes[b as usize].neighbour_ids().collect();
            for n in first_neighbours {
                if let Some(loop_nodes) = self.walk_rightmost(b, n, max_size) {
                    let centroid = self.loop_centroid(&loop_nodes);
                    let key = (
                        (centroid.x / CENTROID_TOLERANCE).round() as i64,
                        (centroid.y / CENTROID_TOLERANCE).round() as i64,
                    );
                    if !seen_centroids.insert(key) {
                        continue;
                    }
                    if let Some(polygon) = self.loop_polygon(&loop_nodes) {
                        loops.push(ClosedLoop {
                            nodes: loop_nodes,
                            polygon,
                        });
                    }
                }
            }
        }

        log::debug!("graph: {} closed loops", loops.len());
        self.closed_loops = loops;
    }

    /// 单次最右转行走。闭合时返回回路节点序列。
    fn walk_rightmost(&self, b: u32, first: u32, max_size: usize) -> Option<Vec<u32>> {
        let mut base_dir = self.nodes[first as usize].position - self.nodes[b as usize].position;
        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(b);
        let mut loop_nodes = vec![b];
        let mut current = first;

        loop {
            visited.insert(current);
            loop_nodes.push(current);
            if loop_nodes.len() >= max_size {
                return None;
            }

            let current_pos = self.nodes[current as usize].position;

            if loop_nodes.len() > 3 && self.nodes[current as usize].is_neighbour(b) {
                return Some(loop_nodes);
            }

            let mut best: Option<(u32, f64)> = None;
            for next in self.nodes[current as usize].neighbour_ids() {
                if visited.contains(&next) {
                    continue;
                }
                let angle = base_dir
                    .directional_angle_to(self.nodes[next as usize].position - current_pos);
                if angle <= 0.0 || angle >= std::f64::consts::TAU {
                    continue;
                }
                if best.map_or(true, |(_, a)| angle > a) {
                    best = Some((next, angle));
                }
            }

            match best {
                Some((next, _)) => {
                    base_dir = self.nodes[next as usize].position - current_pos;
                    current = next;
                }
                None => return None,
            }
        }
    }

    /// 回路节点位置的算术平均
    fn loop_centroid(&self, loop_nodes: &[u32]) -> Vector {
        let sum = loop_nodes
            .iter()
            .fold(Vector::ZERO, |acc, id| acc + self.nodes[*id as usize].position);
        sum / loop_nodes.len() as f64
    }

    /// 依次拼接邻接路径得到面多边形
    fn loop_polygon(&self, loop_nodes: &[u32]) -> Option<Polygon> {
        let mut vertices: Vec<Vector> = Vec::new();
        let count = loop_nodes.len();
        for i in 0..count {
            let a = loop_nodes[i];
            let b = loop_nodes[(i + 1) % count];
            let path = self.nodes[a as usize].path_to(b)?;
            for &p in &path[..path.len() - 1] {
                if vertices.last().map_or(true, |v| !v.approx_eq(p, 1e-9)) {
                    vertices.push(p);
                }
            }
        }
        Polygon::new(vertices).ok()
    }

    /// 按半格步长沿流线采样并吸附，去除连续重复。
    /// 首末线段的采样越过端点半步，捕捉贴近端点的交叉。
    fn sample_grid_points(&self, line: &[Vector]) -> Vec<Vector> {
        let mut points: Vec<Vector> = Vec::new();
        if line.len() < 2 {
            return points;
        }
        let segment_count = line.len() - 1;
        for i in 1..line.len() {
            let a = line[i - 1];
            let b = line[i];
            for p in segment_samples(a, b, self.resolution, i == 1, i == segment_count) {
                let snapped = p.snapped(self.resolution);
                if points.last().map_or(true, |last| *last != snapped) {
                    points.push(snapped);
                }
            }
        }
        points
    }

    /// 容差半径内查找已有节点
    fn node_at(&self, p: Vector) -> Option<u32> {
        let (kx, ky) = p.grid_key(self.resolution);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if let Some(&id) = self.lookup.get(&(kx + dx, ky + dy)) {
                    if self.nodes[id as usize].position.approx_eq(p, NODE_TOLERANCE) {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    /// 查找或创建节点，ID 为插入顺序
    fn ensure_node(&mut self, p: Vector) -> u32 {
        if let Some(id) = self.node_at(p) {
            return id;
        }
        let id = self.nodes.len() as u32;
        self.nodes.push(Node {
            id,
            position: p,
            neighbours: Vec::new(),
        });
        self.lookup.insert(p.grid_key(self.resolution), id);
        id
    }

    /// 添加对称邻接边。路径从 a 出发；b 侧存反向路径。
    /// 已有的邻接关系不覆盖。
    fn add_neighbour(
        &mut self,
        a: u32,
        b: u32,
        path: Vec<Vector>,
    ) -> Result<(), GenerationError> {
        if a == b {
            return Err(GenerationError::SelfNeighbour(a));
        }
        if !self.nodes[a as usize].is_neighbour(b) {
            let mut reversed = path.clone();
            reversed.reverse();
            self.nodes[a as usize].neighbours.push((b, path));
            self.nodes[b as usize].neighbours.push((a, reversed));
        }
        Ok(())
    }
}

/// 按半格步长在线段上取样
///
/// 首线段从 −1 取到 steps，末线段取到 steps+1，
/// 其余线段取 0..=steps。
fn segment_samples(a: Vector, b: Vector, resolution: f64, first: bool, last: bool) -> Vec<Vector> {
    let half = resolution / 2.0;
    let steps = ((a.distance(b) / half).floor() as i64).max(1);
    let from = if first { -1 } else { 0 };
    let to = if last { steps + 1 } else { steps };
    (from..=to)
        .map(|j| a + (b - a) * (j as f64 / steps as f64))
        .collect()
}
