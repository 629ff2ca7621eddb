//! 网格空间索引
//!
//! 将世界划分为边长 dsep 的均匀格子，每个格子记录其中的采样点。
//! 流线生成器用它做密度约束：新采样点只需检查所在格子及 8 个
//! 邻居格子内的点即可判定最小距离。

use crate::geometry::Vector;

/// 网格空间索引
///
/// 格子边长取分离距离 dsep，这样任何距离小于 dsep 的已有点
/// 必然落在 3×3 邻域内。
///
/// # 示例
/// ```ignore
/// let mut grid = GridIndex::new(origin, dimensions, dsep);
/// grid.add_sample(p);
/// if grid.is_valid_sample(q, dtest * dtest) {
///     // q 与所有已有点的距离都不小于 dtest
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GridIndex {
    /// 世界原点（所有格子坐标相对于它）
    origin: Vector,
    /// 每个格子的边长
    dsep: f64,
    /// 网格列数
    cols: usize,
    /// 网格行数
    rows: usize,
    /// 每个格子内的采样点（扁平化存储）
    /// cells[y * cols + x] = 该格子内的点列表
    cells: Vec<Vec<Vector>>,
}

impl GridIndex {
    /// 构建空索引
    ///
    /// # 参数
    /// - `origin`: 世界矩形左上角
    /// - `dimensions`: 世界矩形尺寸
    /// - `dsep`: 格子边长（即采样分离距离）
    pub fn new(origin: Vector, dimensions: Vector, dsep: f64) -> Self {
        let dsep = dsep.max(1e-6);
        let cols = ((dimensions.x / dsep).ceil() as usize).max(1);
        let rows = ((dimensions.y / dsep).ceil() as usize).max(1);
        Self {
            origin,
            dsep,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    /// 格子边长
    pub fn separation(&self) -> f64 {
        self.dsep
    }

    /// 插入一个采样点。越界点放入最近的格子。
    pub fn add_sample(&mut self, p: Vector) {
        let (x, y) = self.cell_coords_clamped(p);
        self.cells[y * self.cols + x].push(p);
    }

    /// 插入一条折线的全部顶点
    pub fn add_polyline(&mut self, points: &[Vector]) {
        for &p in points {
            self.add_sample(p);
        }
    }

    /// 拷入另一索引的全部采样点
    ///
    /// 两个索引的格子尺寸可以不同，逐点重新分配。
    /// 拷贝之后二者互相独立。
    pub fn add_all(&mut self, other: &GridIndex) {
        for cell in &other.cells {
            for &p in cell {
                self.add_sample(p);
            }
        }
    }

    /// 采样有效性：p 的 3×3 邻域内所有已有点 q ≠ p
    /// 都满足 ‖p−q‖² ≥ sq_distance
    pub fn is_valid_sample(&self, p: Vector, sq_distance: f64) -> bool {
        let (cx, cy) = self.cell_coords_clamped(p);

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = cx as i64 + dx;
                let ny = cy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.cols as i64 || ny >= self.rows as i64 {
                    continue;
                }
                for &q in &self.cells[ny as usize * self.cols + nx as usize] {
                    if q != p && q.distance_sq(p) < sq_distance {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// 收集 p 周围 radius 范围所覆盖格子内的全部采样点
    ///
    /// 结果按格子粗筛，调用方需要精确距离时自行过滤。
    pub fn nearby_points(&self, p: Vector, radius: f64) -> Vec<Vector> {
        let reach = (radius / self.dsep).ceil() as i64;
        let (cx, cy) = self.cell_coords_clamped(p);

        let mut result = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let nx = cx as i64 + dx;
                let ny = cy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.cols as i64 || ny >= self.rows as i64 {
                    continue;
                }
                result.extend_from_slice(&self.cells[ny as usize * self.cols + nx as usize]);
            }
        }
        result
    }

    /// 世界坐标 → 格子坐标，越界时钳制到边缘格子
    fn cell_coords_clamped(&self, p: Vector) -> (usize, usize) {
        let x = ((p.x - self.origin.x) / self.dsep)
            .floor()
            .max(0.0)
            .min((self.cols - 1) as f64) as usize;
        let y = ((p.y - self.origin.y) / self.dsep)
            .floor()
            .max(0.0)
            .min((self.rows - 1) as f64) as usize;
        (x, y)
    }
}
