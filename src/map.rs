//! 地图门面
//!
//! 按固定顺序编排整条生成流水线：
//! 1. 城市边界：Voronoi + 边界形状 → 海岸线（数值失败时种子 +1 重试）
//! 2. 张量场：四角网格基础场 + 随机径向场，海岸线作陆地掩膜
//! 3. 道路层级按优先级依次生成，后一层级继承前层的密度约束
//! 4. 全部道路提升为平面图并枚举封闭面
//! 5. 从封闭面中选取公园，在公园内生成小径
//!
//! 整个流程严格单线程，给定种子输出完全可复现。

use crate::config::MapConfig;
use crate::error::GenerationError;
use crate::geometry::{Polygon, Vector};
use crate::graph::Graph;
use crate::island::{refine_coastline, trace_coastline, BoundaryShape};
use crate::rng;
use crate::spatial::GridIndex;
use crate::streamline::StreamlineGenerator;
use crate::tensor::{NoiseParams, TensorField};
use crate::voronoi::{generate_points, Voronoi};

/// 边界生成的算法级重启上限
const MAX_BOUNDARY_ATTEMPTS: usize = 10;
/// 边界 Voronoi 的站点数
const BOUNDARY_SITES: usize = 150;
/// 每个方向的流线数量上限
const MAX_STREAMLINES_PER_DIRECTION: usize = 500;
/// 封闭面遍历的节点数上限
const MAX_FACE_SIZE: usize = 20;
/// 公园挑选尝试上限
const PARK_PICK_TRIES: usize = 100;

/// 道路层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadKind {
    Main,
    Major,
    Minor,
    Path,
}

impl RoadKind {
    fn from_tier_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("main") {
            RoadKind::Main
        } else if lower.contains("major") {
            RoadKind::Major
        } else {
            RoadKind::Minor
        }
    }
}

/// 一条道路：层级 + 简化折线
#[derive(Debug, Clone)]
pub struct Road {
    pub kind: RoadKind,
    pub line: Vec<Vector>,
}

/// 生成完成的地图
pub struct Map {
    /// 生成顺序排列的道路（Main → Major → Minor → Path）
    pub roads: Vec<Road>,
    pub parks: Vec<Polygon>,
    pub graph: Graph,
    /// 细化后的海岸线
    pub city_shape: Polygon,
    pub origin: Vector,
    pub dimensions: Vector,
}

impl Map {
    pub fn generate(config: &MapConfig) -> Result<Map, GenerationError> {
        rng::reseed(config.seed);
        let origin = Vector::ZERO;
        let dimensions = Vector::new(config.size, config.size);

        let city_shape = Self::generate_boundary(config, origin, dimensions)?;
        log::info!(
            "city shape: {} vertices, area {:.0}",
            city_shape.vertices().len(),
            city_shape.area()
        );

        let mut field = Self::build_field(config, &city_shape, origin, dimensions);

        // 道路层级（降序优先级），简化折线送入平面图
        let integrator = config.integrator.to_field_integrator();
        let mut road_lines: Vec<Vec<Vector>> = Vec::new();
        let mut tier_ranges: Vec<(RoadKind, usize, usize)> = Vec::new();
        let mut final_grids: Option<(GridIndex, GridIndex)> = None;
        {
            let mut generators: Vec<StreamlineGenerator<'_>> = Vec::new();
            for tier in config.road_parameters.iter().filter(|t| !t.is_path()) {
                let mut generator = StreamlineGenerator::new(
                    &field,
                    integrator,
                    origin,
                    dimensions,
                    tier.to_streamline_params(),
                );
                for previous in &generators {
                    generator.add_existing_streamlines(previous);
                }
                generator.create_all_streamlines(MAX_STREAMLINES_PER_DIRECTION);

                let kind = RoadKind::from_tier_name(&tier.name);
                let start = road_lines.len();
                road_lines.extend(generator.simplified_streamlines.iter().cloned());
                tier_ranges.push((kind, start, road_lines.len()));
                log::info!("tier {}: {} streamlines", tier.name, road_lines.len() - start);

                generators.push(generator);
            }
            if let Some(last) = generators.last() {
                let (major, minor) = last.grids();
                final_grids = Some((major.clone(), minor.clone()));
            }
        }

        // 平面图与封闭面
        let mut graph = Graph::new();
        graph.add_streamlines(&road_lines)?;
        graph.modify_streamlines(&mut road_lines);
        graph.find_closed_loops(MAX_FACE_SIZE);
        log::info!(
            "graph: {} nodes, {} closed loops",
            graph.nodes().len(),
            graph.closed_loops().len()
        );

        // 公园：从封闭面中按面积目标挑选
        let parks = Self::select_parks(config, &graph, &city_shape);
        log::info!("parks: {} selected", parks.len());
        field.set_parks(parks.clone());

        // 公园小径
        let mut path_lines: Vec<Vec<Vector>> = Vec::new();
        for tier in config.road_parameters.iter().filter(|t| t.is_path()) {
            for park in field.parks().to_vec() {
                let mut generator = StreamlineGenerator::new(
                    &field,
                    integrator,
                    origin,
                    dimensions,
                    tier.to_streamline_params(),
                )
                .with_bounding_polygon(park);
                if let Some((major, minor)) = &final_grids {
                    generator.add_existing_grids(major, minor);
                }
                generator.create_all_streamlines(MAX_STREAMLINES_PER_DIRECTION);
                path_lines.extend(generator.simplified_streamlines.iter().cloned());
            }
        }

        // 输出顺序 = 生成顺序：各道路层级在前，小径在后
        let mut roads: Vec<Road> = Vec::new();
        for (kind, start, end) in &tier_ranges {
            for line in &road_lines[*start..*end] {
                roads.push(Road {
                    kind: *kind,
                    line: line.clone(),
                });
            }
        }
        for line in path_lines {
            roads.push(Road {
                kind: RoadKind::Path,
                line,
            });
        }

        Ok(Map {
            roads,
            parks,
            graph,
            city_shape,
            origin,
            dimensions,
        })
    }

    pub fn road_count(&self, kind: RoadKind) -> usize {
        self.roads.iter().filter(|r| r.kind == kind).count()
    }

    /// 城市边界，Voronoi 数值不一致时种子 +1 重试
    fn generate_boundary(
        config: &MapConfig,
        origin: Vector,
        dimensions: Vector,
    ) -> Result<Polygon, GenerationError> {
        for attempt in 0..MAX_BOUNDARY_ATTEMPTS {
            match Self::try_boundary(origin, dimensions) {
                Ok(shape) => return Ok(shape),
                Err(e) => {
                    log::warn!("boundary attempt {} failed: {}", attempt + 1, e);
                    rng::reseed(config.seed + attempt as u64 + 1);
                }
            }
        }
        Err(GenerationError::BoundaryRetriesExhausted(
            MAX_BOUNDARY_ATTEMPTS,
        ))
    }

    fn try_boundary(origin: Vector, dimensions: Vector) -> Result<Polygon, GenerationError> {
        let size = dimensions.x.min(dimensions.y);
        let center = origin + dimensions / 2.0;

        let sites = generate_points(
            origin,
            origin + dimensions,
            BOUNDARY_SITES,
            size / 25.0,
        );
        let voronoi = Voronoi::new(&sites)?.refine()?;

        // 主圆盘加若干随机卫星圆盘，得到不规则的岛形
        let mut shapes = vec![BoundaryShape::Disk {
            center,
            radius: size * 0.33,
        }];
        let satellites = 2 + rng::next_int(0, 3) as usize;
        for _ in 0..satellites {
            let offset = Vector::new(
                rng::next_f64(-0.18, 0.18) * size,
                rng::next_f64(-0.18, 0.18) * size,
            );
            shapes.push(BoundaryShape::Disk {
                center: center + offset,
                radius: rng::next_f64(0.1, 0.22) * size,
            });
        }
        let shape = BoundaryShape::Union(shapes);

        let coastline = trace_coastline(&voronoi, &shape)?;
        Ok(refine_coastline(&coastline))
    }

    /// 张量场：四角网格场 + 随机径向场，海岸线作陆地掩膜
    fn build_field(
        config: &MapConfig,
        city_shape: &Polygon,
        origin: Vector,
        dimensions: Vector,
    ) -> TensorField {
        let mut field = TensorField::new(
            NoiseParams::default(),
            config.smooth,
            config.seed as u32,
        );
        field.set_land(city_shape.clone());

        let size = dimensions.x.min(dimensions.y);
        let corners = [
            origin,
            origin + Vector::new(dimensions.x, 0.0),
            origin + dimensions,
            origin + Vector::new(0.0, dimensions.y),
        ];
        for corner in corners {
            field.add_grid(
                corner,
                rng::next_f64(size / 4.0, size),
                rng::next_f64(0.0, 2.0),
                rng::next_f64(0.0, std::f64::consts::FRAC_PI_2),
            );
        }
        for _ in 0..config.random_radial_fields {
            let center = city_shape.random_interior_point();
            field.add_radial(
                center,
                rng::next_f64(size / 10.0, size / 5.0),
                rng::next_f64(0.0, 2.0),
            );
        }
        field
    }

    /// 公园挑选：封闭面中随机取，凑够目标面积，
    /// 质心间距不小于配置的最小距离。
    fn select_parks(config: &MapConfig, graph: &Graph, city_shape: &Polygon) -> Vec<Polygon> {
        let target = config.park_area_percentage * city_shape.area();
        // 过大的面（如外围边界面）不作公园
        let mut candidates: Vec<Polygon> = graph
            .closed_loops()
            .iter()
            .map(|l| l.polygon.clone())
            .filter(|p| p.area() < city_shape.area() * 0.1)
            .collect();

        let mut parks: Vec<Polygon> = Vec::new();
        let mut area = 0.0;
        let mut tries = 0;
        while area < target && !candidates.is_empty() && tries < PARK_PICK_TRIES {
            tries += 1;
            let index = rng::next_int(0, candidates.len() as i64) as usize;
            let candidate = candidates.swap_remove(index);
            let centroid = candidate.centroid();
            let far_enough = parks
                .iter()
                .all(|p| p.centroid().distance(centroid) >= config.min_distance_between_parks);
            if far_enough && city_shape.contains(centroid) {
                area += candidate.area();
                parks.push(candidate);
            }
        }
        parks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoadParams;

    /// 小尺寸快速配置
    fn small_config(seed: u64) -> MapConfig {
        let mut config = MapConfig {
            seed,
            size: 400.0,
            random_radial_fields: 1,
            park_area_percentage: 0.1,
            min_distance_between_parks: 50.0,
            ..MapConfig::default()
        };
        config.road_parameters = vec![
            tier("main", "road", 80.0, 40.0, 100.0),
            tier("major", "road", 30.0, 15.0, 40.0),
        ];
        config
    }

    fn tier(name: &str, kind: &str, dsep: f64, dtest: f64, d_lookahead: f64) -> RoadParams {
        let mut params = RoadParams::default();
        params.name = name.to_string();
        params.kind = kind.to_string();
        params.dsep = dsep;
        params.dtest = dtest;
        params.d_lookahead = d_lookahead;
        params.path_integration_limit = 800;
        params.max_seed_tries = 100;
        params
    }

    #[test]
    fn generates_roads_within_world_bounds() {
        let map = Map::generate(&small_config(42)).unwrap();
        assert!(!map.roads.is_empty());
        for road in &map.roads {
            assert!(road.line.len() >= 2);
            for p in &road.line {
                assert!(p.x >= -1e-6 && p.x <= 400.0 + 1e-6);
                assert!(p.y >= -1e-6 && p.y <= 400.0 + 1e-6);
            }
        }
    }

    #[test]
    fn roads_ordered_by_tier() {
        let map = Map::generate(&small_config(42)).unwrap();
        let mut last_rank = 0;
        for road in &map.roads {
            let rank = match road.kind {
                RoadKind::Main => 0,
                RoadKind::Major => 1,
                RoadKind::Minor => 2,
                RoadKind::Path => 3,
            };
            assert!(rank >= last_rank, "tier order broken");
            last_rank = rank;
        }
    }

    #[test]
    fn generation_is_reproducible() {
        let a = Map::generate(&small_config(7)).unwrap();
        let b = Map::generate(&small_config(7)).unwrap();
        assert_eq!(a.roads.len(), b.roads.len());
        for (ra, rb) in a.roads.iter().zip(b.roads.iter()) {
            assert_eq!(ra.line, rb.line);
        }
        assert_eq!(a.city_shape.vertices(), b.city_shape.vertices());
    }

    #[test]
    fn graph_neighbours_are_symmetric() {
        let map = Map::generate(&small_config(11)).unwrap();
        for node in map.graph.nodes() {
            for other in node.neighbour_ids() {
                assert!(map.graph.node(other).is_neighbour(node.id));
            }
        }
    }

    #[test]
    fn parks_lie_within_the_city() {
        let map = Map::generate(&small_config(3)).unwrap();
        for park in &map.parks {
            assert!(map.city_shape.contains(park.centroid()));
        }
    }
}
