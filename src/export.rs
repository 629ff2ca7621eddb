//! 地图导出
//!
//! 把生成的矢量地图栅格化为 PPM（P3）图像：
//! 先并行逐像素分类海洋 / 陆地 / 公园，再按层级叠画道路折线，
//! 最后写出纯文本 P3 文件。

use crate::geometry::Vector;
use crate::map::{Map, RoadKind};
use rayon::prelude::*;
use std::path::Path;

type Rgb = (u8, u8, u8);

const SEA: Rgb = (60, 110, 200);
const LAND: Rgb = (235, 228, 210);
const PARK: Rgb = (160, 200, 120);
const COAST: Rgb = (90, 130, 190);

fn road_style(kind: RoadKind) -> (Rgb, f64) {
    match kind {
        RoadKind::Main => ((40, 40, 45), 3.0),
        RoadKind::Major => ((70, 70, 80), 2.0),
        RoadKind::Minor => ((110, 110, 120), 1.2),
        RoadKind::Path => ((150, 140, 110), 0.7),
    }
}

/// 栅格化地图
///
/// 像素分类按行并行；道路与海岸线在其上顺序叠画。
pub fn render(map: &Map, image_size: usize) -> Vec<Rgb> {
    let world_per_pixel = map.dimensions.x.max(map.dimensions.y) / image_size as f64;

    // 底色：海洋 / 陆地 / 公园
    let mut image: Vec<Rgb> = (0..image_size)
        .into_par_iter()
        .flat_map_iter(|py| {
            let map = &map;
            (0..image_size).map(move |px| {
                let world = Vector::new(
                    map.origin.x + (px as f64 + 0.5) * world_per_pixel,
                    map.origin.y + (py as f64 + 0.5) * world_per_pixel,
                );
                if !map.city_shape.contains(world) {
                    SEA
                } else if map.parks.iter().any(|park| park.contains(world)) {
                    PARK
                } else {
                    LAND
                }
            })
        })
        .collect();

    // 海岸线描边
    let coast_vertices = map.city_shape.vertices();
    for i in 0..coast_vertices.len() {
        let a = coast_vertices[i];
        let b = coast_vertices[(i + 1) % coast_vertices.len()];
        draw_segment(&mut image, image_size, map, world_per_pixel, a, b, COAST, 1.0);
    }

    // 道路：次要层级先画，主干道盖在最上
    for road in map.roads.iter().rev() {
        let (color, width) = road_style(road.kind);
        for pair in road.line.windows(2) {
            draw_segment(
                &mut image,
                image_size,
                map,
                world_per_pixel,
                pair[0],
                pair[1],
                color,
                width,
            );
        }
    }

    image
}

/// 写出 P3 PPM 文件
pub fn write_ppm(map: &Map, path: &Path, image_size: usize) -> std::io::Result<()> {
    let image = render(map, image_size);
    let mut ppm = format!("P3\n{} {}\n255\n", image_size, image_size);
    for (r, g, b) in image {
        ppm.push_str(&format!("{} {} {} ", r, g, b));
    }
    std::fs::write(path, ppm)
}

/// 沿线段按半像素步进，以给定线宽盖章
#[allow(clippy::too_many_arguments)]
fn draw_segment(
    image: &mut [Rgb],
    image_size: usize,
    map: &Map,
    world_per_pixel: f64,
    a: Vector,
    b: Vector,
    color: Rgb,
    width: f64,
) {
    let length = a.distance(b);
    let steps = ((length / world_per_pixel) * 2.0).ceil() as usize + 1;
    let radius = (width / 2.0).max(0.5);
    for i in 0..=steps {
        let p = a + (b - a) * (i as f64 / steps as f64);
        let px = (p.x - map.origin.x) / world_per_pixel;
        let py = (p.y - map.origin.y) / world_per_pixel;
        stamp(image, image_size, px, py, radius, color);
    }
}

fn stamp(image: &mut [Rgb], image_size: usize, px: f64, py: f64, radius: f64, color: Rgb) {
    let r = radius.ceil() as i64;
    let cx = px.round() as i64;
    let cy = py.round() as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f64 > radius * radius {
                continue;
            }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= image_size as i64 || y >= image_size as i64 {
                continue;
            }
            image[y as usize * image_size + x as usize] = color;
        }
    }
}
