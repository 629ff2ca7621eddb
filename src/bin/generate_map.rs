//! 生成一座城市并导出 PPM 图像
//!
//! 用法：generate_map [config.json]
//! 不给配置文件时使用内置默认配置。

use machi::config::MapConfig;
use machi::{export, Map, RoadKind};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => match MapConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => MapConfig::default(),
    };

    println!(
        "Generating city (seed {}, size {}, {} road tiers)",
        config.seed,
        config.size,
        config.road_parameters.len()
    );

    let map = match Map::generate(&config) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("generation failed: {}", e);
            process::exit(1);
        }
    };

    println!(
        "  roads: {} main, {} major, {} minor, {} paths",
        map.road_count(RoadKind::Main),
        map.road_count(RoadKind::Major),
        map.road_count(RoadKind::Minor),
        map.road_count(RoadKind::Path),
    );
    println!(
        "  graph: {} nodes, {} faces; parks: {}",
        map.graph.nodes().len(),
        map.graph.closed_loops().len(),
        map.parks.len()
    );

    let output = Path::new("map.ppm");
    if let Err(e) = export::write_ppm(&map, output, 1000) {
        eprintln!("failed to write {}: {}", output.display(), e);
        process::exit(1);
    }
    println!("Wrote {}", output.display());
}
