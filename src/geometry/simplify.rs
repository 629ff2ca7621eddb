//! 折线简化
//!
//! 两阶段：先用径向距离过滤剔除稠密点，
//! 再用 Douglas–Peucker 递归剔除近似共线点。
//! 两个阶段都保证首尾点不变。

use super::Vector;

/// 两阶段简化，`tolerance` 为普通（非平方）容差
pub fn simplify(points: &[Vector], tolerance: f64) -> Vec<Vector> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let sq_tolerance = tolerance * tolerance;
    let filtered = simplify_radial_dist(points, sq_tolerance);
    simplify_douglas_peucker(&filtered, sq_tolerance)
}

/// 径向距离过滤
///
/// 保留与上一个保留点平方距离超过容差的点。
/// 末尾点无条件保留，即使与上一个保留点重合。
pub fn simplify_radial_dist(points: &[Vector], sq_tolerance: f64) -> Vec<Vector> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = vec![points[0]];
    let mut prev = points[0];

    for &p in &points[1..points.len() - 1] {
        if p.distance_sq(prev) > sq_tolerance {
            kept.push(p);
            prev = p;
        }
    }

    kept.push(points[points.len() - 1]);
    kept
}

/// Douglas–Peucker 递归简化（平方容差）
pub fn simplify_douglas_peucker(points: &[Vector], sq_tolerance: f64) -> Vec<Vector> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut kept = vec![points[0]];
    douglas_peucker_step(points, 0, points.len() - 1, sq_tolerance, &mut kept);
    kept.push(points[points.len() - 1]);
    kept
}

fn douglas_peucker_step(
    points: &[Vector],
    first: usize,
    last: usize,
    sq_tolerance: f64,
    kept: &mut Vec<Vector>,
) {
    let mut max_sq_dist = sq_tolerance;
    let mut index = None;

    for i in first + 1..last {
        let sq_dist = points[i].distance_sq_to_segment(points[first], points[last]);
        if sq_dist > max_sq_dist {
            index = Some(i);
            max_sq_dist = sq_dist;
        }
    }

    if let Some(i) = index {
        if i - first > 1 {
            douglas_peucker_step(points, first, i, sq_tolerance, kept);
        }
        kept.push(points[i]);
        if last - i > 1 {
            douglas_peucker_step(points, i, last, sq_tolerance, kept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_preserved_exactly() {
        let points: Vec<Vector> = (0..50)
            .map(|i| Vector::new(i as f64, (i as f64 * 0.3).sin()))
            .collect();
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified[0], points[0]);
        assert_eq!(*simplified.last().unwrap(), *points.last().unwrap());
    }

    #[test]
    fn straight_line_collapses_to_endpoints() {
        let points: Vec<Vector> = (0..100).map(|i| Vector::new(i as f64, 0.0)).collect();
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn corner_survives_simplification() {
        let mut points: Vec<Vector> = (0..=10).map(|i| Vector::new(i as f64, 0.0)).collect();
        points.extend((1..=10).map(|i| Vector::new(10.0, i as f64)));
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified.len(), 3);
        assert!(simplified[1].approx_eq(Vector::new(10.0, 0.0), 1e-9));
    }

    #[test]
    fn dropped_points_stay_within_tolerance_of_result() {
        let points: Vec<Vector> = (0..60)
            .map(|i| {
                let x = i as f64 * 0.5;
                Vector::new(x, (x * 0.7).sin() * 3.0)
            })
            .collect();
        let tolerance = 0.4;
        let simplified = simplify(&points, tolerance);
        assert!(simplified.len() < points.len());
        // 每个被剔除的点到简化折线的距离不超过两阶段合计容差
        let bound = 2.0 * tolerance;
        for &p in &points {
            let min_sq = simplified
                .windows(2)
                .map(|w| p.distance_sq_to_segment(w[0], w[1]))
                .fold(f64::INFINITY, f64::min);
            assert!(min_sq <= bound * bound + 1e-9);
        }
    }

    #[test]
    fn radial_pass_keeps_duplicate_tail() {
        let points = vec![
            Vector::new(0.0, 0.0),
            Vector::new(5.0, 0.0),
            Vector::new(5.0, 0.0),
        ];
        let filtered = simplify_radial_dist(&points, 0.25);
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[1], filtered[2]);
    }
}
