//! 凸包构建（Andrew 单调链）

use super::Vector;

/// 返回点集的凸包，逆时针顶点序，不含重复的首尾点。
///
/// 少于 3 个点时原样返回（按字典序排序后）。
pub fn convex_hull(points: &[Vector]) -> Vec<Vector> {
    let mut sorted: Vec<Vector> = points.to_vec();
    sorted.sort_by(|a, b| a.lex_cmp(*b));
    sorted.dedup_by(|a, b| a.approx_eq(*b, 1e-12));

    let n = sorted.len();
    if n < 3 {
        return sorted;
    }

    let mut hull: Vec<Vector> = Vec::with_capacity(n * 2);

    // 下链
    for &p in &sorted {
        while hull.len() >= 2 && turns_right(hull[hull.len() - 2], hull[hull.len() - 1], p) {
            hull.pop();
        }
        hull.push(p);
    }

    // 上链
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && turns_right(hull[hull.len() - 2], hull[hull.len() - 1], p)
        {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

/// a→b→c 是否为非左转（右转或共线）
fn turns_right(a: Vector, b: Vector, c: Vector) -> bool {
    (b - a).cross(c - a) <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_with_interior_point() {
        let points = vec![
            Vector::new(0.0, 0.0),
            Vector::new(2.0, 0.0),
            Vector::new(2.0, 2.0),
            Vector::new(0.0, 2.0),
            Vector::new(1.0, 1.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.iter().any(|p| p.approx_eq(Vector::new(1.0, 1.0), 1e-9)));
    }

    #[test]
    fn collinear_points_collapse() {
        let points = vec![
            Vector::new(0.0, 0.0),
            Vector::new(1.0, 1.0),
            Vector::new(2.0, 2.0),
            Vector::new(3.0, 3.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 2);
    }

    #[test]
    fn hull_is_counter_clockwise() {
        let points = vec![
            Vector::new(0.0, 0.0),
            Vector::new(4.0, 0.0),
            Vector::new(4.0, 3.0),
            Vector::new(0.0, 3.0),
        ];
        let hull = convex_hull(&points);
        let mut signed = 0.0;
        for i in 0..hull.len() {
            signed += hull[i].cross(hull[(i + 1) % hull.len()]);
        }
        assert!(signed > 0.0);
    }
}
