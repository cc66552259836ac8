//! 2D highest posterior density regions as closed polygons.
//!
//! A [ContourStrategy] turns a bivariate sample into the polygons enclosing
//! a given probability mass. [KdeContourStrategy] estimates the density on
//! a grid ([kde2d]) and traces the HPD level with marching squares.

use crate::summary::kde::{DensityGrid, hpd_level, kde2d};
use std::collections::HashMap;

/// Closed polygon, first vertex not repeated at the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Even-odd test whether `(x, y)` lies inside the polygon.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (xi, yi) = (self.xs[i], self.ys[i]);
            let (xj, yj) = (self.xs[j], self.ys[j]);
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Computes the regions containing `mass` of a bivariate sample.
pub trait ContourStrategy {
    /// Polygons bounding the HPD region; more than one means the region is
    /// multimodal. Samples must have equal, non-zero length.
    fn hpd_contours(&self, xs: &[f64], ys: &[f64], mass: f64) -> Vec<Contour>;
}

/// Kernel density estimate on a `grid_size x grid_size` grid, contoured at
/// the HPD density level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdeContourStrategy {
    pub grid_size: usize,
}

impl Default for KdeContourStrategy {
    fn default() -> Self {
        KdeContourStrategy { grid_size: 50 }
    }
}

impl ContourStrategy for KdeContourStrategy {
    fn hpd_contours(&self, xs: &[f64], ys: &[f64], mass: f64) -> Vec<Contour> {
        if xs.is_empty() || xs.len() != ys.len() {
            return Vec::new();
        }
        let grid = kde2d(xs, ys, self.grid_size.max(2));
        let level = hpd_level(&grid, mass);
        marching_squares(&grid, level)
    }
}

// =#========================================================================#=
// MARCHING SQUARES
// =#========================================================================#=
/// Crossing point on a grid edge: `(i, j, vertical)` names the edge from
/// `(i, j)` to `(i + 1, j)`, or to `(i, j + 1)` if vertical.
type EdgeKey = (usize, usize, bool);

/// Traces closed polygons around grid regions with density `>= level`.
///
/// The grid is padded with a border of zeros first, so regions touching
/// the grid limits are closed too.
pub fn marching_squares(grid: &DensityGrid, level: f64) -> Vec<Contour> {
    let padded = PaddedGrid::new(grid);
    let inside = |i: usize, j: usize| padded.z[i][j] >= level;

    let mut segments: Vec<(EdgeKey, EdgeKey)> = Vec::new();
    for i in 0..padded.x.len() - 1 {
        for j in 0..padded.y.len() - 1 {
            let case = inside(i, j) as u8
                | (inside(i + 1, j) as u8) << 1
                | (inside(i + 1, j + 1) as u8) << 2
                | (inside(i, j + 1) as u8) << 3;

            let bottom = (i, j, false);
            let right = (i + 1, j, true);
            let top = (i, j + 1, false);
            let left = (i, j, true);
            let centre_inside = || {
                (padded.z[i][j] + padded.z[i + 1][j] + padded.z[i + 1][j + 1] + padded.z[i][j + 1])
                    / 4.0
                    >= level
            };

            match case {
                0 | 15 => {}
                1 | 14 => segments.push((left, bottom)),
                2 | 13 => segments.push((bottom, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((right, top)),
                6 | 9 => segments.push((bottom, top)),
                7 | 8 => segments.push((left, top)),
                5 if centre_inside() => {
                    segments.push((bottom, right));
                    segments.push((top, left));
                }
                5 => {
                    segments.push((left, bottom));
                    segments.push((right, top));
                }
                10 if centre_inside() => {
                    segments.push((left, bottom));
                    segments.push((right, top));
                }
                _ => {
                    segments.push((bottom, right));
                    segments.push((top, left));
                }
            }
        }
    }

    link_segments(&segments)
        .into_iter()
        .map(|ring| {
            let (xs, ys) = ring.iter().map(|&edge| padded.crossing(edge, level)).unzip();
            Contour { xs, ys }
        })
        .collect()
}

/// Joins segments sharing edge crossings into rings, in order of their
/// first segment.
fn link_segments(segments: &[(EdgeKey, EdgeKey)]) -> Vec<Vec<EdgeKey>> {
    let mut by_edge: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for (s, &(a, b)) in segments.iter().enumerate() {
        by_edge.entry(a).or_default().push(s);
        by_edge.entry(b).or_default().push(s);
    }

    let mut used = vec![false; segments.len()];
    let mut rings = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (first, mut current) = segments[start];
        let mut ring = vec![first];

        while current != first {
            ring.push(current);
            let next = by_edge
                .get(&current)
                .and_then(|candidates| candidates.iter().copied().find(|&s| !used[s]));
            let Some(next) = next else {
                break;
            };
            used[next] = true;
            let (a, b) = segments[next];
            current = if a == current { b } else { a };
        }
        rings.push(ring);
    }
    rings
}

/// Density grid with one extra row and column of zeros on every side.
struct PaddedGrid {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<Vec<f64>>,
}

impl PaddedGrid {
    fn new(grid: &DensityGrid) -> Self {
        let x = pad_axis(&grid.x);
        let y = pad_axis(&grid.y);
        let mut z = vec![vec![0.0; y.len()]; x.len()];
        for (i, row) in grid.z.iter().enumerate() {
            z[i + 1][1..=row.len()].copy_from_slice(row);
        }
        PaddedGrid { x, y, z }
    }

    /// Linear interpolation of where `level` crosses the edge.
    fn crossing(&self, (i, j, vertical): EdgeKey, level: f64) -> (f64, f64) {
        let (i2, j2) = if vertical { (i, j + 1) } else { (i + 1, j) };
        let (z1, z2) = (self.z[i][j], self.z[i2][j2]);
        let t = if z2 == z1 { 0.5 } else { (level - z1) / (z2 - z1) };
        (
            self.x[i] + t * (self.x[i2] - self.x[i]),
            self.y[j] + t * (self.y[j2] - self.y[j]),
        )
    }
}

fn pad_axis(axis: &[f64]) -> Vec<f64> {
    let step = match axis {
        [first, second, ..] => second - first,
        _ => 1.0,
    };
    let mut padded = Vec::with_capacity(axis.len() + 2);
    padded.push(axis.first().copied().unwrap_or(0.0) - step);
    padded.extend_from_slice(axis);
    padded.push(axis.last().copied().unwrap_or(0.0) + step);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(cx: f64, cy: f64) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in -4..=4 {
            for j in -4..=4 {
                xs.push(cx + i as f64 * 0.1);
                ys.push(cy + j as f64 * 0.1);
            }
        }
        (xs, ys)
    }

    #[test]
    fn single_cluster_gives_one_polygon_around_its_centre() {
        let (xs, ys) = cluster(2.0, -1.0);
        let contours = KdeContourStrategy::default().hpd_contours(&xs, &ys, 0.8);

        assert_eq!(contours.len(), 1);
        assert!(contours[0].len() >= 4);
        assert!(contours[0].contains(2.0, -1.0));
        assert!(!contours[0].contains(10.0, 10.0));
    }

    #[test]
    fn separated_clusters_are_multimodal() {
        let (mut xs, mut ys) = cluster(0.0, 0.0);
        let (xs2, ys2) = cluster(10.0, 10.0);
        xs.extend(xs2);
        ys.extend(ys2);

        let contours = KdeContourStrategy::default().hpd_contours(&xs, &ys, 0.8);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().any(|c| c.contains(0.0, 0.0)));
        assert!(contours.iter().any(|c| c.contains(10.0, 10.0)));
    }

    #[test]
    fn region_at_grid_border_is_closed() {
        let grid = DensityGrid {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 1.0, 2.0],
            z: vec![vec![1.0; 3]; 3],
        };
        let contours = marching_squares(&grid, 0.5);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].contains(1.0, 1.0));
        assert!(contours[0].contains(0.0, 2.0));
    }

    #[test]
    fn saddle_cell_splits_by_centre_value() {
        let grid = DensityGrid {
            x: vec![0.0, 1.0],
            y: vec![0.0, 1.0],
            z: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        // Centre 0.5 is below the level: two separate regions
        assert_eq!(marching_squares(&grid, 0.6).len(), 2);
        // Centre at the level: one connected region
        assert_eq!(marching_squares(&grid, 0.5).len(), 1);
    }

    #[test]
    fn empty_sample_has_no_contours() {
        assert!(KdeContourStrategy::default().hpd_contours(&[], &[], 0.8).is_empty());
    }
}
