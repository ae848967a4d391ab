//! Uniform grid used for neighbour queries on a horizontally wrapping map.

use std::collections::HashMap;

use glam::DVec2;

use crate::vector::{wrap_x, wrapped_delta};

/// Anything the grid can bucket.
pub trait Positioned {
    fn position(&self) -> DVec2;

    fn is_alive(&self) -> bool {
        true
    }
}

pub type CellKey = (i32, i32);

/// Grid over a snapshot of agents, rebuilt once per tick.
///
/// Columns are sized so a whole number of them spans the map width, which
/// keeps the wrapped ring of columns uniform. Queries widen to as many rings
/// as the radius needs, so results match a brute-force scan for any radius.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f64,
    width: f64,
    columns: i32,
    column_width: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    entries: Vec<T>,
}

impl<T: Positioned> SpatialGrid<T> {
    pub fn new(cell_size: f64, width: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 50.0 };
        let width = width.max(cell_size);
        let columns = ((width / cell_size).floor() as i32).max(1);
        Self {
            cell_size,
            width,
            columns,
            column_width: width / f64::from(columns),
            cells: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn key(&self, position: DVec2) -> CellKey {
        let col = (wrap_x(position.x, self.width) / self.column_width).floor() as i32;
        let row = (position.y / self.cell_size).floor() as i32;
        (col.clamp(0, self.columns - 1), row)
    }

    /// Replace the snapshot. Dead agents are dropped here.
    pub fn rebuild<I>(&mut self, agents: I)
    where
        I: IntoIterator<Item = T>,
    {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.entries.clear();
        for agent in agents {
            if !agent.is_alive() {
                continue;
            }
            let key = self.key(agent.position());
            let index = self.entries.len();
            self.entries.push(agent);
            self.cells.entry(key).or_default().push(index);
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visit every entry strictly closer than `radius` to `center`.
    ///
    /// The visitor receives the entry index, the entry and the shortest
    /// displacement from `center` to it.
    pub fn for_each_within<F>(&self, center: DVec2, radius: f64, exclude: Option<usize>, mut visit: F)
    where
        F: FnMut(usize, &T, DVec2),
    {
        if !(radius > 0.0) || self.entries.is_empty() {
            return;
        }
        let (cx, cy) = self.key(center);
        let span_x = (radius / self.column_width).ceil() as i32;
        let span_y = (radius / self.cell_size).ceil() as i32;
        let radius_sq = radius * radius;

        let columns: Vec<i32> = if 2 * span_x + 1 >= self.columns {
            (0..self.columns).collect()
        } else {
            (cx - span_x..=cx + span_x)
                .map(|c| c.rem_euclid(self.columns))
                .collect()
        };

        for col in columns {
            for row in cy - span_y..=cy + span_y {
                let Some(bucket) = self.cells.get(&(col, row)) else {
                    continue;
                };
                for &index in bucket {
                    if Some(index) == exclude {
                        continue;
                    }
                    let entry = &self.entries[index];
                    let delta = wrapped_delta(center, entry.position(), self.width);
                    if delta.length_squared() < radius_sq {
                        visit(index, entry, delta);
                    }
                }
            }
        }
    }

    /// Indices of all other entries within `radius` of entry `index`.
    pub fn query_neighbors(&self, index: usize, radius: f64) -> Vec<usize> {
        let Some(center) = self.entries.get(index).map(T::position) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        self.for_each_within(center, radius, Some(index), |i, _, _| found.push(i));
        found
    }

    pub fn query_point(&self, center: DVec2, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_within(center, radius, None, |i, _, _| found.push(i));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone, Copy)]
    struct Dot {
        at: DVec2,
        alive: bool,
    }

    impl Positioned for Dot {
        fn position(&self) -> DVec2 {
            self.at
        }

        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    fn dot(x: f64, y: f64) -> Dot {
        Dot {
            at: DVec2::new(x, y),
            alive: true,
        }
    }

    fn brute_force(dots: &[Dot], index: usize, radius: f64, width: f64) -> Vec<usize> {
        let center = dots[index].at;
        (0..dots.len())
            .filter(|&j| {
                j != index && wrapped_delta(center, dots[j].at, width).length_squared() < radius * radius
            })
            .collect()
    }

    #[test]
    fn grid_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let width = 1010.0;
        let dots: Vec<Dot> = (0..400)
            .map(|_| dot(rng.random_range(0.0..width), rng.random_range(0.0..600.0)))
            .collect();
        let mut grid = SpatialGrid::new(50.0, width);
        grid.rebuild(dots.iter().copied());

        for radius in [10.0, 25.0, 50.0, 75.0, 180.0] {
            for index in 0..dots.len() {
                let mut from_grid = grid.query_neighbors(index, radius);
                from_grid.sort_unstable();
                assert_eq!(from_grid, brute_force(&dots, index, radius, width), "r={radius} i={index}");
            }
        }
    }

    #[test]
    fn neighbours_are_found_across_the_wrap() {
        let dots = vec![dot(3.0, 100.0), dot(996.0, 102.0), dot(500.0, 100.0)];
        let mut grid = SpatialGrid::new(50.0, 1000.0);
        grid.rebuild(dots);
        assert_eq!(grid.query_neighbors(0, 20.0), vec![1]);
        assert_eq!(grid.query_neighbors(1, 20.0), vec![0]);
        assert!(grid.query_neighbors(2, 20.0).is_empty());
    }

    #[test]
    fn no_vertical_wrap() {
        let dots = vec![dot(100.0, 2.0), dot(100.0, 598.0)];
        let mut grid = SpatialGrid::new(50.0, 1000.0);
        grid.rebuild(dots);
        assert!(grid.query_neighbors(0, 20.0).is_empty());
    }

    #[test]
    fn dead_agents_are_not_indexed() {
        let mut dead = dot(10.0, 10.0);
        dead.alive = false;
        let mut grid = SpatialGrid::new(50.0, 1000.0);
        grid.rebuild(vec![dot(12.0, 10.0), dead]);
        assert_eq!(grid.len(), 1);
        assert!(grid.query_neighbors(0, 30.0).is_empty());
    }

    #[test]
    fn rebuild_replaces_previous_snapshot() {
        let mut grid = SpatialGrid::new(50.0, 1000.0);
        grid.rebuild(vec![dot(10.0, 10.0), dot(15.0, 10.0)]);
        grid.rebuild(vec![dot(400.0, 400.0)]);
        assert_eq!(grid.len(), 1);
        assert!(grid.query_point(DVec2::new(12.0, 10.0), 30.0).is_empty());
        assert_eq!(grid.query_point(DVec2::new(410.0, 400.0), 30.0), vec![0]);
    }

    #[test]
    fn degenerate_radius_finds_nothing() {
        let mut grid = SpatialGrid::new(50.0, 1000.0);
        grid.rebuild(vec![dot(10.0, 10.0), dot(10.0, 10.0)]);
        assert!(grid.query_neighbors(0, 0.0).is_empty());
        assert!(grid.query_neighbors(0, f64::NAN).is_empty());
        assert!(grid.query_neighbors(9, 10.0).is_empty());
    }
}
