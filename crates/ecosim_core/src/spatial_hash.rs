use ecosim_data::Position;
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct Slot {
    cell: usize,
    position: Position,
}

#[derive(Clone, Debug, Default)]
/// Uniform grid over world coordinates keyed by entity id.
///
/// Every registered entity lives in exactly one cell. Positions outside the
/// world rectangle are bucketed into the nearest edge cell, so nothing that
/// has a finite position is ever dropped.
///
/// # Performance Characteristics
/// - insert / remove / update: O(1) amortized (O(cell occupancy) for removal)
/// - radius query: O(cells overlapped + candidates)
/// - bulk rebuild: cell assignment computed in parallel with Rayon
///
/// # Examples
/// ```
/// use ecosim_core::spatial_hash::SpatialHash;
/// use ecosim_data::Position;
///
/// let mut spatial = SpatialHash::new(10.0, 100, 100);
/// spatial.insert(1, Position::new(15.0, 15.0));
/// spatial.insert(2, Position::new(85.0, 85.0));
///
/// let nearby = spatial.query_radius(&Position::new(12.0, 12.0), 10.0);
/// assert_eq!(nearby, vec![1]);
/// ```
pub struct SpatialHash {
    pub cell_size: f64,
    pub width: u16,
    pub height: u16,
    pub cols: usize,
    pub rows: usize,
    cells: Vec<Vec<u64>>,
    slots: HashMap<u64, Slot>,
}

impl SpatialHash {
    /// Creates an empty grid. `cell_size` falls back to 1.0 when not a
    /// positive finite number.
    pub fn new(cell_size: f64, width: u16, height: u16) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let cols = ((f64::from(width) / cell_size).ceil() as usize).max(1);
        let rows = ((f64::from(height) / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            width,
            height,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            slots: HashMap::new(),
        }
    }

    /// Computes the flat cell index for a world coordinate.
    ///
    /// Non-finite coordinates return `None`; everything else is clamped into
    /// the grid.
    #[inline]
    pub fn get_cell_idx(&self, x: f64, y: f64) -> Option<usize> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (cx, cy) = self.cell_coords(x, y);
        Some(cy * self.cols + cx)
    }

    #[inline]
    fn cell_coords(&self, x: f64, y: f64) -> (usize, usize) {
        // `as` saturates, so huge magnitudes cannot overflow here.
        let cx = ((x / self.cell_size).floor() as i64).clamp(0, self.cols as i64 - 1);
        let cy = ((y / self.cell_size).floor() as i64).clamp(0, self.rows as i64 - 1);
        (cx as usize, cy as usize)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn position_of(&self, id: u64) -> Option<Position> {
        self.slots.get(&id).map(|s| s.position)
    }

    /// Registers `id` at `position`, re-bucketing it if already present.
    /// Returns `false` (and leaves the index untouched) for non-finite positions.
    pub fn insert(&mut self, id: u64, position: Position) -> bool {
        let Some(cell) = self.get_cell_idx(position.x, position.y) else {
            return false;
        };
        if let Some(slot) = self.slots.get(&id).copied() {
            if slot.cell != cell {
                self.detach(id, slot.cell);
                self.cells[cell].push(id);
            }
        } else {
            self.cells[cell].push(id);
        }
        self.slots.insert(id, Slot { cell, position });
        true
    }

    /// Moves a registered entity. Unknown ids are inserted.
    #[inline]
    pub fn update(&mut self, id: u64, position: Position) -> bool {
        self.insert(id, position)
    }

    pub fn remove(&mut self, id: u64) -> bool {
        match self.slots.remove(&id) {
            Some(slot) => {
                self.detach(id, slot.cell);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, id: u64, cell: usize) {
        let bucket = &mut self.cells[cell];
        if let Some(pos) = bucket.iter().position(|&e| e == id) {
            bucket.swap_remove(pos);
        }
    }

    pub fn clear(&mut self) {
        self.cells.par_iter_mut().for_each(Vec::clear);
        self.slots.clear();
    }

    /// Replaces the whole index with `data`. Entries with non-finite
    /// positions are skipped.
    pub fn rebuild(&mut self, data: &[(u64, Position)]) {
        self.clear();
        let assigned: Vec<Option<usize>> = data
            .par_iter()
            .map(|(_, p)| self.get_cell_idx(p.x, p.y))
            .collect();
        for (&(id, position), cell) in data.iter().zip(assigned) {
            if let Some(cell) = cell {
                if let Some(old) = self.slots.insert(id, Slot { cell, position }) {
                    self.detach(id, old.cell);
                }
                self.cells[cell].push(id);
            }
        }
    }

    /// Visits every candidate in the cells overlapping the query square.
    /// Candidates may lie outside `radius`.
    pub fn query_callback<F>(&self, x: f64, y: f64, radius: f64, mut callback: F)
    where
        F: FnMut(u64),
    {
        if !x.is_finite() || !y.is_finite() || !radius.is_finite() || radius < 0.0 {
            return;
        }
        let (min_cx, min_cy) = self.cell_coords(x - radius, y - radius);
        let (max_cx, max_cy) = self.cell_coords(x + radius, y + radius);
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                for &id in &self.cells[cy * self.cols + cx] {
                    callback(id);
                }
            }
        }
    }

    /// Exact radius query into a reusable buffer.
    #[inline]
    pub fn query_into(&self, point: &Position, radius: f64, result: &mut Vec<u64>) {
        result.clear();
        let r2 = radius * radius;
        self.query_callback(point.x, point.y, radius, |id| {
            if let Some(slot) = self.slots.get(&id) {
                if slot.position.distance_sq(point) <= r2 {
                    result.push(id);
                }
            }
        });
    }

    /// Ids whose stored position lies within `radius` of `point`. Order is
    /// unspecified. A non-finite point yields an empty result.
    pub fn query_radius(&self, point: &Position, radius: f64) -> Vec<u64> {
        let mut result = Vec::new();
        self.query_into(point, radius, &mut result);
        result
    }

    pub fn count_nearby(&self, point: &Position, radius: f64) -> usize {
        let r2 = radius * radius;
        let mut count = 0;
        self.query_callback(point.x, point.y, radius, |id| {
            if let Some(slot) = self.slots.get(&id) {
                if slot.position.distance_sq(point) <= r2 {
                    count += 1;
                }
            }
        });
        count
    }

    /// Checks that every slot sits in the bucket matching its position and
    /// that buckets hold no strays.
    pub fn is_consistent(&self) -> bool {
        let bucketed: usize = self.cells.iter().map(Vec::len).sum();
        bucketed == self.slots.len()
            && self.slots.iter().all(|(id, slot)| {
                self.get_cell_idx(slot.position.x, slot.position.y) == Some(slot.cell)
                    && self.cells[slot.cell].contains(id)
            })
    }
}
