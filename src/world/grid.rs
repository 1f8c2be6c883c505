// src/world/grid.rs
//
// Square height buffer, row-major, with a sentinel for cells not computed yet.

use crate::config::UNSET_HEIGHT;

#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    side: usize,
    values: Vec<f32>,
}

impl HeightGrid {
    /// Grid of `(1 + 2^n)` samples per side, all unset.
    pub fn for_exponent(n: u32) -> Self {
        let side = 1 + (1usize << n);
        Self {
            side,
            values: vec![UNSET_HEIGHT; side * side],
        }
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Reallocates only when the side length actually changes.
    pub fn resize_for_exponent(&mut self, n: u32) {
        let side = 1 + (1usize << n);
        if side != self.side {
            self.side = side;
            self.values = vec![UNSET_HEIGHT; side * side];
        }
    }

    pub fn clear(&mut self) {
        self.values.fill(UNSET_HEIGHT);
    }

    #[inline(always)]
    fn index(&self, x: i32, z: i32) -> Option<usize> {
        if x < 0 || z < 0 {
            return None;
        }
        let (x, z) = (x as usize, z as usize);
        if x >= self.side || z >= self.side {
            return None;
        }
        Some(z * self.side + x)
    }

    /// Out-of-range reads return 0.0.
    #[inline]
    pub fn get(&self, x: i32, z: i32) -> f32 {
        self.index(x, z).map_or(0.0, |i| self.values[i])
    }

    /// Out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, z: i32, v: f32) {
        if let Some(i) = self.index(x, z) {
            self.values[i] = v;
        }
    }

    /// Writes `v` only if the cell is still unset.
    #[inline]
    pub fn fill_unset(&mut self, x: i32, z: i32, v: f32) {
        if let Some(i) = self.index(x, z) {
            if self.values[i] == UNSET_HEIGHT {
                self.values[i] = v;
            }
        }
    }

    #[inline]
    pub fn is_unset(&self, x: i32, z: i32) -> bool {
        self.index(x, z).map_or(false, |i| self.values[i] == UNSET_HEIGHT)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
