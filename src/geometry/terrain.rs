use std::ops::Range;

use glam::Vec3;
use rand::Rng;
use tracing::debug;

use super::attributes::{area_weighted_normals, bounding_box};
use crate::types::BoundingBox;

/// Diamond-square tuning.
#[derive(Debug, Clone)]
pub struct DiamondSquareParams {
    /// Range of the uniform random samples used for corner seeds and offsets.
    pub sample_range: Range<f32>,
    /// Offset amplitude at the coarsest step; halved after every step.
    pub initial_roughness: f32,
}

impl Default for DiamondSquareParams {
    fn default() -> Self {
        Self {
            sample_range: 0.0..5.0,
            initial_roughness: 3.0,
        }
    }
}

/// `(width + 1) × (height + 1)` grid of heights, indexed `(x, z)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Heightmap {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize + 1) * (height as usize + 1);
        Self {
            width,
            height,
            values: vec![0.0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    fn index(&self, x: i64, z: i64) -> Option<usize> {
        if x < 0 || z < 0 || x > self.width as i64 || z > self.height as i64 {
            return None;
        }
        Some(z as usize * (self.width as usize + 1) + x as usize)
    }

    /// Height at `(x, z)`, `None` outside the grid.
    pub fn get(&self, x: i64, z: i64) -> Option<f32> {
        self.index(x, z).map(|i| self.values[i])
    }

    pub fn set(&mut self, x: i64, z: i64, value: f32) {
        if let Some(i) = self.index(x, z) {
            self.values[i] = value;
        }
    }

    /// Mean of whichever of `points` fall inside the grid.
    fn average(&self, points: [(i64, i64); 4]) -> Option<f32> {
        let (sum, count) = points
            .iter()
            .filter_map(|&(x, z)| self.get(x, z))
            .fold((0.0, 0u32), |(s, c), h| (s + h, c + 1));
        (count > 0).then(|| sum / count as f32)
    }
}

/// Synthesize a heightmap with the diamond-square algorithm.
///
/// The step size starts at `max(width, height)` and halves until it reaches 1.
/// Each step runs a diamond pass (cell centres from their 4 diagonal
/// neighbours) then a square pass (edge midpoints from their up-to-4 axis
/// neighbours, 3 on borders, 2 in corners). Roughness halves after every
/// step. Neighbours that fall outside the grid are skipped, so any
/// dimensions, including 0 × 0, are safe.
pub fn diamond_square<R: Rng + ?Sized>(width: u32, height: u32, params: &DiamondSquareParams, rng: &mut R) -> Heightmap {
    let mut map = Heightmap::new(width, height);
    let (w, h) = (width as i64, height as i64);

    for (x, z) in [(0, 0), (w, 0), (0, h), (w, h)] {
        let seed = sample(rng, &params.sample_range);
        map.set(x, z, seed);
    }

    let mut roughness = params.initial_roughness;
    let mut step = w.max(h);

    while step > 1 {
        let half = step / 2;

        // Diamond pass
        let mut x = half;
        while x < w {
            let mut z = half;
            while z < h {
                let corners = [
                    (x - half, z - half),
                    (x + half, z - half),
                    (x - half, z + half),
                    (x + half, z + half),
                ];
                if let Some(avg) = map.average(corners) {
                    let offset = sample(rng, &params.sample_range) * roughness - roughness * 0.5;
                    map.set(x, z, avg + offset);
                }
                z += step;
            }
            x += step;
        }

        // Square pass
        let mut x = 0;
        while x <= w {
            let mut z = if (x / half) % 2 == 0 { half } else { 0 };
            while z <= h {
                let neighbours = [(x - half, z), (x + half, z), (x, z - half), (x, z + half)];
                if let Some(avg) = map.average(neighbours) {
                    let offset = sample(rng, &params.sample_range) * roughness - roughness * 0.5;
                    map.set(x, z, avg + offset);
                }
                z += step;
            }
            x += half;
        }

        step /= 2;
        roughness *= 0.5;
    }

    map
}

fn sample<R: Rng + ?Sized>(rng: &mut R, range: &Range<f32>) -> f32 {
    rng.random_range(range.clone())
}

/// Height value bands, clamped to `[0, 10]` before bucketing.
pub fn height_color(height: f32) -> Vec3 {
    let h = height.clamp(0.0, 10.0);
    if h < 1.5 {
        Vec3::new(0.0, 0.0, 1.0) // water
    } else if h < 2.5 {
        Vec3::new(0.5, 0.35, 0.05) // sand
    } else if h < 4.0 {
        Vec3::new(0.0, 0.7, 0.0) // grass
    } else if h < 6.0 {
        Vec3::new(0.5, 0.5, 0.5) // rock
    } else {
        Vec3::ONE // snow
    }
}

/// Raw output of the terrain generator.
#[derive(Debug, Clone, Default)]
pub struct TerrainGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounds: BoundingBox,
}

/// Triangulate a heightmap: one vertex per grid point at `(x, height, z)`,
/// two upward-facing triangles per cell, height-banded colors, area-weighted
/// normals and computed bounds.
pub fn build_terrain(map: &Heightmap) -> TerrainGeometry {
    let (w, h) = (map.width(), map.height());
    let row = w + 1;

    let mut vertices = Vec::with_capacity(map.values().len());
    let mut colors = Vec::with_capacity(map.values().len());
    for z in 0..=h {
        for x in 0..=w {
            let y = map.get(x as i64, z as i64).unwrap_or_default();
            vertices.push(Vec3::new(x as f32, y, z as f32));
            colors.push(height_color(y));
        }
    }

    let mut triangles = Vec::with_capacity(w as usize * h as usize * 2);
    for z in 0..h {
        for x in 0..w {
            let i0 = z * row + x;
            let i1 = i0 + 1;
            let i2 = (z + 1) * row + x;
            let i3 = i2 + 1;
            triangles.push([i0, i2, i1]);
            triangles.push([i1, i2, i3]);
        }
    }

    let normals = area_weighted_normals(&vertices, &triangles);
    let bounds = bounding_box(&vertices);
    debug!(
        vertices = vertices.len(),
        triangles = triangles.len(),
        "Built terrain mesh"
    );

    TerrainGeometry {
        vertices,
        normals,
        colors,
        triangles,
        bounds,
    }
}
