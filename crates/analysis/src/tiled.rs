//! Tiled execution for large scenes
//!
//! Classification is pointwise, so a scene can be processed as
//! independent tiles with no halo and no shared state. Tiles are
//! classified in parallel and their tallies merged commutatively;
//! intermediate index grids are never materialized, which bounds peak
//! memory for large rasters.

use crate::classify::ClassifyParams;
use crate::indices::nd_pixel;
use crate::maybe_rayon::*;
use crate::summary::ClassCounts;
use ecosentinel_core::{Result, Scene};

/// A rectangular subset of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source grid
    pub row_offset: usize,
    /// Column offset in the source grid
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

/// Iterator over non-overlapping tiles covering a grid
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Tiles of at most `tile_size` x `tile_size`; edge tiles are
    /// clipped to the grid.
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);

        let tile = Tile {
            row_offset: self.current_row,
            col_offset: self.current_col,
            rows,
            cols,
        };

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Classify a scene tile by tile, returning the merged tallies.
///
/// Each tile is a pure function of its own band values, so tiles run in
/// parallel and merge in any order; a failed tile could be re-run
/// independently without touching the others.
pub fn audit_tiles(
    scene: &Scene,
    params: ClassifyParams,
    tile_size: usize,
) -> Result<ClassCounts> {
    params.validate()?;

    let (rows, cols) = scene.shape();
    let tiles: Vec<Tile> = TileIterator::new(rows, cols, tile_size).collect();

    let counts = tiles
        .into_par_iter()
        .map(|tile| classify_tile(scene, &tile, &params))
        .collect::<Vec<ClassCounts>>()
        .into_iter()
        .fold(ClassCounts::default(), ClassCounts::merge);

    Ok(counts)
}

fn classify_tile(scene: &Scene, tile: &Tile, params: &ClassifyParams) -> ClassCounts {
    let green = scene.green();
    let red = scene.red();
    let nir = scene.nir();

    let nodata_green = green.nodata();
    let nodata_red = red.nodata();
    let nodata_nir = nir.nodata();

    let mut counts = ClassCounts::default();

    for row in tile.row_offset..tile.row_offset + tile.rows {
        for col in tile.col_offset..tile.col_offset + tile.cols {
            let g = unsafe { green.get_unchecked(row, col) };
            let r = unsafe { red.get_unchecked(row, col) };
            let n = unsafe { nir.get_unchecked(row, col) };

            let ndvi = nd_pixel(n, r, nodata_nir, nodata_red);
            let ndwi = nd_pixel(g, n, nodata_green, nodata_nir);

            counts.add(params.classify_pixel(ndvi, ndwi));
        }
    }

    counts
}
