//! Mondrian-style layout generation.
//!
//! The placement grid is rendered as an irregular patchwork: a virtual canvas
//! is recursively subdivided into ~400 rectangles, and each rectangle is
//! assigned one grid cell through a random shuffle. The whole layout is
//! generated once per campaign and persisted with it.

use crate::rng::Sha256Rng;
use crate::types::{
    Block, MIN_BLOCK_SIZE, TARGET_BLOCKS, VIRTUAL_CANVAS_HEIGHT, VIRTUAL_CANVAS_WIDTH,
};

#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub target_blocks: usize,
    pub min_size: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: VIRTUAL_CANVAS_WIDTH,
            canvas_height: VIRTUAL_CANVAS_HEIGHT,
            target_blocks: TARGET_BLOCKS,
            min_size: MIN_BLOCK_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    depth: u32,
}

impl Rect {
    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Recursive subdivision of the virtual canvas into up to `target_blocks`
/// rectangles. The result always tiles the canvas exactly with every side at
/// least `min_size`; it may hold fewer than `target_blocks` rectangles when
/// `min_size` makes the target unreachable.
pub fn generate_blocks(cfg: &LayoutConfig, rng: &mut Sha256Rng) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(cfg.target_blocks);
    let mut queue: Vec<Rect> = vec![Rect {
        x: 0,
        y: 0,
        width: cfg.canvas_width,
        height: cfg.canvas_height,
        depth: 0,
    }];
    let mut block_id = 0u32;

    while blocks.len() + queue.len() < cfg.target_blocks && !queue.is_empty() {
        // Largest rectangle first, so big empty regions get subdivided before
        // the target count is exhausted.
        queue.sort_by(|a, b| b.area().cmp(&a.area()));
        let rect = queue.remove(0);

        let remaining = cfg.target_blocks - (blocks.len() + queue.len());
        let can_split_h = rect.height >= cfg.min_size * 2;
        let can_split_v = rect.width >= cfg.min_size * 2;
        let can_split = can_split_h || can_split_v;

        // Split probability stays high while blocks are still needed, decaying
        // mildly with progress toward the target.
        let progress = blocks.len() as f64 / cfg.target_blocks as f64;
        let split_prob = if remaining > 0 {
            (1.0 - progress * 0.3).max(0.7)
        } else {
            0.0
        };
        let should_split = can_split && (rng.chance(split_prob) || remaining > 1);

        if !should_split {
            blocks.push(finalize(&rect, &mut block_id));
            continue;
        }

        // Prefer cutting the longer axis, with a small chance to flip so the
        // output does not look too regular.
        let split_horizontal = if can_split_h && can_split_v {
            let prefer_horizontal = rect.height > rect.width;
            if rng.chance(0.3) {
                !prefer_horizontal
            } else {
                prefer_horizontal
            }
        } else {
            can_split_h
        };

        if split_horizontal {
            let split_y = pick_split(rect.y, rect.height, cfg.min_size, rng);
            queue.push(Rect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: split_y - rect.y,
                depth: rect.depth + 1,
            });
            queue.push(Rect {
                x: rect.x,
                y: split_y,
                width: rect.width,
                height: rect.y + rect.height - split_y,
                depth: rect.depth + 1,
            });
        } else {
            let split_x = pick_split(rect.x, rect.width, cfg.min_size, rng);
            queue.push(Rect {
                x: rect.x,
                y: rect.y,
                width: split_x - rect.x,
                height: rect.height,
                depth: rect.depth + 1,
            });
            queue.push(Rect {
                x: split_x,
                y: rect.y,
                width: rect.x + rect.width - split_x,
                height: rect.height,
                depth: rect.depth + 1,
            });
        }
    }

    // Target reached (or nothing splittable left): everything still queued
    // becomes a block as-is.
    for rect in queue.drain(..) {
        blocks.push(finalize(&rect, &mut block_id));
    }

    blocks
}

fn finalize(rect: &Rect, block_id: &mut u32) -> Block {
    let block = Block {
        id: *block_id,
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        row: 0,
        col: 0,
    };
    *block_id += 1;
    block
}

/// Split coordinate uniform in `[edge + min, edge + extent - min)`, so both
/// children meet the minimum size. Extent of exactly `2 * min` pins the cut
/// to the midpoint.
fn pick_split(edge: u32, extent: u32, min_size: u32, rng: &mut Sha256Rng) -> u32 {
    let lo = (edge + min_size) as u64;
    let hi = (edge + extent - min_size) as u64;
    if lo < hi {
        rng.range(lo, hi) as u32
    } else {
        lo as u32
    }
}

/// Assign each block a unique grid cell: enumerate all cells, shuffle, and
/// pair with blocks in generation order. Cells beyond the block count stay
/// unused.
pub fn assign_grid_cells(blocks: &mut [Block], grid_width: u16, grid_height: u16, rng: &mut Sha256Rng) {
    let mut coords: Vec<(u16, u16)> = Vec::with_capacity(grid_width as usize * grid_height as usize);
    for row in 0..grid_height {
        for col in 0..grid_width {
            coords.push((row, col));
        }
    }
    rng.shuffle(&mut coords);

    for (block, &(row, col)) in blocks.iter_mut().zip(coords.iter()) {
        block.row = row;
        block.col = col;
    }
}

/// Full per-campaign layout: subdivision plus grid mapping.
pub fn generate_layout(cfg: &LayoutConfig, grid_width: u16, grid_height: u16, rng: &mut Sha256Rng) -> Vec<Block> {
    let mut blocks = generate_blocks(cfg, rng);
    assign_grid_cells(&mut blocks, grid_width, grid_height, rng);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn seeds(n: usize) -> Vec<[u8; 32]> {
        let mut chacha = ChaCha8Rng::seed_from_u64(42);
        (0..n)
            .map(|_| {
                let mut seed = [0u8; 32];
                chacha.fill_bytes(&mut seed);
                seed
            })
            .collect()
    }

    fn overlaps(a: &Block, b: &Block) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn test_blocks_exactly_tile_canvas() {
        let cfg = LayoutConfig::default();
        for seed in seeds(10) {
            let mut rng = Sha256Rng::from_seed(seed);
            let blocks = generate_blocks(&cfg, &mut rng);

            let area: u64 = blocks.iter().map(|b| b.width as u64 * b.height as u64).sum();
            assert_eq!(area, cfg.canvas_width as u64 * cfg.canvas_height as u64);

            for (i, a) in blocks.iter().enumerate() {
                for b in &blocks[i + 1..] {
                    assert!(!overlaps(a, b), "blocks {} and {} overlap", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn test_no_block_below_minimum_size() {
        let cfg = LayoutConfig::default();
        for seed in seeds(10) {
            let mut rng = Sha256Rng::from_seed(seed);
            for block in generate_blocks(&cfg, &mut rng) {
                assert!(block.width >= cfg.min_size, "width {} too small", block.width);
                assert!(block.height >= cfg.min_size, "height {} too small", block.height);
            }
        }
    }

    #[test]
    fn test_block_count_near_target() {
        let cfg = LayoutConfig::default();
        let mut rng = Sha256Rng::from_seed(seeds(1)[0]);
        let blocks = generate_blocks(&cfg, &mut rng);
        // 1000x1000 with min 25 fits 400 comfortably; never more than target.
        assert!(blocks.len() <= cfg.target_blocks);
        assert!(blocks.len() >= cfg.target_blocks / 2, "only {} blocks", blocks.len());
    }

    #[test]
    fn test_unreachable_target_still_tiles() {
        // 100x100 at min 25 caps out at 16 blocks; target 400 is unreachable.
        let cfg = LayoutConfig {
            canvas_width: 100,
            canvas_height: 100,
            target_blocks: 400,
            min_size: 25,
        };
        let mut rng = Sha256Rng::from_seed(seeds(1)[0]);
        let blocks = generate_blocks(&cfg, &mut rng);
        assert!(blocks.len() < 400);
        assert!(!blocks.is_empty());
        let area: u64 = blocks.iter().map(|b| b.width as u64 * b.height as u64).sum();
        assert_eq!(area, 100 * 100);
        for block in &blocks {
            assert!(block.width >= 25 && block.height >= 25);
        }
    }

    #[test]
    fn test_grid_mapping_is_injective() {
        let cfg = LayoutConfig::default();
        for seed in seeds(5) {
            let mut rng = Sha256Rng::from_seed(seed);
            let blocks = generate_layout(&cfg, 20, 20, &mut rng);
            assert!(blocks.len() <= 400);

            let mut cells = HashSet::new();
            for block in &blocks {
                assert!(block.row < 20 && block.col < 20);
                assert!(cells.insert((block.row, block.col)), "cell assigned twice");
            }
        }
    }

    #[test]
    fn test_same_seed_reproduces_layout() {
        let cfg = LayoutConfig::default();
        let seed = seeds(1)[0];
        let a = generate_layout(&cfg, 20, 20, &mut Sha256Rng::from_seed(seed));
        let b = generate_layout(&cfg, 20, 20, &mut Sha256Rng::from_seed(seed));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let cfg = LayoutConfig::default();
        let all = seeds(2);
        let a = generate_layout(&cfg, 20, 20, &mut Sha256Rng::from_seed(all[0]));
        let b = generate_layout(&cfg, 20, 20, &mut Sha256Rng::from_seed(all[1]));
        assert_ne!(a, b);
    }
}
