// Playable area of a loaded map: a sparse block grid.

use super::state::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Sand,
    RedSand,
    Gravel,
    Tnt,
    Stone,
}

/// Rectangular horizontal layer of blocks used to build an arena floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorLayer {
    pub y: i32,
    pub block: Block,
    /// Inclusive `[x, z]` corner.
    pub from: [i32; 2],
    /// Inclusive `[x, z]` corner.
    pub to: [i32; 2],
}

#[derive(Debug, Clone)]
pub struct Arena {
    name: String,
    blocks: HashMap<BlockPos, Block>,
}

impl Arena {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: HashMap::new(),
        }
    }

    pub fn from_layers(name: impl Into<String>, layers: &[FloorLayer]) -> Self {
        let mut arena = Self::new(name);
        for layer in layers {
            arena.fill_layer(layer);
        }
        arena
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fill_layer(&mut self, layer: &FloorLayer) {
        let (min_x, max_x) = ordered(layer.from[0], layer.to[0]);
        let (min_z, max_z) = ordered(layer.from[1], layer.to[1]);
        for x in min_x..=max_x {
            for z in min_z..=max_z {
                self.blocks.insert(BlockPos::new(x, layer.y, z), layer.block);
            }
        }
    }

    pub fn set_block(&mut self, pos: BlockPos, block: Block) {
        self.blocks.insert(pos, block);
    }

    /// `None` means air.
    pub fn block_at(&self, pos: BlockPos) -> Option<Block> {
        self.blocks.get(&pos).copied()
    }

    /// Turns the block into air. Returns true if something was removed.
    pub fn clear(&mut self, pos: BlockPos) -> bool {
        self.blocks.remove(&pos).is_some()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b { (a, b) } else { (b, a) }
}
