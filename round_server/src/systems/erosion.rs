use crate::domain::arena::{Arena, Block};
use crate::domain::state::{BlockPos, Position};

/// Surfaces the round is allowed to remove underneath players.
pub fn is_erodible(block: Block) -> bool {
    matches!(block, Block::Sand | Block::RedSand | Block::Gravel)
}

/// The block a player stands on and the one beneath it, if the standing block is erodible.
pub fn erodible_column(arena: &Arena, position: &Position) -> Option<[BlockPos; 2]> {
    let surface = position.block().below();
    let block = arena.block_at(surface)?;
    if !is_erodible(block) {
        return None;
    }
    Some([surface, surface.below()])
}

/// Clears the given blocks and returns the ones that were actually present.
pub fn erode(arena: &mut Arena, column: &[BlockPos]) -> Vec<BlockPos> {
    column
        .iter()
        .copied()
        .filter(|pos| arena.clear(*pos))
        .collect()
}

/// Horizontal speed in blocks per second, rounded to two decimals.
pub fn horizontal_speed(previous: &Position, current: &Position, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    let speed = previous.horizontal_distance(current) / elapsed_secs;
    (speed * 100.0).round() / 100.0
}
