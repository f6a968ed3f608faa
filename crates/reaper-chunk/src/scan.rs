use std::sync::Arc;

use reaper_blocks::Material;
use reaper_geom::Coordinate;

use crate::host::ChunkView;

/// A matched cell: where it is and what it held when scanned.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub at: Coordinate,
    pub material: Material,
}

/// Collects every cell of `chunk` holding `target` that `excluded` does not reject.
///
/// Visits the whole column, `y` from 0 through `max_height` inclusive. Cells the
/// host cannot resolve are skipped. The predicate runs once per material match,
/// so it should be a set lookup.
pub fn scan_chunk<C, F>(chunk: &C, target: Material, excluded: F) -> Vec<Cell>
where
    C: ChunkView + ?Sized,
    F: Fn(&Coordinate) -> bool,
{
    let key = chunk.key();
    let world: &Arc<str> = &key.world;
    let (min_x, max_x) = (key.min_x(), key.max_x());
    let (min_z, max_z) = (key.min_z(), key.max_z());
    let max_y = chunk.max_height();

    let mut out = Vec::new();
    let mut unresolved = 0usize;
    for x in min_x..=max_x {
        for y in 0..=max_y {
            for z in min_z..=max_z {
                let material = match chunk.material_at(x, y, z) {
                    Ok(m) => m,
                    Err(_) => {
                        unresolved += 1;
                        continue;
                    }
                };
                if material != target {
                    continue;
                }
                let at = Coordinate {
                    world: Arc::clone(world),
                    x,
                    y,
                    z,
                };
                if excluded(&at) {
                    continue;
                }
                out.push(Cell { at, material });
            }
        }
    }
    if unresolved > 0 {
        log::trace!("scan {}: skipped {} unresolved cells", key, unresolved);
    }
    out
}
