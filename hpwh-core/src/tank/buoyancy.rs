//! Mix-down pass enforcing a monotonically non-decreasing temperature
//! profile with tank height.
//!
//! Adapted from `twine-components`' stratified-tank buoyancy stabilizer: a
//! bottom-to-top stack of blocks merges any pair where the lower block is
//! warmer (here: less dense, since hot water rises) than the one above,
//! redistributing the merged temperature back across the block's member
//! nodes. The const-generic array version assumes a compile-time node
//! count; this version works over a runtime-length slice since tank node
//! count is a preset parameter, not known at compile time. Because every
//! node has the same volume, the mass-weighted average used there reduces
//! to a plain node-count-weighted average here.

use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::degree_celsius;

struct Block {
    start: usize,
    end: usize,
    avg_c: f64,
}

impl Block {
    fn count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Restores a monotonically non-decreasing-with-height profile by merging
/// any contiguous inverted run of nodes (an upper node cooler than the one
/// below it) into a single shared temperature.
pub fn stabilize(temps: &mut [ThermodynamicTemperature]) {
    let n = temps.len();
    if n < 2 {
        return;
    }

    let already_stable = temps.windows(2).all(|w| {
        w[0].get::<degree_celsius>() <= w[1].get::<degree_celsius>() + 1e-9
    });
    if already_stable {
        return;
    }

    let mut stack: Vec<Block> = Vec::with_capacity(n);
    for (i, temp) in temps.iter().enumerate() {
        let mut block = Block {
            start: i,
            end: i,
            avg_c: temp.get::<degree_celsius>(),
        };

        while let Some(below) = stack.last() {
            // Unstable when the block below is warmer than this one: hot
            // water is less dense and belongs above cooler water.
            if below.avg_c > block.avg_c {
                let below = stack.pop().expect("checked by `last` above");
                let merged_count = below.count() + block.count();
                let merged_avg = (below.avg_c * below.count() as f64
                    + block.avg_c * block.count() as f64)
                    / merged_count as f64;
                block = Block {
                    start: below.start,
                    end: block.end,
                    avg_c: merged_avg,
                };
            } else {
                break;
            }
        }

        stack.push(block);
    }

    for block in &stack {
        let t = ThermodynamicTemperature::new::<degree_celsius>(block.avg_c);
        for temp in &mut temps[block.start..=block.end] {
            *temp = t;
        }
    }
}
