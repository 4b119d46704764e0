use log::{debug, info};

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::mem::{BitArray, Field, Memory};
use crate::registry::Registry;
use crate::scenes::Level;

use super::{DynamicScenePartHeader, NO_DESTROY_OFFSET};

/// Game-wide record of destroyed parts.
///
/// Levels between two transition levels share one window of the ledger;
/// `scene_offset` is where the current level's bits start inside it and
/// `scene_bits` how many of them it owns. Windows separated by a transition
/// level reuse the same bits.
#[derive(Clone, Copy, Debug)]
pub struct ScenePartsDestroyed {
    scene_offset: Field,
    scene_bits: Field,
    destroyed: BitArray,
    switch_blocks_off: Field,
}

impl ScenePartsDestroyed {
    pub fn new(mem: &mut Memory, config: &MemoryConfig) -> Result<ScenePartsDestroyed> {
        Ok(ScenePartsDestroyed {
            scene_offset: mem.alloc_field(8)?,
            scene_bits: mem.alloc_field(8)?,
            destroyed: mem.alloc_bits(config.ledger_bits)?,
            switch_blocks_off: mem.alloc_field(1)?,
        })
    }

    pub fn destroyed_bits(&self) -> BitArray {
        self.destroyed
    }

    pub fn scene_offset(&self, mem: &Memory) -> u8 {
        self.scene_offset.get(mem)
    }

    /// Rebind the window to `level`: its bits start right after those of every
    /// level since the nearest transition level, plus one.
    pub fn set_current_level(
        &self,
        mem: &mut Memory,
        registry: &Registry,
        level: Level,
    ) -> Result<u8> {
        registry.entry(level)?;

        let start = registry
            .transitions()
            .nearest_at_or_before(level)
            .unwrap_or(Level(0));
        let mut bits = 0;
        for l in start.0..level.0 {
            bits += registry.entry(Level(l))?.destroy_bits;
        }
        let offset = (bits + 1) as u8;
        let own_bits = registry.entry(level)?.destroy_bits as u8;

        self.scene_offset.set(mem, offset);
        self.scene_bits.set(mem, own_bits);
        info!(
            "level {}: ledger window from level {}, scene offset {}, {} bits",
            level, start, offset, own_bits
        );

        Ok(offset)
    }

    /// Number of ledger bits owned by the current level.
    pub fn scene_bits(&self, mem: &Memory) -> u8 {
        self.scene_bits.get(mem)
    }

    fn index(&self, mem: &Memory, offset: u8) -> usize {
        self.scene_offset(mem) as usize + offset as usize
    }

    /// Ledger index of `offset`, which must fall within the current level's
    /// bits.
    fn checked_index(&self, mem: &Memory, offset: u8) -> Result<usize> {
        let bits = self.scene_bits(mem);
        if offset >= bits {
            return Err(Error::DestroyOffsetOutOfRange { offset, bits });
        }
        Ok(self.index(mem, offset))
    }

    pub fn is_destroyed(&self, mem: &Memory, offset: u8) -> Result<bool> {
        if offset == NO_DESTROY_OFFSET {
            return Ok(false);
        }
        let index = self.checked_index(mem, offset)?;
        Ok(self.destroyed.get(mem, index))
    }

    pub fn set_destroyed(&self, mem: &mut Memory, offset: u8) -> Result<()> {
        if offset == NO_DESTROY_OFFSET {
            return Ok(());
        }
        let index = self.checked_index(mem, offset)?;
        debug!("ledger bit {} set", index);
        self.destroyed.set(mem, index, true);
        Ok(())
    }

    /// Forget what was destroyed in the current level, leaving the rest of
    /// the window alone.
    pub fn on_scene_restart(&self, mem: &mut Memory, header: &DynamicScenePartHeader) {
        let parts = header.parts(mem).collect::<Vec<_>>();
        let mut offset = 0u8;
        for part in parts {
            if part.is_destructible(mem) {
                let index = self.index(mem, offset);
                self.destroyed.set(mem, index, false);
                offset += 1;
            }
        }
        debug!("level {}: cleared {} ledger bits", header.level(), offset);
    }

    pub fn switch_blocks_off(&self, mem: &Memory) -> bool {
        self.switch_blocks_off.get(mem) != 0
    }

    pub fn set_switch_blocks_off(&self, mem: &mut Memory, off: bool) {
        self.switch_blocks_off.set(mem, off as u8);
    }
}
