use log::{debug, info};

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::mem::{Address, Memory};
use crate::registry::Registry;
use crate::scene::{
    DynamicScenePartHeader, ExitType, ScenePart, ScenePartsDestroyed, SCENE_PART_SIZE,
};
use crate::scenes::Level;

/// Runtime state of a play session: the level being played, its live copy
/// of placements, and the game-wide destroyed-parts ledger.
pub struct Session {
    registry: Registry,
    ledger: ScenePartsDestroyed,
    // Record of the exit last taken.
    active_exit: Address,
    current: Option<DynamicScenePartHeader>,
}

impl Session {
    pub fn new(mem: &mut Memory, registry: Registry, config: &MemoryConfig) -> Result<Session> {
        let ledger = ScenePartsDestroyed::new(mem, config)?;
        let active_exit = mem.alloc(SCENE_PART_SIZE)?;

        Ok(Session {
            registry,
            ledger,
            active_exit,
            current: None,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &ScenePartsDestroyed {
        &self.ledger
    }

    pub fn current(&self) -> Result<&DynamicScenePartHeader> {
        self.current.as_ref().ok_or(Error::NoCurrentLevel)
    }

    pub fn current_level(&self) -> Option<Level> {
        self.current.as_ref().map(DynamicScenePartHeader::level)
    }

    /// Make `level` the current level, replacing any previous instance.
    pub fn enter(&mut self, mem: &mut Memory, level: Level) -> Result<()> {
        let template = *self.registry.header(level)?;
        self.ledger.set_current_level(mem, &self.registry, level)?;
        self.current = Some(DynamicScenePartHeader::build(
            mem,
            level,
            &template,
            self.registry.runtime_region(),
        ));

        info!(
            "entered level {} ({})",
            level,
            self.registry.entry(level)?.name
        );
        Ok(())
    }

    /// Start the current level over: its destroyed parts come back and every
    /// one-shot part can trigger again.
    pub fn restart(&mut self, mem: &mut Memory) -> Result<()> {
        let level = {
            let header = self.current()?;
            self.ledger.on_scene_restart(mem, header);
            header.level()
        };
        self.enter(mem, level)
    }

    /// Fire one-shot part `index`. Returns false if it had already fired
    /// during this visit.
    pub fn activate(&mut self, mem: &mut Memory, index: usize) -> Result<bool> {
        let header = self.current()?;
        if header.is_part_activated(mem, index)? {
            return Ok(false);
        }
        header.mark_active(mem, index)?;
        debug!("part {} activated", index);
        Ok(true)
    }

    pub fn is_destroyed(&self, mem: &Memory, index: usize) -> Result<bool> {
        let offset = self.current()?.destroy_offset(mem, index)?;
        self.ledger.is_destroyed(mem, offset)
    }

    pub fn destroy(&mut self, mem: &mut Memory, index: usize) -> Result<()> {
        let offset = self.current()?.destroy_offset(mem, index)?;
        self.ledger.set_destroyed(mem, offset)
    }

    /// Flip the global switch block state and return the new one.
    pub fn toggle_switch_blocks(&mut self, mem: &mut Memory) -> bool {
        let off = !self.ledger.switch_blocks_off(mem);
        self.ledger.set_switch_blocks_off(mem, off);
        off
    }

    /// Take exit part `index`: remember it as the active exit and enter the
    /// level it leads to.
    pub fn take_exit(&mut self, mem: &mut Memory, index: usize) -> Result<Level> {
        let header = self.current()?;
        let from = header.level();
        let part = header.part(mem, index)?;
        let offset = part.exit_level_offset(mem).ok_or(Error::NotAnExit(index))?;

        let target = from.0 as i16 + offset as i16;
        if target < 0 || target > u8::MAX as i16 {
            return Err(Error::ExitOffsetOutOfRange(offset));
        }
        let target = Level(target as u8);
        self.registry.entry(target)?;

        ScenePart::at(self.active_exit, part.codec()).copy_from(mem, &part);
        debug!("exit {} of level {} -> level {}", index, from, target);

        self.enter(mem, target)?;
        Ok(target)
    }

    /// Type and offset of the exit last taken.
    pub fn active_exit(&self, mem: &Memory) -> Option<(ExitType, i8)> {
        let codec = self.current.as_ref()?.codec();
        let part = ScenePart::at(self.active_exit, codec);
        Some((part.exit_type(mem)?, part.exit_level_offset(mem)?))
    }
}
