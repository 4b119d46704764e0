use std::collections::BTreeSet;
use std::io;
use std::iter::FromIterator;

use log::{debug, error, info};

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::mem::{Address, Memory};
use crate::scene::{
    DynamicScenePartHeader, SceneDefinition, ScenePartsHeader, NO_DESTROY_OFFSET,
};
use crate::scenes::{Level, LevelDecl};

/// Levels after which nothing destroyed in earlier levels matters anymore.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionLevels(BTreeSet<Level>);

impl TransitionLevels {
    pub fn contains(&self, level: Level) -> bool {
        self.0.contains(&level)
    }

    /// The transition level opening the window `level` belongs to.
    pub fn nearest_at_or_before(&self, level: Level) -> Option<Level> {
        self.0.range(..=level).next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Level> for TransitionLevels {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        TransitionLevels(iter.into_iter().collect())
    }
}

/// Running destroy-bit usage, folded over the levels in declaration order.
///
/// Levels of one window add up since the player can walk back and forth
/// between them. A transition level closes the window and starts a new one
/// over the same bits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DestroyBudget {
    /// Bits used by the current window so far.
    pub needed: usize,
    /// Largest total of any closed window.
    pub max_needed: usize,
}

impl DestroyBudget {
    pub fn fold(
        self,
        level: Level,
        extra: usize,
        transitions: &TransitionLevels,
        limit: usize,
    ) -> Result<DestroyBudget> {
        if transitions.contains(level) {
            let max_needed = self.max_needed.max(self.needed);
            if max_needed > limit {
                return Err(Error::BudgetExceeded {
                    level,
                    bits: max_needed,
                });
            }
            if extra > limit {
                return Err(Error::BudgetExceeded { level, bits: extra });
            }
            Ok(DestroyBudget {
                needed: extra,
                max_needed,
            })
        } else {
            let needed = self.needed + extra;
            if needed > limit {
                return Err(Error::BudgetExceeded {
                    level,
                    bits: needed,
                });
            }
            Ok(DestroyBudget {
                needed,
                max_needed: self.max_needed,
            })
        }
    }

    /// Largest window total, including the still open one.
    pub fn peak(&self) -> usize {
        self.max_needed.max(self.needed)
    }
}

pub struct LevelEntry {
    pub name: &'static str,
    pub definition: SceneDefinition,
    pub header: ScenePartsHeader,
    pub destroy_bits: usize,
}

/// Summary of a registry build.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryStats {
    pub levels: usize,
    pub parts: usize,
    /// Destroy bits used by each window, keyed by its first level.
    pub windows: Vec<(Level, usize)>,
    pub peak_destroy_bits: usize,
    pub runtime_region_size: usize,
    pub ram_used: usize,
}

/// Every level's definition and placements, laid out in RAM in declaration
/// order, with a destroy-bit budget that fits the ledger.
pub struct Registry {
    levels: Vec<LevelEntry>,
    transitions: TransitionLevels,
    budget: DestroyBudget,
    runtime_region: Address,
    runtime_region_size: usize,
    ram_used: usize,
}

impl Registry {
    /// Lay out `decls` in order. Fails on the first level that does not fit,
    /// be it in RAM or in the destroy-bit budget.
    pub fn build(
        mem: &mut Memory,
        decls: &[LevelDecl],
        config: &MemoryConfig,
    ) -> Result<Registry> {
        if decls.len() > u8::MAX as usize + 1 {
            return Err(Error::TooManyLevels(decls.len()));
        }

        let transitions = decls
            .iter()
            .enumerate()
            .filter(|(_, decl)| decl.transition)
            .map(|(i, _)| Level(i as u8))
            .collect::<TransitionLevels>();
        let limit = config.max_destroy_bits();

        let mut levels = Vec::with_capacity(decls.len());
        let mut budget = DestroyBudget::default();
        for (i, decl) in decls.iter().enumerate() {
            let level = Level(i as u8);
            let definition = SceneDefinition::new(mem, &decl.scene)?;
            let header = ScenePartsHeader::build(mem, level, &definition, decl.parts)?;
            let destroy_bits = header.destroy_bits_needed(mem);

            budget = budget
                .fold(level, destroy_bits, &transitions, limit)
                .map_err(|e| {
                    error!("{} ({})", e, decl.name);
                    e
                })?;
            debug!(
                "level {} {:<16} def {} parts {} ({:3}) destroy bits {:3} window {:3}{}",
                level,
                decl.name,
                definition.address(),
                header.address(),
                header.parts_count(mem),
                destroy_bits,
                budget.needed,
                if decl.transition { " [transition]" } else { "" }
            );

            levels.push(LevelEntry {
                name: decl.name,
                definition,
                header,
                destroy_bits,
            });
        }

        let runtime_region_size = levels
            .iter()
            .map(|entry| DynamicScenePartHeader::region_size(entry.header.parts_count(mem)))
            .max()
            .unwrap_or(1);
        let runtime_region = mem.alloc(runtime_region_size)?;

        let registry = Registry {
            levels,
            transitions,
            budget,
            runtime_region,
            runtime_region_size,
            ram_used: mem.used(),
        };
        info!(
            "{} levels registered, {} transition levels, {} of {} destroy bits at peak",
            registry.len(),
            registry.transitions.len(),
            budget.peak(),
            limit
        );

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn entry(&self, level: Level) -> Result<&LevelEntry> {
        self.levels
            .get(level.0 as usize)
            .ok_or(Error::UnknownLevel(level))
    }

    pub fn definition(&self, level: Level) -> Result<&SceneDefinition> {
        Ok(&self.entry(level)?.definition)
    }

    pub fn header(&self, level: Level) -> Result<&ScenePartsHeader> {
        Ok(&self.entry(level)?.header)
    }

    pub fn levels(&self) -> impl Iterator<Item = (Level, &LevelEntry)> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, entry)| (Level(i as u8), entry))
    }

    pub fn transitions(&self) -> &TransitionLevels {
        &self.transitions
    }

    pub fn budget(&self) -> DestroyBudget {
        self.budget
    }

    /// Where level entries build their [`DynamicScenePartHeader`].
    pub fn runtime_region(&self) -> Address {
        self.runtime_region
    }

    pub fn stats(&self, mem: &Memory) -> RegistryStats {
        let mut windows: Vec<(Level, usize)> = Vec::new();
        for (level, entry) in self.levels() {
            if windows.is_empty() || self.transitions.contains(level) {
                windows.push((level, entry.destroy_bits));
            } else if let Some(window) = windows.last_mut() {
                window.1 += entry.destroy_bits;
            }
        }

        RegistryStats {
            levels: self.len(),
            parts: self
                .levels
                .iter()
                .map(|entry| entry.header.parts_count(mem))
                .sum(),
            windows,
            peak_destroy_bits: self.budget().peak(),
            runtime_region_size: self.runtime_region_size,
            ram_used: self.ram_used,
        }
    }

    pub fn show_stats(&self, mem: &Memory) {
        let stats = self.stats(mem);
        info!(
            "{} levels, {} parts, {} of {} bytes of RAM ({} runtime)",
            stats.levels,
            stats.parts,
            stats.ram_used,
            mem.size(),
            stats.runtime_region_size
        );
        for (start, bits) in stats.windows.iter() {
            info!("window from level {}: {} destroy bits", start, bits);
        }
    }

    /// Write the memory map of every registered level.
    pub fn dump<W: io::Write>(&self, mem: &Memory, out: &mut W) -> io::Result<()> {
        for (level, entry) in self.levels() {
            writeln!(
                out,
                "{} {:<16} {} {:06x} parts {} x{:<3} destroy {:<3}{}",
                level,
                entry.name,
                entry.definition.address(),
                entry.definition.raw(mem),
                entry.header.address(),
                entry.header.parts_count(mem),
                entry.destroy_bits,
                if self.transitions.contains(level) {
                    " transition"
                } else {
                    ""
                }
            )?;
            for i in 0..entry.header.parts_count(mem) {
                let header = &entry.header;
                let (part, destroy) = match (header.part(mem, i), header.destroy_offset(mem, i)) {
                    (Ok(part), Ok(destroy)) => (part, destroy),
                    _ => break,
                };
                write!(out, "    {} {:04x}", part.address(), part.raw(mem))?;
                if destroy == NO_DESTROY_OFFSET {
                    writeln!(out)?;
                } else {
                    writeln!(out, " bit +{}", destroy)?;
                }
            }
        }
        writeln!(
            out,
            "runtime region {} ({} bytes)",
            self.runtime_region, self.runtime_region_size
        )
    }
}
