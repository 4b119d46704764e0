use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::mem::{Address, BitArray, Memory};
use crate::scenes::Level;

use super::{
    PartDescriptor, PositionCodec, SceneDefinition, ScenePart, NO_DESTROY_OFFSET, SCENE_PART_SIZE,
};

/// A count byte followed by that many contiguous scene part records.
#[derive(Clone, Copy)]
struct PartList {
    addr: Address,
    codec: &'static dyn PositionCodec,
}

impl fmt::Debug for PartList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PartList({}, {:?})", self.addr, self.codec.style())
    }
}

impl PartList {
    fn count(&self, mem: &Memory) -> usize {
        mem.read(self.addr) as usize
    }

    fn parts_address(&self) -> Address {
        self.addr.offset(1)
    }

    fn byte_len(&self, mem: &Memory) -> usize {
        1 + self.count(mem) * SCENE_PART_SIZE
    }

    fn part(&self, mem: &Memory, index: usize) -> Result<ScenePart> {
        let count = self.count(mem);
        if index >= count {
            return Err(Error::PartIndexOutOfRange { index, count });
        }
        Ok(self.part_unchecked(index))
    }

    fn part_unchecked(&self, index: usize) -> ScenePart {
        ScenePart::at(
            self.parts_address().offset(index * SCENE_PART_SIZE),
            self.codec,
        )
    }

    fn parts<'a>(&self, mem: &'a Memory) -> impl Iterator<Item = ScenePart> + 'a {
        let list = *self;
        (0..self.count(mem)).map(move |i| list.part_unchecked(i))
    }

    fn destroy_bits_needed(&self, mem: &Memory) -> usize {
        self.parts(mem).filter(|p| p.is_destructible(mem)).count()
    }

    /// Ledger offset of part `index`: the number of destructible parts before
    /// it, or [`NO_DESTROY_OFFSET`] if the part itself is not destructible.
    fn destroy_offset(&self, mem: &Memory, index: usize) -> Result<u8> {
        if !self.part(mem, index)?.is_destructible(mem) {
            return Ok(NO_DESTROY_OFFSET);
        }
        Ok(self
            .parts(mem)
            .take(index)
            .filter(|p| p.is_destructible(mem))
            .count() as u8)
    }
}

/// The immutable list of placements of one level.
#[derive(Clone, Copy, Debug)]
pub struct ScenePartsHeader {
    list: PartList,
}

impl ScenePartsHeader {
    /// Write the count byte then encode every descriptor right after it.
    pub fn build(
        mem: &mut Memory,
        level: Level,
        def: &SceneDefinition,
        descriptors: &[PartDescriptor],
    ) -> Result<ScenePartsHeader> {
        if descriptors.len() > u8::MAX as usize {
            return Err(Error::TooManyParts {
                level,
                count: descriptors.len(),
            });
        }

        let codec = def.codec(mem)?;
        let addr = mem.alloc(1)?;
        mem.write(addr, descriptors.len() as u8);
        for descriptor in descriptors {
            descriptor.encode(mem, def)?;
        }

        let header = ScenePartsHeader {
            list: PartList { addr, codec },
        };
        debug!(
            "level {} parts at {}: {} parts, {} bytes",
            level,
            addr,
            descriptors.len(),
            header.byte_len(mem)
        );

        Ok(header)
    }

    pub fn address(&self) -> Address {
        self.list.addr
    }

    pub fn codec(&self) -> &'static dyn PositionCodec {
        self.list.codec
    }

    pub fn parts_count(&self, mem: &Memory) -> usize {
        self.list.count(mem)
    }

    pub fn byte_len(&self, mem: &Memory) -> usize {
        self.list.byte_len(mem)
    }

    pub fn part(&self, mem: &Memory, index: usize) -> Result<ScenePart> {
        self.list.part(mem, index)
    }

    pub fn parts<'a>(&self, mem: &'a Memory) -> impl Iterator<Item = ScenePart> + 'a {
        self.list.parts(mem)
    }

    pub fn destroy_bits_needed(&self, mem: &Memory) -> usize {
        self.list.destroy_bits_needed(mem)
    }

    pub fn destroy_offset(&self, mem: &Memory, index: usize) -> Result<u8> {
        self.list.destroy_offset(mem, index)
    }
}

/// Per-visit copy of a level's placements plus one activation bit per part.
///
/// Rebuilt from the static header on every level entry, so gameplay never
/// writes to the template.
#[derive(Debug)]
pub struct DynamicScenePartHeader {
    level: Level,
    list: PartList,
    activated: BitArray,
}

impl DynamicScenePartHeader {
    /// Bytes needed in the runtime region for a level with `count` parts.
    pub fn region_size(count: usize) -> usize {
        1 + count * SCENE_PART_SIZE + BitArray::byte_len_for(count)
    }

    /// Copy `template` into the runtime region at `region` and clear all
    /// activation bits. Whatever was built there before is replaced.
    pub fn build(
        mem: &mut Memory,
        level: Level,
        template: &ScenePartsHeader,
        region: Address,
    ) -> DynamicScenePartHeader {
        let count = template.parts_count(mem);
        let list = PartList {
            addr: region,
            codec: template.codec(),
        };

        mem.write(region, count as u8);
        mem.copy(
            template.list.parts_address(),
            list.parts_address(),
            count * SCENE_PART_SIZE,
        );
        let activated = BitArray::new(region.offset(1 + count * SCENE_PART_SIZE), count);
        activated.clear(mem);

        debug!(
            "level {} instantiated at {} ({} parts)",
            level, region, count
        );

        DynamicScenePartHeader {
            level,
            list,
            activated,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn address(&self) -> Address {
        self.list.addr
    }

    pub fn codec(&self) -> &'static dyn PositionCodec {
        self.list.codec
    }

    pub fn parts_count(&self, mem: &Memory) -> usize {
        self.list.count(mem)
    }

    pub fn part(&self, mem: &Memory, index: usize) -> Result<ScenePart> {
        self.list.part(mem, index)
    }

    pub fn parts<'a>(&self, mem: &'a Memory) -> impl Iterator<Item = ScenePart> + 'a {
        self.list.parts(mem)
    }

    pub fn destroy_bits_needed(&self, mem: &Memory) -> usize {
        self.list.destroy_bits_needed(mem)
    }

    pub fn destroy_offset(&self, mem: &Memory, index: usize) -> Result<u8> {
        self.list.destroy_offset(mem, index)
    }

    fn check_index(&self, mem: &Memory, index: usize) -> Result<()> {
        self.list.part(mem, index).map(|_| ())
    }

    pub fn is_part_activated(&self, mem: &Memory, index: usize) -> Result<bool> {
        self.check_index(mem, index)?;
        Ok(self.activated.get(mem, index))
    }

    pub fn mark_active(&self, mem: &mut Memory, index: usize) -> Result<()> {
        self.check_index(mem, index)?;
        self.activated.set(mem, index, true);
        Ok(())
    }

    pub fn activated_count(&self, mem: &Memory) -> usize {
        self.activated.count_ones(mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        BlockKind, Edges, ExitType, LevelShape, ScenePartType, SceneSettings, ScrollStyle,
        SpriteKind,
    };

    fn definition(mem: &mut Memory) -> SceneDefinition {
        let settings = SceneSettings {
            scroll_style: ScrollStyle::Horizontal,
            shape: LevelShape::Flat,
            theme: 1,
            enemy_group: 1,
            edges: Edges::Span { begin: 4, end: 4 },
            bg_position: [0, 1],
        };
        SceneDefinition::new(mem, &settings).unwrap()
    }

    fn block(kind: BlockKind, x: u8) -> PartDescriptor {
        PartDescriptor::DynamicBlock { kind, x, y: 10 }
    }

    fn descriptors() -> Vec<PartDescriptor> {
        vec![
            PartDescriptor::Exit {
                exit_type: ExitType::Right,
                offset: 1,
            },
            PartDescriptor::Sprite {
                kind: SpriteKind::EnemyType1,
                x: 33,
                y: 4,
            },
            block(BlockKind::Switch, 10),
            block(BlockKind::Breakable, 11),
            block(BlockKind::Switch, 12),
            block(BlockKind::Breakable, 13),
            block(BlockKind::Switch, 50),
            block(BlockKind::Switch, 51),
        ]
    }

    #[test]
    fn test_build_header() {
        let mut mem = Memory::new(64);
        let def = definition(&mut mem);
        let header = ScenePartsHeader::build(&mut mem, Level(3), &def, &descriptors()).unwrap();

        assert_eq!(header.address(), Address(3));
        assert_eq!(header.parts_count(&mem), 8);
        assert_eq!(header.byte_len(&mem), 17);
        assert_eq!(mem.used(), 3 + 17);

        let exit = header.part(&mem, 0).unwrap();
        assert_eq!(exit.exit_type(&mem), Some(ExitType::Right));
        assert_eq!(exit.exit_level_offset(&mem), Some(1));

        let enemy = header.part(&mem, 1).unwrap();
        assert_eq!(enemy.address(), Address(6));
        assert_eq!(enemy.part_type(&mem), Ok(ScenePartType::EnemyType1));
        assert_eq!((enemy.x(&mem), enemy.y(&mem)), (33, 4));

        assert_eq!(
            header.part(&mem, 8).unwrap_err(),
            Error::PartIndexOutOfRange { index: 8, count: 8 }
        );
    }

    #[test]
    fn test_destroy_offsets() {
        let mut mem = Memory::new(64);
        let def = definition(&mut mem);
        let header = ScenePartsHeader::build(&mut mem, Level(0), &def, &descriptors()).unwrap();

        assert_eq!(header.destroy_bits_needed(&mem), 3);
        let offsets = (0..8)
            .map(|i| header.destroy_offset(&mem, i).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![255, 0, 255, 1, 255, 2, 255, 255]);
    }

    #[test]
    fn test_too_many_parts() {
        let mut mem = Memory::new(1024);
        let def = definition(&mut mem);
        let parts = vec![block(BlockKind::Switch, 0); 256];
        assert_eq!(
            ScenePartsHeader::build(&mut mem, Level(7), &def, &parts).unwrap_err(),
            Error::TooManyParts {
                level: Level(7),
                count: 256
            }
        );
    }

    #[test]
    fn test_dynamic_header_copies_template() {
        let mut mem = Memory::new(64);
        let def = definition(&mut mem);
        let header = ScenePartsHeader::build(&mut mem, Level(0), &def, &descriptors()).unwrap();
        let region = mem.alloc(DynamicScenePartHeader::region_size(8)).unwrap();

        let dynamic = DynamicScenePartHeader::build(&mut mem, Level(0), &header, region);
        assert_eq!(dynamic.parts_count(&mem), 8);
        for (a, b) in header.parts(&mem).zip(dynamic.parts(&mem)) {
            assert_eq!(a.raw(&mem), b.raw(&mem));
            assert_ne!(a.address(), b.address());
        }

        // Moving the dynamic exit leaves the template untouched.
        let exit = dynamic.part(&mem, 0).unwrap();
        let enemy = dynamic.part(&mem, 1).unwrap();
        exit.copy_from(&mut mem, &enemy);
        assert_eq!(
            header.part(&mem, 0).unwrap().exit_type(&mem),
            Some(ExitType::Right)
        );
    }

    #[test]
    fn test_activation_isolation() {
        let mut mem = Memory::new(64);
        let def = definition(&mut mem);
        let header = ScenePartsHeader::build(&mut mem, Level(0), &def, &descriptors()).unwrap();
        let region = mem.alloc(DynamicScenePartHeader::region_size(8)).unwrap();

        let first = DynamicScenePartHeader::build(&mut mem, Level(0), &header, region);
        first.mark_active(&mut mem, 2).unwrap();
        first.mark_active(&mut mem, 7).unwrap();
        assert_eq!(first.is_part_activated(&mem, 2), Ok(true));
        assert_eq!(first.is_part_activated(&mem, 3), Ok(false));
        assert_eq!(first.activated_count(&mem), 2);
        assert!(first.mark_active(&mut mem, 8).is_err());

        let second = DynamicScenePartHeader::build(&mut mem, Level(0), &header, region);
        assert_eq!(second.activated_count(&mem), 0);
        assert_eq!(second.is_part_activated(&mem, 2), Ok(false));
    }
}
