use std::fmt;

use byteorder::{ReadBytesExt, BE};

use crate::error::{Error, Result};
use crate::mem::{Address, EnumField, Field, FieldEnum, Memory};

use super::{PositionCodec, SceneDefinition};

pub const SCENE_PART_SIZE: usize = 2;

/// Ledger offset of a part that is never tracked as destroyed.
pub const NO_DESTROY_OFFSET: u8 = 255;

/// Type tag stored in the high nibble of a scene part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScenePartType {
    Bomb = 0,
    EnemyType1 = 1,
    EnemyType2 = 2,
    BreakableBlock = 3,
    SwitchBlock = 4,
    Platform = 5,
    FallingPlatform = 6,
    Prefab = 7,
    Turret = 8,
    Autoscroll = 9,
    SideExitRight = 10,
    SideExitLeft = 11,
    SideExitUp = 12,
    SideExitDown = 13,
    DoorFront = 14,
    DoorBack = 15,
}

impl FieldEnum for ScenePartType {
    const NAME: &'static str = "ScenePartType";

    fn from_bits(bits: u8) -> Option<Self> {
        use ScenePartType::*;

        Some(match bits {
            0 => Bomb,
            1 => EnemyType1,
            2 => EnemyType2,
            3 => BreakableBlock,
            4 => SwitchBlock,
            5 => Platform,
            6 => FallingPlatform,
            7 => Prefab,
            8 => Turret,
            9 => Autoscroll,
            10 => SideExitRight,
            11 => SideExitLeft,
            12 => SideExitUp,
            13 => SideExitDown,
            14 => DoorFront,
            15 => DoorBack,
            _ => return None,
        })
    }

    fn bits(self) -> u8 {
        self as u8
    }
}

impl ScenePartType {
    /// Whether the part's destroyed state is remembered in the ledger.
    pub fn is_destructible(self) -> bool {
        use ScenePartType::*;

        match self {
            Bomb | EnemyType1 | EnemyType2 | BreakableBlock => true,
            SwitchBlock | Platform | FallingPlatform | Prefab | Turret | Autoscroll => false,
            SideExitRight | SideExitLeft | SideExitUp | SideExitDown | DoorFront | DoorBack => {
                false
            }
        }
    }

    pub fn exit_type(self) -> Option<ExitType> {
        match self {
            ScenePartType::SideExitRight => Some(ExitType::Right),
            ScenePartType::SideExitLeft => Some(ExitType::Left),
            ScenePartType::SideExitUp => Some(ExitType::Up),
            ScenePartType::SideExitDown => Some(ExitType::Down),
            ScenePartType::DoorFront => Some(ExitType::DoorFront),
            ScenePartType::DoorBack => Some(ExitType::DoorBack),
            _ => None,
        }
    }
}

/// Exit records share the type nibble with regular parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExitType {
    Right,
    Left,
    Up,
    Down,
    DoorFront,
    DoorBack,
}

impl From<ExitType> for ScenePartType {
    fn from(exit: ExitType) -> Self {
        match exit {
            ExitType::Right => ScenePartType::SideExitRight,
            ExitType::Left => ScenePartType::SideExitLeft,
            ExitType::Up => ScenePartType::SideExitUp,
            ExitType::Down => ScenePartType::SideExitDown,
            ExitType::DoorFront => ScenePartType::DoorFront,
            ExitType::DoorBack => ScenePartType::DoorBack,
        }
    }
}

/// Encode a level offset as sign-magnitude in a nibble: bit 3 is the sign and
/// bits 0-2 hold the magnitude minus one, so only +/-1..8 fit.
pub fn encode_exit_offset(offset: i8) -> Result<u8> {
    match offset {
        1..=8 => Ok((offset - 1) as u8),
        -8..=-1 => Ok((-offset - 1) as u8 | 0x8),
        _ => Err(Error::ExitOffsetOutOfRange(offset)),
    }
}

pub fn decode_exit_offset(nibble: u8) -> i8 {
    let magnitude = (nibble & 0x7) as i8 + 1;
    if nibble & 0x8 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpriteKind {
    Bomb,
    EnemyType1,
    EnemyType2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlockKind {
    Breakable,
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlatformKind {
    Moving,
    Falling,
}

/// Declarative description of one placement, encoded into a [`ScenePart`]
/// when the level is registered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PartDescriptor {
    Exit { exit_type: ExitType, offset: i8 },
    Sprite { kind: SpriteKind, x: u8, y: u8 },
    DynamicBlock { kind: BlockKind, x: u8, y: u8 },
    Platform { kind: PlatformKind, x: u8, y: u8 },
    Prefab { x: u8, y: u8 },
    Turret { x: u8, y: u8 },
    Autoscroll { x: u8, y: u8 },
}

impl PartDescriptor {
    pub fn part_type(&self) -> ScenePartType {
        match *self {
            PartDescriptor::Exit { exit_type, .. } => exit_type.into(),
            PartDescriptor::Sprite { kind, .. } => match kind {
                SpriteKind::Bomb => ScenePartType::Bomb,
                SpriteKind::EnemyType1 => ScenePartType::EnemyType1,
                SpriteKind::EnemyType2 => ScenePartType::EnemyType2,
            },
            PartDescriptor::DynamicBlock { kind, .. } => match kind {
                BlockKind::Breakable => ScenePartType::BreakableBlock,
                BlockKind::Switch => ScenePartType::SwitchBlock,
            },
            PartDescriptor::Platform { kind, .. } => match kind {
                PlatformKind::Moving => ScenePartType::Platform,
                PlatformKind::Falling => ScenePartType::FallingPlatform,
            },
            PartDescriptor::Prefab { .. } => ScenePartType::Prefab,
            PartDescriptor::Turret { .. } => ScenePartType::Turret,
            PartDescriptor::Autoscroll { .. } => ScenePartType::Autoscroll,
        }
    }

    /// Encode this placement into the next two bytes of RAM.
    pub fn encode(&self, mem: &mut Memory, def: &SceneDefinition) -> Result<ScenePart> {
        match *self {
            PartDescriptor::Exit { exit_type, offset } => {
                ScenePart::new_exit(mem, def, exit_type, offset)
            }
            PartDescriptor::Sprite { x, y, .. }
            | PartDescriptor::DynamicBlock { x, y, .. }
            | PartDescriptor::Platform { x, y, .. }
            | PartDescriptor::Prefab { x, y }
            | PartDescriptor::Turret { x, y }
            | PartDescriptor::Autoscroll { x, y } => {
                ScenePart::new(mem, def, self.part_type(), x, y)
            }
        }
    }
}

/// Two packed bytes describing one placement.
///
/// ```text
/// byte 0: x base (0-3) type (4-7)
/// byte 1: y base (0-3) x extension (4-5) y extension (6-7)
/// ```
///
/// Exit records keep the exit type in the type nibble and a sign-magnitude
/// level offset in place of the x base. The extension bits only make sense
/// through the position codec of the owning level.
#[derive(Clone, Copy)]
pub struct ScenePart {
    addr: Address,
    codec: &'static dyn PositionCodec,
}

impl fmt::Debug for ScenePart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ScenePart({}, {:?})", self.addr, self.codec.style())
    }
}

impl ScenePart {
    /// Encode a placement of `part_type` at `(x, y)`.
    pub fn new(
        mem: &mut Memory,
        def: &SceneDefinition,
        part_type: ScenePartType,
        x: u8,
        y: u8,
    ) -> Result<ScenePart> {
        if part_type.exit_type().is_some() {
            return Err(Error::ExitTypeAsPlacement(part_type));
        }
        let codec = def.codec(mem)?;
        let (x_base, y_base, ext) = codec.encode(x, y)?;

        let part = ScenePart {
            addr: mem.alloc(SCENE_PART_SIZE)?,
            codec,
        };
        part.type_field().set(mem, part_type);
        part.x_base_field().set(mem, x_base);
        part.y_base_field().set(mem, y_base);
        part.ext_field().set(mem, ext);

        Ok(part)
    }

    pub fn new_exit(
        mem: &mut Memory,
        def: &SceneDefinition,
        exit_type: ExitType,
        offset: i8,
    ) -> Result<ScenePart> {
        let nibble = encode_exit_offset(offset)?;
        let part = ScenePart {
            addr: mem.alloc(SCENE_PART_SIZE)?,
            codec: def.codec(mem)?,
        };
        part.type_field().set(mem, exit_type.into());
        part.x_base_field().set(mem, nibble);

        Ok(part)
    }

    /// View of a record encoded earlier at `addr`.
    pub fn at(addr: Address, codec: &'static dyn PositionCodec) -> ScenePart {
        ScenePart { addr, codec }
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    pub fn codec(&self) -> &'static dyn PositionCodec {
        self.codec
    }

    fn type_field(&self) -> EnumField<ScenePartType> {
        EnumField::new(Field::new(self.addr, 4, 4))
    }

    fn x_base_field(&self) -> Field {
        Field::new(self.addr, 4, 0)
    }

    fn y_base_field(&self) -> Field {
        Field::new(self.addr.offset(1), 4, 0)
    }

    fn ext_field(&self) -> Field {
        Field::new(self.addr.offset(1), 4, 4)
    }

    pub fn part_type(&self, mem: &Memory) -> Result<ScenePartType> {
        self.type_field().get(mem)
    }

    pub fn x(&self, mem: &Memory) -> u8 {
        self.codec
            .x(self.x_base_field().get(mem), self.ext_field().get(mem))
    }

    pub fn y(&self, mem: &Memory) -> u8 {
        self.codec
            .y(self.y_base_field().get(mem), self.ext_field().get(mem))
    }

    pub fn exit_type(&self, mem: &Memory) -> Option<ExitType> {
        self.part_type(mem).ok().and_then(ScenePartType::exit_type)
    }

    /// Level offset of an exit record, `None` for any other part.
    pub fn exit_level_offset(&self, mem: &Memory) -> Option<i8> {
        self.exit_type(mem)
            .map(|_| decode_exit_offset(self.x_base_field().get(mem)))
    }

    pub fn is_destructible(&self, mem: &Memory) -> bool {
        self.part_type(mem)
            .map(ScenePartType::is_destructible)
            .unwrap_or(false)
    }

    /// Overwrite this whole record with `src`. Parts are only ever moved as
    /// complete records, never field by field.
    pub fn copy_from(&self, mem: &mut Memory, src: &ScenePart) {
        mem.copy(src.addr, self.addr, SCENE_PART_SIZE);
    }

    /// The two bytes as a big-endian integer.
    pub fn raw(&self, mem: &Memory) -> u16 {
        mem.bytes(self.addr, SCENE_PART_SIZE)
            .read_u16::<BE>()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::scene::{Edges, LevelShape, SceneSettings, ScrollStyle};

    fn definition(mem: &mut Memory, scroll_style: ScrollStyle) -> SceneDefinition {
        let edges = if scroll_style.uses_span_edges() {
            Edges::Span { begin: 2, end: 2 }
        } else {
            Edges::Sides {
                left: 1,
                top: 0,
                right: 1,
                bottom: 1,
            }
        };
        let settings = SceneSettings {
            scroll_style,
            shape: LevelShape::Flat,
            theme: 0,
            enemy_group: 0,
            edges,
            bg_position: [0, 0],
        };
        SceneDefinition::new(mem, &settings).unwrap()
    }

    fn style() -> impl Strategy<Value = ScrollStyle> {
        prop_oneof![
            Just(ScrollStyle::None),
            Just(ScrollStyle::NameTable),
            Just(ScrollStyle::Horizontal),
            Just(ScrollStyle::Vertical),
        ]
    }

    fn placement_type() -> impl Strategy<Value = ScenePartType> {
        (0u8..10).prop_map(|bits| ScenePartType::from_bits(bits).unwrap())
    }

    /// A style with a position it can represent.
    fn style_and_position() -> impl Strategy<Value = (ScrollStyle, u8, u8)> {
        style().prop_flat_map(|style| {
            let codec = style.codec();
            (Just(style), 0..=codec.max_x(), 0..=codec.max_y())
        })
    }

    proptest! {
        #[test]
        fn prop_position_round_trip(
            (style, x, y) in style_and_position(),
            part_type in placement_type(),
        ) {
            let mut mem = Memory::new(8);
            let def = definition(&mut mem, style);
            let part = ScenePart::new(&mut mem, &def, part_type, x, y).unwrap();

            let view = ScenePart::at(part.address(), def.codec(&mem).unwrap());
            prop_assert_eq!(view.part_type(&mem), Ok(part_type));
            prop_assert_eq!(view.x(&mem), x);
            prop_assert_eq!(view.y(&mem), y);
            prop_assert_eq!(view.exit_type(&mem), None);
        }
    }

    #[test]
    fn test_exit_offset_round_trip() {
        for offset in (-8i8..=-1).chain(1..=8) {
            let nibble = encode_exit_offset(offset).unwrap();
            assert!(nibble < 16);
            assert_eq!(decode_exit_offset(nibble), offset);
        }
        assert_eq!(encode_exit_offset(1), Ok(0));
        assert_eq!(encode_exit_offset(-1), Ok(8));
        assert_eq!(encode_exit_offset(-8), Ok(15));
    }

    #[test]
    fn test_exit_offset_out_of_range() {
        for offset in [0i8, 9, -9, i8::MIN, i8::MAX].iter() {
            assert_eq!(
                encode_exit_offset(*offset),
                Err(Error::ExitOffsetOutOfRange(*offset))
            );
        }
    }

    #[test]
    fn test_exit_record() {
        let mut mem = Memory::new(8);
        let def = definition(&mut mem, ScrollStyle::Horizontal);
        let exit = ScenePart::new_exit(&mut mem, &def, ExitType::Left, -3).unwrap();

        assert_eq!(exit.raw(&mem), 0xba00);
        assert_eq!(exit.part_type(&mem), Ok(ScenePartType::SideExitLeft));
        assert_eq!(exit.exit_type(&mem), Some(ExitType::Left));
        assert_eq!(exit.exit_level_offset(&mem), Some(-3));
        assert!(!exit.is_destructible(&mem));

        assert!(ScenePart::new_exit(&mut mem, &def, ExitType::Up, 0).is_err());
    }

    #[test]
    fn test_horizontal_x_40() {
        let mut mem = Memory::new(8);
        let def = definition(&mut mem, ScrollStyle::Horizontal);
        let part = ScenePart::new(&mut mem, &def, ScenePartType::Bomb, 40, 7).unwrap();

        // x base 8, type 0 / y base 7, x multiplier 2
        assert_eq!(part.raw(&mem), 0x0827);
        assert_eq!(part.x(&mem), 40);
        assert_eq!(part.y(&mem), 7);
        assert!(part.is_destructible(&mem));
    }

    #[test]
    fn test_rejects_invalid_placements() {
        let mut mem = Memory::new(8);
        let def = definition(&mut mem, ScrollStyle::Vertical);
        let used = mem.used();

        assert_eq!(
            ScenePart::new(&mut mem, &def, ScenePartType::Turret, 16, 0).unwrap_err(),
            Error::CoordinateOutOfRange {
                axis: 'x',
                value: 16,
                max: 15
            }
        );
        assert_eq!(
            ScenePart::new(&mut mem, &def, ScenePartType::DoorFront, 1, 1).unwrap_err(),
            Error::ExitTypeAsPlacement(ScenePartType::DoorFront)
        );
        assert_eq!(mem.used(), used);
    }

    #[test]
    fn test_copy_whole_record() {
        let mut mem = Memory::new(16);
        let def = definition(&mut mem, ScrollStyle::NameTable);
        let src = ScenePart::new(&mut mem, &def, ScenePartType::Platform, 20, 17).unwrap();
        let dst = ScenePart::new_exit(&mut mem, &def, ExitType::DoorBack, 2).unwrap();

        dst.copy_from(&mut mem, &src);
        assert_eq!(dst.raw(&mem), src.raw(&mem));
        assert_eq!(dst.part_type(&mem), Ok(ScenePartType::Platform));
        assert_eq!((dst.x(&mem), dst.y(&mem)), (20, 17));
        assert_eq!(dst.exit_level_offset(&mem), None);
    }

    #[test]
    fn test_descriptor_types() {
        let blocks = PartDescriptor::DynamicBlock {
            kind: BlockKind::Breakable,
            x: 0,
            y: 0,
        };
        assert_eq!(blocks.part_type(), ScenePartType::BreakableBlock);
        assert!(blocks.part_type().is_destructible());

        let exit = PartDescriptor::Exit {
            exit_type: ExitType::Down,
            offset: 1,
        };
        assert_eq!(exit.part_type(), ScenePartType::SideExitDown);
        assert!(!exit.part_type().is_destructible());
    }
}
