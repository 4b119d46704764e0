use byteorder::{ReadBytesExt, BE};
use log::debug;

use crate::config::DisplaySpec;
use crate::error::{Error, Result};
use crate::mem::{Address, EnumField, Field, Memory};

use super::{check_range, LevelShape, PositionCodec, ScrollStyle};

pub const SCENE_DEFINITION_SIZE: usize = 3;

/// Thickness of the solid border around a level, in metatiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edges {
    /// Room-like levels (no scroll, name table scroll): 0..=3 per side.
    Sides {
        left: u8,
        top: u8,
        right: u8,
        bottom: u8,
    },
    /// Scrolling levels: 0..=15 at the start and the end of the scroll axis.
    Span { begin: u8, end: u8 },
}

/// Unpacked form of a [`SceneDefinition`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSettings {
    pub scroll_style: ScrollStyle,
    pub shape: LevelShape,
    pub theme: u8,
    pub enemy_group: u8,
    pub edges: Edges,
    /// Background layer positions (top, bottom), 0..=3 each.
    pub bg_position: [u8; 2],
}

/// Tile indices used to draw the ground of a level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundTiles {
    pub fill: u8,
    pub corner: u8,
    pub side: u8,
}

impl SceneSettings {
    fn unsupported(&self, query: &'static str) -> Error {
        Error::Unsupported {
            style: self.scroll_style,
            shape: self.shape,
            query,
        }
    }

    /// Size of the level, in screens.
    pub fn screens(&self) -> Result<(u16, u16)> {
        use LevelShape::*;

        match (self.scroll_style, self.shape) {
            (ScrollStyle::None, Flat) | (ScrollStyle::None, Enclosed) => Ok((1, 1)),
            (ScrollStyle::NameTable, Flat)
            | (ScrollStyle::NameTable, Pit)
            | (ScrollStyle::NameTable, Enclosed) => Ok((2, 1)),
            (ScrollStyle::Horizontal, Flat)
            | (ScrollStyle::Horizontal, Pit)
            | (ScrollStyle::Horizontal, Ledges) => Ok((4, 1)),
            (ScrollStyle::Vertical, Flat) | (ScrollStyle::Vertical, Enclosed) => Ok((1, 4)),
            _ => Err(self.unsupported("level size")),
        }
    }

    pub fn tile_width(&self, display: &DisplaySpec) -> Result<u16> {
        Ok(self.screens()?.0 * display.screen_tiles_wide)
    }

    pub fn tile_height(&self, display: &DisplaySpec) -> Result<u16> {
        Ok(self.screens()?.1 * display.screen_tiles_high)
    }

    pub fn metatile_width(&self, display: &DisplaySpec) -> Result<u16> {
        Ok(self.screens()?.0 * display.screen_metatiles_wide())
    }

    pub fn metatile_height(&self, display: &DisplaySpec) -> Result<u16> {
        Ok(self.screens()?.1 * display.screen_metatiles_high())
    }

    pub fn ground_tiles(&self, display: &DisplaySpec) -> Result<GroundTiles> {
        use LevelShape::*;

        let (fill, corner, side) = match (self.scroll_style, self.shape) {
            (ScrollStyle::None, Flat)
            | (ScrollStyle::NameTable, Flat)
            | (ScrollStyle::Horizontal, Flat) => (0, 1, 2),
            (ScrollStyle::NameTable, Pit) | (ScrollStyle::Horizontal, Pit) => (0, 3, 4),
            (ScrollStyle::Horizontal, Ledges) => (5, 6, 7),
            (ScrollStyle::None, Enclosed)
            | (ScrollStyle::NameTable, Enclosed)
            | (ScrollStyle::Vertical, Enclosed) => (8, 9, 10),
            (ScrollStyle::Vertical, Flat) => (11, 12, 13),
            _ => return Err(self.unsupported("ground tiles")),
        };
        let base = self.theme * display.tiles_per_theme;

        Ok(GroundTiles {
            fill: base + fill,
            corner: base + corner,
            side: base + side,
        })
    }

    /// Width in metatiles of the repeating ground variation (pits, ledges).
    /// Zero for shapes without variation.
    pub fn section_width(&self) -> Result<u8> {
        use LevelShape::*;

        match (self.scroll_style, self.shape) {
            (ScrollStyle::None, Flat)
            | (ScrollStyle::None, Enclosed)
            | (ScrollStyle::NameTable, Flat)
            | (ScrollStyle::NameTable, Enclosed)
            | (ScrollStyle::Horizontal, Flat)
            | (ScrollStyle::Vertical, Flat)
            | (ScrollStyle::Vertical, Enclosed) => Ok(0),
            (ScrollStyle::NameTable, Pit) => Ok(4),
            (ScrollStyle::Horizontal, Pit) => Ok(6),
            (ScrollStyle::Horizontal, Ledges) => Ok(4),
            _ => Err(self.unsupported("section width")),
        }
    }

    /// Whether the metatile at `(mx, my)` is solid ground.
    pub fn is_ground(&self, display: &DisplaySpec, mx: u16, my: u16) -> Result<bool> {
        use LevelShape::*;

        let w = self.metatile_width(display)?;
        let h = self.metatile_height(display)?;
        let section = self.section_width()? as u16;

        let ground = match (self.edges, self.scroll_style, self.shape) {
            (
                Edges::Sides {
                    left,
                    top,
                    right,
                    bottom,
                },
                ScrollStyle::None,
                _,
            )
            | (
                Edges::Sides {
                    left,
                    top,
                    right,
                    bottom,
                },
                ScrollStyle::NameTable,
                _,
            ) => {
                let min = if self.shape == Enclosed { 1 } else { 0 };
                let (left, top, right) = (
                    (left as u16).max(min),
                    (top as u16).max(min),
                    (right as u16).max(min),
                );
                let floor = my >= h - (bottom as u16).max(1);
                let from_center = (mx as i32 - (w / 2) as i32).abs();
                let pit = self.shape == Pit && from_center < (section / 2) as i32;

                mx < left || mx >= w - right || my < top || (floor && !pit)
            }
            (Edges::Span { begin, end }, ScrollStyle::Horizontal, shape) => {
                let platform = mx < begin as u16 || mx >= w - end as u16;
                let odd_section = section != 0 && (mx / section) % 2 == 1;
                match shape {
                    Flat => my >= h - 2,
                    Pit => my >= h - 2 && (platform || !odd_section),
                    Ledges if platform => my >= h - 2,
                    Ledges if odd_section => my >= h - 1,
                    Ledges => my >= h - 3,
                    Enclosed => return Err(self.unsupported("ground")),
                }
            }
            (Edges::Span { begin, end }, ScrollStyle::Vertical, shape) => {
                let wall = match shape {
                    Flat => 1,
                    Enclosed => 2,
                    Pit | Ledges => return Err(self.unsupported("ground")),
                };
                mx < wall || mx >= w - wall || my >= h - (begin as u16).max(1) || my < end as u16
            }
            _ => return Err(self.unsupported("ground")),
        };

        Ok(ground)
    }

    /// First tile row (column for vertical levels) of each parallax layer.
    pub fn parallax_offsets(&self, display: &DisplaySpec) -> Result<[u16; 2]> {
        // Only supported shapes get a background.
        self.screens()?;

        let [top, bottom] = self.bg_position;
        let span = match self.scroll_style {
            ScrollStyle::None | ScrollStyle::NameTable | ScrollStyle::Horizontal => {
                display.screen_tiles_high
            }
            ScrollStyle::Vertical => display.screen_tiles_wide,
        };

        Ok([top as u16 * 2, span / 2 + bottom as u16 * 2])
    }
}

/// Three packed bytes describing one level.
///
/// ```text
/// byte 0: style (0-1) shape (2-3) bg top (4-5) bg bottom (6-7)
/// byte 1: theme (0-3) enemy group (4-7)
/// byte 2: left (0-1) top (2-3) right (4-5) bottom (6-7)
///         or begin (0-3) end (4-7) for scrolling styles
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneDefinition {
    addr: Address,
}

impl SceneDefinition {
    /// Validate and encode `settings` into a freshly allocated slot.
    pub fn new(mem: &mut Memory, settings: &SceneSettings) -> Result<SceneDefinition> {
        let style = settings.scroll_style;
        settings.screens()?;
        check_range("theme", settings.theme, 0xf)?;
        check_range("enemy group", settings.enemy_group, 0xf)?;
        check_range("background position", settings.bg_position[0], 3)?;
        check_range("background position", settings.bg_position[1], 3)?;
        match settings.edges {
            Edges::Sides {
                left,
                top,
                right,
                bottom,
            } if !style.uses_span_edges() => {
                for edge in [left, top, right, bottom].iter() {
                    check_range("edge size", *edge, 3)?;
                }
            }
            Edges::Span { begin, end } if style.uses_span_edges() => {
                check_range("edge size", begin, 0xf)?;
                check_range("edge size", end, 0xf)?;
            }
            _ => return Err(settings.unsupported("edge layout")),
        }

        let def = SceneDefinition {
            addr: mem.alloc(SCENE_DEFINITION_SIZE)?,
        };
        def.style_field().set(mem, style);
        def.shape_field().set(mem, settings.shape);
        def.bg_field(0).set(mem, settings.bg_position[0]);
        def.bg_field(1).set(mem, settings.bg_position[1]);
        def.theme_field().set(mem, settings.theme);
        def.enemy_group_field().set(mem, settings.enemy_group);
        match settings.edges {
            Edges::Sides {
                left,
                top,
                right,
                bottom,
            } => {
                for (i, edge) in [left, top, right, bottom].iter().enumerate() {
                    def.side_field(i).set(mem, *edge);
                }
            }
            Edges::Span { begin, end } => {
                def.span_field(0).set(mem, begin);
                def.span_field(1).set(mem, end);
            }
        }

        debug!("scene definition at {}: {:06x}", def.addr, def.raw(mem));

        Ok(def)
    }

    /// Read-only view of a definition encoded earlier at `addr`.
    pub fn at(addr: Address) -> SceneDefinition {
        SceneDefinition { addr }
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    fn style_field(&self) -> EnumField<ScrollStyle> {
        EnumField::new(Field::new(self.addr, 2, 0))
    }

    fn shape_field(&self) -> EnumField<LevelShape> {
        EnumField::new(Field::new(self.addr, 2, 2))
    }

    fn bg_field(&self, layer: usize) -> Field {
        Field::new(self.addr, 2, 4 + 2 * layer as u8)
    }

    fn theme_field(&self) -> Field {
        Field::new(self.addr.offset(1), 4, 0)
    }

    fn enemy_group_field(&self) -> Field {
        Field::new(self.addr.offset(1), 4, 4)
    }

    // left, top, right, bottom
    fn side_field(&self, side: usize) -> Field {
        Field::new(self.addr.offset(2), 2, 2 * side as u8)
    }

    // begin, end
    fn span_field(&self, end: usize) -> Field {
        Field::new(self.addr.offset(2), 4, 4 * end as u8)
    }

    pub fn scroll_style(&self, mem: &Memory) -> Result<ScrollStyle> {
        self.style_field().get(mem)
    }

    pub fn shape(&self, mem: &Memory) -> Result<LevelShape> {
        self.shape_field().get(mem)
    }

    pub fn theme(&self, mem: &Memory) -> u8 {
        self.theme_field().get(mem)
    }

    pub fn enemy_group(&self, mem: &Memory) -> u8 {
        self.enemy_group_field().get(mem)
    }

    pub fn codec(&self, mem: &Memory) -> Result<&'static dyn PositionCodec> {
        Ok(self.scroll_style(mem)?.codec())
    }

    pub fn settings(&self, mem: &Memory) -> Result<SceneSettings> {
        let scroll_style = self.scroll_style(mem)?;
        let edges = if scroll_style.uses_span_edges() {
            Edges::Span {
                begin: self.span_field(0).get(mem),
                end: self.span_field(1).get(mem),
            }
        } else {
            Edges::Sides {
                left: self.side_field(0).get(mem),
                top: self.side_field(1).get(mem),
                right: self.side_field(2).get(mem),
                bottom: self.side_field(3).get(mem),
            }
        };

        Ok(SceneSettings {
            scroll_style,
            shape: self.shape(mem)?,
            theme: self.theme(mem),
            enemy_group: self.enemy_group(mem),
            edges,
            bg_position: [self.bg_field(0).get(mem), self.bg_field(1).get(mem)],
        })
    }

    /// The three bytes as a big-endian integer.
    pub fn raw(&self, mem: &Memory) -> u32 {
        mem.bytes(self.addr, SCENE_DEFINITION_SIZE)
            .read_u24::<BE>()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal() -> SceneSettings {
        SceneSettings {
            scroll_style: ScrollStyle::Horizontal,
            shape: LevelShape::Ledges,
            theme: 2,
            enemy_group: 5,
            edges: Edges::Span { begin: 3, end: 12 },
            bg_position: [1, 3],
        }
    }

    fn room() -> SceneSettings {
        SceneSettings {
            scroll_style: ScrollStyle::None,
            shape: LevelShape::Enclosed,
            theme: 0xf,
            enemy_group: 0,
            edges: Edges::Sides {
                left: 1,
                top: 2,
                right: 3,
                bottom: 0,
            },
            bg_position: [0, 0],
        }
    }

    #[test]
    fn test_encode_layout() {
        let mut mem = Memory::new(16);
        let def = SceneDefinition::new(&mut mem, &horizontal()).unwrap();
        assert_eq!(def.address(), Address(0));
        // style 2, shape 2, bg 1 and 3 / theme 2, group 5 / begin 3, end 12
        assert_eq!(mem.bytes(def.address(), 3), &[0b1101_1010, 0x52, 0xc3]);
        assert_eq!(def.raw(&mem), 0xda52c3);

        let def = SceneDefinition::new(&mut mem, &room()).unwrap();
        assert_eq!(def.address(), Address(3));
        assert_eq!(mem.read(def.address().offset(2)), 0b00_11_10_01);
    }

    #[test]
    fn test_settings_round_trip() {
        let mut mem = Memory::new(16);
        for settings in [horizontal(), room()].iter() {
            let def = SceneDefinition::new(&mut mem, settings).unwrap();
            assert_eq!(SceneDefinition::at(def.address()).settings(&mem), Ok(*settings));
        }
    }

    #[test]
    fn test_rejects_bad_settings() {
        let mut mem = Memory::new(16);

        let mut settings = horizontal();
        settings.shape = LevelShape::Enclosed;
        assert_eq!(
            SceneDefinition::new(&mut mem, &settings),
            Err(Error::Unsupported {
                style: ScrollStyle::Horizontal,
                shape: LevelShape::Enclosed,
                query: "level size"
            })
        );

        let mut settings = horizontal();
        settings.edges = room().edges;
        assert!(matches!(
            SceneDefinition::new(&mut mem, &settings),
            Err(Error::Unsupported {
                query: "edge layout",
                ..
            })
        ));

        let mut settings = room();
        settings.edges = Edges::Sides {
            left: 4,
            top: 0,
            right: 0,
            bottom: 0,
        };
        assert_eq!(
            SceneDefinition::new(&mut mem, &settings),
            Err(Error::FieldOutOfRange {
                field: "edge size",
                value: 4,
                max: 3
            })
        );

        // Nothing was allocated for the rejected definitions.
        assert_eq!(mem.used(), 0);
    }

    #[test]
    fn test_derived_sizes() {
        let display = DisplaySpec::default();
        let settings = horizontal();
        assert_eq!(settings.tile_width(&display), Ok(128));
        assert_eq!(settings.tile_height(&display), Ok(30));
        assert_eq!(settings.metatile_width(&display), Ok(64));

        let mut vertical = room();
        vertical.scroll_style = ScrollStyle::Vertical;
        vertical.edges = Edges::Span { begin: 2, end: 0 };
        assert_eq!(vertical.tile_width(&display), Ok(32));
        assert_eq!(vertical.tile_height(&display), Ok(120));
        assert_eq!(vertical.parallax_offsets(&display), Ok([0, 16]));

        let mut pit_room = room();
        pit_room.shape = LevelShape::Pit;
        assert!(pit_room.tile_width(&display).is_err());
        assert!(pit_room.section_width().is_err());
        assert!(pit_room.parallax_offsets(&display).is_err());
    }

    #[test]
    fn test_ground_tiles() {
        let display = DisplaySpec::default();
        assert_eq!(
            horizontal().ground_tiles(&display),
            Ok(GroundTiles {
                fill: 37,
                corner: 38,
                side: 39
            })
        );
        assert_eq!(horizontal().parallax_offsets(&display), Ok([2, 21]));
    }

    #[test]
    fn test_is_ground() {
        let display = DisplaySpec::default();

        // 16x15 metatiles, walls 1 left, 2 top, 3 right, 1 floor row.
        let settings = room();
        assert_eq!(settings.is_ground(&display, 0, 5), Ok(true));
        assert_eq!(settings.is_ground(&display, 1, 5), Ok(false));
        assert_eq!(settings.is_ground(&display, 5, 1), Ok(true));
        assert_eq!(settings.is_ground(&display, 5, 13), Ok(false));
        assert_eq!(settings.is_ground(&display, 5, 14), Ok(true));
        assert_eq!(settings.is_ground(&display, 13, 5), Ok(true));

        // 64x15 metatiles, ledges every 4 metatiles after a 3-wide start.
        let settings = horizontal();
        assert_eq!(settings.is_ground(&display, 1, 13), Ok(true));
        assert_eq!(settings.is_ground(&display, 4, 13), Ok(false));
        assert_eq!(settings.is_ground(&display, 4, 14), Ok(true));
        assert_eq!(settings.is_ground(&display, 8, 12), Ok(true));
        assert_eq!(settings.is_ground(&display, 8, 11), Ok(false));
    }
}
