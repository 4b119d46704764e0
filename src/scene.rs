//! Level content descriptors packed into simulated RAM.

mod codec;
mod definition;
mod destroyed;
mod header;
mod part;

pub use codec::*;
pub use definition::*;
pub use destroyed::*;
pub use header::*;
pub use part::*;

use crate::error::Error;
use crate::mem::FieldEnum;

/// How the viewport follows the player through a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrollStyle {
    /// Single screen.
    None = 0,
    /// Two screens side by side, swapped as a whole name table.
    NameTable = 1,
    Horizontal = 2,
    Vertical = 3,
}

impl FieldEnum for ScrollStyle {
    const NAME: &'static str = "ScrollStyle";

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(ScrollStyle::None),
            1 => Some(ScrollStyle::NameTable),
            2 => Some(ScrollStyle::Horizontal),
            3 => Some(ScrollStyle::Vertical),
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        self as u8
    }
}

impl ScrollStyle {
    /// Position codec used by every scene part of a level with this style.
    pub fn codec(self) -> &'static dyn PositionCodec {
        match self {
            ScrollStyle::None => &FixedCodec,
            ScrollStyle::NameTable => &NameTableCodec,
            ScrollStyle::Horizontal => &HorizontalCodec,
            ScrollStyle::Vertical => &VerticalCodec,
        }
    }

    /// Whether edge sizes are stored as begin/end along the scroll axis rather
    /// than as the four sides of a room.
    pub fn uses_span_edges(self) -> bool {
        match self {
            ScrollStyle::None | ScrollStyle::NameTable => false,
            ScrollStyle::Horizontal | ScrollStyle::Vertical => true,
        }
    }
}

/// Ground profile of a level. What each shape looks like depends on the
/// scroll style, and not every style supports every shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelShape {
    Flat = 0,
    Pit = 1,
    Ledges = 2,
    Enclosed = 3,
}

impl FieldEnum for LevelShape {
    const NAME: &'static str = "LevelShape";

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(LevelShape::Flat),
            1 => Some(LevelShape::Pit),
            2 => Some(LevelShape::Ledges),
            3 => Some(LevelShape::Enclosed),
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        self as u8
    }
}

fn check_range(field: &'static str, value: u8, max: u8) -> Result<u8, Error> {
    if value > max {
        return Err(Error::FieldOutOfRange { field, value, max });
    }
    Ok(value)
}
