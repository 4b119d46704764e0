use crate::error::{Error, Result};

use super::ScrollStyle;

/// Maps a placement's coordinates to the base nibbles and the 4 extension bits
/// of a scene part record, and back.
///
/// The extension nibble is split in two: bits 0-1 extend X, bits 2-3 extend Y.
/// Which of those bits are meaningful is up to each scroll style.
pub trait PositionCodec: Sync {
    fn style(&self) -> ScrollStyle;

    fn max_x(&self) -> u8;
    fn max_y(&self) -> u8;

    /// Extension bits for an in-range position.
    fn extension(&self, x: u8, y: u8) -> u8;

    fn x(&self, base: u8, ext: u8) -> u8;
    fn y(&self, base: u8, ext: u8) -> u8;

    /// Split `(x, y)` into `(x_base, y_base, ext)`, rejecting positions the
    /// style cannot represent.
    fn encode(&self, x: u8, y: u8) -> Result<(u8, u8, u8)> {
        if x > self.max_x() {
            return Err(Error::CoordinateOutOfRange {
                axis: 'x',
                value: x,
                max: self.max_x(),
            });
        }
        if y > self.max_y() {
            return Err(Error::CoordinateOutOfRange {
                axis: 'y',
                value: y,
                max: self.max_y(),
            });
        }
        Ok((x & 0xf, y & 0xf, self.extension(x, y)))
    }
}

const X_EXT_MASK: u8 = 0b0011;
const Y_EXT_SHIFT: u8 = 2;

/// Single screen: no extension.
pub struct FixedCodec;

impl PositionCodec for FixedCodec {
    fn style(&self) -> ScrollStyle {
        ScrollStyle::None
    }

    fn max_x(&self) -> u8 {
        15
    }

    fn max_y(&self) -> u8 {
        15
    }

    fn extension(&self, _x: u8, _y: u8) -> u8 {
        0
    }

    fn x(&self, base: u8, _ext: u8) -> u8 {
        base
    }

    fn y(&self, base: u8, _ext: u8) -> u8 {
        base
    }
}

/// One "+16" flag per axis.
pub struct NameTableCodec;

impl PositionCodec for NameTableCodec {
    fn style(&self) -> ScrollStyle {
        ScrollStyle::NameTable
    }

    fn max_x(&self) -> u8 {
        31
    }

    fn max_y(&self) -> u8 {
        31
    }

    fn extension(&self, x: u8, y: u8) -> u8 {
        (x >= 16) as u8 | ((y >= 16) as u8) << Y_EXT_SHIFT
    }

    fn x(&self, base: u8, ext: u8) -> u8 {
        base + 16 * (ext & 1)
    }

    fn y(&self, base: u8, ext: u8) -> u8 {
        base + 16 * ((ext >> Y_EXT_SHIFT) & 1)
    }
}

/// 2-bit multiplier of 16 on X.
pub struct HorizontalCodec;

impl PositionCodec for HorizontalCodec {
    fn style(&self) -> ScrollStyle {
        ScrollStyle::Horizontal
    }

    fn max_x(&self) -> u8 {
        63
    }

    fn max_y(&self) -> u8 {
        15
    }

    fn extension(&self, x: u8, _y: u8) -> u8 {
        x >> 4
    }

    fn x(&self, base: u8, ext: u8) -> u8 {
        base + 16 * (ext & X_EXT_MASK)
    }

    fn y(&self, base: u8, _ext: u8) -> u8 {
        base
    }
}

/// 2-bit multiplier of 16 on Y.
pub struct VerticalCodec;

impl PositionCodec for VerticalCodec {
    fn style(&self) -> ScrollStyle {
        ScrollStyle::Vertical
    }

    fn max_x(&self) -> u8 {
        15
    }

    fn max_y(&self) -> u8 {
        63
    }

    fn extension(&self, _x: u8, y: u8) -> u8 {
        (y >> 4) << Y_EXT_SHIFT
    }

    fn x(&self, base: u8, _ext: u8) -> u8 {
        base
    }

    fn y(&self, base: u8, ext: u8) -> u8 {
        base + 16 * ((ext >> Y_EXT_SHIFT) & X_EXT_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: [ScrollStyle; 4] = [
        ScrollStyle::None,
        ScrollStyle::NameTable,
        ScrollStyle::Horizontal,
        ScrollStyle::Vertical,
    ];

    #[test]
    fn test_codec_matches_style() {
        for style in STYLES.iter() {
            assert_eq!(style.codec().style(), *style);
        }
    }

    #[test]
    fn test_horizontal_x_40() {
        let codec = ScrollStyle::Horizontal.codec();
        let (x_base, _, ext) = codec.encode(40, 3).unwrap();
        assert_eq!(x_base, 8);
        assert_eq!(ext, 2);
        assert_eq!(codec.x(x_base, ext), 40);
    }

    #[test]
    fn test_nametable_flags() {
        let codec = ScrollStyle::NameTable.codec();
        assert_eq!(codec.encode(17, 20).unwrap(), (1, 4, 0b0101));
        assert_eq!(codec.encode(15, 15).unwrap(), (15, 15, 0));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            ScrollStyle::None.codec().encode(16, 0),
            Err(Error::CoordinateOutOfRange {
                axis: 'x',
                value: 16,
                max: 15
            })
        );
        assert_eq!(
            ScrollStyle::Horizontal.codec().encode(63, 16),
            Err(Error::CoordinateOutOfRange {
                axis: 'y',
                value: 16,
                max: 15
            })
        );
        assert!(ScrollStyle::Vertical.codec().encode(15, 64).is_err());
        assert!(ScrollStyle::NameTable.codec().encode(32, 0).is_err());
    }
}
