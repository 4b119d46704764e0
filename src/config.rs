/// Screen metrics the derived level queries are computed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySpec {
    /// Width of one screen, in 8x8 tiles.
    pub screen_tiles_wide: u16,
    /// Height of one screen, in 8x8 tiles.
    pub screen_tiles_high: u16,
    /// Side of a metatile, in tiles. Scene part coordinates are in metatiles.
    pub metatile_size: u16,
    /// Number of tiles each theme reserves in the background pattern table.
    pub tiles_per_theme: u8,
}

impl Default for DisplaySpec {
    fn default() -> Self {
        DisplaySpec {
            screen_tiles_wide: 32,
            screen_tiles_high: 30,
            metatile_size: 2,
            tiles_per_theme: 16,
        }
    }
}

impl DisplaySpec {
    pub fn screen_metatiles_wide(&self) -> u16 {
        self.screen_tiles_wide / self.metatile_size
    }

    pub fn screen_metatiles_high(&self) -> u16 {
        self.screen_tiles_high / self.metatile_size
    }
}

pub const DEFAULT_RAM_SIZE: usize = 0x800;
pub const LEDGER_BITS: usize = 128;

/// Simulated RAM layout settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryConfig {
    pub ram_size: usize,
    /// Size of the destroyed-parts ledger. The last usable index is
    /// `ledger_bits - 1`, which also bounds any window's running total.
    pub ledger_bits: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            ram_size: DEFAULT_RAM_SIZE,
            ledger_bits: LEDGER_BITS,
        }
    }
}

impl MemoryConfig {
    pub fn max_destroy_bits(&self) -> usize {
        self.ledger_bits - 1
    }
}
