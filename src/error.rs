use thiserror::Error;

use crate::scene::{LevelShape, ScenePartType, ScrollStyle};
use crate::scenes::Level;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("destroy-bit budget exceeded at level {level}: {bits} bits needed")]
    BudgetExceeded { level: Level, bits: usize },
    #[error("{query} not implemented for {style:?} scroll with {shape:?} shape")]
    Unsupported {
        style: ScrollStyle,
        shape: LevelShape,
        query: &'static str,
    },
    #[error("{axis} coordinate {value} out of range (max {max})")]
    CoordinateOutOfRange { axis: char, value: u8, max: u8 },
    #[error("{field} value {value} out of range (max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },
    #[error("exit level offset {0} out of range (must be within +/-1..8)")]
    ExitOffsetOutOfRange(i8),
    #[error("level {level} declares {count} parts (max 255)")]
    TooManyParts { level: Level, count: usize },
    #[error("{0:?} is an exit type; exits are built with a level offset")]
    ExitTypeAsPlacement(ScenePartType),
    #[error("destroy offset {offset} out of range (current level has {bits} destroy bits)")]
    DestroyOffsetOutOfRange { offset: u8, bits: u8 },
    #[error("invalid value {value} for {name}")]
    InvalidEnumValue { name: &'static str, value: u8 },
    #[error("{0} levels declared (max 256)")]
    TooManyLevels(usize),
    #[error("unknown level {0}")]
    UnknownLevel(Level),
    #[error("part index {index} out of range ({count} parts)")]
    PartIndexOutOfRange { index: usize, count: usize },
    #[error("part {0} is not an exit")]
    NotAnExit(usize),
    #[error("no level is currently entered")]
    NoCurrentLevel,
}
