use std::fmt;

use crate::scene::{
    BlockKind, Edges, ExitType, LevelShape, PartDescriptor, PlatformKind, SceneSettings,
    ScrollStyle, SpriteKind,
};

/// Position of a level in [`LEVELS`]. This is also the order in which levels
/// are laid out in RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub u8);

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

pub struct LevelDecl {
    pub name: &'static str,
    /// Nothing destroyed before this level matters once it is reached.
    pub transition: bool,
    pub scene: SceneSettings,
    pub parts: &'static [PartDescriptor],
}

const fn horizontal(shape: LevelShape, theme: u8, begin: u8, end: u8) -> SceneSettings {
    SceneSettings {
        scroll_style: ScrollStyle::Horizontal,
        shape,
        theme,
        enemy_group: theme,
        edges: Edges::Span { begin, end },
        bg_position: [1, 2],
    }
}

const fn vertical(shape: LevelShape, theme: u8, begin: u8, end: u8) -> SceneSettings {
    SceneSettings {
        scroll_style: ScrollStyle::Vertical,
        shape,
        theme,
        enemy_group: theme,
        edges: Edges::Span { begin, end },
        bg_position: [0, 1],
    }
}

const fn room(style: ScrollStyle, shape: LevelShape, theme: u8, sides: [u8; 4]) -> SceneSettings {
    SceneSettings {
        scroll_style: style,
        shape,
        theme,
        enemy_group: theme,
        edges: Edges::Sides {
            left: sides[0],
            top: sides[1],
            right: sides[2],
            bottom: sides[3],
        },
        bg_position: [0, 0],
    }
}

const fn exit(exit_type: ExitType, offset: i8) -> PartDescriptor {
    PartDescriptor::Exit { exit_type, offset }
}

const fn sprite(kind: SpriteKind, x: u8, y: u8) -> PartDescriptor {
    PartDescriptor::Sprite { kind, x, y }
}

const fn block(kind: BlockKind, x: u8, y: u8) -> PartDescriptor {
    PartDescriptor::DynamicBlock { kind, x, y }
}

const fn platform(kind: PlatformKind, x: u8, y: u8) -> PartDescriptor {
    PartDescriptor::Platform { kind, x, y }
}

use BlockKind::{Breakable, Switch};
use ExitType::{DoorBack, DoorFront, Down, Left, Right, Up};
use LevelShape::{Enclosed, Flat, Ledges, Pit};
use PlatformKind::{Falling, Moving};
use SpriteKind::{Bomb, EnemyType1, EnemyType2};

// Static data for the game. Defines every level in the order it is laid out
// in RAM. Only ever append to this list: inserting a level moves every
// address after it.
pub const LEVELS: &[LevelDecl] = &[
    // Meadow (0)
    LevelDecl {
        name: "meadow-1",
        transition: true,
        scene: horizontal(Flat, 0, 4, 2),
        parts: &[
            exit(Right, 1),
            sprite(Bomb, 12, 11),
            sprite(EnemyType1, 22, 12),
            platform(Moving, 30, 9),
            sprite(EnemyType1, 41, 12),
        ],
    },
    LevelDecl {
        name: "meadow-2",
        transition: false,
        scene: horizontal(Pit, 0, 3, 3),
        parts: &[
            exit(Right, 1),
            sprite(EnemyType2, 33, 4),
            block(Switch, 10, 10),
            block(Breakable, 11, 10),
            block(Switch, 12, 10),
            block(Switch, 13, 10),
            block(Switch, 50, 8),
            block(Switch, 51, 8),
        ],
    },
    LevelDecl {
        name: "meadow-3",
        transition: false,
        scene: horizontal(Ledges, 0, 2, 6),
        parts: &[
            exit(Right, 1),
            exit(Left, -1),
            PartDescriptor::Turret { x: 28, y: 9 },
            sprite(Bomb, 36, 11),
            block(Breakable, 60, 12),
        ],
    },
    // Caves (3)
    LevelDecl {
        name: "cave-entrance",
        transition: true,
        scene: room(ScrollStyle::NameTable, Pit, 1, [1, 1, 1, 1]),
        parts: &[
            exit(Down, 1),
            sprite(EnemyType1, 4, 12),
            sprite(EnemyType1, 27, 12),
            block(Breakable, 15, 6),
            block(Breakable, 16, 6),
            platform(Falling, 16, 10),
        ],
    },
    LevelDecl {
        name: "cave-depths",
        transition: false,
        scene: room(ScrollStyle::NameTable, Enclosed, 1, [2, 1, 2, 2]),
        parts: &[
            exit(Up, -1),
            exit(DoorFront, 1),
            sprite(Bomb, 8, 7),
            sprite(Bomb, 23, 7),
            sprite(EnemyType2, 18, 20),
            block(Switch, 12, 11),
            block(Switch, 13, 11),
            PartDescriptor::Prefab { x: 29, y: 3 },
        ],
    },
    LevelDecl {
        name: "cave-shrine",
        transition: false,
        scene: room(ScrollStyle::None, Flat, 1, [1, 0, 1, 1]),
        parts: &[
            exit(DoorBack, -1),
            exit(Right, 1),
            block(Breakable, 7, 9),
            block(Breakable, 8, 9),
            sprite(EnemyType1, 11, 12),
        ],
    },
    // Tower (6)
    LevelDecl {
        name: "tower-base",
        transition: true,
        scene: vertical(Flat, 2, 2, 0),
        parts: &[
            exit(Up, 1),
            platform(Moving, 4, 50),
            platform(Moving, 10, 38),
            platform(Falling, 7, 25),
            sprite(EnemyType1, 3, 44),
            sprite(EnemyType2, 12, 18),
            sprite(Bomb, 8, 6),
        ],
    },
    LevelDecl {
        name: "tower-shaft",
        transition: false,
        scene: vertical(Enclosed, 2, 1, 1),
        parts: &[
            exit(Up, 1),
            exit(Down, -1),
            PartDescriptor::Turret { x: 2, y: 40 },
            PartDescriptor::Turret { x: 13, y: 22 },
            PartDescriptor::Autoscroll { x: 0, y: 63 },
            block(Breakable, 6, 30),
            block(Breakable, 7, 30),
            block(Breakable, 8, 30),
        ],
    },
    LevelDecl {
        name: "tower-top",
        transition: false,
        scene: room(ScrollStyle::None, Enclosed, 2, [1, 1, 1, 1]),
        parts: &[
            exit(DoorFront, 1),
            sprite(EnemyType2, 7, 10),
            sprite(EnemyType2, 9, 10),
        ],
    },
    // Castle (9)
    LevelDecl {
        name: "castle-gate",
        transition: true,
        scene: horizontal(Ledges, 3, 4, 4),
        parts: &[
            exit(Right, 1),
            PartDescriptor::Autoscroll { x: 0, y: 0 },
            sprite(EnemyType1, 18, 10),
            sprite(EnemyType1, 34, 10),
            sprite(EnemyType2, 52, 6),
            block(Breakable, 26, 8),
            PartDescriptor::Prefab { x: 44, y: 8 },
        ],
    },
    LevelDecl {
        name: "castle-moat",
        transition: false,
        scene: horizontal(Pit, 3, 6, 6),
        parts: &[
            exit(Right, 1),
            exit(Left, -1),
            platform(Falling, 14, 11),
            platform(Falling, 20, 11),
            platform(Moving, 38, 10),
            sprite(Bomb, 26, 4),
            block(Switch, 44, 9),
            block(Switch, 45, 9),
        ],
    },
    LevelDecl {
        name: "castle-hall",
        transition: false,
        scene: room(ScrollStyle::NameTable, Flat, 3, [0, 0, 0, 1]),
        parts: &[
            exit(Right, 1),
            exit(DoorBack, -2),
            sprite(EnemyType1, 6, 12),
            sprite(EnemyType1, 20, 12),
            sprite(EnemyType2, 28, 5),
            block(Breakable, 16, 8),
            block(Breakable, 17, 8),
            PartDescriptor::Turret { x: 31, y: 2 },
        ],
    },
    LevelDecl {
        name: "castle-keep",
        transition: false,
        scene: room(ScrollStyle::None, Enclosed, 3, [1, 2, 1, 1]),
        parts: &[
            exit(Right, 1),
            sprite(EnemyType2, 8, 11),
            sprite(Bomb, 3, 4),
            sprite(Bomb, 12, 4),
        ],
    },
    // Ending (13)
    LevelDecl {
        name: "ending",
        transition: true,
        scene: room(ScrollStyle::None, Flat, 0, [0, 0, 0, 2]),
        parts: &[PartDescriptor::Prefab { x: 7, y: 10 }],
    },
];


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_level_opens_a_window() {
        assert!(LEVELS[0].transition);
    }

    #[test]
    fn test_level_names_are_unique() {
        let mut names = LEVELS.iter().map(|l| l.name).collect::<Vec<_>>();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), LEVELS.len());
    }

    #[test]
    fn test_exits_stay_in_window() {
        // Exits may go back within a window but never behind a transition level.
        for (i, decl) in LEVELS.iter().enumerate() {
            for part in decl.parts {
                if let PartDescriptor::Exit { offset, .. } = *part {
                    let target = i as i32 + offset as i32;
                    assert!(target >= 0 && (target as usize) < LEVELS.len());
                    if offset < 0 {
                        let crossed = ((target as usize + 1)..=i).any(|l| LEVELS[l].transition);
                        assert!(!crossed, "{} exits behind a transition", decl.name);
                    }
                }
            }
        }
    }
}
