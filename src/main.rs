use std::io;
use std::process;

use clap::{App, Arg};
use log::error;

mod config;
mod error;
mod mem;
mod registry;
mod scene;
mod scenes;
mod session;

use config::{DisplaySpec, MemoryConfig};
use mem::Memory;
use registry::Registry;
use scene::{SceneDefinition, SceneSettings};
use scenes::{Level, LEVELS};
use session::Session;

struct Actions {
    restart: bool,
    exit: Option<usize>,
    switch: bool,
    map: bool,
}

fn main() {
    env_logger::init();

    let matches = App::new("sceneram")
        .version("0.1")
        .about("Lay out level content in console RAM and walk through it")
        .arg(
            Arg::with_name("level")
                .short("l")
                .long("level")
                .help("The level to enter after layout")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("ram")
                .short("r")
                .long("ram")
                .help("Size of the simulated RAM in bytes (decimal or 0x-prefixed)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("dump")
                .short("d")
                .long("dump")
                .help("Dump the level layout and a hexdump of RAM"),
        )
        .arg(
            Arg::with_name("restart")
                .long("restart")
                .help("Destroy everything in the entered level, then restart it"),
        )
        .arg(
            Arg::with_name("exit")
                .short("e")
                .long("exit")
                .help("Take exit part <n> of the entered level")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("switch")
                .short("s")
                .long("switch")
                .help("Toggle the switch blocks"),
        )
        .arg(
            Arg::with_name("map")
                .short("m")
                .long("map")
                .help("Print the ground map of each level shown"),
        )
        .get_matches();

    let level = matches
        .value_of("level")
        .unwrap_or("0")
        .parse::<u8>()
        .expect("expected integer for level option.");

    let actions = Actions {
        restart: matches.is_present("restart"),
        exit: matches
            .value_of("exit")
            .map(|e| e.parse::<usize>().expect("expected integer for exit option.")),
        switch: matches.is_present("switch"),
        map: matches.is_present("map"),
    };

    let mut config = MemoryConfig::default();
    if let Some(ram) = matches.value_of("ram") {
        let parsed = match ram.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => ram.parse::<usize>(),
        };
        config.ram_size = match parsed {
            Ok(size) if size <= mem::MAX_RAM_SIZE => size,
            _ => panic!("Invalid RAM size!"),
        };
    }

    let mut mem = Memory::new(config.ram_size);
    let registry = match Registry::build(&mut mem, LEVELS, &config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("cannot lay out levels: {}", e);
            process::exit(1);
        }
    };
    registry.show_stats(&mem);

    let mut session = match Session::new(&mut mem, registry, &config) {
        Ok(session) => session,
        Err(e) => {
            error!("cannot allocate session state: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&mut mem, &mut session, Level(level), &actions) {
        error!("{}", e);
        process::exit(1);
    }

    if matches.is_present("dump") {
        if let Some(level) = session.current_level() {
            println!("current level {}", level);
        }
        let ledger = session.ledger().destroyed_bits();
        println!(
            "ledger {} ({} bits, {} set)",
            ledger.address(),
            ledger.len(),
            ledger.count_ones(&mem)
        );

        let stdout = io::stdout();
        let mut out = stdout.lock();
        session
            .registry()
            .dump(&mem, &mut out)
            .and_then(|_| mem.dump(&mut out))
            .unwrap();
    }
}

fn run(
    mem: &mut Memory,
    session: &mut Session,
    level: Level,
    actions: &Actions,
) -> error::Result<()> {
    session.enter(mem, level)?;

    if actions.switch {
        let off = session.toggle_switch_blocks(mem);
        println!("switch blocks {}", if off { "off" } else { "on" });
    }

    if actions.restart {
        for i in 0..session.current()?.parts_count(mem) {
            session.destroy(mem, i)?;
            session.activate(mem, i)?;
        }
        print_level(mem, session, actions.map)?;
        session.restart(mem)?;
    }

    if let Some(exit) = actions.exit {
        print_level(mem, session, actions.map)?;
        let target = session.take_exit(mem, exit)?;
        if let Some((exit_type, offset)) = session.active_exit(mem) {
            println!("took {:?} exit ({:+}) to level {}", exit_type, offset, target);
        }
    }

    print_level(mem, session, actions.map)
}

fn print_level(mem: &Memory, session: &Session, map: bool) -> error::Result<()> {
    let header = session.current()?;
    let level = header.level();
    println!(
        "level {} ({}): {} parts, {} activated, scene offset {}, {} destroy bits",
        level,
        session.registry().entry(level)?.name,
        header.parts_count(mem),
        header.activated_count(mem),
        session.ledger().scene_offset(mem),
        session.ledger().scene_bits(mem)
    );

    let address = session.registry().definition(level)?.address();
    let settings = SceneDefinition::at(address).settings(mem)?;
    let display = DisplaySpec::default();
    print_settings(&settings, &display)?;
    if map {
        print_map(&settings, &display)?;
    }

    for (i, part) in header.parts(mem).enumerate() {
        let part_type = part.part_type(mem)?;
        match part.exit_level_offset(mem) {
            Some(offset) => println!("  {:3} {:?} to level {:+}", i, part_type, offset),
            None => println!(
                "  {:3} {:?} at ({}, {}){}{}",
                i,
                part_type,
                part.x(mem),
                part.y(mem),
                if session.is_destroyed(mem, i)? {
                    " destroyed"
                } else {
                    ""
                },
                if header.is_part_activated(mem, i)? {
                    " activated"
                } else {
                    ""
                }
            ),
        }
    }

    Ok(())
}

fn print_settings(settings: &SceneSettings, display: &DisplaySpec) -> error::Result<()> {
    let ground = settings.ground_tiles(display)?;
    let parallax = settings.parallax_offsets(display)?;
    println!(
        "  {:?} {:?}, theme {}, enemy group {}, {}x{} tiles ({}x{} metatiles)",
        settings.scroll_style,
        settings.shape,
        settings.theme,
        settings.enemy_group,
        settings.tile_width(display)?,
        settings.tile_height(display)?,
        settings.metatile_width(display)?,
        settings.metatile_height(display)?
    );
    println!(
        "  ground tiles {:02x}/{:02x}/{:02x}, section width {}, parallax {:?}",
        ground.fill,
        ground.corner,
        ground.side,
        settings.section_width()?,
        parallax
    );
    Ok(())
}

fn print_map(settings: &SceneSettings, display: &DisplaySpec) -> error::Result<()> {
    let width = settings.metatile_width(display)?;
    for my in 0..settings.metatile_height(display)? {
        let mut row = String::with_capacity(width as usize);
        for mx in 0..width {
            row.push(if settings.is_ground(display, mx, my)? {
                '#'
            } else {
                '.'
            });
        }
        println!("  {}", row);
    }
    Ok(())
}
