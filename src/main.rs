use clap::{arg, command, value_parser, ArgAction};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chip8::compat::{CompatDb, Quirks};
use chip8::display::MonoTermDisplay;
use chip8::environment::Environment;
use chip8::framebuffer::{CHIP8_SCREEN_HEIGHT, CHIP8_SCREEN_WIDTH};
use chip8::input::StdinInput;
use chip8::interpreter::{Chip8Interpreter, DEFAULT_INSTRUCTIONS_PER_TICK};
use chip8::sound::{Mute, SimpleBeep, Sound};

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    // stderr shares the terminal with the display, so prefer a file
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let rom_arg = arg!(<rom> "The CHIP-8 program image to run").value_parser(value_parser!(PathBuf));
    let speed_arg = arg!(-s --speed <SPEED> "How many instructions run per frame (1-120)")
        .value_parser(value_parser!(u32))
        .default_value("10");
    let quirks_arg = arg!(-q --quirks <FILE> "JSON file of extra titles and their quirks")
        .value_parser(value_parser!(PathBuf));
    let wrap_arg = arg!(--wrap "Always wrap sprites at the screen edges").action(ArgAction::SetTrue);
    let keep_index_arg =
        arg!(--"keep-index" "Never advance I on FX55/FX65").action(ArgAction::SetTrue);
    let mute_arg = arg!(--mute "Don't beep").action(ArgAction::SetTrue);
    let frames_arg = arg!(--frames <FRAMES> "Stop after this many frames")
        .value_parser(value_parser!(u64));
    let log_arg = arg!(--log <FILE> "Write log output to a file instead of stderr")
        .value_parser(value_parser!(PathBuf));

    let matches = command!()
        .arg(rom_arg)
        .arg(speed_arg)
        .arg(quirks_arg)
        .arg(wrap_arg)
        .arg(keep_index_arg)
        .arg(mute_arg)
        .arg(frames_arg)
        .arg(log_arg)
        .get_matches();

    init_logging(matches.get_one::<PathBuf>("log"))?;

    // initialise
    let compat = match matches.get_one::<PathBuf>("quirks") {
        Some(path) => CompatDb::builtin_with_file(path)?,
        None => CompatDb::builtin(),
    };
    let mut interpreter = Chip8Interpreter::with_compat_db(compat);
    let speed = matches
        .get_one::<u32>("speed")
        .copied()
        .unwrap_or(DEFAULT_INSTRUCTIONS_PER_TICK);
    interpreter.set_instructions_per_tick(speed);
    interpreter.force_quirks(Quirks {
        wrap_sprites: matches.get_flag("wrap"),
        keep_index_on_transfer: matches.get_flag("keep-index"),
    });

    // load a program; fail before touching the terminal
    if let Some(rom) = matches.get_one::<PathBuf>("rom") {
        interpreter.load_file(rom)?;
    }

    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if matches.get_flag("mute") {
        &mut mute
    } else {
        &mut beeper
    };

    let mut display = MonoTermDisplay::new(CHIP8_SCREEN_WIDTH, CHIP8_SCREEN_HEIGHT)?;
    let mut input = StdinInput::new()?;
    let frames = {
        let mut env = Environment::new(&mut interpreter, &mut display, &mut input, sound);
        env.main_loop(matches.get_one::<u64>("frames").copied())?
    };
    drop(input);
    drop(display);

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..2 {
        println!();
    }
    log::info!("ran {} frames", frames);
    Ok(())
}
