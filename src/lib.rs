///
/// ## Design
///
/// * one owned interpreter, no globals; the host passes it around by `&mut`
/// * the interpreter is a pure virtual CPU: bytes and key state in,
///   framebuffer and "beep now" out; it knows nothing about terminals
/// * decode is a pure function from a 16-bit word to an `Instruction`, then
///   one exhaustive match executes it
/// * timing is per frame: N instructions, then the 60Hz timers tick once
/// * programs that need non-VIP behaviour are recognised by checksum, not
///   by guessing
///
/// Model
///
/// Environment
///  |-- display, input, sound
///  |-- interpreter(memory, compat db)
///  |    |-- loader: reset, copy to 0x200, adler32 -> quirks
///  |    |-- decoder
///  |    `-- step driver: tick() = step() x N, then timers
///  `-- main loop, 60 frames a second
///       |-- poll input -> set_key / operator commands
///       |-- tick = interpreter.tick()
///       |-- beeper.frame(tick.beep)
///       |-- if interpreter.should_redraw() { display.draw(framebuffer) }
///       `-- sleep out the rest of the frame
pub mod compat;
pub mod display;
pub mod environment;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;

pub use compat::{CompatDb, KnownTitle, Quirks};
pub use error::LoadError;
pub use framebuffer::Framebuffer;
pub use instruction::{decode, Instruction};
pub use interpreter::{Chip8Interpreter, Tick};
