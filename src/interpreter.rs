/// # interpreter
///
/// The CHIP-8 virtual machine proper: memory, the sixteen V registers, the
/// index register, a sixteen-deep return stack, two 60Hz timers, the key
/// matrix and the framebuffer.
///
/// The host drives it one frame at a time with [`Chip8Interpreter::tick`],
/// which runs a batch of instructions and then counts the timers down once.
/// Everything the host needs to show or play comes back out of the tick or
/// through read-only accessors; the interpreter knows nothing about
/// terminals, speakers or keyboards.
use crate::compat::{adler32, CompatDb, Quirks};
use crate::error::LoadError;
use crate::framebuffer::{Framebuffer, CHIP8_SCREEN_HEIGHT, CHIP8_SCREEN_WIDTH};
use crate::instruction::{decode, Instruction, Reg};
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_MAX_PROGRAM_BYTES, CHIP8_PROGRAM_ADDR};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CHIP8_REGISTER_COUNT: usize = 16;
pub const CHIP8_STACK_DEPTH: usize = 16;
pub const CHIP8_KEY_COUNT: usize = 16;

/// VF doubles as carry, borrow and collision flag
const FLAG: usize = 0xf;

/// bounds on how many instructions run per frame
pub const MIN_INSTRUCTIONS_PER_TICK: u32 = 1;
pub const MAX_INSTRUCTIONS_PER_TICK: u32 = 120;
/// ~600 instructions a second at 60 frames a second
pub const DEFAULT_INSTRUCTIONS_PER_TICK: u32 = 10;

/// what happened during one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// instructions executed this frame
    pub executed: u32,
    /// the sound timer ran out this frame
    pub beep: bool,
    /// the sound timer is still counting
    pub sound_active: bool,
}

/// instructions-per-tick, with the value to go back to after a pause
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RunSpeed {
    per_tick: u32,
    paused_at: Option<u32>,
}

impl RunSpeed {
    fn clamp(n: u32) -> u32 {
        n.clamp(MIN_INSTRUCTIONS_PER_TICK, MAX_INSTRUCTIONS_PER_TICK)
    }

    fn set(&mut self, n: u32) {
        let n = Self::clamp(n);
        match self.paused_at {
            // keep the pause; new speed applies once we resume
            Some(_) => self.paused_at = Some(n),
            None => self.per_tick = n,
        }
    }

    fn configured(&self) -> u32 {
        self.paused_at.unwrap_or(self.per_tick)
    }

    fn toggle_pause(&mut self) {
        match self.paused_at.take() {
            Some(previous) => self.per_tick = previous,
            None => {
                self.paused_at = Some(self.per_tick);
                self.per_tick = 0;
            }
        }
    }

    fn unpause(&mut self) {
        if self.paused_at.is_some() {
            self.toggle_pause();
        }
    }
}

pub struct Chip8Interpreter {
    memory: Chip8MemoryMap,
    framebuffer: Framebuffer,
    v: [u8; CHIP8_REGISTER_COUNT],
    i: u16,
    program_counter: u16,
    stack: [u16; CHIP8_STACK_DEPTH],
    stack_pointer: usize,
    delay_timer: u8,
    sound_timer: u8,
    keys: [bool; CHIP8_KEY_COUNT],
    random: StdRng,
    speed: RunSpeed,
    compat: CompatDb,
    quirks: Quirks,
    forced_quirks: Quirks,
    game_loaded: bool,
    should_redraw: bool,
    checksum: Option<u32>,
    title: Option<String>,
    image: Vec<u8>,
}

impl Chip8Interpreter {
    pub fn new() -> Self {
        Self::with_compat_db(CompatDb::builtin())
    }

    pub fn with_compat_db(compat: CompatDb) -> Self {
        let mut i = Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            framebuffer: Framebuffer::new(),
            v: [0; CHIP8_REGISTER_COUNT],
            i: 0,
            program_counter: CHIP8_PROGRAM_ADDR,
            stack: [0; CHIP8_STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; CHIP8_KEY_COUNT],
            random: StdRng::seed_from_u64(0),
            speed: RunSpeed {
                per_tick: DEFAULT_INSTRUCTIONS_PER_TICK,
                paused_at: None,
            },
            compat,
            quirks: Quirks::default(),
            forced_quirks: Quirks::default(),
            game_loaded: false,
            should_redraw: false,
            checksum: None,
            title: None,
            image: Vec::new(),
        };
        i.reset();
        i
    }

    /// put the machine back to power-on state; run speed and the compat
    /// database survive, the loaded program does not
    pub fn reset(&mut self) {
        self.memory.reset();
        self.framebuffer.clear();
        self.v = [0; CHIP8_REGISTER_COUNT];
        self.i = 0;
        self.program_counter = CHIP8_PROGRAM_ADDR;
        self.stack = [0; CHIP8_STACK_DEPTH];
        self.stack_pointer = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys = [false; CHIP8_KEY_COUNT];
        self.quirks = Quirks::default();
        self.game_loaded = false;
        self.should_redraw = false;
        self.checksum = None;
        self.title = None;
        self.image.clear();
        self.speed.unpause();
        self.reseed(clock_seed());
    }

    /// replace the random source; mostly for repeatable tests
    pub fn reseed(&mut self, seed: u64) {
        self.random = StdRng::seed_from_u64(seed);
    }

    /// reset, then install `program` at 0x200 and pick quirks for it
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.reset();
        if program.len() > CHIP8_MAX_PROGRAM_BYTES {
            warn!(
                "rejecting {} byte image, max is {}",
                program.len(),
                CHIP8_MAX_PROGRAM_BYTES
            );
            return Err(LoadError::ImageTooLarge {
                len: program.len(),
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.memory.load_program(program);

        let checksum = adler32(program);
        let (title, quirks) = match self.compat.lookup(checksum) {
            Some(known) => (Some(known.title.clone()), known.quirks),
            None => (None, Quirks::default()),
        };
        self.quirks = Quirks {
            wrap_sprites: quirks.wrap_sprites || self.forced_quirks.wrap_sprites,
            keep_index_on_transfer: quirks.keep_index_on_transfer
                || self.forced_quirks.keep_index_on_transfer,
        };
        info!(
            "loaded {} bytes, adler32 {:08x} ({}), quirks {:?}",
            program.len(),
            checksum,
            title.as_deref().unwrap_or("unknown title"),
            self.quirks
        );
        self.checksum = Some(checksum);
        self.title = title;
        self.image = program.to_vec();
        self.game_loaded = true;
        self.should_redraw = true;
        Ok(())
    }

    /// load a whole program from a reader
    pub fn load_from(&mut self, reader: &mut impl io::Read) -> Result<(), LoadError> {
        let mut buf = Vec::new();
        if let Err(source) = reader.read_to_end(&mut buf) {
            self.reset();
            return Err(LoadError::SourceUnavailable { path: None, source });
        }
        self.load_program(&buf)
    }

    /// load a program image from disk
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(buf) => self.load_program(&buf),
            Err(source) => {
                self.reset();
                Err(LoadError::SourceUnavailable {
                    path: Some(path.to_path_buf()),
                    source,
                })
            }
        }
    }

    /// reload the last program that loaded successfully
    pub fn restart(&mut self) -> Result<(), LoadError> {
        if self.image.is_empty() {
            self.reset();
            return Ok(());
        }
        let image = std::mem::take(&mut self.image);
        self.load_program(&image)
    }

    /// run one frame's worth of instructions, then count the timers down
    pub fn tick(&mut self) -> Tick {
        if !self.game_loaded {
            return Tick::default();
        }
        self.should_redraw = false;
        if self.is_paused() {
            return Tick {
                sound_active: self.sound_timer > 0,
                ..Tick::default()
            };
        }

        let n = self.speed.per_tick;
        for _ in 0..n {
            self.step();
        }

        let beep = self.sound_timer == 1;
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
        Tick {
            executed: n,
            beep,
            sound_active: self.sound_timer > 0,
        }
    }

    /// fetch, decode and execute a single instruction
    pub fn step(&mut self) {
        let word = self.memory.get_word(self.program_counter);
        let instruction = decode(word);
        trace!("{:03x}: {:04x}  {}", self.program_counter, word, instruction);
        self.execute(instruction);
    }

    /// execute an already-decoded instruction at the current pc
    pub fn execute(&mut self, instruction: Instruction) {
        use Instruction::*;

        let pc = self.program_counter;
        let next = pc.wrapping_add(2);
        let skip = pc.wrapping_add(4);
        let skip_if = |cond: bool| if cond { skip } else { next };

        self.program_counter = match instruction {
            ClearScreen => {
                self.framebuffer.clear();
                self.should_redraw = true;
                next
            }
            Return => self.pop(),
            Jump(addr) => addr,
            Call(addr) => {
                self.push(next);
                addr
            }
            SkipEqImm(x, nn) => skip_if(self.reg(x) == nn),
            SkipNeImm(x, nn) => skip_if(self.reg(x) != nn),
            SkipEqReg(x, y) => skip_if(self.reg(x) == self.reg(y)),
            LoadImm(x, nn) => {
                self.set_reg(x, nn);
                next
            }
            AddImm(x, nn) => {
                self.set_reg(x, self.reg(x).wrapping_add(nn));
                next
            }
            Move(x, y) => {
                self.set_reg(x, self.reg(y));
                next
            }
            Or(x, y) => {
                self.set_reg(x, self.reg(x) | self.reg(y));
                next
            }
            And(x, y) => {
                self.set_reg(x, self.reg(x) & self.reg(y));
                next
            }
            Xor(x, y) => {
                self.set_reg(x, self.reg(x) ^ self.reg(y));
                next
            }
            // NB. the flag is written before the result throughout the ALU
            //     family, so VF as the destination sees the flag as its input
            Add(x, y) => {
                // carry as VY > VX before the add, not as overflow of the sum
                self.v[FLAG] = (self.reg(y) > self.reg(x)) as u8;
                self.set_reg(x, self.reg(x).wrapping_add(self.reg(y)));
                next
            }
            Sub(x, y) => {
                self.v[FLAG] = (self.reg(y) <= self.reg(x)) as u8;
                self.set_reg(x, self.reg(x).wrapping_sub(self.reg(y)));
                next
            }
            ShiftRight(x, _) => {
                self.v[FLAG] = self.reg(x) & 1;
                self.set_reg(x, self.reg(x) >> 1);
                next
            }
            SubReverse(x, y) => {
                self.v[FLAG] = (self.reg(x) <= self.reg(y)) as u8;
                self.set_reg(x, self.reg(y).wrapping_sub(self.reg(x)));
                next
            }
            ShiftLeft(x, _) => {
                // low bit, not the bit shifted out
                self.v[FLAG] = self.reg(x) & 1;
                self.set_reg(x, self.reg(x) << 1);
                next
            }
            SkipNeReg(x, y) => skip_if(self.reg(x) != self.reg(y)),
            LoadIndex(addr) => {
                self.i = addr;
                next
            }
            JumpOffset(addr) => addr.wrapping_add(self.v[0] as u16),
            Random(x, nn) => {
                let r: u8 = self.random.gen();
                self.set_reg(x, r & nn);
                next
            }
            Draw(x, y, n) => {
                self.draw(self.reg(x), self.reg(y), n);
                next
            }
            SkipKeyPressed(x) => skip_if(self.key(self.reg(x))),
            SkipKeyReleased(x) => skip_if(!self.key(self.reg(x))),
            ReadDelay(x) => {
                self.set_reg(x, self.delay_timer);
                next
            }
            WaitKey(x) => match self.keys.iter().position(|&k| k) {
                Some(key) => {
                    self.set_reg(x, key as u8);
                    next
                }
                // go round again next time; the host keeps running frames
                None => pc,
            },
            SetDelay(x) => {
                self.delay_timer = self.reg(x);
                next
            }
            SetSound(x) => {
                self.sound_timer = self.reg(x);
                next
            }
            AddIndex(x) => {
                self.i = self.i.wrapping_add(self.reg(x) as u16);
                next
            }
            LoadGlyph(x) => {
                self.i = Chip8MemoryMap::glyph_addr(self.reg(x));
                next
            }
            StoreBcd(x) => {
                let value = self.reg(x);
                self.memory.write_byte(self.i, value / 100);
                self.memory.write_byte(self.i.wrapping_add(1), value / 10 % 10);
                self.memory.write_byte(self.i.wrapping_add(2), value % 10);
                next
            }
            StoreRegs(x) => {
                for r in 0..=x {
                    let value = self.reg(r);
                    self.memory.write_byte(self.i.wrapping_add(r as u16), value);
                }
                self.advance_index(x);
                next
            }
            LoadRegs(x) => {
                for r in 0..=x {
                    let value = self.memory.read_byte(self.i.wrapping_add(r as u16));
                    self.set_reg(r, value);
                }
                self.advance_index(x);
                next
            }
            Unknown(word) => {
                debug!("{:03x}: skipping unknown instruction {:04x}", pc, word);
                next
            }
        };
    }

    fn reg(&self, r: Reg) -> u8 {
        self.v[r as usize]
    }

    fn set_reg(&mut self, r: Reg, value: u8) {
        self.v[r as usize] = value;
    }

    fn key(&self, key: u8) -> bool {
        self.keys[(key & 0xf) as usize]
    }

    fn advance_index(&mut self, x: Reg) {
        if !self.quirks.keep_index_on_transfer {
            self.i = self.i.wrapping_add(x as u16 + 1);
        }
    }

    fn push(&mut self, addr: u16) {
        if self.stack_pointer == CHIP8_STACK_DEPTH {
            warn!("stack overflow at {:03x}, overwriting top return address", self.program_counter);
            self.stack[CHIP8_STACK_DEPTH - 1] = addr;
        } else {
            self.stack[self.stack_pointer] = addr;
            self.stack_pointer += 1;
        }
    }

    fn pop(&mut self) -> u16 {
        if self.stack_pointer == 0 {
            warn!("return with empty stack at {:03x}, going to 000", self.program_counter);
            return 0;
        }
        self.stack_pointer -= 1;
        self.stack[self.stack_pointer]
    }

    /// XOR an 8xN sprite from memory at I onto the screen at (x0, y0)
    fn draw(&mut self, x0: u8, y0: u8, rows: u8) {
        self.v[FLAG] = 0;
        for row in 0..rows as usize {
            let sprite = self.memory.read_byte(self.i.wrapping_add(row as u16));
            for col in 0..8 {
                if sprite & (0x80 >> col) == 0 {
                    continue;
                }
                let mut x = x0 as usize + col;
                let mut y = y0 as usize + row;
                if self.quirks.wrap_sprites {
                    x %= CHIP8_SCREEN_WIDTH;
                    y %= CHIP8_SCREEN_HEIGHT;
                } else if x >= CHIP8_SCREEN_WIDTH || y >= CHIP8_SCREEN_HEIGHT {
                    continue;
                }
                if self.framebuffer.flip(x, y) {
                    self.v[FLAG] = 1;
                }
                self.should_redraw = true;
            }
        }
    }

    /// host keyboard hook; `index` is the hex key 0x0-0xf
    pub fn set_key(&mut self, index: u8, pressed: bool) {
        match self.keys.get_mut(index as usize) {
            Some(key) => *key = pressed,
            None => warn!("ignoring key {:#x}, there are only 16", index),
        }
    }

    pub fn release_all_keys(&mut self) {
        self.keys = [false; CHIP8_KEY_COUNT];
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// the framebuffer changed during the last tick
    pub fn should_redraw(&self) -> bool {
        self.should_redraw
    }

    pub fn set_instructions_per_tick(&mut self, n: u32) {
        self.speed.set(n);
    }

    /// 0 while paused
    pub fn instructions_per_tick(&self) -> u32 {
        self.speed.per_tick
    }

    /// speed that applies when not paused
    pub fn configured_instructions_per_tick(&self) -> u32 {
        self.speed.configured()
    }

    pub fn speed_up(&mut self) {
        self.speed.set(self.speed.configured() + 1);
    }

    pub fn slow_down(&mut self) {
        self.speed.set(self.speed.configured().saturating_sub(1));
    }

    pub fn toggle_pause(&mut self) {
        self.speed.toggle_pause();
        info!(
            "{}",
            if self.is_paused() { "paused" } else { "resumed" }
        );
    }

    pub fn is_paused(&self) -> bool {
        self.speed.paused_at.is_some()
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// operator override for the current program
    pub fn set_quirks(&mut self, quirks: Quirks) {
        self.quirks = quirks;
    }

    /// quirks switched on for every program, on top of the compat database
    pub fn force_quirks(&mut self, quirks: Quirks) {
        self.forced_quirks = quirks;
    }

    pub fn is_loaded(&self) -> bool {
        self.game_loaded
    }

    /// Adler-32 of the loaded image
    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// title from the compat database, if the image was recognised
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn registers(&self) -> &[u8; CHIP8_REGISTER_COUNT] {
        &self.v
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.program_counter
    }

    /// number of return addresses on the stack
    pub fn stack_index(&self) -> usize {
        self.stack_pointer
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }
}

impl Default for Chip8Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
