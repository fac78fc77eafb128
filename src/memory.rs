// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the address space seen by the interpreter.
///
/// The slice accessors are contract APIs: asking for a range outside the
/// address space panics just like slice indexing. The byte and word
/// accessors wrap at the top of memory, so nothing a program does with the
/// index register or program counter can take the interpreter down.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) {
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
    }

    /// get a single byte, wrapping at the end of the address space
    fn read_byte(&self, addr: u16) -> u8;

    /// set a single byte, wrapping at the end of the address space
    fn write_byte(&mut self, addr: u16, value: u8);

    /// get a big-endian two-byte word (instruction fetch)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.read_byte(addr) as u16) << 8) | (self.read_byte(addr.wrapping_add(1)) as u16)
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded; everything below was the interpreter's
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// biggest program image that fits above the reserved area
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// glyphs live at the very bottom of memory, five bytes each
pub const CHIP8_FONT_ADDR: u16 = 0x000;
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

const ADDR_MASK: usize = CHIP8_RAM_SIZE_BYTES - 1;

/// Defines the CHIP-8 memory map used by the interpreter:
///   0x0000-0x004f  font (16 glyphs, 4x5 pixels)
///   0x0050-0x01ff  unused, historically the interpreter itself
///   0x0200-0x0fff  program
///
/// the stack, timers and display are kept outside the address space
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[addr as usize & ADDR_MASK]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize & ADDR_MASK] = value;
    }

    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the font installed
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.reset();
        mm
    }

    /// wipe everything and put the font back
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.write(&CHIP8_FONT, CHIP8_FONT_ADDR);
    }

    /// load a CHIP-8 program at 0x200; caller checks the size
    pub fn load_program(&mut self, program: &[u8]) {
        self.write(program, CHIP8_PROGRAM_ADDR);
    }

    /// address of the glyph for `digit`; values above 0xf land past the font
    pub fn glyph_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + digit as u16 * CHIP8_FONT_GLYPH_BYTES
    }

    /// the whole address space, for inspection
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x50 because before that we bake in the font
        assert_eq!(m.bytes[..80], CHIP8_FONT);
        assert!(m.bytes[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_slice_ok() {
        let mut dst = Chip8MemoryMap::new();
        let src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        dst.write(src, 0x300);
        assert_eq!(dst.get_ro_slice(0x2fc, 12), &[0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200);
        assert_eq!(m.get_word(0x204), 0x0405);
    }

    #[test]
    fn test_word_wraps_at_top_of_memory() {
        let mut m = Chip8MemoryMap::new();
        m.write_byte(0xfff, 0xab);
        // low byte comes from address 0, the top of the "0" glyph
        assert_eq!(m.get_word(0xfff), 0xabf0);
    }

    #[test]
    fn test_byte_access_wraps() {
        let mut m = Chip8MemoryMap::new();
        m.write_byte(0x1200, 0x42);
        assert_eq!(m.read_byte(0x0200), 0x42);
        assert_eq!(m.read_byte(0xf200), 0x42);
    }

    #[test]
    #[should_panic]
    fn test_write_too_much_panic() {
        let mut dst = Chip8MemoryMap::new();
        dst.write(&[0; 8], 4089);
    }

    #[test]
    fn test_program_load_ok() {
        let mut dst = Chip8MemoryMap::new();
        dst.load_program(&[0x00, 0xe0]); // clear screen
        assert_eq!(dst.get_ro_slice(0x200, 2), &[0x00, 0xe0]);
    }

    #[test]
    fn test_reset_wipes_program() {
        let mut m = Chip8MemoryMap::new();
        m.load_program(&[0xff; 16]);
        m.reset();
        assert_eq!(m.get_ro_slice(0x200, 16), &[0; 16]);
        assert_eq!(m.get_ro_slice(0, 80), &CHIP8_FONT);
    }

    #[test]
    fn test_glyph_addr() {
        assert_eq!(Chip8MemoryMap::glyph_addr(0), 0);
        assert_eq!(Chip8MemoryMap::glyph_addr(0xa), 50);
        assert_eq!(Chip8MemoryMap::glyph_addr(0xf), 75);
        assert_eq!(Chip8MemoryMap::glyph_addr(0xff), 1275);
    }
}
