//! # instruction
//!
//! Pure decoding of a 16-bit CHIP-8 word into an [`Instruction`]. Nothing
//! here touches machine state, so the decoder can be tested on its own and
//! the interpreter only has to `match`.
//!
//! Field naming follows the usual CHIP-8 notation:
//!  * `X` bits 8-11, `Y` bits 4-7 (register indices)
//!  * `N` bits 0-3, `NN` bits 0-7, `NNN` bits 0-11
use std::fmt;

/// register index, 0x0-0xf
pub type Reg = u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm(Reg, u8),
    /// 4XNN
    SkipNeImm(Reg, u8),
    /// 5XY0
    SkipEqReg(Reg, Reg),
    /// 6XNN
    LoadImm(Reg, u8),
    /// 7XNN
    AddImm(Reg, u8),
    /// 8XY0
    Move(Reg, Reg),
    /// 8XY1
    Or(Reg, Reg),
    /// 8XY2
    And(Reg, Reg),
    /// 8XY3
    Xor(Reg, Reg),
    /// 8XY4
    Add(Reg, Reg),
    /// 8XY5
    Sub(Reg, Reg),
    /// 8XY6
    ShiftRight(Reg, Reg),
    /// 8XY7
    SubReverse(Reg, Reg),
    /// 8XYE
    ShiftLeft(Reg, Reg),
    /// 9XY0
    SkipNeReg(Reg, Reg),
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpOffset(u16),
    /// CXNN
    Random(Reg, u8),
    /// DXYN
    Draw(Reg, Reg, u8),
    /// EX9E
    SkipKeyPressed(Reg),
    /// EXA1
    SkipKeyReleased(Reg),
    /// FX07
    ReadDelay(Reg),
    /// FX0A
    WaitKey(Reg),
    /// FX15
    SetDelay(Reg),
    /// FX18
    SetSound(Reg),
    /// FX1E
    AddIndex(Reg),
    /// FX29
    LoadGlyph(Reg),
    /// FX33
    StoreBcd(Reg),
    /// FX55
    StoreRegs(Reg),
    /// FX65
    LoadRegs(Reg),
    /// anything else; executes as a no-op
    Unknown(u16),
}

/// decode one instruction word
pub fn decode(word: u16) -> Instruction {
    use Instruction::*;

    let x = ((word >> 8) & 0xf) as Reg;
    let y = ((word >> 4) & 0xf) as Reg;
    let n = (word & 0xf) as u8;
    let nn = (word & 0xff) as u8;
    let nnn = word & 0x0fff;

    match word >> 12 {
        0x0 => match word {
            0x00e0 => ClearScreen,
            0x00ee => Return,
            // 0NNN (call native 1802 code) is not emulated
            _ => Unknown(word),
        },
        0x1 => Jump(nnn),
        0x2 => Call(nnn),
        0x3 => SkipEqImm(x, nn),
        0x4 => SkipNeImm(x, nn),
        0x5 if n == 0 => SkipEqReg(x, y),
        0x6 => LoadImm(x, nn),
        0x7 => AddImm(x, nn),
        0x8 => match n {
            0x0 => Move(x, y),
            0x1 => Or(x, y),
            0x2 => And(x, y),
            0x3 => Xor(x, y),
            0x4 => Add(x, y),
            0x5 => Sub(x, y),
            0x6 => ShiftRight(x, y),
            0x7 => SubReverse(x, y),
            0xe => ShiftLeft(x, y),
            _ => Unknown(word),
        },
        0x9 if n == 0 => SkipNeReg(x, y),
        0xa => LoadIndex(nnn),
        0xb => JumpOffset(nnn),
        0xc => Random(x, nn),
        0xd => Draw(x, y, n),
        0xe => match nn {
            0x9e => SkipKeyPressed(x),
            0xa1 => SkipKeyReleased(x),
            _ => Unknown(word),
        },
        0xf => match nn {
            0x07 => ReadDelay(x),
            0x0a => WaitKey(x),
            0x15 => SetDelay(x),
            0x18 => SetSound(x),
            0x1e => AddIndex(x),
            0x29 => LoadGlyph(x),
            0x33 => StoreBcd(x),
            0x55 => StoreRegs(x),
            0x65 => LoadRegs(x),
            _ => Unknown(word),
        },
        _ => Unknown(word),
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        decode(word)
    }
}

/// conventional Cowgod-style mnemonics, handy for trace logs
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(a) => write!(f, "JP {:03X}", a),
            Call(a) => write!(f, "CALL {:03X}", a),
            SkipEqImm(x, nn) => write!(f, "SE V{:X}, {:02X}", x, nn),
            SkipNeImm(x, nn) => write!(f, "SNE V{:X}, {:02X}", x, nn),
            SkipEqReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm(x, nn) => write!(f, "LD V{:X}, {:02X}", x, nn),
            AddImm(x, nn) => write!(f, "ADD V{:X}, {:02X}", x, nn),
            Move(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            Add(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight(x, y) => write!(f, "SHR V{:X}, V{:X}", x, y),
            SubReverse(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft(x, y) => write!(f, "SHL V{:X}, V{:X}", x, y),
            SkipNeReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex(a) => write!(f, "LD I, {:03X}", a),
            JumpOffset(a) => write!(f, "JP V0, {:03X}", a),
            Random(x, nn) => write!(f, "RND V{:X}, {:02X}", x, nn),
            Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {:X}", x, y, n),
            SkipKeyPressed(x) => write!(f, "SKP V{:X}", x),
            SkipKeyReleased(x) => write!(f, "SKNP V{:X}", x),
            ReadDelay(x) => write!(f, "LD V{:X}, DT", x),
            WaitKey(x) => write!(f, "LD V{:X}, K", x),
            SetDelay(x) => write!(f, "LD DT, V{:X}", x),
            SetSound(x) => write!(f, "LD ST, V{:X}", x),
            AddIndex(x) => write!(f, "ADD I, V{:X}", x),
            LoadGlyph(x) => write!(f, "LD F, V{:X}", x),
            StoreBcd(x) => write!(f, "LD B, V{:X}", x),
            StoreRegs(x) => write!(f, "LD [I], V{:X}", x),
            LoadRegs(x) => write!(f, "LD V{:X}, [I]", x),
            Unknown(w) => write!(f, "DW {:04X}", w),
        }
    }
}
