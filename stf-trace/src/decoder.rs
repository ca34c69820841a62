//! Opcode classification
//!
//! The checker does not need a disassembler. It only asks a handful of
//! questions about an opcode (is it a load, a store, a branch...), which the
//! [`Decoder`] trait captures. [`RiscvDecoder`] answers them for the RISC-V
//! base ISA plus the A, F/D, V and C extensions, bucketing on the major
//! opcode the same way a full decoder would.

use crate::trace::Iem;

/// Classification of a single opcode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedOpcode {
    pub failed: bool,
    pub load: bool,
    pub store: bool,
    pub branch: bool,
    pub conditional: bool,
    pub atomic: bool,
    pub exception_return: bool,
}

impl DecodedOpcode {
    fn failure() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    fn load() -> Self {
        Self {
            load: true,
            ..Self::default()
        }
    }

    fn store() -> Self {
        Self {
            store: true,
            ..Self::default()
        }
    }

    fn jump() -> Self {
        Self {
            branch: true,
            ..Self::default()
        }
    }

    fn conditional_branch() -> Self {
        Self {
            branch: true,
            conditional: true,
            ..Self::default()
        }
    }

    pub fn decode_failed(&self) -> bool {
        self.failed
    }

    pub fn is_load(&self) -> bool {
        self.load
    }

    pub fn is_store(&self) -> bool {
        self.store
    }

    pub fn is_branch(&self) -> bool {
        self.branch
    }

    pub fn is_conditional(&self) -> bool {
        self.conditional
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn is_exception_return(&self) -> bool {
        self.exception_return
    }
}

/// Opcode classifier consumed by the checker
pub trait Decoder {
    /// Classify a raw opcode
    fn decode(&self, opcode: u32) -> DecodedOpcode;

    /// Follow an instruction encoding mode change
    fn set_iem(&mut self, _iem: Iem) {}
}

/// Encodings of the exception-return instructions
pub const URET_ENCODING: u32 = 0x0020_0073;
pub const SRET_ENCODING: u32 = 0x1020_0073;
pub const MRET_ENCODING: u32 = 0x3020_0073;

mod major {
    pub const LOAD: u32 = 0x03;
    pub const LOAD_FP: u32 = 0x07;
    pub const MISC_MEM: u32 = 0x0f;
    pub const OP_IMM: u32 = 0x13;
    pub const AUIPC: u32 = 0x17;
    pub const OP_IMM_32: u32 = 0x1b;
    pub const STORE: u32 = 0x23;
    pub const STORE_FP: u32 = 0x27;
    pub const AMO: u32 = 0x2f;
    pub const OP: u32 = 0x33;
    pub const LUI: u32 = 0x37;
    pub const OP_32: u32 = 0x3b;
    pub const MADD: u32 = 0x43;
    pub const MSUB: u32 = 0x47;
    pub const NMSUB: u32 = 0x4b;
    pub const NMADD: u32 = 0x4f;
    pub const OP_FP: u32 = 0x53;
    pub const OP_V: u32 = 0x57;
    pub const BRANCH: u32 = 0x63;
    pub const JALR: u32 = 0x67;
    pub const JAL: u32 = 0x6f;
    pub const SYSTEM: u32 = 0x73;
}

/// RISC-V opcode classifier
#[derive(Debug, Clone, Copy)]
pub struct RiscvDecoder {
    iem: Iem,
}

impl RiscvDecoder {
    pub fn new(iem: Iem) -> Self {
        Self { iem }
    }

    pub fn iem(&self) -> Iem {
        self.iem
    }

    fn is_rv64(&self) -> bool {
        self.iem == Iem::Rv64
    }

    fn decode_32(&self, opcode: u32) -> DecodedOpcode {
        let funct3 = (opcode >> 12) & 0x7;
        match opcode & 0x7f {
            major::LOAD => match funct3 {
                0 | 1 | 2 | 4 | 5 => DecodedOpcode::load(),
                3 | 6 if self.is_rv64() => DecodedOpcode::load(),
                _ => DecodedOpcode::failure(),
            },
            // Scalar FP widths 1..=4, vector element widths 0 and 5..=7
            major::LOAD_FP => DecodedOpcode::load(),
            major::STORE => match funct3 {
                0..=2 => DecodedOpcode::store(),
                3 if self.is_rv64() => DecodedOpcode::store(),
                _ => DecodedOpcode::failure(),
            },
            major::STORE_FP => DecodedOpcode::store(),
            major::AMO => self.decode_amo(opcode, funct3),
            major::BRANCH => match funct3 {
                2 | 3 => DecodedOpcode::failure(),
                _ => DecodedOpcode::conditional_branch(),
            },
            major::JAL => DecodedOpcode::jump(),
            major::JALR if funct3 == 0 => DecodedOpcode::jump(),
            major::JALR => DecodedOpcode::failure(),
            major::SYSTEM => match opcode {
                URET_ENCODING | SRET_ENCODING | MRET_ENCODING => DecodedOpcode {
                    exception_return: true,
                    ..DecodedOpcode::default()
                },
                _ if funct3 == 4 => DecodedOpcode::failure(),
                _ => DecodedOpcode::default(),
            },
            major::OP_IMM_32 | major::OP_32 if !self.is_rv64() => DecodedOpcode::failure(),
            major::MISC_MEM
            | major::OP_IMM
            | major::AUIPC
            | major::OP_IMM_32
            | major::OP
            | major::LUI
            | major::OP_32
            | major::MADD
            | major::MSUB
            | major::NMSUB
            | major::NMADD
            | major::OP_FP
            | major::OP_V => DecodedOpcode::default(),
            _ => DecodedOpcode::failure(),
        }
    }

    fn decode_amo(&self, opcode: u32, funct3: u32) -> DecodedOpcode {
        let width_ok = funct3 == 2 || (funct3 == 3 && self.is_rv64());
        if !width_ok {
            return DecodedOpcode::failure();
        }
        let (load, store) = match opcode >> 27 {
            // LR
            0b00010 => (true, false),
            // SC
            0b00011 => (false, true),
            0b00000 | 0b00001 | 0b00100 | 0b01000 | 0b01100 | 0b10000 | 0b10100 | 0b11000
            | 0b11100 => (true, true),
            _ => return DecodedOpcode::failure(),
        };
        DecodedOpcode {
            load,
            store,
            atomic: true,
            ..DecodedOpcode::default()
        }
    }

    fn decode_16(&self, opcode: u32) -> DecodedOpcode {
        let opcode = opcode & 0xffff;
        if opcode == 0 {
            return DecodedOpcode::failure();
        }
        let funct3 = (opcode >> 13) & 0x7;
        match opcode & 0b11 {
            // Quadrant 0
            0b00 => match funct3 {
                1..=3 => DecodedOpcode::load(),
                4 => DecodedOpcode::failure(),
                5..=7 => DecodedOpcode::store(),
                _ => DecodedOpcode::default(),
            },
            // Quadrant 1
            0b01 => match funct3 {
                // C.JAL on RV32, C.ADDIW on RV64
                1 if !self.is_rv64() => DecodedOpcode::jump(),
                5 => DecodedOpcode::jump(),
                6 | 7 => DecodedOpcode::conditional_branch(),
                _ => DecodedOpcode::default(),
            },
            // Quadrant 2
            _ => match funct3 {
                1..=3 => DecodedOpcode::load(),
                4 => {
                    let rs1 = (opcode >> 7) & 0x1f;
                    let rs2 = (opcode >> 2) & 0x1f;
                    match (rs1, rs2) {
                        // C.JR / C.JALR
                        (r, 0) if r != 0 => DecodedOpcode::jump(),
                        // C.JR with rs1 == x0 is reserved
                        (0, 0) if opcode & 0x1000 == 0 => DecodedOpcode::failure(),
                        _ => DecodedOpcode::default(),
                    }
                }
                5..=7 => DecodedOpcode::store(),
                _ => DecodedOpcode::default(),
            },
        }
    }
}

impl Default for RiscvDecoder {
    fn default() -> Self {
        Self::new(Iem::Rv64)
    }
}

impl Decoder for RiscvDecoder {
    fn decode(&self, opcode: u32) -> DecodedOpcode {
        if opcode & 0b11 == 0b11 {
            self.decode_32(opcode)
        } else {
            self.decode_16(opcode)
        }
    }

    fn set_iem(&mut self, iem: Iem) {
        self.iem = iem;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv64() -> RiscvDecoder {
        RiscvDecoder::new(Iem::Rv64)
    }

    #[test]
    fn test_loads_and_stores() {
        let d = rv64();
        // ld a0, 0(sp)
        assert!(d.decode(0x0001_3503).is_load());
        // sd a0, 0(sp)
        assert!(d.decode(0x00a1_3023).is_store());
        // c.lw a0, 0(a1)
        assert!(d.decode(0x4188).is_load());
        // c.sdsp ra, 8(sp)
        assert!(d.decode(0xe406).is_store());
        // addi a0, a0, 1
        let addi = d.decode(0x0015_0513);
        assert!(!addi.is_load() && !addi.is_store() && !addi.decode_failed());
    }

    #[test]
    fn test_rv32_rejects_doubleword_memory_ops() {
        let d = RiscvDecoder::new(Iem::Rv32);
        assert!(d.decode(0x0001_3503).decode_failed());
        assert!(d.decode(0x00a1_3023).decode_failed());
    }

    #[test]
    fn test_atomics() {
        let d = rv64();
        // lr.w a0, (a1)
        let lr = d.decode(0x1005_a52f);
        assert!(lr.is_load() && lr.is_atomic() && !lr.is_store());
        // sc.w a0, a2, (a1)
        let sc = d.decode(0x18c5_a52f);
        assert!(sc.is_store() && sc.is_atomic() && !sc.is_load());
        // amoadd.w a0, a2, (a1)
        let amo = d.decode(0x00c5_a52f);
        assert!(amo.is_load() && amo.is_store() && amo.is_atomic());
    }

    #[test]
    fn test_branches() {
        let d = rv64();
        // jal ra, 0
        let jal = d.decode(0x0000_00ef);
        assert!(jal.is_branch() && !jal.is_conditional());
        // ret (jalr x0, 0(ra))
        assert!(d.decode(0x0000_8067).is_branch());
        // beq a0, a1, 0
        let beq = d.decode(0x00b5_0063);
        assert!(beq.is_branch() && beq.is_conditional());
        // c.j 0
        assert!(d.decode(0xa001).is_branch());
        // c.beqz a0, 0
        assert!(d.decode(0xc101).is_conditional());
        // c.jr ra
        assert!(d.decode(0x8082).is_branch());
    }

    #[test]
    fn test_exception_returns() {
        let d = rv64();
        assert!(d.decode(MRET_ENCODING).is_exception_return());
        assert!(d.decode(SRET_ENCODING).is_exception_return());
        // ecall
        assert!(!d.decode(0x0000_0073).is_exception_return());
    }

    #[test]
    fn test_failures() {
        let d = rv64();
        assert!(d.decode(0).decode_failed());
        assert!(d.decode(0xffff_ffff).decode_failed());
        // funct3 == 2 under BRANCH is reserved
        assert!(d.decode(0x0000_2063).decode_failed());
    }

    #[test]
    fn test_set_iem_changes_compressed_meaning() {
        let mut d = RiscvDecoder::new(Iem::Rv32);
        // c.jal on RV32, c.addiw on RV64
        assert!(d.decode(0x2001).is_branch());
        d.set_iem(Iem::Rv64);
        assert!(!d.decode(0x2001).is_branch());
    }
}
