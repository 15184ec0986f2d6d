//! Bit-field decoding of RV32I instruction words.
//!
//! All functions here are total and side-effect-free: they extract a field
//! from a 32-bit instruction word and never fail, even on unrecognized
//! opcodes. Classifying the opcode and dispatching to a handler is the
//! dispatcher's job (see `crate::hart`), not the decoder's.

use std::collections::HashMap;

use thiserror::Error;

// Opcode-class constants, per spec.md §4.4.
pub const OP_LUI: u32 = 0x37;
pub const OP_AUIPC: u32 = 0x17;
pub const OP_JAL: u32 = 0x6f;
pub const OP_JALR: u32 = 0x67;
pub const OP_BRANCH: u32 = 0x63;
pub const OP_LOAD: u32 = 0x03;
pub const OP_STORE: u32 = 0x23;
pub const OP_IMM: u32 = 0x13;
pub const OP: u32 = 0x33;

// funct3 for BRANCH
pub const FUNCT3_BEQ: u32 = 0b000;
pub const FUNCT3_BNE: u32 = 0b001;
pub const FUNCT3_BLT: u32 = 0b100;
pub const FUNCT3_BGE: u32 = 0b101;
pub const FUNCT3_BLTU: u32 = 0b110;
pub const FUNCT3_BGEU: u32 = 0b111;

// funct3 for LOAD
pub const FUNCT3_LB: u32 = 0b000;
pub const FUNCT3_LH: u32 = 0b001;
pub const FUNCT3_LW: u32 = 0b010;
pub const FUNCT3_LBU: u32 = 0b100;
pub const FUNCT3_LHU: u32 = 0b101;

// funct3 for STORE
pub const FUNCT3_SB: u32 = 0b000;
pub const FUNCT3_SH: u32 = 0b001;
pub const FUNCT3_SW: u32 = 0b010;

// funct3 for OP-IMM
pub const FUNCT3_ADDI: u32 = 0b000;
pub const FUNCT3_SLLI: u32 = 0b001;
pub const FUNCT3_SLTI: u32 = 0b010;
pub const FUNCT3_SLTIU: u32 = 0b011;
pub const FUNCT3_XORI: u32 = 0b100;
pub const FUNCT3_SRLI: u32 = 0b101;
pub const FUNCT3_SRAI: u32 = 0b101;
pub const FUNCT3_ORI: u32 = 0b110;
pub const FUNCT3_ANDI: u32 = 0b111;

// funct3 for OP
pub const FUNCT3_ADD: u32 = 0b000;
pub const FUNCT3_SUB: u32 = 0b000;
pub const FUNCT3_SLL: u32 = 0b001;
pub const FUNCT3_SLT: u32 = 0b010;
pub const FUNCT3_SLTU: u32 = 0b011;
pub const FUNCT3_XOR: u32 = 0b100;
pub const FUNCT3_SRL: u32 = 0b101;
pub const FUNCT3_SRA: u32 = 0b101;
pub const FUNCT3_OR: u32 = 0b110;
pub const FUNCT3_AND: u32 = 0b111;

// funct7 disambiguating SUB/SRA and SLLI/SRLI/SRAI from their zero-funct7 twins
pub const FUNCT7_ADD: u32 = 0x00;
pub const FUNCT7_SUB: u32 = 0x20;
pub const FUNCT7_SRL: u32 = 0x00;
pub const FUNCT7_SRA: u32 = 0x20;
pub const FUNCT7_SLLI: u32 = 0x00;
pub const FUNCT7_SRLI: u32 = 0x00;
pub const FUNCT7_SRAI: u32 = 0x20;

/// Build an n-bit-wide mask (all ones in the low n bits).
const fn mask(n_bits: u32) -> u32 {
    if n_bits == 32 {
        u32::MAX
    } else {
        (1u32 << n_bits) - 1
    }
}

/// Extract `instr[end:start]` (verilog notation), right-justified.
fn extract_field(instr: u32, end: u32, start: u32) -> u32 {
    mask(end - start + 1) & (instr >> start)
}

pub fn opcode(instr: u32) -> u32 {
    extract_field(instr, 6, 0)
}

pub fn rd(instr: u32) -> u8 {
    extract_field(instr, 11, 7) as u8
}

pub fn funct3(instr: u32) -> u32 {
    extract_field(instr, 14, 12)
}

pub fn rs1(instr: u32) -> u8 {
    extract_field(instr, 19, 15) as u8
}

pub fn rs2(instr: u32) -> u8 {
    extract_field(instr, 24, 20) as u8
}

pub fn funct7(instr: u32) -> u32 {
    extract_field(instr, 31, 25)
}

/// Shift amount: bits [24:20], zero-extended. Identical bit position to
/// `rs2`, used by the register-immediate shift instructions.
pub fn shamt(instr: u32) -> u32 {
    extract_field(instr, 24, 20)
}

/// Sign-extend the low `width` bits of `value` to a full 32-bit value.
fn sign_extend(value: u32, width: u32) -> u32 {
    let shift = 32 - width;
    (((value << shift) as i32) >> shift) as u32
}

/// I-immediate: `sext(instr[31:20], 12)`.
pub fn imm_i(instr: u32) -> i32 {
    sign_extend(extract_field(instr, 31, 20), 12) as i32
}

/// S-immediate: `sext(instr[31:25] ++ instr[11:7], 12)`.
pub fn imm_s(instr: u32) -> i32 {
    let hi = extract_field(instr, 31, 25);
    let lo = extract_field(instr, 11, 7);
    sign_extend((hi << 5) | lo, 12) as i32
}

/// B-immediate: `sext(instr[31] ++ instr[7] ++ instr[30:25] ++ instr[11:8] ++ 0, 13)`.
pub fn imm_b(instr: u32) -> i32 {
    let bit12 = extract_field(instr, 31, 31);
    let bit11 = extract_field(instr, 7, 7);
    let bits10_5 = extract_field(instr, 30, 25);
    let bits4_1 = extract_field(instr, 11, 8);
    let value = (bit12 << 12) | (bit11 << 11) | (bits10_5 << 5) | (bits4_1 << 1);
    sign_extend(value, 13) as i32
}

/// U-immediate: `instr[31:12] ++ 12'b0`. Already a full 32-bit value, no
/// further sign extension required.
pub fn imm_u(instr: u32) -> i32 {
    (instr & 0xffff_f000) as i32
}

/// J-immediate: `sext(instr[31] ++ instr[19:12] ++ instr[20] ++ instr[30:21] ++ 0, 21)`.
pub fn imm_j(instr: u32) -> i32 {
    let bit20 = extract_field(instr, 31, 31);
    let bits19_12 = extract_field(instr, 19, 12);
    let bit11 = extract_field(instr, 20, 20);
    let bits10_1 = extract_field(instr, 30, 21);
    let value = (bit20 << 20) | (bits19_12 << 12) | (bit11 << 11) | (bits10_1 << 1);
    sign_extend(value, 21) as i32
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no instruction registered for opcode 0x{opcode:02x} (word 0x{word:08x})")]
    UnknownOpcode { opcode: u32, word: u32 },
    #[error(
        "opcode 0x{opcode:02x} funct3 0x{funct3:x} has no handler (word 0x{word:08x})"
    )]
    UnknownFunct3 {
        opcode: u32,
        funct3: u32,
        word: u32,
    },
    #[error(
        "opcode 0x{opcode:02x} funct3 0x{funct3:x} funct7 0x{funct7:02x} has no handler (word 0x{word:08x})"
    )]
    UnknownFunct7 {
        opcode: u32,
        funct3: u32,
        funct7: u32,
        word: u32,
    },
}

/// A handler for one fully-decoded instruction. Receives the raw word so it
/// can re-extract whichever operand/immediate fields it needs.
pub type ExecFn<H> = fn(&mut H, u32) -> Result<(), crate::hart::ExecutionError>;

enum Node<H> {
    /// Disambiguate further by masking `instr` and looking up `next_mask`'s
    /// result in `branches`.
    Branch {
        next_mask: u32,
        branches: HashMap<u32, Node<H>>,
    },
    Leaf(ExecFn<H>),
}

/// Table-driven instruction dispatcher.
///
/// Built once at `Hart` construction time from a flat list of
/// `(opcode, funct3, funct7)` -> handler entries (`funct3`/`funct7` are
/// `None` when the opcode alone determines the instruction, as with LUI,
/// AUIPC and JAL). Decoding an instruction word is then a small number of
/// mask-and-lookup steps rather than a chain of nested `match` statements,
/// giving the single decode table referenced in the module budget.
pub struct Decoder<H> {
    root: Node<H>,
}

impl<H> Decoder<H> {
    pub fn new() -> Self {
        Self {
            root: Node::Branch {
                next_mask: mask(7),
                branches: HashMap::new(),
            },
        }
    }

    /// Register a handler keyed by opcode alone.
    pub fn register_opcode(&mut self, opcode: u32, handler: ExecFn<H>) {
        self.insert(&[(mask(7), opcode)], handler);
    }

    /// Register a handler keyed by opcode and funct3.
    pub fn register_funct3(&mut self, opcode: u32, funct3: u32, handler: ExecFn<H>) {
        self.insert(
            &[(mask(7), opcode), (mask(3) << 12, funct3 << 12)],
            handler,
        );
    }

    /// Register a handler keyed by opcode, funct3 and funct7.
    pub fn register_funct7(
        &mut self,
        opcode: u32,
        funct3: u32,
        funct7: u32,
        handler: ExecFn<H>,
    ) {
        self.insert(
            &[
                (mask(7), opcode),
                (mask(3) << 12, funct3 << 12),
                (mask(7) << 25, funct7 << 25),
            ],
            handler,
        );
    }

    fn insert(&mut self, steps: &[(u32, u32)], handler: ExecFn<H>) {
        let mut node = &mut self.root;
        for (i, (step_mask, step_value)) in steps.iter().enumerate() {
            let branches = match node {
                Node::Branch { next_mask, branches } => {
                    debug_assert_eq!(*next_mask, *step_mask);
                    branches
                }
                Node::Leaf(_) => panic!("conflicting decoder registration"),
            };
            let is_last = i + 1 == steps.len();
            node = branches.entry(*step_value).or_insert_with(|| {
                if is_last {
                    Node::Leaf(handler)
                } else {
                    Node::Branch {
                        next_mask: steps[i + 1].0,
                        branches: HashMap::new(),
                    }
                }
            });
        }
    }

    /// Decode `word` down to its handler, or report which field was
    /// unrecognized.
    pub fn decode(&self, word: u32) -> Result<ExecFn<H>, DecodeError> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(handler) => return Ok(*handler),
                Node::Branch { next_mask, branches } => {
                    let value = next_mask & word;
                    node = branches.get(&value).ok_or_else(|| {
                        self.classify_miss(word, *next_mask)
                    })?;
                }
            }
        }
    }

    fn classify_miss(&self, word: u32, failing_mask: u32) -> DecodeError {
        let op = opcode(word);
        if failing_mask == mask(7) {
            DecodeError::UnknownOpcode { opcode: op, word }
        } else if failing_mask == mask(3) << 12 {
            DecodeError::UnknownFunct3 {
                opcode: op,
                funct3: funct3(word),
                word,
            }
        } else {
            DecodeError::UnknownFunct7 {
                opcode: op,
                funct3: funct3(word),
                funct7: funct7(word),
                word,
            }
        }
    }
}

impl<H> Default for Decoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_addi_x10_x0_5() {
        // addi x10, x0, 5
        let w = 0x0050_0513;
        assert_eq!(opcode(w), 0x13);
        assert_eq!(rd(w), 10);
        assert_eq!(rs1(w), 0);
        assert_eq!(funct3(w), 0);
        assert_eq!(imm_i(w), 5);
    }

    #[test]
    fn imm_i_sign_extends() {
        // addi x10, x0, -1 (imm = 0xfff)
        let w = 0xfff0_0513;
        assert_eq!(imm_i(w), -1);
    }

    #[test]
    fn imm_s_round_trip() {
        // sw x2, -4(x1): funct7=imm[11:5], rd_field=imm[4:0]
        // Build manually: opcode STORE=0x23, funct3=2 (SW), rs1=1, rs2=2, imm=-4
        let imm: i32 = -4;
        let imm_u = (imm as u32) & 0xfff;
        let imm_lo = imm_u & 0x1f;
        let imm_hi = (imm_u >> 5) & 0x7f;
        let w = (imm_hi << 25) | (2 << 20) | (1 << 15) | (2 << 12) | (imm_lo << 7) | 0x23;
        assert_eq!(imm_s(w), -4);
    }

    #[test]
    fn imm_b_is_even_and_sign_extends() {
        // beq x10, x10, +8
        let w = 0x00a5_0463;
        assert_eq!(imm_b(w), 8);
    }

    #[test]
    fn imm_u_clears_low_bits() {
        let w = 0xffff_f0b7; // lui x1, 0xfffff
        assert_eq!(imm_u(w) as u32 & 0xfff, 0);
        assert_eq!(imm_u(w) as u32, 0xffff_f000);
    }

    #[test]
    fn imm_j_matches_jal_plus_8() {
        // jal x1, +8
        let w = 0x0080_00ef;
        assert_eq!(imm_j(w), 8);
    }

    #[test]
    fn shamt_is_five_bits() {
        // srai x1, x1, 31 -> funct7=0x20, shamt=31
        let w = (0x20u32 << 25) | (31 << 20) | (1 << 15) | (5 << 12) | (1 << 7) | 0x13;
        assert_eq!(shamt(w), 31);
    }

    #[derive(Default)]
    struct Dummy(u32);

    fn handler_a(d: &mut Dummy, _w: u32) -> Result<(), crate::hart::ExecutionError> {
        d.0 = 1;
        Ok(())
    }

    fn handler_b(d: &mut Dummy, _w: u32) -> Result<(), crate::hart::ExecutionError> {
        d.0 = 2;
        Ok(())
    }

    #[test]
    fn decoder_dispatches_by_opcode_alone() {
        let mut dec: Decoder<Dummy> = Decoder::new();
        dec.register_opcode(0x37, handler_a); // LUI
        let f = dec.decode(0x0000_0037).unwrap();
        let mut d = Dummy::default();
        f(&mut d, 0x0000_0037).unwrap();
        assert_eq!(d.0, 1);
    }

    #[test]
    fn decoder_dispatches_by_funct3() {
        let mut dec: Decoder<Dummy> = Decoder::new();
        dec.register_funct3(0x13, 0, handler_a); // ADDI
        dec.register_funct3(0x13, 4, handler_b); // XORI
        let w_xori = (4u32 << 12) | 0x13;
        let f = dec.decode(w_xori).unwrap();
        let mut d = Dummy::default();
        f(&mut d, w_xori).unwrap();
        assert_eq!(d.0, 2);
    }

    #[test]
    fn decoder_dispatches_by_funct7() {
        let mut dec: Decoder<Dummy> = Decoder::new();
        dec.register_funct7(0x33, 0, 0x00, handler_a); // ADD
        dec.register_funct7(0x33, 0, 0x20, handler_b); // SUB
        let w_sub = (0x20u32 << 25) | 0x33;
        let f = dec.decode(w_sub).unwrap();
        let mut d = Dummy::default();
        f(&mut d, w_sub).unwrap();
        assert_eq!(d.0, 2);
    }

    #[test]
    fn decoder_reports_unknown_opcode() {
        let dec: Decoder<Dummy> = Decoder::new();
        let err = dec.decode(0x0000_007f).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownOpcode { .. }));
    }

    #[test]
    fn decoder_reports_unknown_funct3() {
        let mut dec: Decoder<Dummy> = Decoder::new();
        dec.register_funct3(0x13, 0, handler_a);
        let w = (4u32 << 12) | 0x13;
        let err = dec.decode(w).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownFunct3 { .. }));
    }
}
