//! The fixed stdout banner and register dump, byte-for-byte per spec.md §6.

use std::fmt;

use crate::hart::Hart;

/// Printed once, before execution begins, per spec.md §6's memory-size
/// lines.
pub struct SizesBanner {
    pub instr_mem_len: usize,
    pub data_image_len: usize,
}

impl fmt::Display for SizesBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "C Praktikum")?;
        writeln!(f, "HU Risc-V  Emulator 2022")?;
        writeln!(f, "size of instruction memory: {} Byte", self.instr_mem_len)?;
        writeln!(f)?;
        writeln!(f, "read data for data memory: {} Byte", self.data_image_len)?;
        writeln!(f)
    }
}

/// Printed once, after the step loop ends, dumping the final register file
/// in uppercase hex without a `0x` prefix or leading zeros (spec.md §6).
pub struct RegfileReport<'a> {
    hart: &'a Hart,
}

impl<'a> RegfileReport<'a> {
    pub fn new(hart: &'a Hart) -> Self {
        Self { hart }
    }
}

impl fmt::Display for RegfileReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "-----------------------RISC-V program terminate------------------------"
        )?;
        writeln!(f, "Regfile values:")?;
        for (i, value) in self.hart.registers.all().iter().enumerate() {
            writeln!(f, "{i}: {value:X}")?;
        }
        Ok(())
    }
}
