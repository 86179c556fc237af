use std::fmt;

/// The closed set of operations the decoder recognizes, modeled as a tagged
/// sum per spec §9 — the decoder is the single source of truth for operand
/// counts, both the loader and the interpreter read `operand_count`/mnemonic
/// text off of it rather than duplicating the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set,
    Cpy,
    Cpyi,
    Cpyi2,
    Add,
    Addi,
    Subi,
    Jif,
    Push,
    Pop,
    Call,
    Ret,
    Hlt,
    User,
    Syscall,
}

impl Op {
    /// Mnemonic text (case-sensitive, uppercase) → opcode. Unknown text
    /// yields `None`, which the loader turns into a fatal unknown-mnemonic
    /// error.
    pub fn parse(mnemonic: &str) -> Option<Op> {
        Some(match mnemonic {
            "SET" => Op::Set,
            "CPY" => Op::Cpy,
            "CPYI" => Op::Cpyi,
            "CPYI2" => Op::Cpyi2,
            "ADD" => Op::Add,
            "ADDI" => Op::Addi,
            "SUBI" => Op::Subi,
            "JIF" => Op::Jif,
            "PUSH" => Op::Push,
            "POP" => Op::Pop,
            "CALL" => Op::Call,
            "RET" => Op::Ret,
            "HLT" => Op::Hlt,
            "USER" => Op::User,
            "SYSCALL" => Op::Syscall,
            _ => return None,
        })
    }

    /// Number of plain integer operands this opcode takes on an instruction
    /// line. `Syscall` is special-cased by the loader (its operands are a
    /// variant keyword, not two bare integers) and is never queried here.
    pub fn operand_count(self) -> usize {
        match self {
            Op::Hlt | Op::Ret => 0,
            Op::Push | Op::Pop | Op::Call | Op::User => 1,
            Op::Set | Op::Cpy | Op::Cpyi | Op::Cpyi2 | Op::Add | Op::Addi | Op::Subi | Op::Jif => 2,
            Op::Syscall => 2,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Op::Set => "SET",
            Op::Cpy => "CPY",
            Op::Cpyi => "CPYI",
            Op::Cpyi2 => "CPYI2",
            Op::Add => "ADD",
            Op::Addi => "ADDI",
            Op::Subi => "SUBI",
            Op::Jif => "JIF",
            Op::Push => "PUSH",
            Op::Pop => "POP",
            Op::Call => "CALL",
            Op::Ret => "RET",
            Op::Hlt => "HLT",
            Op::User => "USER",
            Op::Syscall => "SYSCALL",
        };
        write!(f, "{mnemonic}")
    }
}

/// `SYSCALL` sub-mnemonics and their encoding into an instruction's `(a, b)`
/// operands (spec §4.2). The numbering (YIELD=0, HLT=1, PRN=2) is preserved
/// exactly because kernel dispatcher images written against this VM depend
/// on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallVariant {
    Yield,
    Hlt,
    Prn,
}

impl SyscallVariant {
    pub fn parse(variant: &str) -> Option<SyscallVariant> {
        Some(match variant.to_ascii_uppercase().as_str() {
            "YIELD" => SyscallVariant::Yield,
            "HLT" => SyscallVariant::Hlt,
            "PRN" => SyscallVariant::Prn,
            _ => return None,
        })
    }

    pub fn operand_count(self) -> usize {
        match self {
            SyscallVariant::Yield | SyscallVariant::Hlt => 0,
            SyscallVariant::Prn => 1,
        }
    }

    /// The sub-code value written into `mem[4]` on trap.
    pub fn sub_code(self) -> i64 {
        match self {
            SyscallVariant::Yield => 0,
            SyscallVariant::Hlt => 1,
            SyscallVariant::Prn => 2,
        }
    }
}

impl fmt::Display for SyscallVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyscallVariant::Yield => "YIELD",
            SyscallVariant::Hlt => "HLT",
            SyscallVariant::Prn => "PRN",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_mnemonic() {
        assert_eq!(Op::parse("SET"), Some(Op::Set));
        assert_eq!(Op::parse("SYSCALL"), Some(Op::Syscall));
        assert_eq!(Op::parse("NOPE"), None);
    }

    #[test]
    fn operand_counts_match_spec_table() {
        assert_eq!(Op::Hlt.operand_count(), 0);
        assert_eq!(Op::Ret.operand_count(), 0);
        assert_eq!(Op::Push.operand_count(), 1);
        assert_eq!(Op::User.operand_count(), 1);
        assert_eq!(Op::Jif.operand_count(), 2);
        assert_eq!(Op::Cpyi2.operand_count(), 2);
    }

    #[test]
    fn syscall_sub_codes_preserve_numbering() {
        assert_eq!(SyscallVariant::Yield.sub_code(), 0);
        assert_eq!(SyscallVariant::Hlt.sub_code(), 1);
        assert_eq!(SyscallVariant::Prn.sub_code(), 2);
    }
}
