use crate::error::CoreError;
use crate::instruction::{Instruction, Program};
use crate::memory::{Memory, Mode};
use crate::opcode::{Op, SyscallVariant};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Data,
    Code,
}

/// Parses the textual program/data file format spec §4.2 and §6 describe —
/// there is no binary form, the text format *is* the instruction encoding.
pub struct Loader;

impl Loader {
    /// Loads a program from disk. Wraps I/O failures in [`CoreError::Io`]
    /// and delegates parsing to [`Loader::load_str`].
    pub fn load_file(path: impl AsRef<Path>) -> Result<(Memory, Program), CoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::load_str(&text, &path.display().to_string())
    }

    /// Parses already-loaded source text. `path` is only used to annotate
    /// diagnostics (`path:line: reason`); pass `"<memory>"` for in-memory
    /// fixtures.
    pub fn load_str(text: &str, path: &str) -> Result<(Memory, Program), CoreError> {
        let mut memory = Memory::new();
        let mut program = Program::new();
        let mut section = Section::None;

        for (lineno, raw_line) in text.lines().enumerate() {
            let lineno = lineno + 1;
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            };
            let line = line.trim_start();
            if line.is_empty() {
                continue;
            }

            let lower = line.to_ascii_lowercase();
            if lower.starts_with("begin data section") {
                section = Section::Data;
                continue;
            }
            if lower.starts_with("end data section") {
                section = Section::None;
                continue;
            }
            if lower.starts_with("begin instruction section") {
                section = Section::Code;
                continue;
            }
            if lower.starts_with("end instruction section") {
                section = Section::None;
                continue;
            }

            match section {
                Section::None => continue,
                Section::Data => Self::load_data_line(&mut memory, line, path, lineno)?,
                Section::Code => Self::load_code_line(&mut program, line, path, lineno)?,
            }
        }

        Ok((memory, program))
    }

    fn fail(path: &str, line: usize, reason: impl Into<String>) -> CoreError {
        CoreError::Loader {
            path: path.to_string(),
            line,
            reason: reason.into(),
        }
    }

    fn load_data_line(memory: &mut Memory, line: &str, path: &str, lineno: usize) -> Result<(), CoreError> {
        let mut tokens = line.split_whitespace();
        let addr: i64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Self::fail(path, lineno, "invalid data line"))?;
        let value: i64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Self::fail(path, lineno, "invalid data line"))?;
        // Anything past the two integers is ignored, matching the
        // reference loader's `sscanf(line, "%ld %ld", &addr, &val)`.
        memory
            .write(Mode::Kernel, addr, value)
            .map_err(|e| Self::fail(path, lineno, e.to_string()))
    }

    fn load_code_line(program: &mut Program, line: &str, path: &str, lineno: usize) -> Result<(), CoreError> {
        let mut tokens = line.split_whitespace();
        let idx: i64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Self::fail(path, lineno, "invalid instruction line"))?;
        let mnemonic = tokens
            .next()
            .ok_or_else(|| Self::fail(path, lineno, "invalid instruction line"))?;

        if idx < program.len() as i64 {
            return Err(Self::fail(path, lineno, "duplicate or out-of-order index"));
        }
        while idx > program.len() as i64 {
            program.push_filler();
        }

        let op = Op::parse(mnemonic).ok_or_else(|| Self::fail(path, lineno, format!("unknown opcode '{mnemonic}'")))?;

        let (a, b) = if op == Op::Syscall {
            let variant_tok = tokens
                .next()
                .ok_or_else(|| Self::fail(path, lineno, "SYSCALL needs a variant"))?;
            let variant = SyscallVariant::parse(variant_tok)
                .ok_or_else(|| Self::fail(path, lineno, format!("unknown SYSCALL variant '{variant_tok}'")))?;
            let rest: Vec<&str> = tokens.collect();
            if rest.len() != variant.operand_count() {
                return Err(Self::fail(
                    path,
                    lineno,
                    format!("SYSCALL {variant} needs {} operand(s)", variant.operand_count()),
                ));
            }
            match variant {
                SyscallVariant::Prn => {
                    let addr: i64 = rest[0]
                        .parse()
                        .map_err(|_| Self::fail(path, lineno, "invalid SYSCALL PRN operand"))?;
                    (variant.sub_code(), addr)
                }
                SyscallVariant::Yield | SyscallVariant::Hlt => (variant.sub_code(), 0),
            }
        } else {
            let need = op.operand_count();
            let rest: Vec<&str> = tokens.collect();
            if rest.len() != need {
                return Err(Self::fail(path, lineno, "wrong number of operands"));
            }
            let mut values = [0i64; 2];
            for (slot, tok) in values.iter_mut().zip(rest.iter()) {
                *slot = tok
                    .parse()
                    .map_err(|_| Self::fail(path, lineno, format!("invalid operand '{tok}'")))?;
            }
            (values[0], values[1])
        };

        program.push(Instruction::new(op, a, b));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_hlt() {
        let text = "\
Begin Instruction Section
0 SET 42 1000
1 HLT
End Instruction Section
";
        let (_, program) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.get(0).unwrap(), Instruction::new(Op::Set, 42, 1000));
        assert_eq!(program.get(1).unwrap(), Instruction::new(Op::Hlt, 0, 0));
    }

    #[test]
    fn gap_is_padded_with_set_zero_zero() {
        let text = "\
Begin Instruction Section
0 HLT
2 HLT
End Instruction Section
";
        let (_, program) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.get(1).unwrap(), Instruction::new(Op::Set, 0, 0));
    }

    #[test]
    fn out_of_order_index_fails() {
        let text = "\
Begin Instruction Section
1 HLT
0 HLT
End Instruction Section
";
        assert!(Loader::load_str(text, "<memory>").is_err());
    }

    #[test]
    fn data_section_writes_cells() {
        let text = "\
Begin Data Section
1000 7
1001 1002
End Data Section
";
        let (memory, _) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(memory.read(Mode::Kernel, 1000).unwrap(), 7);
        assert_eq!(memory.read(Mode::Kernel, 1001).unwrap(), 1002);
    }

    #[test]
    fn data_line_ignores_trailing_tokens() {
        let text = "\
Begin Data Section
1000 7 99
End Data Section
";
        let (memory, _) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(memory.read(Mode::Kernel, 1000).unwrap(), 7);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\
# a comment
Begin Instruction Section
# another comment
0 HLT # trailing comment
End Instruction Section
";
        let (_, program) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn syscall_prn_encodes_sub_code_two() {
        let text = "\
Begin Instruction Section
0 SYSCALL PRN 2000
End Instruction Section
";
        let (_, program) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(program.get(0).unwrap(), Instruction::new(Op::Syscall, 2, 2000));
    }

    #[test]
    fn syscall_yield_and_hlt_sub_codes() {
        let text = "\
Begin Instruction Section
0 SYSCALL YIELD
1 SYSCALL HLT
End Instruction Section
";
        let (_, program) = Loader::load_str(text, "<memory>").unwrap();
        assert_eq!(program.get(0).unwrap(), Instruction::new(Op::Syscall, 0, 0));
        assert_eq!(program.get(1).unwrap(), Instruction::new(Op::Syscall, 1, 0));
    }

    #[test]
    fn unknown_syscall_variant_fails() {
        let text = "\
Begin Instruction Section
0 SYSCALL NAP
End Instruction Section
";
        assert!(Loader::load_str(text, "<memory>").is_err());
    }

    #[test]
    fn wrong_operand_count_fails() {
        let text = "\
Begin Instruction Section
0 SET 1
End Instruction Section
";
        assert!(Loader::load_str(text, "<memory>").is_err());
    }

    #[test]
    fn unknown_mnemonic_fails() {
        let text = "\
Begin Instruction Section
0 NOPE 1 2
End Instruction Section
";
        assert!(Loader::load_str(text, "<memory>").is_err());
    }

    #[test]
    fn load_file_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write as _;
        writeln!(file, "Begin Instruction Section").unwrap();
        writeln!(file, "0 HLT").unwrap();
        writeln!(file, "End Instruction Section").unwrap();
        let (_, program) = Loader::load_file(file.path()).unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Loader::load_file("/nonexistent/path/to/a/program.gtu").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
