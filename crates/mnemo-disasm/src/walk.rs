//! Streaming buffer walker.
//!
//! Drives any [`Disassembler`] over a byte buffer: embedded data regions
//! are rendered as directives, everything else is decoded one instruction
//! at a time and handed to the caller's callback.

use crate::{DecodeError, Disassembler};

/// Returned by the walk callback to continue or end the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkControl {
    #[default]
    Continue,
    Stop,
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every byte of the buffer was consumed.
    Completed,
    /// The callback asked to stop after the line at `address`.
    Stopped { address: u64 },
    /// The instruction at `address` needs more bytes than remain.
    Incomplete {
        address: u64,
        needed: usize,
        available: usize,
    },
}

/// Walks `bytes` starting at address `base`.
///
/// The decoder's cross-instruction state is reset first. Each step reports
/// `(address, text)`; the walk ends when the buffer is consumed, the
/// callback returns [`WalkControl::Stop`], the remaining bytes are too few
/// for the next instruction, or an encoding is architecturally invalid
/// (returned as `Err`).
pub fn walk<D, F>(
    disasm: &mut D,
    bytes: &[u8],
    base: u64,
    mut callback: F,
) -> Result<WalkOutcome, DecodeError>
where
    D: Disassembler + ?Sized,
    F: FnMut(u64, &str) -> WalkControl,
{
    disasm.reset();
    log::debug!(
        "{}: walking {} bytes at {:#x}",
        disasm.architecture(),
        bytes.len(),
        base
    );

    let mut offset = 0;
    while offset < bytes.len() {
        let address = base + offset as u64;
        let remaining = &bytes[offset..];
        disasm.prepare(address);

        let (text, size) = match disasm.data_at(address) {
            Some(left) => {
                let size = left.clamp(1, 4).min(remaining.len());
                let text = disasm.render_data(&remaining[..size], address);
                log::trace!("{:#x}: {} data bytes", address, size);
                (text, size)
            }
            None => {
                let needed = disasm.instruction_size(remaining);
                if remaining.len() < needed {
                    log::debug!(
                        "{:#x}: instruction needs {} bytes, {} left",
                        address,
                        needed,
                        remaining.len()
                    );
                    return Ok(WalkOutcome::Incomplete {
                        address,
                        needed,
                        available: remaining.len(),
                    });
                }
                match disasm.decode_instruction(remaining, address) {
                    Ok(decoded) => (decoded.text, decoded.size),
                    Err(DecodeError::Truncated {
                        needed, available, ..
                    }) => {
                        return Ok(WalkOutcome::Incomplete {
                            address,
                            needed,
                            available,
                        })
                    }
                    Err(err) => {
                        log::warn!("walk ended at {:#x}: {}", address, err);
                        return Err(err);
                    }
                }
            }
        };

        offset += size.max(1);
        if callback(address, &text) == WalkControl::Stop {
            log::debug!("walk stopped by caller at {:#x}", address);
            return Ok(WalkOutcome::Stopped { address });
        }
    }

    log::debug!("walk completed at {:#x}", base + offset as u64);
    Ok(WalkOutcome::Completed)
}

#[cfg(all(test, feature = "riscv"))]
mod tests {
    use super::*;
    use crate::RiscVDisassembler;

    fn collect(bytes: &[u8]) -> (Vec<(u64, String)>, WalkOutcome) {
        let mut lines = Vec::new();
        let outcome = walk(&mut RiscVDisassembler::new(), bytes, 0x1000, |address, text| {
            lines.push((address, text.to_string()));
            WalkControl::Continue
        })
        .unwrap();
        (lines, outcome)
    }

    #[test]
    fn test_truncated_tail_is_incomplete() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0000_0013u32.to_le_bytes());
        bytes.extend_from_slice(&0x0000_8067u32.to_le_bytes());
        bytes.extend_from_slice(&[0x13, 0x00]);

        let (lines, outcome) = collect(&bytes);
        assert_eq!(
            lines,
            vec![(0x1000, "nop".to_string()), (0x1004, "ret".to_string())]
        );
        assert_eq!(
            outcome,
            WalkOutcome::Incomplete {
                address: 0x1008,
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_empty_buffer_completes() {
        let (lines, outcome) = collect(&[]);
        assert!(lines.is_empty());
        assert_eq!(outcome, WalkOutcome::Completed);
    }
}
