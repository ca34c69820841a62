//! Violation taxonomy and run status

use std::fmt;
use std::str::FromStr;

/// Kinds of trace violations
///
/// The numeric value of each code is the process exit status reported when
/// it is the only violation of a run. Values 7, 8 and 10 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    InvalidPc32,
    InvalidPc16,
    Header,
    InvalidInst,
    EmbedPte,
    /// Benign physical address zero; downgraded to a pass at verdict time
    PaEqZero,
    PhysAddr,
    Rv64Insts,
    DecoderFailure,
    MissMemLoad,
    MissMemStore,
    MemPointToZero,
    MemAttr,
    UncondBranch,
    SwitchUser,
    IneffMemAccess,
}

impl ErrorCode {
    pub const COUNT: usize = 16;

    pub const ALL: [ErrorCode; Self::COUNT] = [
        ErrorCode::InvalidPc32,
        ErrorCode::InvalidPc16,
        ErrorCode::Header,
        ErrorCode::InvalidInst,
        ErrorCode::EmbedPte,
        ErrorCode::PaEqZero,
        ErrorCode::PhysAddr,
        ErrorCode::Rv64Insts,
        ErrorCode::DecoderFailure,
        ErrorCode::MissMemLoad,
        ErrorCode::MissMemStore,
        ErrorCode::MemPointToZero,
        ErrorCode::MemAttr,
        ErrorCode::UncondBranch,
        ErrorCode::SwitchUser,
        ErrorCode::IneffMemAccess,
    ];

    /// Exit status value
    pub fn value(&self) -> u8 {
        match self {
            ErrorCode::InvalidPc32 => 1,
            ErrorCode::InvalidPc16 => 2,
            ErrorCode::Header => 3,
            ErrorCode::InvalidInst => 4,
            ErrorCode::EmbedPte => 5,
            ErrorCode::PaEqZero => 6,
            ErrorCode::PhysAddr => 9,
            ErrorCode::Rv64Insts => 11,
            ErrorCode::DecoderFailure => 12,
            ErrorCode::MissMemLoad => 13,
            ErrorCode::MissMemStore => 14,
            ErrorCode::MemPointToZero => 15,
            ErrorCode::MemAttr => 16,
            ErrorCode::UncondBranch => 17,
            ErrorCode::SwitchUser => 18,
            ErrorCode::IneffMemAccess => 19,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPc32 => "INVALID_PC_32",
            ErrorCode::InvalidPc16 => "INVALID_PC_16",
            ErrorCode::Header => "HEADER",
            ErrorCode::InvalidInst => "INVALID_INST",
            ErrorCode::EmbedPte => "EMBED_PTE",
            ErrorCode::PaEqZero => "PA_EQ_0",
            ErrorCode::PhysAddr => "PHYS_ADDR",
            ErrorCode::Rv64Insts => "RV64_INSTS",
            ErrorCode::DecoderFailure => "DECODER_FAILURE",
            ErrorCode::MissMemLoad => "MISS_MEM_LOAD",
            ErrorCode::MissMemStore => "MISS_MEM_STR",
            ErrorCode::MemPointToZero => "MEM_POINT_TO_ZERO",
            ErrorCode::MemAttr => "MEM_ATTR",
            ErrorCode::UncondBranch => "UNCOND_BR",
            ErrorCode::SwitchUser => "SWITCH_USR",
            ErrorCode::IneffMemAccess => "INEFF_MEM_ACC",
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.value() == value)
    }

    /// Position in [`ErrorCode::ALL`], used to index counter tables
    pub(crate) fn slot(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown error code given on the command line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code '{0}'")]
pub struct ParseErrorCodeError(String);

impl FromStr for ErrorCode {
    type Err = ParseErrorCodeError;

    /// Accepts the numeric exit value or the code name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u8>() {
            return Self::from_value(value).ok_or_else(|| ParseErrorCodeError(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseErrorCodeError(s.to_string()))
    }
}

/// Outcome of a run as tracked by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnStatus {
    #[default]
    Pass,
    Failed(ErrorCode),
    MultipleErrors,
}

impl ReturnStatus {
    pub const MULTIPLE_ERRORS_EXIT: u8 = 255;

    pub fn exit_code(&self) -> u8 {
        match self {
            ReturnStatus::Pass => 0,
            ReturnStatus::Failed(code) => code.value(),
            ReturnStatus::MultipleErrors => Self::MULTIPLE_ERRORS_EXIT,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ReturnStatus::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_unique() {
        let mut values: Vec<u8> = ErrorCode::ALL.iter().map(|c| c.value()).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), ErrorCode::ALL.len());
        assert!(!values.contains(&0));
        assert!(!values.contains(&ReturnStatus::MULTIPLE_ERRORS_EXIT));
    }

    #[test]
    fn test_slots_follow_all_order() {
        for (i, code) in ErrorCode::ALL.iter().enumerate() {
            assert_eq!(code.slot(), i);
        }
    }

    #[test]
    fn test_parse_by_name_and_value() {
        assert_eq!("MISS_MEM_LOAD".parse::<ErrorCode>(), Ok(ErrorCode::MissMemLoad));
        assert_eq!("uncond_br".parse::<ErrorCode>(), Ok(ErrorCode::UncondBranch));
        assert_eq!("9".parse::<ErrorCode>(), Ok(ErrorCode::PhysAddr));
        assert!("7".parse::<ErrorCode>().is_err());
        assert!("BOGUS".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ReturnStatus::Pass.exit_code(), 0);
        assert_eq!(ReturnStatus::Failed(ErrorCode::Header).exit_code(), 3);
        assert_eq!(ReturnStatus::MultipleErrors.exit_code(), 255);
    }
}
