//! Data structures for instruction traces
//!
//! The header is read once before any instruction; instruction records are
//! produced lazily by [`crate::reader::TraceReader`].

use crate::error::GeneratorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trace-level metadata found before the first instruction record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceHeader {
    /// Generator/version records, one per tool that touched the trace
    #[serde(default)]
    pub trace_info: Vec<TraceInfo>,
    /// Declared content of the trace
    #[serde(default)]
    pub features: TraceFeatures,
    /// Instruction encoding mode at the start of the trace
    #[serde(default)]
    pub iem: Iem,
}

/// Generator and version record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceInfo {
    /// Generator name as written by the producing tool
    pub generator: String,
    /// Dotted version string of the generator
    #[serde(default)]
    pub version: String,
    /// Free-form comment
    #[serde(default)]
    pub comment: String,
}

impl TraceInfo {
    /// Resolve the generator name
    pub fn generator(&self) -> Result<TraceGenerator, GeneratorError> {
        TraceGenerator::from_name(&self.generator)
    }

    /// Parse the version into its numeric components
    ///
    /// A well-formed version has one to three dot-separated decimal parts.
    pub fn version_parts(&self) -> Option<Vec<u32>> {
        if self.version.is_empty() {
            return None;
        }
        let parts: Option<Vec<u32>> = self.version.split('.').map(|p| p.parse().ok()).collect();
        parts.filter(|p| (1..=3).contains(&p.len()))
    }
}

/// Known trace generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceGenerator {
    Qemu,
    Spike,
    Simics,
    Gem5,
    Sparta,
    StfTools,
}

impl TraceGenerator {
    /// Resolve a generator name, case-insensitively
    pub fn from_name(name: &str) -> Result<Self, GeneratorError> {
        match name.to_ascii_lowercase().as_str() {
            "qemu" => Ok(Self::Qemu),
            "spike" => Ok(Self::Spike),
            "simics" => Ok(Self::Simics),
            "gem5" => Ok(Self::Gem5),
            "sparta" => Ok(Self::Sparta),
            "stf_tools" | "stf-tools" => Ok(Self::StfTools),
            "" | "reserved" => Err(GeneratorError::Reserved),
            other => Err(GeneratorError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Qemu => "QEMU",
            Self::Spike => "SPIKE",
            Self::Simics => "SIMICS",
            Self::Gem5 => "GEM5",
            Self::Sparta => "SPARTA",
            Self::StfTools => "STF_TOOLS",
        }
    }
}

impl fmt::Display for TraceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single header feature flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceFeature {
    ContainPhysicalAddress,
    ContainDataAttribute,
    ContainOperandValue,
    ContainEvent,
    ContainSystemcallValue,
    ContainRv64,
    ContainIntDivOperandValue,
    ContainSamplingInfo,
    ContainPte,
    ContainSimpointInfo,
    ContainProcessId,
    ContainVec,
}

impl TraceFeature {
    /// Bit position used when the feature set is printed as a mask
    pub fn bit(&self) -> u64 {
        1 << (*self as u64)
    }
}

/// Set of features declared by the trace header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceFeatures(Vec<TraceFeature>);

impl TraceFeatures {
    pub fn new(features: impl IntoIterator<Item = TraceFeature>) -> Self {
        Self(features.into_iter().collect())
    }

    pub fn has_feature(&self, feature: TraceFeature) -> bool {
        self.0.contains(&feature)
    }

    /// Feature set as a bit mask
    pub fn bits(&self) -> u64 {
        self.0.iter().fold(0, |acc, f| acc | f.bit())
    }
}

/// Instruction encoding mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iem {
    Rv32,
    #[default]
    Rv64,
}

/// Identity of a simulated hardware thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadIdentity {
    pub tid: u32,
    pub pid: u32,
    pub asid: u32,
}

impl ThreadIdentity {
    pub fn new(tid: u32, pid: u32, asid: u32) -> Self {
        Self { tid, pid, asid }
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid={} pid={} asid={}", self.tid, self.pid, self.asid)
    }
}

/// Direction of a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

/// A memory access performed by one instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAccess {
    pub kind: AccessKind,
    /// Virtual address
    pub address: u64,
    /// Access size in bytes
    pub size: u32,
    /// Access attribute field; zero means no attribute record was written
    #[serde(default)]
    pub attr: u16,
    /// Physical address, present only when the producer recorded a translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paddr: Option<u64>,
}

impl MemoryAccess {
    pub fn is_phys_addr_valid(&self) -> bool {
        self.paddr.is_some()
    }
}

/// Register named by an operand record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    Gpr(u8),
    Fpr(u8),
    Vr(u8),
    Csr(u16),
}

impl Register {
    /// Vector length CSR
    pub const CSR_VL: Register = Register::Csr(0xc20);
}

/// Whether an operand is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandRole {
    Source,
    Dest,
}

/// Operand value recorded alongside an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub role: OperandRole,
    pub reg: Register,
    pub value: u64,
}

/// Kinds of events attached to an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InstAddrMisaligned,
    InstAccessFault,
    IllegalInst,
    Breakpoint,
    LoadAddrMisaligned,
    LoadAccessFault,
    StoreAddrMisaligned,
    StoreAccessFault,
    UserEcall,
    SupervisorEcall,
    MachineEcall,
    InstPageFault,
    LoadPageFault,
    StorePageFault,
    Interrupt,
    ModeChange,
}

/// Fault, abort or interrupt associated with an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default)]
    pub data: Vec<u64>,
}

/// Page-table entry embedded in the instruction stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTableEntry {
    pub vaddr: u64,
    pub paddr: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    4096
}

/// One decoded instruction record of the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    /// 1-based position in the trace, assigned by the reader
    #[serde(default)]
    pub index: u64,
    /// Program counter (virtual)
    pub pc: u64,
    /// Raw opcode bits
    pub opcode: u32,
    /// Encoding width in bytes (2 for compressed encodings)
    ///
    /// Zero when the producer left it out; the width then follows from the
    /// opcode's low bits, see [`InstructionRecord::encoding_width`].
    #[serde(default)]
    pub opcode_size: u8,
    /// Set by the producer when the opcode is not a valid instruction
    #[serde(default)]
    pub invalid: bool,
    /// Branch was taken (a PC target was recorded)
    #[serde(default)]
    pub taken: bool,
    /// Vector instruction
    #[serde(default)]
    pub vector: bool,
    /// Instruction switched the hart into user mode
    #[serde(default)]
    pub change_to_user_mode: bool,
    /// Encoding mode switch taking effect at this instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iem: Option<Iem>,
    /// Physical PC, when the producer recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phys_pc: Option<u64>,
    #[serde(default)]
    pub tid: u32,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub asid: u32,
    #[serde(default)]
    pub memory_accesses: Vec<MemoryAccess>,
    #[serde(default)]
    pub operands: Vec<Operand>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub embedded_ptes: Vec<PageTableEntry>,
}

impl InstructionRecord {
    /// Create a record with the given PC and opcode and no side effects
    pub fn new(pc: u64, opcode: u32) -> Self {
        Self {
            index: 0,
            pc,
            opcode,
            opcode_size: Self::encoding_width(opcode),
            invalid: false,
            taken: false,
            vector: false,
            change_to_user_mode: false,
            iem: None,
            phys_pc: None,
            tid: 0,
            pid: 0,
            asid: 0,
            memory_accesses: Vec::new(),
            operands: Vec::new(),
            events: Vec::new(),
            embedded_ptes: Vec::new(),
        }
    }

    /// Width implied by an opcode: 4 when both low bits are set, else 2
    pub fn encoding_width(opcode: u32) -> u8 {
        if opcode & 0b11 == 0b11 {
            4
        } else {
            2
        }
    }

    /// Recorded width, or the one implied by the opcode when none was recorded
    pub fn opcode_width(&self) -> u8 {
        match self.opcode_size {
            0 => Self::encoding_width(self.opcode),
            size => size,
        }
    }

    pub fn thread_identity(&self) -> ThreadIdentity {
        ThreadIdentity::new(self.tid, self.pid, self.asid)
    }

    pub fn is_opcode16(&self) -> bool {
        self.opcode_width() == 2
    }

    pub fn is_taken_branch(&self) -> bool {
        self.taken
    }

    pub fn is_change_to_user_mode(&self) -> bool {
        self.change_to_user_mode
    }

    pub fn memory_reads(&self) -> impl Iterator<Item = &MemoryAccess> {
        self.memory_accesses.iter().filter(|a| a.kind == AccessKind::Read)
    }

    pub fn memory_writes(&self) -> impl Iterator<Item = &MemoryAccess> {
        self.memory_accesses.iter().filter(|a| a.kind == AccessKind::Write)
    }

    pub fn source_operands(&self) -> impl Iterator<Item = &Operand> {
        self.operands.iter().filter(|o| o.role == OperandRole::Source)
    }

    /// A vector instruction whose VL source operand is zero performs no accesses
    pub fn is_vl_zero(&self) -> bool {
        if !self.vector {
            return false;
        }
        self.source_operands()
            .find(|op| op.reg == Register::CSR_VL)
            .map(|op| op.value == 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_from_json() {
        let record: InstructionRecord =
            serde_json::from_str(r#"{"pc": 4096, "opcode": 19}"#).unwrap();

        assert_eq!(record.pc, 0x1000);
        assert_eq!(record.opcode_width(), 4);
        assert!(!record.invalid);
        assert!(record.memory_accesses.is_empty());
        assert_eq!(record.thread_identity(), ThreadIdentity::default());
    }

    #[test]
    fn test_compressed_width_from_opcode() {
        assert!(InstructionRecord::new(0x1000, 0x4501).is_opcode16());
        assert!(!InstructionRecord::new(0x1000, 0x0000_0013).is_opcode16());
    }

    #[test]
    fn test_json_width_matches_constructor() {
        let compressed: InstructionRecord =
            serde_json::from_str(r#"{"pc": 4096, "opcode": 17665}"#).unwrap();
        assert_eq!(compressed.opcode_size, 0);
        assert!(compressed.is_opcode16());
        assert_eq!(
            compressed.opcode_width(),
            InstructionRecord::new(0x1000, 0x4501).opcode_width()
        );

        // An explicit width wins over the opcode bits
        let explicit: InstructionRecord =
            serde_json::from_str(r#"{"pc": 4096, "opcode": 17665, "opcode_size": 4}"#).unwrap();
        assert!(!explicit.is_opcode16());
    }

    #[test]
    fn test_vl_zero_requires_vector_and_vl_operand() {
        let mut record = InstructionRecord::new(0x1000, 0x0200_7007);
        record.operands.push(Operand {
            role: OperandRole::Source,
            reg: Register::CSR_VL,
            value: 0,
        });
        assert!(!record.is_vl_zero(), "scalar records are never VL-zero");

        record.vector = true;
        assert!(record.is_vl_zero());

        record.operands[0].value = 8;
        assert!(!record.is_vl_zero());

        record.operands.clear();
        assert!(!record.is_vl_zero());
    }

    #[test]
    fn test_version_parts() {
        let mut info = TraceInfo {
            generator: "spike".to_string(),
            version: "1.2.3".to_string(),
            comment: String::new(),
        };
        assert_eq!(info.version_parts(), Some(vec![1, 2, 3]));

        info.version = "1.x".to_string();
        assert_eq!(info.version_parts(), None);

        info.version = String::new();
        assert_eq!(info.version_parts(), None);
    }

    #[test]
    fn test_generator_names() {
        assert_eq!(TraceGenerator::from_name("QEMU"), Ok(TraceGenerator::Qemu));
        assert_eq!(TraceGenerator::from_name(""), Err(GeneratorError::Reserved));
        assert_eq!(
            TraceGenerator::from_name("bochs"),
            Err(GeneratorError::Unknown("bochs".to_string()))
        );
        assert_eq!(
            GeneratorError::Unknown("bochs".to_string()).to_string(),
            "unknown trace generator 'bochs'"
        );
    }

    #[test]
    fn test_feature_bits() {
        let features = TraceFeatures::new([
            TraceFeature::ContainPhysicalAddress,
            TraceFeature::ContainRv64,
        ]);
        assert!(features.has_feature(TraceFeature::ContainRv64));
        assert!(!features.has_feature(TraceFeature::ContainPte));
        assert_eq!(features.bits(), 0b10_0001);
    }
}
