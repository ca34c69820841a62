//! Header and post-scan checks
//!
//! These compare what the trace header claims against what the scan
//! actually observed.

use crate::error_code::ErrorCode;
use crate::rules::{ScanCounters, Violation};
use stf_trace::{TraceFeature, TraceHeader};

/// Validate the trace-info records of the header
///
/// Every record needs a known generator and a well-formed version, and at
/// least one record must be present.
pub fn check_header(header: &TraceHeader) -> Vec<Violation> {
    if header.trace_info.is_empty() {
        return vec![Violation::new(
            ErrorCode::Header,
            "Trace info record is missing",
        )];
    }

    let mut violations = Vec::new();
    for info in &header.trace_info {
        if let Err(e) = info.generator() {
            violations.push(Violation::new(
                ErrorCode::Header,
                format!("Invalid trace info record found: {}", e),
            ));
            continue;
        }
        if info.version_parts().is_none() {
            violations.push(Violation::new(
                ErrorCode::Header,
                format!(
                    "Invalid trace info record found: malformed generator version '{}'",
                    info.version
                ),
            ));
        }
    }
    violations
}

/// Physical-address feature flag against PA and physical PC evidence
pub fn check_physical_addresses(header: &TraceHeader, counters: &ScanCounters) -> Vec<Violation> {
    let mut violations = Vec::new();

    if header.features.has_feature(TraceFeature::ContainPhysicalAddress) {
        if counters.physical_addresses == 0 {
            violations.push(Violation::new(
                ErrorCode::PhysAddr,
                "STF_CONTAIN_PHYSICAL_ADDRESS set, but no PAs found",
            ));
        }
        if counters.physical_pcs == 0 {
            violations.push(Violation::new(
                ErrorCode::PhysAddr,
                "STF_CONTAIN_PHYSICAL_ADDRESS set, but no INST PHYS PC found",
            ));
        }
    } else {
        if counters.physical_addresses > 0 {
            violations.push(Violation::new(
                ErrorCode::PhysAddr,
                format!(
                    "STF_CONTAIN_PHYSICAL_ADDRESS not set, but {} PAs are present",
                    counters.physical_addresses
                ),
            ));
        }
        if counters.physical_pcs > 0 {
            violations.push(Violation::new(
                ErrorCode::PhysAddr,
                format!(
                    "STF_CONTAIN_PHYSICAL_ADDRESS not set, but {} INST PHYS PCs are present",
                    counters.physical_pcs
                ),
            ));
        }
    }

    violations
}

/// Embedded PTE feature flag against the embedded PTE tally
pub fn check_embedded_ptes(header: &TraceHeader, counters: &ScanCounters) -> Vec<Violation> {
    let declared = header.features.has_feature(TraceFeature::ContainPte);
    match (declared, counters.embedded_ptes) {
        (true, 0) => vec![Violation::new(
            ErrorCode::EmbedPte,
            "STF_CONTAIN_PTE set, but no PTEs found",
        )],
        (false, n) if n > 0 => vec![Violation::new(
            ErrorCode::EmbedPte,
            format!("STF_CONTAIN_PTE not set, but {} PTEs are present", n),
        )],
        _ => Vec::new(),
    }
}

/// RV64 feature flag against the encoding modes seen during the scan
pub fn check_rv64(header: &TraceHeader, counters: &ScanCounters) -> Vec<Violation> {
    let declared = header.features.has_feature(TraceFeature::ContainRv64);
    match (declared, counters.has_rv64) {
        (false, true) => vec![Violation::new(
            ErrorCode::Rv64Insts,
            "STF_CONTAIN_RV64 not set, but RV64 instructions are present",
        )],
        (true, false) => vec![Violation::new(
            ErrorCode::Rv64Insts,
            "STF_CONTAIN_RV64 set, but no RV64 instructions are present",
        )],
        _ => Vec::new(),
    }
}

/// Reports the split-access tally once for the whole trace
pub fn check_inefficient_accesses(counters: &ScanCounters) -> Vec<Violation> {
    if counters.inefficient_accesses == 0 {
        return Vec::new();
    }
    vec![Violation::new(
        ErrorCode::IneffMemAccess,
        format!(
            "There are {} instructions that have inefficient memory access record.",
            counters.inefficient_accesses
        ),
    )]
}

/// All post-scan checks in reporting order
pub fn check_all(
    header: &TraceHeader,
    counters: &ScanCounters,
    check_phys_addr: bool,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if check_phys_addr {
        violations.extend(check_physical_addresses(header, counters));
    }
    violations.extend(check_embedded_ptes(header, counters));
    violations.extend(check_rv64(header, counters));
    violations.extend(check_inefficient_accesses(counters));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use stf_trace::{TraceFeatures, TraceInfo};

    fn header(features: &[TraceFeature]) -> TraceHeader {
        TraceHeader {
            trace_info: vec![TraceInfo {
                generator: "spike".to_string(),
                version: "1.0".to_string(),
                comment: String::new(),
            }],
            features: TraceFeatures::new(features.iter().copied()),
            ..TraceHeader::default()
        }
    }

    fn codes(violations: &[Violation]) -> Vec<ErrorCode> {
        violations.iter().map(|v| v.code).collect()
    }

    #[test]
    fn test_header_requires_trace_info() {
        let mut h = header(&[]);
        assert!(check_header(&h).is_empty());

        h.trace_info.clear();
        assert_eq!(codes(&check_header(&h)), vec![ErrorCode::Header]);
    }

    #[test]
    fn test_header_rejects_bad_generator_and_version() {
        let mut h = header(&[]);
        h.trace_info[0].generator = "reserved".to_string();
        assert_eq!(codes(&check_header(&h)), vec![ErrorCode::Header]);

        let mut h = header(&[]);
        h.trace_info[0].version = "one".to_string();
        assert_eq!(codes(&check_header(&h)), vec![ErrorCode::Header]);
    }

    #[test]
    fn test_declared_pa_without_pa_evidence() {
        let h = header(&[TraceFeature::ContainPhysicalAddress]);
        let counters = ScanCounters {
            physical_pcs: 10,
            ..ScanCounters::default()
        };
        let violations = check_physical_addresses(&h, &counters);
        assert_eq!(codes(&violations), vec![ErrorCode::PhysAddr]);
        assert!(violations[0].message.contains("no PAs found"));
    }

    #[test]
    fn test_declared_pa_without_any_evidence_reports_both() {
        let h = header(&[TraceFeature::ContainPhysicalAddress]);
        let violations = check_physical_addresses(&h, &ScanCounters::default());
        assert_eq!(codes(&violations), vec![ErrorCode::PhysAddr, ErrorCode::PhysAddr]);
    }

    #[test]
    fn test_undeclared_pa_with_evidence() {
        let h = header(&[]);
        let counters = ScanCounters {
            physical_addresses: 3,
            ..ScanCounters::default()
        };
        let violations = check_physical_addresses(&h, &counters);
        assert_eq!(codes(&violations), vec![ErrorCode::PhysAddr]);
        assert!(violations[0].message.contains("3 PAs"));
    }

    #[test]
    fn test_pte_flag() {
        let counters = ScanCounters {
            embedded_ptes: 2,
            ..ScanCounters::default()
        };
        assert!(check_embedded_ptes(&header(&[TraceFeature::ContainPte]), &counters).is_empty());
        assert_eq!(
            codes(&check_embedded_ptes(&header(&[]), &counters)),
            vec![ErrorCode::EmbedPte]
        );
        assert_eq!(
            codes(&check_embedded_ptes(
                &header(&[TraceFeature::ContainPte]),
                &ScanCounters::default()
            )),
            vec![ErrorCode::EmbedPte]
        );
    }

    #[test]
    fn test_rv64_flag_both_directions() {
        let rv64 = ScanCounters {
            has_rv64: true,
            ..ScanCounters::default()
        };
        assert!(check_rv64(&header(&[TraceFeature::ContainRv64]), &rv64).is_empty());
        assert_eq!(codes(&check_rv64(&header(&[]), &rv64)), vec![ErrorCode::Rv64Insts]);
        assert_eq!(
            codes(&check_rv64(
                &header(&[TraceFeature::ContainRv64]),
                &ScanCounters::default()
            )),
            vec![ErrorCode::Rv64Insts]
        );
    }

    #[test]
    fn test_inefficiency_reported_once() {
        let counters = ScanCounters {
            inefficient_accesses: 42,
            ..ScanCounters::default()
        };
        let violations = check_inefficient_accesses(&counters);
        assert_eq!(codes(&violations), vec![ErrorCode::IneffMemAccess]);
        assert!(violations[0].message.contains("42"));
    }

    #[test]
    fn test_physical_check_can_be_disabled() {
        let h = header(&[TraceFeature::ContainPhysicalAddress, TraceFeature::ContainRv64]);
        let counters = ScanCounters {
            has_rv64: true,
            ..ScanCounters::default()
        };
        assert!(check_all(&h, &counters, false).is_empty());
        assert_eq!(check_all(&h, &counters, true).len(), 2);
    }
}
