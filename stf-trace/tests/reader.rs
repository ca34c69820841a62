//! Reading complete traces from disk and memory

use std::io::{Cursor, Write};
use stf_trace::{
    AccessKind, Decoder, EventKind, Iem, RiscvDecoder, TraceError, TraceFeature, TraceGenerator,
    TraceReader,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("stf_trace=debug"))
        .try_init();
}

const TRACE: &str = r#"{"trace_info":[{"generator":"qemu","version":"5.2.1","comment":"boot"}],"features":["contain_rv64","contain_event"],"iem":"rv32"}
{"pc":4096,"opcode":369923,"memory_accesses":[{"kind":"read","address":32768,"size":4,"attr":1}]}
{"pc":4100,"opcode":19,"iem":"rv64"}

{"pc":4104,"opcode":19,"events":[{"kind":"interrupt","data":[7]}],"tid":3}
"#;

#[test]
fn test_reads_full_trace() {
    init_logging();

    let reader = TraceReader::new(Cursor::new(TRACE)).unwrap();
    let header = reader.header().clone();

    assert_eq!(header.trace_info[0].generator().unwrap(), TraceGenerator::Qemu);
    assert_eq!(header.trace_info[0].version_parts(), Some(vec![5, 2, 1]));
    assert!(header.features.has_feature(TraceFeature::ContainEvent));
    assert!(!header.features.has_feature(TraceFeature::ContainPte));
    assert_eq!(reader.initial_iem(), Iem::Rv32);

    let records = reader.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(records[0].memory_accesses[0].kind, AccessKind::Read);
    assert_eq!(records[1].iem, Some(Iem::Rv64));
    assert_eq!(records[2].events[0].kind, EventKind::Interrupt);
    assert_eq!(records[2].thread_identity().tid, 3);
}

#[test]
fn test_decoder_follows_records() {
    init_logging();

    let mut decoder = RiscvDecoder::default();
    let reader = TraceReader::new(Cursor::new(TRACE)).unwrap();
    decoder.set_iem(reader.initial_iem());

    let decoded: Vec<_> = reader
        .map(|r| {
            let r = r.unwrap();
            if let Some(iem) = r.iem {
                decoder.set_iem(iem);
            }
            decoder.decode(r.opcode)
        })
        .collect();

    assert!(decoded[0].is_load());
    assert!(!decoded[1].is_load() && !decoded[1].decode_failed());
    assert_eq!(decoder.iem(), Iem::Rv64);
}

#[test]
fn test_open_from_disk() {
    init_logging();

    let path = std::env::temp_dir().join(format!("stf-trace-reader-{}.jsonl", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(TRACE.as_bytes()).unwrap();
    drop(file);

    let reader = TraceReader::open(&path).unwrap();
    assert_eq!(reader.count(), 3);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_file_is_io_error() {
    let err = TraceReader::open("/nonexistent/trace.jsonl").unwrap_err();
    assert!(matches!(err, TraceError::Io(_)));
}
