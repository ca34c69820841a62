//! stf_check CLI
//!
//! Checks an instruction trace for consistency and exits with the code of
//! the violation found (0 when the trace is clean).

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use stf_check::{check_trace, CheckConfig, ErrorCode, FATAL_EXIT_CODE};
use tracing_subscriber::EnvFilter;

/// Check an STF trace for consistency
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Continue checking after the first error
    #[arg(short = 'c')]
    continue_on_error: bool,

    /// Print an error for every memory access to virtual address zero
    #[arg(short = 'd')]
    print_memory_zero_warnings: bool,

    /// Print trace info and a summary of physical addresses and PTEs
    #[arg(short = 'p')]
    print_info: bool,

    /// Skip the physical address feature check
    #[arg(short = 'n')]
    no_phys_addr_check: bool,

    /// Always print error counts
    #[arg(short = 'v')]
    always_print_error_counts: bool,

    /// End checking at the M-th instruction
    #[arg(short = 'e', value_name = "M", default_value_t = 0)]
    end_inst: u64,

    /// Ignore an error code, by name or number (repeatable)
    #[arg(short = 'i', value_name = "ERR")]
    ignore: Vec<ErrorCode>,

    /// Trace to check
    trace: PathBuf,
}

impl From<Args> for CheckConfig {
    fn from(args: Args) -> Self {
        Self {
            continue_on_error: args.continue_on_error,
            print_memory_zero_warnings: args.print_memory_zero_warnings,
            print_info: args.print_info,
            check_phys_addr: !args.no_phys_addr_check,
            end_inst: args.end_inst,
            always_print_error_counts: args.always_print_error_counts,
            ignored_errors: args.ignore.into_iter().collect(),
            trace_filename: args.trace,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stf_check=warn,stf_trace=warn")),
        )
        .init();

    let config = CheckConfig::from(Args::parse());
    tracing::debug!("Configuration: {:?}", config);

    match check_trace(&config) {
        Ok(verdict) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = verdict.write_report(&mut stdout).and_then(|_| stdout.flush()) {
                tracing::warn!("Failed to write report: {}", e);
            }
            ExitCode::from(verdict.exit_code())
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("stf_check: {:#}", e);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}
