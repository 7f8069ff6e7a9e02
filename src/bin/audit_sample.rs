use std::process::ExitCode;

use audit_sampler::app::{exit_code, run_audit_sample};

fn main() -> ExitCode {
    match run_audit_sample(std::env::args().skip(1)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<clap::Error>() {
                Some(usage) => {
                    let _ = usage.print();
                }
                None => eprintln!("error: {err}"),
            }
            ExitCode::from(exit_code(err.as_ref()))
        }
    }
}
