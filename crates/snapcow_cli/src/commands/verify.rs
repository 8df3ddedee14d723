//! Verify command implementation.

use snapcow_core::{CowReader, OpType};
use snapcow_storage::FileSource;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of operations checked.
    pub ops_checked: usize,
    /// Number of payloads decompressed.
    pub payloads_checked: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(file: &Path, check_data: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying container {}", file.display());

    let source = FileSource::open(file)?;
    let reader = CowReader::parse(Box::new(source))?;
    let result = verify_ops(&reader, check_data);

    println!(
        "  operations checked: {}, payloads checked: {}",
        result.ops_checked, result.payloads_checked
    );
    for error in &result.errors {
        println!("    ERROR: {error}");
    }

    println!();
    if result.is_ok() {
        println!("Container verification passed");
        Ok(())
    } else {
        println!("Container verification failed");
        Err("verification failed".into())
    }
}

fn verify_ops(reader: &CowReader, check_data: bool) -> VerifyResult {
    let mut result = VerifyResult::default();

    let iter = match reader.op_iter() {
        Ok(iter) => iter,
        Err(e) => {
            result.errors.push(format!("op table: {e}"));
            return result;
        }
    };

    for (index, op) in iter.enumerate() {
        result.ops_checked += 1;
        let op = match op {
            Ok(op) => op,
            Err(e) => {
                result.errors.push(format!("op {index}: {e}"));
                break;
            }
        };

        if check_data && op.op_type == OpType::Replace {
            let mut sink = Vec::new();
            match reader.read_data(&op, &mut sink) {
                Ok(()) => result.payloads_checked += 1,
                Err(e) => {
                    result
                        .errors
                        .push(format!("op {index} (block {}): {e}", op.new_block));
                }
            }
        }
    }

    result
}
