//! Inspect command implementation.

use snapcow_core::{CowReader, OpType};
use snapcow_storage::FileSource;
use std::path::Path;

/// Runs the inspect command.
pub fn run(file: &Path, show_ops: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = FileSource::open(file)?;
    let reader = CowReader::parse(Box::new(source))?;
    let header = reader.header();

    println!("Container: {}", file.display());
    println!("  version:    {}.{}", header.major_version, header.minor_version);
    println!("  block size: {}", header.block_size);
    println!("  ops offset: {}", header.ops_offset);
    println!("  ops size:   {}", header.ops_size);
    println!(
        "  operations: {}",
        header.ops_size / snapcow_core::OP_SIZE as u64
    );

    if show_ops {
        println!();
        for (index, op) in reader.op_iter()?.enumerate() {
            let op = op?;
            match op.op_type {
                OpType::Copy => {
                    println!("  [{index}] copy block {} <- block {}", op.new_block, op.source);
                }
                OpType::Replace => {
                    println!(
                        "  [{index}] replace block {} ({} payload bytes at {}, {:?})",
                        op.new_block, op.data_length, op.source, op.compression
                    );
                }
                OpType::Zero => {
                    println!("  [{index}] zero block {}", op.new_block);
                }
                OpType::Label => {
                    println!("  [{index}] label {}", op.source);
                }
            }
        }
    }

    Ok(())
}
