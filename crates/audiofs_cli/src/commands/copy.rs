//! Copy command implementation.

use super::format_bytes;
use audiofs_vfile::{VfsConfig, VfsTarget, VirtualFile, Whence};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of streaming a file through a virtual file.
#[derive(Debug, Serialize)]
pub struct CopyReport {
    /// Source file.
    pub input: String,
    /// `memory` or the target path.
    pub target: String,
    /// Whether the bytes lived in process memory.
    pub memory_backed: bool,
    /// Bytes written.
    pub bytes: u64,
    /// Number of write calls.
    pub chunks: u64,
    /// Logical size reported by the virtual file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Allocated capacity, for memory targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
    /// Whether the read-back matched the input.
    pub verified: bool,
}

/// Streams `input` into a virtual file on `target` and reads it back.
pub fn copy(
    input: &Path,
    target: &str,
    chunk: usize,
) -> Result<CopyReport, Box<dyn std::error::Error>> {
    if chunk == 0 {
        return Err("chunk size must be at least 1 byte".into());
    }

    let mut source = File::open(input)?;
    let mut file = VirtualFile::open(VfsTarget::parse(target), &VfsConfig::default())?;

    let mut buf = vec![0u8; chunk];
    let mut bytes = 0u64;
    let mut chunks = 0u64;
    loop {
        let count = source.read(&mut buf)?;
        if count == 0 {
            break;
        }
        let written = file.write(&buf[..count])?;
        if written != count {
            return Err(format!("short write: {written} of {count} bytes").into());
        }
        bytes += count as u64;
        chunks += 1;
    }
    debug!(bytes, chunks, "input streamed");

    file.seek(0, Whence::Start)?;
    let verified = matches_source(&mut file, input, chunk)?;

    let report = CopyReport {
        input: input.display().to_string(),
        target: target.to_string(),
        memory_backed: file.is_memory_backed(),
        bytes,
        chunks,
        size: file.size().ok(),
        capacity: file.capacity(),
        verified,
    };
    file.close()?;

    info!(bytes, verified, "copy finished");
    Ok(report)
}

/// Compares the virtual file from its cursor against a fresh read of `input`.
fn matches_source(
    file: &mut VirtualFile,
    input: &Path,
    chunk: usize,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut source = File::open(input)?;
    let mut expected = vec![0u8; chunk];
    let mut actual = vec![0u8; chunk];

    loop {
        let want = read_full(&mut source, &mut expected)?;
        let mut got = 0;
        while got < want {
            let count = file.read(&mut actual[got..want])?;
            if count == 0 {
                return Ok(false);
            }
            got += count;
        }
        if expected[..want] != actual[..want] {
            return Ok(false);
        }
        if want == 0 {
            // The virtual file must be exhausted too.
            return Ok(file.read(&mut actual[..1])? == 0);
        }
    }
}

fn read_full(source: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let count = source.read(&mut buf[filled..])?;
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}

/// Runs the copy command.
pub fn run(
    input: &Path,
    target: &str,
    chunk: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = copy(input, target, chunk)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Copied {:?} into {}", input, report.target);
            println!();
            println!(
                "Backend:   {}",
                if report.memory_backed { "memory" } else { "disk" }
            );
            println!("Bytes:     {} ({})", report.bytes, format_bytes(report.bytes));
            println!("Chunks:    {}", report.chunks);
            if let Some(size) = report.size {
                println!("Size:      {size}");
            }
            if let Some(capacity) = report.capacity {
                println!("Capacity:  {} ({})", capacity, format_bytes(capacity));
            }
            println!();
            if report.verified {
                println!("✓ Read-back matches input");
            } else {
                println!("✗ Read-back differs from input");
            }
        }
    }

    if report.verified {
        Ok(())
    } else {
        Err("Verification failed".into())
    }
}
