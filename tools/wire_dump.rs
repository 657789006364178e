// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

/*!
Wire Dump Tool

Decodes a captured WebNN wire stream and prints one line per command.

Usage:
  cargo run --bin wire_dump -- <capture.bin> [--return] [--json] [--debug-webnn-serialization]

`--return` decodes server to client commands instead of client to server ones. `--json` prints
each command as a JSON object. Decoding stops at the first malformed command, like the wire
itself does.
*/

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _};
use serde::Serialize;
use tracing::{info, warn};
use webnn_observability::{init_logging_default, parse_debug_flags};
use webnn_serialization::{ChunkedCommandHandler, ReturnWireCommand, WireCommand, WireCommandSet};
use webnn_structures::WebnnDataError;

struct DumpOptions {
    decode_return_commands: bool,
    json: bool,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <capture.bin> [--return] [--json] [--debug-<crate>]", program);
    eprintln!("\nExample:");
    eprintln!("  {} client_to_server.bin --json", program);
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("wire_dump");

    let positional: Vec<&String> = args.iter().skip(1).filter(|arg| !arg.starts_with("--")).collect();
    if positional.len() != 1 {
        print_usage(program);
        std::process::exit(1);
    }
    let options = DumpOptions {
        decode_return_commands: args.iter().any(|arg| arg == "--return"),
        json: args.iter().any(|arg| arg == "--json"),
    };

    let debug_flags = parse_debug_flags();
    let _logging = init_logging_default(&debug_flags)?;

    let input_path = Path::new(positional[0]);
    if !input_path.exists() {
        bail!("Input file '{}' not found", input_path.display());
    }
    let bytes = fs::read(input_path)
        .with_context(|| format!("Failed to read '{}'", input_path.display()))?;
    info!("Decoding {} bytes from {}", bytes.len(), input_path.display());

    let (count, result) = if options.decode_return_commands {
        dump_commands::<ReturnWireCommand>(&bytes, options.json)
    } else {
        dump_commands::<WireCommand>(&bytes, options.json)
    };

    match result {
        Ok(()) => {
            info!("Decoded {} commands", count);
            Ok(())
        }
        Err(err) => {
            warn!("Stream is malformed after {} commands", count);
            Err(err).context("Failed to decode command stream")
        }
    }
}

/// Prints every command of one direction. Returns how many were printed before the first error.
fn dump_commands<C>(bytes: &[u8], json: bool) -> (usize, anyhow::Result<()>)
where
    C: WireCommandSet + Serialize,
{
    let mut handler = ChunkedCommandHandler::new();
    let mut count = 0usize;
    let result = handler.handle_commands::<C, _, anyhow::Error>(bytes, |command| {
        if json {
            println!("{}", serde_json::to_string(&command)?);
        } else {
            println!("{:>6}  {:?}", count, command);
        }
        count += 1;
        Ok(())
    });
    if handler.is_receiving_chunks() && result.is_ok() {
        return (
            count,
            Err(WebnnDataError::DeserializationError(
                "Stream ends in the middle of a chunked command".into(),
            )
            .into()),
        );
    }
    (count, result)
}
