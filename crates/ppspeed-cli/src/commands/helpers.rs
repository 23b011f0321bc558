// Protocol source resolution shared by the command handlers.

use std::path::Path;

use miette::IntoDiagnostic;
use serde_json::Value;

use ppspeed_ir::generators::{Generator, GeneratorKind};
use ppspeed_ir::{JsonProtocolFile, Protocol, ProtocolSource};
use tracing::info;

/// Pick the source named on the command line: an existing file or a path
/// ending in `.json` is read as a protocol file, anything else names a
/// generator.
pub(crate) fn resolve_source(
    protocol: &str,
    args: Option<&str>,
) -> miette::Result<Box<dyn ProtocolSource + Send>> {
    let path = Path::new(protocol);
    if path.is_file() || path.extension().is_some_and(|ext| ext == "json") {
        if args.is_some() {
            miette::bail!("Generator arguments given for protocol file {protocol}");
        }
        return Ok(Box::new(JsonProtocolFile::new(path)));
    }

    let kind: GeneratorKind = protocol.parse().into_diagnostic()?;
    let args = match args {
        Some(text) => parse_generator_args(text)?,
        None => Vec::new(),
    };
    Ok(Box::new(Generator::new(kind, args)))
}

pub(crate) fn parse_generator_args(text: &str) -> miette::Result<Vec<Value>> {
    match serde_json::from_str(text).into_diagnostic()? {
        Value::Array(values) => Ok(values),
        other => miette::bail!("Generator arguments must be a JSON array, got {other}"),
    }
}

pub(crate) fn load_protocol(source: &dyn ProtocolSource) -> miette::Result<Protocol> {
    info!(source = %source.describe(), "loading protocol");
    let protocol = source.load().into_diagnostic()?;
    info!(
        states = protocol.states.len(),
        transitions = protocol.transitions.len(),
        "protocol loaded"
    );
    Ok(protocol)
}
