// Command handler for: Show

use miette::IntoDiagnostic;

use super::helpers::{load_protocol, resolve_source};

pub(crate) fn run_show_command(protocol: &str, args: Option<&str>, json: bool) -> miette::Result<()> {
    let source = resolve_source(protocol, args)?;
    let protocol = load_protocol(source.as_ref())?;
    if json {
        println!("{}", protocol.to_json().into_diagnostic()?);
    } else {
        print!("{protocol}");
    }
    Ok(())
}
