use miette::Result;

/// Print the version string.
pub fn run() -> Result<()> {
    println!("oryx {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
