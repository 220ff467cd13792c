//! The `vars` command: evaluate frontmatter and print the bindings.

use crate::cli::VarsArgs;
use crate::error::{ParleyError, Result};
use crate::frontmatter::FrontmatterRegistry;
use crate::processor::Processor;
use crate::resolver::FsResolver;

pub fn cmd_vars(args: VarsArgs) -> Result<()> {
    let source = super::load_source(&args.file)?;
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&FsResolver, &registry);

    // One dispatch, one frontmatter execution.
    let (_context, evaluated) = processor.evaluate_source_frontmatter(&source, &args.file)?;

    let object: serde_json::Map<String, serde_json::Value> = evaluated
        .bindings()
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(object))
        .map_err(|e| ParleyError::UserError(format!("failed to serialize bindings: {}", e)))?;
    println!("{}", json);
    Ok(())
}
