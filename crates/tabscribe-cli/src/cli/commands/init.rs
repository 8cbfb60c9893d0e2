use super::exit_codes;
use crate::cli::args::InitArgs;

pub fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() && !args.force {
        eprintln!("note: {} already exists", args.config.display());
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = args.config.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tabscribe_core::config::write_sample_config(&args.config)?;
    eprintln!("created {}", args.config.display());
    Ok(exit_codes::OK)
}
