use super::args::*;
use anyhow::Context;
use tabscribe_core::config::{builtin_config, load_config, DatasetsConfig};

pub mod init;
pub mod run;
pub mod status;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const INCOMPLETE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::cmd_run(args).await,
        Command::Status(args) => status::cmd_status(args),
        Command::List(args) => cmd_list(args),
        Command::Init(args) => init::cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

pub(crate) fn load_registry(args: &ConfigArgs) -> anyhow::Result<DatasetsConfig> {
    match &args.config {
        Some(path) => load_config(path, args.strict)
            .with_context(|| format!("loading dataset registry {}", path.display())),
        None => builtin_config().context("loading built-in dataset registry"),
    }
}

fn cmd_list(args: ConfigArgs) -> anyhow::Result<i32> {
    let cfg = load_registry(&args)?;
    for ds in &cfg.datasets {
        println!(
            "{}\t{}\t{}",
            ds.id,
            ds.output_dir().display(),
            ds.units.names().join(",")
        );
    }
    Ok(exit_codes::OK)
}
