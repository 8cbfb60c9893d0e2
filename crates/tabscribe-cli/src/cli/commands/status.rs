use super::{exit_codes, load_registry};
use crate::cli::args::StatusArgs;
use tabscribe_core::check::summarize;
use tabscribe_core::config::select_datasets;
use tabscribe_core::report::console::print_status;
use tabscribe_core::storage::ResultStore;
use tabscribe_core::table::read_table;

pub fn cmd_status(args: StatusArgs) -> anyhow::Result<i32> {
    let cfg = load_registry(&args.config)?;
    let datasets = select_datasets(&cfg, &args.tasks)?;

    let mut incomplete = false;
    for ds in datasets {
        let output = ds.output_dir();
        if !output.exists() {
            eprintln!("{}: not started ({})", ds.id, output.display());
            incomplete = true;
            continue;
        }
        let store = ResultStore::read_only(&output);
        for unit in ds.units.names() {
            let streams = store.load(&unit)?;
            let rows = read_table(&ds.data_dir(), &unit).ok().map(|t| t.len());
            let progress = summarize(&streams);
            // requests not yet materialized for every row count as unfinished too
            if progress.pending > 0 || rows.is_some_and(|n| n != progress.total) {
                incomplete = true;
            }
            print_status(&ds.id, &unit, rows, &progress);
        }
    }

    Ok(if incomplete {
        exit_codes::INCOMPLETE
    } else {
        exit_codes::OK
    })
}
