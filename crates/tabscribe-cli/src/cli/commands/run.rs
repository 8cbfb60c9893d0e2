use super::{exit_codes, load_registry};
use crate::cli::args::{Provider, RunArgs};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tabscribe_core::check::CheckOptions;
use tabscribe_core::config::runtime::{KeyFile, RuntimeConfig};
use tabscribe_core::config::select_datasets;
use tabscribe_core::engine::backoff::LinearBackoff;
use tabscribe_core::engine::driver::Converter;
use tabscribe_core::engine::executor::CallExecutor;
use tabscribe_core::providers::llm::fake::DummyClient;
use tabscribe_core::providers::llm::openai::OpenAIClient;
use tabscribe_core::providers::llm::LlmClient;
use tabscribe_core::report::console::print_summary;
use tokio::sync::watch;

pub async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = load_registry(&args.config)?;
    let datasets = select_datasets(&cfg, &args.tasks)?;
    let runtime = RuntimeConfig::from_env();

    let client = build_client(&args, &runtime)?;
    let backoff = LinearBackoff {
        step: Duration::from_secs(args.backoff_secs.unwrap_or(runtime.backoff_step_secs)),
        max_attempts: args.max_attempts.or(runtime.max_attempts),
    };
    tracing::info!(
        provider = client.provider_name(),
        backoff_step_secs = backoff.step.as_secs(),
        max_attempts = ?backoff.max_attempts,
        datasets = datasets.len(),
        "starting run"
    );

    let mut converter = Converter::new(CallExecutor::new(
        client,
        Arc::new(backoff),
        cfg.fallbacks.clone(),
    ));
    converter.check = CheckOptions {
        retry_skipped: args.retry_skipped,
    };
    converter.cancel = Some(install_ctrl_c());

    let mut reports = Vec::new();
    for ds in datasets {
        eprintln!("convert {}", ds.id);
        let unit_reports = converter
            .convert_dataset(ds)
            .await
            .with_context(|| format!("dataset {}", ds.id))?;
        let cancelled = unit_reports.iter().any(|r| r.cancelled);
        reports.extend(unit_reports);
        if cancelled {
            break;
        }
    }

    print_summary(&reports);

    let interrupted = reports.iter().any(|r| r.cancelled);
    let incomplete = reports.iter().any(|r| !r.is_complete());
    Ok(if interrupted || incomplete {
        exit_codes::INCOMPLETE
    } else {
        exit_codes::OK
    })
}

fn build_client(args: &RunArgs, runtime: &RuntimeConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    match args.provider {
        Provider::Dummy => Ok(Arc::new(DummyClient)),
        Provider::Openai => {
            let keys = if args.key_file.exists() {
                KeyFile::load(&args.key_file)?
            } else {
                KeyFile::default()
            };
            let timeout = Duration::from_secs(
                args.request_timeout_secs
                    .unwrap_or(runtime.request_timeout_secs),
            );
            let openai = keys.with_env_fallback().into_openai_config(timeout)?;
            Ok(Arc::new(OpenAIClient::new(openai)?))
        }
    }
}

/// First Ctrl-C stops after the current row is written; the second one exits immediately.
fn install_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupt received, stopping after the current row");
        let _ = tx.send(true);
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    rx
}
