use crate::check::{pending_indices, summarize, CheckOptions};
use crate::config::DatasetSpec;
use crate::engine::executor::{CallExecutor, CallOutcome, CallResult};
use crate::linearize::linearize_table;
use crate::materialize::materialize_requests;
use crate::model::{ChatRequest, RawResult, Table};
use crate::report::UnitReport;
use crate::storage::{ResultStore, StreamKind, Streams};
use crate::table::read_table;
use tokio::sync::watch;

/// Runs the load / linearize / materialize / check / execute cycle per unit of work.
pub struct Converter {
    pub executor: CallExecutor,
    pub check: CheckOptions,
    /// Set to `true` to stop after the index currently being written.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl Converter {
    pub fn new(executor: CallExecutor) -> Self {
        Self {
            executor,
            check: CheckOptions::default(),
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Converts every unit of a dataset, strictly one after another.
    pub async fn convert_dataset(&self, dataset: &DatasetSpec) -> anyhow::Result<Vec<UnitReport>> {
        let store = ResultStore::open(&dataset.output_dir())?;
        let template = dataset.request_template();
        let units = dataset.units.names();

        tracing::info!(
            dataset = %dataset.id,
            units = units.len(),
            output = %store.root().display(),
            "converting dataset"
        );

        let mut reports = Vec::new();
        for unit in units {
            if self.is_cancelled() {
                break;
            }
            let table = read_table(&dataset.data_dir(), &unit)?;
            let mut report = self.convert_table(&store, &table, &template).await?;
            report.dataset = dataset.id.clone();
            reports.push(report);
        }
        Ok(reports)
    }

    pub async fn convert_table(
        &self,
        store: &ResultStore,
        table: &Table,
        template: &ChatRequest,
    ) -> anyhow::Result<UnitReport> {
        let start = std::time::Instant::now();
        let name = table.name.as_str();
        let mut streams = store.load(name)?;

        self.refresh_inputs(store, table, template, &mut streams)?;

        let pending = pending_indices(&mut streams, self.check);
        let mut report = UnitReport {
            unit: name.to_string(),
            rows: table.len(),
            scheduled: pending.len(),
            ..Default::default()
        };
        tracing::info!(
            unit = name,
            rows = table.len(),
            pending = pending.len(),
            provider = self.executor.provider_name(),
            "checked unit"
        );

        let work: Vec<(usize, ChatRequest)> = pending
            .iter()
            .map(|&i| (i, streams.input[i].clone()))
            .collect();
        let mut calls = self.executor.stream(work);
        let mut cancel = self.cancel.clone();

        loop {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let next = match cancel.as_mut() {
                Some(rx) => tokio::select! {
                    item = calls.next() => item,
                    _ = cancelled(rx) => {
                        report.cancelled = true;
                        break;
                    }
                },
                None => calls.next().await,
            };
            let Some(result) = next else { break };

            let index = result.index;
            if record(&mut streams, result, &mut report) {
                store.save(name, &streams, &StreamKind::RESULTS)?;
                tracing::debug!(
                    unit = name,
                    index,
                    remaining = calls.remaining(),
                    "checkpointed"
                );
            }
        }

        if report.cancelled {
            tracing::warn!(unit = name, remaining = calls.remaining(), "cancelled");
        }

        report.progress = summarize(&streams);
        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            unit = name,
            completed = report.completed,
            skipped = report.skipped,
            deferred = report.deferred,
            pending = report.progress.pending,
            "unit finished"
        );
        Ok(report)
    }

    /// Re-derives linearizations and requests, persisting whichever changed.
    fn refresh_inputs(
        &self,
        store: &ResultStore,
        table: &Table,
        template: &ChatRequest,
        streams: &mut Streams,
    ) -> anyhow::Result<()> {
        let name = table.name.as_str();
        let prompt = template.last_content().unwrap_or_default();

        let linearization = linearize_table(table, prompt);
        if streams.linearization != linearization {
            tracing::info!(
                unit = name,
                stored = streams.linearization.len(),
                rows = linearization.len(),
                "linearization stale, rewriting"
            );
            streams.linearization = linearization;
            store.save(name, streams, &[StreamKind::Linearization])?;
        }

        let input = materialize_requests(template, &streams.linearization);
        if streams.input != input {
            tracing::info!(
                unit = name,
                stored = streams.input.len(),
                rows = input.len(),
                "requests stale, rewriting"
            );
            streams.input = input;
            store.save(name, streams, &[StreamKind::Input])?;
        }
        Ok(())
    }
}

/// Writes one call result into its slot. Returns whether anything changed.
fn record(streams: &mut Streams, result: CallResult, report: &mut UnitReport) -> bool {
    let CallResult {
        index,
        request,
        outcome,
    } = result;

    match outcome {
        CallOutcome::Completed(resp) => {
            streams.processed[index] = resp.content().map(str::to_string);
            streams.raw[index] = Some(RawResult::Completed(resp));
            report.completed += 1;
        }
        CallOutcome::Skipped { code } => {
            streams.raw[index] = Some(RawResult::Skipped {
                model: request.model.clone(),
                code,
            });
            streams.processed[index] = None;
            report.skipped += 1;
        }
        CallOutcome::GaveUp { attempts, .. } => {
            tracing::warn!(index, attempts, "no result recorded, row stays pending");
            report.deferred += 1;
            return false;
        }
    }
    streams.back_input[index] = Some(request);
    true
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        // sender gone: nobody can cancel any more
        std::future::pending::<()>().await;
    }
}
