use crate::storage::Streams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Treat rows previously skipped as too large as pending again.
    pub retry_skipped: bool,
}

/// Pads the result streams with empty slots up to the request count.
pub fn pad_results(streams: &mut Streams) {
    let len = streams.input.len();
    if streams.raw.len() < len {
        streams.raw.resize(len, None);
    }
    if streams.processed.len() < len {
        streams.processed.resize(len, None);
    }
    if streams.back_input.len() < len {
        streams.back_input.resize(len, None);
    }
}

/// Whether index `i` of a padded stream set still needs a call.
fn is_pending(streams: &Streams, i: usize, opts: CheckOptions) -> bool {
    let raw = match &streams.raw[i] {
        None => return true,
        Some(r) => r,
    };
    if raw.is_skipped() {
        if opts.retry_skipped {
            return true;
        }
    } else if streams.processed[i].is_none() {
        return true;
    }

    match &streams.back_input[i] {
        None => true,
        Some(sent) => sent.last_content() != streams.input[i].last_content(),
    }
}

/// Sorted indices whose results are missing, incomplete or stale.
///
/// A stored request whose final message no longer matches the freshly rendered
/// one is stale, even when its raw result is present.
pub fn pending_indices(streams: &mut Streams, opts: CheckOptions) -> Vec<usize> {
    pad_results(streams);
    (0..streams.input.len())
        .filter(|&i| is_pending(streams, i, opts))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub pending: usize,
}

/// Counts resolved and pending rows without touching the stored streams.
pub fn summarize(streams: &Streams) -> Progress {
    let mut padded = streams.clone();
    pad_results(&mut padded);

    let mut progress = Progress {
        total: padded.input.len(),
        ..Default::default()
    };
    for i in 0..progress.total {
        if is_pending(&padded, i, CheckOptions::default()) {
            progress.pending += 1;
        } else if padded.raw[i].as_ref().is_some_and(|r| r.is_skipped()) {
            progress.skipped += 1;
        } else {
            progress.completed += 1;
        }
    }
    progress
}
