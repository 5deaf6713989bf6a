//! Seeding and log replay against a local store

use anyhow::{Context, Result, bail};
use objmeta_apply::{MetaContext, OmClientResponse, OmRequest, OmResponse};
use objmeta_common::{BucketInfo, KeyInfo, UserInfo, VolumeInfo, current_timestamp_millis};
use objmeta_store::MetaStore;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Namespace loaded by `seed`, standing in for the create/open requests
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub volumes: Vec<VolumeInfo>,
    pub buckets: Vec<BucketInfo>,
    pub open_keys: Vec<SeedOpenKey>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOpenKey {
    pub client_id: u64,
    #[serde(flatten)]
    pub info: KeyInfo,
}

pub fn seed(store: &MetaStore, seed: &SeedFile) -> Result<usize> {
    for volume in &seed.volumes {
        store.put_volume(volume)?;
    }
    for bucket in &seed.buckets {
        store.put_bucket(bucket)?;
    }
    for open_key in &seed.open_keys {
        store.put_open_key(open_key.client_id, &open_key.info)?;
    }
    let rows = seed.volumes.len() + seed.buckets.len() + seed.open_keys.len();
    info!(
        "Seeded {} volumes, {} buckets, {} open keys",
        seed.volumes.len(),
        seed.buckets.len(),
        seed.open_keys.len()
    );
    Ok(rows)
}

/// One line of a replay log
#[derive(Debug, Deserialize)]
pub struct LogEntry {
    pub index: u64,
    /// Caller attached during pre-processing
    #[serde(default)]
    pub user: Option<UserInfo>,
    pub request: OmRequest,
}

#[derive(Debug, Serialize)]
struct Outcome<'a> {
    index: u64,
    response: &'a OmResponse,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: u64,
    pub rejected: u64,
    pub flushes: u64,
}

/// Apply a JSONL log in index order, writing one JSON outcome per entry to
/// `out` and flushing every `flush_batch_size` entries
pub fn replay<R: BufRead, W: Write>(
    ctx: &MetaContext,
    input: R,
    mut out: W,
    flush_batch_size: usize,
) -> Result<ReplayStats> {
    let flush_batch_size = flush_batch_size.max(1);
    let mut stats = ReplayStats::default();
    let mut pending: Vec<OmClientResponse> = Vec::with_capacity(flush_batch_size);
    let mut last_index = ctx.store().last_applied_index();

    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(&line)
            .with_context(|| format!("invalid log entry on line {}", line_no + 1))?;
        if entry.index <= last_index {
            bail!(
                "log index {} on line {} does not follow {}",
                entry.index,
                line_no + 1,
                last_index
            );
        }
        last_index = entry.index;

        let caller = entry.user.unwrap_or_else(|| UserInfo::new("replay"));
        let request = entry.request.pre_execute(&caller, current_timestamp_millis());
        let response = ctx.apply(&request, entry.index);

        if response.om_response().success {
            stats.applied += 1;
        } else {
            stats.rejected += 1;
        }
        serde_json::to_writer(
            &mut out,
            &Outcome {
                index: entry.index,
                response: response.om_response(),
            },
        )?;
        out.write_all(b"\n")?;

        pending.push(response);
        if pending.len() >= flush_batch_size {
            flush(ctx, &mut pending, &mut stats)?;
        }
    }
    flush(ctx, &mut pending, &mut stats)?;
    out.flush()?;

    info!(
        "Replay finished: {} applied, {} rejected, {} flushes",
        stats.applied, stats.rejected, stats.flushes
    );
    Ok(stats)
}

fn flush(
    ctx: &MetaContext,
    pending: &mut Vec<OmClientResponse>,
    stats: &mut ReplayStats,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let evicted = ctx.flush(pending)?;
    debug!("Flushed {} entries, evicted {}", pending.len(), evicted);
    pending.clear();
    stats.flushes += 1;
    Ok(())
}
