//! CSV file loading: streams a file through a table builder in bounded
//! line chunks and commits the result to the registry.
//!
//! Loads run on blocking workers and are serialized through
//! [`AppState::reload_lock`]; a failed build surfaces an error and leaves
//! the published version untouched.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};

use dialscope_core::TableId;
use dialscope_core::tables::dno::{DnoBuilder, Granularity};
use dialscope_core::tables::failure::FailureBuilder;
use dialscope_core::tables::ftc::FtcBuilder;
use dialscope_core::tables::geo::GeoBuilder;
use dialscope_core::tables::lerg::LergBuilder;
use dialscope_core::tables::lrn::LrnBuilder;
use dialscope_core::tables::membership::MembershipBuilder;
use dialscope_core::tables::youmail::YoumailBuilder;

use crate::error::LoadError;
use crate::protocol::DnoFile;
use crate::state::AppState;

/// Lines consumed per builder call; progress is logged between chunks.
const CHUNK_LINES: u64 = 100_000;

/// Files to load before the listeners start.
#[derive(Debug, Default)]
pub struct StartupFiles {
    pub tables: Vec<(TableId, PathBuf)>,
    pub dno: Vec<DnoFile>,
}

/// Handle one control-protocol reload request.
pub fn reload(
    state: &AppState,
    table: &str,
    path: Option<String>,
    files: Vec<DnoFile>,
) -> Result<(TableId, usize), LoadError> {
    let id: TableId = table
        .parse()
        .map_err(|_| LoadError::UnknownTable(table.to_string()))?;

    let rows = if id == TableId::Dno {
        if files.is_empty() {
            return Err(LoadError::MissingFiles);
        }
        load_dno(state, &files)?
    } else {
        let path = path.ok_or_else(|| LoadError::MissingPath(table.to_string()))?;
        load_table(state, id, Path::new(&path))?
    };
    Ok((id, rows))
}

/// Load every startup file in order.
pub fn startup_load(state: &AppState, files: &StartupFiles) -> Result<(), LoadError> {
    for (id, path) in &files.tables {
        let rows = load_table(state, *id, path)?;
        info!(table = %id, rows, "startup load complete");
    }
    if !files.dno.is_empty() {
        let rows = load_dno(state, &files.dno)?;
        info!(table = "dno", rows, "startup load complete");
    }
    Ok(())
}

/// Build and publish one single-file table.
pub fn load_table(state: &AppState, id: TableId, path: &Path) -> Result<usize, LoadError> {
    let _ingest = state.reload_lock.lock();
    info!(table = %id, path = %path.display(), "loading table");
    let mut reader = BufReader::new(File::open(path)?);
    let meta = |lines: u64| json!({ "path": path.display().to_string(), "lines": lines });
    let registry = &state.registry;

    let rows = match id {
        TableId::UsLrn | TableId::CaLrn => {
            let mut builder = LrnBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            if id == TableId::UsLrn {
                builder.commit(registry.us_lrn())
            } else {
                builder.commit(registry.ca_lrn())
            }
        }
        TableId::Dnc => {
            let mut builder = MembershipBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines =
                ingest(&mut reader, |r, line, limit| builder.from_dnc_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.dnc())
        }
        TableId::TollFree => {
            let mut builder = MembershipBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| {
                builder.from_tollfree_csv(r, line, limit)
            })?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.tollfree())
        }
        TableId::Lerg => {
            let mut builder = LergBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.lerg())
        }
        TableId::Youmail => {
            let mut builder = YoumailBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.youmail())
        }
        TableId::Geo => {
            let mut builder = GeoBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.geo())
        }
        TableId::Ftc => {
            let mut builder = FtcBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            builder.commit(registry.ftc())
        }
        TableId::F404 | TableId::F606 => {
            let mut builder = FailureBuilder::new();
            builder.prefetch_width(state.prefetch_width);
            let lines = ingest(&mut reader, |r, line, limit| builder.from_csv(r, line, limit))?;
            builder.set_metadata(meta(lines));
            if id == TableId::F404 {
                builder.commit(registry.f404())
            } else {
                builder.commit(registry.f606())
            }
        }
        TableId::Dno => return Err(LoadError::MissingFiles),
    };
    Ok(rows)
}

/// Build and publish the DNO table from one file per granularity.
pub fn load_dno(state: &AppState, files: &[DnoFile]) -> Result<usize, LoadError> {
    let _ingest = state.reload_lock.lock();
    let mut builder = DnoBuilder::new();
    builder.prefetch_width(state.prefetch_width);

    let mut loaded = Vec::with_capacity(files.len());
    for spec in files {
        let granularity: Granularity = spec
            .granularity
            .parse()
            .map_err(|_| LoadError::BadGranularity(spec.granularity.clone()))?;
        info!(path = %spec.path, %granularity, "loading dno file");
        let mut reader = BufReader::new(File::open(&spec.path)?);
        let lines = ingest(&mut reader, |r, line, limit| {
            builder.from_csv(r, granularity, line, limit)
        })?;
        loaded.push(json!({
            "path": spec.path,
            "granularity": granularity.as_str(),
            "lines": lines,
        }));
    }
    builder.set_metadata(json!({ "files": loaded }));
    Ok(builder.commit(state.registry.dno()))
}

/// Run a builder's chunked `from_csv` to EOF, returning lines consumed.
fn ingest<R, F>(reader: &mut R, mut chunk: F) -> Result<u64, LoadError>
where
    R: BufRead,
    F: FnMut(&mut R, &mut u64, u64) -> dialscope_core::Result<()>,
{
    let mut line = 0u64;
    loop {
        let before = line;
        chunk(reader, &mut line, CHUNK_LINES)?;
        if line == before {
            break;
        }
        debug!(lines = line, "ingest progress");
    }
    Ok(line)
}
