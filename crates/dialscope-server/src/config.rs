//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use dialscope_core::TableId;
use dialscope_core::map::DEFAULT_PREFETCH_WIDTH;

use crate::loader::StartupFiles;
use crate::protocol::DnoFile;

/// dialscope enrichment server.
#[derive(Parser, Debug)]
#[command(name = "dialscope-server", version)]
pub struct Config {
    /// HTTP listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Control socket path.
    #[arg(long, default_value = "/tmp/dialscope/control.sock")]
    pub control: PathBuf,

    /// Prehash/prefetch window width applied to every table.
    #[arg(long, default_value_t = DEFAULT_PREFETCH_WIDTH)]
    pub prefetch_width: usize,

    /// Maximum length of a POST x-www-form-urlencoded body.
    #[arg(long, default_value_t = 32_768)]
    pub max_query_length: usize,

    /// US portability CSV to load at startup (pn,rn).
    #[arg(long)]
    pub us_lrn: Option<PathBuf>,

    /// CA portability CSV to load at startup (pn,rn).
    #[arg(long)]
    pub ca_lrn: Option<PathBuf>,

    /// Do-not-call CSV to load at startup.
    #[arg(long)]
    pub dnc: Option<PathBuf>,

    /// Toll-free CSV to load at startup.
    #[arg(long)]
    pub tollfree: Option<PathBuf>,

    /// LERG CSV to load at startup.
    #[arg(long)]
    pub lerg: Option<PathBuf>,

    /// Youmail score CSV to load at startup.
    #[arg(long)]
    pub youmail: Option<PathBuf>,

    /// Geo locale CSV to load at startup.
    #[arg(long)]
    pub geo: Option<PathBuf>,

    /// FTC complaint CSV to load at startup.
    #[arg(long)]
    pub ftc: Option<PathBuf>,

    /// 404-failure CSV to load at startup.
    #[arg(long)]
    pub f404: Option<PathBuf>,

    /// 6xx-failure CSV to load at startup.
    #[arg(long)]
    pub f606: Option<PathBuf>,

    /// DNO full-number CSV to load at startup.
    #[arg(long)]
    pub dno_full: Option<PathBuf>,

    /// DNO NPA CSV to load at startup.
    #[arg(long)]
    pub dno_npa: Option<PathBuf>,

    /// DNO NPA-NXX CSV to load at startup.
    #[arg(long)]
    pub dno_npa_nxx: Option<PathBuf>,

    /// DNO NPA-NXX-X CSV to load at startup.
    #[arg(long)]
    pub dno_npa_nxx_x: Option<PathBuf>,
}

impl Config {
    /// Collect the startup-load work implied by the file flags.
    pub fn startup_files(&self) -> StartupFiles {
        let mut files = StartupFiles::default();

        let singles = [
            (TableId::UsLrn, &self.us_lrn),
            (TableId::CaLrn, &self.ca_lrn),
            (TableId::Dnc, &self.dnc),
            (TableId::TollFree, &self.tollfree),
            (TableId::Lerg, &self.lerg),
            (TableId::Youmail, &self.youmail),
            (TableId::Geo, &self.geo),
            (TableId::Ftc, &self.ftc),
            (TableId::F404, &self.f404),
            (TableId::F606, &self.f606),
        ];
        for (id, path) in singles {
            if let Some(path) = path {
                files.tables.push((id, path.clone()));
            }
        }

        let dno = [
            ("full", &self.dno_full),
            ("npa", &self.dno_npa),
            ("npa_nxx", &self.dno_npa_nxx),
            ("npa_nxx_x", &self.dno_npa_nxx_x),
        ];
        for (granularity, path) in dno {
            if let Some(path) = path {
                files.dno.push(DnoFile {
                    path: path.display().to_string(),
                    granularity: granularity.to_string(),
                });
            }
        }

        files
    }
}
