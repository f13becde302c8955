//! C10: configuration. The three process-wide toggles of `spec.md` §6
//! (`debug`, `prove`, `depth_for_observational_equivalence`) plus the CLI's
//! own `timeout_s` and `depth_limit` knobs, loaded from `clap` flags and
//! optionally merged with a TOML file via `figment` — modeled on the
//! teacher's `CfgConfig`/`Config` pair (`expr/cfg.rs`), minus the SyGuS
//! `size_limit`/`substr_limit` knobs this engine has no use for (height is
//! its own size notion).

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(name = "sweet")]
pub struct Cli {
    /// Path to a problem file (grammar + `%%` + examples).
    pub path: PathBuf,

    /// Optional TOML file of overrides, merged on top of the CLI flags.
    #[arg(long)]
    pub cfg: Option<PathBuf>,

    /// Optional term-rewriting rule file (spec.md §6).
    #[arg(long)]
    pub trs: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(short, long)]
    pub debug: bool,

    /// Enable the SMT-backed symbolic equivalence upgrade (C3 step 5).
    #[arg(long)]
    pub prove: bool,

    /// `D`: stratum at which observational equivalence activates.
    /// Negative disables it entirely.
    #[arg(long, default_value_t = 0)]
    pub depth_for_observational_equivalence: i64,

    #[arg(long, default_value_t = 10)]
    pub timeout_s: u64,

    /// Hard cap on enumeration height. Unset means unbounded (halts only
    /// when the grammar saturates).
    #[arg(long)]
    pub depth_limit: Option<u32>,
}

/// The fields actually threaded through `driver::synthesize`, after merging
/// CLI flags with an optional `--cfg` TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub prove: bool,
    pub depth_for_observational_equivalence: i64,
    pub timeout_s: u64,
    pub depth_limit: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            prove: false,
            depth_for_observational_equivalence: 0,
            timeout_s: 10,
            depth_limit: None,
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            debug: cli.debug,
            prove: cli.prove,
            depth_for_observational_equivalence: cli.depth_for_observational_equivalence,
            timeout_s: cli.timeout_s,
            depth_limit: cli.depth_limit,
        }
    }
}

impl Config {
    /// Merges a TOML override file on top of the CLI-derived config, last
    /// writer wins — matching the teacher's own `Config::merge` (`expr/cfg.rs`).
    pub fn with_overrides(self, toml_path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        use figment::providers::{Format, Serialized, Toml};
        use figment::Figment;

        let mut figment = Figment::from(Serialized::defaults(self));
        if let Some(path) = toml_path {
            figment = figment.merge(Toml::file(path));
        }
        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_translate_to_config_defaults() {
        let cli = Cli::parse_from(["sweet", "problem.sl"]);
        let cfg = Config::from(&cli);
        assert!(!cfg.debug);
        assert!(!cfg.prove);
        assert_eq!(cfg.depth_for_observational_equivalence, 0);
        assert_eq!(cfg.timeout_s, 10);
        assert_eq!(cfg.depth_limit, None);
    }

    #[test]
    fn overrides_with_no_file_is_identity() {
        let cfg = Config::default();
        let merged = cfg.clone().with_overrides(None).unwrap();
        assert_eq!(merged.timeout_s, cfg.timeout_s);
    }
}
