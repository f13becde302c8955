use std::fs;
use std::process::exit;

use clap::Parser;

use sweet_pbe::config::{Cli, Config};
use sweet_pbe::grammar::parse_term_rewriting_rules;
use sweet_pbe::log;
use sweet_pbe::{crit, info};
use sweet_pbe::{driver, problem};

fn main() {
    let cli = Cli::parse();
    log::set_log_level(if cli.debug { 4 } else { 2 + cli.verbose });

    let cfg = match Config::from(&cli).with_overrides(cli.cfg.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            crit!("failed to load configuration: {}", e);
            exit(1);
        }
    };

    let source = match fs::read_to_string(&cli.path) {
        Ok(s) => s,
        Err(e) => {
            crit!("failed to read {:?}: {}", cli.path, e);
            exit(1);
        }
    };

    let prob = match problem::parse(&source) {
        Ok(p) => p,
        Err(e) => {
            crit!("failed to parse problem file: {}", e);
            exit(1);
        }
    };

    let trs = match &cli.trs {
        Some(path) => {
            let text = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    crit!("failed to read term-rewriting file {:?}: {}", path, e);
                    exit(1);
                }
            };
            match parse_term_rewriting_rules(&text) {
                Ok(rules) => rules,
                Err(e) => {
                    crit!("failed to parse term-rewriting file: {}", e);
                    exit(1);
                }
            }
        }
        None => Vec::new(),
    };

    info!("synthesizing against {} example(s)", prob.examples.len());

    match driver::synthesize(
        &prob.grammar,
        &prob.examples,
        cfg.timeout_s,
        cfg.prove,
        cfg.depth_for_observational_equivalence,
        cfg.depth_limit,
        trs,
    ) {
        Some(program) => println!("{}", program),
        None => {
            crit!("no satisfying program found");
            exit(1);
        }
    }
}
