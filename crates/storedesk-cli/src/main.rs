// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::{ApiRuntime, DemoRuntime};
use std::env;
use std::path::PathBuf;
use storedesk_app::{AppState, SudoMap};
use storedesk_testkit::DemoCatalog;
use storedesk_tui::UiOptions;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `storedesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let _log_guard = logging::init(&config.log_dir()?, config.log_level(), options.verbose)?;
    info!(
        config = %options.config_path.display(),
        demo = options.demo,
        "starting storedesk"
    );

    let ui_options = UiOptions {
        sudo: SudoMap::new(config.sudo_letters()),
        default_tax_percent: config.default_inbound_tax_percent(),
        responsive_breakpoint: config.responsive_breakpoint(),
        invoice_date: time::OffsetDateTime::now_utc().date(),
    };
    let mut state = AppState::default();

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        let mut runtime = DemoRuntime::new(DemoCatalog::default());
        return storedesk_tui::run_app(&mut state, &mut runtime, ui_options);
    }

    let client = storedesk_api::Client::new(&config.api_base_url(), config.api_timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    if options.check_only {
        info!(base_url = client.base_url(), "config check passed");
        return Ok(());
    }

    let mut runtime = ApiRuntime::new(client);
    storedesk_tui::run_app(&mut state, &mut runtime, ui_options)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    verbose: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        verbose: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("storedesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Browse generated masters without a server");
    println!("  --check                  Validate config and API settings, then exit");
    println!("  -v, --verbose            Log at debug level");
    println!("  --help                   Show this help");
}
