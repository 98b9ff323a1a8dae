// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Livegraph CLI entrypoint.
//!
//! By default this runs the interactive viewer against a preview backend.
//!
//! Use `--serve <file>` to run the preview backend itself, serving `<file>` at `/graph` and
//! relaying channel messages over WebSockets.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use livegraph::config::ViewerConfig;
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file>] [--backend <url>] [--ws <url>] [--log-file <file>]\n  {program} --serve <file> [--port <port>] [--config <file>]\n\nViewer mode (default) fetches the diagram from `<backend>/graph` and subscribes to\n`<ws>/<channel>/subscribe` for every configured channel.\n--backend defaults to {backend}; --ws defaults to {ws}.\n--log-file writes logs to a file; otherwise viewer logs are discarded.\n\n--serve runs the preview backend for <file> on --port (default {port}).\nRUST_LOG selects the log filter (default `info`).",
        backend = livegraph::config::DEFAULT_BACKEND_URL,
        ws = livegraph::config::DEFAULT_CHANNEL_BASE_URL,
        port = livegraph::serve::DEFAULT_PORT,
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    config: Option<String>,
    backend: Option<String>,
    ws: Option<String>,
    log_file: Option<String>,
    serve: Option<String>,
    port: Option<u16>,
}

fn take_value(
    slot: &mut Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(args.next().ok_or(())?);
    Ok(())
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => take_value(&mut options.config, &mut args)?,
            "--backend" => take_value(&mut options.backend, &mut args)?,
            "--ws" => take_value(&mut options.ws, &mut args)?,
            "--log-file" => take_value(&mut options.log_file, &mut args)?,
            "--serve" => take_value(&mut options.serve, &mut args)?,
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.port = Some(port);
            }
            _ => return Err(()),
        }
    }

    if options.port.is_some() && options.serve.is_none() {
        return Err(());
    }

    if options.serve.is_some()
        && (options.backend.is_some() || options.ws.is_some() || options.log_file.is_some())
    {
        return Err(());
    }

    Ok(options)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The viewer owns the terminal, so its logs go to a file or nowhere.
fn init_viewer_logging(log_file: Option<&str>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::sink)
                .try_init();
        }
    }
    Ok(())
}

fn init_serve_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(options: &CliOptions) -> Result<ViewerConfig, Box<dyn Error>> {
    let mut config = match options.config.as_deref() {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(backend) = &options.backend {
        config.backend_url = backend.clone();
    }
    if let Some(ws) = &options.ws {
        config.channels.base_url = ws.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "livegraph".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let config = load_config(&options)?;

        if let Some(file) = options.serve.as_deref() {
            init_serve_logging();
            let port = options.port.unwrap_or(livegraph::serve::DEFAULT_PORT);
            let channels = config.channels.channel_names()?;
            let watch_channel = config.channels.manager_config()?.reload_channel;

            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(livegraph::serve::serve(
                PathBuf::from(file),
                port,
                channels,
                &watch_channel,
            ))?;
            return Ok(());
        }

        init_viewer_logging(options.log_file.as_deref())?;
        tracing::info!(backend = %config.backend_url, ws = %config.channels.base_url, "starting viewer");

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();

        runtime.block_on(async move {
            let tui_join = tokio::task::spawn_blocking(move || {
                livegraph::tui::run(&config, handle).map_err(|err| err.to_string())
            })
            .await;

            let tui_result = tui_join.map_err(|err| -> Box<dyn Error> { Box::new(err) })?;
            tui_result.map_err(|err| {
                Box::new(std::io::Error::new(std::io::ErrorKind::Other, err)) as Box<dyn Error>
            })?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("livegraph: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{load_config, parse_options, CliOptions};

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_viewer_overrides() {
        let options = parse_options(args(&[
            "--backend",
            "http://example:9000",
            "--ws",
            "ws://example:9000/ws",
            "--log-file",
            "viewer.log",
        ]))
        .expect("parse options");
        assert_eq!(options.backend.as_deref(), Some("http://example:9000"));
        assert_eq!(options.ws.as_deref(), Some("ws://example:9000/ws"));
        assert_eq!(options.log_file.as_deref(), Some("viewer.log"));
        assert!(options.serve.is_none());
    }

    #[test]
    fn parses_serve_with_port() {
        let options =
            parse_options(args(&["--serve", "graph.mmd", "--port", "0"])).expect("parse options");
        assert_eq!(options.serve.as_deref(), Some("graph.mmd"));
        assert_eq!(options.port, Some(0));
    }

    #[test]
    fn parses_serve_with_config() {
        let options = parse_options(args(&["--config", "lg.json", "--serve", "graph.mmd"]))
            .expect("parse options");
        assert_eq!(options.config.as_deref(), Some("lg.json"));
        assert_eq!(options.serve.as_deref(), Some("graph.mmd"));
    }

    #[test]
    fn rejects_port_without_serve() {
        parse_options(args(&["--port", "8402"])).unwrap_err();
    }

    #[test]
    fn rejects_viewer_flags_with_serve() {
        parse_options(args(&["--serve", "graph.mmd", "--backend", "http://x"])).unwrap_err();
        parse_options(args(&["--ws", "ws://x", "--serve", "graph.mmd"])).unwrap_err();
        parse_options(args(&["--serve", "graph.mmd", "--log-file", "a.log"])).unwrap_err();
    }

    #[test]
    fn rejects_invalid_port() {
        parse_options(args(&["--serve", "graph.mmd", "--port", "http"])).unwrap_err();
        parse_options(args(&["--serve", "graph.mmd", "--port", "70000"])).unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_positional_args() {
        parse_options(args(&["--nope"])).unwrap_err();
        parse_options(args(&["graph.mmd"])).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags() {
        parse_options(args(&["--backend", "a", "--backend", "b"])).unwrap_err();
        parse_options(args(&["--serve", "a", "--serve", "b"])).unwrap_err();
        parse_options(args(&["--serve", "a", "--port", "1", "--port", "2"])).unwrap_err();
    }

    #[test]
    fn rejects_missing_values() {
        parse_options(args(&["--config"])).unwrap_err();
        parse_options(args(&["--serve"])).unwrap_err();
        parse_options(args(&["--serve", "graph.mmd", "--port"])).unwrap_err();
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let options = parse_options(args(&["--backend", "http://example:9000", "--ws", "ws://example:9000/ws"]))
            .expect("parse options");
        let config = load_config(&options).expect("config");
        assert_eq!(config.backend_url, "http://example:9000");
        assert_eq!(config.channels.base_url, "ws://example:9000/ws");
        assert_eq!(config.channels.names, vec!["file_changes", "node_execution"]);
    }
}
