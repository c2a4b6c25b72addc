// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Volley CLI - HTTP Client Engine
//!
//! Thin command line front end over the volley library.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};

use volley::{parse_cookie_header, CookieAttr, EngineConfig, HttpClient, Request, TransferOptions};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "volley=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("volley {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "get" | "post" | "batch" | "cookies" => match run(&args[1], &args[2..]).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(1)
            }
        },
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Volley - HTTP Client Engine

USAGE:
    volley <COMMAND> [OPTIONS] [ARGS]

COMMANDS:
    get <url> [key=value ...]     GET a URL, key/value pairs go in the query
    post <url> [key=value ...]    POST key/value pairs as a form
    batch <url> <url> ...         GET every URL concurrently
    cookies <set-cookie header>   Tokenize a Set-Cookie header
    help                          Show this help message
    version                       Show version information

OPTIONS:
    -o, --option <name=value>     Transfer option, e.g. timeout_ms=2000
    -c, --config <file>           JSON engine config (default: VOLLEY_* env)

EXAMPLES:
    volley get https://example.com/search q=rust
    volley post https://example.com/login user=alice -o verify_tls=true
    volley batch https://example.com/a https://example.com/b -o timeout_ms=1500
    volley cookies 'sid=abc; Path=/; HttpOnly, theme="dark"'
"#
    );
}

/// Positional arguments plus parsed flags
struct Invocation {
    positional: Vec<String>,
    options: TransferOptions,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Invocation> {
    let mut invocation = Invocation {
        positional: Vec::new(),
        options: TransferOptions::new(),
        config: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--option" => {
                let spec = iter.next().context("-o needs name=value")?;
                let (name, value) = spec
                    .split_once('=')
                    .with_context(|| format!("Invalid option [{}], expected name=value", spec))?;
                invocation.options.set(name, value)?;
            }
            "-c" | "--config" => {
                let path = iter.next().context("--config needs a file")?;
                invocation.config = Some(PathBuf::from(path));
            }
            _ => invocation.positional.push(arg.clone()),
        }
    }

    Ok(invocation)
}

fn parse_pairs(args: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("Invalid parameter [{}], expected key=value", arg))
        })
        .collect()
}

fn engine_config(invocation: &Invocation) -> anyhow::Result<EngineConfig> {
    let mut config = match invocation.config {
        Some(ref path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };
    config.options = config.options.merge(&invocation.options);
    Ok(config)
}

async fn run(command: &str, args: &[String]) -> anyhow::Result<ExitCode> {
    let invocation = parse_args(args)?;

    if command == "cookies" {
        return show_cookies(&invocation.positional);
    }

    let client = HttpClient::with_config(engine_config(&invocation)?);

    match command {
        "get" | "post" => {
            let Some((url, rest)) = invocation.positional.split_first() else {
                bail!("Usage: volley {} <url> [key=value ...]", command);
            };
            let pairs = parse_pairs(rest)?;

            let mut request = if command == "get" {
                Request::get(url.as_str()).query(pairs)?
            } else {
                Request::post(url.as_str()).form(pairs)
            };

            println!("{} {}", request.get_method(), request.get_url());
            let outcome = client.submit(&mut request).await.map(|_| ());
            if request.status()? != 0 {
                print_response(&request)?;
            }
            match outcome {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    eprintln!("Request failed: {}", e);
                    Ok(ExitCode::from(1))
                }
            }
        }
        "batch" => {
            if invocation.positional.is_empty() {
                bail!("Usage: volley batch <url> <url> ...");
            }
            let mut batch: Vec<Request> = invocation
                .positional
                .iter()
                .map(|url| Request::get(url.as_str()))
                .collect();

            client.submit_all(&mut batch).await?;

            println!("\n=== Batch Results ({} requests) ===", batch.len());
            let mut failed = 0;
            for request in &batch {
                let info = request.info()?;
                match request.failure()? {
                    Some(failure) => {
                        failed += 1;
                        println!("✗ {} ({}ms) {}", request.get_url(), info.total_time_ms, failure);
                    }
                    None => println!(
                        "✓ [{}] {} ({}ms, {} bytes)",
                        request.status()?,
                        request.get_url(),
                        info.total_time_ms,
                        info.size_download
                    ),
                }
            }
            println!("\nSummary: {} ok, {} failed", batch.len() - failed, failed);

            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        _ => bail!("Unknown command: {}", command),
    }
}

fn print_response(request: &Request) -> anyhow::Result<()> {
    let info = request.info()?;

    println!("\n=== Response ===");
    if let Some(line) = request.status_line()? {
        println!("{}", line);
    }
    println!("Status: {}", request.status()?);
    println!("URL: {}", info.effective_url);
    println!("Redirects: {}", info.redirect_count);
    println!("Content-Type: {:?}", info.content_type);
    println!("Size: {} bytes", info.size_download);
    println!("Time: {}ms", info.total_time_ms);

    let headers = request.response_headers()?;
    if !headers.is_empty() {
        println!("\n=== Headers ({}) ===", headers.len());
        for (name, field) in headers.iter() {
            for value in field.values() {
                println!("  {}: {}", name, value);
            }
        }
    }

    let body = request.text()?;
    if !body.is_empty() {
        println!("\n=== Body ===");
        println!("{}", body);
    }

    Ok(())
}

fn show_cookies(args: &[String]) -> anyhow::Result<ExitCode> {
    if args.is_empty() {
        bail!("Usage: volley cookies <set-cookie header>");
    }

    let header = args.join(" ");
    let cookies = parse_cookie_header(&header);
    if cookies.is_empty() {
        println!("No cookies found");
        return Ok(ExitCode::from(1));
    }

    println!("=== Cookies ({}) ===", cookies.len());
    for cookie in &cookies {
        println!("\n{} = {}", cookie.name, cookie.value);
        for (name, attr) in &cookie.attributes {
            match attr {
                CookieAttr::Value(value) => println!("  {}: {}", name, value),
                CookieAttr::Flag => println!("  {} (flag)", name),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
