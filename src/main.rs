//! Ethereum Key Generator CLI
//!
//! Usage:
//!   eth_keygen generate -n 5 -o eth_keys.json   # Five random keypairs, saved as JSON
//!   eth_keygen search -p dead                   # Address starting with 0xdead
//!   eth_keygen search -s beef -c                # Address ending with "beef", checksum casing

use std::error::Error;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eth_keygen::config::{Command, GenerateArgs, SearchArgs};
use eth_keygen::{
    generate_batch, Config, KeyExport, Keypair, SearchCoordinator, SearchEvent, SearchHandle,
    SearchStatus,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    }

    let outcome = match &config.command {
        Command::Generate(args) => run_generate(args),
        Command::Search(args) => run_search(args),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_generate(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    let keypairs = generate_batch(args.count)?;

    for (index, keypair) in keypairs.iter().enumerate() {
        print_keypair(keypair, &format!("Key #{}", index + 1));
    }

    if let Some(path) = &args.output {
        KeyExport::from_keypairs(&keypairs).write_to(path)?;
        println!("Saved {} keypair(s) to {}", keypairs.len(), path.display());
    }
    Ok(())
}

fn run_search(args: &SearchArgs) -> Result<(), Box<dyn Error>> {
    let query = args.query()?;

    // Print startup info
    println!("Ethereum Vanity Search");
    println!("======================");
    println!("Query:      {}", query);
    println!("Difficulty: {}", query.difficulty_description());
    println!("Workers:    {}", args.worker_count());
    println!();

    let coordinator = SearchCoordinator::new(args.search_options());
    let handle = coordinator.start(query)?;

    let token = handle.cancel_token();
    ctrlc::set_handler(move || token.cancel())?;

    println!("Searching... (Press Ctrl+C to stop)\n");

    for event in handle.events().iter() {
        match event {
            SearchEvent::Progress { attempts, progress } => {
                print_progress(&handle, attempts, progress)
            }
            SearchEvent::Found { keypair, .. } => print_keypair(&keypair, "Match"),
            SearchEvent::Cancelled { .. } => println!("\nStopped by user."),
            SearchEvent::Failed { error, .. } => eprintln!("\nSearch failed: {}", error),
        }
    }

    // Print final stats
    println!("\n--- Final Statistics ---");
    println!("Total keys generated: {}", format_number(handle.state().attempts));
    println!("Time elapsed:         {:.2}s", handle.elapsed().as_secs_f64());
    println!(
        "Average speed:        {}/s",
        format_number(handle.keys_per_second() as u64)
    );

    let state = handle.wait();
    match (state.status, state.result, state.error) {
        (SearchStatus::Found, Some(keypair), _) => {
            if let Some(path) = &args.output {
                KeyExport::default()
                    .with_search_result(&keypair)
                    .write_to(path)?;
                println!("Saved match to {}", path.display());
            }
            Ok(())
        }
        (SearchStatus::Failed, _, Some(error)) => Err(error.into()),
        _ => Ok(()),
    }
}

fn print_keypair(keypair: &Keypair, title: &str) {
    println!("=== {} ===", title);
    println!("Address:     {}", keypair.address());
    println!("Private Key: {}", keypair.private_key_hex_prefixed());
    println!();
}

fn print_progress(handle: &SearchHandle, attempts: u64, progress: u8) {
    println!(
        "[{:>4}s] Generated {} keys ({}/s), {}% chance of a match by now",
        handle.elapsed().as_secs(),
        format_number(attempts),
        format_number(handle.keys_per_second() as u64),
        progress
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
