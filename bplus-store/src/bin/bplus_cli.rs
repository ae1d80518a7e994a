//! Simple CLI for the B+ tree record store.
//!
//! Loads a bulk-load file, then runs one command against the loaded store.
//!
//! Usage:
//!   bplus_cli <data_file|-> insert <key> <value>
//!   bplus_cli <data_file|-> find <key>
//!   bplus_cli <data_file|-> update <key> <value>
//!   bplus_cli <data_file|-> delete <key>
//!   bplus_cli <data_file|-> scan
//!   bplus_cli <data_file|-> range [start] [end]
//!   bplus_cli <data_file|-> stats
//!   bplus_cli <data_file|-> tree
//!   bplus_cli <data_file|-> check
//!
//! Environment:
//!   BPLUS_ORDER   tree order (default: 4)
//!   BPLUS_LOG     operation log path (default: log.txt)
//!   BPLUS_STRICT  set to fail the load on a malformed line
//!   RUST_LOG      diagnostic log filter

use bplus_store::{Config, Db, Key, LoadPolicy, StoreError, DEFAULT_ORDER};
use std::env;
use std::process::exit;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bplus_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: bplus_cli <data_file|-> <command> [args...]");
        eprintln!("Commands:");
        eprintln!("  insert <key> <value> - Insert or overwrite a record");
        eprintln!("  find <key>           - Get value for a key");
        eprintln!("  update <key> <value> - Replace the value of an existing key");
        eprintln!("  delete <key>         - Delete a key");
        eprintln!("  scan                 - List all records in key order");
        eprintln!("  range [start] [end]  - List records with start <= key < end");
        eprintln!("  stats                - Show tree statistics");
        eprintln!("  tree                 - Dump the tree structure as JSON");
        eprintln!("  check                - Verify tree invariants");
        exit(1);
    }

    let data_file = &args[1];
    let command = &args[2];

    let order = match env::var("BPLUS_ORDER") {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(order) => order,
            Err(_) => {
                eprintln!("ERROR: Invalid BPLUS_ORDER: {}", raw);
                exit(1);
            }
        },
        Err(_) => DEFAULT_ORDER,
    };
    let log_path = env::var("BPLUS_LOG").unwrap_or_else(|_| "log.txt".to_string());
    let policy = if env::var_os("BPLUS_STRICT").is_some() {
        LoadPolicy::Abort
    } else {
        LoadPolicy::Skip
    };

    let config = Config::new()
        .order(order)
        .log_path(log_path)
        .load_policy(policy);
    let db = match Db::open(config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: Failed to open store: {}", e);
            exit(1);
        }
    };

    if data_file != "-" {
        match db.load_file(data_file) {
            Ok(report) => {
                eprintln!(
                    "Loaded {} records ({} overwritten, {} skipped) in {:.3} ms",
                    report.inserted + report.overwritten,
                    report.overwritten,
                    report.skipped,
                    report.elapsed.as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                eprintln!("ERROR: Failed to load {}: {}", data_file, e);
                exit(1);
            }
        }
    }

    match command.as_str() {
        "insert" => {
            if args.len() < 5 {
                eprintln!("Usage: bplus_cli <data_file> insert <key> <value>");
                exit(1);
            }
            let key = parse_key(&args[3]);
            db.insert(key, args[4..].join(" "));
            println!("OK");
        }

        "find" => {
            if args.len() < 4 {
                eprintln!("Usage: bplus_cli <data_file> find <key>");
                exit(1);
            }
            match db.find(parse_key(&args[3])) {
                Ok(value) => println!("{}", value),
                Err(e) => report_error(e),
            }
        }

        "update" => {
            if args.len() < 5 {
                eprintln!("Usage: bplus_cli <data_file> update <key> <value>");
                exit(1);
            }
            match db.update(parse_key(&args[3]), args[4..].join(" ")) {
                Ok(()) => println!("UPDATED"),
                Err(e) => report_error(e),
            }
        }

        "delete" => {
            if args.len() < 4 {
                eprintln!("Usage: bplus_cli <data_file> delete <key>");
                exit(1);
            }
            match db.delete(parse_key(&args[3])) {
                Ok(_) => println!("DELETED"),
                Err(e) => report_error(e),
            }
        }

        "scan" => {
            let records = db.scan();
            println!("COUNT: {}", records.len());
            for (key, value) in records {
                println!("{:<6} => {}", key, value);
            }
        }

        "range" => {
            let start = args.get(3).map(|s| parse_key(s));
            let end = args.get(4).map(|s| parse_key(s));
            let records = db.range(start, end);
            println!("COUNT: {}", records.len());
            for (key, value) in records {
                println!("{:<6} => {}", key, value);
            }
        }

        "stats" => {
            let stats = db.stats();
            println!("entries: {}", stats.entries);
            println!("tree_height: {}", stats.tree_height);
            println!("node_count: {}", stats.node_count);
            println!("leaf_count: {}", stats.leaf_count);
            println!("order: {}", stats.order);
        }

        "tree" => match serde_json::to_string_pretty(&db.export_tree()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                exit(1);
            }
        },

        "check" => match db.check() {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                exit(1);
            }
        },

        _ => {
            eprintln!("Unknown command: {}", command);
            exit(1);
        }
    }
}

fn parse_key(raw: &str) -> Key {
    match raw.parse() {
        Ok(key) => key,
        Err(_) => {
            eprintln!("ERROR: Invalid key: {}", raw);
            exit(1);
        }
    }
}

fn report_error(e: StoreError) -> ! {
    if e.is_not_found() {
        println!("NOT_FOUND");
        exit(2);
    }
    eprintln!("ERROR: {}", e);
    exit(1);
}
