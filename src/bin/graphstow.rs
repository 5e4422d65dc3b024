use std::{env, path::PathBuf, process};

use graphstow::{
    BuildOptions, GraphCache, Module, StowConfig, StowError,
    cli::{CommandLineConfig, has_flag, positional_args, read_tsv_edges, required_flag_value},
    graph::try_build_graph_cache,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    install_tracing_subscriber(config.verbose);

    if let Err(err) = run_command(&config.command, &config.command_args) {
        eprintln!("command failed: {err}");
        let code = if matches!(err, StowError::InvalidInput(_)) { 2 } else { 1 };
        process::exit(code);
    }
}

fn install_tracing_subscriber(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_command(command: &str, args: &[String]) -> Result<(), StowError> {
    match command {
        "home" => {
            let home = StowConfig::from_env().home(true)?;
            println!("{}", home.display());
            Ok(())
        }
        "dir" => run_dir(args),
        "build" => run_build(args),
        "out" => {
            let (graph, node) = open_for_query(args)?;
            for neighbor in graph.out_edges(&node)? {
                println!("{neighbor}");
            }
            Ok(())
        }
        "in" => {
            let (graph, node) = open_for_query(args)?;
            for neighbor in graph.in_edges(&node)? {
                println!("{neighbor}");
            }
            Ok(())
        }
        "status" => {
            let dir = required_flag_value(args, "--dir")?;
            let graph: GraphCache<String> = GraphCache::from_directory(&dir)?;
            let payload = json!({
                "command": "status",
                "directory": graph.paths().directory.display().to_string(),
                "nodes": graph.node_count(),
                "edges": graph.edge_count(),
            });
            println!("{payload}");
            Ok(())
        }
        other => Err(StowError::invalid_input(format!("unknown command {other}"))),
    }
}

fn run_dir(args: &[String]) -> Result<(), StowError> {
    let positional = positional_args(args);
    let Some((key, subkeys)) = positional.split_first() else {
        return Err(StowError::invalid_input("dir requires a module key"));
    };
    let module = Module::from_key(key, &[], true)?;
    let subkeys: Vec<&str> = subkeys.iter().map(String::as_str).collect();
    let path = if has_flag(args, "--version") {
        let version = required_flag_value(args, "--version")?;
        module.join_versioned(&version, &subkeys, true)?
    } else {
        module.join(&subkeys, true)?
    };
    println!("{}", path.display());
    Ok(())
}

fn run_build(args: &[String]) -> Result<(), StowError> {
    let dir = required_flag_value(args, "--dir")?;
    let edges_path = PathBuf::from(required_flag_value(args, "--edges")?);
    let options = BuildOptions {
        sort_nodes: has_flag(args, "--sort"),
        estimated_edges: None,
        progress: true,
    };
    let graph = try_build_graph_cache(|| read_tsv_edges(&edges_path), &dir, &options)?;
    let payload = json!({
        "command": "build",
        "directory": graph.paths().directory.display().to_string(),
        "nodes": graph.node_count(),
        "edges": graph.edge_count(),
    });
    println!("{payload}");
    Ok(())
}

fn open_for_query(args: &[String]) -> Result<(GraphCache<String>, String), StowError> {
    let dir = required_flag_value(args, "--dir")?;
    let node = required_flag_value(args, "--node")?;
    Ok((GraphCache::from_directory(&dir)?, node))
}
