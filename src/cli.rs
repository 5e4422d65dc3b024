//! Argument parsing and edge-file loading for the `graphstow` binary.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::errors::{StowError, StowResult};

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 5] = ["--command", "--dir", "--edges", "--node", "--version"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub command: String,
    pub command_args: Vec<String>,
    pub verbose: bool,
}

impl CommandLineConfig {
    /// Parse `args`, where `args[0]` is the program name.
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut command = String::from("home");
        let mut command_args = Vec::new();
        let mut command_set = false;
        let mut verbose = false;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            if command_set {
                command_args.push(arg.to_string());
                continue;
            }
            match *arg {
                "--command" => {
                    command = iter
                        .next()
                        .ok_or_else(|| "--command requires a value".to_string())?
                        .to_string();
                    command_set = true;
                }
                "-v" | "--verbose" => verbose = true,
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => {
                    command = arg.to_string();
                    command_set = true;
                }
            }
        }
        Ok(Self {
            command,
            command_args,
            verbose,
        })
    }

    pub fn help() -> &'static str {
        "Usage: graphstow [-v] <command> [args]\n\
         \n\
         Commands:\n\
         \x20 home                                   print the data home directory\n\
         \x20 dir <key> [subkey...] [--version V]    print (and create) a module directory\n\
         \x20 build --dir PATH --edges FILE [--sort] build a graph cache from a TSV edge list\n\
         \x20 out --dir PATH --node NODE             print out-neighbors of NODE\n\
         \x20 in --dir PATH --node NODE              print in-neighbors of NODE\n\
         \x20 status --dir PATH                      print node and edge counts\n"
    }
}

pub fn required_flag_value(args: &[String], flag: &str) -> StowResult<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter
                .next()
                .cloned()
                .ok_or_else(|| StowError::invalid_input(format!("missing value for {flag}")));
        }
    }
    Err(StowError::invalid_input(format!("{flag} is required")))
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// Positional arguments, skipping flags and their values.
pub fn positional_args(args: &[String]) -> Vec<String> {
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        positional.push(arg.clone());
    }
    positional
}

/// Stream a tab-separated edge list: one `tail<TAB>head` pair per line.
///
/// Blank lines and lines starting with `#` are skipped; columns after the
/// second are ignored. Reading stops after the first error.
pub fn read_tsv_edges(path: &Path) -> StowResult<TsvEdges> {
    Ok(TsvEdges {
        path: path.to_path_buf(),
        lines: BufReader::new(File::open(path)?).lines(),
        line_no: 0,
        done: false,
    })
}

pub struct TsvEdges {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    done: bool,
}

impl Iterator for TsvEdges {
    type Item = StowResult<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            };
            self.line_no += 1;
            let trimmed = line.trim_end_matches('\r');
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut columns = trimmed.split('\t');
            return match (columns.next(), columns.next()) {
                (Some(tail), Some(head)) => Some(Ok((tail.to_string(), head.to_string()))),
                _ => {
                    self.done = true;
                    Some(Err(StowError::invalid_input(format!(
                        "{}:{}: expected two tab-separated columns",
                        self.path.display(),
                        self.line_no
                    ))))
                }
            };
        }
        None
    }
}
