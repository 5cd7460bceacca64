use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::machine::NodeId;

/// Script used when no path is given.
pub const DEFAULT_INPUT_FILE: &str = "input.txt";

pub const USAGE: &str = "\
Usage: winnow-sm [script] [--check | --dump] [--entry <id>]

  script        script file to run (default: input.txt)
  --check       load and validate the script, then exit
  --dump        print the loaded node table as JSON, then exit
  --entry <id>  start at node <id> instead of the first block

Logging: set RUST_LOG=debug or RUST_LOG=trace for verbose output";

/// What to do once the script is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Run,
    Check,
    Dump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Script file to load.
    pub input: PathBuf,
    /// Node to start at. `None` starts at the first registered node.
    pub entry: Option<NodeId>,
    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT_FILE),
            entry: None,
            mode: Mode::Run,
        }
    }
}

impl Config {
    /// Line announcing the script on stdout. `--dump` keeps stdout pure JSON.
    pub fn banner(&self) -> Option<String> {
        match self.mode {
            Mode::Dump => None,
            Mode::Run | Mode::Check => Some(format!("Input file: {}\n", self.input.display())),
        }
    }

    /// Build from command-line arguments, program name already skipped.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut input = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--check" => config.mode = Mode::Check,
                "--dump" => config.mode = Mode::Dump,
                "--entry" => {
                    let raw = args
                        .next()
                        .ok_or_else(|| Error::Usage("--entry needs a node id".into()))?;
                    let id = raw
                        .parse()
                        .map_err(|_| Error::Usage(format!("'{raw}' is not a node id")))?;
                    config.entry = Some(id);
                }
                flag if flag.starts_with("--") => {
                    return Err(Error::Usage(format!("unknown option {flag}")));
                }
                path => {
                    if input.replace(PathBuf::from(path)).is_some() {
                        return Err(Error::Usage("only one script may be given".into()));
                    }
                }
            }
        }

        if let Some(input) = input {
            config.input = input;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_to_input_txt() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input, PathBuf::from("input.txt"));
    }

    #[test]
    fn test_script_mode_and_entry() {
        let config = Config::from_args(args(&["--entry", "4", "quest.txt", "--dump"])).unwrap();
        assert_eq!(
            config,
            Config {
                input: PathBuf::from("quest.txt"),
                entry: Some(4),
                mode: Mode::Dump,
            }
        );
    }

    #[test]
    fn test_dump_has_no_banner() {
        let dump = Config::from_args(args(&["--dump"])).unwrap();
        assert_eq!(dump.banner(), None);
        let run = Config::from_args(args(&["quest.txt"])).unwrap();
        assert_eq!(run.banner(), Some("Input file: quest.txt\n".to_owned()));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Config::from_args(args(&["--entry"])).is_err());
        assert!(Config::from_args(args(&["--entry", "x"])).is_err());
        assert!(Config::from_args(args(&["--verbose"])).is_err());
        assert!(Config::from_args(args(&["a.txt", "b.txt"])).is_err());
    }
}
