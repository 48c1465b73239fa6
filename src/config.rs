//! Command line and configuration file handling.
//!
//! The classic surface is positional: an interface followed by up to 24
//! paths exported as drives C: onwards. A TOML file given with `--config`
//! can supply the same settings (plus explicit drive letters); command-line
//! values win over the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::drives;

/// Serves files to EtherDFS clients over raw Ethernet.
#[derive(Debug, Parser)]
#[command(name = "ethersrv", version, about)]
pub struct Cli {
    /// Keep the process in the foreground (do not daemonize).
    #[arg(short = 'f', long)]
    pub foreground: bool,

    /// Read interface and drive mappings from a TOML file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Network interface to listen on.
    pub interface: Option<String>,

    /// Host directories exported as drives C: onwards.
    #[arg(value_name = "PATH")]
    pub roots: Vec<PathBuf>,
}

/// The `--config` file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub interface: Option<String>,
    #[serde(default)]
    pub foreground: bool,
    /// Drive letter to host path, e.g. `C = "/srv/dos"`.
    #[serde(default)]
    pub drives: BTreeMap<String, PathBuf>,
}

/// Fully merged startup settings.
#[derive(Debug)]
pub struct Settings {
    pub interface: String,
    pub foreground: bool,
    /// Drive index (2 = C) to exported host path, before canonicalization.
    pub exports: Vec<(u8, PathBuf)>,
}

#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn usage<T>(message: impl Into<String>) -> Result<T, Error> {
    Err(Error(message.into()))
}

/// Merges the command line with the optional configuration file.
pub fn resolve(cli: Cli) -> Result<Settings, Error> {
    let file = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| Error(format!("cannot read '{}': {err}", path.display())))?;
            parse_file(&text)
                .map_err(|err| Error(format!("cannot parse '{}': {err}", path.display())))?
        }
        None => FileConfig::default(),
    };

    let Some(interface) = cli.interface.or(file.interface) else {
        return usage("no interface given");
    };

    let mut exports: Vec<(u8, PathBuf)> = Vec::new();
    for (letter, path) in &file.drives {
        let index = parse_letter(letter)?;
        exports.push((index, path.clone()));
    }
    if cli.roots.len() > usize::from(25 - drives::FIRST_DRIVE) + 1 {
        return usage("too many exported paths (drives C through Z)");
    }
    for (offset, path) in cli.roots.iter().enumerate() {
        let index = drives::FIRST_DRIVE + offset as u8;
        exports.retain(|(taken, _)| *taken != index);
        exports.push((index, path.clone()));
    }
    exports.sort_by_key(|(index, _)| *index);
    if exports.is_empty() {
        return usage("no exported paths given");
    }

    Ok(Settings {
        interface,
        foreground: cli.foreground || file.foreground,
        exports,
    })
}

fn parse_file(text: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(text)
}

fn parse_letter(letter: &str) -> Result<u8, Error> {
    let mut chars = letter.chars();
    let index = match (chars.next().and_then(drives::index), chars.next()) {
        (Some(index), None) => index,
        _ => return usage(format!("'{letter}' is not a drive letter")),
    };
    if index < drives::FIRST_DRIVE {
        return usage(format!("drive {letter}: cannot be exported (A and B are reserved)"));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ethersrv").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn positional_paths_map_from_c() {
        let settings = resolve(cli(&["eth0", "/srv/one", "/srv/two"])).unwrap();
        assert_eq!(settings.interface, "eth0");
        assert!(!settings.foreground);
        assert_eq!(
            settings.exports,
            vec![
                (2, PathBuf::from("/srv/one")),
                (3, PathBuf::from("/srv/two"))
            ]
        );
    }

    #[test]
    fn missing_interface_or_paths_is_an_error() {
        assert!(resolve(cli(&[])).is_err());
        assert!(resolve(cli(&["eth0"])).is_err());
    }

    #[test]
    fn file_config_parses_drive_letters() {
        let file: FileConfig = toml::from_str(
            r#"
            interface = "eth1"
            foreground = true

            [drives]
            C = "/srv/dos"
            E = "/srv/games"
            "#,
        )
        .unwrap();
        assert_eq!(file.interface.as_deref(), Some("eth1"));
        assert!(file.foreground);
        assert_eq!(file.drives.len(), 2);
    }

    #[test]
    fn file_supplies_defaults_and_command_line_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ethersrv.toml");
        std::fs::write(
            &path,
            "interface = \"eth9\"\n\n[drives]\nC = \"/srv/file\"\nD = \"/srv/extra\"\n",
        )
        .unwrap();
        let config = path.to_str().unwrap();

        // File alone carries everything.
        let settings = resolve(cli(&["--config", config])).unwrap();
        assert_eq!(settings.interface, "eth9");
        assert_eq!(
            settings.exports,
            vec![
                (2, PathBuf::from("/srv/file")),
                (3, PathBuf::from("/srv/extra"))
            ]
        );

        // Positional values override the file's C: mapping and interface.
        let settings = resolve(cli(&["--config", config, "eth0", "/srv/cli"])).unwrap();
        assert_eq!(settings.interface, "eth0");
        assert_eq!(
            settings.exports,
            vec![
                (2, PathBuf::from("/srv/cli")),
                (3, PathBuf::from("/srv/extra"))
            ]
        );
    }

    #[test]
    fn reserved_letters_are_rejected() {
        assert!(parse_letter("A").is_err());
        assert!(parse_letter("CC").is_err());
        assert!(parse_letter("!").is_err());
        assert_eq!(parse_letter("d").unwrap(), 3);
    }
}
