//! Console commands understood by the explorer.

use anyhow::{anyhow, bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Pointer click at `(lon, lat)`
    Click { lon: f64, lat: f64 },
    /// Pointer move to `(lon, lat)`
    Move { lon: f64, lat: f64 },
    /// Click an area of the current level by its code
    Select(String),
    ZoomOut,
    MaxLevel(i64),
    List,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  click <lon> <lat>   click the map at a coordinate
  move <lon> <lat>    move the pointer to a coordinate
  select <code>       click the area with this code
  out                 zoom out one level
  max <level>         set the deepest selectable level (0-4)
  list                list areas at the current level
  status              show the selection panel
  help                show this help
  quit                exit";

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let command = match (verb, args.as_slice()) {
            ("click", [lon, lat]) => Command::Click {
                lon: parse_coord(lon)?,
                lat: parse_coord(lat)?,
            },
            ("move", [lon, lat]) => Command::Move {
                lon: parse_coord(lon)?,
                lat: parse_coord(lat)?,
            },
            ("select", [code]) => Command::Select(code.to_string()),
            ("out", []) => Command::ZoomOut,
            ("max", [level]) => Command::MaxLevel(
                level
                    .parse()
                    .map_err(|_| anyhow!("level must be an integer, got {level}"))?,
            ),
            ("list", []) => Command::List,
            ("status", []) => Command::Status,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("unrecognized command: {}", line.trim()),
        };
        Ok(Some(command))
    }
}

fn parse_coord(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| anyhow!("not a coordinate: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            Command::parse("click 100.5 13.75").unwrap(),
            Some(Command::Click {
                lon: 100.5,
                lat: 13.75
            })
        );
        assert_eq!(
            Command::parse("  select TH-10 ").unwrap(),
            Some(Command::Select("TH-10".into()))
        );
        assert_eq!(Command::parse("max 2").unwrap(), Some(Command::MaxLevel(2)));
        assert_eq!(Command::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("click 1").is_err());
        assert!(Command::parse("move a b").is_err());
        assert!(Command::parse("max two").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
