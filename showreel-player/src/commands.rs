//! Driver commands
//!
//! One command per input line, e.g. `scroll 1200`, `filter c1`, `next`.

use std::str::FromStr;

use showreel_common::{CategoryId, Locale, VideoId};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move the viewport top to this page offset
    Scroll(f64),
    /// New viewport size in CSS pixels
    Resize { width: f64, height: f64 },
    /// Category filter; None shows all videos
    Filter(Option<CategoryId>),
    Locale(Locale),
    Next,
    Previous,
    Select(usize),
    Play(VideoId),
    Pause(VideoId),
    Click(VideoId),
    Stop,
    /// Simulate a network failure on a media element
    Fail { video_id: VideoId, reason: String },
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  scroll <y>           move the viewport to page offset y
  resize <w> <h>       change the viewport size
  filter <id|all>      show one category or everything
  locale <en|fr>       language for titles in status
  next | prev          step the active sequence
  select <i>           play index i of the active sequence
  play <id>            make a video the audible one
  pause <id>           pause it if it is the audible one
  click <id>           toggle a tile
  stop                 silence everything
  fail <id> <reason>   simulate a media error
  status               print the section as JSON
  quit";

fn dimension(arg: &str) -> Result<f64> {
    arg.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| Error::InvalidCommand(format!("bad size '{}'", arg)))
}

fn required<'a>(arg: Option<&'a str>, command: &str) -> Result<&'a str> {
    arg.ok_or_else(|| Error::InvalidCommand(format!("'{}' needs an argument", command)))
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "scroll" => {
                let arg = required(rest, "scroll")?;
                let y = arg
                    .parse::<f64>()
                    .ok()
                    .filter(|y| y.is_finite())
                    .ok_or_else(|| Error::InvalidCommand(format!("bad offset '{}'", arg)))?;
                Command::Scroll(y)
            }
            "resize" => {
                let arg = required(rest, "resize")?;
                let (width, height) = arg
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::InvalidCommand("'resize' needs width and height".into()))?;
                Command::Resize {
                    width: dimension(width)?,
                    height: dimension(height.trim())?,
                }
            }
            "locale" => {
                let arg = required(rest, "locale")?;
                let locale = arg
                    .parse()
                    .map_err(|_| Error::InvalidCommand(format!("unknown locale '{}'", arg)))?;
                Command::Locale(locale)
            }
            "filter" => match required(rest, "filter")? {
                "all" => Command::Filter(None),
                id => Command::Filter(Some(id.to_string())),
            },
            "next" => Command::Next,
            "prev" | "previous" => Command::Previous,
            "select" => {
                let arg = required(rest, "select")?;
                let index = arg
                    .parse()
                    .map_err(|_| Error::InvalidCommand(format!("bad index '{}'", arg)))?;
                Command::Select(index)
            }
            "play" => Command::Play(required(rest, "play")?.to_string()),
            "pause" => Command::Pause(required(rest, "pause")?.to_string()),
            "click" => Command::Click(required(rest, "click")?.to_string()),
            "stop" => Command::Stop,
            "fail" => {
                let arg = required(rest, "fail")?;
                let (video_id, reason) = match arg.split_once(char::is_whitespace) {
                    Some((id, reason)) => (id, reason.trim()),
                    None => (arg, "network error"),
                };
                Command::Fail {
                    video_id: video_id.to_string(),
                    reason: reason.to_string(),
                }
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(Error::InvalidCommand("empty line".to_string())),
            other => return Err(Error::InvalidCommand(format!("unknown command '{}'", other))),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("scroll 1200".parse::<Command>().unwrap(), Command::Scroll(1200.0));
        assert_eq!("filter all".parse::<Command>().unwrap(), Command::Filter(None));
        assert_eq!(
            "filter c1".parse::<Command>().unwrap(),
            Command::Filter(Some("c1".into()))
        );
        assert_eq!(
            "resize 390 844".parse::<Command>().unwrap(),
            Command::Resize {
                width: 390.0,
                height: 844.0
            }
        );
        assert_eq!("locale fr".parse::<Command>().unwrap(), Command::Locale(Locale::Fr));
        assert_eq!("  PREV ".parse::<Command>().unwrap(), Command::Previous);
        assert_eq!("select 2".parse::<Command>().unwrap(), Command::Select(2));
        assert_eq!(
            "fail v1 decode error".parse::<Command>().unwrap(),
            Command::Fail {
                video_id: "v1".into(),
                reason: "decode error".into()
            }
        );
        assert_eq!(
            "fail v1".parse::<Command>().unwrap(),
            Command::Fail {
                video_id: "v1".into(),
                reason: "network error".into()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        for line in ["", "scroll", "scroll far", "scroll NaN", "select -1", "resize 390", "resize 0 844", "locale de", "dance"] {
            assert!(
                matches!(line.parse::<Command>(), Err(Error::InvalidCommand(_))),
                "{:?} should not parse",
                line
            );
        }
    }
}
