//! Line-oriented command parsing.
//!
//! Each input line becomes one [`Command`]. Crop actions map directly onto
//! [`CropCommand`]s so the editor sees the same typed commands whatever
//! the front end.

use std::path::PathBuf;

use cliptrim_core::commands::CropCommand;
use cliptrim_core::crop_editor::CropField;
use cliptrim_core::types::{Rectangle, RegionName};

pub const HELP: &str = "\
Commands:
  duration FILE              Show the duration of a stored video
  download URL NAME          Download a remote video under NAME
  select FILE                Choose the video to trim
  start HH:MM:SS             Set the trim start
  end HH:MM:SS               Set the trim end
  mark-start SECS            Set the trim start from a playback position
  mark-end SECS              Set the trim end from a playback position
  frame PATH                 Use PATH as the current video frame
  crop begin screen|webcam   Start editing a crop region
  crop drag X Y W H          Move/resize the crop overlay
  crop field x|y|width|height VALUE
                             Type into a crop field
  crop lock on|off           Toggle the aspect ratio lock
  crop save                  Save the region being edited
  crop cancel                Close the editor without saving
  crop preview [DIR]         Refresh both previews, optionally saving PNGs
  process NAME               Trim and crop the selected video
  cleanup [confirm]          Delete every stored video
  cancel                     Stop following running jobs
  status                     Show the current form and crop state
  help                       Show this help
  quit                       Exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Duration(String),
    Download { url: String, filename: String },
    Select(String),
    StartTime(String),
    EndTime(String),
    MarkStart(f64),
    MarkEnd(f64),
    Frame(PathBuf),
    Crop(CropCommand),
    /// Refresh both previews, writing them into the directory when given.
    CropPreview(Option<PathBuf>),
    Process(String),
    Cleanup { confirmed: bool },
    Cancel,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'; type `help` for a list")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Err(CommandError::Empty);
    };

    match head.to_ascii_lowercase().as_str() {
        "duration" => one_arg(args, "duration FILE").map(Command::Duration),
        "download" => match args {
            [url, name @ ..] if !name.is_empty() => Ok(Command::Download {
                url: url.to_string(),
                filename: name.join(" "),
            }),
            _ => Err(CommandError::Usage("download URL NAME")),
        },
        "select" => one_arg(args, "select FILE").map(Command::Select),
        "start" => one_arg(args, "start HH:MM:SS").map(Command::StartTime),
        "end" => one_arg(args, "end HH:MM:SS").map(Command::EndTime),
        "mark-start" => seconds(args, "mark-start SECS").map(Command::MarkStart),
        "mark-end" => seconds(args, "mark-end SECS").map(Command::MarkEnd),
        "frame" => one_arg(args, "frame PATH").map(|p| Command::Frame(PathBuf::from(p))),
        "crop" => parse_crop(args),
        "process" => one_arg(args, "process NAME").map(Command::Process),
        "cleanup" => match args {
            [] => Ok(Command::Cleanup { confirmed: false }),
            [word] if word.eq_ignore_ascii_case("confirm") => Ok(Command::Cleanup { confirmed: true }),
            _ => Err(CommandError::Usage("cleanup [confirm]")),
        },
        "cancel" => Ok(Command::Cancel),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_crop(args: &[&str]) -> Result<Command, CommandError> {
    let Some((&action, rest)) = args.split_first() else {
        return Err(CommandError::Usage(
            "crop begin|drag|field|lock|save|cancel|preview ...",
        ));
    };

    let command = match action.to_ascii_lowercase().as_str() {
        "begin" | "edit" => {
            let [region] = rest else {
                return Err(CommandError::Usage("crop begin screen|webcam"));
            };
            let region: RegionName = region
                .parse()
                .map_err(|_| CommandError::Usage("crop begin screen|webcam"))?;
            CropCommand::BeginEdit(region)
        }
        "drag" | "move" => {
            let values = rest
                .iter()
                .map(|v| v.parse::<f64>().ok().filter(|n| n.is_finite()))
                .collect::<Option<Vec<_>>>()
                .ok_or(CommandError::Usage("crop drag X Y W H"))?;
            let [x, y, w, h] = values.as_slice() else {
                return Err(CommandError::Usage("crop drag X Y W H"));
            };
            CropCommand::OverlayMoved(Rectangle::new(*x, *y, *w, *h))
        }
        "field" | "set" => {
            let Some((&name, value)) = rest.split_first() else {
                return Err(CommandError::Usage("crop field x|y|width|height VALUE"));
            };
            let field: CropField = name
                .parse()
                .map_err(|_| CommandError::Usage("crop field x|y|width|height VALUE"))?;
            CropCommand::FieldChanged {
                field,
                value: value.join(" "),
            }
        }
        "lock" => match rest {
            [flag] if matches!(flag.to_ascii_lowercase().as_str(), "on" | "true" | "yes") => {
                CropCommand::SetAspectLock(true)
            }
            [flag] if matches!(flag.to_ascii_lowercase().as_str(), "off" | "false" | "no") => {
                CropCommand::SetAspectLock(false)
            }
            _ => return Err(CommandError::Usage("crop lock on|off")),
        },
        "save" | "commit" => CropCommand::Commit,
        "cancel" => CropCommand::Cancel,
        "preview" => {
            return match rest {
                [] => Ok(Command::CropPreview(None)),
                [dir] => Ok(Command::CropPreview(Some(PathBuf::from(dir)))),
                _ => Err(CommandError::Usage("crop preview [DIR]")),
            }
        }
        other => return Err(CommandError::Unknown(format!("crop {other}"))),
    };
    Ok(Command::Crop(command))
}

/// Join every remaining token into a single argument.
fn one_arg(args: &[&str], usage: &'static str) -> Result<String, CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(args.join(" "))
}

fn seconds(args: &[&str], usage: &'static str) -> Result<f64, CommandError> {
    let [value] = args else {
        return Err(CommandError::Usage(usage));
    };
    match value.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(CommandError::Invalid(format!(
            "Playback position must be a non-negative number of seconds, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
    }

    #[test]
    fn filenames_keep_spaces() {
        assert_eq!(
            parse_command("select my talk.mp4").unwrap(),
            Command::Select("my talk.mp4".into())
        );
        assert_eq!(
            parse_command("download https://cdn.example.com/v.m3u8 team sync").unwrap(),
            Command::Download {
                url: "https://cdn.example.com/v.m3u8".into(),
                filename: "team sync".into(),
            }
        );
    }

    #[test]
    fn download_needs_a_name() {
        assert_eq!(
            parse_command("download https://cdn.example.com/v.m3u8"),
            Err(CommandError::Usage("download URL NAME"))
        );
    }

    #[test]
    fn crop_commands_map_to_editor_commands() {
        assert_eq!(
            parse_command("crop begin Webcam").unwrap(),
            Command::Crop(CropCommand::BeginEdit(RegionName::Webcam))
        );
        assert_eq!(
            parse_command("crop drag 10 20 300 150.5").unwrap(),
            Command::Crop(CropCommand::OverlayMoved(Rectangle::new(10.0, 20.0, 300.0, 150.5)))
        );
        assert_eq!(
            parse_command("crop field width 640").unwrap(),
            Command::Crop(CropCommand::FieldChanged {
                field: CropField::Width,
                value: "640".into(),
            })
        );
        assert_eq!(
            parse_command("crop lock off").unwrap(),
            Command::Crop(CropCommand::SetAspectLock(false))
        );
        assert_eq!(parse_command("crop save").unwrap(), Command::Crop(CropCommand::Commit));
    }

    /// An empty field value is passed through and reads as zero later.
    #[test]
    fn crop_field_without_value_is_empty_text() {
        assert_eq!(
            parse_command("crop field h").unwrap(),
            Command::Crop(CropCommand::FieldChanged {
                field: CropField::Height,
                value: String::new(),
            })
        );
    }

    #[test]
    fn crop_drag_requires_four_numbers() {
        assert_matches!(parse_command("crop drag 1 2 3"), Err(CommandError::Usage(_)));
        assert_matches!(parse_command("crop drag 1 2 three 4"), Err(CommandError::Usage(_)));
        assert_matches!(parse_command("crop drag nan 0 10 10"), Err(CommandError::Usage(_)));
        assert_matches!(parse_command("crop drag 0 0 inf 10"), Err(CommandError::Usage(_)));
    }

    #[test]
    fn crop_preview_optional_directory() {
        assert_eq!(parse_command("crop preview").unwrap(), Command::CropPreview(None));
        assert_eq!(
            parse_command("crop preview out").unwrap(),
            Command::CropPreview(Some(PathBuf::from("out")))
        );
    }

    #[test]
    fn playback_positions_must_be_non_negative() {
        assert_eq!(parse_command("mark-start 75.9").unwrap(), Command::MarkStart(75.9));
        assert_matches!(parse_command("mark-end -1"), Err(CommandError::Invalid(_)));
    }

    #[test]
    fn cleanup_requires_explicit_confirmation() {
        assert_eq!(
            parse_command("cleanup").unwrap(),
            Command::Cleanup { confirmed: false }
        );
        assert_eq!(
            parse_command("cleanup CONFIRM").unwrap(),
            Command::Cleanup { confirmed: true }
        );
    }

    #[test]
    fn unknown_commands_are_named() {
        assert_eq!(
            parse_command("rewind 10"),
            Err(CommandError::Unknown("rewind".into()))
        );
        assert_eq!(
            parse_command("crop rotate"),
            Err(CommandError::Unknown("crop rotate".into()))
        );
    }
}
