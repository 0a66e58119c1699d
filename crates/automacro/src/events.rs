//! Textual input events read from stdin.
//!
//! One event per line:
//!
//! ```text
//! down <key>
//! up <key>
//! mouse down <button>
//! mouse up <button>
//! pause
//! quit
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use macro_engine::InputEvent;

/// A parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward to the ingestion router.
    Input(InputEvent),
    /// Toggle the pause gate directly.
    Pause,
    /// Stop reading and shut down.
    Quit,
}

/// Parse one line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    let cmd = match words.as_slice() {
        ["down", key] => Command::Input(InputEvent::KeyDown((*key).to_string())),
        ["up", key] => Command::Input(InputEvent::KeyUp((*key).to_string())),
        ["mouse", "down", button] => {
            Command::Input(InputEvent::MouseDown(button.to_ascii_lowercase()))
        }
        ["mouse", "up", button] => Command::Input(InputEvent::MouseUp(button.to_ascii_lowercase())),
        ["pause"] => Command::Pause,
        ["quit"] | ["exit"] => Command::Quit,
        _ => return Err(format!("unrecognised input line: {line:?}")),
    };
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_and_mouse_edges() {
        assert_eq!(
            parse_line("down a"),
            Ok(Some(Command::Input(InputEvent::KeyDown("a".into()))))
        );
        assert_eq!(
            parse_line("  up F1 "),
            Ok(Some(Command::Input(InputEvent::KeyUp("F1".into()))))
        );
        assert_eq!(
            parse_line("mouse down X1"),
            Ok(Some(Command::Input(InputEvent::MouseDown("x1".into()))))
        );
        assert_eq!(
            parse_line("mouse up left"),
            Ok(Some(Command::Input(InputEvent::MouseUp("left".into()))))
        );
    }

    #[test]
    fn control_lines() {
        assert_eq!(parse_line("pause"), Ok(Some(Command::Pause)));
        assert_eq!(parse_line("quit"), Ok(Some(Command::Quit)));
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("# comment"), Ok(None));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_line("down").is_err());
        assert!(parse_line("mouse sideways left").is_err());
        assert!(parse_line("down a b").is_err());
    }
}
