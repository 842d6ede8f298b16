//! Console controls read from stdin.
//!
//! | Input        | Action                 |
//! |--------------|------------------------|
//! | `t` or empty | toggle typing          |
//! | `s`          | stop typing            |
//! | `q`          | quit                   |

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::LocalAction;

/// Maps one console line to an action. Unknown input yields `None`.
pub fn parse_console_line(line: &str) -> Option<LocalAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "t" | "toggle" => Some(LocalAction::Toggle),
        "s" | "stop" => Some(LocalAction::Stop),
        "q" | "quit" | "exit" => Some(LocalAction::Quit),
        _ => None,
    }
}

/// Reads `input` line by line on a background thread until it ends or the
/// receiver goes away.
pub fn spawn_console_reader<R>(input: R, tx: mpsc::Sender<LocalAction>) -> std::io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("console input error: {e}");
                        break;
                    }
                };
                match parse_console_line(&line) {
                    Some(action) => {
                        if tx.blocking_send(action).is_err() {
                            break;
                        }
                    }
                    None => warn!("unknown command {line:?}; use t (toggle), s (stop) or q (quit)"),
                }
            }
            debug!("console input closed");
        })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_parse_console_line() {
        assert_eq!(parse_console_line(""), Some(LocalAction::Toggle));
        assert_eq!(parse_console_line(" T \n"), Some(LocalAction::Toggle));
        assert_eq!(parse_console_line("s"), Some(LocalAction::Stop));
        assert_eq!(parse_console_line("quit"), Some(LocalAction::Quit));
        assert_eq!(parse_console_line("hello"), None);
    }

    #[tokio::test]
    async fn test_reader_forwards_known_lines_in_order() {
        // Arrange
        let (tx, mut rx) = mpsc::channel(8);
        let input = Cursor::new("t\nbogus\ns\nq\n");

        // Act
        let handle = spawn_console_reader(input, tx).unwrap();

        // Assert
        assert_eq!(rx.recv().await, Some(LocalAction::Toggle));
        assert_eq!(rx.recv().await, Some(LocalAction::Stop));
        assert_eq!(rx.recv().await, Some(LocalAction::Quit));
        assert_eq!(rx.recv().await, None);
        handle.join().unwrap();
    }
}
