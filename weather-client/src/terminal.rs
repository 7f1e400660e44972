use crate::controller::{Controller, Screen, SuggestionsReady, View};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const HELP: &str = "\
Type a place name to search.
  :pick N    load suggestion N
  :dismiss   hide suggestions
  :units     toggle Celsius/Fahrenheit
  :here      use my location
  :retry     reload the current place
  :quit      exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Pick(usize),
    Dismiss,
    ToggleUnits,
    UseMyLocation,
    Retry,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Search(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("pick" | "p"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Pick(n - 1),
            _ => Command::Unknown(line.to_string()),
        },
        (Some("dismiss" | "d"), None) => Command::Dismiss,
        (Some("units" | "u"), None) => Command::ToggleUnits,
        (Some("here" | "h"), None) => Command::UseMyLocation,
        (Some("retry" | "r"), None) => Command::Retry,
        (Some("help" | "?"), None) => Command::Help,
        (Some("quit" | "q"), None) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Prints screens to stdout
#[derive(Default)]
pub struct TerminalView;

impl TerminalView {
    fn print(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // a closed stdout leaves nothing useful to report to
        let _ = writeln!(stdout, "{}", text);
        let _ = stdout.flush();
    }
}

impl View for TerminalView {
    fn show(&mut self, screen: Screen) {
        match screen {
            Screen::Loading { skeleton, .. } => self.print(&skeleton.compose()),
            Screen::Weather {
                rendered,
                from_cache,
                latency,
                ..
            } => {
                self.print(&rendered.compose());
                let source = match (from_cache, latency) {
                    (true, _) => "cached".to_string(),
                    (false, Some(latency)) => format!("fetched in {} ms", latency.as_millis()),
                    (false, None) => "fetched".to_string(),
                };
                self.print(&format!("({})", source));
            }
            Screen::LoadFailed { banner, .. } => self.print(&banner),
            Screen::Suggestions { items, .. } => {
                self.print(&items.join("\n"));
                self.print("(:pick N to choose, :dismiss to hide)");
            }
            Screen::SuggestionsHidden => {}
            Screen::Alert(message) => self.print(&format!("\n*** {} ***\n", message)),
            Screen::Notice(message) => self.print(&message),
        }
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }

    shutdown.cancel();
}

/// Drive the controller from `input` until `:quit`, end of input, or
/// `shutdown` is cancelled. Cancellation also abandons a load in progress.
pub async fn run<R>(
    mut controller: Controller,
    mut suggestions: mpsc::UnboundedReceiver<SuggestionsReady>,
    input: R,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    controller.notify(format!("{}\n", HELP));
    tokio::select! {
        _ = controller.start() => {}
        _ = shutdown.cancelled() => return Ok(()),
    }

    loop {
        let command = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input");
                    break;
                };
                parse_command(&line)
            }
            Some(ready) = suggestions.recv() => {
                controller.show_suggestions(ready);
                continue;
            }
            _ = shutdown.cancelled() => break,
        };

        let keep_going = tokio::select! {
            keep_going = dispatch(&mut controller, command) => keep_going,
            _ = shutdown.cancelled() => false,
        };
        if !keep_going {
            break;
        }
    }

    Ok(())
}

/// Returns false when the session should end.
async fn dispatch(controller: &mut Controller, command: Command) -> bool {
    match command {
        Command::Search(text) => controller.search_input(&text),
        Command::Pick(index) => {
            if let Err(e) = controller.select_suggestion(index).await {
                warn!(error = %e, "Invalid pick");
                controller.notify(e.to_string());
            }
        }
        Command::Dismiss => controller.dismiss_suggestions(),
        Command::ToggleUnits => {
            controller.toggle_units().await;
        }
        Command::UseMyLocation => {
            controller.use_my_location().await;
        }
        Command::Retry => {
            controller.retry().await;
        }
        Command::Help => controller.notify(HELP),
        Command::Quit => return false,
        Command::Unknown(line) => {
            controller.notify(format!("Unknown command '{}'. Type :help.", line))
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_search() {
        assert_eq!(parse_command("  Lond "), Command::Search("Lond".into()));
        assert_eq!(parse_command(""), Command::Search(String::new()));
    }

    #[test]
    fn test_pick_is_one_based() {
        assert_eq!(parse_command(":pick 1"), Command::Pick(0));
        assert_eq!(parse_command(":p 3"), Command::Pick(2));
        assert_eq!(parse_command(":pick 0"), Command::Unknown(":pick 0".into()));
        assert_eq!(parse_command(":pick x"), Command::Unknown(":pick x".into()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_command(":units"), Command::ToggleUnits);
        assert_eq!(parse_command(":here"), Command::UseMyLocation);
        assert_eq!(parse_command(":retry"), Command::Retry);
        assert_eq!(parse_command(":dismiss"), Command::Dismiss);
        assert_eq!(parse_command(":q"), Command::Quit);
        assert_eq!(parse_command(":units now"), Command::Unknown(":units now".into()));
        assert_eq!(parse_command(":bogus"), Command::Unknown(":bogus".into()));
    }
}
