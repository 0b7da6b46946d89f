use anyhow::Result;
use crossterm::style::{Color, Stylize};
use dbcli_core::config::ColorSettings;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::debug;

/// Color scheme for terminal output, read from the `[colors]` section.
#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub prompt: Color,
    pub error: Color,
    pub status: Color,
}

impl Colors {
    pub fn from_settings(settings: &ColorSettings) -> Self {
        Self {
            prompt: parse_color(&settings.prompt, Color::Green),
            error: parse_color(&settings.error, Color::Red),
            status: parse_color(&settings.status, Color::DarkGrey),
        }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self::from_settings(&ColorSettings::default())
    }
}

fn parse_color(name: &str, fallback: Color) -> Color {
    Color::try_from(name).unwrap_or_else(|_| {
        debug!(color = %name, "Unknown color name, using default");
        fallback
    })
}

/// Terminal I/O for the REPL and one-shot mode. Colour is only written to
/// streams attached to a terminal.
pub struct Terminal {
    colors: Colors,
    color_stdout: bool,
    color_stderr: bool,
}

impl Terminal {
    pub fn new(colors: Colors) -> Self {
        Self {
            colors,
            color_stdout: io::stdout().is_terminal(),
            color_stderr: io::stderr().is_terminal(),
        }
    }

    pub fn stdin_is_tty() -> bool {
        io::stdin().is_terminal()
    }

    /// Colour for the interactive prompt, when stdout can show it.
    pub fn prompt_color(&self) -> Option<Color> {
        self.color_stdout.then_some(self.colors.prompt)
    }

    /// Plain output (results, help tables).
    pub fn print(&self, text: &str) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", text)?;
        stdout.flush()?;
        Ok(())
    }

    /// Status lines and timing.
    pub fn print_status(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", paint(msg, self.colors.status, self.color_stdout))?;
        stdout.flush()?;
        Ok(())
    }

    /// Errors go to stderr.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        writeln!(stderr, "{}", paint(msg, self.colors.error, self.color_stderr))?;
        stderr.flush()?;
        Ok(())
    }

    /// Ask whether a destructive statement should run. Without a terminal
    /// there is nobody to ask, so the statement proceeds.
    pub fn confirm_destructive(&self) -> Result<bool> {
        if !Self::stdin_is_tty() {
            return Ok(true);
        }
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "{}",
            paint(
                "You're about to run a destructive command.",
                self.colors.error,
                self.color_stdout
            )
        )?;
        write!(
            stdout,
            "{}",
            paint("Do you want to proceed? (y/n): ", self.colors.prompt, self.color_stdout)
        )?;
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(is_yes(&input))
    }
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        text.with(color).to_string()
    } else {
        text.to_string()
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_crossterm_names() {
        let colors = Colors::from_settings(&ColorSettings {
            prompt: "cyan".into(),
            error: "dark_red".into(),
            status: "not-a-color".into(),
        });
        assert_eq!(colors.prompt, Color::Cyan);
        assert_eq!(colors.error, Color::DarkRed);
        assert_eq!(colors.status, Color::DarkGrey);
    }

    #[test]
    fn default_colors() {
        let colors = Colors::default();
        assert_eq!(colors.prompt, Color::Green);
        assert_eq!(colors.error, Color::Red);
    }

    #[test]
    fn colour_is_skipped_when_disabled() {
        assert_eq!(paint("Query OK", Color::Red, false), "Query OK");
        assert!(paint("Query OK", Color::Red, true).contains("Query OK"));
    }

    #[test]
    fn confirmation_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }
}
