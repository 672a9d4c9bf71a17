//! Line-oriented console front end for the download workflow.

use std::io::{self, Write};

use tracing::debug;

use crate::catalog::{format_size, FileInfo};
use crate::coordinator::{DownloadView, TransferStatus, UserCommand};
use crate::filter::{DownloadFilter, FilterField};

/// Usage hint printed with every listing.
pub const HELP: &str = "Enter a number to download, new/igc/nmea to toggle a filter, r to refresh, q to quit.";

/// Renders the download workflow as plain text.
#[derive(Debug)]
pub struct ConsoleView<W = io::Stdout> {
    out: W,
    names: Vec<String>,
}

impl ConsoleView {
    /// Render to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleView<W> {
    /// Render to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: Vec::new(),
        }
    }

    /// Consume the view, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            debug!(error = %e, "Console write failed");
        }
    }
}

fn checkbox(filter: &DownloadFilter, field: FilterField) -> String {
    let mark = if filter.get(field) { 'x' } else { ' ' };
    format!("[{mark}] {}", field.label())
}

impl<W: Write> DownloadView for ConsoleView<W> {
    fn show_waiting(&mut self) {
        self.names.clear();
        self.emit("Please insert USB storage");
    }

    fn show_files(&mut self, filter: &DownloadFilter, files: &[FileInfo]) {
        let options: Vec<String> = FilterField::ALL
            .into_iter()
            .map(|f| checkbox(filter, f))
            .collect();
        self.emit(&format!("Options: {}", options.join("  ")));

        self.names = files.iter().map(|f| f.name.clone()).collect();
        if files.is_empty() {
            self.emit("No flight logs selected.");
        }
        for (i, file) in files.iter().enumerate() {
            self.emit(&format!(
                "{:>3}  {:<32} {:>10}",
                i + 1,
                file.name,
                format_size(file.size)
            ));
        }
        self.emit(HELP);
    }

    fn set_status(&mut self, index: usize, status: &TransferStatus) {
        let name = self.names.get(index).map_or("?", String::as_str).to_string();
        let text = match status {
            TransferStatus::Done => format!("{:>3}  {name}  Done", index + 1),
            TransferStatus::Failed(msg) => format!("{:>3}  {name}  Failed: {msg}", index + 1),
        };
        self.emit(&text);
    }

    fn show_error(&mut self, message: &str) {
        self.emit(&format!("Error: {message}"));
    }
}

/// Turn a line typed by the user into a command.
///
/// Rows are numbered from 1 on screen and from 0 in [`UserCommand::Select`].
#[must_use]
pub fn parse_command(line: &str) -> Option<UserCommand> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => return Some(UserCommand::Quit),
        "r" | "refresh" => return Some(UserCommand::Refresh),
        _ => {}
    }
    if let Ok(field) = line.parse::<FilterField>() {
        return Some(UserCommand::Toggle(field));
    }
    match line.parse::<usize>() {
        Ok(n) if n >= 1 => Some(UserCommand::Select(n - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rendered(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    fn file(name: &str, size: u64) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            file_type: crate::catalog::file_type(name),
            size,
            modified: Utc::now(),
            downloaded: false,
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("q"), Some(UserCommand::Quit));
        assert_eq!(parse_command(" Refresh "), Some(UserCommand::Refresh));
        assert_eq!(parse_command("nmea"), Some(UserCommand::Toggle(FilterField::Nmea)));
        assert_eq!(parse_command("3"), Some(UserCommand::Select(2)));
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("download"), None);
    }

    #[test]
    fn test_show_files() {
        let mut view = ConsoleView::new(Vec::new());
        view.show_files(
            &DownloadFilter::default(),
            &[file("a.igc", 1536), file("b.igc", 10)],
        );
        let out = rendered(view);
        assert!(out.contains("[x] New logs  [x] *.igc  [ ] *.nmea"));
        assert!(out.contains("  1  a.igc"));
        assert!(out.contains("1.5KiB"));
        assert!(out.contains("  2  b.igc"));
    }

    #[test]
    fn test_show_empty_listing() {
        let mut view = ConsoleView::new(Vec::new());
        view.show_files(&DownloadFilter::default(), &[]);
        assert!(rendered(view).contains("No flight logs selected."));
    }

    #[test]
    fn test_status_uses_row_name() {
        let mut view = ConsoleView::new(Vec::new());
        view.show_files(&DownloadFilter::default(), &[file("a.igc", 1)]);
        view.set_status(0, &TransferStatus::Done);
        view.set_status(0, &TransferStatus::Failed("disk full".to_string()));
        let out = rendered(view);
        assert!(out.contains("a.igc  Done"));
        assert!(out.contains("a.igc  Failed: disk full"));
    }

    #[test]
    fn test_waiting_and_error() {
        let mut view = ConsoleView::new(Vec::new());
        view.show_waiting();
        view.show_error("no removable storage mounted");
        let out = rendered(view);
        assert!(out.contains("Please insert USB storage"));
        assert!(out.contains("Error: no removable storage mounted"));
    }
}
