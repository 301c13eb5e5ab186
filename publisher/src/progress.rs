//! Text progress reporting.
//!
//! [`ProgressBar`] counts completed tasks and is shared by reference across
//! the processing threads. [`GitProgress`] renders the phase percentages git
//! prints on stderr when invoked with `--progress`.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Width of the task progress bar.
pub const BAR_WIDTH: usize = 50;

/// Width of the git transfer progress bar.
pub const GIT_BAR_WIDTH: usize = 40;

/// Render `[====    ]` for `percent` (clamped to 100) over `width` columns.
#[must_use]
pub fn render_bar(percent: usize, width: usize) -> String {
    let filled = percent.min(100) * width / 100;
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

fn percent_of(current: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        current.min(total) * 100 / total
    }
}

/// Render the full `[bar] pct% (n/total)` line without the leading `\r`.
#[must_use]
pub fn render_progress(current: usize, total: usize) -> String {
    let percent = percent_of(current, total);
    format!(
        "{} {percent}% ({current}/{total})",
        render_bar(percent, BAR_WIDTH)
    )
}

struct BarState {
    current: usize,
    out: Box<dyn Write + Send>,
}

/// A thread-safe `[bar] pct% (n/total)` counter.
pub struct ProgressBar {
    total: usize,
    state: Mutex<BarState>,
}

impl ProgressBar {
    /// Create a bar over `total` tasks drawing to `out`.
    #[must_use]
    pub fn new(total: usize, out: Box<dyn Write + Send>) -> Self {
        Self {
            total,
            state: Mutex::new(BarState { current: 0, out }),
        }
    }

    /// Create a bar that counts but draws nothing.
    #[must_use]
    pub fn hidden(total: usize) -> Self {
        Self::new(total, Box::new(io::sink()))
    }

    /// Record one completed task and redraw.
    pub fn update(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current += 1;
        let line = render_progress(state.current, self.total);
        // Progress output is best-effort.
        let _ = write!(state.out, "\r{line}");
        let _ = state.out.flush();
    }

    /// Terminate the bar's line.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(state.out);
        let _ = state.out.flush();
    }

    /// Number of tasks recorded so far.
    #[must_use]
    pub fn current(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
    }
}

/// Renders git `--progress` output as one bar per transfer phase.
///
/// Feed raw stderr chunks through [`GitProgress::feed`]; lines are split on
/// `\r` and `\n`, and a phase is redrawn only when its percentage changes.
pub struct GitProgress<W: Write> {
    out: W,
    pending: String,
    phase: Option<(String, usize)>,
    transcript: String,
}

impl<W: Write> GitProgress<W> {
    /// Create a renderer drawing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: String::new(),
            phase: None,
            transcript: String::new(),
        }
    }

    /// Consume a chunk of git stderr.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        while let Some(end) = self.pending.find(['\r', '\n']) {
            let line: String = self.pending.drain(..=end).collect();
            self.handle_line(line.trim_end_matches(['\r', '\n']));
        }
    }

    /// Flush any partial line and terminate the current bar.
    ///
    /// Returns every non-progress line seen, for error reporting.
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.handle_line(rest.trim_end());
        if self.phase.is_some() {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
        self.transcript
    }

    fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let Some((phase, percent)) = parse_phase(line) else {
            self.transcript.push_str(line);
            self.transcript.push('\n');
            return;
        };

        match &self.phase {
            Some((current, last)) if current == phase && *last == percent => return,
            Some((current, _)) if current != phase => {
                let _ = writeln!(self.out);
            }
            _ => {}
        }
        let _ = write!(
            self.out,
            "\r{} {percent}% {phase}",
            render_bar(percent, GIT_BAR_WIDTH)
        );
        let _ = self.out.flush();
        self.phase = Some((phase.to_owned(), percent));
    }
}

/// Parse `"Receiving objects:  45% (450/1000)"` into `("Receiving objects", 45)`.
fn parse_phase(line: &str) -> Option<(&str, usize)> {
    let line = line.strip_prefix("remote: ").unwrap_or(line);
    let (phase, rest) = line.split_once(':')?;
    let digits = rest.trim_start().split_once('%')?.0;
    let percent = digits.parse().ok()?;
    Some((phase.trim(), percent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    /// Writer whose contents remain inspectable after being boxed.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("lock")).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case(0, 10, "[          ]")]
    #[case(50, 10, "[=====     ]")]
    #[case(100, 10, "[==========]")]
    #[case(250, 4, "[====]")]
    fn render_bar_fills_proportionally(
        #[case] percent: usize,
        #[case] width: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(render_bar(percent, width), expected);
    }

    #[rstest]
    fn update_draws_percentage_and_count() {
        let buffer = SharedBuffer::default();
        let bar = ProgressBar::new(4, Box::new(buffer.clone()));

        bar.update();

        let output = buffer.contents();
        assert!(output.starts_with('\r'));
        assert!(output.ends_with("25% (1/4)"), "got {output:?}");
    }

    #[rstest]
    fn concurrent_updates_are_all_counted() {
        let bar = ProgressBar::hidden(64);
        thread::scope(|scope| {
            for _ in 0..64 {
                scope.spawn(|| bar.update());
            }
        });
        assert_eq!(bar.current(), 64);
    }

    #[rstest]
    fn zero_total_renders_complete() {
        let buffer = SharedBuffer::default();
        let bar = ProgressBar::new(0, Box::new(buffer.clone()));
        bar.update();
        assert!(buffer.contents().contains("100%"));
    }

    #[rstest]
    #[case("Receiving objects:  45% (450/1000), 1.20 MiB | 2.00 MiB/s", Some(("Receiving objects", 45)))]
    #[case("remote: Counting objects: 100% (12/12), done.", Some(("Counting objects", 100)))]
    #[case("Cloning into '/tmp/x'...", None)]
    #[case("fatal: repository not found", None)]
    fn parses_git_phase_lines(#[case] line: &str, #[case] expected: Option<(&str, usize)>) {
        assert_eq!(parse_phase(line), expected);
    }

    #[rstest]
    fn git_progress_redraws_only_on_change() {
        let mut out = Vec::new();
        let mut progress = GitProgress::new(&mut out);
        progress.feed(b"Receiving objects:  50% (1/2)\rReceiving objects:  50% (1/2)\r");
        progress.feed(b"Receiving objects: 100% (2/2), done.\n");
        let transcript = progress.finish();

        let rendered = String::from_utf8(out).expect("utf-8");
        assert_eq!(rendered.matches("Receiving objects").count(), 2);
        assert!(rendered.contains("100% Receiving objects"));
        assert!(transcript.is_empty());
    }

    #[rstest]
    fn git_progress_keeps_non_progress_lines() {
        let mut out = Vec::new();
        let mut progress = GitProgress::new(&mut out);
        progress.feed(b"fatal: Authentication failed\n");
        progress.feed(b"partial without newline");
        let transcript = progress.finish();

        assert_eq!(transcript, "fatal: Authentication failed\npartial without newline\n");
    }

    #[rstest]
    fn git_progress_starts_new_line_per_phase() {
        let mut out = Vec::new();
        let mut progress = GitProgress::new(&mut out);
        progress.feed(b"Counting objects: 100% (3/3)\rWriting objects: 100% (3/3)\n");
        let _ = progress.finish();

        let rendered = String::from_utf8(out).expect("utf-8");
        assert!(rendered.contains("Counting objects\n\r"));
    }
}
