const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

pub fn bold(s: &str) -> String {
    format!("{BOLD}{s}{RESET}")
}
pub fn dim(s: &str) -> String {
    format!("{DIM}{s}{RESET}")
}
pub fn green(s: &str) -> String {
    format!("{GREEN}{s}{RESET}")
}
pub fn red(s: &str) -> String {
    format!("{RED}{s}{RESET}")
}
pub fn cyan(s: &str) -> String {
    format!("{CYAN}{s}{RESET}")
}

/// Kind of line printed by the shell host next to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
}

/// Format a one-line status message, e.g. "Connected to ODrive ... as odrv0".
pub fn format_status(message: &str, tone: Tone, ansi: bool) -> String {
    let msg = message.trim_end_matches('\n');

    if !ansi {
        return msg.to_string();
    }

    match tone {
        Tone::Good => green(msg),
        Tone::Bad => red(msg),
    }
}

/// Length of `s` as shown on a terminal, ignoring ANSI CSI sequences.
pub fn visible_len(s: &str) -> usize {
    let mut n = 0usize;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next(); // '['
            // consume until 'm' or end
            for x in chars.by_ref() {
                if x == 'm' {
                    break;
                }
            }
            continue;
        }
        n += 1;
    }
    n
}

/// Right-pad `s` with spaces to `width` visible columns.
pub fn pad_cell(s: &str, width: usize) -> String {
    let vis = visible_len(s);
    if vis >= width {
        s.to_string()
    } else {
        let mut out = String::with_capacity(s.len() + (width - vis));
        out.push_str(s);
        out.extend(std::iter::repeat_n(' ', width - vis));
        out
    }
}
