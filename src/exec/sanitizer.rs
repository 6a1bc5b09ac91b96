use std::fs::{copy, read_to_string, write};
use std::io;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;


/// Banner prefixes the simulator prints before any program output. Only the
/// first `HEADER_LINE_PREFIXES.len()` lines of a capture are candidates for
/// removal; a matching line further down is program output and stays.
const HEADER_LINE_PREFIXES: [&str; 5] = [
    "SPIM Version",
    "Copyright 1990-",
    "All Rights",
    "See the file README",
    "Loaded:",
];

/// Removes simulator banner lines and interactive prompts from a capture.
pub fn clean(raw: &str) -> String {
    let mut cleaned = String::new();
    for line in strip_prompts(strip_headers(raw.lines())) {
        cleaned.push_str(&line);
        cleaned.push('\n');
    }
    cleaned
}

/// Drops banner lines within the positional window at the start of the stream.
pub fn strip_headers<'a>(lines: impl Iterator<Item = &'a str> + 'a) -> impl Iterator<Item = &'a str> + 'a {
    lines.enumerate().filter_map(|(position, line)| {
        let is_header = position < HEADER_LINE_PREFIXES.len()
            && HEADER_LINE_PREFIXES.iter().any(|prefix| line.starts_with(prefix));
        if is_header {
            None
        } else {
            Some(line)
        }
    })
}

/// Strips the simulator's `label:` prompt convention from each line: everything
/// up to and including the last colon and the whitespace run following it.
/// Lines left without content are dropped.
pub fn strip_prompts<'a>(lines: impl Iterator<Item = &'a str> + 'a) -> impl Iterator<Item = String> + 'a {
    lazy_static! {
        static ref PROMPT: Regex = Regex::new(r".*:[ \t]*").unwrap();
    }
    lines.filter_map(|line| {
        let stripped = PROMPT.replace(line, "");
        if stripped.trim().is_empty() {
            None
        } else {
            Some(stripped.into_owned())
        }
    })
}

/// Rewrites a capture file in place with its cleaned contents, keeping the
/// unsanitized original beside it as a `.orig` backup.
pub fn sanitize_file(path: &Path) -> io::Result<()> {
    let raw = read_to_string(path)?;
    let backup = format!("{}.orig", path.display());
    copy(path, &backup)?;
    write(path, clean(&raw))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_lines_at_the_start_are_dropped() {
        let raw = "SPIM Version 8.0 of January 8, 2010\n\
                   Copyright 1990-2010, James R. Larus.\n\
                   All Rights Reserved.\n\
                   See the file README for a full copyright notice.\n\
                   Loaded: /usr/lib/spim/exceptions.s\n\
                   result 42\n";
        assert_eq!(clean(raw), "result 42\n");
    }

    #[test]
    fn banner_prefix_outside_the_window_is_kept() {
        let mut raw = String::new();
        for i in 0..9 {
            raw.push_str(&format!("line {}\n", i));
        }
        raw.push_str("Loaded: looks like a banner but is program output\n");

        let kept: Vec<&str> = strip_headers(raw.lines()).collect();
        assert_eq!(kept.len(), 10);
        assert_eq!(kept[9], "Loaded: looks like a banner but is program output");
    }

    #[test]
    fn window_position_alone_does_not_drop_lines() {
        let kept: Vec<&str> = strip_headers("first\nsecond\n".lines()).collect();
        assert_eq!(kept, vec!["first", "second"]);
    }

    #[test]
    fn prompt_prefix_is_stripped_up_to_the_last_colon() {
        let lines: Vec<String> = strip_prompts("Enter a number: 42".lines()).collect();
        assert_eq!(lines, vec!["42"]);

        let lines: Vec<String> = strip_prompts("first: second: 7".lines()).collect();
        assert_eq!(lines, vec!["7"]);
    }

    #[test]
    fn lines_reduced_to_prompts_are_dropped() {
        let raw = "Enter a number: \nEnter another:\t\nsum 9\n";
        assert_eq!(clean(raw), "sum 9\n");
    }

    #[test]
    fn blank_lines_are_dropped() {
        assert_eq!(clean("a\n\n   \nb\n"), "a\nb\n");
    }

    #[test]
    fn lines_without_prompts_pass_through_in_order() {
        assert_eq!(clean("one\ntwo\nthree\n"), "one\ntwo\nthree\n");
    }

    #[test]
    fn sanitize_file_keeps_an_unsanitized_backup() {
        let path = std::env::temp_dir().join(format!("autograder-sanitize-{}.txt", std::process::id()));
        std::fs::write(&path, "SPIM Version 8.0\nvalue: 3\n").unwrap();

        sanitize_file(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3\n");
        let backup = format!("{}.orig", path.display());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "SPIM Version 8.0\nvalue: 3\n");

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_file(&backup).unwrap();
    }
}
