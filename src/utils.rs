use colored::Colorize;
use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Print `prompt` and read one line from stdin, without the line ending.
/// A closed stdin is reported as `UnexpectedEof`.
pub fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Block until the operator presses Enter.
pub fn pause(message: &str) {
    let _ = prompt_line(message);
}

/// Print a fatal error and wait for Enter before the caller exits.
pub fn report_fatal<R: BufRead, W: Write>(error: &dyn Display, input: &mut R, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "An error occurred:".red().bold())?;
    writeln!(out, "{}", error.to_string().red())?;
    write!(out, "Press Enter to exit...")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> bool {
    prompt_line(&format!("{} (y/N): ", prompt))
        .map(|answer| parse_confirmation(&answer))
        .unwrap_or(false)
}

pub fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Numbered menu. Re-asks until a valid number is entered.
pub fn select_option(message: &str, choices: &[&str]) -> io::Result<usize> {
    loop {
        println!();
        println!("{}", message);
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {}", i + 1, choice);
        }

        let answer = prompt_line("> ")?;
        match parse_choice(&answer, choices.len()) {
            Some(index) => return Ok(index),
            None => println!("Please enter a number between 1 and {}.", choices.len()),
        }
    }
}

/// 1-based answer to 0-based index.
pub fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    match answer.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Some(n - 1),
        _ => None,
    }
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1", 4), Some(0));
        assert_eq!(parse_choice(" 4 ", 4), Some(3));
        assert_eq!(parse_choice("0", 4), None);
        assert_eq!(parse_choice("5", 4), None);
        assert_eq!(parse_choice("exit", 4), None);
    }

    #[test]
    fn test_report_fatal_waits_for_enter() {
        let err = crate::RemovalError::Config("sfdc.ini does not exist.".to_string());
        let mut input = io::Cursor::new("\nnext answer\n");
        let mut out = Vec::new();

        report_fatal(&err, &mut input, &mut out).unwrap();

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("An error occurred:"));
        assert!(shown.contains("Invalid configuration: sfdc.ini does not exist."));
        assert!(shown.ends_with("Press Enter to exit..."));
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn test_report_fatal_on_closed_input() {
        let err = crate::RemovalError::Config("One or more SFDC credentials are not set".to_string());
        let mut input = io::Cursor::new("");
        let mut out = Vec::new();
        assert!(report_fatal(&err, &mut input, &mut out).is_ok());
    }

    #[test]
    fn test_parse_confirmation() {
        assert!(parse_confirmation("y"));
        assert!(parse_confirmation(" YES "));
        assert!(!parse_confirmation(""));
        assert!(!parse_confirmation("no"));
    }
}
