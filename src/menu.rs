//! Numbered package menu
//!
//! Rendering and input parsing are plain functions over the catalog; only
//! [`prompt_selection`] touches the terminal.

use crossterm::style::Stylize;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::error::Result;

/// What the user asked for at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Package ids, in the order they were typed
    Packages(Vec<String>),
    Defaults,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("nothing selected")]
    Empty,

    #[error("'{0}' is not a package number")]
    NotANumber(String),

    #[error("{number} is out of range (1-{max})")]
    OutOfRange { number: usize, max: usize },
}

/// Parse one line of menu input.
///
/// Accepts a number, several numbers separated by commas and/or spaces,
/// `d`/`default`/`defaults` or `q`/`quit`/`exit`, in any case. Repeated
/// numbers are kept once.
pub fn parse_selection(input: &str, catalog: &Catalog) -> std::result::Result<Selection, SelectionError> {
    let input = input.trim().to_lowercase();
    match input.as_str() {
        "" => return Err(SelectionError::Empty),
        "d" | "default" | "defaults" => return Ok(Selection::Defaults),
        "q" | "quit" | "exit" => return Ok(Selection::Quit),
        _ => {}
    }

    let mut ids: Vec<String> = Vec::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let number: usize = token
            .parse()
            .map_err(|_| SelectionError::NotANumber(token.to_string()))?;
        let descriptor = catalog.by_menu_number(number).ok_or(SelectionError::OutOfRange {
            number,
            max: catalog.len(),
        })?;
        if !ids.contains(&descriptor.id) {
            ids.push(descriptor.id.clone());
        }
    }

    if ids.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(Selection::Packages(ids))
}

/// The menu text: one numbered line per package in catalog order, then the
/// keyword entries.
pub fn render_menu(catalog: &Catalog, defaults: &[String]) -> String {
    let width = catalog.len().to_string().len();
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Available packages".bold()));
    for (index, descriptor) in catalog.iter().enumerate() {
        let marker = if defaults.contains(&descriptor.id) { "*" } else { " " };
        out.push_str(&format!(
            "  {:>width$}) {} {:<28} {}\n",
            index + 1,
            marker,
            descriptor.name,
            format!("[{}]", descriptor.method.label()).dark_grey(),
            width = width
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "  {}  install defaults (*)\n",
        "d".cyan()
    ));
    out.push_str(&format!("  {}  quit\n", "q".cyan()));
    out
}

/// Show the menu and read until the input parses.
pub fn prompt_selection(catalog: &Catalog, defaults: &[String]) -> Result<Selection> {
    println!("{}", render_menu(catalog, defaults));
    loop {
        let input: String = dialoguer::Input::new()
            .with_prompt("Select packages (e.g. 1,3 5)")
            .allow_empty(true)
            .interact_text()?;

        match parse_selection(&input, catalog) {
            Ok(selection) => return Ok(selection),
            Err(e) => eprintln!("{} {}", "✗".red(), e),
        }
    }
}
