//! Picking the theme a run is seeded with.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use rand::seq::IndexedRandom;

pub const THEMES: &[&str] = &[
    "A fantasy adventure in a magical kingdom",
    "A sci-fi thriller on a space station",
    "A mystery in a haunted house",
    "A romance between a detective and a suspect",
];

pub fn random_theme() -> &'static str {
    THEMES.choose(&mut rand::rng()).copied().unwrap_or(THEMES[0])
}

/// Ask on the terminal whether to use a random theme, and for the theme
/// text if not.
pub fn prompt_theme() -> Result<String> {
    let random = Confirm::new()
        .with_prompt("Generate random input?")
        .default(true)
        .interact()
        .context("Failed to read answer")?;

    if random {
        return Ok(random_theme().to_string());
    }

    let theme: String = Input::new()
        .with_prompt("Enter the theme for the book")
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("Theme must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read theme")?;

    Ok(theme.trim().to_string())
}
