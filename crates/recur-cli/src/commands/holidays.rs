//! Holidays command implementation

use anyhow::{Context, Result};
use chrono::Datelike;
use recur_core::{HolidayCalendar, Locale};

pub fn cmd_holidays(locale: Locale, year: i32) -> Result<()> {
    let holidays = HolidayCalendar::new(locale)
        .holidays(year)
        .with_context(|| format!("Failed to build {} holidays for {}", locale, year))?;

    if holidays.is_empty() {
        println!("No public holidays for locale '{}'.", locale);
        return Ok(());
    }

    println!();
    println!(
        "📅 Public Holidays ({}, {})",
        locale.as_str().to_uppercase(),
        year
    );
    println!("   ─────────────────────────────────────────────");

    for holiday in holidays {
        println!(
            "   {} {} │ {}",
            holiday.date,
            holiday.date.weekday(),
            holiday.name
        );
    }

    Ok(())
}
