//! Console output of the CLI.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use console::{style, Style};

use crate::api::App;
use crate::config::AppConfig;
use crate::pipeline::MigrationStats;

/// Masks all but the last four characters of a token.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Renders the source/target overview printed by the `config` command.
#[must_use]
pub fn apps_table(apps: &[(&str, &AppConfig, &App)], show_tokens: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(
        ["Type", "App ID", "App Name", "Realm", "Token"]
            .into_iter()
            .map(|c| Cell::new(c).fg(Color::Cyan)),
    );

    for (kind, config, app) in apps {
        let token = if show_tokens {
            config.token.clone()
        } else {
            mask_token(&config.token)
        };
        table.add_row(vec![
            Cell::new(kind).fg(Color::Green),
            Cell::new(&config.id),
            Cell::new(&app.name),
            Cell::new(&config.realm),
            Cell::new(token),
        ]);
    }

    table
}

/// Prints the summary of a finished command.
pub fn print_stats(title: &str, stats: &MigrationStats) {
    let green = Style::new().green().bold();
    let bold = Style::new().bold();

    println!();
    println!("{}", green.apply_to(format!("✅ {title} complete")));
    println!();

    let rows = [
        ("Tables mapped:  ", stats.tables_mapped),
        ("Pages saved:    ", stats.pages_saved),
        ("Pages updated:  ", stats.pages_updated),
        ("Fields found:   ", stats.fields_found),
        ("Fields updated: ", stats.fields_updated),
        ("Fields resized: ", stats.fields_resized),
        ("Rules written:  ", stats.rules_written),
    ];
    for (label, value) in rows.into_iter().filter(|(_, value)| *value > 0) {
        println!("   {} {}", bold.apply_to(label), value);
    }
    println!(
        "   {} {:.1}s",
        bold.apply_to("Duration:       "),
        stats.duration_secs
    );
    println!();
}

/// Prints a one-line notice.
pub fn print_notice(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}
