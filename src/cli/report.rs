use super::ui;
use crate::core::config::AppConfig;
use crate::report::{self, RateComparison};
use crate::resolver::RateResolver;
use anyhow::Result;
use comfy_table::{Attribute, Cell};

impl RateComparison {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Date"),
            ui::header_cell(&self.historical_source),
            ui::header_cell(&self.card_source),
            ui::header_cell("Card difference"),
        ]);

        for day in &self.days {
            table.add_row(vec![
                Cell::new(day.date.format("%Y-%m-%d")),
                ui::rate_cell(day.historical_rate),
                ui::rate_cell(day.card_rate),
                ui::change_cell(day.deviation_pct),
            ]);
        }

        if let Some(average) = &self.average {
            table.add_row(vec![
                Cell::new("Average").add_attribute(Attribute::Bold),
                ui::rate_cell(average.historical_rate).add_attribute(Attribute::Bold),
                ui::rate_cell(average.card_rate).add_attribute(Attribute::Bold),
                ui::change_cell(average.deviation_pct).add_attribute(Attribute::Bold),
            ]);
        }

        let title = format!("{} to {}", self.pair.from, self.pair.to);
        let mut output = format!("{}\n\n", ui::style_text(&title, ui::StyleType::Title));
        output.push_str(&table.to_string());

        if self.is_truncated() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!(
                        "Showing {} of {} days, no {} rate after that",
                        self.days.len(),
                        self.requested_days,
                        self.card_source
                    ),
                    ui::StyleType::Subtle
                )
            ));
        }

        output
    }
}

pub async fn run(resolver: &RateResolver, config: &AppConfig) -> Result<()> {
    let comparison = report::compare_named_sources(
        resolver,
        &config.pair,
        &config.sources.historical,
        &config.sources.card,
        &config.report,
    )
    .await?;

    println!("{}", comparison.display_as_table());
    Ok(())
}
