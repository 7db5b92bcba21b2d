use chrono::NaiveDate;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::{
        clock::TickContext,
        ranking::{HourRanking, PricePoint},
    },
    store::DeviceEntry,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_prices_table(points: &[PricePoint], ranking: &HourRanking) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Hour", "Price", "Rank"]);
    for point in points.iter().sorted_by_key(|point| point.hour) {
        let rank = ranking.as_slice().iter().position(|hour| *hour == point.hour);
        let is_cheap = rank.is_some_and(|rank| rank < ranking.len() / 2);
        table.add_row(vec![
            Cell::new(format!("{:02}:00", point.hour)),
            Cell::new(point.rate)
                .set_alignment(CellAlignment::Right)
                .fg(if is_cheap { Color::Green } else { Color::Red }),
            Cell::new(rank.map_or_else(|| "-".to_owned(), |rank| (rank + 1).to_string()))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_plan_table(
    date: NaiveDate,
    ranking: &HourRanking,
    entries: &[DeviceEntry],
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Device", "Budget", "On"]);
    for entry in entries {
        match &entry.config {
            Ok(config) => {
                let hours = (0..24)
                    .filter(|hour| config.desired_state(ranking, TickContext::at(date, *hour)))
                    .map(|hour| format!("{hour:02}"))
                    .join(" ");
                table.add_row(vec![
                    Cell::new(&entry.id),
                    Cell::new(config.budget).set_alignment(CellAlignment::Right),
                    Cell::new(hours).fg(Color::Green),
                ]);
            }
            Err(error) => {
                table.add_row(vec![
                    Cell::new(&entry.id),
                    Cell::new("-").set_alignment(CellAlignment::Right),
                    Cell::new(error).fg(Color::Red),
                ]);
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{activation::tests::device, error::ConfigurationError, rate::KilowattHourRate};

    #[test]
    fn plan_table_ok() {
        let ranking = HourRanking::rank(&[
            PricePoint::new(0, KilowattHourRate(0.2)),
            PricePoint::new(1, KilowattHourRate(0.1)),
            PricePoint::new(2, KilowattHourRate(0.3)),
        ]);
        let entries = [
            DeviceEntry { id: "boiler".into(), config: Ok(device("boiler")) },
            DeviceEntry { id: "broken".into(), config: Err(ConfigurationError::Hour(24)) },
        ];

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let table = build_plan_table(date, &ranking, &entries).to_string();
        assert!(table.contains("00 01"), "{table}");
        assert!(table.contains("hour 24 is out of range"), "{table}");
    }
}
