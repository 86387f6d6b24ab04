use crate::ingest::{Column, RawDataset, RawRow};
use crate::normalizer::normalize;
use crate::{CalibrationKind, Dataset, VehicleRecord};

/// Whole-field brand aliases, applied after upper-casing.
pub const BRAND_ALIASES: [(&str, &str); 4] = [
    ("MERCEDES", "MERCEDES-BENZ"),
    ("MERCEDES BENZ", "MERCEDES-BENZ"),
    ("VW", "VOLKSWAGEN"),
    ("RANGE ROVER", "LAND ROVER"),
];

pub fn clean(dataset: &RawDataset) -> Dataset {
    Dataset::new(dataset.rows.iter().map(clean_row).collect())
}

pub fn clean_row(row: &RawRow) -> VehicleRecord {
    let brand = clean_brand(row.get(Column::BrandName).unwrap_or_default());
    let model_name = row
        .get(Column::VehicleName)
        .unwrap_or_default()
        .trim()
        .to_string();
    let abbreviation = row
        .get(Column::Abbreviation)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let search_text = normalize(&format!(
        "{} {} {}",
        brand,
        model_name,
        abbreviation.as_deref().unwrap_or_default()
    ));

    VehicleRecord {
        id: row
            .get(Column::FipeId)
            .and_then(parse_whole_number)
            .and_then(|id| u64::try_from(id).ok()),
        year: row
            .get(Column::ModelYear)
            .and_then(parse_whole_number)
            .and_then(|year| i32::try_from(year).ok()),
        brand,
        model_name,
        abbreviation,
        has_adas: is_yes(row.get(Column::Adas)),
        windshield_adas: is_yes(row.get(Column::WindshieldAdas)),
        bumper_adas: is_yes(row.get(Column::BumperAdas)),
        rear_camera: is_yes(row.get(Column::RearCamera)),
        matrix_lights: is_yes(row.get(Column::MatrixLights)),
        calibration_kind: row
            .get(Column::CalibrationKind)
            .map(CalibrationKind::parse)
            .unwrap_or_default(),
        search_text,
    }
}

pub fn clean_brand(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    BRAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

/// Maps the accepted spellings of a Yes/No cell onto "Sim"/"Não".
pub fn normalize_flag(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "sim" => Some("Sim"),
        "não" | "nao" => Some("Não"),
        _ => None,
    }
}

/// Unrecognised and blank values count as "Não"; the validator reports them first.
fn is_yes(raw: Option<&str>) -> bool {
    raw.and_then(normalize_flag) == Some("Sim")
}

/// Integer parse that also accepts integral floats such as `2024.0`.
pub(crate) fn parse_whole_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }

    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(cells: &[(Column, &str)]) -> RawRow {
        let mut row = RawRow::default();
        for (column, value) in cells {
            row.set(*column, value);
        }
        row
    }

    #[test]
    fn brands_are_uppercased_and_aliased_on_whole_field() {
        assert_eq!(clean_brand(" vw "), "VOLKSWAGEN");
        assert_eq!(clean_brand("Mercedes Benz"), "MERCEDES-BENZ");
        assert_eq!(clean_brand("range rover"), "LAND ROVER");
        assert_eq!(clean_brand("VW GROUP"), "VW GROUP");
    }

    #[test]
    fn flags_map_case_insensitively() {
        assert_eq!(normalize_flag("SIM"), Some("Sim"));
        assert_eq!(normalize_flag(" não "), Some("Não"));
        assert_eq!(normalize_flag("NAO"), Some("Não"));
        assert_eq!(normalize_flag("talvez"), None);
    }

    #[test]
    fn bad_numbers_become_missing_without_dropping_the_row() {
        let record = clean_row(&row(&[
            (Column::FipeId, "abc"),
            (Column::BrandName, "bmw"),
            (Column::VehicleName, " 118i M Sport "),
            (Column::ModelYear, "2024.0"),
            (Column::Adas, "talvez"),
        ]));

        assert_eq!(record.id, None);
        assert_eq!(record.year, Some(2024));
        assert_eq!(record.brand, "BMW");
        assert_eq!(record.model_name, "118i M Sport");
        assert!(!record.has_adas);
        assert_eq!(record.search_text, "BMW 118I M SPORT");
    }

    #[test]
    fn search_text_includes_abbreviation() {
        let record = clean_row(&row(&[
            (Column::FipeId, "95432"),
            (Column::BrandName, "VW"),
            (Column::VehicleName, "Polo TSI 1.0 200 Aut. 5p"),
            (Column::Abbreviation, "Polo TSI"),
            (Column::Adas, "sim"),
            (Column::CalibrationKind, "Estática"),
        ]));

        assert_eq!(record.id, Some(95432));
        assert!(record.has_adas);
        assert_eq!(record.calibration_kind, CalibrationKind::Static);
        assert_eq!(record.search_text, "VOLKSWAGEN POLO TSI 1 0 200 AUT 5P POLO TSI");
    }

    #[test]
    fn integral_floats_parse() {
        assert_eq!(parse_whole_number("92983"), Some(92983));
        assert_eq!(parse_whole_number("2024.0"), Some(2024));
        assert_eq!(parse_whole_number("2024.5"), None);
        assert_eq!(parse_whole_number("NaN"), None);
    }

    fn arbitrary_row() -> impl Strategy<Value = RawRow> {
        let brand = prop_oneof![
            Just("vw"),
            Just(" Mercedes "),
            Just("range rover"),
            Just("BMW"),
            Just("troller"),
            Just("")
        ];
        let flag = prop_oneof![Just("Sim"), Just("NÃO"), Just("nao"), Just("x"), Just("")];
        let kind = prop_oneof![Just("Dinamica"), Just("Estática"), Just("Estatica/Dinamica"), Just("?")];

        (
            "[0-9a-z.]{0,7}",
            brand,
            "[A-Za-z0-9 .]{0,20}",
            "[0-9.]{0,6}",
            flag.clone(),
            "[A-Za-z ]{0,10}",
            flag,
            kind,
        )
            .prop_map(|(id, brand, model, year, adas, abbreviation, matrix, kind)| {
                row(&[
                    (Column::FipeId, id.as_str()),
                    (Column::BrandName, brand),
                    (Column::VehicleName, model.as_str()),
                    (Column::ModelYear, year.as_str()),
                    (Column::Adas, adas),
                    (Column::Abbreviation, abbreviation.as_str()),
                    (Column::MatrixLights, matrix),
                    (Column::CalibrationKind, kind),
                ])
            })
    }

    proptest! {
        #[test]
        fn cleaning_is_a_fixed_point(rows in proptest::collection::vec(arbitrary_row(), 0..8)) {
            let raw = RawDataset { columns: Vec::new(), rows };
            let once = clean(&raw);
            let twice = clean(&RawDataset::from_records(&once.records));
            prop_assert_eq!(once, twice);
        }
    }
}
