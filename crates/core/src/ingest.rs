use crate::config::DatabaseConfig;
use crate::error::LoadError;
use crate::normalizer::normalize;
use crate::VehicleRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Catalog columns the pipeline understands. Anything else in the header is
/// kept only for cell accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    FipeId,
    BrandName,
    VehicleName,
    ModelYear,
    Adas,
    Abbreviation,
    WindshieldAdas,
    BumperAdas,
    CalibrationKind,
    RearCamera,
    MatrixLights,
}

impl Column {
    pub const REQUIRED: [Column; 5] = [
        Column::FipeId,
        Column::BrandName,
        Column::VehicleName,
        Column::ModelYear,
        Column::Adas,
    ];

    pub const ALL: [Column; 11] = [
        Column::FipeId,
        Column::BrandName,
        Column::VehicleName,
        Column::ModelYear,
        Column::Adas,
        Column::Abbreviation,
        Column::WindshieldAdas,
        Column::BumperAdas,
        Column::CalibrationKind,
        Column::RearCamera,
        Column::MatrixLights,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::FipeId => "FipeID",
            Column::BrandName => "BrandName",
            Column::VehicleName => "VehicleName",
            Column::ModelYear => "VehicleModelYear",
            Column::Adas => "ADAS",
            Column::Abbreviation => "Abreviação de descrição",
            Column::WindshieldAdas => "ADAS no Parabrisa",
            Column::BumperAdas => "Adas no Parachoque",
            Column::CalibrationKind => "Tipo de Regulagem",
            Column::RearCamera => "Camera no Retrovisor",
            Column::MatrixLights => "Faróis Matrix",
        }
    }

    /// Header match ignoring case, accents and punctuation.
    pub fn from_header(header: &str) -> Option<Self> {
        let wanted = normalize(header);
        Column::ALL
            .iter()
            .copied()
            .find(|column| normalize(column.header()) == wanted)
    }
}

/// One source row before any coercion. `None` means blank or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub fipe_id: Option<String>,
    pub brand_name: Option<String>,
    pub vehicle_name: Option<String>,
    pub model_year: Option<String>,
    pub adas: Option<String>,
    pub abbreviation: Option<String>,
    pub windshield_adas: Option<String>,
    pub bumper_adas: Option<String>,
    pub calibration_kind: Option<String>,
    pub rear_camera: Option<String>,
    pub matrix_lights: Option<String>,
    /// Blank cells in this row across every header column, known or not.
    pub blank_cells: usize,
}

impl RawRow {
    pub fn get(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::FipeId => &self.fipe_id,
            Column::BrandName => &self.brand_name,
            Column::VehicleName => &self.vehicle_name,
            Column::ModelYear => &self.model_year,
            Column::Adas => &self.adas,
            Column::Abbreviation => &self.abbreviation,
            Column::WindshieldAdas => &self.windshield_adas,
            Column::BumperAdas => &self.bumper_adas,
            Column::CalibrationKind => &self.calibration_kind,
            Column::RearCamera => &self.rear_camera,
            Column::MatrixLights => &self.matrix_lights,
        };
        value.as_deref()
    }

    fn slot(&mut self, column: Column) -> &mut Option<String> {
        match column {
            Column::FipeId => &mut self.fipe_id,
            Column::BrandName => &mut self.brand_name,
            Column::VehicleName => &mut self.vehicle_name,
            Column::ModelYear => &mut self.model_year,
            Column::Adas => &mut self.adas,
            Column::Abbreviation => &mut self.abbreviation,
            Column::WindshieldAdas => &mut self.windshield_adas,
            Column::BumperAdas => &mut self.bumper_adas,
            Column::CalibrationKind => &mut self.calibration_kind,
            Column::RearCamera => &mut self.rear_camera,
            Column::MatrixLights => &mut self.matrix_lights,
        }
    }

    pub fn set(&mut self, column: Column, value: &str) {
        let trimmed = value.trim();
        *self.slot(column) = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataset {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawDataset {
    pub fn has_column(&self, column: Column) -> bool {
        self.columns
            .iter()
            .any(|header| Column::from_header(header) == Some(column))
    }

    pub fn missing_required_columns(&self) -> Vec<Column> {
        Column::REQUIRED
            .iter()
            .copied()
            .filter(|column| !self.has_column(*column))
            .collect()
    }

    pub fn total_cells(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    pub fn blank_cells(&self) -> usize {
        self.rows.iter().map(|row| row.blank_cells).sum()
    }

    /// Rebuilds the source form of already cleaned records.
    pub fn from_records(records: &[VehicleRecord]) -> Self {
        let columns = Column::ALL
            .iter()
            .map(|column| column.header().to_string())
            .collect::<Vec<_>>();

        let rows = records
            .iter()
            .map(|record| {
                let mut row = RawRow::default();
                let cells = [
                    (Column::FipeId, record.id.map(|id| id.to_string())),
                    (Column::BrandName, Some(record.brand.clone())),
                    (Column::VehicleName, Some(record.model_name.clone())),
                    (Column::ModelYear, record.year.map(|year| year.to_string())),
                    (Column::Adas, Some(yes_no(record.has_adas))),
                    (Column::Abbreviation, record.abbreviation.clone()),
                    (Column::WindshieldAdas, Some(yes_no(record.windshield_adas))),
                    (Column::BumperAdas, Some(yes_no(record.bumper_adas))),
                    (
                        Column::CalibrationKind,
                        Some(record.calibration_kind.label().to_string()),
                    ),
                    (Column::RearCamera, Some(yes_no(record.rear_camera))),
                    (Column::MatrixLights, Some(yes_no(record.matrix_lights))),
                ];

                for (column, value) in cells {
                    let value = value.unwrap_or_default();
                    if value.trim().is_empty() {
                        row.blank_cells += 1;
                    }
                    row.set(column, &value);
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Small built-in catalog used when no source file is supplied.
    pub fn demo() -> Self {
        const HEADERS: [Column; 11] = Column::ALL;
        const ROWS: [[&str; 11]; 10] = [
            ["92983", "BMW", "118i M Sport 1.5 TB 12V Aut. 5p", "2024", "Sim", "118i M Sport", "Sim", "Sim", "Dinamica", "Não", "Não"],
            ["95432", "VOLKSWAGEN", "Polo TSI 1.0 200 Aut. 5p", "2023", "Sim", "Polo TSI", "Sim", "Sim", "Estatica", "Sim", "Não"],
            ["87621", "MERCEDES-BENZ", "A-Class A200 1.3 TB Aut.", "2024", "Sim", "A200", "Sim", "Sim", "Dinamica", "Sim", "Sim"],
            ["73291", "AUDI", "A3 Sedan 1.4 TFSI Aut.", "2025", "Sim", "A3 Sedan", "Sim", "Sim", "Estatica/Dinamica", "Não", "Sim"],
            ["84512", "TOYOTA", "Corolla 2.0 XEi Aut.", "2023", "Sim", "Corolla XEi", "Não", "Sim", "Dinamica", "Sim", "Não"],
            ["91234", "VOLVO", "XC60 T5 Momentum AWD Aut.", "2024", "Sim", "XC60 T5", "Sim", "Sim", "Dinamica", "Sim", "Sim"],
            ["76543", "FORD", "Territory 1.5 EcoBoost GTDi Aut.", "2023", "Sim", "Territory EcoBoost", "Sim", "Sim", "Estatica", "Não", "Não"],
            ["88901", "HYUNDAI", "Tucson 1.6 GLS TB Aut.", "2025", "Sim", "Tucson GLS", "Sim", "Sim", "Dinamica", "Sim", "Não"],
            ["92345", "JEEP", "Compass 1.3 T270 Turbo Aut.", "2024", "Sim", "Compass T270", "Sim", "Sim", "Estatica", "Sim", "Sim"],
            ["85678", "LAND ROVER", "Discovery Sport HSE 2.0 TD4 Aut.", "2023", "Sim", "Discovery Sport", "Sim", "Sim", "Dinamica", "Sim", "Sim"],
        ];

        let rows = ROWS
            .iter()
            .map(|cells| {
                let mut row = RawRow::default();
                for (column, value) in HEADERS.iter().zip(cells.iter()) {
                    row.set(*column, value);
                }
                row
            })
            .collect();

        Self {
            columns: HEADERS.iter().map(|column| column.header().to_string()).collect(),
            rows,
        }
    }
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "Sim" } else { "Não" };
    label.to_string()
}

pub fn read_dataset<R: Read>(reader: R, config: &DatabaseConfig) -> Result<RawDataset, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mapping = columns
        .iter()
        .map(|header| Column::from_header(header))
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = RawRow::default();

        for (position, column) in mapping.iter().enumerate() {
            let cell = record.get(position).unwrap_or_default();
            if cell.trim().is_empty() {
                row.blank_cells += 1;
            }
            if let Some(column) = column {
                row.set(*column, cell);
            }
        }

        rows.push(row);
    }

    Ok(RawDataset { columns, rows })
}

pub fn read_dataset_file(path: &Path, config: &DatabaseConfig) -> Result<RawDataset, LoadError> {
    let file = File::open(path)?;
    read_dataset(file, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "FipeID;BrandName;VehicleName;VehicleModelYear;ADAS;Abreviação de descrição;Extra\n\
                          92983;BMW;118i M Sport;2024;Sim;118i M Sport;x\n\
                          95432; vw ;Polo TSI;2023;Não;;\n";

    #[test]
    fn semicolon_source_is_parsed_into_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dataset = read_dataset(SAMPLE.as_bytes(), &DatabaseConfig::default())?;

        assert_eq!(dataset.columns.len(), 7);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.rows[0].get(Column::FipeId), Some("92983"));
        assert_eq!(dataset.rows[1].get(Column::BrandName), Some("vw"));
        assert_eq!(dataset.rows[1].get(Column::Abbreviation), None);
        assert_eq!(dataset.rows[1].blank_cells, 2);
        assert_eq!(dataset.total_cells(), 14);
        assert_eq!(dataset.blank_cells(), 2);
        Ok(())
    }

    #[test]
    fn missing_required_columns_are_listed() -> Result<(), Box<dyn std::error::Error>> {
        let source = "FipeID;VehicleName;VehicleModelYear;ADAS\n1;Polo;2023;Sim\n";
        let dataset = read_dataset(source.as_bytes(), &DatabaseConfig::default())?;
        assert_eq!(dataset.missing_required_columns(), vec![Column::BrandName]);
        Ok(())
    }

    #[test]
    fn headers_match_loosely() {
        assert_eq!(Column::from_header("abreviacao de descricao"), Some(Column::Abbreviation));
        assert_eq!(Column::from_header("Farois Matrix"), Some(Column::MatrixLights));
        assert_eq!(Column::from_header("Unrelated"), None);
    }

    #[test]
    fn demo_catalog_has_every_column() {
        let demo = RawDataset::demo();
        assert_eq!(demo.rows.len(), 10);
        assert!(demo.missing_required_columns().is_empty());
        assert_eq!(demo.blank_cells(), 0);
    }
}
