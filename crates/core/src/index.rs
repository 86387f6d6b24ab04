use crate::normalizer::normalize;
use crate::{Dataset, VehicleRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Lookup tables over one [`Dataset`]. Entries are row positions into that
/// dataset, so an index is only meaningful next to the dataset it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    by_id: HashMap<u64, usize>,
    by_brand: HashMap<String, Vec<usize>>,
    by_year: BTreeMap<i32, Vec<usize>>,
    duplicate_ids: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub total_vehicles: usize,
    pub id_index_size: usize,
    pub duplicate_ids: usize,
    pub brands_count: usize,
    pub years_count: usize,
}

impl SearchIndex {
    /// Single pass. A repeated id keeps its first row; later rows stay
    /// reachable through the brand and year tables.
    pub fn build(dataset: &Dataset) -> Self {
        let mut index = SearchIndex::default();

        for (position, record) in dataset.iter().enumerate() {
            if let Some(id) = record.id {
                if index.by_id.contains_key(&id) {
                    index.duplicate_ids += 1;
                } else {
                    index.by_id.insert(id, position);
                }
            }

            let brand_key = normalize(&record.brand);
            if !brand_key.is_empty() {
                index.by_brand.entry(brand_key).or_default().push(position);
            }

            if let Some(year) = record.year {
                index.by_year.entry(year).or_default().push(position);
            }
        }

        index
    }

    pub fn by_id<'d>(&self, dataset: &'d Dataset, id: u64) -> Option<&'d VehicleRecord> {
        self.by_id
            .get(&id)
            .and_then(|position| dataset.records.get(*position))
    }

    pub fn by_brand<'d>(&self, dataset: &'d Dataset, brand: &str) -> Vec<&'d VehicleRecord> {
        self.by_brand
            .get(&normalize(brand))
            .map(|positions| resolve(dataset, positions))
            .unwrap_or_default()
    }

    pub fn by_year<'d>(&self, dataset: &'d Dataset, year: i32) -> Vec<&'d VehicleRecord> {
        self.by_year
            .get(&year)
            .map(|positions| resolve(dataset, positions))
            .unwrap_or_default()
    }

    pub fn stats(&self, dataset: &Dataset) -> IndexStats {
        IndexStats {
            total_vehicles: dataset.len(),
            id_index_size: self.by_id.len(),
            duplicate_ids: self.duplicate_ids,
            brands_count: self.by_brand.len(),
            years_count: self.by_year.len(),
        }
    }
}

fn resolve<'d>(dataset: &'d Dataset, positions: &[usize]) -> Vec<&'d VehicleRecord> {
    positions
        .iter()
        .filter_map(|position| dataset.records.get(*position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::ingest::RawDataset;
    use crate::CalibrationKind;

    fn record(id: Option<u64>, brand: &str, model: &str, year: Option<i32>) -> VehicleRecord {
        VehicleRecord {
            id,
            year,
            brand: brand.to_string(),
            model_name: model.to_string(),
            abbreviation: None,
            has_adas: true,
            windshield_adas: false,
            bumper_adas: false,
            rear_camera: false,
            matrix_lights: false,
            calibration_kind: CalibrationKind::Unknown,
            search_text: normalize(&format!("{brand} {model}")),
        }
    }

    #[test]
    fn lookups_resolve_through_the_dataset() {
        let dataset = clean(&RawDataset::demo());
        let index = SearchIndex::build(&dataset);

        let bmw = index.by_id(&dataset, 92983).map(|record| record.brand.as_str());
        assert_eq!(bmw, Some("BMW"));
        assert!(index.by_id(&dataset, 1).is_none());

        let land_rover = index.by_brand(&dataset, "land rover");
        assert_eq!(land_rover.len(), 1);
        assert_eq!(land_rover[0].id, Some(85678));

        let from_2024 = index
            .by_year(&dataset, 2024)
            .iter()
            .filter_map(|record| record.id)
            .collect::<Vec<_>>();
        assert_eq!(from_2024, vec![92983, 87621, 91234, 92345]);
    }

    #[test]
    fn first_occurrence_wins_for_duplicate_ids() {
        let dataset = Dataset::new(vec![
            record(Some(7000), "BMW", "X1", Some(2023)),
            record(Some(7000), "AUDI", "A3", Some(2023)),
            record(None, "AUDI", "Q5", None),
        ]);
        let index = SearchIndex::build(&dataset);

        assert_eq!(
            index.by_id(&dataset, 7000).map(|record| record.model_name.as_str()),
            Some("X1")
        );
        assert_eq!(index.by_brand(&dataset, "Audi").len(), 2);
        assert_eq!(index.by_year(&dataset, 2023).len(), 2);

        let stats = index.stats(&dataset);
        assert_eq!(stats.duplicate_ids, 1);
        assert_eq!(stats.id_index_size, 1);
        assert_eq!(stats.years_count, 1);
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let dataset = clean(&RawDataset::demo());
        assert_eq!(SearchIndex::build(&dataset), SearchIndex::build(&dataset));
    }
}
