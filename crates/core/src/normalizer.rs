/// Brands recognised in free text and accepted by the validator without a warning.
pub const KNOWN_BRANDS: [&str; 30] = [
    "BMW",
    "MERCEDES",
    "MERCEDES-BENZ",
    "AUDI",
    "VOLKSWAGEN",
    "VW",
    "VOLVO",
    "TOYOTA",
    "FORD",
    "HYUNDAI",
    "JEEP",
    "LAND ROVER",
    "PEUGEOT",
    "RENAULT",
    "FIAT",
    "NISSAN",
    "HONDA",
    "MAZDA",
    "SUBARU",
    "MITSUBISHI",
    "LEXUS",
    "INFINITI",
    "ACURA",
    "PORSCHE",
    "FERRARI",
    "LAMBORGHINI",
    "BENTLEY",
    "ROLLS-ROYCE",
    "SCANIA",
    "VOLVO CAMINHOES",
];

const ACCENT_FOLDS: [(char, char); 24] = [
    ('Á', 'A'),
    ('À', 'A'),
    ('Ã', 'A'),
    ('Â', 'A'),
    ('Ä', 'A'),
    ('É', 'E'),
    ('È', 'E'),
    ('Ê', 'E'),
    ('Ë', 'E'),
    ('Í', 'I'),
    ('Ì', 'I'),
    ('Î', 'I'),
    ('Ï', 'I'),
    ('Ó', 'O'),
    ('Ò', 'O'),
    ('Õ', 'O'),
    ('Ô', 'O'),
    ('Ö', 'O'),
    ('Ú', 'U'),
    ('Ù', 'U'),
    ('Û', 'U'),
    ('Ü', 'U'),
    ('Ç', 'C'),
    ('Ñ', 'N'),
];

fn fold_accent(c: char) -> char {
    ACCENT_FOLDS
        .iter()
        .find(|(accented, _)| *accented == c)
        .map(|(_, plain)| *plain)
        .unwrap_or(c)
}

/// Upper-cases, folds accents, turns every punctuation run into one space and
/// collapses whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_uppercase()
        .chars()
        .map(fold_accent)
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every maximal ASCII digit run, in order.
pub fn extract_numbers(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// All known brands mentioned in `text`, in catalog order.
pub fn extract_brands(text: &str) -> Vec<&'static str> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    KNOWN_BRANDS
        .iter()
        .copied()
        .filter(|brand| normalized.contains(&normalize(brand)))
        .collect()
}

pub fn is_known_brand(brand: &str) -> bool {
    let wanted = brand.trim().to_uppercase();
    KNOWN_BRANDS.iter().any(|known| *known == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accents_and_punctuation_collapse() {
        assert_eq!(normalize("É-É"), "E E");
        assert_eq!(normalize("  Não,  sim!! "), "NAO SIM");
        assert_eq!(normalize("Faróis Matrix"), "FAROIS MATRIX");
        assert_eq!(normalize("118i M Sport 1.5 TB"), "118I M SPORT 1 5 TB");
    }

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" -- "), "");
    }

    #[test]
    fn numbers_keep_order() {
        assert_eq!(extract_numbers("Polo 200 TSI 1.0 2023"), vec!["200", "1", "0", "2023"]);
        assert!(extract_numbers("no digits").is_empty());
    }

    #[test]
    fn brands_are_all_reported() {
        let found = extract_brands("bmw x1 ou vw polo");
        assert_eq!(found, vec!["BMW", "VW"]);

        let found = extract_brands("Mercedes-Benz A200");
        assert_eq!(found, vec!["MERCEDES", "MERCEDES-BENZ"]);
    }

    #[test]
    fn known_brand_lookup_ignores_case() {
        assert!(is_known_brand(" land rover "));
        assert!(!is_known_brand("TROLLER"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(text in "[a-zA-Z0-9À-ÿ .,;:/_-]{0,40}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_has_no_edge_or_double_spaces(text in "[a-zA-Zéãç .,;/-]{0,40}") {
            let normalized = normalize(&text);
            prop_assert!(!normalized.starts_with(' '));
            prop_assert!(!normalized.ends_with(' '));
            prop_assert!(!normalized.contains("  "));
        }
    }
}
