// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use storedesk_app::{ListItem, LookupSource, PAGE_SIZE_THRESHOLD};

const ITEM_NOUNS: [&str; 15] = [
    "Bolt", "Nut", "Washer", "Screw", "Hinge", "Bracket", "Chain", "Rod", "Pipe", "Elbow",
    "Flange", "Rivet", "Anchor", "Clamp", "Spring",
];

const ITEM_MATERIALS: [&str; 6] = ["Steel", "Brass", "Copper", "Zinc", "Alloy", "Iron"];

const ITEM_UNITS: [&str; 4] = ["pcs", "kg", "box", "mtr"];

const SUPPLIER_PREFIXES: [&str; 10] = [
    "Shree", "Ganesh", "Modern", "National", "Royal", "Sai", "Bharat", "Star", "Prime", "Kaveri",
];

const SUPPLIER_SUFFIXES: [&str; 5] = ["Traders", "Metals", "Hardware", "Industries", "Agencies"];

const CITIES: [&str; 10] = [
    "Rajkot", "Surat", "Pune", "Indore", "Nagpur", "Jaipur", "Ludhiana", "Coimbatore", "Kanpur",
    "Vadodara",
];

const UNITS: [(&str, &str, &str); 6] = [
    ("PCS", "Pieces", "0"),
    ("KG", "Kilogram", "3"),
    ("GM", "Gram", "0"),
    ("BOX", "Box", "0"),
    ("MTR", "Metre", "2"),
    ("DOZ", "Dozen", "0"),
];

const SIZES: [&str; 12] = [
    "M4", "M5", "M6", "M8", "M10", "M12", "M16", "M20", "1/4in", "3/8in", "1/2in", "3/4in",
];

const SCRAP: [(&str, &str); 5] = [
    ("Brass turnings", "310"),
    ("Copper wire", "640"),
    ("Mild steel", "32"),
    ("Zinc dross", "120"),
    ("Aluminium sheet", "140"),
];

const STATES: [(&str, &str, &str); 10] = [
    ("GJ", "Gujarat", "24"),
    ("MH", "Maharashtra", "27"),
    ("MP", "Madhya Pradesh", "23"),
    ("RJ", "Rajasthan", "08"),
    ("PB", "Punjab", "03"),
    ("TN", "Tamil Nadu", "33"),
    ("UP", "Uttar Pradesh", "09"),
    ("KA", "Karnataka", "29"),
    ("DL", "Delhi", "07"),
    ("WB", "West Bengal", "19"),
];

const DEFAULT_ITEM_COUNT: usize = 90;
const DEFAULT_SUPPLIER_COUNT: usize = 45;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        min + self.int_n((max - min + 1) as usize) as i64
    }
}

/// Generates believable master data from a seed. The same seed always
/// produces the same records in the same order.
#[derive(Debug, Clone)]
pub struct StoreFaker {
    rng: DeterministicRng,
}

impl StoreFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    pub fn item(&mut self, index: usize) -> ListItem {
        let noun = ITEM_NOUNS[index % ITEM_NOUNS.len()];
        let material = self.pick(&ITEM_MATERIALS);
        let size = self.pick(&SIZES);
        let purchase_paise = self.rng.int_range(150, 95_000);
        let markup_percent = self.rng.int_range(8, 45);
        let sale_paise = purchase_paise + purchase_paise * markup_percent / 100;
        ListItem::new()
            .with("code", format!("IT{:04}", index + 1))
            .with("name", format!("{noun} {material} {size}"))
            .with("unit", self.pick(&ITEM_UNITS))
            .with("purchase_rate", rupees(purchase_paise))
            .with("sale_rate", rupees(sale_paise))
    }

    pub fn supplier(&mut self, index: usize) -> ListItem {
        let prefix = SUPPLIER_PREFIXES[index % SUPPLIER_PREFIXES.len()];
        let suffix = self.pick(&SUPPLIER_SUFFIXES);
        let (state_code, _, gst_code) = STATES[self.rng.int_n(STATES.len())];
        let city = self.pick(&CITIES);
        ListItem::new()
            .with("code", format!("SP{:03}", index + 1))
            .with("name", format!("{prefix} {suffix}"))
            .with("city", city)
            .with("state", state_code)
            .with(
                "gstin",
                format!(
                    "{gst_code}ABCDE{:04}F1Z{}",
                    self.rng.int_range(1000, 9999),
                    self.rng.int_n(10)
                ),
            )
    }
}

fn rupees(paise: i64) -> String {
    format!("{}.{:02}", paise / 100, paise % 100)
}

/// In-memory stand-in for the store API's list endpoints.
///
/// Filtering mirrors the server: a case-insensitive substring match on any
/// field, in catalog order, served in pages of [`PAGE_SIZE_THRESHOLD`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoCatalog {
    suppliers: Vec<ListItem>,
    items: Vec<ListItem>,
    units: Vec<ListItem>,
    sizes: Vec<ListItem>,
    scrap: Vec<ListItem>,
    states: Vec<ListItem>,
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DemoCatalog {
    pub fn new(seed: u64) -> Self {
        Self::with_counts(seed, DEFAULT_SUPPLIER_COUNT, DEFAULT_ITEM_COUNT)
    }

    pub fn with_counts(seed: u64, suppliers: usize, items: usize) -> Self {
        let mut faker = StoreFaker::new(seed);
        Self {
            suppliers: (0..suppliers).map(|index| faker.supplier(index)).collect(),
            items: (0..items).map(|index| faker.item(index)).collect(),
            units: UNITS
                .iter()
                .map(|(code, name, decimals)| {
                    ListItem::new()
                        .with("code", *code)
                        .with("name", *name)
                        .with("decimals", *decimals)
                })
                .collect(),
            sizes: SIZES
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    ListItem::new()
                        .with("code", format!("SZ{:02}", index + 1))
                        .with("name", *name)
                })
                .collect(),
            scrap: SCRAP
                .iter()
                .enumerate()
                .map(|(index, (name, rate))| {
                    ListItem::new()
                        .with("code", format!("SC{:02}", index + 1))
                        .with("name", *name)
                        .with("rate", *rate)
                })
                .collect(),
            states: STATES
                .iter()
                .map(|(code, name, state_code)| {
                    ListItem::new()
                        .with("code", *code)
                        .with("name", *name)
                        .with("state_code", *state_code)
                })
                .collect(),
        }
    }

    pub fn records(&self, source: LookupSource) -> &[ListItem] {
        match source {
            LookupSource::Supplier => &self.suppliers,
            LookupSource::Item => &self.items,
            LookupSource::Unit => &self.units,
            LookupSource::Size => &self.sizes,
            LookupSource::Scrap => &self.scrap,
            LookupSource::State => &self.states,
        }
    }

    pub fn matching(&self, source: LookupSource, search: &str) -> Vec<&ListItem> {
        let needle = search.trim().to_lowercase();
        self.records(source)
            .iter()
            .filter(|item| {
                needle.is_empty()
                    || item
                        .fields()
                        .any(|(_, value)| value.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Serves one 1-based page of matches.
    pub fn page(&self, source: LookupSource, page: u32, search: &str) -> Result<Vec<ListItem>> {
        if page == 0 {
            bail!("page numbers start at 1");
        }
        let start = (page as usize - 1).saturating_mul(PAGE_SIZE_THRESHOLD);
        Ok(self
            .matching(source, search)
            .into_iter()
            .skip(start)
            .take(PAGE_SIZE_THRESHOLD)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{DemoCatalog, StoreFaker};
    use storedesk_app::{LookupSource, PAGE_SIZE_THRESHOLD};

    #[test]
    fn same_seed_same_catalog() {
        assert_eq!(DemoCatalog::new(7), DemoCatalog::new(7));
        assert_ne!(
            DemoCatalog::new(7).records(LookupSource::Item),
            DemoCatalog::new(8).records(LookupSource::Item)
        );
    }

    #[test]
    fn zero_seed_is_normalized() {
        let mut zero = StoreFaker::new(0);
        let mut one = StoreFaker::new(1);
        assert_eq!(zero.item(0), one.item(0));
    }

    #[test]
    fn items_page_through_in_full_pages_then_a_short_one() {
        let catalog = DemoCatalog::default();
        let total = catalog.records(LookupSource::Item).len();
        let mut seen = 0;
        let mut page = 1;
        loop {
            let batch = catalog
                .page(LookupSource::Item, page, "")
                .expect("page should load");
            seen += batch.len();
            if batch.len() < PAGE_SIZE_THRESHOLD {
                break;
            }
            page += 1;
        }
        assert_eq!(seen, total);
        assert!(page > 1, "default catalog should span several pages");
    }

    #[test]
    fn search_is_case_insensitive_on_any_field() {
        let catalog = DemoCatalog::default();
        let hits = catalog.matching(LookupSource::State, "GUJ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field("code"), "GJ");

        let by_code = catalog.matching(LookupSource::Unit, "kg");
        assert!(by_code.iter().any(|unit| unit.field("code") == "KG"));
    }

    #[test]
    fn items_carry_rates_for_the_invoice_grid() {
        let catalog = DemoCatalog::default();
        let item = &catalog.records(LookupSource::Item)[0];
        assert_eq!(item.field("code"), "IT0001");
        assert!(item.field("purchase_rate").parse::<f64>().is_ok());
        assert!(item.field("sale_rate").parse::<f64>().is_ok());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(DemoCatalog::default().page(LookupSource::Unit, 0, "").is_err());
    }
}
