use serde::Serialize;

use crate::cities::CityTarget;

/// Output column order. Matches the field order of [`ListingRecord`].
pub const COLUMNS: [&str; 11] = [
    "mls_number",
    "price",
    "address",
    "city",
    "beds",
    "baths",
    "square_footage",
    "year_built",
    "lot_size",
    "garage",
    "listing_agent",
];

/// Everything the extractor could read from one listing. Not yet tied to a city.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFields {
    pub mls_number: Option<String>,
    pub price: Option<u64>,
    pub address: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub square_footage: Option<u32>,
    pub year_built: Option<i32>,
    pub lot_size: Option<String>,
    pub garage: Option<String>,
    pub listing_agent: Option<String>,
}

impl ListingFields {
    pub fn populated(&self) -> usize {
        [
            self.mls_number.is_some(),
            self.price.is_some(),
            self.address.is_some(),
            self.beds.is_some(),
            self.baths.is_some(),
            self.square_footage.is_some(),
            self.year_built.is_some(),
            self.lot_size.is_some(),
            self.garage.is_some(),
            self.listing_agent.is_some(),
        ]
        .into_iter()
        .filter(|&present| present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.populated() == 0
    }

    /// Fills fields still missing here from `other`. Present values are kept.
    pub fn fill_from(&mut self, other: ListingFields) {
        self.mls_number = self.mls_number.take().or(other.mls_number);
        self.price = self.price.or(other.price);
        self.address = self.address.take().or(other.address);
        self.beds = self.beds.or(other.beds);
        self.baths = self.baths.or(other.baths);
        self.square_footage = self.square_footage.or(other.square_footage);
        self.year_built = self.year_built.or(other.year_built);
        self.lot_size = self.lot_size.take().or(other.lot_size);
        self.garage = self.garage.take().or(other.garage);
        self.listing_agent = self.listing_agent.take().or(other.listing_agent);
    }
}

/// One property listing, stamped with the city it was scraped for.
///
/// Fields are private so a record can't be changed after it is built. `None`
/// means the value was missing or unparsable on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    mls_number: String,
    price: Option<u64>,
    address: String,
    city: String,
    beds: Option<u32>,
    baths: Option<f64>,
    square_footage: Option<u32>,
    year_built: Option<i32>,
    lot_size: Option<String>,
    garage: Option<String>,
    listing_agent: Option<String>,
}

impl ListingRecord {
    pub fn new(city: &CityTarget, fields: ListingFields) -> Self {
        Self {
            mls_number: fields.mls_number.unwrap_or_default(),
            price: fields.price,
            address: fields.address.unwrap_or_default(),
            city: city.slug.to_string(),
            beds: fields.beds,
            baths: fields.baths,
            square_footage: fields.square_footage,
            year_built: fields.year_built,
            lot_size: fields.lot_size,
            garage: fields.garage,
            listing_agent: fields.listing_agent,
        }
    }

    pub fn mls_number(&self) -> &str {
        &self.mls_number
    }
    pub fn price(&self) -> Option<u64> {
        self.price
    }
    pub fn address(&self) -> &str {
        &self.address
    }
    pub fn city(&self) -> &str {
        &self.city
    }
    pub fn beds(&self) -> Option<u32> {
        self.beds
    }
    pub fn baths(&self) -> Option<f64> {
        self.baths
    }
    pub fn square_footage(&self) -> Option<u32> {
        self.square_footage
    }
    pub fn year_built(&self) -> Option<i32> {
        self.year_built
    }
    pub fn lot_size(&self) -> Option<&str> {
        self.lot_size.as_deref()
    }
    pub fn garage(&self) -> Option<&str> {
        self.garage.as_deref()
    }
    pub fn listing_agent(&self) -> Option<&str> {
        self.listing_agent.as_deref()
    }

    /// Cells in [`COLUMNS`] order. Missing values become empty strings.
    pub fn cells(&self) -> [String; 11] {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        [
            self.mls_number.clone(),
            opt(&self.price),
            self.address.clone(),
            self.city.clone(),
            opt(&self.beds),
            opt(&self.baths),
            opt(&self.square_footage),
            opt(&self.year_built),
            opt(&self.lot_size),
            opt(&self.garage),
            opt(&self.listing_agent),
        ]
    }
}

/// The in-memory result of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordTable {
    rows: Vec<ListingRecord>,
}

impl RecordTable {
    pub fn new(rows: Vec<ListingRecord>) -> Self {
        Self { rows }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn rows(&self) -> &[ListingRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn for_city<'a>(&'a self, slug: &'a str) -> impl Iterator<Item = &'a ListingRecord> + 'a {
        self.rows.iter().filter(move |r| r.city == slug)
    }
}
