//! User-entered filter fields and their translation into a [`FilterSpec`].

use shared::protocol::{FilterSpec, RangeFilter};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    pub tender_count_from: Option<u32>,
    pub tender_count_to: Option<u32>,
    pub authority_name: Option<String>,
}

/// A single filter input change. `None` clears the field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterField {
    PriceFrom(Option<f64>),
    PriceTo(Option<f64>),
    TenderCountFrom(Option<u32>),
    TenderCountTo(Option<u32>),
    AuthorityName(Option<String>),
}

impl FilterField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PriceFrom(_) => "price_from",
            Self::PriceTo(_) => "price_to",
            Self::TenderCountFrom(_) => "tender_count_from",
            Self::TenderCountTo(_) => "tender_count_to",
            Self::AuthorityName(_) => "authority_name",
        }
    }
}

impl FilterCriteria {
    pub fn apply(&mut self, field: FilterField) {
        match field {
            FilterField::PriceFrom(v) => self.price_from = v,
            FilterField::PriceTo(v) => self.price_to = v,
            FilterField::TenderCountFrom(v) => self.tender_count_from = v,
            FilterField::TenderCountTo(v) => self.tender_count_to = v,
            FilterField::AuthorityName(v) => self.authority_name = v,
        }
    }

    /// Builds the query filter. Zero is a real bound; an empty authority name is not.
    pub fn to_filter_spec(&self) -> FilterSpec {
        FilterSpec {
            price: RangeFilter::from_bounds(self.price_from, self.price_to),
            tender_num: RangeFilter::from_bounds(self.tender_count_from, self.tender_count_to),
            authority_name: self
                .authority_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }
}
