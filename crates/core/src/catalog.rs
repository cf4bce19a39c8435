//! Item reference data.
//!
//! The reference worksheet maps an item name to its purchase unit,
//! category grouping and the departments allowed to order it. The catalog
//! is loaded read-only, deduplicated case-insensitively (first occurrence
//! wins) and kept behind a TTL cache so a session does not hammer the
//! store on every lookup.
//!
//! Row layout: item, unit, permitted departments ("all" or a comma list),
//! category, sub-category, and optionally a base unit with a conversion
//! factor. A leading header row is detected heuristically.

use crate::cache::TtlCache;
use crate::{IndentError, IndentResult};
use indent_store::Worksheet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Unit recorded when the reference row leaves the unit cell blank.
pub const UNKNOWN_UNIT: &str = "N/A";
/// Category applied when the reference row has none.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
/// Sub-category applied when the reference row has none.
pub const DEFAULT_SUB_CATEGORY: &str = "General";

/// Which departments may order an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permitted {
    All,
    Departments(Vec<String>),
}

impl Permitted {
    fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("all") {
            return Permitted::All;
        }
        Permitted::Departments(
            cell.split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

/// One row of the reference worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceItem {
    pub name: String,
    pub unit: String,
    pub category: String,
    pub sub_category: String,
    pub permitted: Permitted,
    pub base_unit: Option<String>,
    pub conversion_factor: Option<f64>,
}

impl ReferenceItem {
    /// Whether the given department may order this item.
    pub fn permits(&self, department: &str) -> bool {
        match &self.permitted {
            Permitted::All => true,
            Permitted::Departments(depts) => depts
                .iter()
                .any(|d| d.eq_ignore_ascii_case(department.trim())),
        }
    }
}

/// The immutable, loaded reference catalog.
#[derive(Debug, Default)]
pub struct ReferenceCatalog {
    items: Vec<ReferenceItem>,
    by_lower: HashMap<String, usize>,
}

impl ReferenceCatalog {
    /// Builds a catalog from raw worksheet rows.
    ///
    /// Fully empty rows are skipped. The first row is treated as a header
    /// when "item" appears in its first cell or "unit" in its second,
    /// case-insensitive. Duplicate names (case-insensitive) keep the first
    /// occurrence; the original casing is preserved for display. Items end
    /// up sorted by name.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut items: Vec<ReferenceItem> = Vec::new();
        let mut by_lower: HashMap<String, usize> = HashMap::new();
        let mut header_skipped = false;

        for (i, row) in rows.iter().enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if !header_skipped && i == 0 && looks_like_header(row) {
                header_skipped = true;
                continue;
            }

            let name = cell(row, 0);
            if name.is_empty() {
                continue;
            }
            let lower = name.to_lowercase();
            if by_lower.contains_key(&lower) {
                continue;
            }

            let unit = cell(row, 1);
            let category = cell(row, 3);
            let sub_category = cell(row, 4);
            let base_unit = Some(cell(row, 5)).filter(|c| !c.is_empty());
            let conversion_factor = cell(row, 6).parse::<f64>().ok();

            by_lower.insert(lower, items.len());
            items.push(ReferenceItem {
                name,
                unit: if unit.is_empty() {
                    UNKNOWN_UNIT.to_owned()
                } else {
                    unit
                },
                category: if category.is_empty() {
                    DEFAULT_CATEGORY.to_owned()
                } else {
                    category
                },
                sub_category: if sub_category.is_empty() {
                    DEFAULT_SUB_CATEGORY.to_owned()
                } else {
                    sub_category
                },
                permitted: Permitted::parse(&cell(row, 2)),
                base_unit,
                conversion_factor,
            });
        }

        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let by_lower = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.name.to_lowercase(), i))
            .collect();

        Self { items, by_lower }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Case-insensitive lookup by item name.
    pub fn resolve(&self, name: &str) -> Option<&ReferenceItem> {
        self.by_lower
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.items[i])
    }

    /// All item names in display order.
    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }

    /// Items a department may order, in display order.
    pub fn permitted_items(&self, department: &str) -> Vec<&ReferenceItem> {
        self.items
            .iter()
            .filter(|item| item.permits(department))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceItem> {
        self.items.iter()
    }
}

fn looks_like_header(row: &[String]) -> bool {
    let first = row.first().map(|c| c.to_lowercase()).unwrap_or_default();
    let second = row.get(1).map(|c| c.to_lowercase()).unwrap_or_default();
    first.contains("item") || second.contains("unit")
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).map(|c| c.trim().to_owned()).unwrap_or_default()
}

/// Loads the reference catalog from its worksheet, throttled by a TTL
/// cache. A refresh that fails or parses to an empty catalog falls back to
/// the previously loaded value when one exists.
#[derive(Debug)]
pub struct CatalogService {
    sheet: Worksheet,
    cache: Mutex<TtlCache<Arc<ReferenceCatalog>>>,
}

impl CatalogService {
    pub fn new(sheet: Worksheet, max_age: Duration) -> Self {
        Self {
            sheet,
            cache: Mutex::new(TtlCache::new(max_age)),
        }
    }

    /// Returns the current catalog.
    ///
    /// # Errors
    ///
    /// Returns [`IndentError::Store`] if the worksheet cannot be read and
    /// no earlier catalog is cached, or [`IndentError::CatalogUnavailable`]
    /// if the sheet reads fine but contains no items.
    pub fn load(&self) -> IndentResult<Arc<ReferenceCatalog>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get_or_refresh(|| {
            let rows = self.sheet.get_all_values()?;
            let catalog = ReferenceCatalog::from_rows(&rows);
            if catalog.is_empty() {
                return Err(IndentError::CatalogUnavailable);
            }
            tracing::debug!(items = catalog.len(), "reference catalog loaded");
            Ok(Arc::new(catalog))
        })
    }
}
