use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indent_core::request::REQUIRED_DATE_FORMAT;
use indent_core::{
    is_error_mrn, CatalogService, CoreConfig, HistoryService, MrnAllocator, ReferenceCatalog,
};
use indent_store::Workbook;

#[derive(Parser)]
#[command(name = "indent")]
#[command(about = "Material indent system CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List reference items
    Catalog {
        /// Restrict to items a department may order
        #[arg(long)]
        department: Option<String>,
    },
    /// Preview the next request identifier
    NextMrn,
    /// List submitted indent lines
    History {
        /// Start of the required-date range (DD-MM-YYYY)
        #[arg(long)]
        from: Option<String>,
        /// End of the required-date range (DD-MM-YYYY)
        #[arg(long)]
        to: Option<String>,
        /// Filter by department (repeatable)
        #[arg(long)]
        department: Vec<String>,
        /// Filter by requester (repeatable)
        #[arg(long)]
        requested_by: Vec<String>,
        /// Substring of the request identifier
        #[arg(long)]
        mrn: Option<String>,
        /// Substring of the item name
        #[arg(long)]
        item: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = config_from_env()?;
    let workbook = Workbook::open(cfg.data_dir())?;

    match cli.command {
        Some(Commands::Catalog { department }) => {
            let sheet = workbook.existing_worksheet(cfg.reference_sheet())?;
            let service = CatalogService::new(sheet, cfg.catalog_max_age());
            let catalog = service.load()?;
            print_catalog(&catalog, department.as_deref());
        }
        Some(Commands::NextMrn) => {
            let sheet = workbook.existing_worksheet(cfg.log_sheet())?;
            let mrn = MrnAllocator::new(sheet).allocate();
            if is_error_mrn(&mrn) {
                eprintln!("Log read failed; allocation returned the error sentinel.");
            }
            println!("{mrn}");
        }
        Some(Commands::History {
            from,
            to,
            department,
            requested_by,
            mrn,
            item,
        }) => {
            let sheet = workbook.existing_worksheet(cfg.log_sheet())?;
            let service =
                HistoryService::new(sheet, cfg.history_max_age(), cfg.history_window_days());

            let mut filter = service.default_filter(Utc::now().date_naive());
            if let Some(from) = from.as_deref() {
                filter.from = parse_date(from)?;
            }
            if let Some(to) = to.as_deref() {
                filter.to = parse_date(to)?;
            }
            filter.departments = department.into_iter().collect();
            filter.requesters = requested_by.into_iter().collect();
            filter.request_id_query = mrn.unwrap_or_default();
            filter.item_query = item.unwrap_or_default();

            let records = service.filtered(&filter)?;
            if records.is_empty() {
                println!("No indent records found.");
            } else {
                for record in &records {
                    println!(
                        "{} | {} | {} | {} | {} x {} {} | {}",
                        record.request_id,
                        record
                            .required_date
                            .map(|d| d.format(REQUIRED_DATE_FORMAT).to_string())
                            .unwrap_or_else(|| "-".into()),
                        record.department,
                        record.requested_by,
                        record.item_name,
                        record.quantity,
                        record.unit,
                        if record.note.is_empty() {
                            "-"
                        } else {
                            record.note.as_str()
                        },
                    );
                }
                println!("{} matching records.", records.len());
            }
        }
        None => {
            println!("Use --help to list commands.");
        }
    }

    Ok(())
}

fn config_from_env() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let data_dir = std::env::var("INDENT_DATA_DIR").unwrap_or_else(|_| "./indent_data".into());
    let log_sheet = std::env::var("INDENT_LOG_SHEET")
        .unwrap_or_else(|_| indent_core::config::DEFAULT_LOG_SHEET.into());
    let reference_sheet = std::env::var("INDENT_REFERENCE_SHEET")
        .unwrap_or_else(|_| indent_core::config::DEFAULT_REFERENCE_SHEET.into());
    let window_days = indent_core::config::history_window_from_env_value(
        std::env::var("INDENT_HISTORY_WINDOW_DAYS").ok(),
    )?;

    Ok(CoreConfig::new(
        data_dir.into(),
        log_sheet,
        reference_sheet,
        window_days,
    )?)
}

fn parse_date(value: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    Ok(NaiveDate::parse_from_str(value, REQUIRED_DATE_FORMAT)
        .map_err(|_| format!("invalid date '{value}', expected DD-MM-YYYY"))?)
}

fn print_catalog(catalog: &ReferenceCatalog, department: Option<&str>) {
    let items = match department {
        Some(department) => catalog.permitted_items(department),
        None => catalog.iter().collect(),
    };

    if items.is_empty() {
        println!("No items found.");
        return;
    }
    for item in items {
        println!(
            "{} [{}] {} / {}",
            item.name, item.unit, item.category, item.sub_category
        );
    }
}
