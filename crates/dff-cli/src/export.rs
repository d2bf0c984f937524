//! `export` command handlers.
//!
//! The master price list is rendered in the column order the farm's
//! spreadsheet uses, with the computed FFCSA price columns filled in. The
//! workbook keeps prices and markups as typed numbers with currency and
//! percent formats; the CSV carries the same cells as text.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use dff_core::{calculate_prices, MarkupConfig};
use dff_db::PricelistRow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

#[derive(Debug, Subcommand)]
pub enum ExportCommands {
    /// Write the whole price list with computed prices
    Pricelist {
        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
        /// Destination file [default: docs/masterPriceList.<format>]
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub(crate) fn default_output(self) -> PathBuf {
        match self {
            Self::Xlsx => PathBuf::from("docs/masterPriceList.xlsx"),
            Self::Csv => PathBuf::from("docs/masterPriceList.csv"),
        }
    }
}

const SHEET_NAME: &str = "Pricelist";
const CURRENCY_FORMAT: &str = "$#,##0.00";
const WEIGHT_FORMAT: &str = "0.00";
const PERCENT_FORMAT: &str = "0%";

const PRICELIST_HEADER: [&str; 20] = [
    "id",
    "local_line_product_id",
    "category",
    "product_name",
    "package_name",
    "retail_sales_price",
    "lowest_weight",
    "highest_weight",
    "dff_unit_of_measure",
    "ffcsa_purchase_price",
    "ffcsa_member_sales_price",
    "ffcsa_guest_sales_price",
    "ffcsa_member_markup",
    "ffcsa_guest_markup",
    "num_of_items",
    "available_on_ll",
    "description",
    "track_inventory",
    "stock_inventory",
    "visible",
];

/// One output row with its computed prices. `None` renders as an empty cell.
#[derive(Debug, Clone, PartialEq)]
struct PricelistLine {
    id: i64,
    local_line_product_id: Option<i64>,
    category: String,
    product_name: String,
    package_name: String,
    retail_sales_price: Decimal,
    lowest_weight: Option<Decimal>,
    highest_weight: Option<Decimal>,
    unit_of_measure: String,
    purchase_price: Option<Decimal>,
    member_sales_price: Option<Decimal>,
    guest_sales_price: Option<Decimal>,
    member_markup: Decimal,
    guest_markup: Decimal,
    num_of_items: Option<i32>,
    available_on_ll: bool,
    description: String,
    track_inventory: bool,
    stock_inventory: i32,
    visible: bool,
}

/// # Errors
///
/// Returns an error if the query fails or the file cannot be written.
pub(crate) async fn run_export_pricelist(
    pool: &sqlx::PgPool,
    config: &dff_core::AppConfig,
    format: ExportFormat,
    output: &Path,
) -> anyhow::Result<()> {
    let rows = dff_db::list_pricelist(pool).await?;
    let lines = pricelist_lines(&rows, &config.markups);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match format {
        ExportFormat::Xlsx => build_pricelist_workbook(&lines)?.save(output)?,
        ExportFormat::Csv => write_pricelist_csv(&lines, std::fs::File::create(output)?)?,
    }

    tracing::info!(rows = lines.len(), path = %output.display(), ?format, "price list exported");
    println!("wrote {} row(s) to {}", lines.len(), output.display());
    Ok(())
}

/// Rows whose prices cannot be computed keep empty price cells.
fn pricelist_lines(rows: &[PricelistRow], markups: &MarkupConfig) -> Vec<PricelistLine> {
    rows.iter()
        .map(|row| {
            let bundle = calculate_prices(&row.price_inputs(), markups)
                .inspect_err(|e| {
                    tracing::warn!(
                        row_id = row.id,
                        product = %row.product_name,
                        error = %e,
                        "price calculation failed; leaving computed columns blank"
                    );
                })
                .ok();

            PricelistLine {
                id: row.id,
                local_line_product_id: row.local_line_product_id,
                category: row.category.clone(),
                product_name: row.product_name.clone(),
                package_name: row.package_name.clone().unwrap_or_default(),
                retail_sales_price: row.retail_sales_price,
                lowest_weight: row.lowest_weight,
                highest_weight: row.highest_weight,
                unit_of_measure: row.dff_unit_of_measure.clone(),
                purchase_price: bundle.as_ref().map(|b| b.purchase_price),
                member_sales_price: bundle.as_ref().map(|b| b.member_sales_price),
                guest_sales_price: bundle.as_ref().map(|b| b.guest_sales_price),
                member_markup: markups.member_markup,
                guest_markup: markups.guest_markup,
                num_of_items: row.num_of_items,
                available_on_ll: row.available_on_ll,
                description: row.description.clone().unwrap_or_default(),
                track_inventory: row.track_inventory,
                stock_inventory: row.stock_inventory,
                visible: row.visible,
            }
        })
        .collect()
}

/// One `Pricelist` sheet: header row, then one row per line.
fn build_pricelist_workbook(lines: &[PricelistLine]) -> anyhow::Result<Workbook> {
    let currency = Format::new().set_num_format(CURRENCY_FORMAT);
    let weight = Format::new().set_num_format(WEIGHT_FORMAT);
    let percent = Format::new().set_num_format(PERCENT_FORMAT);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in (0u16..).zip(PRICELIST_HEADER) {
        sheet.write_string(0, col, title)?;
    }

    for (i, line) in lines.iter().enumerate() {
        let row = u32::try_from(i + 1)?;

        sheet.write_number(row, 0, number(Decimal::from(line.id)))?;
        if let Some(id) = line.local_line_product_id {
            sheet.write_number(row, 1, number(Decimal::from(id)))?;
        }
        sheet.write_string(row, 2, &line.category)?;
        sheet.write_string(row, 3, &line.product_name)?;
        sheet.write_string(row, 4, &line.package_name)?;
        sheet.write_number_with_format(row, 5, number(line.retail_sales_price), &currency)?;
        write_optional(sheet, row, 6, line.lowest_weight, &weight)?;
        write_optional(sheet, row, 7, line.highest_weight, &weight)?;
        sheet.write_string(row, 8, &line.unit_of_measure)?;
        write_optional(sheet, row, 9, line.purchase_price, &currency)?;
        write_optional(sheet, row, 10, line.member_sales_price, &currency)?;
        write_optional(sheet, row, 11, line.guest_sales_price, &currency)?;
        sheet.write_number_with_format(row, 12, number(line.member_markup), &percent)?;
        sheet.write_number_with_format(row, 13, number(line.guest_markup), &percent)?;
        if let Some(n) = line.num_of_items {
            sheet.write_number(row, 14, f64::from(n))?;
        }
        sheet.write_string(row, 15, yes_no(line.available_on_ll))?;
        sheet.write_string(row, 16, &line.description)?;
        sheet.write_string(row, 17, yes_no(line.track_inventory))?;
        sheet.write_number(row, 18, f64::from(line.stock_inventory))?;
        sheet.write_string(row, 19, yes_no(line.visible))?;
    }

    Ok(workbook)
}

fn write_optional(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<Decimal>,
    format: &Format,
) -> anyhow::Result<()> {
    if let Some(value) = value {
        sheet.write_number_with_format(row, col, number(value), format)?;
    }
    Ok(())
}

/// Writes the header and one line per row.
fn write_pricelist_csv<W: Write>(lines: &[PricelistLine], out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(PRICELIST_HEADER)?;

    for line in lines {
        writer.write_record([
            line.id.to_string(),
            opt(line.local_line_product_id),
            line.category.clone(),
            line.product_name.clone(),
            line.package_name.clone(),
            money(line.retail_sales_price),
            opt(line.lowest_weight.map(money)),
            opt(line.highest_weight.map(money)),
            line.unit_of_measure.clone(),
            opt(line.purchase_price.map(money)),
            opt(line.member_sales_price.map(money)),
            opt(line.guest_sales_price.map(money)),
            percent_text(line.member_markup),
            percent_text(line.guest_markup),
            opt(line.num_of_items),
            yes_no(line.available_on_ll).to_owned(),
            line.description.clone(),
            yes_no(line.track_inventory).to_owned(),
            line.stock_inventory.to_string(),
            yes_no(line.visible).to_owned(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn money(value: Decimal) -> String {
    dff_localline::format_price(value)
}

/// `0.38` renders as `38%`.
fn percent_text(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
