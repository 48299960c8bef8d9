use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheetable_catalog::catalog_store::{Composer, ComposerUpdate, PageRequest, Pagination, Sheet};
use sheetable_catalog::cli_style::{
    get_styles, print_empty_list, print_error, print_key_value, print_section_footer,
    print_section_header, print_success, print_warning, TableBuilder,
};
use sheetable_catalog::config::{AppConfig, CliConfig, FileConfig};
use sheetable_catalog::safe_name::derive_safe_name;
use sheetable_catalog::{CatalogError, CatalogManager, UploadRequest};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, about = "Administer a catalogue of musical sheets")]
struct CliArgs {
    /// Root directory of the catalogue (PDFs, thumbnails and, by default, the database).
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite catalog database file. Defaults to <data-dir>/catalog.db.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the composer lookup service. Pass an empty string to disable it.
    #[clap(long)]
    pub composer_lookup_url: Option<String>,

    /// Timeout in seconds for composer lookups.
    #[clap(long)]
    pub composer_lookup_timeout_sec: Option<u64>,

    /// URL of the thumbnail rendering endpoint. Thumbnails are skipped when unset.
    #[clap(long)]
    pub thumbnail_url: Option<String>,

    /// Timeout in seconds for thumbnail rendering.
    #[clap(long)]
    pub thumbnail_timeout_sec: Option<u64>,

    /// Page size used when a listing doesn't ask for one.
    #[clap(long)]
    pub default_page_size: Option<usize>,

    /// Print results as JSON instead of tables.
    #[clap(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// The PDF to upload.
    #[clap(value_parser = parse_path)]
    pdf: PathBuf,

    /// Id of the uploading user.
    #[clap(long)]
    uploader: u32,

    /// Title of the sheet.
    #[clap(long)]
    title: String,

    /// Composer name, leave empty for an unknown composer.
    #[clap(long, default_value = "")]
    composer: String,

    /// Release date, YYYY-MM-DD.
    #[clap(long, default_value = "")]
    release_date: String,

    /// Semicolon separated categories.
    #[clap(long, default_value = "")]
    categories: String,

    /// Semicolon separated tags.
    #[clap(long, default_value = "")]
    tags: String,

    /// Free text shown with the sheet.
    #[clap(long, default_value = "")]
    info: String,
}

impl UploadArgs {
    fn request(&self) -> UploadRequest {
        UploadRequest {
            composer: self.composer.clone(),
            sheet_name: self.title.clone(),
            release_date: self.release_date.clone(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
            information_text: self.info.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 1-based page number.
    #[clap(long, default_value_t = 1)]
    page: i64,

    /// Rows per page (at most 100), 0 for the configured default.
    #[clap(long, default_value_t = 0)]
    limit: usize,

    /// Sort key, e.g. "updated_at desc" or "sheet_name".
    #[clap(long, default_value = "")]
    sort: String,
}

impl PageArgs {
    fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit).sorted_by(self.sort.clone())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Uploads a PDF as a new sheet.
    Upload(UploadArgs),

    /// Deletes a sheet and uploads a new one in its place.
    Replace {
        safe_sheet_name: String,
        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Shows a single sheet.
    Show { safe_sheet_name: String },

    /// Lists sheets page by page.
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Only list sheets of this composer (safe name).
        #[clap(long)]
        composer: Option<String>,
    },

    /// Finds sheets whose title contains the given text.
    Search { text: String },

    /// Finds sheets carrying exactly the given tag.
    SearchTag { tag: String },

    /// Adds a tag to a sheet.
    AddTag { safe_sheet_name: String, tag: String },

    /// Removes a tag from a sheet.
    RemoveTag { safe_sheet_name: String, tag: String },

    /// Replaces the information text of a sheet.
    SetInfo { safe_sheet_name: String, text: String },

    /// Deletes a sheet with its PDF and thumbnail.
    Delete { safe_sheet_name: String },

    /// Lists composers page by page.
    Composers {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Finds composers whose name contains the given text.
    SearchComposers { text: String },

    /// Edits the metadata of a composer.
    UpdateComposer {
        safe_name: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        epoch: Option<String>,
        #[clap(long)]
        portrait_url: Option<String>,
    },

    /// Deletes a composer that no sheet references.
    DeleteComposer { safe_name: String },

    /// Prints the safe name derived from the given text.
    Slug { text: String },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            data_dir: self.data_dir.clone(),
            db_path: self.db_path.clone(),
            composer_lookup_url: self.composer_lookup_url.clone(),
            composer_lookup_timeout_sec: self.composer_lookup_timeout_sec,
            thumbnail_url: self.thumbnail_url.clone(),
            thumbnail_timeout_sec: self.thumbnail_timeout_sec,
            default_page_size: self.default_page_size,
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let cli_args = CliArgs::parse();
    if let Err(e) = run(cli_args) {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli_args: CliArgs) -> Result<()> {
    let json = cli_args.json;

    // Needs neither a database nor a data directory
    if let Command::Slug { text } = &cli_args.command {
        println!("{}", derive_safe_name(text));
        return Ok(());
    }

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let catalog = CatalogManager::open(&config)?;

    match cli_args.command {
        Command::Upload(args) => {
            let sheet = with_pdf(&args.pdf, |pdf| {
                catalog.upload(args.uploader, &args.request(), pdf)
            })?;
            report_sheet(&sheet, json, "Uploaded")
        }
        Command::Replace {
            safe_sheet_name,
            upload,
        } => {
            let sheet = with_pdf(&upload.pdf, |pdf| {
                catalog.replace(&safe_sheet_name, upload.uploader, &upload.request(), pdf)
            })?;
            report_sheet(&sheet, json, "Replaced")
        }
        Command::Show { safe_sheet_name } => {
            show_sheet(&catalog.find_by_safe_name(&safe_sheet_name)?, json)
        }
        Command::List { page, composer } => {
            let pagination = catalog.list(&page.request(), composer.as_deref())?;
            show_sheet_page(&pagination, json)
        }
        Command::Search { text } => show_sheets(&catalog.search(&text)?, json),
        Command::SearchTag { tag } => show_sheets(&catalog.search_by_tag(&tag)?, json),
        Command::AddTag {
            safe_sheet_name,
            tag,
        } => {
            let sheet = catalog.append_tag(&safe_sheet_name, &tag)?;
            report_sheet(&sheet, json, "Tags updated")
        }
        Command::RemoveTag {
            safe_sheet_name,
            tag,
        } => {
            let sheet = catalog.remove_tag(&safe_sheet_name, &tag)?;
            report_sheet(&sheet, json, "Tags updated")
        }
        Command::SetInfo {
            safe_sheet_name,
            text,
        } => {
            let sheet = catalog.update_information_text(&safe_sheet_name, &text)?;
            report_sheet(&sheet, json, "Information text updated")
        }
        Command::Delete { safe_sheet_name } => {
            let deleted = catalog.delete(&safe_sheet_name)?;
            if json {
                print_json(&serde_json::json!({ "deleted": deleted }))
            } else {
                print_success(&format!("Deleted {} ({} row)", safe_sheet_name, deleted));
                Ok(())
            }
        }
        Command::Composers { page } => {
            let pagination = catalog.composers().list(&page.request())?;
            show_composer_page(&pagination, json)
        }
        Command::SearchComposers { text } => {
            show_composers(&catalog.composers().search(&text)?, json)
        }
        Command::UpdateComposer {
            safe_name,
            name,
            epoch,
            portrait_url,
        } => {
            let composer = catalog.composers().update(
                &safe_name,
                ComposerUpdate {
                    name,
                    epoch,
                    portrait_url,
                },
            )?;
            if json {
                print_json(&composer)
            } else {
                print_success(&format!("Updated composer {}", composer.safe_name));
                show_composers(std::slice::from_ref(&composer), false)
            }
        }
        Command::DeleteComposer { safe_name } => {
            catalog.composers().delete(&safe_name)?;
            if json {
                print_json(&serde_json::json!({ "deleted": safe_name }))
            } else {
                print_success(&format!("Deleted composer {}", safe_name));
                Ok(())
            }
        }
        Command::Slug { .. } => Ok(()),
    }
}

/// Opens the PDF and hands it to `action`. A thumbnail failure is reported
/// as a warning since the sheet itself was created.
fn with_pdf<F>(path: &Path, action: F) -> Result<Sheet>
where
    F: FnOnce(&mut BufReader<File>) -> Result<Sheet, CatalogError>,
{
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    match action(&mut reader) {
        Ok(sheet) => Ok(sheet),
        Err(CatalogError::Thumbnail {
            safe_sheet_name,
            reason,
        }) => {
            print_warning(&format!(
                "Sheet {} was stored but its thumbnail failed: {}",
                safe_sheet_name, reason
            ));
            Err(anyhow::anyhow!("thumbnail generation failed"))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_sheet(sheet: &Sheet, json: bool, verb: &str) -> Result<()> {
    if json {
        return print_json(sheet);
    }
    print_success(&format!("{} {}", verb, sheet.safe_sheet_name));
    show_sheet(sheet, false)
}

fn show_sheet(sheet: &Sheet, json: bool) -> Result<()> {
    if json {
        return print_json(sheet);
    }
    let tags = match sheet.tag_set() {
        Ok(set) => set.iter().collect::<Vec<_>>().join(", "),
        Err(_) => format!("<undecodable: {}>", sheet.tags),
    };
    let categories = match sheet.category_list() {
        Ok(list) => list.join(", "),
        Err(_) => format!("<undecodable: {}>", sheet.categories),
    };

    print_section_header(&sheet.sheet_name);
    print_key_value("Safe name", &sheet.safe_sheet_name);
    print_key_value("Composer", &format!("{} ({})", sheet.composer, sheet.safe_composer));
    print_key_value("PDF", &sheet.pdf_url);
    print_key_value("Release date", &sheet.release_date.to_string());
    print_key_value("Uploader", &sheet.uploader_id.to_string());
    print_key_value("Tags", &tags);
    print_key_value("Categories", &categories);
    print_key_value("Information", &sheet.information_text);
    print_key_value("Updated", &sheet.updated_at.to_rfc3339());
    print_section_footer();
    Ok(())
}

fn show_sheets(sheets: &[Sheet], json: bool) -> Result<()> {
    if json {
        return print_json(sheets);
    }
    if sheets.is_empty() {
        print_empty_list("No sheets");
        return Ok(());
    }
    let mut table = TableBuilder::new(&["Safe name", "Title", "Composer", "Updated"]);
    for sheet in sheets {
        table.add_row(&[
            sheet.safe_sheet_name.clone(),
            sheet.sheet_name.clone(),
            sheet.composer.clone(),
            sheet.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn show_sheet_page(pagination: &Pagination<Sheet>, json: bool) -> Result<()> {
    if json {
        return print_json(pagination);
    }
    show_sheets(&pagination.rows, false)?;
    print_key_value(
        "Page",
        &format!(
            "{} of {} ({} sheets, sorted by {})",
            pagination.page, pagination.total_pages, pagination.total_rows, pagination.sort
        ),
    );
    Ok(())
}

fn show_composers(composers: &[Composer], json: bool) -> Result<()> {
    if json {
        return print_json(composers);
    }
    if composers.is_empty() {
        print_empty_list("No composers");
        return Ok(());
    }
    let mut table = TableBuilder::new(&["Safe name", "Name", "Epoch", "Lived"]);
    for composer in composers {
        let lived = match (&composer.birth, &composer.death) {
            (None, None) => String::new(),
            (birth, death) => format!(
                "{} - {}",
                birth.as_deref().unwrap_or("?"),
                death.as_deref().unwrap_or("")
            ),
        };
        table.add_row(&[
            composer.safe_name.as_str(),
            composer.name.as_str(),
            composer.epoch.as_str(),
            lived.as_str(),
        ]);
    }
    table.print();
    Ok(())
}

fn show_composer_page(pagination: &Pagination<Composer>, json: bool) -> Result<()> {
    if json {
        return print_json(pagination);
    }
    show_composers(&pagination.rows, false)?;
    print_key_value(
        "Page",
        &format!(
            "{} of {} ({} composers, sorted by {})",
            pagination.page, pagination.total_pages, pagination.total_rows, pagination.sort
        ),
    );
    Ok(())
}
