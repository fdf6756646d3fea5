use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use saka_core::core_api::{Engine, FieldValue, HeadView, Session};
use saka_core::keys::{self, KeyMaterial};
use saka_core::memcard::CardImage;
use saka_core::text::Lookup;
use saka_render::{
    FieldSelection, JsonStyle, render_club_sheet, render_fields_json, render_fields_text,
    render_json_full, render_json_selected, render_layout_text, render_slots_json,
    render_slots_text,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "CARD.ps2")]
    path: PathBuf,
    /// Save directory name; defaults to the first Sakatsuku 04 save on the card.
    #[arg(long, value_name = "NAME")]
    slot: Option<String>,
    /// Directory holding s_boxes.bin, and optionally crc_table.bin and jp.csv.
    #[arg(long, value_name = "DIR", default_value = "resource")]
    resources: PathBuf,
    /// Extra `code,char` rows merged over the resource character table.
    #[arg(long, value_name = "CSV")]
    charset: Option<PathBuf>,
    #[arg(long)]
    list: bool,
    #[arg(long)]
    club: bool,
    #[arg(long)]
    head: bool,
    #[arg(long)]
    town: bool,
    #[arg(long)]
    players: bool,
    #[arg(long)]
    layout: bool,
    #[arg(long, value_name = "PREFIX")]
    fields: Option<String>,
    #[arg(long)]
    json: bool,
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,
    #[arg(long = "set-head", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set_head: Vec<(String, String)>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn selection(&self) -> FieldSelection {
        FieldSelection {
            club: self.club,
            head: self.head,
            town: self.town,
            players: self.players,
            layout: self.layout,
        }
    }

    fn has_edits(&self) -> bool {
        !self.set.is_empty() || !self.set_head.is_empty()
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.has_edits() && cli.output.is_none() {
        eprintln!("--set/--set-head require --output <PATH>");
        process::exit(2);
    }
    if !cli.has_edits() && cli.output.is_some() {
        eprintln!("--output requires at least one --set or --set-head");
        process::exit(2);
    }
    if cli.list && (cli.has_edits() || cli.slot.is_some()) {
        eprintln!("--list cannot be combined with --slot or edits");
        process::exit(2);
    }

    let engine = build_engine(&cli).unwrap_or_else(|e| {
        eprintln!("Error loading resources from {}: {e}", cli.resources.display());
        process::exit(1);
    });
    let image = CardImage::new(&cli.path);

    if cli.list {
        let slots = engine.list_slots(&image).unwrap_or_else(|e| {
            eprintln!("Error reading card image {}: {e}", cli.path.display());
            process::exit(1);
        });
        if cli.json {
            print_json(&render_slots_json(&slots));
        } else {
            print!("{}", render_slots_text(&slots));
        }
        return;
    }

    let slot = match cli.slot.clone() {
        Some(name) => name,
        None => first_slot(&image).unwrap_or_else(|message| {
            eprintln!("{message}");
            process::exit(1);
        }),
    };
    let mut session = engine.open_slot(&image, &slot).unwrap_or_else(|e| {
        eprintln!("Error opening save {slot} on {}", cli.path.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    for (path, value) in &cli.set {
        apply_set(&mut session, path, value).unwrap_or_else(|message| {
            eprintln!("Error applying {path}={value}: {message}");
            process::exit(1);
        });
    }
    for (name, value) in &cli.set_head {
        let parsed = parse_int(value).unwrap_or_else(|message| {
            eprintln!("Error applying head {name}={value}: {message}");
            process::exit(1);
        });
        session.set_head_int(name, parsed).unwrap_or_else(|e| {
            eprintln!("Error applying head {name}={value}: {e}");
            process::exit(1);
        });
    }

    if let Some(out_path) = cli.output.as_ref() {
        write_output(&cli.path, out_path, &mut session).unwrap_or_else(|message| {
            eprintln!("Error writing {}: {message}", out_path.display());
            process::exit(1);
        });
    }

    let selection = cli.selection();
    if cli.json {
        let json = if let Some(prefix) = cli.fields.as_deref() {
            Ok(render_fields_json(&session.fields(prefix)))
        } else if selection.is_any_selected() {
            render_json_selected(&session, &selection, JsonStyle::CanonicalV1)
        } else {
            render_json_full(&session, JsonStyle::CanonicalV1)
        };
        let json = json.unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        print_json(&json);
        return;
    }

    if let Some(prefix) = cli.fields.as_deref() {
        print!("{}", render_fields_text(&session.fields(prefix)));
        return;
    }

    if selection.is_any_selected() {
        print_selected_text(&session, &selection);
        return;
    }

    if let Some(out_path) = cli.output.as_ref() {
        println!("Wrote edited save {slot} to {}", out_path.display());
        return;
    }

    let sheet = render_club_sheet(&session).unwrap_or_else(|e| {
        eprintln!("Error rendering club sheet: {e}");
        process::exit(1);
    });
    print!("{sheet}");
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine(cli: &Cli) -> Result<Engine, String> {
    let key_material = KeyMaterial::load(&cli.resources).map_err(|e| e.to_string())?;
    let mut lookup = keys::load_lookup(&cli.resources).map_err(|e| e.to_string())?;
    if let Some(csv) = cli.charset.as_ref() {
        merge_charset(&mut lookup, csv)?;
    }
    debug!(entries = lookup.len(), "character table ready");
    Ok(Engine::new(key_material, lookup))
}

fn merge_charset(lookup: &mut Lookup, path: &Path) -> Result<(), String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    lookup
        .merge_csv(&text)
        .map_err(|e| format!("{}: {e}", path.display()))
}

fn first_slot(image: &CardImage) -> Result<String, String> {
    let names = image
        .save_names()
        .map_err(|e| format!("Error reading card image {}: {e}", image.path().display()))?;
    names
        .into_iter()
        .next()
        .ok_or_else(|| format!("No Sakatsuku 04 saves on {}", image.path().display()))
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got {raw:?}"))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing field path in {raw:?}"));
    }
    Ok((path.to_string(), value.to_string()))
}

fn parse_int(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => trimmed.parse::<i64>(),
    };
    parsed.map_err(|_| format!("{value:?} is not an integer"))
}

/// Routes an edit to the string or integer setter depending on the field's
/// decoded kind.
fn apply_set(session: &mut Session, path: &str, value: &str) -> Result<(), String> {
    let is_text = session
        .fields(path)
        .iter()
        .any(|f| f.path == path && matches!(f.value, FieldValue::Text(_)));
    if is_text {
        session.set_str(path, value).map_err(|e| e.to_string())
    } else {
        let parsed = parse_int(value)?;
        session.set_int(path, parsed).map_err(|e| e.to_string())
    }
}

/// Writes the session into `out_path`. A different path starts as a copy of
/// the source image so the original card is left untouched.
fn write_output(source: &Path, out_path: &Path, session: &mut Session) -> Result<(), String> {
    if source != out_path {
        fs::copy(source, out_path).map_err(|e| e.to_string())?;
    }
    let target = CardImage::new(out_path);
    session.write_to_image(&target).map_err(|e| e.to_string())?;
    info!(slot = session.name(), path = %out_path.display(), "edited save written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

fn print_selected_text(session: &Session, selection: &FieldSelection) {
    if selection.club {
        print!("{}", render_fields_text(&session.fields("club.")));
    }
    if selection.head {
        match session.head() {
            Some(head) => print_head(&head),
            None => println!("head=missing"),
        }
    }
    if selection.town {
        print!("{}", render_fields_text(&session.fields("town.")));
    }
    if selection.players {
        print!("{}", render_fields_text(&session.fields("team.players[")));
    }
    if selection.layout {
        print!("{}", render_layout_text(session.layout()));
    }
}

fn print_head(head: &HeadView) {
    println!("head.year = {}", head.year);
    println!("head.month = {}", head.month);
    println!("head.date = {}", head.date);
    println!("head.day = {}", head.day);
    println!("head.club_name = {:?}", head.club_name);
    println!("head.verified = {}", head.verified);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_the_first_equals() {
        assert_eq!(
            parse_assignment("club.club_name=A=B").expect("valid"),
            ("club.club_name".to_string(), "A=B".to_string())
        );
        assert!(parse_assignment("club.funds").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn integers_accept_decimal_and_hex() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("-3"), Ok(-3));
        assert_eq!(parse_int("0x1F"), Ok(31));
        assert!(parse_int("ten").is_err());
    }
}
