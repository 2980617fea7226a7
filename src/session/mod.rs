//! Line-oriented session scripts.
//!
//! A script drives one [`Engine`] the way a user would drive the interactive
//! tool: choose systems, enter or load points, transform, click around the
//! table and map, copy and export. One command per line; a `#` at the start
//! of a line or after whitespace starts a comment, and blank lines are
//! ignored. A `#` inside a word (`out#2.geojson`) is kept.
//!
//! ```text
//! origin 4326
//! destination 3116
//! add -74.0775 4.5962
//! load points.csv
//! transform
//! select 1
//! table
//! export out.geojson
//! export-shp out.zip
//! ```
//!
//! Rows are 1-based, matching the `N` column printed by `table`. A failing
//! command is reported with its line number and the script continues; the
//! run as a whole fails with [`CoordError::SessionFailed`] afterwards.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::io_geojson::DEFAULT_EXPORT_FILE_NAME;
use crate::dataset::io_shapefile::{DEFAULT_SHAPEFILE_ARCHIVE_NAME, SHAPEFILE_CRS};
use crate::dataset::{CoordSet, InputFormat, RecordId};
use crate::engine::{render_table, ContextAction, Engine, Reaction, UserEvent};
use crate::error::CoordError;
use crate::reproject::ProjectionService;
use crate::selection::{MapLayer, MapSurface};

/// One parsed script command. Row fields are already 0-based.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Origin(String),
    Destination(String),
    Add { x: String, y: String },
    Load { path: PathBuf, format: InputFormat },
    Transform,
    Select(usize),
    Marker(RecordId),
    Context(usize),
    Delete(usize),
    Clear,
    Table,
    Copy { set: CoordSet, row: Option<usize> },
    Map(MapLayer),
    Export(Option<PathBuf>),
    ExportShp(Option<PathBuf>),
    Crs,
}

/// Parses one script line.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_command(line: &str, line_num: usize) -> Result<Option<Command>, CoordError> {
    let content = strip_comment(line).trim();
    if content.is_empty() {
        return Ok(None);
    }

    let err = |message: String| CoordError::Script {
        line: line_num,
        message,
    };

    let (keyword, rest) = match content.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (content, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let keyword = keyword.to_ascii_lowercase();

    let expect_args = |min: usize, max: usize, usage: &str| {
        if args.len() < min || args.len() > max {
            Err(err(format!("usage: {usage}")))
        } else {
            Ok(())
        }
    };

    let command = match keyword.as_str() {
        "origin" => {
            expect_args(1, 1, "origin CODE")?;
            Command::Origin(args[0].to_string())
        }
        "destination" => {
            expect_args(1, 1, "destination CODE")?;
            Command::Destination(args[0].to_string())
        }
        "add" => {
            expect_args(2, 2, "add X Y")?;
            Command::Add {
                x: args[0].to_string(),
                y: args[1].to_string(),
            }
        }
        "load" => {
            if rest.is_empty() {
                return Err(err("usage: load PATH [auto|text|table]".to_string()));
            }
            // A trailing format keyword is optional; paths may contain spaces.
            let (path, format) = match rest.rsplit_once(char::is_whitespace) {
                Some((path, last)) => match InputFormat::from_str(last) {
                    Ok(format) => (path.trim(), format),
                    Err(_) => (rest, InputFormat::Auto),
                },
                None => (rest, InputFormat::Auto),
            };
            Command::Load {
                path: PathBuf::from(path),
                format,
            }
        }
        "transform" => {
            expect_args(0, 0, "transform")?;
            Command::Transform
        }
        "select" => {
            expect_args(1, 1, "select ROW")?;
            Command::Select(parse_row(args[0]).map_err(err)?)
        }
        "marker" => {
            expect_args(1, 1, "marker ID")?;
            let id = args[0]
                .parse::<u64>()
                .map_err(|_| err(format!("invalid record id '{}'", args[0])))?;
            Command::Marker(RecordId::new(id))
        }
        "context" => {
            expect_args(1, 1, "context ROW")?;
            Command::Context(parse_row(args[0]).map_err(err)?)
        }
        "delete" => {
            expect_args(1, 1, "delete ROW")?;
            Command::Delete(parse_row(args[0]).map_err(err)?)
        }
        "clear" => {
            expect_args(0, 0, "clear")?;
            Command::Clear
        }
        "table" => {
            expect_args(0, 0, "table")?;
            Command::Table
        }
        "copy" => {
            expect_args(1, 2, "copy source|target [ROW]")?;
            let set = CoordSet::from_str(args[0]).map_err(|e| err(e.to_string()))?;
            let row = match args.get(1) {
                Some(raw) => Some(parse_row(raw).map_err(err)?),
                None => None,
            };
            Command::Copy { set, row }
        }
        "map" => {
            expect_args(1, 1, "map source|target")?;
            Command::Map(MapLayer::from_str(args[0]).map_err(|e| err(e.to_string()))?)
        }
        "export" => Command::Export(optional_path(rest)),
        "export-shp" => Command::ExportShp(optional_path(rest)),
        "crs" => {
            expect_args(0, 0, "crs")?;
            Command::Crs
        }
        other => return Err(err(format!("unknown command '{other}'"))),
    };

    Ok(Some(command))
}

/// Cuts `line` at the first `#` that opens the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (pos, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..pos];
        }
        previous = Some(c);
    }
    line
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    (!rest.is_empty()).then(|| PathBuf::from(rest))
}

/// Parses a 1-based row number into a 0-based index.
fn parse_row(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("row numbers start at 1".to_string()),
        Ok(n) => Ok(n - 1),
        Err(_) => Err(format!("invalid row number '{raw}'")),
    }
}

/// Fuzz-only entrypoint for script line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_command(input: &str) -> Result<(), CoordError> {
    for (i, line) in input.lines().enumerate() {
        let _ = parse_command(line, i + 1)?;
    }
    Ok(())
}

/// Runs a whole script against `engine`.
///
/// Command output goes to `out`, per-line failures to `err`. Returns the
/// number of commands executed successfully.
pub fn run_script<P, M, W, E>(
    engine: &mut Engine<P, M>,
    script: &str,
    out: &mut W,
    err: &mut E,
) -> Result<usize, CoordError>
where
    P: ProjectionService,
    M: MapSurface,
    W: Write,
    E: Write,
{
    let mut executed = 0;
    let mut errors = 0;

    for (i, line) in script.lines().enumerate() {
        let line_num = i + 1;
        let result = parse_command(line, line_num).and_then(|command| match command {
            Some(command) => execute(engine, &command, out)
                .map(|()| true)
                .map_err(|e| CoordError::Script {
                    line: line_num,
                    message: e.to_string(),
                }),
            None => Ok(false),
        });

        match result {
            Ok(true) => executed += 1,
            Ok(false) => {}
            Err(e) => {
                errors += 1;
                log::debug!("session command failed: {}", e);
                writeln!(err, "Error: {e}")?;
            }
        }
    }

    // A load that never completed would leave the engine locked.
    if engine.is_ingestion_pending() {
        engine.complete_ingestion()?;
    }

    if errors > 0 {
        return Err(CoordError::SessionFailed { errors });
    }
    Ok(executed)
}

/// Executes one command.
pub fn execute<P, M, W>(
    engine: &mut Engine<P, M>,
    command: &Command,
    out: &mut W,
) -> Result<(), CoordError>
where
    P: ProjectionService,
    M: MapSurface,
    W: Write,
{
    match command {
        Command::Origin(code) => {
            engine.set_origin_crs(code)?;
            writeln!(out, "origin: EPSG:{}", engine.origin_crs())?;
        }
        Command::Destination(code) => {
            engine.set_destination_crs(code)?;
            writeln!(out, "destination: EPSG:{}", engine.destination_crs())?;
        }
        Command::Add { x, y } => {
            let id = engine.add_point(x, y)?;
            writeln!(out, "added row {} (record {})", engine.records().len(), id)?;
        }
        Command::Load { path, format } => {
            let report = engine.load_file(path, *format)?;
            writeln!(out, "{report}")?;
        }
        Command::Transform => {
            let report = engine.reproject()?;
            write!(out, "{report}")?;
        }
        Command::Select(index) => {
            if let Reaction::Selected(id) = engine.dispatch(UserEvent::RowSelected(*index))? {
                writeln!(out, "selected row {} (record {})", index + 1, id)?;
            }
        }
        Command::Marker(id) => {
            engine.dispatch(UserEvent::MarkerClicked(*id))?;
            let row = engine.store().position(*id).map_or(0, |i| i + 1);
            writeln!(out, "selected row {} (record {})", row, id)?;
        }
        Command::Context(index) => {
            let reaction = engine.dispatch(UserEvent::RowContextRequested(*index))?;
            if let Reaction::ContextMenu { actions, .. } = reaction {
                let labels: Vec<&str> = actions.iter().map(|a| action_label(*a)).collect();
                writeln!(out, "row {}: {}", index + 1, labels.join(", "))?;
            }
        }
        Command::Delete(index) => {
            if let Reaction::Deleted(record) = engine.dispatch(UserEvent::DeleteRequested(*index))? {
                writeln!(out, "deleted row {} (record {})", index + 1, record.id)?;
            }
        }
        Command::Clear => {
            if let Reaction::Cleared(count) = engine.dispatch(UserEvent::ClearRequested)? {
                writeln!(out, "cleared {count} record(s)")?;
            }
        }
        Command::Table => {
            write!(out, "{}", render_table(&engine.table()))?;
        }
        Command::Copy { set, row } => match row {
            Some(index) => writeln!(out, "{}", engine.copy_record(*index, *set)?)?,
            None => write!(out, "{}", engine.bulk_text(*set))?,
        },
        Command::Map(layer) => {
            let shown = engine.show_layer(*layer);
            writeln!(out, "map: {layer} layer, {shown} marker(s)")?;
        }
        Command::Export(path) => {
            let path = path
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_EXPORT_FILE_NAME));
            engine.write_geojson(path)?;
            writeln!(
                out,
                "exported {} feature(s) to {}",
                engine.records().len(),
                path.display()
            )?;
        }
        Command::ExportShp(path) => {
            let path = path
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_SHAPEFILE_ARCHIVE_NAME));
            let written = engine.write_shapefile_zip(path)?;
            writeln!(
                out,
                "exported {} point(s) as EPSG:{} shapefile to {}",
                written,
                SHAPEFILE_CRS,
                path.display()
            )?;
        }
        Command::Crs => {
            for def in engine.registry().definitions() {
                writeln!(out, "EPSG:{:<6} {}", def.code, def.label)?;
            }
        }
    }
    Ok(())
}

fn action_label(action: ContextAction) -> &'static str {
    match action {
        ContextAction::CopySource => "copy source",
        ContextAction::CopyTarget => "copy target",
        ContextAction::Delete => "delete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::selection::SelectionState;

    fn run(script: &str) -> (Result<usize, CoordError>, String, String, Engine) {
        let mut engine = Engine::new(EngineConfig::default());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = run_script(&mut engine, script, &mut out, &mut err);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
            engine,
        )
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        assert_eq!(parse_command("", 1).unwrap(), None);
        assert_eq!(parse_command("   # note", 1).unwrap(), None);
        assert_eq!(
            parse_command("transform # go", 1).unwrap(),
            Some(Command::Transform)
        );
    }

    #[test]
    fn test_hash_inside_a_path_is_not_a_comment() {
        assert_eq!(
            parse_command("export out#2.geojson", 1).unwrap(),
            Some(Command::Export(Some(PathBuf::from("out#2.geojson"))))
        );
        assert_eq!(
            parse_command("export-shp lote#7.zip # final run", 1).unwrap(),
            Some(Command::ExportShp(Some(PathBuf::from("lote#7.zip"))))
        );
        assert_eq!(
            parse_command("add 1 2\t# note", 1).unwrap(),
            Some(Command::Add {
                x: "1".into(),
                y: "2".into()
            })
        );
        assert_eq!(parse_command("#add 1 2", 1).unwrap(), None);
    }

    #[test]
    fn test_parse_rows_are_one_based() {
        assert_eq!(parse_command("select 1", 1).unwrap(), Some(Command::Select(0)));
        assert_eq!(parse_command("DELETE 3", 1).unwrap(), Some(Command::Delete(2)));

        let err = parse_command("select 0", 7).unwrap_err();
        assert!(matches!(err, CoordError::Script { line: 7, .. }));
        assert!(err.to_string().contains("start at 1"));
    }

    #[test]
    fn test_parse_load_with_optional_format() {
        assert_eq!(
            parse_command("load my points.csv table", 1).unwrap(),
            Some(Command::Load {
                path: PathBuf::from("my points.csv"),
                format: InputFormat::Table,
            })
        );
        assert_eq!(
            parse_command("load points.txt", 1).unwrap(),
            Some(Command::Load {
                path: PathBuf::from("points.txt"),
                format: InputFormat::Auto,
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_usage() {
        assert!(parse_command("add 1", 1).is_err());
        assert!(parse_command("copy sideways", 1).is_err());
        assert!(parse_command("map", 1).is_err());
        let err = parse_command("frobnicate", 4).unwrap_err();
        assert_eq!(err.to_string(), "Line 4: unknown command 'frobnicate'");
    }

    #[test]
    fn test_script_transforms_and_copies() {
        let (result, out, err, engine) = run(
            "origin EPSG:4326\n\
             destination 3116\n\
             add -74.0775079166667 4.59620041666667\n\
             transform\n\
             copy target 1\n",
        );
        assert_eq!(result.unwrap(), 5, "stderr: {err}");
        assert!(out.contains("Transformed 1 of 1"));

        let copied = out.lines().last().unwrap();
        let (x, y) = copied.split_once(',').unwrap();
        assert!((x.parse::<f64>().unwrap() - 1_000_000.0).abs() < 0.01);
        assert!((y.parse::<f64>().unwrap() - 1_000_000.0).abs() < 0.01);
        assert!(engine.records()[0].is_transformed());
    }

    #[test]
    fn test_script_continues_after_errors() {
        let (result, _out, err, engine) = run("add 1 abc\nadd 1 2\ndelete 9\nadd 3 4\n");
        assert!(matches!(result, Err(CoordError::SessionFailed { errors: 2 })));
        assert_eq!(engine.records().len(), 2);
        assert!(err.contains("Line 1: Invalid y"));
        assert!(err.contains("Line 3:"));
    }

    #[test]
    fn test_script_selection_follows_deletes() {
        let (result, out, _err, engine) = run("add 1 1\nadd 2 2\nadd 3 3\nselect 3\ndelete 1\ncontext 1\n");
        result.unwrap();
        assert!(out.contains("row 1: copy source, delete"));
        // context menu selects the row it was opened on
        assert_eq!(
            engine.selection(),
            SelectionState::Active(engine.records()[0].id)
        );
    }

    #[test]
    fn test_script_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let script = format!("add -74 4.6\ntransform\nexport {}\n", path.display());
        let (result, out, _err, _engine) = run(&script);
        result.unwrap();
        assert!(out.contains("exported 1 feature(s)"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_script_export_shp_writes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lote#1.zip");
        let script = format!(
            "add -74.0775079166667 4.59620041666667\nadd -74.08 4.7\ntransform\nexport-shp {}\n",
            path.display()
        );
        let (result, out, err, _engine) = run(&script);
        assert_eq!(result.unwrap(), 4, "stderr: {err}");
        assert!(out.contains("exported 2 point(s) as EPSG:9377 shapefile"));

        let archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert!(archive.file_names().any(|name| name == "coordenadas.shp"));
    }

    #[test]
    fn test_script_export_before_transform_fails() {
        let (result, _out, err, _engine) = run("add 1 2\nexport /nonexistent/x.geojson\n");
        assert!(matches!(result, Err(CoordError::SessionFailed { errors: 1 })));
        assert!(err.contains("Export not ready"));
    }

    #[test]
    fn test_script_map_and_marker() {
        let (result, out, _err, engine) = run("add -74 4.6\nadd -75 5\nmap source\nmarker 2\n");
        result.unwrap();
        assert!(out.contains("map: source layer, 2 marker(s)"));
        assert!(out.contains("selected row 2 (record 2)"));
        assert_eq!(engine.surface().highlighted(), vec![RecordId(2)]);
    }
}
