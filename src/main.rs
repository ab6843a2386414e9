use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};

use rfcread::*;

/// Read an SAP table via RFC_READ_TABLE and print it.
#[derive(Parser, Debug)]
#[command(name = "rfcread", version)]
struct Args {
    /// Connection profile, one `name = value` pair per line
    profile: PathBuf,

    /// Table to read, e.g. USR02
    table: String,

    /// Field to read; repeat for several. Default: all fields
    #[arg(short, long = "field")]
    fields: Vec<String>,

    /// Selection condition (WHERE clause)
    #[arg(short, long, default_value = "")]
    options: String,

    #[arg(long, default_value_t = 0)]
    rowskips: u32,

    /// Maximum number of rows, 0 for no limit
    #[arg(long, default_value_t = 0)]
    rowcount: u32,

    #[arg(short, long, default_value_t = '|')]
    delimiter: char,

    /// Path of the SAP NetWeaver RFC library
    #[arg(long)]
    library: Option<PathBuf>,
}

fn init_logging() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();
}

fn request(args: &Args) -> ReadTableRequest {
    let request = ReadTableRequest::new(&args.table)
        .delimiter(args.delimiter)
        .rowskips(args.rowskips)
        .rowcount(args.rowcount)
        .options(&args.options);
    if args.fields.is_empty() {
        request
    } else {
        request.fields(args.fields.iter().cloned())
    }
}

/// Header line with the field names, then one line per row.
fn render(result: &ReadTableResult, delimiter: char) -> String {
    let separator = delimiter.to_string();
    let mut out = String::new();
    let header: Vec<&str> = result.fields.iter().map(|f| f.fieldname.as_str()).collect();
    out.push_str(&header.join(&separator));
    out.push('\n');
    for row in &result.rows {
        let values: Vec<&str> = row.iter().map(|(_, v)| v).collect();
        out.push_str(&values.join(&separator));
        out.push('\n');
    }
    out
}

fn run(args: &Args) -> Result<()> {
    let rfc_lib = match &args.library {
        Some(path) => RfcLib::from_path(path)?,
        None => RfcLib::new()?,
    };

    let mut reader = TableReader::from_profile(&args.profile, &rfc_lib)?;
    let result = reader.read_table(&request(args))?;
    print!("{}", render(&result, args.delimiter));

    reader.close()
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["rfcread", "sap.cfg", "T000"]).unwrap();
        assert_eq!(args.profile, PathBuf::from("sap.cfg"));
        assert_eq!(args.table, "T000");
        assert!(args.fields.is_empty());
        assert_eq!(args.options, "");
        assert_eq!(args.rowskips, 0);
        assert_eq!(args.rowcount, 0);
        assert_eq!(args.delimiter, '|');
        assert!(args.library.is_none());

        let request = request(&args);
        assert_eq!(request, ReadTableRequest::new("T000"));
        assert!(request.fields.is_none());
    }

    #[test]
    fn repeated_fields_and_options() {
        let args = Args::try_parse_from([
            "rfcread",
            "sap.cfg",
            "USR02",
            "-f",
            "BNAME",
            "--field",
            "USTYP",
            "-o",
            "USTYP = \"A\"",
            "--rowskips",
            "10",
            "--rowcount",
            "5",
            "-d",
            ";",
            "--library",
            "/opt/nwrfcsdk/lib/libsapnwrfc.so",
        ])
        .unwrap();

        let request = request(&args);
        assert_eq!(
            request.fields,
            Some(vec!["BNAME".to_string(), "USTYP".to_string()])
        );
        assert_eq!(request.options, "USTYP = \"A\"");
        assert_eq!(request.rowskips, 10);
        assert_eq!(request.rowcount, 5);
        assert_eq!(request.delimiter, ';');
        assert_eq!(
            args.library,
            Some(PathBuf::from("/opt/nwrfcsdk/lib/libsapnwrfc.so"))
        );
    }

    #[test]
    fn table_is_required() {
        assert!(Args::try_parse_from(["rfcread", "sap.cfg"]).is_err());
    }

    #[test]
    fn renders_header_and_rows() {
        let result = ReadTableResult {
            rows: vec![
                TableRow::from_work_area("000 |SAP AG ", '|', &["MANDT", "MTEXT"]),
                TableRow::from_work_area("001|Client 001", '|', &["MANDT", "MTEXT"]),
            ],
            fields: vec![FieldDescriptor::new("MANDT"), FieldDescriptor::new("MTEXT")],
        };
        assert_eq!(
            render(&result, ';'),
            "MANDT;MTEXT\n000;SAP AG\n001;Client 001\n"
        );
    }

    #[test]
    fn renders_header_only_without_rows() {
        let result = ReadTableResult {
            rows: Vec::new(),
            fields: vec![FieldDescriptor::new("BNAME")],
        };
        assert_eq!(render(&result, '|'), "BNAME\n");
    }
}
