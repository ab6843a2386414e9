//! `RFC_READ_TABLE` on top of any [`RfcInvoke`] session.
//!
//! The function module returns every row as a single delimited string (the
//! work area, `WA`) together with a description of the selected fields. This
//! module builds the call arguments and turns the answer back into rows
//! keyed by field name.

use std::path::Path;

use log::debug;

use crate::error::*;
use crate::profile::ConnectionProfile;
use crate::value::*;
use crate::{RfcConnection, RfcInvoke, RfcLib};

pub const RFC_READ_TABLE: &str = "RFC_READ_TABLE";

/// Arguments of one `RFC_READ_TABLE` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTableRequest {
    pub query_table: String,
    /// Separator between the fields of a returned row.
    pub delimiter: char,
    /// If not empty, only the field descriptions are returned.
    pub no_data: String,
    pub rowskips: u32,
    /// Maximum number of rows; 0 leaves it to the server.
    pub rowcount: u32,
    /// Selection condition, i.e. the WHERE clause. Double quotes are sent
    /// as single quotes.
    pub options: String,
    /// Fields to read, `None` reads all of them.
    pub fields: Option<Vec<String>>,
}

impl ReadTableRequest {
    pub fn new(query_table: &str) -> ReadTableRequest {
        ReadTableRequest {
            query_table: query_table.to_string(),
            delimiter: '|',
            no_data: String::new(),
            rowskips: 0,
            rowcount: 0,
            options: String::new(),
            fields: None,
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn no_data(mut self, no_data: &str) -> Self {
        self.no_data = no_data.to_string();
        self
    }

    pub fn rowskips(mut self, rowskips: u32) -> Self {
        self.rowskips = rowskips;
        self
    }

    pub fn rowcount(mut self, rowcount: u32) -> Self {
        self.rowcount = rowcount;
        self
    }

    pub fn options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The argument structure passed to `RFC_READ_TABLE`.
    pub fn to_args(&self) -> Result<RfcStructure> {
        if self.query_table.is_empty() {
            return Err(Error::InvalidRequest("query table must not be empty".to_string()));
        }

        // One line only; keeping it within the 72 character limit of
        // OPTIONS-TEXT is up to the caller.
        let options = vec![RfcStructure::new().with("TEXT", self.options.replace('"', "'"))];

        let fields: Vec<RfcStructure> = self
            .fields
            .iter()
            .flatten()
            .map(|f| RfcStructure::new().with("FIELDNAME", f.as_str()))
            .collect();

        Ok(RfcStructure::new()
            .with("QUERY_TABLE", self.query_table.as_str())
            .with("DELIMITER", self.delimiter.to_string())
            .with("NO_DATA", self.no_data.as_str())
            .with("ROWSKIPS", to_rfc_int("ROWSKIPS", self.rowskips)?)
            .with("ROWCOUNT", to_rfc_int("ROWCOUNT", self.rowcount)?)
            .with("OPTIONS", options)
            .with("FIELDS", fields))
    }
}

fn to_rfc_int(name: &str, value: u32) -> Result<i32> {
    if value > i32::MAX as u32 {
        return Err(Error::InvalidRequest(format!("{} out of range: {}", name, value)));
    }
    Ok(value as i32)
}

/// One entry of the `FIELDS` table as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub fieldname: String,
    pub offset: Option<usize>,
    pub length: Option<usize>,
    /// ABAP type letter, e.g. `C` or `N`.
    pub field_type: Option<String>,
    pub fieldtext: Option<String>,
}

impl FieldDescriptor {
    pub fn new(fieldname: &str) -> FieldDescriptor {
        FieldDescriptor {
            fieldname: fieldname.to_string(),
            offset: None,
            length: None,
            field_type: None,
            fieldtext: None,
        }
    }

    fn from_row(row: &RfcStructure) -> Result<FieldDescriptor> {
        let fieldname = row
            .get("FIELDNAME")
            .and_then(RfcValue::as_str)
            .ok_or_else(|| Error::MalformedResponse("FIELDS row without FIELDNAME".to_string()))?;
        Ok(FieldDescriptor {
            fieldname: fieldname.trim().to_string(),
            offset: numeric(row, "OFFSET")?,
            length: numeric(row, "LENGTH")?,
            field_type: text(row, "TYPE"),
            fieldtext: text(row, "FIELDTEXT"),
        })
    }
}

fn text(row: &RfcStructure, name: &str) -> Option<String> {
    row.get(name)
        .and_then(RfcValue::as_str)
        .map(|s| s.trim().to_string())
}

// OFFSET and LENGTH are NUMC fields, i.e. zero padded digits.
fn numeric(row: &RfcStructure, name: &str) -> Result<Option<usize>> {
    match row.get(name) {
        None => Ok(None),
        Some(RfcValue::RfcInt(i)) if *i >= 0 => Ok(Some(*i as usize)),
        Some(RfcValue::RfcString(s)) => s.trim().parse().map(Some).map_err(|_| {
            Error::MalformedResponse(format!("{} is not a number: {:?}", name, s))
        }),
        Some(other) => Err(Error::MalformedResponse(format!(
            "{} has unexpected value {:?}",
            name, other
        ))),
    }
}

/// One result row: field names paired with their trimmed values, in the
/// order the server returned the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    values: Vec<(String, String)>,
}

impl TableRow {
    pub fn get(&self, fieldname: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == fieldname)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Split a work area and pair its segments with `fieldnames`. Surplus
    /// names or segments are dropped, whichever side is longer.
    pub fn from_work_area(wa: &str, delimiter: char, fieldnames: &[&str]) -> TableRow {
        let values = fieldnames
            .iter()
            .zip(wa.split(delimiter))
            .map(|(name, value)| (name.to_string(), value.trim().to_string()))
            .collect();
        TableRow { values }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadTableResult {
    pub rows: Vec<TableRow>,
    pub fields: Vec<FieldDescriptor>,
}

impl ReadTableResult {
    /// Decode the result of an `RFC_READ_TABLE` call. Rows are split on
    /// `delimiter`, which should be the one the call was made with.
    pub fn from_response(response: &RfcStructure, delimiter: char) -> Result<ReadTableResult> {
        let fields = response
            .require_table("FIELDS")
            .map_err(|e| Error::MalformedResponse(e.to_string()))?
            .iter()
            .map(FieldDescriptor::from_row)
            .collect::<Result<Vec<_>>>()?;
        let data = response
            .require_table("DATA")
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let fieldnames: Vec<&str> = fields.iter().map(|f| f.fieldname.as_str()).collect();
        let rows = data
            .iter()
            .map(|row| {
                row.require_str("WA")
                    .map(|wa| TableRow::from_work_area(wa, delimiter, &fieldnames))
                    .map_err(|e| Error::MalformedResponse(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ReadTableResult { rows, fields })
    }
}

/// Reads tables through a session it owns for its whole lifetime.
pub struct TableReader<S> {
    session: S,
}

impl<'lib> TableReader<RfcConnection<'lib>> {
    /// Load a connection profile and open a session with it.
    pub fn from_profile<P: AsRef<Path>>(
        profile: P,
        rfc_lib: &'lib RfcLib,
    ) -> Result<TableReader<RfcConnection<'lib>>> {
        let profile = ConnectionProfile::from_path(profile)?;
        let connection = RfcConnection::open(&profile, rfc_lib)?;
        Ok(TableReader::new(connection))
    }

    /// Close the session, reporting failures.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }
}

impl<S: RfcInvoke> TableReader<S> {
    pub fn new(session: S) -> TableReader<S> {
        TableReader { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Call `RFC_READ_TABLE` and return the rows together with the field
    /// descriptions the server sent. Field order follows the response, not
    /// the requested field list.
    pub fn read_table(&mut self, request: &ReadTableRequest) -> Result<ReadTableResult> {
        let args = request.to_args()?;
        debug!(
            "Reading {} (skip {}, count {})",
            request.query_table, request.rowskips, request.rowcount
        );
        let response = self.session.invoke(RFC_READ_TABLE, &args)?;
        let result = ReadTableResult::from_response(&response, request.delimiter)?;
        debug!(
            "Read {} rows with {} fields from {}",
            result.rows.len(),
            result.fields.len(),
            request.query_table
        );
        Ok(result)
    }
}
