use std::collections::VecDeque;

use rfcread::{Error, Result, RfcInvoke, RfcStructure, RfcValue};

/// In-memory stand-in for an RFC session. Records every call and answers
/// with queued responses.
pub struct FakeSession {
    pub calls: Vec<(String, RfcStructure)>,
    responses: VecDeque<Result<RfcStructure>>,
}

impl FakeSession {
    pub fn new() -> FakeSession {
        FakeSession {
            calls: Vec::new(),
            responses: VecDeque::new(),
        }
    }

    pub fn respond(mut self, response: Result<RfcStructure>) -> FakeSession {
        self.responses.push_back(response);
        self
    }
}

impl RfcInvoke for FakeSession {
    fn invoke(&mut self, function_name: &str, args: &RfcStructure) -> Result<RfcStructure> {
        self.calls.push((function_name.to_string(), args.clone()));
        self.responses
            .pop_front()
            .unwrap_or_else(|| Err(Error::InvalidRequest("no response queued".to_string())))
    }
}

/// A response shaped like RFC_READ_TABLE's: one WA per row plus FIELDS.
pub fn read_table_response(rows: &[&str], fields: &[&str]) -> RfcStructure {
    let data: Vec<RfcStructure> = rows
        .iter()
        .map(|wa| RfcStructure::new().with("WA", *wa))
        .collect();
    let fields: Vec<RfcStructure> = fields
        .iter()
        .map(|f| RfcStructure::new().with("FIELDNAME", *f))
        .collect();
    RfcStructure::new()
        .with("OPTIONS", Vec::<RfcStructure>::new())
        .with("FIELDS", RfcValue::RfcTable(fields))
        .with("DATA", RfcValue::RfcTable(data))
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
