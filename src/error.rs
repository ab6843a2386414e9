use std::path::PathBuf;

/// Various kinds of RFC errors
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcRc {
    RfcOk,                        // /< Everything O.K. Used by every function
    RfcCommunicationFailure,      // /< Error in Network & Communication layer
    RfcLogonFailure, // /< Unable to logon to SAP system. Invalid password, user locked, etc.
    RfcAbapRuntimeFailure, // /< SAP system runtime error (SYSTEM_FAILURE): Shortdump on the backend side
    RfcAbapMessage,        // /< The called function module raised an E-, A- or X-Message
    RfcAbapException, // /< The called function module raised an Exception (RAISE or MESSAGE ... RAISING)
    RfcClosed,        // /< Connection closed by the other side
    RfcCanceled,      // /< No longer used
    RfcTimeout,       // /< Time out
    RfcMemoryInsufficient, // /< Memory insufficient
    RfcVersionMismatch, // /< Version mismatch
    RfcInvalidProtocol, // /< The received data has an unsupported format
    RfcSerializationFailure, // /< A problem while serializing or deserializing RFM parameters
    RfcInvalidHandle, // /< An invalid handle was passed to an API call
    RfcRetry, // /< RfcListenAndDispatch did not receive an Rfc request during the timeout period
    RfcExternalFailure, // /< Error in external custom code. Results in SYSTEM_FAILURE
    RfcExecuted, // /< Inbound tRfc Call already executed
    RfcNotFound, // /< Function or structure definition not found (Metadata API)
    RfcNotSupported, // /< The operation is not supported on that handle
    RfcIllegalState, // /< The operation is not supported on that handle at the current point of time
    RfcInvalidParameter, // /< An invalid parameter was passed to an API call, (e.g. invalid name, type or length)
    RfcCodepageConversionFailure, // /< Codepage conversion error
    RfcConversionFailure, // /< Error while converting a parameter to the correct data type
    RfcBufferTooSmall, // /< The given buffer was to small to hold the entire parameter. Data has been truncated.
    RfcTableMoveBof,   // /< Trying to move the current position before the first row of the table
    RfcTableMoveEof,   // /< Trying to move the current position after the last row of the table
    RfcStartSapguiFailure, // /< Failed to start and attach SAPGUI to the Rfc connection
    RfcAbapClassException, // /< The called function module raised a class based exception
    RfcUnknownError,   // /< "Something" went wrong, but I don't know what...
    RfcAuthorizationFailure, // /< Authorization check error
}

impl RfcRc {
    /// Return true if the result was RfcOk (no error)
    pub fn is_ok(&self) -> bool {
        self == &RfcRc::RfcOk
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcErrorGroup {
    Ok,
    AbapApplicationFailure,
    AbapRuntimeFailure,
    LogonFailure,
    CommunicationFailure,
    ExternalRuntimeFailure,
    ExternalApplicationFailure,
    ExternalAuthorizationFailure,
}

/// Error details as filled in by the RFC library.
#[repr(C)]
pub struct RfcErrorInfo {
    pub code: RfcRc,
    pub group: RfcErrorGroup,
    pub key: [u16; 128],
    pub message: [u16; 512],
    pub abap_msg_class: [u16; 21],
    pub abap_msg_type: [u16; 2],
    pub abap_msg_number: [u16; 4],
    pub abap_msg_v1: [u16; 51],
    pub abap_msg_v2: [u16; 51],
    pub abap_msg_v3: [u16; 51],
    pub abap_msg_v4: [u16; 51],
}

/// Decode a NUL terminated (or completely filled) UTF-16 buffer.
pub(crate) fn from_sap_uc(buf: &[u16]) -> String {
    let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

impl RfcErrorInfo {
    /// An empty error trunk, to be handed to the RFC library.
    pub fn new() -> RfcErrorInfo {
        RfcErrorInfo {
            code: RfcRc::RfcOk,
            group: RfcErrorGroup::Ok,
            key: [0 as u16; 128],
            message: [0 as u16; 512],
            abap_msg_class: [0 as u16; 21],
            abap_msg_type: [0 as u16; 2],
            abap_msg_number: [0 as u16; 4],
            abap_msg_v1: [0 as u16; 51],
            abap_msg_v2: [0 as u16; 51],
            abap_msg_v3: [0 as u16; 51],
            abap_msg_v4: [0 as u16; 51],
        }
    }

    pub fn message(&self) -> String {
        from_sap_uc(&self.message)
    }

    /// Short error key, e.g. `RFC_INVALID_PARAMETER` or the ABAP exception name.
    pub fn key(&self) -> String {
        from_sap_uc(&self.key)
    }

    /// ABAP message class, type and number, if the backend raised a message.
    pub fn abap_message(&self) -> Option<(String, String, String)> {
        let class = from_sap_uc(&self.abap_msg_class);
        if class.is_empty() {
            return None;
        }
        Some((
            class,
            from_sap_uc(&self.abap_msg_type),
            from_sap_uc(&self.abap_msg_number),
        ))
    }
}

impl Default for RfcErrorInfo {
    fn default() -> Self {
        RfcErrorInfo::new()
    }
}

impl std::fmt::Debug for RfcErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RfcErrorInfo")
            .field("code", &self.code)
            .field("group", &self.group)
            .field("key", &self.key())
            .field("message", &self.message())
            .finish()
    }
}

impl std::fmt::Display for RfcErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message())
    }
}

impl std::error::Error for RfcErrorInfo {}

/// Everything that can go wrong between reading a profile and decoding a
/// table read.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile line {line} has no '=': {content:?}")]
    ProfileParse { line: usize, content: String },

    #[error("error trying to load {library}: {reason}")]
    Library { library: String, reason: String },

    #[error("RFC error: {0}")]
    Rfc(Box<RfcErrorInfo>),

    #[error("cannot pass {0:?} to the RFC library: contains a NUL character")]
    Encoding(String),

    #[error("function {function} has no parameter {parameter}")]
    UnknownParameter { function: String, parameter: String },

    #[error("{name}: {reason}")]
    TypeMismatch { name: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<RfcErrorInfo> for Error {
    fn from(e: RfcErrorInfo) -> Self {
        Error::Rfc(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str, buf: &mut [u16]) {
        for (dst, src) in buf.iter_mut().zip(s.encode_utf16()) {
            *dst = src;
        }
    }

    #[test]
    fn message_stops_at_nul() {
        let mut info = RfcErrorInfo::new();
        info.code = RfcRc::RfcLogonFailure;
        encode("Name or password is incorrect", &mut info.message);
        assert_eq!(info.message(), "Name or password is incorrect");
        assert_eq!(
            info.to_string(),
            "RfcLogonFailure: Name or password is incorrect"
        );
    }

    #[test]
    fn abap_message_only_when_class_set() {
        let mut info = RfcErrorInfo::new();
        assert!(info.abap_message().is_none());
        encode("SAIS", &mut info.abap_msg_class);
        encode("E", &mut info.abap_msg_type);
        encode("001", &mut info.abap_msg_number);
        assert_eq!(
            info.abap_message(),
            Some(("SAIS".to_string(), "E".to_string(), "001".to_string()))
        );
    }

    #[test]
    fn rfc_error_converts() {
        let err: Error = RfcErrorInfo::new().into();
        assert!(matches!(err, Error::Rfc(_)));
    }
}
