use widestring::*;

use crate::error::*;
use crate::profile::ConnectionProfile;
use crate::rfc::*;

/// Encode a string as a NUL terminated UTF-16 buffer for the RFC library.
pub(crate) fn to_sap_uc(s: &str) -> Result<Vec<u16>> {
    U16CString::from_str(s)
        .map(|s| s.into_vec_with_nul())
        .map_err(|_| Error::Encoding(s.to_string()))
}

/// Simple structure that supplies arbitrary key,value
/// pairs to the SAP RFC library
pub struct RfcConnParmHelper {
    parms: Vec<(Vec<u16>, Vec<u16>)>,
}

impl RfcConnParmHelper {
    /// Create an empty new structure
    pub fn new() -> RfcConnParmHelper {
        RfcConnParmHelper { parms: Vec::new() }
    }

    /// Encode every parameter of a connection profile
    pub fn from_profile(profile: &ConnectionProfile) -> Result<RfcConnParmHelper> {
        let mut parms = RfcConnParmHelper::new();
        for (k, v) in profile.iter() {
            parms.add(k, v)?;
        }
        Ok(parms)
    }

    /// Add a key,value pair
    pub fn add(&mut self, k: &str, v: &str) -> Result<()> {
        let k_c = to_sap_uc(k)?;
        // Keep the value out of the error, it may well be a password.
        let v_c = to_sap_uc(v).map_err(|_| Error::Encoding(format!("value of {}", k)))?;
        self.parms.push((k_c, v_c));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    /// Hand the parameters to `f` as the C structure array the RFC library
    /// expects. The pointers are only valid for the duration of the call.
    pub fn as_vec<F, T>(&self, mut f: F) -> T
    where
        F: FnMut(Vec<RfcConnectionParameter>) -> T,
    {
        let pp = self
            .parms
            .iter()
            .map(|(k, v)| RfcConnectionParameter {
                name: k.as_ptr(),
                value: v.as_ptr(),
            })
            .collect();
        f(pp)
    }
}
