//! Read SAP tables over RFC.
//!
//! The SAP NetWeaver RFC library (`libsapnwrfc`) is loaded at runtime and
//! does all of the protocol work. On top of it this crate offers a generic
//! way to call RFC enabled functions ([`RfcInvoke`]) and a [`TableReader`]
//! that wraps `RFC_READ_TABLE`:
//!
//! ```no_run
//! use rfcread::{ReadTableRequest, RfcLib, TableReader};
//!
//! # fn main() -> rfcread::Result<()> {
//! let rfc_lib = RfcLib::new()?;
//! let mut reader = TableReader::from_profile("sap.cfg", &rfc_lib)?;
//! let result = reader.read_table(
//!     &ReadTableRequest::new("USR02")
//!         .fields(vec!["BNAME", "USTYP"])
//!         .options("USTYP = \"A\""),
//! )?;
//! for row in &result.rows {
//!     println!("{:?}", row.get("BNAME"));
//! }
//! reader.close()
//! # }
//! ```

#[macro_use]
extern crate dlopen_derive;

use std::ffi::OsStr;
use std::ptr::null_mut;

use log::{debug, info, warn};

pub mod connparams;
pub mod error;
pub mod profile;
pub mod read_table;
pub mod rfc;
pub mod value;

use crate::connparams::*;
use crate::rfc::*;

pub use crate::error::{Error, Result, RfcErrorInfo};
pub use crate::profile::ConnectionProfile;
pub use crate::read_table::{
    FieldDescriptor, ReadTableRequest, ReadTableResult, TableReader, TableRow, RFC_READ_TABLE,
};
pub use crate::value::{RfcStructure, RfcValue};

/// Simple RFC connections require only a few parameters.
/// You can use this struct to supply them.
pub struct RfcConnectionParameters<'a> {
    pub ashost: &'a str,
    pub sysnr: &'a str,
    pub client: &'a str,
    pub user: &'a str,
    pub passwd: &'a str,
    pub lang: &'a str,
}

impl<'a> RfcConnectionParameters<'a> {
    /// Convert to a more generic connection profile
    pub fn to_profile(&self) -> ConnectionProfile {
        let mut profile = ConnectionProfile::new();
        profile.insert("ashost", self.ashost);
        profile.insert("sysnr", self.sysnr);
        profile.insert("client", self.client);
        profile.insert("user", self.user);
        profile.insert("passwd", self.passwd);
        profile.insert("lang", self.lang);
        profile
    }
}

/// Anything that can call an RFC enabled function by name.
///
/// Arguments are matched to the function's parameters by name. The result
/// holds every parameter the caller can read back (EXPORTING, CHANGING and
/// TABLES).
pub trait RfcInvoke {
    fn invoke(&mut self, function_name: &str, args: &RfcStructure) -> Result<RfcStructure>;
}

impl<'a, T: RfcInvoke + ?Sized> RfcInvoke for &'a mut T {
    fn invoke(&mut self, function_name: &str, args: &RfcStructure) -> Result<RfcStructure> {
        (**self).invoke(function_name, args)
    }
}

/// The loaded SAP NetWeaver RFC library
pub struct RfcLib {
    rfc_api: dlopen::wrapper::Container<RfcApi>,
}

#[cfg(all(target_family = "unix", not(target_vendor = "apple")))]
const RFC_LIBRARY: &str = "libsapnwrfc.so";

#[cfg(all(target_family = "unix", target_vendor = "apple"))]
const RFC_LIBRARY: &str = "libsapnwrfc.dylib";

#[cfg(target_family = "windows")]
const RFC_LIBRARY: &str = "sapnwrfc.dll";

impl RfcLib {
    /// Load the RFC library from the default library search path
    pub fn new() -> Result<RfcLib> {
        RfcLib::from_path(RFC_LIBRARY)
    }

    /// Load the RFC library from a specific file
    pub fn from_path<P: AsRef<OsStr>>(path: P) -> Result<RfcLib> {
        let path = path.as_ref();
        let rfc_api: dlopen::wrapper::Container<RfcApi> =
            unsafe { dlopen::wrapper::Container::load(path) }.map_err(|e| Error::Library {
                library: path.to_string_lossy().into_owned(),
                reason: e.to_string(),
            })?;
        debug!("Loaded RFC library {}", path.to_string_lossy());
        Ok(RfcLib { rfc_api })
    }
}

/// An open RFC connection
pub struct RfcConnection<'lib> {
    connection_handle: *mut RfcConnectionHandle,
    rfc_lib: &'lib RfcLib,
}

/// An RFC function
pub struct RfcFunction<'conn, 'lib> {
    connection: &'conn RfcConnection<'lib>,
    name: String,
    fun: *mut RfcDataContainerHandle,
    fun_desc: Vec<RfcParameter<'lib>>,
}

impl<'lib> RfcConnection<'lib> {
    pub fn new(
        conn_info: &RfcConnectionParameters,
        rfc_lib: &'lib RfcLib,
    ) -> Result<RfcConnection<'lib>> {
        RfcConnection::open(&conn_info.to_profile(), rfc_lib)
    }

    /// Open a connection to an SAP system via RFC. Every profile entry is
    /// passed on as a connection parameter.
    pub fn open(profile: &ConnectionProfile, rfc_lib: &'lib RfcLib) -> Result<RfcConnection<'lib>> {
        let parms = RfcConnParmHelper::from_profile(profile)?;
        info!(
            "Opening RFC connection to {} (client {})",
            profile
                .get("ashost")
                .or_else(|| profile.get("mshost"))
                .or_else(|| profile.get("dest"))
                .unwrap_or("<unspecified host>"),
            profile.get("client").unwrap_or("<default>")
        );
        RfcConnection::from_parm_helper(parms, rfc_lib)
    }

    /// Open a connection to an SAP system via RFC
    pub fn from_parm_helper(
        parms: RfcConnParmHelper,
        rfc_lib: &'lib RfcLib,
    ) -> Result<RfcConnection<'lib>> {
        let mut err_trunk = RfcErrorInfo::new();
        let ch = parms.as_vec(|pv| unsafe {
            rfc_lib
                .rfc_api
                .RfcOpenConnection(pv.as_ptr(), pv.len() as u32, &mut err_trunk)
        });
        if ch.is_null() {
            return Err(err_trunk.into());
        }
        Ok(RfcConnection {
            connection_handle: ch,
            rfc_lib,
        })
    }

    fn api(&self) -> &'lib RfcApi {
        let rfc_lib: &'lib RfcLib = self.rfc_lib;
        &rfc_lib.rfc_api
    }

    /// Return a reference to an RFC enabled function, if it exists on
    /// the remote system.
    pub fn get_function<'conn>(&'conn self, name: &str) -> Result<RfcFunction<'conn, 'lib>> {
        let api = self.api();
        let name_uc = to_sap_uc(name)?;
        let mut err_trunk = RfcErrorInfo::new();
        let fd = unsafe { api.RfcGetFunctionDesc(self.connection_handle, name_uc.as_ptr(), &mut err_trunk) };
        if fd.is_null() {
            return Err(err_trunk.into());
        }
        let ff = unsafe { api.RfcCreateFunction(fd, &mut err_trunk) };
        if ff.is_null() {
            return Err(err_trunk.into());
        }
        // Owned from here on, so the container is destroyed on early return
        let mut function = RfcFunction {
            connection: self,
            name: name.to_string(),
            fun: ff,
            fun_desc: Vec::new(),
        };

        let mut parm_count: u32 = 0;
        let res = unsafe { api.RfcGetParameterCount(fd, &mut parm_count, &mut err_trunk) };
        if !res.is_ok() {
            return Err(err_trunk.into());
        }

        function.fun_desc.reserve_exact(parm_count as usize);
        let mut rpd = RfcParameterDesc::new();
        for i in 0..parm_count {
            let res = unsafe { api.RfcGetParameterDescByIndex(fd, i, &mut rpd, &mut err_trunk) };
            if !res.is_ok() {
                return Err(err_trunk.into());
            }
            let parm = rpd.to_parameter(api, i, ff)?;
            function.fun_desc.push(parm);
        }

        Ok(function)
    }

    /// Close the connection, reporting any error the RFC library raises.
    /// Dropping the connection closes it as well, but can only log failures.
    pub fn close(mut self) -> Result<()> {
        let handle = std::mem::replace(&mut self.connection_handle, null_mut());
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe { self.api().RfcCloseConnection(handle, &mut err_trunk) };
        if !res.is_ok() {
            return Err(err_trunk.into());
        }
        info!("RFC connection closed");
        Ok(())
    }
}

impl<'lib> RfcInvoke for RfcConnection<'lib> {
    fn invoke(&mut self, function_name: &str, args: &RfcStructure) -> Result<RfcStructure> {
        let mut function = self.get_function(function_name)?;
        function.set_args(args)?;
        debug!("Calling {} with {} arguments", function_name, args.len());
        function.call()?;
        function.get_results()
    }
}

impl<'conn, 'lib> RfcFunction<'conn, 'lib> {
    /// Get a mutable reference to an RFC parameter using the parameter name. This
    /// is a case insensitive operation.
    pub fn get_mut_parameter(&mut self, parameter_name: &str) -> Option<&mut RfcParameter<'lib>> {
        self.fun_desc
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(parameter_name))
    }

    /// Assign every argument to the parameter of the same name.
    pub fn set_args(&mut self, args: &RfcStructure) -> Result<()> {
        for (name, value) in args.iter() {
            let function = self.name.clone();
            let parameter = self
                .get_mut_parameter(name)
                .ok_or_else(|| Error::UnknownParameter {
                    function,
                    parameter: name.to_string(),
                })?;
            parameter.set_value(value)?;
        }
        Ok(())
    }

    /// Collect every parameter that can be read back after the call.
    pub fn get_results(&self) -> Result<RfcStructure> {
        let mut results = RfcStructure::new();
        for parameter in self.fun_desc.iter().filter(|p| p.direction.can_read()) {
            if let Some(value) = parameter.get_value()? {
                results.set(&parameter.name, value);
            }
        }
        Ok(results)
    }

    /// Call the remote function
    pub fn call(&mut self) -> Result<()> {
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.connection
                .api()
                .RfcInvoke(self.connection.connection_handle, self.fun, &mut err_trunk)
        };
        if !res.is_ok() {
            return Err(err_trunk.into());
        }
        Ok(())
    }
}

impl<'lib> Drop for RfcConnection<'lib> {
    fn drop(&mut self) {
        if !self.connection_handle.is_null() {
            let mut err_trunk = RfcErrorInfo::new();
            let res = unsafe {
                self.api()
                    .RfcCloseConnection(self.connection_handle, &mut err_trunk)
            };
            if !res.is_ok() {
                warn!("Unable to close RFC connection: {}", err_trunk);
            }
        }
    }
}

impl<'conn, 'lib> Drop for RfcFunction<'conn, 'lib> {
    fn drop(&mut self) {
        if !self.fun.is_null() {
            let mut err_trunk = RfcErrorInfo::new();
            let res = unsafe { self.connection.api().RfcDestroyFunction(self.fun, &mut err_trunk) };
            if !res.is_ok() {
                warn!("Unable to destroy RFC function {}: {}", self.name, err_trunk);
            }
        }
    }
}
