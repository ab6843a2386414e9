#![allow(non_snake_case)]

use std::ptr::null_mut;

use log::debug;

use crate::connparams::to_sap_uc;
use crate::error::*;
use crate::value::*;

pub enum RfcFunctionDescHandle {}
pub enum RfcConnectionHandle {}
pub enum RfcDataContainerHandle {}
pub enum RfcTypeDescHandle {}
pub enum RfcExtendedDescription {}

/// Parameters specifying the RFC connection details
#[repr(C)]
pub struct RfcConnectionParameter {
    pub name: *const u16,
    pub value: *const u16,
}

/// RFC data type
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcType {
    Char = 0,
    Date = 1,
    Bcd = 2,
    Time = 3,
    Byte = 4,
    Table = 5,
    Num = 6,
    Float = 7,
    Int = 8,
    Int2 = 9,
    Int1 = 10,
    Null = 14,
    AbapObject = 16,
    Structure = 17,
    Decf16 = 23,
    Decf34 = 24,
    XmlData = 28,
    String = 29,
    XString = 30,
    Int8 = 31,
    UtcLong = 32,
    UtcSecond = 33,
    UtcMinute = 34,
    DtDay = 35,
    DtMonth = 36,
    TSecond = 37,
    TMinute = 38,
    CDay = 39,
    Box = 40,
    GenericBox = 41,
}

impl RfcType {
    /// Return true if the RFC type is a table or a struct.
    /// (A table is a list of structs, if you will)
    pub fn is_struct_or_table(&self) -> bool {
        self == &RfcType::Structure || self == &RfcType::Table
    }

    /// Return true if the RFC type is a table.
    pub fn is_table(&self) -> bool {
        self == &RfcType::Table
    }

    /// Fixed length character like types, read with RfcGetChars.
    pub fn is_char_like(&self) -> bool {
        match self {
            RfcType::Char | RfcType::Num | RfcType::Date | RfcType::Time => true,
            _ => false,
        }
    }

    /// Integer types that fit an RFC_INT.
    pub fn is_int(&self) -> bool {
        match self {
            RfcType::Int | RfcType::Int1 | RfcType::Int2 => true,
            _ => false,
        }
    }

    /// Types the RFC library can render as a string.
    pub fn is_string_convertible(&self) -> bool {
        match self {
            RfcType::String
            | RfcType::Bcd
            | RfcType::Float
            | RfcType::Decf16
            | RfcType::Decf34
            | RfcType::Int8
            | RfcType::UtcLong
            | RfcType::UtcSecond
            | RfcType::UtcMinute
            | RfcType::DtDay
            | RfcType::DtMonth
            | RfcType::TSecond
            | RfcType::TMinute
            | RfcType::CDay => true,
            _ => false,
        }
    }
}

/// RFC enabled functions can take different kinds of parameters.
/// This enum specified the kind.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcDirection {
    /// A parameter goes from the caller to the callee
    RfcImport = 1,
    /// A parameter goes from the callee to the caller
    RfcExport = 2,
    /// A parameter goes in both directions
    RfcChanging = 1 | 2,
    /// Tables are a special kind of parameter. They go in
    /// both directions.
    RfcTables = 1 | 2 | 4,
}

impl RfcDirection {
    /// Return true if the RFC parameter can be modified
    pub fn can_write(&self) -> bool {
        match self {
            RfcDirection::RfcImport => true,
            RfcDirection::RfcExport => false,
            RfcDirection::RfcChanging => true,
            RfcDirection::RfcTables => true,
        }
    }

    /// Return true if the RFC parameter can be read
    pub fn can_read(&self) -> bool {
        match self {
            RfcDirection::RfcImport => false,
            RfcDirection::RfcExport => true,
            RfcDirection::RfcChanging => true,
            RfcDirection::RfcTables => true,
        }
    }
}

/// Internal RFC lib structure describing one field of a structure or table line.
#[repr(C)]
#[allow(dead_code)]
pub struct RfcFieldDesc {
    name: [u16; 31],
    field_type: RfcType,
    nuc_length: u32,
    nuc_offset: u32,
    uc_length: u32,
    uc_offset: u32,
    decimals: u32,
    type_desc_handle: *mut RfcTypeDescHandle,
    extended_description: *mut RfcExtendedDescription,
}

impl RfcFieldDesc {
    /// Create an empty RFC field desciption
    pub fn new() -> RfcFieldDesc {
        RfcFieldDesc {
            name: [0 as u16; 31],
            field_type: RfcType::String,
            nuc_length: 0,
            nuc_offset: 0,
            uc_length: 0,
            uc_offset: 0,
            decimals: 0,
            type_desc_handle: null_mut(),
            extended_description: null_mut(),
        }
    }

    /// Convert to a parameter addressing this field in `container`, which
    /// is a structure or the current row of a table.
    fn to_parameter<'lib>(
        &self,
        api: &'lib RfcApi,
        index: u32,
        container: *mut RfcDataContainerHandle,
    ) -> RfcParameter<'lib> {
        RfcParameter {
            index,
            name: from_sap_uc(&self.name),
            field_type: self.field_type,
            direction: RfcDirection::RfcChanging,
            len: self.uc_length,
            struct_def: None,
            api,
            container,
            structure_or_table: null_mut(),
        }
    }
}

/// An RFC parameter description, RFC library internal structure
#[repr(C)]
pub struct RfcParameterDesc {
    pub name: [u16; 31],
    pub field_type: RfcType,
    pub direction: RfcDirection,
    pub nuc_length: u32,
    pub uc_length: u32,
    pub decimals: u32,
    pub type_desc_handle: *mut RfcTypeDescHandle,
    pub default_value: [u16; 31],
    pub parameter_text: [u16; 80],
    pub optional: u8,
    pub extended_description: *mut u8,
}

impl RfcParameterDesc {
    pub fn new() -> RfcParameterDesc {
        RfcParameterDesc {
            name: [0 as u16; 31],
            field_type: RfcType::String,
            direction: RfcDirection::RfcExport,
            nuc_length: 0,
            uc_length: 0,
            decimals: 0,
            type_desc_handle: null_mut(),
            default_value: [0 as u16; 31],
            parameter_text: [0 as u16; 80],
            optional: 0 as u8,
            extended_description: null_mut(),
        }
    }

    /// Convert to a parameter of the function container `fun`. Structures
    /// and tables are resolved to their own container and described.
    pub fn to_parameter<'lib>(
        &self,
        api: &'lib RfcApi,
        index: u32,
        fun: *mut RfcDataContainerHandle,
    ) -> Result<RfcParameter<'lib>> {
        let mut structure_or_table = null_mut();
        let mut err_trunk = RfcErrorInfo::new();
        if self.field_type == RfcType::Structure {
            let res = unsafe {
                api.RfcGetStructureByIndex(fun, index, &mut structure_or_table, &mut err_trunk)
            };
            if !res.is_ok() {
                return Err(err_trunk.into());
            }
        } else if self.field_type == RfcType::Table {
            let res = unsafe {
                api.RfcGetTableByIndex(fun, index, &mut structure_or_table, &mut err_trunk)
            };
            if !res.is_ok() {
                return Err(err_trunk.into());
            }
        }

        let struct_def = if structure_or_table.is_null() {
            None
        } else {
            Some(RfcDecodedFieldDesc::from_handle(api, structure_or_table)?)
        };

        Ok(RfcParameter {
            index,
            name: from_sap_uc(&self.name),
            field_type: self.field_type,
            direction: self.direction,
            len: self.uc_length,
            struct_def,
            api,
            container: fun,
            structure_or_table,
        })
    }
}

/// Decoded line type of a structure or table
#[derive(Debug)]
pub struct RfcDecodedFieldDesc<'lib> {
    pub parameters: Vec<RfcParameter<'lib>>,
}

impl<'lib> RfcDecodedFieldDesc<'lib> {
    pub fn from_handle(
        api: &'lib RfcApi,
        handle: *mut RfcDataContainerHandle,
    ) -> Result<RfcDecodedFieldDesc<'lib>> {
        let mut count: u32 = 0;
        let mut err_trunk = RfcErrorInfo::new();

        let type_handle = unsafe { api.RfcDescribeType(handle, &mut err_trunk) };
        if type_handle.is_null() {
            return Err(err_trunk.into());
        }

        let res = unsafe { api.RfcGetFieldCount(type_handle, &mut count, &mut err_trunk) };
        if !res.is_ok() {
            return Err(err_trunk.into());
        }

        let mut parameters = Vec::with_capacity(count as usize);
        let mut rfc_field_desc = RfcFieldDesc::new();
        for i in 0..count {
            let res = unsafe {
                api.RfcGetFieldDescByIndex(type_handle, i, &mut rfc_field_desc, &mut err_trunk)
            };
            if !res.is_ok() {
                return Err(err_trunk.into());
            }
            parameters.push(rfc_field_desc.to_parameter(api, i, handle));
        }

        Ok(RfcDecodedFieldDesc { parameters })
    }
}

/// One RFC function parameter, or one field of a structure or table line.
/// This could be an IMPORTING, EXPORTING, CHANGING or TABLE parameter.
pub struct RfcParameter<'lib> {
    pub index: u32,
    pub name: String,
    pub field_type: RfcType,
    pub direction: RfcDirection,
    /// Length in bytes of the unicode representation
    pub len: u32,
    struct_def: Option<RfcDecodedFieldDesc<'lib>>,
    api: &'lib RfcApi,
    container: *mut RfcDataContainerHandle,
    structure_or_table: *mut RfcDataContainerHandle,
}

impl<'lib> std::fmt::Debug for RfcParameter<'lib> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RfcParameter")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("direction", &self.direction)
            .field("len", &self.len)
            .field("struct_def", &self.struct_def)
            .finish()
    }
}

impl<'lib> RfcParameter<'lib> {
    fn ensure_table(&self) -> Result<()> {
        if self.field_type.is_table() && !self.structure_or_table.is_null() {
            Ok(())
        } else {
            Err(self.mismatch("expected table"))
        }
    }

    fn ensure_struct_or_table(&self) -> Result<&RfcDecodedFieldDesc<'lib>> {
        if !self.field_type.is_struct_or_table() {
            return Err(self.mismatch("expected struct or table"));
        }
        self.struct_def
            .as_ref()
            .ok_or_else(|| self.mismatch("nested structures are not supported"))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.direction.can_write() {
            Ok(())
        } else {
            Err(self.mismatch("read-only parameter"))
        }
    }

    fn ensure_readable(&self) -> Result<()> {
        if self.direction.can_read() {
            Ok(())
        } else {
            Err(self.mismatch("write-only parameter"))
        }
    }

    fn mismatch(&self, reason: &str) -> Error {
        Error::TypeMismatch {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn check(&self, res: RfcRc, err_trunk: RfcErrorInfo) -> Result<()> {
        if res.is_ok() {
            Ok(())
        } else {
            Err(err_trunk.into())
        }
    }

    pub fn append_rows(&self, count: u32) -> Result<()> {
        self.ensure_table()?;
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api
                .RfcAppendNewRows(self.structure_or_table, count, &mut err_trunk)
        };
        self.check(res, err_trunk)
    }

    pub fn set_row(&self, index: u32) -> Result<()> {
        self.ensure_table()?;
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api
                .RfcMoveTo(self.structure_or_table, index, &mut err_trunk)
        };
        self.check(res, err_trunk)
    }

    pub fn get_row_count(&self) -> Result<u32> {
        self.ensure_table()?;
        let mut err_trunk = RfcErrorInfo::new();
        let mut row_count = 0;
        let res = unsafe {
            self.api
                .RfcGetRowCount(self.structure_or_table, &mut row_count, &mut err_trunk)
        };
        self.check(res, err_trunk)?;
        Ok(row_count)
    }

    /// Index of a field of the line type; case insensitive.
    pub fn get_field_index_by_name(&self, key: &str) -> Result<u32> {
        let rpd = self.ensure_struct_or_table()?;
        rpd.parameters
            .iter()
            .position(|field| field.name.eq_ignore_ascii_case(key))
            .map(|i| i as u32)
            .ok_or_else(|| self.mismatch(&format!("unknown field {}", key)))
    }

    pub fn get_field_by_index_mut(&mut self, index: u32) -> Result<&mut RfcParameter<'lib>> {
        self.ensure_struct_or_table()?;
        let name = self.name.clone();
        self.struct_def
            .as_mut()
            .and_then(|rpd| rpd.parameters.get_mut(index as usize))
            .ok_or_else(|| Error::TypeMismatch {
                name,
                reason: "illegal field index".to_string(),
            })
    }

    pub fn set_string(&mut self, value: &str) -> Result<()> {
        self.ensure_writable()?;
        if !self.field_type.is_char_like() && self.field_type != RfcType::String {
            return Err(self.mismatch("not a string datatype, cannot use set_string"));
        }
        let v = to_sap_uc(value)?;
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api.RfcSetCharsByIndex(
                self.container,
                self.index,
                v.as_ptr(),
                (v.len() - 1) as u32,
                &mut err_trunk,
            )
        };
        self.check(res, err_trunk)
    }

    pub fn set_int(&mut self, value: i32) -> Result<()> {
        self.ensure_writable()?;
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api
                .RfcSetIntByIndex(self.container, self.index, value, &mut err_trunk)
        };
        self.check(res, err_trunk)
    }

    pub fn get_int(&self) -> Result<i32> {
        self.ensure_readable()?;
        let mut err_trunk = RfcErrorInfo::new();
        let mut value = 0;
        let res = unsafe {
            self.api
                .RfcGetIntByIndex(self.container, self.index, &mut value, &mut err_trunk)
        };
        self.check(res, err_trunk)?;
        Ok(value)
    }

    /// Read a fixed length character field, blank padding included.
    pub fn get_chars(&self) -> Result<String> {
        self.ensure_readable()?;
        let chars = std::cmp::max(self.len / 2, 1);
        let mut buf = vec![0u16; chars as usize];
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api.RfcGetCharsByIndex(
                self.container,
                self.index,
                buf.as_mut_ptr(),
                chars,
                &mut err_trunk,
            )
        };
        self.check(res, err_trunk)?;
        Ok(from_sap_uc(&buf))
    }

    pub fn get_string(&self) -> Result<String> {
        self.ensure_readable()?;
        let mut err_trunk = RfcErrorInfo::new();
        let mut reserve_len = 0;
        let res = unsafe {
            self.api.RfcGetStringLengthByIndex(
                self.container,
                self.index,
                &mut reserve_len,
                &mut err_trunk,
            )
        };
        self.check(res, err_trunk)?;

        // Room for the terminating NUL
        reserve_len += 1;
        let mut buf = vec![0u16; reserve_len as usize];
        let mut len = 0;
        let mut err_trunk = RfcErrorInfo::new();
        let res = unsafe {
            self.api.RfcGetStringByIndex(
                self.container,
                self.index,
                buf.as_mut_ptr(),
                reserve_len,
                &mut len,
                &mut err_trunk,
            )
        };
        self.check(res, err_trunk)?;
        buf.truncate(len as usize);
        Ok(from_sap_uc(&buf))
    }

    /// Assign a value according to the parameter type. Tables get one new
    /// row per element, structures are filled field by field.
    pub fn set_value(&mut self, value: &RfcValue) -> Result<()> {
        match value {
            RfcValue::RfcString(s) => self.set_string(s),
            RfcValue::RfcInt(i) => self.set_int(*i),
            RfcValue::RfcStructure(s) => {
                if self.field_type != RfcType::Structure {
                    return Err(self.mismatch("expected structure"));
                }
                self.set_fields(s)
            }
            RfcValue::RfcTable(rows) => {
                self.ensure_table()?;
                let base = self.get_row_count()?;
                self.append_rows(rows.len() as u32)?;
                for (i, row) in rows.iter().enumerate() {
                    self.set_row(base + i as u32)?;
                    self.set_fields(row)?;
                }
                Ok(())
            }
        }
    }

    /// Fill the fields of a structure, or of the current table row.
    fn set_fields(&mut self, values: &RfcStructure) -> Result<()> {
        for (name, v) in values.iter() {
            let idx = self.get_field_index_by_name(name)?;
            self.get_field_by_index_mut(idx)?.set_value(v)?;
        }
        Ok(())
    }

    /// Read the value according to the parameter type. Returns `None` for
    /// types that have no `RfcValue` representation.
    pub fn get_value(&self) -> Result<Option<RfcValue>> {
        if self.field_type.is_char_like() {
            return Ok(Some(RfcValue::RfcString(self.get_chars()?)));
        }
        if self.field_type.is_int() {
            return Ok(Some(RfcValue::RfcInt(self.get_int()?)));
        }
        if self.field_type.is_string_convertible() {
            return Ok(Some(RfcValue::RfcString(self.get_string()?)));
        }
        match self.field_type {
            RfcType::Table if !self.structure_or_table.is_null() => {
                let count = self.get_row_count()?;
                let mut rows = Vec::with_capacity(count as usize);
                for i in 0..count {
                    self.set_row(i)?;
                    rows.push(self.get_fields()?);
                }
                Ok(Some(RfcValue::RfcTable(rows)))
            }
            RfcType::Structure if !self.structure_or_table.is_null() => {
                Ok(Some(RfcValue::RfcStructure(self.get_fields()?)))
            }
            _ => {
                debug!(
                    "Skipping {} of unsupported type {:?}",
                    self.name, self.field_type
                );
                Ok(None)
            }
        }
    }

    /// Read the fields of a structure, or of the current table row.
    fn get_fields(&self) -> Result<RfcStructure> {
        let rpd = self.ensure_struct_or_table()?;
        let mut out = RfcStructure::new();
        for field in &rpd.parameters {
            if let Some(v) = field.get_value()? {
                out.set(&field.name, v);
            }
        }
        Ok(out)
    }
}

pub use self::api::RfcApi;

mod api {
    use dlopen::wrapper::WrapperApi;

    use super::{
        RfcConnectionHandle, RfcConnectionParameter, RfcDataContainerHandle, RfcFieldDesc,
        RfcFunctionDescHandle, RfcParameterDesc, RfcTypeDescHandle,
    };
    use crate::error::{RfcErrorInfo, RfcRc};

    /// The entry points of the SAP NetWeaver RFC library used by this crate
    #[derive(WrapperApi)]
    pub struct RfcApi {
        RfcOpenConnection: unsafe extern "C" fn(
            parameters: *const RfcConnectionParameter,
            param_count: u32,
            error: *mut RfcErrorInfo,
        ) -> *mut RfcConnectionHandle,

        RfcCloseConnection:
            unsafe extern "C" fn(handle: *mut RfcConnectionHandle, error: *mut RfcErrorInfo) -> RfcRc,

        RfcGetFunctionDesc: unsafe extern "C" fn(
            handle: *mut RfcConnectionHandle,
            func_name: *const u16,
            error: *mut RfcErrorInfo,
        ) -> *mut RfcFunctionDescHandle,

        RfcCreateFunction: unsafe extern "C" fn(
            handle: *mut RfcFunctionDescHandle,
            error: *mut RfcErrorInfo,
        ) -> *mut RfcDataContainerHandle,

        RfcDestroyFunction: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcInvoke: unsafe extern "C" fn(
            handle: *mut RfcConnectionHandle,
            fun: *mut RfcDataContainerHandle,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetParameterCount: unsafe extern "C" fn(
            fd: *mut RfcFunctionDescHandle,
            count: *mut u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetParameterDescByIndex: unsafe extern "C" fn(
            fd: *mut RfcFunctionDescHandle,
            index: u32,
            param_desc: *mut RfcParameterDesc,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetStructureByIndex: unsafe extern "C" fn(
            fun: *mut RfcDataContainerHandle,
            index: u32,
            structure: *mut *mut RfcDataContainerHandle,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetTableByIndex: unsafe extern "C" fn(
            fun: *mut RfcDataContainerHandle,
            index: u32,
            table: *mut *mut RfcDataContainerHandle,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcDescribeType: unsafe extern "C" fn(
            container: *mut RfcDataContainerHandle,
            error: *mut RfcErrorInfo,
        ) -> *mut RfcTypeDescHandle,

        RfcGetFieldCount: unsafe extern "C" fn(
            tdh: *mut RfcTypeDescHandle,
            count: *mut u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetFieldDescByIndex: unsafe extern "C" fn(
            tdh: *mut RfcTypeDescHandle,
            index: u32,
            field_desc: *mut RfcFieldDesc,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcSetCharsByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            value: *const u16,
            length: u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetCharsByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            value: *mut u16,
            length: u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcSetIntByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            value: i32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetIntByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            value: *mut i32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetStringLengthByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            len: *mut u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetStringByIndex: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            buf: *mut u16,
            buf_len: u32,
            out_len: *mut u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcMoveTo: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            index: u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcGetRowCount: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            row_count: *mut u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,

        RfcAppendNewRows: unsafe extern "C" fn(
            handle: *mut RfcDataContainerHandle,
            row_count: u32,
            error: *mut RfcErrorInfo,
        ) -> RfcRc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions() {
        assert!(RfcDirection::RfcTables.can_read());
        assert!(RfcDirection::RfcTables.can_write());
        assert!(!RfcDirection::RfcImport.can_read());
        assert!(!RfcDirection::RfcExport.can_write());
    }

    #[test]
    fn type_classes() {
        assert!(RfcType::Num.is_char_like());
        assert!(RfcType::Int2.is_int());
        assert!(!RfcType::Int8.is_int());
        assert!(RfcType::Int8.is_string_convertible());
        assert!(!RfcType::XString.is_string_convertible());
        assert!(RfcType::Table.is_struct_or_table());
        assert!(!RfcType::Structure.is_table());
    }
}
