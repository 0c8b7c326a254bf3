//! Low-level readers shared by the workbook parsers
pub(crate) mod xml;
pub(crate) mod zip;
